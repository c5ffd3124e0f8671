use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::offset::scanner;
use crate::offset::signature::PatternName;
use crate::process::{QueryRegions, ReadMemory};

/// Scan workers used for the one-time address resolution pass.
pub const SCAN_WORKERS: usize = 4;

/// Below this many resolved patterns only part of the state can be read.
pub const MIN_RESOLVED_PATTERNS: usize = 3;

/// Resolved signature addresses for one process handle.
///
/// A resolved name is never scanned again until [`clear`](Self::clear) is
/// called on disconnect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BaseAddressTable {
    addresses: BTreeMap<PatternName, u64>,
}

/// Outcome of one [`BaseAddressTable::scan_all`] pass.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub resolved: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn is_usable(&self) -> bool {
        self.resolved >= MIN_RESOLVED_PATTERNS
    }
}

impl BaseAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: PatternName) -> Option<u64> {
        self.addresses.get(&name).copied()
    }

    pub fn insert(&mut self, name: PatternName, address: u64) {
        self.addresses.insert(name, address);
    }

    pub fn contains(&self, name: PatternName) -> bool {
        self.addresses.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternName, u64)> + '_ {
        self.addresses.iter().map(|(&name, &addr)| (name, addr))
    }

    /// Scan every unresolved pattern, in parallel on a small worker pool.
    pub fn scan_all<R>(&mut self, reader: &R) -> ScanSummary
    where
        R: ReadMemory + QueryRegions + Sync + ?Sized,
    {
        let start = Instant::now();
        let pending: Vec<PatternName> = PatternName::iter().filter(|n| !self.contains(*n)).collect();

        info!("Scanning for {} memory patterns...", pending.len());

        let scan_one = |name: &PatternName| -> (PatternName, Option<u64>) {
            match name.pattern() {
                Ok(pattern) => (*name, scanner::scan(reader, &pattern)),
                Err(e) => {
                    warn!("Invalid signature for {}: {}", name, e);
                    (*name, None)
                }
            }
        };

        let results: Vec<(PatternName, Option<u64>)> =
            match rayon::ThreadPoolBuilder::new().num_threads(SCAN_WORKERS).build() {
                Ok(pool) => pool.install(|| pending.par_iter().map(scan_one).collect()),
                Err(e) => {
                    debug!("Falling back to sequential scan: {}", e);
                    pending.iter().map(scan_one).collect()
                }
            };

        for (name, address) in results {
            match address {
                Some(address) => {
                    info!("  {:<12} -> {:#X}", name.as_str(), address);
                    self.insert(name, address);
                }
                None => {
                    warn!("  {:<12} -> not found", name.as_str());
                    if let Ok(pattern) = name.pattern() {
                        debug!("    Pattern: {}", pattern);
                    }
                }
            }
        }

        let summary = ScanSummary {
            resolved: self.len(),
            total: PatternName::iter().count(),
            elapsed: start.elapsed(),
        };

        info!(
            "Found {}/{} patterns in {:.2}s",
            summary.resolved,
            summary.total,
            summary.elapsed.as_secs_f64()
        );
        if !summary.is_usable() {
            warn!("Too few patterns resolved; running with limited functionality");
        }

        summary
    }
}
