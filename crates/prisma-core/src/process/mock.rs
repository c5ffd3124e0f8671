//! Mock process memory for testing
//!
//! Provides a synthetic memory image implementing `ReadMemory`,
//! `QueryRegions` and `ProcessInfo`, so the scanner, the extractors and the
//! tracking loop can be exercised without a running game.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::process::ReadMemory;
use crate::process::provider::{ProcessInfo, ProcessProvider};
use crate::process::region::{MemoryRegion, QueryRegions, protection};

const DEFAULT_BASE: u64 = 0x1000;

/// Region metadata relative to the image base.
#[derive(Debug, Clone, Copy)]
struct MockRegion {
    offset: u64,
    size: u64,
    state: u32,
    protect: u32,
    kind: u32,
}

/// Mock memory reader for testing
///
/// Clones share the same buffer, so a test can keep one handle to mutate
/// values while another is owned by the code under test.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Arc<RwLock<Vec<u8>>>,
    base: u64,
    regions: Arc<Vec<MockRegion>>,
    alive: Arc<AtomicBool>,
    exe_path: Option<PathBuf>,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_base(data, DEFAULT_BASE)
    }

    /// Create a new mock reader with custom base address
    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            base,
            regions: Arc::new(Vec::new()),
            alive: Arc::new(AtomicBool::new(true)),
            exe_path: None,
        }
    }

    pub fn base_address(&self) -> u64 {
        self.base
    }

    /// Get the size of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite bytes in place (visible through every clone).
    pub fn poke_bytes(&self, offset: usize, bytes: &[u8]) {
        if let Ok(mut data) = self.data.write() {
            if data.len() < offset + bytes.len() {
                data.resize(offset + bytes.len(), 0);
            }
            data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }

    pub fn poke_i32(&self, offset: usize, value: i32) {
        self.poke_bytes(offset, &value.to_le_bytes());
    }

    pub fn poke_u32(&self, offset: usize, value: u32) {
        self.poke_bytes(offset, &value.to_le_bytes());
    }

    pub fn poke_f64(&self, offset: usize, value: f64) {
        self.poke_bytes(offset, &value.to_le_bytes());
    }

    /// Mark the synthetic process as exited.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn image_end(&self) -> u64 {
        self.base + self.len() as u64
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if address < self.base {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Address below base (base=0x{:X})", self.base),
            });
        }
        let data = self.data.read().map_err(|_| Error::MemoryReadFailed {
            address,
            message: "mock buffer poisoned".to_string(),
        })?;
        let offset = (address - self.base) as usize;
        if offset + size > data.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!(
                    "Out of bounds: offset={}, size={}, len={}",
                    offset,
                    size,
                    data.len()
                ),
            });
        }
        Ok(data[offset..offset + size].to_vec())
    }
}

impl QueryRegions for MockMemoryReader {
    fn query_region(&self, address: u64) -> Option<MemoryRegion> {
        let end = self.image_end();
        if address >= end {
            return None;
        }
        if address < self.base {
            return Some(free_region(0, self.base));
        }

        if self.regions.is_empty() {
            return Some(MemoryRegion {
                base: self.base,
                size: end - self.base,
                state: protection::MEM_COMMIT,
                protect: protection::PAGE_EXECUTE_READ,
                kind: protection::MEM_IMAGE,
            });
        }

        let relative = address - self.base;
        if let Some(r) = self
            .regions
            .iter()
            .find(|r| relative >= r.offset && relative < r.offset + r.size)
        {
            return Some(MemoryRegion {
                base: self.base + r.offset,
                size: r.size,
                state: r.state,
                protect: r.protect,
                kind: r.kind,
            });
        }

        // Gap between declared regions
        let next = self
            .regions
            .iter()
            .map(|r| self.base + r.offset)
            .filter(|&start| start > address)
            .min()
            .unwrap_or(end);
        Some(free_region(address, next - address))
    }
}

fn free_region(base: u64, size: u64) -> MemoryRegion {
    MemoryRegion {
        base,
        size,
        state: protection::MEM_FREE,
        protect: protection::PAGE_NOACCESS,
        kind: 0,
    }
}

impl ProcessInfo for MockMemoryReader {
    fn pid(&self) -> u32 {
        4242
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn executable_path(&self) -> Result<PathBuf> {
        self.exe_path
            .clone()
            .ok_or_else(|| Error::ProcessOpenFailed("mock has no executable path".to_string()))
    }
}

/// Provider handing out clones of one synthetic process.
#[derive(Debug, Clone, Default)]
pub struct MockProcessProvider {
    pub process: Option<MockMemoryReader>,
}

impl ProcessProvider for MockProcessProvider {
    type Process = MockMemoryReader;

    fn find_process(&self) -> Result<Self::Process> {
        self.process
            .clone()
            .ok_or_else(|| Error::ProcessNotFound("Mock process not configured".to_string()))
    }

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        self.process
            .as_ref()
            .filter(|p| p.pid() == pid)
            .cloned()
            .ok_or_else(|| Error::ProcessNotFound(format!("Mock process {} not found", pid)))
    }
}

/// Builder for creating test memory images
///
/// Provides a fluent API for constructing memory layouts for testing.
#[derive(Debug, Clone)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
    regions: Vec<MockRegion>,
    exe_path: Option<PathBuf>,
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: DEFAULT_BASE,
            regions: Vec::new(),
            exe_path: None,
        }
    }

    /// Set the base address for the mock reader
    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Pre-allocate buffer with zeros up to the specified size
    pub fn with_size(mut self, size: usize) -> Self {
        self.ensure_size(size);
        self
    }

    /// Declare a committed region at `offset` from base.
    ///
    /// Once any region is declared, bytes outside declared regions are
    /// reported as free memory.
    pub fn region(mut self, offset: usize, size: usize, protect: u32, kind: u32) -> Self {
        self.ensure_size(offset + size);
        self.regions.push(MockRegion {
            offset: offset as u64,
            size: size as u64,
            state: protection::MEM_COMMIT,
            protect,
            kind,
        });
        self
    }

    /// Declare a reserved (not committed) region at `offset` from base.
    pub fn reserved_region(mut self, offset: usize, size: usize) -> Self {
        self.ensure_size(offset + size);
        self.regions.push(MockRegion {
            offset: offset as u64,
            size: size as u64,
            state: 0x2000,
            protect: protection::PAGE_READWRITE,
            kind: protection::MEM_PRIVATE,
        });
        self
    }

    pub fn executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exe_path = Some(path.into());
        self
    }

    pub fn write_u16(self, offset: usize, value: u16) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a signed 32-bit integer at the specified offset from base
    pub fn write_i32(self, offset: usize, value: i32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write an unsigned 32-bit integer at the specified offset from base
    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f32(self, offset: usize, value: f32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f64(self, offset: usize, value: f64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write raw bytes at the specified offset from base
    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Write a managed string object (length at +4, UTF-16LE at +8)
    pub fn write_managed_string(self, offset: usize, text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        self.write_i32(offset + 4, units.len() as i32)
            .write_bytes(offset + 8, &bytes)
    }

    /// Build the MockMemoryReader
    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            data: Arc::new(RwLock::new(self.data)),
            base: self.base,
            regions: Arc::new(self.regions),
            alive: Arc::new(AtomicBool::new(true)),
            exe_path: self.exe_path,
        }
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}
