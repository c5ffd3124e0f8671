//! In-memory engine for tests.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::beatmap::HitObject;
use crate::engine::ExecutionEngine;
use crate::error::{Error, Result};

/// One recorded `click_hit_objects` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRun {
    pub first_timestamp: Option<i32>,
    pub note_count: usize,
    pub time_adjustment: i32,
    pub offset: i32,
    pub keys: i32,
    pub custom_keys: Option<Vec<u16>>,
}

/// Engine that records calls and, when blocking, plays until stopped.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    blocking: bool,
    fail: bool,
    stop: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    offset: Arc<AtomicI32>,
    timing_shift: Arc<AtomicI32>,
    runs: Arc<Mutex<Vec<MockRun>>>,
}

impl MockEngine {
    /// Engine whose runs return immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose runs block until the stop flag is raised.
    pub fn blocking() -> Self {
        Self {
            blocking: true,
            ..Self::default()
        }
    }

    /// Engine whose runs fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn runs(&self) -> Vec<MockRun> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn active_runs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of runs observed at the same time.
    pub fn max_concurrent_runs(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn offset(&self) -> i32 {
        self.offset.load(Ordering::SeqCst)
    }

    pub fn timing_shift(&self) -> i32 {
        self.timing_shift.load(Ordering::SeqCst)
    }

    pub fn is_stop_raised(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

impl ExecutionEngine for MockEngine {
    fn click_hit_objects(
        &self,
        notes: &[HitObject],
        time_adjustment: i32,
        _enable: bool,
        offset: i32,
        keys: i32,
        custom_keys: Option<&[u16]>,
    ) -> Result<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockRun {
                first_timestamp: notes.first().map(|n| n.timestamp),
                note_count: notes.len(),
                time_adjustment,
                offset,
                keys,
                custom_keys: custom_keys.map(<[u16]>::to_vec),
            });

        while self.blocking && !self.stop.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Engine("mock failure".to_string()));
        }
        Ok(())
    }

    fn set_stop(&self, stop: bool) -> Result<()> {
        self.stop.store(stop, Ordering::SeqCst);
        Ok(())
    }

    fn set_timing_shift(&self, shift: i32) -> Result<()> {
        self.timing_shift.store(shift, Ordering::SeqCst);
        Ok(())
    }

    fn set_offset(&self, offset: i32) -> Result<()> {
        self.offset.store(offset, Ordering::SeqCst);
        Ok(())
    }
}
