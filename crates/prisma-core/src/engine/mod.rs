//! Boundary to the external input engine.
//!
//! The engine itself is a foreign library; this module only describes the
//! calls we make into it and owns the thread that runs it.

mod library;
#[doc(hidden)]
pub mod mock;
mod runner;

pub use library::*;
pub use mock::MockEngine;
pub use runner::*;

use crate::beatmap::HitObject;
use crate::error::Result;

/// Calls exported by the execution engine.
///
/// `click_hit_objects` blocks until the schedule is played out or the stop
/// flag is raised from another thread.
pub trait ExecutionEngine: Send + Sync {
    fn click_hit_objects(
        &self,
        notes: &[HitObject],
        time_adjustment: i32,
        enable: bool,
        offset: i32,
        keys: i32,
        custom_keys: Option<&[u16]>,
    ) -> Result<()>;

    /// Raise or clear the cooperative stop flag.
    fn set_stop(&self, stop: bool) -> Result<()>;

    fn set_timing_shift(&self, shift: i32) -> Result<()>;

    fn set_offset(&self, offset: i32) -> Result<()>;
}

/// Engine that plays nothing, used when only observing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl ExecutionEngine for NullEngine {
    fn click_hit_objects(
        &self,
        notes: &[HitObject],
        _time_adjustment: i32,
        _enable: bool,
        _offset: i32,
        _keys: i32,
        _custom_keys: Option<&[u16]>,
    ) -> Result<()> {
        tracing::debug!("Null engine ignoring {} notes", notes.len());
        Ok(())
    }

    fn set_stop(&self, _stop: bool) -> Result<()> {
        Ok(())
    }

    fn set_timing_shift(&self, _shift: i32) -> Result<()> {
        Ok(())
    }

    fn set_offset(&self, _offset: i32) -> Result<()> {
        Ok(())
    }
}
