use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::engine::EngineRunner;
use crate::events::EventSink;
use crate::shutdown::ShutdownSignal;

/// Values an interactive surface may change while the loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub offset: i32,
    pub timing_shift: i32,
    pub bot_enabled: bool,
    pub(crate) stop_requested: bool,
}

/// Shared lock over [`ControlState`], also held across engine start/stop.
pub(crate) type SharedControls = Arc<Mutex<ControlState>>;

pub(crate) fn lock(controls: &SharedControls) -> MutexGuard<'_, ControlState> {
    controls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle to steer a running controller.
#[derive(Clone)]
pub struct ControlHandle {
    pub(crate) controls: SharedControls,
    pub(crate) runner: Arc<EngineRunner>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) shutdown: Arc<ShutdownSignal>,
}

impl ControlHandle {
    pub fn state(&self) -> ControlState {
        lock(&self.controls).clone()
    }

    pub fn set_offset(&self, offset: i32) {
        let mut controls = lock(&self.controls);
        controls.offset = offset;
        if let Err(e) = self.runner.set_offset(offset) {
            warn!("Failed to apply offset: {}", e);
        }
        drop(controls);
        info!("Offset set to {} ms", offset);
        self.events.offset(offset);
    }

    pub fn adjust_offset(&self, delta: i32) -> i32 {
        let offset = lock(&self.controls).offset.saturating_add(delta);
        self.set_offset(offset);
        offset
    }

    pub fn set_timing_shift(&self, shift: i32) {
        let mut controls = lock(&self.controls);
        controls.timing_shift = shift;
        if let Err(e) = self.runner.set_timing_shift(shift) {
            warn!("Failed to apply timing shift: {}", e);
        }
        drop(controls);
        info!("Timing shift set to {} ms", shift);
        self.events.timing_shift(shift);
    }

    pub fn set_bot_enabled(&self, enabled: bool) {
        let mut controls = lock(&self.controls);
        controls.bot_enabled = enabled;
        if !enabled {
            controls.stop_requested = true;
        }
    }

    /// Flip the bot switch and return the new value.
    pub fn toggle_bot(&self) -> bool {
        let enabled = !lock(&self.controls).bot_enabled;
        self.set_bot_enabled(enabled);
        enabled
    }

    /// Stop the current run on the next tick.
    pub fn request_stop(&self) {
        lock(&self.controls).stop_requested = true;
    }

    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }
}
