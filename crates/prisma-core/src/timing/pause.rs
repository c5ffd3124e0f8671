//! Pause detection from the playback clock alone.
//!
//! The game exposes no pause flag we can rely on, so a clock that stands
//! still for long enough is a pause, a clock that moves again is an
//! unpause, and a clock that jumps backwards is a restart.

use std::time::Instant;

use serde::Serialize;

use crate::timing::TimingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockEvent {
    /// Clock stood still for the freeze threshold
    Pause,
    /// Clock moved forward after a pause
    Unpause,
    /// Clock jumped backwards or reached zero
    Restart { from: i32, to: i32 },
}

#[derive(Debug, Clone, Default)]
pub struct PauseDetector {
    last_clock: Option<i32>,
    paused: bool,
    freeze_start: Option<Instant>,
}

impl PauseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn last_clock(&self) -> Option<i32> {
        self.last_clock
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drop the paused flag without forgetting the last sample.
    pub fn clear_paused(&mut self) {
        self.paused = false;
    }

    /// Forget the last sample so the next one only primes the detector.
    pub fn forget_clock(&mut self) {
        self.last_clock = None;
    }

    /// Feed one clock sample taken at `now`.
    pub fn observe(&mut self, clock: i32, now: Instant, config: &TimingConfig) -> Option<ClockEvent> {
        let Some(last) = self.last_clock else {
            self.last_clock = Some(clock);
            return None;
        };

        let delta = clock as i64 - last as i64;
        let mut event = None;

        if delta > 0 {
            self.freeze_start = None;
            if self.paused {
                self.paused = false;
                event = Some(ClockEvent::Unpause);
            }
        } else if delta == 0 && !self.paused {
            match self.freeze_start {
                None => self.freeze_start = Some(now),
                Some(start) if now.saturating_duration_since(start) >= config.freeze_threshold => {
                    self.paused = true;
                    event = Some(ClockEvent::Pause);
                }
                Some(_) => {}
            }
        } else if delta < 0 && (delta < config.restart_jump_ms as i64 || clock <= 0) {
            self.freeze_start = None;
            self.paused = false;
            event = Some(ClockEvent::Restart {
                from: last,
                to: clock,
            });
        }

        self.last_clock = Some(clock);
        event
    }
}
