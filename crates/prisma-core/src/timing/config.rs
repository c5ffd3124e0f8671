use std::time::Duration;

/// Timing thresholds used by the state machine and the polling loop.
pub mod defaults {
    use std::time::Duration;

    pub const DEBOUNCE: Duration = Duration::from_millis(200);
    pub const FORCED_STABILIZATION: Duration = Duration::from_secs(3);
    pub const FORCED_LEAD_MS: i32 = 1000;
    pub const PREROLL_FLOOR_MS: i32 = -5000;
    pub const FREEZE_THRESHOLD: Duration = Duration::from_millis(200);
    pub const RESTART_JUMP_MS: i32 = -100;
    pub const START_TOLERANCE_MS: i32 = 20;

    pub const TICK_INTERVAL: Duration = Duration::from_millis(1);
    pub const ERROR_BACKOFF: Duration = Duration::from_millis(500);
    pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);
    pub const NOTICE_INTERVAL: Duration = Duration::from_secs(5);
    pub const TIMING_LOG_INTERVAL: Duration = Duration::from_millis(500);
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    /// No stabilization decision is taken this soon after entering play
    pub debounce: Duration,
    /// After this long in play the clock is accepted without a pre-roll
    pub forced_stabilization: Duration,
    /// Minimum distance to the first note for a forced acceptance
    pub forced_lead_ms: i32,
    /// Lowest clock value accepted as pre-roll
    pub preroll_floor_ms: i32,
    /// How long the clock must stand still to count as paused
    pub freeze_threshold: Duration,
    /// Clock jumps below this delta are restarts
    pub restart_jump_ms: i32,
    /// Window around the first note (or resume target) that starts the engine
    pub start_tolerance_ms: i32,

    pub tick_interval: Duration,
    pub error_backoff: Duration,
    pub reconnect_delay: Duration,
    pub notice_interval: Duration,
    pub timing_log_interval: Duration,
    pub stop_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce: defaults::DEBOUNCE,
            forced_stabilization: defaults::FORCED_STABILIZATION,
            forced_lead_ms: defaults::FORCED_LEAD_MS,
            preroll_floor_ms: defaults::PREROLL_FLOOR_MS,
            freeze_threshold: defaults::FREEZE_THRESHOLD,
            restart_jump_ms: defaults::RESTART_JUMP_MS,
            start_tolerance_ms: defaults::START_TOLERANCE_MS,
            tick_interval: defaults::TICK_INTERVAL,
            error_backoff: defaults::ERROR_BACKOFF,
            reconnect_delay: defaults::RECONNECT_DELAY,
            notice_interval: defaults::NOTICE_INTERVAL,
            timing_log_interval: defaults::TIMING_LOG_INTERVAL,
            stop_timeout: defaults::STOP_TIMEOUT,
        }
    }
}

impl TimingConfig {
    pub fn within_start_window(&self, target: i32, audio_time: i32) -> bool {
        (target as i64 - audio_time as i64).abs() <= self.start_tolerance_ms as i64
    }
}
