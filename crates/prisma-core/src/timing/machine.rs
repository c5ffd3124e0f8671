//! Play-session timing state machine.
//!
//! Pure logic: every tick consumes one [`TickInput`] and returns the
//! engine decisions and notable events for that tick. Applying decisions
//! is the controller's job.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use strum::IntoStaticStr;
use tracing::{debug, info};

use crate::game::GameState;
use crate::session::BeatmapSession;
use crate::timing::{ClockEvent, PauseDetector, TimingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr)]
pub enum BotPhase {
    /// No playable session or not on the play screen
    Idle,
    /// On the play screen, clock not yet trusted
    Stabilizing,
    /// Clock trusted, first note not reached
    Waiting,
    Running,
    Paused,
    ResumePending,
}

impl BotPhase {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for BotPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr)]
pub enum StopReason {
    #[strum(serialize = "state change")]
    StateChange,
    #[strum(serialize = "player death")]
    PlayerDeath,
    #[strum(serialize = "new beatmap")]
    NewBeatmap,
    #[strum(serialize = "pause detected")]
    Pause,
    #[strum(serialize = "restart detected")]
    Restart,
    #[strum(serialize = "requested")]
    Requested,
    #[strum(serialize = "process exited")]
    ProcessExited,
    #[strum(serialize = "shutdown")]
    Shutdown,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// A pause keeps the clock trusted; every other stop re-stabilizes.
    pub fn keeps_stabilization(&self) -> bool {
        matches!(self, StopReason::Pause)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the controller must do with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// Start the engine at note `start_index`; `delta` is the distance from
    /// the clock to the target note.
    Start {
        start_index: usize,
        audio_time: i32,
        delta: i32,
    },
    Stop { reason: StopReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MachineEvent {
    EnteredPlay,
    LeftPlay(GameState),
    PlayerDied,
    Stabilized { audio_time: i32, forced: bool },
    Paused { audio_time: i32 },
    Unpaused { audio_time: i32 },
    ResumeScheduled { index: usize, target_time: i32 },
    ResumeCancelled,
    /// Unpaused after the last note
    Completed,
    Restarted { from: i32, to: i32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// At most one stop followed by at most one start
    pub decisions: Vec<Decision>,
    pub events: Vec<MachineEvent>,
    /// Distance from the clock to the first note while waiting
    pub time_to_first: Option<i32>,
}

impl TickOutcome {
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty() && self.events.is_empty()
    }
}

/// Observations for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub now: Instant,
    pub state: Option<GameState>,
    pub audio_time: Option<i32>,
    /// Health fraction, only while on the play screen
    pub health: Option<f64>,
    pub no_fail: bool,
    pub engine_running: bool,
    pub bot_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResumeTarget {
    index: usize,
    time: i32,
}

#[derive(Debug)]
pub struct TimingStateMachine {
    config: TimingConfig,
    session: Option<Arc<BeatmapSession>>,
    last_state: Option<GameState>,
    play_entered_at: Option<Instant>,
    stabilized: bool,
    pause_detection: bool,
    detector: PauseDetector,
    resume: Option<ResumeTarget>,
    player_died: bool,
    running: bool,
}

impl TimingStateMachine {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            session: None,
            last_state: None,
            play_entered_at: None,
            stabilized: false,
            pause_detection: false,
            detector: PauseDetector::new(),
            resume: None,
            player_died: false,
            running: false,
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Arc<BeatmapSession>> {
        self.session.as_ref()
    }

    pub fn is_stabilized(&self) -> bool {
        self.stabilized
    }

    pub fn is_paused(&self) -> bool {
        self.detector.is_paused()
    }

    pub fn phase(&self) -> BotPhase {
        if self.last_state != Some(GameState::Play) || self.session.is_none() {
            BotPhase::Idle
        } else if self.running {
            BotPhase::Running
        } else if self.detector.is_paused() {
            BotPhase::Paused
        } else if self.resume.is_some() {
            BotPhase::ResumePending
        } else if !self.stabilized {
            BotPhase::Stabilizing
        } else {
            BotPhase::Waiting
        }
    }

    /// Install a freshly built session, or none when building failed.
    ///
    /// A running engine belongs to the old session and is stopped.
    pub fn replace_session(
        &mut self,
        session: Option<Arc<BeatmapSession>>,
        engine_running: bool,
    ) -> Option<Decision> {
        self.running = engine_running;
        let mut outcome = TickOutcome::default();
        self.stop(StopReason::NewBeatmap, &mut outcome);
        self.session = session;
        outcome.decisions.pop()
    }

    /// Drop the session without touching the engine (non-mania map, no
    /// beatmap selected).
    pub fn clear_session(&mut self) {
        if self.session.take().is_some() {
            debug!("Session cleared");
        }
    }

    /// Forget everything tied to the current process.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Request a stop from outside the tick (user action, shutdown).
    pub fn request_stop(&mut self, reason: StopReason, engine_running: bool) -> Option<Decision> {
        self.running = engine_running;
        let mut outcome = TickOutcome::default();
        self.stop(reason, &mut outcome);
        outcome.decisions.pop()
    }

    fn stop(&mut self, reason: StopReason, outcome: &mut TickOutcome) {
        if !self.running {
            return;
        }
        self.running = false;
        outcome.decisions.push(Decision::Stop { reason });
        if !reason.keeps_stabilization() {
            self.stabilized = false;
        }
    }

    fn start(&mut self, start_index: usize, audio_time: i32, delta: i32, outcome: &mut TickOutcome) {
        if self.running {
            return;
        }
        self.running = true;
        outcome.decisions.push(Decision::Start {
            start_index,
            audio_time,
            delta,
        });
    }

    fn reset_play(&mut self) {
        self.stabilized = false;
        self.pause_detection = false;
        self.detector.reset();
        self.resume = None;
    }

    pub fn tick(&mut self, input: TickInput) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        self.running = input.engine_running;

        if let Some(state) = input.state {
            if Some(state) != self.last_state {
                self.last_state = Some(state);
                if state.is_playing() {
                    self.play_entered_at = Some(input.now);
                    self.reset_play();
                    self.player_died = false;
                    outcome.events.push(MachineEvent::EnteredPlay);
                } else {
                    self.stop(StopReason::StateChange, &mut outcome);
                    self.reset_play();
                    outcome.events.push(MachineEvent::LeftPlay(state));
                }
                return outcome;
            }
        }

        let playing = self.last_state == Some(GameState::Play);
        if !playing {
            self.player_died = false;
            self.detector.clear_paused();
            return outcome;
        }

        if let Some(health) = input.health {
            if health <= 0.0 && !self.player_died && !input.no_fail {
                self.player_died = true;
                outcome.events.push(MachineEvent::PlayerDied);
                self.stop(StopReason::PlayerDeath, &mut outcome);
            }
        }

        let Some(session) = self.session.clone() else {
            self.detector.clear_paused();
            return outcome;
        };
        let Some(audio_time) = input.audio_time else {
            return outcome;
        };

        if !self.stabilized && !self.try_stabilize(&session, audio_time, input.now, &mut outcome) {
            return outcome;
        }

        if audio_time < 0 {
            return outcome;
        }

        if self.pause_detection {
            match self.detector.observe(audio_time, input.now, &self.config) {
                Some(ClockEvent::Pause) => {
                    outcome.events.push(MachineEvent::Paused { audio_time });
                    self.stop(StopReason::Pause, &mut outcome);
                }
                Some(ClockEvent::Unpause) => {
                    outcome.events.push(MachineEvent::Unpaused { audio_time });
                    self.schedule_resume(&session, audio_time, &mut outcome);
                }
                Some(ClockEvent::Restart { from, to }) => {
                    outcome.events.push(MachineEvent::Restarted { from, to });
                    self.stop(StopReason::Restart, &mut outcome);
                    self.stabilized = false;
                    self.play_entered_at = Some(input.now);
                    self.resume = None;
                }
                None => {}
            }
        }

        if self.detector.is_paused() {
            return outcome;
        }

        if let Some(target) = self.resume {
            if !self.running {
                if !input.bot_enabled {
                    self.resume = None;
                    outcome.events.push(MachineEvent::ResumeCancelled);
                    return outcome;
                }
                let delta = time_until(target.time, audio_time);
                if self.config.within_start_window(target.time, audio_time) {
                    self.resume = None;
                    info!("Resuming at note {} ({} ms)", target.index, target.time);
                    self.start(target.index, audio_time, delta, &mut outcome);
                }
                return outcome;
            }
        }

        let time_to_first = time_until(session.first_hit_time_original, audio_time);
        outcome.time_to_first = Some(time_to_first);

        if !self.running
            && input.bot_enabled
            && self
                .config
                .within_start_window(session.first_hit_time_original, audio_time)
        {
            self.start(0, audio_time, time_to_first, &mut outcome);
        }

        outcome
    }

    /// Returns true once the clock is trusted.
    fn try_stabilize(
        &mut self,
        session: &BeatmapSession,
        audio_time: i32,
        now: Instant,
        outcome: &mut TickOutcome,
    ) -> bool {
        self.detector.clear_paused();

        let entered = *self.play_entered_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(entered);
        if elapsed < self.config.debounce {
            return false;
        }

        let first = session.first_hit_time_original;
        let forced = if (self.config.preroll_floor_ms..first).contains(&audio_time) {
            false
        } else if elapsed > self.config.forced_stabilization
            && (audio_time as i64) < first as i64 - self.config.forced_lead_ms as i64
        {
            true
        } else {
            return false;
        };

        self.stabilized = true;
        self.pause_detection = true;
        if forced {
            info!("Clock did not settle; forcing stabilization at {} ms", audio_time);
        } else {
            info!(
                "Clock stabilized at {} ms, first note at {} ms",
                audio_time, first
            );
        }
        outcome.events.push(MachineEvent::Stabilized { audio_time, forced });
        true
    }

    fn schedule_resume(&mut self, session: &BeatmapSession, audio_time: i32, outcome: &mut TickOutcome) {
        match session.next_note_after(audio_time) {
            Some(index) => {
                let target_time = session.notes[index].original_time(session.speed_multiplier);
                self.resume = Some(ResumeTarget {
                    index,
                    time: target_time,
                });
                outcome
                    .events
                    .push(MachineEvent::ResumeScheduled { index, target_time });
            }
            None => {
                self.resume = None;
                outcome.events.push(MachineEvent::Completed);
            }
        }
    }
}

/// Milliseconds from `audio_time` to `target`, saturating at the `i32` range.
fn time_until(target: i32, audio_time: i32) -> i32 {
    target.saturating_sub(audio_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::beatmap::{HitObject, LaneReport};

    fn session(times: &[i32]) -> Arc<BeatmapSession> {
        let notes: Vec<HitObject> = times
            .iter()
            .map(|&t| HitObject {
                x: 64,
                y: 192,
                timestamp: t,
                object_type: 1,
                end_time: t,
            })
            .collect();
        Arc::new(BeatmapSession {
            identifier: "set/map.osu".to_string(),
            map_id: 1,
            title: "A - B".to_string(),
            difficulty: "4K".to_string(),
            path: "set/map.osu".into(),
            keys: 1,
            lane_positions: vec![64],
            first_hit_time: times[0],
            first_hit_time_original: times[0],
            notes,
            mods: "NM".to_string(),
            speed_multiplier: 1.0,
            lanes: LaneReport {
                declared_keys: 1,
                observed_keys: 1,
                keys: 1,
                lane_positions: vec![64],
                remapped: false,
            },
        })
    }

    struct Harness {
        machine: TimingStateMachine,
        start: Instant,
        elapsed: Duration,
        running: bool,
    }

    impl Harness {
        fn new(times: &[i32]) -> Self {
            let mut machine = TimingStateMachine::new(TimingConfig::default());
            machine.replace_session(Some(session(times)), false);
            Self {
                machine,
                start: Instant::now(),
                elapsed: Duration::ZERO,
                running: false,
            }
        }

        fn tick_at(&mut self, after: Duration, state: GameState, audio: Option<i32>) -> TickOutcome {
            self.elapsed += after;
            let outcome = self.machine.tick(TickInput {
                now: self.start + self.elapsed,
                state: Some(state),
                audio_time: audio,
                health: None,
                no_fail: false,
                engine_running: self.running,
                bot_enabled: true,
            });
            for decision in &outcome.decisions {
                match decision {
                    Decision::Start { .. } => self.running = true,
                    Decision::Stop { .. } => self.running = false,
                }
            }
            outcome
        }

        fn play(&mut self, after_ms: u64, audio: i32) -> TickOutcome {
            self.tick_at(Duration::from_millis(after_ms), GameState::Play, Some(audio))
        }

        /// Enter play and stabilize at `audio`.
        fn stabilized_at(times: &[i32], audio: i32) -> Self {
            let mut harness = Self::new(times);
            harness.play(0, audio);
            let outcome = harness.play(250, audio);
            assert!(outcome.events.contains(&MachineEvent::Stabilized {
                audio_time: audio,
                forced: false
            }));
            harness
        }
    }

    #[test]
    fn test_time_until_saturates() {
        assert_eq!(time_until(1000, 980), 20);
        assert_eq!(time_until(980, 1000), -20);
        assert_eq!(time_until(i32::MIN + 10, 1000), i32::MIN);
        assert_eq!(time_until(i32::MAX, -1000), i32::MAX);
    }

    #[test]
    fn test_idle_outside_play() {
        let mut harness = Harness::new(&[1000]);
        harness.tick_at(Duration::ZERO, GameState::SelectPlay, Some(0));
        assert_eq!(harness.machine.phase(), BotPhase::Idle);
    }

    #[test]
    fn test_debounce_then_stabilize() {
        let mut harness = Harness::new(&[1000]);
        let outcome = harness.play(0, -2000);
        assert_eq!(outcome.events, vec![MachineEvent::EnteredPlay]);
        assert_eq!(harness.machine.phase(), BotPhase::Stabilizing);

        // Inside the debounce window
        assert!(harness.play(100, -1900).is_empty());
        assert!(!harness.machine.is_stabilized());

        let outcome = harness.play(150, -1750);
        assert!(outcome.events.contains(&MachineEvent::Stabilized {
            audio_time: -1750,
            forced: false
        }));
        assert_eq!(harness.machine.phase(), BotPhase::Waiting);
    }

    #[test]
    fn test_clock_past_first_note_never_stabilizes_early() {
        let mut harness = Harness::new(&[1000]);
        harness.play(0, 5000);
        harness.play(500, 5000);
        assert!(!harness.machine.is_stabilized());
    }

    #[test]
    fn test_forced_stabilization() {
        let mut harness = Harness::new(&[10_000]);
        harness.play(0, -8000);
        // Below the pre-roll floor: only the forced path can accept
        assert!(harness.play(2000, -8000).events.is_empty());
        let outcome = harness.play(1500, -7000);
        assert!(outcome.events.contains(&MachineEvent::Stabilized {
            audio_time: -7000,
            forced: true
        }));
    }

    #[test]
    fn test_forced_stabilization_needs_lead() {
        let mut harness = Harness::new(&[1000]);
        harness.play(0, 1200);
        harness.play(3500, 1200);
        assert!(!harness.machine.is_stabilized());
    }

    #[test]
    fn test_start_within_tolerance() {
        let mut harness = Harness::stabilized_at(&[1000, 1500], 0);
        assert!(harness.play(1, 979).decisions.is_empty());

        let outcome = harness.play(1, 985);
        assert_eq!(
            outcome.decisions,
            vec![Decision::Start {
                start_index: 0,
                audio_time: 985,
                delta: 15
            }]
        );
        assert_eq!(harness.machine.phase(), BotPhase::Running);

        // Already running
        assert!(harness.play(1, 990).decisions.is_empty());
    }

    #[test]
    fn test_bot_disabled_never_starts() {
        let mut harness = Harness::stabilized_at(&[1000], 0);
        let outcome = harness.machine.tick(TickInput {
            now: harness.start + Duration::from_secs(1),
            state: Some(GameState::Play),
            audio_time: Some(1000),
            health: None,
            no_fail: false,
            engine_running: false,
            bot_enabled: false,
        });
        assert!(outcome.decisions.is_empty());
    }

    #[test]
    fn test_leaving_play_stops_and_resets() {
        let mut harness = Harness::stabilized_at(&[1000], 0);
        harness.play(1, 1000);
        assert!(harness.running);

        let outcome = harness.tick_at(Duration::from_millis(1), GameState::Rank, Some(1200));
        assert_eq!(
            outcome.decisions,
            vec![Decision::Stop {
                reason: StopReason::StateChange
            }]
        );
        assert_eq!(outcome.events, vec![MachineEvent::LeftPlay(GameState::Rank)]);
        assert!(!harness.machine.is_stabilized());
        assert_eq!(harness.machine.phase(), BotPhase::Idle);
    }

    #[test]
    fn test_pause_stops_without_destabilizing() {
        let mut harness = Harness::stabilized_at(&[1000, 3000], 0);
        harness.play(1, 1000);
        assert!(harness.running);

        harness.play(100, 1500);
        harness.play(200, 1500);
        let outcome = harness.play(200, 1500);
        assert_eq!(
            outcome.decisions,
            vec![Decision::Stop {
                reason: StopReason::Pause
            }]
        );
        assert!(harness.machine.is_stabilized());
        assert_eq!(harness.machine.phase(), BotPhase::Paused);
    }

    #[test]
    fn test_unpause_resumes_at_next_note() {
        let mut harness = Harness::stabilized_at(&[1000, 3000, 4000], 0);
        harness.play(1, 1000);
        harness.play(100, 1500);
        harness.play(200, 1500);
        harness.play(200, 1500);
        assert_eq!(harness.machine.phase(), BotPhase::Paused);

        let outcome = harness.play(100, 1510);
        assert!(outcome.events.contains(&MachineEvent::ResumeScheduled {
            index: 1,
            target_time: 3000
        }));
        assert_eq!(harness.machine.phase(), BotPhase::ResumePending);

        assert!(harness.play(100, 2000).decisions.is_empty());
        let outcome = harness.play(100, 2990);
        assert_eq!(
            outcome.decisions,
            vec![Decision::Start {
                start_index: 1,
                audio_time: 2990,
                delta: 10
            }]
        );
    }

    #[test]
    fn test_unpause_after_last_note_completes() {
        let mut harness = Harness::stabilized_at(&[1000], 0);
        harness.play(1, 1000);
        harness.play(100, 1500);
        harness.play(200, 1500);
        harness.play(200, 1500);

        let outcome = harness.play(100, 1600);
        assert!(outcome.events.contains(&MachineEvent::Completed));
        assert_eq!(harness.machine.phase(), BotPhase::Waiting);
        assert!(harness.play(1, 1601).decisions.is_empty());
    }

    #[test]
    fn test_restart_clears_stabilization() {
        let mut harness = Harness::stabilized_at(&[1000, 3000], 0);
        harness.play(1, 1000);
        harness.play(100, 5000);

        let outcome = harness.play(10, 0);
        assert!(outcome.events.contains(&MachineEvent::Restarted { from: 5000, to: 0 }));
        assert!(outcome.decisions.contains(&Decision::Stop {
            reason: StopReason::Restart
        }));
        assert!(!harness.machine.is_stabilized());
    }

    #[test]
    fn test_restart_while_paused() {
        let mut harness = Harness::stabilized_at(&[1000, 3000], 0);
        harness.play(1, 5000);
        harness.play(200, 5000);
        harness.play(200, 5000);
        assert!(harness.machine.is_paused());

        let outcome = harness.play(10, 0);
        assert!(outcome.events.contains(&MachineEvent::Restarted { from: 5000, to: 0 }));
        assert!(!harness.machine.is_stabilized());
        assert!(!harness.machine.is_paused());
    }

    #[test]
    fn test_player_death_stops_once() {
        let mut harness = Harness::stabilized_at(&[1000, 3000], 0);
        harness.play(1, 1000);

        let mut dead = TickInput {
            now: harness.start + Duration::from_secs(2),
            state: Some(GameState::Play),
            audio_time: Some(1200),
            health: Some(0.0),
            no_fail: false,
            engine_running: true,
            bot_enabled: true,
        };
        let outcome = harness.machine.tick(dead);
        assert!(outcome.events.contains(&MachineEvent::PlayerDied));
        assert!(outcome.decisions.contains(&Decision::Stop {
            reason: StopReason::PlayerDeath
        }));

        dead.engine_running = false;
        dead.audio_time = Some(1201);
        let outcome = harness.machine.tick(dead);
        assert!(!outcome.events.contains(&MachineEvent::PlayerDied));
    }

    #[test]
    fn test_no_fail_survives_zero_health() {
        let mut harness = Harness::stabilized_at(&[1000, 3000], 0);
        let outcome = harness.machine.tick(TickInput {
            now: harness.start + Duration::from_secs(2),
            state: Some(GameState::Play),
            audio_time: Some(1200),
            health: Some(0.0),
            no_fail: true,
            engine_running: true,
            bot_enabled: true,
        });
        assert!(outcome.decisions.is_empty());
    }

    #[test]
    fn test_new_session_stops_running_engine() {
        let mut machine = TimingStateMachine::new(TimingConfig::default());
        assert_eq!(machine.replace_session(Some(session(&[1000])), false), None);
        assert_eq!(
            machine.replace_session(Some(session(&[2000])), true),
            Some(Decision::Stop {
                reason: StopReason::NewBeatmap
            })
        );
        assert_eq!(machine.session().map(|s| s.first_hit_time), Some(2000));
    }

    #[test]
    fn test_stop_reason_strings() {
        assert_eq!(StopReason::Pause.as_str(), "pause detected");
        assert_eq!(StopReason::NewBeatmap.to_string(), "new beatmap");
        assert!(StopReason::Pause.keeps_stabilization());
        assert!(!StopReason::Restart.keeps_stabilization());
    }
}
