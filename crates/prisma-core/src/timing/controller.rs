//! The polling loop.
//!
//! Keeps a connection to the game, reads one set of observations per tick,
//! keeps the session current, feeds the state machine and applies its
//! decisions to the engine runner.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::beatmap::{UNKNOWN_MODE, parse_declared_mode};
use crate::config::{BotConfig, Keybinds};
use crate::engine::{EngineRunner, ExecutionEngine, RunRequest};
use crate::error::{Error, Result};
use crate::events::{BotStatus, ConnectionStatus, EventSink, LogLevel};
use crate::game::{BeatmapInfo, GameReader, GameState, GameplayData, ModifierSet};
use crate::offset::BaseAddressTable;
use crate::process::{GameProcess, ProcessInfo, ProcessProvider};
use crate::session::SessionBuilder;
use crate::shutdown::ShutdownSignal;
use crate::timing::control::{self, ControlHandle, ControlState, SharedControls};
use crate::timing::{
    BotPhase, Clock, Decision, MachineEvent, StopReason, SystemClock, Throttle, TickInput,
    TimingConfig, TimingStateMachine,
};

/// Clock distance under which the waiting countdown is logged.
const TIMING_LOG_WINDOW_MS: i32 = 20_000;

struct Connection<T> {
    process: T,
    table: BaseAddressTable,
}

/// What a failed session build was attempted for.
#[derive(Debug, Clone, PartialEq)]
struct SessionKey {
    identifier: String,
    map_id: i32,
    speed_multiplier: f64,
}

impl SessionKey {
    fn new(info: &BeatmapInfo, mods: &ModifierSet) -> Self {
        Self {
            identifier: info.identifier(),
            map_id: info.map_id,
            speed_multiplier: mods.speed_multiplier,
        }
    }
}

/// Observations gathered from the game at the start of a tick.
struct Observation {
    state: Option<GameState>,
    audio_time: Option<i32>,
    mods: Option<ModifierSet>,
    beatmap: Option<BeatmapInfo>,
    gameplay: Option<GameplayData>,
    songs_dir: Option<PathBuf>,
}

/// Declared mode of the last beatmap file looked at.
struct DeclaredMode {
    path: PathBuf,
    mode: i32,
    checked_at: Instant,
}

pub struct Controller<P>
where
    P: ProcessProvider,
    P::Process: GameProcess,
{
    provider: P,
    runner: Arc<EngineRunner>,
    events: Arc<dyn EventSink>,
    shutdown: Arc<ShutdownSignal>,
    controls: SharedControls,
    clock: Arc<dyn Clock>,
    keybinds: Keybinds,
    machine: TimingStateMachine,
    sessions: SessionBuilder,
    connection: Option<Connection<P::Process>>,
    notice: Throttle,
    songs_notice: Throttle,
    timing_log: Throttle,
    rebuild_retry: Throttle,
    failed_build: Option<SessionKey>,
    declared_mode: Option<DeclaredMode>,
    last_state: Option<GameState>,
    last_beatmap: Option<(String, i32)>,
    last_status: Option<BotStatus>,
    held_status: Option<(BotStatus, BotPhase)>,
    idle_status: BotStatus,
}

impl<P> Controller<P>
where
    P: ProcessProvider,
    P::Process: GameProcess,
{
    pub fn new(
        provider: P,
        engine: Arc<dyn ExecutionEngine>,
        config: &BotConfig,
        events: Arc<dyn EventSink>,
        shutdown: Arc<ShutdownSignal>,
    ) -> Self {
        let timing = TimingConfig::default();

        if config.timing_shift != 0 {
            if let Err(e) = engine.set_timing_shift(config.timing_shift) {
                warn!("Failed to apply timing shift: {}", e);
            }
        }
        if let Err(e) = engine.set_offset(config.offset) {
            warn!("Failed to apply offset: {}", e);
        }
        events.offset(config.offset);
        events.timing_shift(config.timing_shift);

        let runner = EngineRunner::new(engine).with_stop_timeout(timing.stop_timeout);
        Self {
            provider,
            runner: Arc::new(runner),
            events,
            shutdown,
            controls: Arc::new(Mutex::new(ControlState {
                offset: config.offset,
                timing_shift: config.timing_shift,
                bot_enabled: config.bot_enabled,
                stop_requested: false,
            })),
            clock: Arc::new(SystemClock),
            keybinds: config.keybinds.clone(),
            sessions: SessionBuilder::new(config.songs_dir.clone()),
            connection: None,
            notice: Throttle::new(timing.notice_interval),
            songs_notice: Throttle::new(timing.notice_interval),
            timing_log: Throttle::new(timing.timing_log_interval),
            rebuild_retry: Throttle::new(timing.notice_interval),
            machine: TimingStateMachine::new(timing),
            failed_build: None,
            declared_mode: None,
            last_state: None,
            last_beatmap: None,
            last_status: None,
            held_status: None,
            idle_status: BotStatus::NoSession,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.notice = Throttle::new(timing.notice_interval);
        self.songs_notice = Throttle::new(timing.notice_interval);
        self.timing_log = Throttle::new(timing.timing_log_interval);
        self.rebuild_retry = Throttle::new(timing.notice_interval);
        self.machine = TimingStateMachine::new(timing);
        self
    }

    /// Replace how the songs directory is resolved.
    pub fn with_session_builder(mut self, sessions: SessionBuilder) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle {
            controls: Arc::clone(&self.controls),
            runner: Arc::clone(&self.runner),
            events: Arc::clone(&self.events),
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    pub fn machine(&self) -> &TimingStateMachine {
        &self.machine
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn is_engine_running(&self) -> bool {
        self.runner.is_running()
    }

    pub fn base_addresses(&self) -> Option<&BaseAddressTable> {
        self.connection.as_ref().map(|c| &c.table)
    }

    /// Poll until shutdown.
    pub fn run(&mut self) {
        info!("Tracking started");
        self.events.connection(ConnectionStatus::Searching);

        while !self.shutdown.is_triggered() {
            if !self.ensure_connected() {
                if self.shutdown.wait(self.machine.config().reconnect_delay) {
                    break;
                }
                continue;
            }

            let delay = match self.tick() {
                Ok(()) => self.machine.config().tick_interval,
                Err(e) => {
                    error!("Tick failed: {}", e);
                    self.machine.config().error_backoff
                }
            };
            if self.shutdown.wait(delay) {
                break;
            }
        }

        self.stop_engine(StopReason::Shutdown);
        info!("Tracking stopped");
    }

    /// Connect to the game if needed. Returns true when a live, scanned
    /// process is available.
    pub fn ensure_connected(&mut self) -> bool {
        if let Some(connection) = &self.connection {
            if connection.process.is_alive() {
                return true;
            }
            warn!("osu! process exited");
            self.disconnect();
            return false;
        }

        let now = self.clock.now();
        let process = match self.provider.find_process() {
            Ok(process) => process,
            Err(e @ Error::ProcessOpenFailed(_)) => {
                if self.notice.ready(now) {
                    self.note(
                        LogLevel::Warn,
                        format!("{}. Try running as Administrator", e),
                    );
                }
                return false;
            }
            Err(e) => {
                if self.notice.ready(now) {
                    debug!("{}", e);
                    self.note(LogLevel::Info, "osu! is not running".to_string());
                }
                return false;
            }
        };

        let mut table = BaseAddressTable::new();
        let summary = table.scan_all(&process);
        let pid = process.pid();

        info!("Connected to osu! (PID {})", pid);
        self.events.connection(ConnectionStatus::Connected {
            pid,
            resolved: summary.resolved,
            total: summary.total,
        });
        self.notice.reset();
        self.connection = Some(Connection { process, table });
        true
    }

    fn disconnect(&mut self) {
        self.stop_engine(StopReason::ProcessExited);
        self.connection = None;
        self.machine.reset();
        self.sessions.forget_songs_dir();
        self.failed_build = None;
        self.declared_mode = None;
        self.last_state = None;
        self.last_beatmap = None;
        self.events.clear_gameplay();
        self.events.session(None);
        self.events.connection(ConnectionStatus::Lost);
    }

    fn stop_engine(&mut self, reason: StopReason) {
        if self.machine.request_stop(reason, self.runner.is_running()).is_some() {
            self.stop_runner(reason);
        }
    }

    fn note(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
        self.events.log(level, &message);
    }

    fn observe(&mut self, now: Instant) -> Option<Observation> {
        let connection = self.connection.as_ref()?;
        let songs_dir = self.sessions.songs_dir(&connection.process);
        let game = GameReader::new(&connection.process, &connection.table);

        let state = game.game_state();
        let gameplay = state
            .filter(GameState::is_playing)
            .and_then(|_| game.gameplay());
        let mut beatmap = game.beatmap_info(None);
        let audio_time = game.audio_time();
        let mods = game.menu_mods();

        if let (Some(info), Some(dir)) = (beatmap.as_mut(), songs_dir.as_deref()) {
            if info.has_file() {
                info.declared_mode = self.declared_mode_of(info.file_path(dir), now);
            }
        }

        Some(Observation {
            state,
            audio_time,
            mods,
            beatmap,
            gameplay,
            songs_dir,
        })
    }

    /// `Mode:` of the file at `path`, cached per path. An unknown mode is
    /// looked up again once the notice interval has passed.
    fn declared_mode_of(&mut self, path: PathBuf, now: Instant) -> i32 {
        let retry_after = self.machine.config().notice_interval;
        if let Some(cached) = &self.declared_mode {
            let stale = cached.mode == UNKNOWN_MODE
                && now.saturating_duration_since(cached.checked_at) >= retry_after;
            if cached.path == path && !stale {
                return cached.mode;
            }
        }

        let mode = parse_declared_mode(&path);
        self.declared_mode = Some(DeclaredMode {
            path,
            mode,
            checked_at: now,
        });
        mode
    }

    /// One iteration of the loop.
    pub fn tick(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.apply_stop_request();

        let Some(observation) = self.observe(now) else {
            return Ok(());
        };
        self.publish_observation(&observation);

        let mods = observation.mods.clone().unwrap_or_default();
        self.refresh_session(&observation, &mods, now);

        let bot_enabled = control::lock(&self.controls).bot_enabled;
        let outcome = self.machine.tick(TickInput {
            now,
            state: observation.state,
            audio_time: observation.audio_time,
            health: observation.gameplay.as_ref().map(|g| g.hp),
            no_fail: mods.mods().is_no_fail(),
            engine_running: self.runner.is_running(),
            bot_enabled,
        });

        for event in &outcome.events {
            self.report(*event);
        }
        let applied: Result<()> = outcome
            .decisions
            .iter()
            .try_for_each(|decision| self.apply(*decision));

        if let (Some(time_to_first), Some(audio_time)) = (outcome.time_to_first, observation.audio_time) {
            if time_to_first.abs() <= TIMING_LOG_WINDOW_MS && self.timing_log.ready(now) {
                debug!(
                    "Clock {} ms, first note in {} ms",
                    audio_time, time_to_first
                );
            }
        }

        self.publish_status(bot_enabled);
        applied
    }

    fn publish_observation(&mut self, observation: &Observation) {
        if let Some(state) = observation.state {
            if Some(state) != self.last_state {
                info!("Game state: {}", state);
                self.events.game_state(state);
                if !state.is_playing() {
                    self.events.clear_gameplay();
                }
                self.last_state = Some(state);
            }
        }
        if let Some(audio_time) = observation.audio_time {
            self.events.audio_time(audio_time);
        }
        if let Some(mods) = &observation.mods {
            self.events.mods(mods);
        }
        if let Some(gameplay) = &observation.gameplay {
            self.events.gameplay(gameplay);
        }
        if let Some(info) = &observation.beatmap {
            let key = (info.identifier(), info.map_id);
            if self.last_beatmap.as_ref() != Some(&key) {
                debug!("Selected beatmap: {} [{}]", info.display_title(), info.difficulty);
                self.events.beatmap(info);
                self.last_beatmap = Some(key);
            }
        }
    }

    fn refresh_session(&mut self, observation: &Observation, mods: &ModifierSet, now: Instant) {
        let Some(info) = observation.beatmap.as_ref().filter(|b| !b.filename.is_empty()) else {
            self.idle_status = BotStatus::NoSession;
            self.drop_session();
            return;
        };

        if observation.songs_dir.is_none() {
            if self.songs_notice.ready(now) {
                self.note(
                    LogLevel::Warn,
                    format!("{}; set [osu] songs_dir in the config", Error::SongsDirNotFound),
                );
            }
            self.idle_status = BotStatus::NoSongsDir;
            self.drop_session();
            return;
        }
        self.songs_notice.reset();

        if !info.is_mania() {
            if self.machine.session().is_some() {
                let mode = info
                    .mode()
                    .map_or_else(|| format!("unknown mode {}", info.declared_mode), |m| m.to_string());
                info!("Selected a {} beatmap; bot idle", mode);
            }
            self.idle_status = BotStatus::NonMania;
            self.drop_session();
            return;
        }
        self.idle_status = BotStatus::NoSession;

        if !SessionBuilder::needs_rebuild(self.machine.session().map(|s| &**s), info, mods) {
            return;
        }

        let key = SessionKey::new(info, mods);
        if self.failed_build.as_ref() == Some(&key) && !self.rebuild_retry.ready(now) {
            return;
        }

        if self.machine.replace_session(None, self.runner.is_running()).is_some() {
            self.stop_runner(StopReason::NewBeatmap);
        }

        let Some(connection) = self.connection.as_ref() else {
            return;
        };
        match self.sessions.build(&connection.process, info, mods) {
            Ok(session) => {
                self.failed_build = None;
                self.events.session(Some(&session));
                self.events.first_note_time(session.first_hit_time_original);
                self.machine.replace_session(Some(session), false);
            }
            Err(e) => {
                if self.failed_build.as_ref() != Some(&key) {
                    let level = match e {
                        Error::EmptyBeatmap(_) => LogLevel::Info,
                        _ => LogLevel::Warn,
                    };
                    self.note(level, format!("Cannot prepare {}: {}", key.identifier, e));
                    self.rebuild_retry.reset();
                    self.rebuild_retry.ready(now);
                }
                self.failed_build = Some(key);
                self.events.session(None);
            }
        }
    }

    fn drop_session(&mut self) {
        if self.machine.session().is_some() {
            self.machine.clear_session();
            self.events.session(None);
        }
        self.failed_build = None;
    }

    fn apply_stop_request(&mut self) {
        let requested = std::mem::take(&mut control::lock(&self.controls).stop_requested);
        if requested {
            self.stop_engine(StopReason::Requested);
        }
    }

    fn apply(&self, decision: Decision) -> Result<()> {
        match decision {
            Decision::Stop { reason } => {
                self.stop_runner(reason);
                Ok(())
            }
            Decision::Start {
                start_index,
                audio_time,
                delta,
            } => self.start_runner(start_index, audio_time, delta),
        }
    }

    fn stop_runner(&self, reason: StopReason) {
        let _controls = control::lock(&self.controls);
        if self.runner.stop() {
            info!("Engine stopped ({})", reason);
        }
    }

    fn start_runner(&self, start_index: usize, audio_time: i32, delta: i32) -> Result<()> {
        let Some(session) = self.machine.session().cloned() else {
            return Ok(());
        };
        let controls = control::lock(&self.controls);
        let request = RunRequest {
            custom_keys: self.keybinds.get(&session.keys).cloned(),
            session,
            start_index,
            audio_time,
            offset: controls.offset,
            timing_shift: controls.timing_shift,
        };
        debug!("Starting engine {} ms from target", delta);
        if !self.runner.start(request)? {
            debug!("Engine start skipped");
        }
        Ok(())
    }

    fn report(&mut self, event: MachineEvent) {
        match event {
            MachineEvent::EnteredPlay => {
                info!("Entered play; waiting for the audio clock to stabilize")
            }
            MachineEvent::LeftPlay(state) => debug!("Left play for {}", state),
            MachineEvent::PlayerDied => {
                self.note(LogLevel::Warn, "Player died; bot stopped".to_string());
                self.hold_status(BotStatus::PlayerDied);
            }
            MachineEvent::Stabilized { .. } => {}
            MachineEvent::Paused { audio_time } => {
                self.note(LogLevel::Info, format!("Pause detected at {} ms", audio_time))
            }
            MachineEvent::Unpaused { audio_time } => {
                self.note(LogLevel::Info, format!("Unpaused at {} ms", audio_time))
            }
            MachineEvent::ResumeScheduled { index, target_time } => self.note(
                LogLevel::Info,
                format!("Resuming from note {} at {} ms", index, target_time),
            ),
            MachineEvent::ResumeCancelled => debug!("Resume dropped: bot disabled"),
            MachineEvent::Completed => {
                self.note(LogLevel::Info, "No notes left after unpause".to_string());
                self.hold_status(BotStatus::Completed);
            }
            MachineEvent::Restarted { from, to } => self.note(
                LogLevel::Info,
                format!("Restart detected: clock jumped from {} to {} ms", from, to),
            ),
        }
    }

    /// Show `status` until the phase changes.
    fn hold_status(&mut self, status: BotStatus) {
        self.held_status = Some((status, self.machine.phase()));
        self.last_status = Some(status);
        self.events.bot_status(status);
    }

    fn publish_status(&mut self, bot_enabled: bool) {
        let phase = self.machine.phase();
        if let Some((_, held_phase)) = self.held_status {
            if held_phase == phase {
                return;
            }
            self.held_status = None;
        }

        let status = if !bot_enabled {
            BotStatus::Disabled
        } else if phase == BotPhase::Idle {
            match self.machine.session() {
                Some(_) => BotStatus::Ready,
                None => self.idle_status,
            }
        } else {
            BotStatus::Phase(phase)
        };

        if self.last_status != Some(status) {
            self.last_status = Some(status);
            self.events.bot_status(status);
        }
    }
}

impl<P> Drop for Controller<P>
where
    P: ProcessProvider,
    P::Process: GameProcess,
{
    fn drop(&mut self) {
        self.runner.stop();
    }
}
