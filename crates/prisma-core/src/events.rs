//! Push-style notifications for whatever presents the bot's state.
//!
//! The controller calls these once per tick for values it observed; every
//! method has an empty default so sinks only implement what they show.

use std::fmt;

use serde::Serialize;

use crate::game::{BeatmapInfo, GameState, GameplayData, ModifierSet};
use crate::session::BeatmapSession;
use crate::timing::BotPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionStatus {
    Searching,
    Connected {
        pid: u32,
        resolved: usize,
        total: usize,
    },
    Lost,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Searching => write!(f, "Searching for osu!"),
            ConnectionStatus::Connected {
                pid,
                resolved,
                total,
            } => write!(f, "Connected (PID {}, {}/{} patterns)", pid, resolved, total),
            ConnectionStatus::Lost => write!(f, "Connection lost"),
        }
    }
}

/// Bot status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BotStatus {
    Disabled,
    NoSession,
    NonMania,
    NoSongsDir,
    Ready,
    Phase(BotPhase),
    Completed,
    PlayerDied,
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BotStatus::Disabled => "Disabled",
            BotStatus::NoSession => "Idle",
            BotStatus::NonMania => "Idle (non-mania map)",
            BotStatus::NoSongsDir => "Idle (Songs folder not found)",
            BotStatus::Ready => "Ready - Waiting for PLAY state",
            BotStatus::Phase(BotPhase::Idle) => "Idle",
            BotStatus::Phase(BotPhase::Stabilizing) => "Waiting for audio timer",
            BotStatus::Phase(BotPhase::Waiting) => "Ready - Waiting for audio sync",
            BotStatus::Phase(BotPhase::Running) => "Running",
            BotStatus::Phase(BotPhase::Paused) => "Paused",
            BotStatus::Phase(BotPhase::ResumePending) => "Resuming...",
            BotStatus::Completed => "Completed",
            BotStatus::PlayerDied => "Stopped (Player Died)",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

pub trait EventSink: Send + Sync {
    fn connection(&self, _status: ConnectionStatus) {}
    fn game_state(&self, _state: GameState) {}
    fn beatmap(&self, _info: &BeatmapInfo) {}
    fn session(&self, _session: Option<&BeatmapSession>) {}
    fn mods(&self, _mods: &ModifierSet) {}
    fn audio_time(&self, _audio_time: i32) {}
    fn gameplay(&self, _data: &GameplayData) {}
    fn clear_gameplay(&self) {}
    fn bot_status(&self, _status: BotStatus) {}
    fn first_note_time(&self, _time: i32) {}
    fn timing_shift(&self, _shift: i32) {}
    fn offset(&self, _offset: i32) {}
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(BotStatus::Phase(BotPhase::ResumePending).to_string(), "Resuming...");
        assert_eq!(BotStatus::PlayerDied.to_string(), "Stopped (Player Died)");
        assert_eq!(
            ConnectionStatus::Connected {
                pid: 10,
                resolved: 6,
                total: 7
            }
            .to_string(),
            "Connected (PID 10, 6/7 patterns)"
        );
    }
}
