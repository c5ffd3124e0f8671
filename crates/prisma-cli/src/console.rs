//! Console output with colored display.

use std::fmt::Write as _;
use std::sync::Mutex;

use owo_colors::OwoColorize;
use prisma_core::events::{BotStatus, ConnectionStatus, EventSink, LogLevel};
use prisma_core::game::{BeatmapInfo, GameState, ModifierSet};
use prisma_core::timing::BotPhase;
use prisma_core::BeatmapSession;

/// Prints state changes to stdout.
///
/// Per-tick values (clock, counters) are not shown; everything else the
/// controller reports only on change.
#[derive(Default)]
pub struct ConsoleSink {
    last_mods: Mutex<Option<String>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for ConsoleSink {
    fn connection(&self, status: ConnectionStatus) {
        let line = status.to_string();
        match status {
            ConnectionStatus::Connected { .. } => println!("{}", line.green()),
            ConnectionStatus::Lost => println!("{}", line.red()),
            ConnectionStatus::Searching => println!("{}", line.dimmed()),
        }
    }

    fn game_state(&self, state: GameState) {
        println!("State: {}", state.as_str().bold());
    }

    fn beatmap(&self, info: &BeatmapInfo) {
        println!(
            "Selected: {} [{}]",
            info.display_title(),
            info.difficulty.cyan()
        );
    }

    fn session(&self, session: Option<&BeatmapSession>) {
        if let Some(session) = session {
            println!("{}", format_session(session));
        }
    }

    fn mods(&self, mods: &ModifierSet) {
        let mut last = self
            .last_mods
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.as_deref() != Some(mods.display.as_str()) {
            println!("Mods: {}", mods.display.yellow());
            *last = Some(mods.display.clone());
        }
    }

    fn bot_status(&self, status: BotStatus) {
        println!("Bot: {}", format_status(status));
    }

    fn timing_shift(&self, shift: i32) {
        println!("Timing shift: {} ms", shift);
    }

    fn offset(&self, offset: i32) {
        println!("Offset: {} ms", offset);
    }

    fn log(&self, level: LogLevel, message: &str) {
        // Already emitted through tracing; only surface errors on stdout
        if level == LogLevel::Error {
            println!("{}", message.red());
        }
    }
}

fn format_status(status: BotStatus) -> String {
    let text = status.to_string();
    match status {
        BotStatus::Phase(BotPhase::Running) => text.green().bold().to_string(),
        BotStatus::Phase(BotPhase::Paused) | BotStatus::Phase(BotPhase::ResumePending) => {
            text.yellow().to_string()
        }
        BotStatus::PlayerDied | BotStatus::NoSongsDir => text.red().to_string(),
        BotStatus::Completed => text.cyan().to_string(),
        BotStatus::Disabled | BotStatus::NonMania | BotStatus::NoSession => {
            text.dimmed().to_string()
        }
        _ => text,
    }
}

/// Boxed summary of a prepared session.
pub fn format_session(session: &BeatmapSession) -> String {
    let mut output = String::new();

    let title = format!("  {} [{}]", session.title, session.difficulty);
    let border = "━".repeat(title.chars().count().max(50));
    let border_dim = border.dimmed();

    let lanes = if session.lanes.remapped {
        format!(
            "{}K ({} lanes remapped)",
            session.keys,
            session.lanes.observed_keys.to_string().yellow()
        )
    } else {
        format!("{}K", session.keys)
    };

    let _ = writeln!(output, "{}", border_dim);
    let _ = writeln!(output, "{}", title.bold());
    let _ = writeln!(output, "{}", border_dim);
    let _ = writeln!(output, "  KEYS   : {}", lanes);
    let _ = writeln!(output, "  NOTES  : {}", session.note_count());
    let _ = writeln!(
        output,
        "  MODS   : {} ({:.2}x)",
        session.mods, session.speed_multiplier
    );
    let _ = writeln!(
        output,
        "  FIRST  : {} ms ({} ms adjusted)",
        session.first_hit_time_original, session.first_hit_time
    );
    let _ = write!(output, "{}", border_dim);

    output
}
