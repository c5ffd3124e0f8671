//! Offline beatmap parsing.

use std::path::Path;

use anyhow::{Context, Result};
use prisma_core::BeatmapSession;
use prisma_core::beatmap::{circle_size, parse_declared_mode};
use prisma_core::game::{BeatmapInfo, ModifierSet};

use crate::console::format_session;

/// Declared key count used when neither `--cs` nor the file gives one.
const FALLBACK_CIRCLE_SIZE: f32 = 4.0;

/// Run the parse command
pub fn run(path: &Path, speed: f64, cs: Option<f32>, json: bool) -> Result<()> {
    let session = prepare(path, speed, cs)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        println!("{}", format_session(&session));
    }
    Ok(())
}

pub fn prepare(path: &Path, speed: f64, cs: Option<f32>) -> Result<BeatmapSession> {
    let cs = match cs {
        Some(cs) => cs,
        None => circle_size(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .unwrap_or(FALLBACK_CIRCLE_SIZE),
    };

    let info = BeatmapInfo {
        title: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        cs,
        declared_mode: parse_declared_mode(path),
        ..Default::default()
    };

    let mods = ModifierSet {
        speed_multiplier: speed,
        ..ModifierSet::default()
    };

    BeatmapSession::prepare(path, &info, &mods)
        .with_context(|| format!("Failed to prepare session for {}", path.display()))
}
