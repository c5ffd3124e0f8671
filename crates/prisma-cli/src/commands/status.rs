//! Status command implementation.

use std::path::PathBuf;

use anyhow::Result;
use prisma_core::game::{GameReader, GameSnapshot};
use prisma_core::offset::BaseAddressTable;
use prisma_core::session::SessionBuilder;
use prisma_core::{BeatmapSession, BotConfig};
use serde::Serialize;

use super::open_game;
use crate::console::format_session;

#[derive(Serialize)]
struct StatusReport<'a> {
    pid: u32,
    addresses: &'a BaseAddressTable,
    songs_dir: Option<PathBuf>,
    snapshot: &'a GameSnapshot,
    session: Option<&'a BeatmapSession>,
}

/// Run the status command
pub fn run(config: &BotConfig, json: bool) -> Result<()> {
    let process = open_game()?;

    let mut table = BaseAddressTable::new();
    table.scan_all(&process);

    let mut sessions = SessionBuilder::new(config.songs_dir.clone());
    let songs_dir = sessions.songs_dir(&process);

    let snapshot = GameSnapshot::capture(&GameReader::new(&process, &table), songs_dir.as_deref());

    let session = match (&snapshot.beatmap, &snapshot.mods) {
        (Some(info), Some(mods)) if info.is_mania() => match sessions.build(&process, info, mods) {
            Ok(session) => Some(session),
            Err(e) => {
                eprintln!("Could not prepare session: {}", e);
                None
            }
        },
        _ => None,
    };

    if json {
        let report = StatusReport {
            pid: process.pid,
            addresses: &table,
            songs_dir,
            snapshot: &snapshot,
            session: session.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let unknown = || "-".to_string();

    println!();
    println!("=== Game ===");
    println!(
        "  State      : {}",
        snapshot.state.map(|s| s.to_string()).unwrap_or_else(unknown)
    );
    println!(
        "  Audio time : {}",
        snapshot
            .audio_time
            .map(|t| format!("{} ms", t))
            .unwrap_or_else(unknown)
    );
    println!(
        "  Mods       : {}",
        snapshot.mods.as_ref().map(|m| m.display.clone()).unwrap_or_else(unknown)
    );
    println!(
        "  Skin       : {}",
        snapshot.skin.clone().unwrap_or_else(unknown)
    );
    println!(
        "  Songs dir  : {}",
        songs_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(unknown)
    );

    if let Some(info) = &snapshot.beatmap {
        println!();
        println!("=== Beatmap ===");
        println!("  Title      : {} [{}]", info.display_title(), info.difficulty);
        println!("  Creator    : {}", info.creator);
        println!("  Map ID     : {}", info.map_id);
        println!(
            "  Mode       : {}",
            info.mode().map(|m| m.to_string()).unwrap_or_else(unknown)
        );
        println!(
            "  CS/AR/OD/HP: {}/{}/{}/{}",
            info.cs, info.ar, info.od, info.hp
        );
    }

    if let Some(gameplay) = &snapshot.gameplay {
        println!();
        println!("=== Gameplay ===");
        println!("  Player     : {}", gameplay.player_name);
        println!("  Score      : {}", gameplay.score);
        println!("  Combo      : {} (max {})", gameplay.combo, gameplay.max_combo);
        println!("  Accuracy   : {:.2}%", gameplay.accuracy * 100.0);
        println!("  HP         : {:.0}%", gameplay.hp * 100.0);
    }

    if let Some(session) = &session {
        println!();
        println!("{}", format_session(session));
    }

    Ok(())
}
