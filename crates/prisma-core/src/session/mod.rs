//! Immutable beatmap sessions.
//!
//! A session is the parsed note list of one beatmap under one modifier
//! set. It is rebuilt whenever the selected beatmap or the playback speed
//! changes, and shared with the engine thread as `Arc<BeatmapSession>`.

mod builder;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::beatmap::{self, HitObject, LaneReport};
use crate::error::{Error, Result};
use crate::game::{BeatmapInfo, ModifierSet};

pub use builder::*;

/// Largest speed difference treated as the same session.
pub const SPEED_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Serialize)]
pub struct BeatmapSession {
    /// `folder/filename`
    pub identifier: String,
    pub map_id: i32,
    /// `artist - title`
    pub title: String,
    pub difficulty: String,
    pub path: PathBuf,
    /// Resolved key count
    pub keys: usize,
    pub lane_positions: Vec<i32>,
    /// Sorted by speed-adjusted time
    pub notes: Vec<HitObject>,
    /// Adjusted time of the first note
    pub first_hit_time: i32,
    /// Raw time of the first note in file order
    pub first_hit_time_original: i32,
    pub mods: String,
    pub speed_multiplier: f64,
    pub lanes: LaneReport,
}

impl BeatmapSession {
    /// Parse and reconcile the beatmap at `path`.
    pub fn prepare(path: &Path, info: &BeatmapInfo, mods: &ModifierSet) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::BeatmapNotFound(path.to_path_buf()));
        }

        let speed_multiplier = if mods.speed_multiplier > 0.0 {
            mods.speed_multiplier
        } else {
            1.0
        };

        let mut notes = beatmap::parse_hit_objects(path, speed_multiplier)?;
        let Some(first) = notes.first() else {
            return Err(Error::EmptyBeatmap(path.to_path_buf()));
        };
        let first_hit_time = first.timestamp;

        let lanes = beatmap::reconcile_keys(&mut notes, info.cs);
        let mods_string = if mods.display.is_empty() {
            "NM".to_string()
        } else {
            mods.display.clone()
        };

        let session = Self {
            identifier: info.identifier(),
            map_id: info.map_id,
            title: info.display_title(),
            difficulty: info.difficulty.clone(),
            path: path.to_path_buf(),
            keys: lanes.keys,
            lane_positions: lanes.lane_positions.clone(),
            notes,
            first_hit_time,
            first_hit_time_original: beatmap::first_hit_time_original(path),
            mods: mods_string,
            speed_multiplier,
            lanes,
        };

        info!(
            "Session ready: {} [{}] {}K, {} notes, {} ({}x)",
            session.title,
            session.difficulty,
            session.keys,
            session.notes.len(),
            session.mods,
            session.speed_multiplier
        );
        Ok(session)
    }

    /// True when `info` and `mods` describe a different session.
    pub fn is_superseded_by(&self, info: &BeatmapInfo, mods: &ModifierSet) -> bool {
        self.identifier != info.identifier()
            || self.map_id != info.map_id
            || (self.speed_multiplier - mods.speed_multiplier).abs() > SPEED_TOLERANCE
    }

    /// Index of the first note whose unscaled time is strictly after
    /// `audio_time`.
    pub fn next_note_after(&self, audio_time: i32) -> Option<usize> {
        self.notes
            .iter()
            .position(|note| note.original_time(self.speed_multiplier) > audio_time)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}
