//! Typed snapshots of the game state.
//!
//! Every accessor returns `None` when its signature was not resolved or any
//! pointer on the way is null or unreadable. Absence is expected (menus,
//! loading screens) and only logged at trace level.

use std::path::Path;

use tracing::trace;

use crate::beatmap::parse_declared_mode;
use crate::error::Result;
use crate::game::layout::{anchor, gameplay, skin};
use crate::game::{BeatmapInfo, GameState, GameplayData, ModifierSet, read_beatmap_object};
use crate::offset::{BaseAddressTable, PatternName};
use crate::process::ReadMemory;

/// Reads game structures through the resolved signature addresses.
pub struct GameReader<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    table: &'a BaseAddressTable,
}

impl<'a, R: ReadMemory + ?Sized> GameReader<'a, R> {
    pub fn new(reader: &'a R, table: &'a BaseAddressTable) -> Self {
        Self { reader, table }
    }

    fn address(&self, name: PatternName) -> Option<u64> {
        self.table.get(name)
    }

    fn absent<T>(what: &str, result: Result<T>) -> Option<T> {
        result
            .map_err(|e| trace!("{} unavailable: {}", what, e))
            .ok()
    }

    pub fn game_state(&self) -> Option<GameState> {
        let address = self.address(PatternName::Status)?;
        let raw = Self::absent("Game state", self.reader.read_double_ptr(address))?;
        Some(GameState::from_raw(raw))
    }

    /// Playback clock in milliseconds.
    pub fn audio_time(&self) -> Option<i32> {
        let address = self.address(PatternName::PlayTime)?;
        let ptr = Self::absent(
            "Audio time",
            self.reader.read_ptr(address + anchor::AUDIO_TIME),
        )?;
        Self::absent("Audio time", self.reader.read_i32(ptr))
    }

    pub fn menu_mods(&self) -> Option<ModifierSet> {
        let address = self.address(PatternName::MenuMods)?;
        let raw = Self::absent("Menu mods", self.reader.read_double_ptr(address))?;
        Some(ModifierSet::from_raw(raw))
    }

    /// Selected beatmap. `declared_mode` is filled from the `.osu` file when
    /// `songs_dir` is known.
    pub fn beatmap_info(&self, songs_dir: Option<&Path>) -> Option<BeatmapInfo> {
        let base = self.address(PatternName::Base)?;
        let mut info = Self::absent(
            "Beatmap",
            read_beatmap_object(self.reader, base.wrapping_add_signed(anchor::BEATMAP)),
        )?;

        info.selected_ruleset = self
            .reader
            .read_double_ptr(base.wrapping_add_signed(anchor::SELECTED_RULESET))
            .unwrap_or(0);

        if let Some(dir) = songs_dir {
            if info.has_file() {
                info.declared_mode = parse_declared_mode(&info.file_path(dir));
            }
        }

        Some(info)
    }

    /// Live counters; only available on the play screen.
    pub fn gameplay(&self) -> Option<GameplayData> {
        let address = self.address(PatternName::Rulesets)?;
        let ruleset = Self::absent(
            "Ruleset",
            self.reader.read_ptr_chain(
                address.wrapping_add_signed(anchor::RULESETS),
                &[gameplay::RULESET],
            ),
        )?;
        Self::absent("Gameplay", GameplayData::read(self.reader, ruleset))
    }

    /// Name of the active skin folder.
    pub fn skin_folder(&self) -> Option<String> {
        let address = self.address(PatternName::SkinData)?;
        let object = Self::absent(
            "Skin",
            self.reader.read_ptr_chain(address + anchor::SKIN, &[0]),
        )?;
        Self::absent("Skin", self.reader.read_string_ptr(object + skin::FOLDER))
    }
}
