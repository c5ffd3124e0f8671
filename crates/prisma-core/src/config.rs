//! Runtime settings handed to the controller.
//!
//! The file format is the caller's business; this is the parsed form.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::ENGINE_LIBRARY;

pub const DEFAULT_OFFSET: i32 = 30;
pub const DEFAULT_TIMING_SHIFT: i32 = 0;
/// Highest key count a custom keybind may cover.
pub const MAX_KEYBIND_KEYS: usize = 18;

/// Virtual-key codes per key count.
pub type Keybinds = BTreeMap<usize, Vec<u16>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Engine offset in milliseconds
    pub offset: i32,
    pub timing_shift: i32,
    /// Overrides the songs directory derived from the game executable
    pub songs_dir: Option<PathBuf>,
    pub keybinds: Keybinds,
    pub engine_path: PathBuf,
    /// Start runs automatically when the first note comes up
    pub bot_enabled: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            timing_shift: DEFAULT_TIMING_SHIFT,
            songs_dir: None,
            keybinds: Keybinds::new(),
            engine_path: PathBuf::from(ENGINE_LIBRARY),
            bot_enabled: true,
        }
    }
}

impl BotConfig {
    pub fn custom_keys(&self, keys: usize) -> Option<&[u16]> {
        self.keybinds.get(&keys).map(Vec::as_slice)
    }
}
