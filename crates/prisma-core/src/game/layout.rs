//! Memory layout constants for osu! (stable) data structures
//!
//! All offsets are relative to an address resolved by signature scanning
//! (see [`PatternName`](crate::offset::PatternName)) or to an object
//! reached through a pointer chain. Pointers are 32-bit.
//!
//! # Pointer Chains
//!
//! ```text
//! Base - 0xC    → *  → *  → Beatmap object
//! Base - 0x33   → *  → *  → selected ruleset (i32)
//! PlayTime + 0x5  → *  → audio time (i32, ms)
//! Status        → *  → *  → game state (u32)
//! MenuMods      → *  → *  → mods bitfield (u32)
//! SkinData + 0x7 → * → * → + 0x44 → skin folder (string)
//! Rulesets - 0xB → * → + 0x4 → ruleset → + 0x68 → gameplay
//! ```

/// Offsets from the resolved signature addresses
pub mod anchor {
    /// Base - 0xC holds a pointer to the current beatmap pointer
    pub const BEATMAP: i64 = -0xC;
    /// Base - 0x33 holds a pointer to the selected ruleset
    pub const SELECTED_RULESET: i64 = -0x33;
    /// PlayTime + 0x5 holds a pointer to the audio time
    pub const AUDIO_TIME: u64 = 0x5;
    /// SkinData + 0x7 holds a pointer to the skin object pointer
    pub const SKIN: u64 = 0x7;
    /// Rulesets - 0xB holds a pointer to the ruleset container
    pub const RULESETS: i64 = -0xB;
}

/// Memory layout of the beatmap object
///
/// # Structure Layout
///
/// ```text
/// Offset   Field          Type
/// ─────────────────────────────────
/// 0x18     Artist         string*
/// 0x24     Title          string*
/// 0x2C     AR             f32
/// 0x30     CS             f32
/// 0x34     HP             f32
/// 0x38     OD             f32
/// 0x6C     Checksum       string*
/// 0x78     Folder         string*
/// 0x7C     Creator        string*
/// 0x90     Filename       string*
/// 0xAC     Difficulty     string*
/// 0xC8     Map ID         i32
/// 0xCC     Set ID         i32
/// 0xF8     Object count   i32
/// 0x12C    Ranked status  i32
/// ```
pub mod beatmap {
    pub const ARTIST: u64 = 0x18;
    pub const TITLE: u64 = 0x24;
    pub const AR: u64 = 0x2C;
    pub const CS: u64 = 0x30;
    pub const HP: u64 = 0x34;
    pub const OD: u64 = 0x38;
    pub const CHECKSUM: u64 = 0x6C;
    pub const FOLDER: u64 = 0x78;
    pub const CREATOR: u64 = 0x7C;
    pub const FILENAME: u64 = 0x90;
    pub const DIFFICULTY: u64 = 0xAC;
    pub const MAP_ID: u64 = 0xC8;
    pub const SET_ID: u64 = 0xCC;
    pub const OBJECT_COUNT: u64 = 0xF8;
    pub const RANKED_STATUS: u64 = 0x12C;
}

/// Offsets along the gameplay pointer chain
pub mod gameplay {
    /// Ruleset container → active ruleset
    pub const RULESET: u64 = 0x4;
    /// Ruleset → gameplay object
    pub const GAMEPLAY_BASE: u64 = 0x68;
    /// Ruleset → score (i32)
    pub const SCORE: u64 = 0x100;
    /// Gameplay → score object
    pub const SCORE_BASE: u64 = 0x38;
    /// Gameplay → HP bar object
    pub const HP_BAR_BASE: u64 = 0x40;
    /// Gameplay → accuracy object
    pub const ACCURACY: u64 = 0x48;
    /// Accuracy object → value (f64, percent)
    pub const ACCURACY_VALUE: u64 = 0xC;
}

/// Memory layout of the score object (counts are u16)
pub mod score {
    pub const PLAYER_NAME: u64 = 0x28;
    pub const MAX_COMBO: u64 = 0x68;
    pub const HIT_100: u64 = 0x88;
    pub const HIT_300: u64 = 0x8A;
    pub const HIT_50: u64 = 0x8C;
    pub const HIT_GEKI: u64 = 0x8E;
    pub const HIT_KATU: u64 = 0x90;
    pub const HIT_MISS: u64 = 0x92;
    pub const COMBO: u64 = 0x94;
}

/// Memory layout of the HP bar object (values are f64 in 0..=200)
pub mod hp_bar {
    pub const SMOOTH: u64 = 0x14;
    pub const CURRENT: u64 = 0x1C;
    pub const MAX: f64 = 200.0;
}

/// Skin object → folder name string pointer
pub mod skin {
    pub const FOLDER: u64 = 0x44;
}
