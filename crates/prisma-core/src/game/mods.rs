//! Gameplay modifiers.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Raw modifier bitfield as stored by the game
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Mods: u32 {
        const NO_FAIL = 1 << 0;
        const EASY = 1 << 1;
        const TOUCH_DEVICE = 1 << 2;
        const HIDDEN = 1 << 3;
        const HARD_ROCK = 1 << 4;
        const SUDDEN_DEATH = 1 << 5;
        const DOUBLE_TIME = 1 << 6;
        const RELAX = 1 << 7;
        const HALF_TIME = 1 << 8;
        /// Always set together with DOUBLE_TIME by the game
        const NIGHTCORE = 1 << 9;
        const FLASHLIGHT = 1 << 10;
        const AUTOPLAY = 1 << 11;
        const SPUN_OUT = 1 << 12;
        const AUTOPILOT = 1 << 13;
        /// Always set together with SUDDEN_DEATH by the game
        const PERFECT = 1 << 14;
        const KEY4 = 1 << 15;
        const KEY5 = 1 << 16;
        const KEY6 = 1 << 17;
        const KEY7 = 1 << 18;
        const KEY8 = 1 << 19;
        const FADE_IN = 1 << 20;
        const RANDOM = 1 << 21;
        const CINEMA = 1 << 22;
        const TARGET = 1 << 23;
        const KEY9 = 1 << 24;
        const KEY10 = 1 << 25;
        const KEY1 = 1 << 26;
        const KEY3 = 1 << 27;
        const KEY2 = 1 << 28;
        const SCORE_V2 = 1 << 29;
        const MIRROR = 1 << 30;
    }
}

/// Display token for each bit, indexed by bit position.
const TOKENS: [&str; 31] = [
    "NF", "EZ", "TD", "HD", "HR", "SD", "DT", "RX", "HT", "NC", "FL", "AT", "SO", "AP", "PF",
    "4K", "5K", "6K", "7K", "8K", "FI", "RD", "CN", "TG", "9K", "10K", "1K", "3K", "2K", "v2",
    "MR",
];

/// Display priority; tokens not listed sort last in bit order.
fn display_rank(token: &str) -> u8 {
    match token {
        "NF" => 0,
        "EZ" => 1,
        "HD" => 2,
        "DT" | "NC" | "HT" => 3,
        "HR" => 4,
        "SO" | "SD" | "PF" => 5,
        "FL" => 6,
        "TD" => 7,
        _ => 99,
    }
}

/// Pairs where the second token implies the first; only the second is shown.
const COLLAPSED: [(&str, &str); 3] = [("DT", "NC"), ("SD", "PF"), ("AT", "CN")];

impl Mods {
    /// Playback speed implied by the modifiers.
    pub fn speed_multiplier(&self) -> f64 {
        if self.intersects(Mods::DOUBLE_TIME | Mods::NIGHTCORE) {
            1.5
        } else if self.contains(Mods::HALF_TIME) {
            0.75
        } else {
            1.0
        }
    }

    pub fn is_no_fail(&self) -> bool {
        self.contains(Mods::NO_FAIL)
    }

    /// Ordered display tokens, with implied pairs collapsed.
    pub fn tokens(&self) -> Vec<&'static str> {
        let bits = self.bits();
        let mut tokens: Vec<&'static str> = TOKENS
            .iter()
            .enumerate()
            .filter(|(bit, _)| bits & (1 << bit) != 0)
            .map(|(_, &token)| token)
            .collect();

        tokens.sort_by_key(|token| display_rank(token));

        for (implied, shown) in COLLAPSED {
            if tokens.contains(&shown) {
                tokens.retain(|token| *token != implied);
            }
        }

        tokens
    }
}

/// Active modifiers with their presentation form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifierSet {
    pub raw: u32,
    /// Concatenated tokens, "NM" when empty
    pub display: String,
    pub tokens: Vec<String>,
    pub speed_multiplier: f64,
}

impl ModifierSet {
    pub fn from_raw(raw: u32) -> Self {
        let mods = Mods::from_bits_retain(raw);
        let tokens: Vec<String> = mods.tokens().into_iter().map(String::from).collect();

        let (display, tokens) = if tokens.is_empty() {
            ("NM".to_string(), vec!["NM".to_string()])
        } else {
            (tokens.concat(), tokens)
        };

        Self {
            raw,
            display,
            tokens,
            speed_multiplier: mods.speed_multiplier(),
        }
    }

    pub fn mods(&self) -> Mods {
        Mods::from_bits_retain(self.raw)
    }
}

impl Default for ModifierSet {
    fn default() -> Self {
        Self::from_raw(0)
    }
}

impl std::fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}
