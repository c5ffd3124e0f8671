use serde::{Deserialize, Serialize};
use strum::{FromRepr, IntoStaticStr};

/// Screen the game is currently showing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u32)]
pub enum GameState {
    Menu = 0,
    Edit = 1,
    Play = 2,
    Exit = 3,
    SelectEdit = 4,
    SelectPlay = 5,
    SelectDrawings = 6,
    Rank = 7,
    Update = 8,
    Busy = 9,
    #[default]
    Unknown = 10,
    Lobby = 11,
    MatchSetup = 12,
    SelectMulti = 13,
    RankingVs = 14,
    OnlineSelection = 15,
    OptionsOffsetWizard = 16,
    RankingTagCoop = 17,
    RankingTeam = 18,
    BeatmapImport = 19,
    PackageUpdater = 20,
    Benchmark = 21,
    Tourney = 22,
    Charts = 23,
}

impl GameState {
    /// Out-of-range values map to `Unknown`.
    pub fn from_raw(value: u32) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unknown)
    }

    pub fn is_playing(&self) -> bool {
        *self == GameState::Play
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ruleset a beatmap is written for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRepr, IntoStaticStr,
)]
#[repr(i32)]
pub enum GameMode {
    Osu = 0,
    Taiko = 1,
    Catch = 2,
    Mania = 3,
}

impl GameMode {
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::from_repr(value)
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = self.into();
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_state_from_raw() {
        assert_eq!(GameState::from_raw(0), GameState::Menu);
        assert_eq!(GameState::from_raw(2), GameState::Play);
        assert_eq!(GameState::from_raw(5), GameState::SelectPlay);
        assert_eq!(GameState::from_raw(23), GameState::Charts);
        assert_eq!(GameState::from_raw(24), GameState::Unknown);
        assert_eq!(GameState::from_raw(u32::MAX), GameState::Unknown);
    }

    #[test]
    fn test_game_state_display() {
        assert_eq!(GameState::Play.to_string(), "Play");
        assert_eq!(GameState::OptionsOffsetWizard.to_string(), "OptionsOffsetWizard");
    }

    #[test]
    fn test_is_playing() {
        assert!(GameState::Play.is_playing());
        assert!(!GameState::Rank.is_playing());
    }

    #[test]
    fn test_game_mode() {
        assert_eq!(GameMode::from_i32(3), Some(GameMode::Mania));
        assert_eq!(GameMode::from_i32(-1), None);
        assert_eq!(GameMode::Mania.to_string(), "Mania");
    }
}
