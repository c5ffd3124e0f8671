use std::path::Path;

use serde::Serialize;

use crate::game::{BeatmapInfo, GameReader, GameState, GameplayData, ModifierSet};
use crate::process::ReadMemory;

/// Everything the extractors can read at one instant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameSnapshot {
    pub state: Option<GameState>,
    pub audio_time: Option<i32>,
    pub beatmap: Option<BeatmapInfo>,
    pub mods: Option<ModifierSet>,
    pub gameplay: Option<GameplayData>,
    pub skin: Option<String>,
}

impl GameSnapshot {
    pub fn capture<R: ReadMemory + ?Sized>(game: &GameReader<'_, R>, songs_dir: Option<&Path>) -> Self {
        let state = game.game_state();
        Self {
            state,
            audio_time: game.audio_time(),
            beatmap: game.beatmap_info(songs_dir),
            mods: game.menu_mods(),
            // Counters are stale outside the play screen
            gameplay: state
                .filter(GameState::is_playing)
                .and_then(|_| game.gameplay()),
            skin: game.skin_folder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::{BaseAddressTable, PatternName};
    use crate::process::MockMemoryBuilder;

    #[test]
    fn test_capture_menu() {
        // Status -> 0x1010 -> Menu; PlayTime +5 -> 0x1020 -> 3000
        let reader = MockMemoryBuilder::new()
            .with_size(0x100)
            .write_u32(0x00, 0x1010)
            .write_u32(0x10, 0)
            .write_u32(0x45, 0x1020)
            .write_i32(0x20, 3000)
            .build();
        let mut table = BaseAddressTable::new();
        table.insert(PatternName::Status, 0x1000);
        table.insert(PatternName::PlayTime, 0x1040);

        let snapshot = GameSnapshot::capture(&GameReader::new(&reader, &table), None);
        assert_eq!(snapshot.state, Some(GameState::Menu));
        assert_eq!(snapshot.audio_time, Some(3000));
        assert!(snapshot.beatmap.is_none());
        assert!(snapshot.gameplay.is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = GameSnapshot {
            state: Some(GameState::Play),
            audio_time: Some(1234),
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"state\":\"Play\""));
        assert!(json.contains("\"audio_time\":1234"));
    }
}
