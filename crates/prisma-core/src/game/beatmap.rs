use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::beatmap::UNKNOWN_MODE;
use crate::error::Result;
use crate::game::GameMode;
use crate::game::layout::beatmap as layout;
use crate::process::ReadMemory;

/// Metadata of the currently selected beatmap.
///
/// Read fresh every tick; the selection can change at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatmapInfo {
    pub checksum: String,
    pub filename: String,
    pub folder: String,
    pub artist: String,
    pub title: String,
    pub difficulty: String,
    pub creator: String,
    pub map_id: i32,
    pub set_id: i32,
    pub ranked_status: i32,
    pub ar: f32,
    pub cs: f32,
    pub hp: f32,
    pub od: f32,
    pub object_count: i32,
    /// Ruleset selected in the game UI
    pub selected_ruleset: u32,
    /// `Mode:` declared by the `.osu` file, -1 when unknown
    pub declared_mode: i32,
}

impl Default for BeatmapInfo {
    fn default() -> Self {
        Self {
            checksum: String::new(),
            filename: String::new(),
            folder: String::new(),
            artist: String::new(),
            title: String::new(),
            difficulty: String::new(),
            creator: String::new(),
            map_id: 0,
            set_id: 0,
            ranked_status: 0,
            ar: 0.0,
            cs: 0.0,
            hp: 0.0,
            od: 0.0,
            object_count: 0,
            selected_ruleset: 0,
            declared_mode: UNKNOWN_MODE,
        }
    }
}

impl BeatmapInfo {
    /// Read the beatmap object at `address`.
    ///
    /// Individual fields that cannot be read fall back to empty / zero.
    pub fn read<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Self {
        let string = |offset: u64| reader.read_string_ptr(address + offset).unwrap_or_default();
        let int = |offset: u64| reader.read_i32(address + offset).unwrap_or(0);
        let float = |offset: u64| reader.read_f32(address + offset).unwrap_or(0.0);

        Self {
            checksum: string(layout::CHECKSUM),
            filename: string(layout::FILENAME),
            folder: string(layout::FOLDER),
            artist: string(layout::ARTIST),
            title: string(layout::TITLE),
            difficulty: string(layout::DIFFICULTY),
            creator: string(layout::CREATOR),
            map_id: int(layout::MAP_ID),
            set_id: int(layout::SET_ID),
            ranked_status: int(layout::RANKED_STATUS),
            ar: float(layout::AR),
            cs: float(layout::CS),
            hp: float(layout::HP),
            od: float(layout::OD),
            object_count: int(layout::OBJECT_COUNT),
            selected_ruleset: 0,
            declared_mode: UNKNOWN_MODE,
        }
    }

    /// Session identifier: `folder/filename`.
    pub fn identifier(&self) -> String {
        format!("{}/{}", self.folder, self.filename)
    }

    /// `artist - title`
    pub fn display_title(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    pub fn has_file(&self) -> bool {
        !self.folder.is_empty() && !self.filename.is_empty()
    }

    /// Location of the `.osu` file under `songs_dir`.
    pub fn file_path(&self, songs_dir: &Path) -> PathBuf {
        songs_dir.join(&self.folder).join(&self.filename)
    }

    pub fn mode(&self) -> Option<GameMode> {
        GameMode::from_i32(self.declared_mode)
    }

    pub fn is_mania(&self) -> bool {
        self.mode() == Some(GameMode::Mania)
    }
}

/// Read the beatmap pointed to by the double pointer at `address`.
pub fn read_beatmap_object<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<BeatmapInfo> {
    let object = reader.read_double_ptr(address)?;
    if object == 0 {
        return Err(crate::error::Error::NullPointer { address });
    }
    Ok(BeatmapInfo::read(reader, object as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockMemoryBuilder;

    fn beatmap_image() -> crate::process::MockMemoryReader {
        // Beatmap object at 0x1000, strings from 0x1200
        MockMemoryBuilder::new()
            .with_size(0x400)
            .write_u32(layout::ARTIST as usize, 0x1200)
            .write_managed_string(0x200, "Camellia")
            .write_u32(layout::TITLE as usize, 0x1240)
            .write_managed_string(0x240, "Ghost")
            .write_u32(layout::FOLDER as usize, 0x1280)
            .write_managed_string(0x280, "123 Camellia - Ghost")
            .write_u32(layout::FILENAME as usize, 0x12C0)
            .write_managed_string(0x2C0, "ghost [7K].osu")
            .write_f32(layout::CS as usize, 7.0)
            .write_f32(layout::OD as usize, 8.5)
            .write_i32(layout::MAP_ID as usize, 4242)
            .write_i32(layout::OBJECT_COUNT as usize, 1500)
            .build()
    }

    #[test]
    fn test_read_beatmap_info() {
        let reader = beatmap_image();
        let info = BeatmapInfo::read(&reader, 0x1000);

        assert_eq!(info.artist, "Camellia");
        assert_eq!(info.title, "Ghost");
        assert_eq!(info.filename, "ghost [7K].osu");
        assert_eq!(info.cs, 7.0);
        assert_eq!(info.od, 8.5);
        assert_eq!(info.map_id, 4242);
        assert_eq!(info.object_count, 1500);
        // Unset pointers read as empty strings
        assert_eq!(info.creator, "");
        assert_eq!(info.checksum, "");
        assert_eq!(info.declared_mode, -1);
    }

    #[test]
    fn test_identifier_and_title() {
        let info = BeatmapInfo::read(&beatmap_image(), 0x1000);
        assert_eq!(info.identifier(), "123 Camellia - Ghost/ghost [7K].osu");
        assert_eq!(info.display_title(), "Camellia - Ghost");
        assert!(info.has_file());
        assert_eq!(
            info.file_path(Path::new("songs")),
            Path::new("songs").join("123 Camellia - Ghost").join("ghost [7K].osu")
        );
    }

    #[test]
    fn test_mode() {
        let mania = BeatmapInfo {
            declared_mode: 3,
            ..Default::default()
        };
        assert!(mania.is_mania());
        assert_eq!(BeatmapInfo::default().declared_mode, UNKNOWN_MODE);
        assert_eq!(BeatmapInfo::default().mode(), None);
        assert!(!BeatmapInfo::default().is_mania());
    }
}
