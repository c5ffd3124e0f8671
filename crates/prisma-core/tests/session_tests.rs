//! Beatmap files to sessions.

use std::fs;
use std::path::Path;

use prisma_core::beatmap::{parse_declared_mode, parse_hit_objects};
use prisma_core::game::{BeatmapInfo, ModifierSet};
use prisma_core::process::MockMemoryBuilder;
use prisma_core::session::SessionBuilder;
use prisma_core::{BeatmapSession, Error};

fn seven_key_map(observed_lanes: usize) -> String {
    let mut text = String::from(
        "osu file format v14\n\n[General]\nMode: 3\n\n[Difficulty]\nCircleSize:7\n\n[HitObjects]\n",
    );
    for i in 0..observed_lanes * 2 {
        let lane = i % observed_lanes;
        let x = (lane * 512 / observed_lanes + 256 / observed_lanes) as i32;
        let time = 1000 + i as i32 * 125;
        if i % 4 == 3 {
            text.push_str(&format!("{},192,{},128,0,{}:0:0:0:0:\n", x, time, time + 300));
        } else {
            text.push_str(&format!("{},192,{},1,0,0:0:0:0:\n", x, time));
        }
    }
    text
}

fn info(cs: f32) -> BeatmapInfo {
    BeatmapInfo {
        folder: "10 Artist - Title".to_string(),
        filename: "map [7K].osu".to_string(),
        artist: "Artist".to_string(),
        title: "Title".to_string(),
        difficulty: "7K".to_string(),
        map_id: 10,
        cs,
        declared_mode: 3,
        ..Default::default()
    }
}

fn install(root: &Path, text: &str) {
    let folder = root.join("Songs").join("10 Artist - Title");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("map [7K].osu"), text).unwrap();
}

#[test]
fn test_builder_resolves_songs_dir_from_executable() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), &seven_key_map(7));
    let process = MockMemoryBuilder::new()
        .with_size(0x10)
        .executable_path(dir.path().join("osu!.exe"))
        .build();

    let mut builder = SessionBuilder::new(None);
    let session = builder
        .build(&process, &info(7.0), &ModifierSet::default())
        .unwrap();

    assert_eq!(builder.cached_songs_dir(), Some(dir.path().join("Songs").as_path()));
    assert_eq!(session.keys, 7);
    assert_eq!(session.lane_positions.len(), 7);
    assert!(!session.lanes.remapped);
}

#[test]
fn test_observed_lanes_remapped_to_declared() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), &seven_key_map(9));
    let process = MockMemoryBuilder::new().with_size(0x10).build();

    let mut builder = SessionBuilder::new(Some(dir.path().join("Songs")));
    let session = builder
        .build(&process, &info(7.0), &ModifierSet::default())
        .unwrap();

    assert_eq!(session.lanes.observed_keys, 9);
    assert_eq!(session.keys, 7);
    assert_eq!(session.lane_positions.len(), session.keys);
    assert!(session.lanes.remapped);
    for note in &session.notes {
        assert!(session.lane_positions.contains(&note.x));
    }
}

#[test]
fn test_speed_scaling_and_hold_ends() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), &seven_key_map(7));
    let path = dir
        .path()
        .join("Songs")
        .join("10 Artist - Title")
        .join("map [7K].osu");

    // DT
    let session = BeatmapSession::prepare(&path, &info(7.0), &ModifierSet::from_raw(64)).unwrap();
    assert_eq!(session.speed_multiplier, 1.5);
    assert_eq!(session.first_hit_time, 666);
    assert_eq!(session.first_hit_time_original, 1000);

    let raw = parse_hit_objects(&path, 1.0).unwrap();
    for (scaled, raw) in session.notes.iter().zip(&raw) {
        assert_eq!(scaled.timestamp, (raw.timestamp as f64 / 1.5) as i32);
        assert!(scaled.end_time >= scaled.timestamp);
        if scaled.is_hold() {
            assert_eq!(scaled.end_time, (raw.end_time as f64 / 1.5) as i32);
        }
    }

    // Sorted by adjusted time
    assert!(session.notes.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_resume_index_uses_original_time() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), &seven_key_map(7));
    let path = dir
        .path()
        .join("Songs")
        .join("10 Artist - Title")
        .join("map [7K].osu");

    // HT: 1000 is stored as 1333, which maps back to 999
    let session = BeatmapSession::prepare(&path, &info(7.0), &ModifierSet::from_raw(256)).unwrap();
    assert_eq!(session.notes[0].timestamp, 1333);
    assert_eq!(session.next_note_after(998), Some(0));
    assert_eq!(session.next_note_after(999), Some(1));
    assert_eq!(session.next_note_after(100_000), None);
}

#[test]
fn test_missing_and_empty_beatmaps() {
    let dir = tempfile::tempdir().unwrap();
    let process = MockMemoryBuilder::new().with_size(0x10).build();
    let mut builder = SessionBuilder::new(Some(dir.path().to_path_buf()));

    let err = builder
        .build(&process, &info(7.0), &ModifierSet::default())
        .unwrap_err();
    assert!(matches!(err, Error::BeatmapNotFound(_)));

    let folder = dir.path().join("10 Artist - Title");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("map [7K].osu"), "[General]\nMode: 3\n\n[HitObjects]\n").unwrap();
    let err = builder
        .build(&process, &info(7.0), &ModifierSet::default())
        .unwrap_err();
    assert!(matches!(err, Error::EmptyBeatmap(_)));
}

#[test]
fn test_no_songs_dir() {
    let process = MockMemoryBuilder::new().with_size(0x10).build();
    let mut builder = SessionBuilder::new(None).with_local_app_data(None);
    assert!(matches!(
        builder.build(&process, &info(7.0), &ModifierSet::default()),
        Err(Error::SongsDirNotFound)
    ));
}

#[test]
fn test_declared_mode_of_installed_map() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), &seven_key_map(7));
    let path = info(7.0).file_path(&dir.path().join("Songs"));
    assert_eq!(parse_declared_mode(&path), 3);
}

#[test]
fn test_needs_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    install(dir.path(), &seven_key_map(7));
    let path = info(7.0).file_path(&dir.path().join("Songs"));
    let session = BeatmapSession::prepare(&path, &info(7.0), &ModifierSet::default()).unwrap();

    assert!(SessionBuilder::needs_rebuild(None, &info(7.0), &ModifierSet::default()));
    assert!(!SessionBuilder::needs_rebuild(Some(&session), &info(7.0), &ModifierSet::default()));
    // NC changes speed
    assert!(SessionBuilder::needs_rebuild(Some(&session), &info(7.0), &ModifierSet::from_raw(512 | 64)));
    // HR does not
    assert!(!SessionBuilder::needs_rebuild(Some(&session), &info(7.0), &ModifierSet::from_raw(16)));

    let mut other = info(7.0);
    other.map_id = 11;
    assert!(SessionBuilder::needs_rebuild(Some(&session), &other, &ModifierSet::default()));
}
