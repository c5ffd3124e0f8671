//! `.osu` file parsing.
//!
//! Only the `[HitObjects]` section and the `Mode:` key are consumed. The
//! section ends at the first blank line; malformed lines are skipped.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::beatmap::{HOLD_BIT, HitObject};
use crate::error::Result;

const HIT_OBJECTS_HEADER: &str = "[HitObjects]";
const DIFFICULTY_HEADER: &str = "[Difficulty]";

/// Declared mode when the file cannot be read or the value is malformed.
pub const UNKNOWN_MODE: i32 = -1;

/// Scale a raw time by the playback speed, truncating toward zero.
pub fn scale_time(raw: i32, speed_multiplier: f64) -> i32 {
    (raw as f64 / speed_multiplier) as i32
}

/// Lines of the `[HitObjects]` section.
fn hit_object_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .skip_while(|line| *line != HIT_OBJECTS_HEADER)
        .skip(1)
        .take_while(|line| !line.is_empty())
}

fn parse_line(line: &str, speed_multiplier: f64) -> Option<HitObject> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 5 {
        return None;
    }

    let x = parts[0].parse::<i32>().ok()?;
    let y = parts[1].parse::<i32>().ok()?;
    let timestamp = scale_time(parts[2].parse::<i32>().ok()?, speed_multiplier);
    let object_type = parts[3].parse::<i32>().ok()?;

    let end_time = if object_type & HOLD_BIT != 0 {
        parts
            .get(5)
            .and_then(|extras| extras.split(':').next())
            .and_then(|end| end.trim().parse::<i32>().ok())
            .map(|end| scale_time(end, speed_multiplier))
            .unwrap_or(timestamp)
    } else {
        timestamp
    };

    Some(HitObject {
        x,
        y,
        timestamp,
        object_type,
        end_time,
    })
}

/// Parse hit objects from file contents, sorted by scaled time.
///
/// Ties keep their file order.
pub fn parse_hit_objects_str(text: &str, speed_multiplier: f64) -> Vec<HitObject> {
    let mut notes: Vec<HitObject> = hit_object_lines(text)
        .filter_map(|line| parse_line(line, speed_multiplier))
        .collect();
    notes.sort_by_key(|note| note.timestamp);
    notes
}

pub fn parse_hit_objects(path: &Path, speed_multiplier: f64) -> Result<Vec<HitObject>> {
    let text = fs::read_to_string(path)?;
    let notes = parse_hit_objects_str(&text, speed_multiplier);
    debug!("Parsed {} hit objects from {}", notes.len(), path.display());
    Ok(notes)
}

/// First valid raw (unscaled) time in the section, 0 when there is none.
pub fn first_hit_time_original_str(text: &str) -> i32 {
    hit_object_lines(text)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 5 {
                return None;
            }
            parts[2].trim().parse::<i32>().ok()
        })
        .next()
        .unwrap_or(0)
}

pub fn first_hit_time_original(path: &Path) -> i32 {
    fs::read_to_string(path)
        .map(|text| first_hit_time_original_str(&text))
        .unwrap_or(0)
}

/// `Mode:` value of the `[General]` section.
///
/// A file without the key is an osu!standard map (0); an unreadable file or
/// a malformed value yields [`UNKNOWN_MODE`].
pub fn parse_declared_mode(path: &Path) -> i32 {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open {}: {}", path.display(), e);
            return UNKNOWN_MODE;
        }
    };

    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            return UNKNOWN_MODE;
        };
        let line = line.trim();

        if line.starts_with("Mode:") || line.starts_with("Mode :") {
            return line
                .split_once(':')
                .and_then(|(_, value)| value.trim().parse::<i32>().ok())
                .unwrap_or(UNKNOWN_MODE);
        }
        if line == DIFFICULTY_HEADER {
            break;
        }
    }

    0
}

/// `CircleSize:` of the `[Difficulty]` section; mania stores the key count
/// here.
pub fn circle_size_str(text: &str) -> Option<f32> {
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("CircleSize"))
        .and_then(|rest| rest.trim_start().strip_prefix(':'))
        .and_then(|value| value.trim().parse::<f32>().ok())
}

pub fn circle_size(path: &Path) -> Result<Option<f32>> {
    Ok(circle_size_str(&fs::read_to_string(path)?))
}
