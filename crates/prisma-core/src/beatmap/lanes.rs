//! Lane reconciliation.
//!
//! Mania notes carry their lane as an x coordinate in 0..512. When the
//! number of distinct x values disagrees with the declared key count the
//! notes are snapped onto the declared lanes.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::beatmap::HitObject;

/// Playfield width in osu! pixels.
pub const PLAYFIELD_WIDTH: f64 = 512.0;

/// Largest key count the engine binds without a declared override.
pub const MAX_OBSERVED_KEYS: usize = 9;

/// Sorted distinct x coordinates.
pub fn lane_positions(notes: &[HitObject]) -> Vec<i32> {
    notes
        .iter()
        .map(|note| note.x)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Key count declared by the circle-size field.
///
/// Rounds half to even, with a floor of one key.
pub fn declared_keys(circle_size: f32) -> usize {
    (circle_size as f64).round_ties_even().max(1.0) as usize
}

/// Lane centres for `keys` equal-width lanes.
pub fn lane_centres(keys: usize) -> Vec<i32> {
    let keys = keys.max(1);
    let width = PLAYFIELD_WIDTH / keys as f64;
    (0..keys).map(|i| ((i as f64 + 0.5) * width) as i32).collect()
}

/// Snap an x coordinate to the centre of its lane.
pub fn remap_x(x: i32, keys: usize) -> i32 {
    let keys = keys.max(1);
    let width = PLAYFIELD_WIDTH / keys as f64;
    let index = ((x as f64 / width) as i64).clamp(0, keys as i64 - 1);
    ((index as f64 + 0.5) * width) as i32
}

pub fn remap_notes(notes: &mut [HitObject], keys: usize) {
    for note in notes {
        note.x = remap_x(note.x, keys);
    }
}

/// Outcome of comparing declared and observed key counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneReport {
    pub declared_keys: usize,
    pub observed_keys: usize,
    /// Key count the engine should use
    pub keys: usize,
    pub lane_positions: Vec<i32>,
    pub remapped: bool,
}

/// Reconcile `notes` against the declared key count, remapping in place on
/// mismatch.
pub fn reconcile_keys(notes: &mut [HitObject], circle_size: f32) -> LaneReport {
    let declared = declared_keys(circle_size);
    let positions = lane_positions(notes);
    let observed = if positions.is_empty() {
        declared
    } else {
        positions.len()
    };

    if observed != declared {
        info!(
            "Key count mismatch: {} declared, {} lanes observed; remapping",
            declared, observed
        );
        remap_notes(notes, declared);
        return LaneReport {
            declared_keys: declared,
            observed_keys: observed,
            keys: declared,
            lane_positions: lane_centres(declared),
            remapped: true,
        };
    }

    let keys = if observed > MAX_OBSERVED_KEYS {
        declared
    } else {
        observed
    };

    LaneReport {
        declared_keys: declared,
        observed_keys: observed,
        keys,
        lane_positions: positions,
        remapped: false,
    }
}
