//! Beatmap files: hit objects, declared mode and lane reconciliation.

mod hit_object;
pub mod lanes;
mod parser;

pub use hit_object::*;
pub use lanes::{LaneReport, declared_keys, lane_centres, lane_positions, reconcile_keys, remap_x};
pub use parser::*;
