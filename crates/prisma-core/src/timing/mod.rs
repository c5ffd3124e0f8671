//! Timing: when the engine runs, relative to the game's playback clock.

mod clock;
mod config;
pub mod control;
mod controller;
mod machine;
mod pause;

pub use clock::*;
pub use config::*;
pub use control::{ControlHandle, ControlState};
pub use controller::*;
pub use machine::*;
pub use pause::*;
