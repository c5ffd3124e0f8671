//! Typed views of the game's memory.

mod beatmap;
mod enums;
mod gameplay;
pub mod layout;
mod mods;
mod reader;
mod state;

pub use beatmap::*;
pub use enums::*;
pub use gameplay::*;
pub use mods::*;
pub use reader::*;
pub use state::*;
