//! Memory reader and timing core for an osu!mania input bot.
//!
//! [`process`] and [`offset`] locate the game's structures, [`game`] decodes
//! them, [`beatmap`] and [`session`] turn the selected map into a note
//! schedule and [`timing`] decides when the [`engine`] plays it.

pub mod beatmap;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod game;
pub mod offset;
pub mod process;
pub mod session;
pub mod shutdown;
pub mod timing;

pub use config::BotConfig;
pub use error::{Error, Result};
pub use events::{EventSink, NullSink};
pub use session::BeatmapSession;
pub use shutdown::ShutdownSignal;
pub use timing::{ControlHandle, Controller, TimingConfig};
