use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Null pointer read at address {address:#x}")]
    NullPointer { address: u64 },

    #[error("Invalid managed string at {address:#x} (length {length})")]
    InvalidString { address: u64, length: i32 },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Songs directory could not be resolved")]
    SongsDirNotFound,

    #[error("Beatmap file not found: {}", .0.display())]
    BeatmapNotFound(PathBuf),

    #[error("No hit objects parsed from {}", .0.display())]
    EmptyBeatmap(PathBuf),

    #[error("Failed to load execution engine: {0}")]
    EngineLoadFailed(String),

    #[error("Execution engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that only mean "value not currently available".
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            Error::MemoryReadFailed { .. } | Error::NullPointer { .. } | Error::InvalidString { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
