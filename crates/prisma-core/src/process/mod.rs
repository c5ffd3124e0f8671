pub mod chunked_reader;
mod handle;
pub mod pattern;
pub mod provider;
mod reader;
pub mod region;

// Synthetic process memory for unit and integration tests
#[doc(hidden)]
pub mod mock;

pub use chunked_reader::{ChunkedMemoryIterator, DEFAULT_CHUNK_SIZE, MemoryChunk};
pub use handle::*;
pub use pattern::Pattern;
pub use provider::{ProcessInfo, ProcessProvider, SystemProcessProvider};
pub use reader::{MAX_STRING_LENGTH, ReadMemory};
pub use region::{MemoryRegion, QueryRegions};

#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockProcessProvider};

/// Everything the tracking loop needs from an opened game process.
pub trait GameProcess: ProcessInfo + ReadMemory + QueryRegions + Send + Sync {}

impl<T: ProcessInfo + ReadMemory + QueryRegions + Send + Sync> GameProcess for T {}
