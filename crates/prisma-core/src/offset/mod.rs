//! Signature-based address resolution.

pub mod scanner;
mod signature;
mod table;

pub use scanner::{ADDRESS_CEILING, scan};
pub use signature::PatternName;
pub use table::{BaseAddressTable, MIN_RESOLVED_PATTERNS, SCAN_WORKERS, ScanSummary};
