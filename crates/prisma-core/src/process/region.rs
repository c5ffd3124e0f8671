//! Virtual memory region descriptions.
//!
//! Mirrors the subset of `MEMORY_BASIC_INFORMATION` the pattern scanner
//! needs, so region walking can be driven by a real process or by a
//! synthetic memory image in tests.

/// Page protection and region constants (same values as the Win32 API).
pub mod protection {
    pub const PAGE_NOACCESS: u32 = 0x01;
    pub const PAGE_READONLY: u32 = 0x02;
    pub const PAGE_READWRITE: u32 = 0x04;
    pub const PAGE_EXECUTE_READ: u32 = 0x20;
    pub const PAGE_EXECUTE_READWRITE: u32 = 0x40;

    pub const MEM_COMMIT: u32 = 0x1000;
    pub const MEM_FREE: u32 = 0x10000;
    pub const MEM_IMAGE: u32 = 0x100_0000;
    pub const MEM_PRIVATE: u32 = 0x2_0000;
}

use protection::*;

/// One contiguous virtual memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
    pub state: u32,
    pub protect: u32,
    pub kind: u32,
}

impl MemoryRegion {
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn is_committed(&self) -> bool {
        self.state == MEM_COMMIT
    }

    pub fn is_image(&self) -> bool {
        self.kind == MEM_IMAGE
    }

    pub fn is_executable(&self) -> bool {
        matches!(self.protect, PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE)
    }

    /// Protection is one of the readable kinds the scanner accepts.
    pub fn is_scannable_protection(&self) -> bool {
        matches!(
            self.protect,
            PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE | PAGE_READWRITE | PAGE_READONLY
        )
    }
}

/// Trait for enumerating the virtual memory layout of a process.
pub trait QueryRegions {
    /// Describe the region containing `address`.
    ///
    /// Returns `None` once `address` is past the last region, like a
    /// failing `VirtualQueryEx`.
    fn query_region(&self, address: u64) -> Option<MemoryRegion>;
}
