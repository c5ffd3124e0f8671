//! Signature scanning over the virtual memory of a process.

use tracing::{debug, trace};

use crate::process::{ChunkedMemoryIterator, DEFAULT_CHUNK_SIZE, MemoryRegion, Pattern};
use crate::process::{QueryRegions, ReadMemory};

/// End of user-mode address space; the region walk stops here.
pub const ADDRESS_CEILING: u64 = 0x7FFF_FFFF_0000;

/// Regions larger than this are never scanned.
pub const MAX_REGION_SIZE: u64 = 100 * 1024 * 1024;

/// Non-image, non-executable regions (heaps) larger than this are skipped.
pub const MAX_DATA_REGION_SIZE: u64 = 1024 * 1024;

/// Whether a region is worth reading for signatures.
pub fn is_scannable(region: &MemoryRegion) -> bool {
    if !region.is_committed() || !region.is_scannable_protection() {
        return false;
    }
    if region.size > MAX_REGION_SIZE {
        return false;
    }
    if !region.is_image() && !region.is_executable() && region.size > MAX_DATA_REGION_SIZE {
        return false;
    }
    true
}

/// Find the first match of `pattern`, walking regions in ascending order.
///
/// Returns `region_base + chunk_offset + match_offset + pattern.offset`,
/// or `None` when the pattern does not occur.
pub fn scan<R>(reader: &R, pattern: &Pattern) -> Option<u64>
where
    R: ReadMemory + QueryRegions + ?Sized,
{
    scan_with_chunk_size(reader, pattern, DEFAULT_CHUNK_SIZE)
}

/// [`scan`] with an explicit chunk size.
pub fn scan_with_chunk_size<R>(reader: &R, pattern: &Pattern, chunk_size: usize) -> Option<u64>
where
    R: ReadMemory + QueryRegions + ?Sized,
{
    let mut address = 0u64;

    while let Some(region) = reader.query_region(address) {
        let next = region.end();
        if next <= address {
            break;
        }
        address = next;

        if is_scannable(&region) {
            if let Some(found) = scan_region(reader, &region, pattern, chunk_size) {
                return Some(found);
            }
        } else {
            trace!(
                "Skipping region {:#x}+{:#x} (state={:#x}, protect={:#x}, type={:#x})",
                region.base, region.size, region.state, region.protect, region.kind
            );
        }

        if address >= ADDRESS_CEILING {
            break;
        }
    }

    None
}

fn scan_region<R>(reader: &R, region: &MemoryRegion, pattern: &Pattern, chunk_size: usize) -> Option<u64>
where
    R: ReadMemory + ?Sized,
{
    let chunks =
        ChunkedMemoryIterator::new(reader, region.base, region.end(), chunk_size, pattern.len());

    for chunk in chunks {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                // Pages can be released between the query and the read
                trace!("Chunk read failed: {}", e);
                continue;
            }
        };

        if let Some(pos) = pattern.find_in(&chunk.data) {
            let found = (chunk.address + pos as u64).wrapping_add_signed(pattern.offset());
            debug!(
                "Pattern matched at {:#x} (region {:#x}, offset {:+})",
                found,
                region.base,
                pattern.offset()
            );
            return Some(found);
        }
    }

    None
}
