#![cfg_attr(not(target_os = "windows"), allow(dead_code, unused_variables))]

use encoding_rs::UTF_16LE;

use crate::error::{Error, Result};
use crate::process::ProcessHandle;
use crate::process::region::{MemoryRegion, QueryRegions};

#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
#[cfg(target_os = "windows")]
use windows::Win32::System::Memory::{MEMORY_BASIC_INFORMATION, VirtualQueryEx};

/// Upper bound for managed string lengths, in UTF-16 code units.
pub const MAX_STRING_LENGTH: i32 = 1000;

/// Trait for reading memory from a process or buffer
///
/// This trait enables mocking for tests and abstracts over different memory sources.
/// Every read is best-effort: a short read or an OS-level failure is an error,
/// which state extractors treat as "value not currently available".
pub trait ReadMemory {
    /// Read raw bytes from memory at the given address
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    fn read_u8(&self, address: u64) -> Result<u8> {
        Ok(self.read_array::<1>(address)?[0])
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array(address)?))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(address)?))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(address)?))
    }

    fn read_f32(&self, address: u64) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(address)?))
    }

    fn read_f64(&self, address: u64) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array(address)?))
    }

    /// Read exactly `N` bytes.
    fn read_array<const N: usize>(&self, address: u64) -> Result<[u8; N]> {
        let bytes = self.read_bytes(address, N)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::MemoryReadFailed {
                address,
                message: format!("Expected {} bytes, read {}", N, bytes.len()),
            })
    }

    /// Read a 32-bit pointer. A zero pointer is reported as `NullPointer`.
    fn read_ptr(&self, address: u64) -> Result<u64> {
        match self.read_u32(address)? {
            0 => Err(Error::NullPointer { address }),
            ptr => Ok(ptr as u64),
        }
    }

    /// Dereference `address`, then dereference once more and return the raw value.
    ///
    /// Only the first hop is null-checked; the final value may legitimately be zero.
    fn read_double_ptr(&self, address: u64) -> Result<u32> {
        let ptr = self.read_ptr(address)?;
        self.read_u32(ptr)
    }

    /// Follow a pointer chain: `*(*(*address + offsets[0]) + offsets[1]) ...`
    fn read_ptr_chain(&self, address: u64, offsets: &[u64]) -> Result<u64> {
        let mut ptr = self.read_ptr(address)?;
        for &offset in offsets {
            ptr = self.read_ptr(ptr.wrapping_add(offset))?;
        }
        Ok(ptr)
    }

    /// Read a managed (.NET) string object.
    ///
    /// Layout: length (i32) at `+0x4`, UTF-16LE code units at `+0x8`.
    fn read_managed_string(&self, address: u64) -> Result<String> {
        if address == 0 {
            return Err(Error::NullPointer { address });
        }

        let length = self.read_i32(address + 0x4)?;
        if length <= 0 || length > MAX_STRING_LENGTH {
            return Err(Error::InvalidString { address, length });
        }

        let bytes = self.read_bytes(address + 0x8, length as usize * 2)?;
        let decoded = UTF_16LE
            .decode_without_bom_handling_and_without_replacement(&bytes)
            .ok_or(Error::InvalidString { address, length })?;

        Ok(decoded.trim_end_matches('\0').to_string())
    }

    /// Read a pointer at `address` and the managed string it points to.
    fn read_string_ptr(&self, address: u64) -> Result<String> {
        let ptr = self.read_ptr(address)?;
        self.read_managed_string(ptr)
    }
}

impl<T: ReadMemory + ?Sized> ReadMemory for &T {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }
}

impl ProcessHandle {
    #[cfg(target_os = "windows")]
    fn read_bytes_impl(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with:
        // - A valid process handle from ProcessHandle (obtained via OpenProcess with PROCESS_VM_READ)
        // - A properly allocated buffer of the requested size
        // - A pointer to receive the actual bytes read
        // An invalid address makes the call fail, which is reported via Result.
        unsafe {
            ReadProcessMemory(
                self.handle(),
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;
        }

        // All-or-nothing: a partially read structure cannot be interpreted.
        if bytes_read != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Expected {} bytes, read {}", size, bytes_read),
            });
        }

        Ok(buffer)
    }

    #[cfg(not(target_os = "windows"))]
    fn read_bytes_impl(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::MemoryReadFailed {
            address,
            message: "Windows only: memory reading not supported on this platform".to_string(),
        })
    }

    #[cfg(target_os = "windows")]
    fn query_region_impl(&self, address: u64) -> Option<MemoryRegion> {
        let mut info = MEMORY_BASIC_INFORMATION::default();

        // SAFETY: VirtualQueryEx only writes into the provided, correctly sized struct.
        let written = unsafe {
            VirtualQueryEx(
                self.handle(),
                Some(address as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            return None;
        }

        Some(MemoryRegion {
            base: info.BaseAddress as u64,
            size: info.RegionSize as u64,
            state: info.State.0,
            protect: info.Protect.0,
            kind: info.Type.0,
        })
    }

    #[cfg(not(target_os = "windows"))]
    fn query_region_impl(&self, _address: u64) -> Option<MemoryRegion> {
        None
    }
}

impl ReadMemory for ProcessHandle {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.read_bytes_impl(address, size)
    }
}

impl QueryRegions for ProcessHandle {
    fn query_region(&self, address: u64) -> Option<MemoryRegion> {
        self.query_region_impl(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::{MockMemoryBuilder, MockMemoryReader};

    #[test]
    fn test_read_i32_negative() {
        let reader = MockMemoryReader::new(vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(reader.read_i32(0x1000).unwrap(), -1);
    }

    #[test]
    fn test_read_u16_and_u8() {
        let reader = MockMemoryReader::new(vec![0x34, 0x12, 0x7F]);
        assert_eq!(reader.read_u16(0x1000).unwrap(), 0x1234);
        assert_eq!(reader.read_u8(0x1002).unwrap(), 0x7F);
    }

    #[test]
    fn test_read_floats() {
        let reader = MockMemoryBuilder::new()
            .write_f32(0, 8.5)
            .write_f64(4, 97.25)
            .build();

        assert_eq!(reader.read_f32(0x1000).unwrap(), 8.5);
        assert_eq!(reader.read_f64(0x1004).unwrap(), 97.25);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let reader = MockMemoryReader::new(vec![0x01, 0x02]);
        assert!(reader.read_u32(0x1000).is_err());
    }

    #[test]
    fn test_read_ptr_null_is_absence() {
        let reader = MockMemoryBuilder::new().write_u32(0, 0).build();
        let err = reader.read_ptr(0x1000).unwrap_err();
        assert!(matches!(err, Error::NullPointer { address: 0x1000 }));
    }

    #[test]
    fn test_read_double_ptr_allows_zero_value() {
        // 0x1000 -> 0x1008 -> 0 (e.g. GameState::Menu)
        let reader = MockMemoryBuilder::new()
            .write_u32(0, 0x1008)
            .write_u32(8, 0)
            .build();

        assert_eq!(reader.read_double_ptr(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_read_ptr_chain() {
        // 0x1000 -> 0x1010; [0x1010 + 4] -> 0x1020; [0x1020 + 8] -> 0x1040
        let reader = MockMemoryBuilder::new()
            .write_u32(0x00, 0x1010)
            .write_u32(0x14, 0x1020)
            .write_u32(0x28, 0x1040)
            .build();

        assert_eq!(reader.read_ptr_chain(0x1000, &[]).unwrap(), 0x1010);
        assert_eq!(reader.read_ptr_chain(0x1000, &[0x4, 0x8]).unwrap(), 0x1040);
    }

    #[test]
    fn test_read_ptr_chain_breaks_on_null() {
        let reader = MockMemoryBuilder::new()
            .write_u32(0x00, 0x1010)
            .write_u32(0x14, 0)
            .build();

        assert!(reader.read_ptr_chain(0x1000, &[0x4, 0x8]).is_err());
    }

    #[test]
    fn test_read_managed_string() {
        let reader = MockMemoryBuilder::new()
            .write_managed_string(0x10, "Camellia")
            .build();

        assert_eq!(reader.read_managed_string(0x1010).unwrap(), "Camellia");
    }

    #[test]
    fn test_read_managed_string_non_ascii() {
        let reader = MockMemoryBuilder::new()
            .write_managed_string(0x10, "ヒトリゴト")
            .build();

        assert_eq!(reader.read_managed_string(0x1010).unwrap(), "ヒトリゴト");
    }

    #[test]
    fn test_read_managed_string_rejects_bad_length() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x40)
            .write_i32(0x4, 0)
            .write_i32(0x14, 5000)
            .build();

        assert!(matches!(
            reader.read_managed_string(0x1000),
            Err(Error::InvalidString { length: 0, .. })
        ));
        assert!(matches!(
            reader.read_managed_string(0x1010),
            Err(Error::InvalidString { length: 5000, .. })
        ));
        assert!(reader.read_managed_string(0).is_err());
    }

    #[test]
    fn test_read_string_ptr() {
        let reader = MockMemoryBuilder::new()
            .write_u32(0, 0x1020)
            .write_managed_string(0x20, "Easy")
            .build();

        assert_eq!(reader.read_string_ptr(0x1000).unwrap(), "Easy");
    }
}
