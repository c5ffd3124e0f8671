//! Dynamic-library binding of the execution engine.

use std::path::Path;

use crate::beatmap::HitObject;
use crate::engine::ExecutionEngine;
use crate::error::{Error, Result};

/// Default library file name, looked up next to the executable.
pub const ENGINE_LIBRARY: &str = "main.dll";

#[cfg(target_os = "windows")]
mod ffi {
    use std::ffi::c_int;

    use crate::beatmap::HitObject;

    pub type ClickHitObjects = unsafe extern "C" fn(
        objects: *const HitObject,
        count: c_int,
        column_index: c_int,
        unused: c_int,
        start_time_adjustment: c_int,
        enable: bool,
        offset: c_int,
        keys: c_int,
        custom_keys: *const u16,
    );
    pub type SetBool = unsafe extern "C" fn(value: bool);
    pub type SetInt = unsafe extern "C" fn(value: c_int);
}

/// Engine loaded from `main.dll`.
#[cfg(target_os = "windows")]
pub struct LibraryEngine {
    module: windows::Win32::Foundation::HMODULE,
    click_hit_objects: ffi::ClickHitObjects,
    set_stop_clicking: ffi::SetBool,
    set_timing_shift: ffi::SetInt,
    set_offset: ffi::SetInt,
}

#[cfg(not(target_os = "windows"))]
pub struct LibraryEngine {
    _private: (),
}

// SAFETY: the module handle is only used to free the library on drop, and
// the exported functions synchronize internally.
#[cfg(target_os = "windows")]
unsafe impl Send for LibraryEngine {}
#[cfg(target_os = "windows")]
unsafe impl Sync for LibraryEngine {}

impl LibraryEngine {
    #[cfg(target_os = "windows")]
    pub fn load(path: &Path) -> Result<Self> {
        use windows::Win32::Foundation::FreeLibrary;
        use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
        use windows::core::{HSTRING, PCSTR, s};

        if !path.is_file() {
            return Err(Error::EngineLoadFailed(format!(
                "{} not found",
                path.display()
            )));
        }

        let module = unsafe { LoadLibraryW(&HSTRING::from(path.as_os_str())) }
            .map_err(|e| Error::EngineLoadFailed(format!("{}: {}", path.display(), e)))?;

        let symbol = |name: PCSTR| {
            let address = unsafe { GetProcAddress(module, name) };
            address.ok_or_else(|| {
                let name = unsafe { name.to_string() }.unwrap_or_default();
                Error::EngineLoadFailed(format!("missing export {}", name))
            })
        };

        let resolved = (|| {
            Ok::<_, Error>((
                symbol(s!("clickHitObjects"))?,
                symbol(s!("setStopClicking"))?,
                symbol(s!("setTimingShift"))?,
                symbol(s!("setOffset"))?,
            ))
        })();

        let (click, stop, shift, offset) = match resolved {
            Ok(symbols) => symbols,
            Err(e) => {
                let _ = unsafe { FreeLibrary(module) };
                return Err(e);
            }
        };

        tracing::info!("Loaded execution engine from {}", path.display());

        // SAFETY: the exports have these C signatures.
        unsafe {
            Ok(Self {
                module,
                click_hit_objects: std::mem::transmute::<
                    unsafe extern "system" fn() -> isize,
                    ffi::ClickHitObjects,
                >(click),
                set_stop_clicking: std::mem::transmute::<
                    unsafe extern "system" fn() -> isize,
                    ffi::SetBool,
                >(stop),
                set_timing_shift: std::mem::transmute::<
                    unsafe extern "system" fn() -> isize,
                    ffi::SetInt,
                >(shift),
                set_offset: std::mem::transmute::<unsafe extern "system" fn() -> isize, ffi::SetInt>(
                    offset,
                ),
            })
        }
    }

    #[cfg(not(target_os = "windows"))]
    pub fn load(path: &Path) -> Result<Self> {
        Err(Error::EngineLoadFailed(format!(
            "{}: dynamic engine is only available on Windows",
            path.display()
        )))
    }
}

#[cfg(target_os = "windows")]
impl Drop for LibraryEngine {
    fn drop(&mut self) {
        unsafe {
            let _ = windows::Win32::Foundation::FreeLibrary(self.module);
        }
    }
}

#[cfg(target_os = "windows")]
impl ExecutionEngine for LibraryEngine {
    fn click_hit_objects(
        &self,
        notes: &[HitObject],
        time_adjustment: i32,
        enable: bool,
        offset: i32,
        keys: i32,
        custom_keys: Option<&[u16]>,
    ) -> Result<()> {
        let count = i32::try_from(notes.len())
            .map_err(|_| Error::Engine(format!("too many notes: {}", notes.len())))?;
        let custom = custom_keys.map_or(std::ptr::null(), <[u16]>::as_ptr);
        // SAFETY: `notes` and `custom` outlive the blocking call.
        unsafe {
            (self.click_hit_objects)(
                notes.as_ptr(),
                count,
                0,
                0,
                time_adjustment,
                enable,
                offset,
                keys,
                custom,
            );
        }
        Ok(())
    }

    fn set_stop(&self, stop: bool) -> Result<()> {
        unsafe { (self.set_stop_clicking)(stop) };
        Ok(())
    }

    fn set_timing_shift(&self, shift: i32) -> Result<()> {
        unsafe { (self.set_timing_shift)(shift) };
        Ok(())
    }

    fn set_offset(&self, offset: i32) -> Result<()> {
        unsafe { (self.set_offset)(offset) };
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl ExecutionEngine for LibraryEngine {
    fn click_hit_objects(
        &self,
        _notes: &[HitObject],
        _time_adjustment: i32,
        _enable: bool,
        _offset: i32,
        _keys: i32,
        _custom_keys: Option<&[u16]>,
    ) -> Result<()> {
        Err(Error::Engine("unsupported platform".to_string()))
    }

    fn set_stop(&self, _stop: bool) -> Result<()> {
        Err(Error::Engine("unsupported platform".to_string()))
    }

    fn set_timing_shift(&self, _shift: i32) -> Result<()> {
        Err(Error::Engine("unsupported platform".to_string()))
    }

    fn set_offset(&self, _offset: i32) -> Result<()> {
        Err(Error::Engine("unsupported platform".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        let result = LibraryEngine::load(&dir.path().join(ENGINE_LIBRARY));
        assert!(matches!(result, Err(Error::EngineLoadFailed(_))));
    }
}
