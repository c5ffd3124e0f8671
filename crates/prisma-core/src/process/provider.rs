//! Process provider abstraction for testability.
//!
//! These traits abstract process discovery and access, so the tracking loop
//! can run against a synthetic process in tests.

use std::path::PathBuf;

use crate::error::Result;
use crate::process::ProcessHandle;

/// Properties of an opened process.
pub trait ProcessInfo {
    /// Get the process ID.
    fn pid(&self) -> u32;

    /// Check if the process is still running.
    fn is_alive(&self) -> bool;

    /// Full path of the process executable.
    fn executable_path(&self) -> Result<PathBuf>;
}

/// Trait for finding and opening the game process.
pub trait ProcessProvider {
    /// The type of process returned by this provider.
    type Process: ProcessInfo;

    /// Find and open the target game process.
    fn find_process(&self) -> Result<Self::Process>;

    /// Open a process by its PID.
    fn open_process(&self, pid: u32) -> Result<Self::Process>;
}

/// Provider backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessProvider;

impl ProcessProvider for SystemProcessProvider {
    type Process = ProcessHandle;

    fn find_process(&self) -> Result<Self::Process> {
        ProcessHandle::find_and_open()
    }

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        ProcessHandle::open(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FakeProcess {
        pid: u32,
        alive: bool,
        exe: Option<PathBuf>,
    }

    impl ProcessInfo for FakeProcess {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn is_alive(&self) -> bool {
            self.alive
        }

        fn executable_path(&self) -> Result<PathBuf> {
            self.exe
                .clone()
                .ok_or_else(|| Error::ProcessOpenFailed("no image name".to_string()))
        }
    }

    struct FakeProvider {
        pid: Option<u32>,
    }

    impl ProcessProvider for FakeProvider {
        type Process = FakeProcess;

        fn find_process(&self) -> Result<Self::Process> {
            self.pid
                .map(|pid| FakeProcess {
                    pid,
                    alive: true,
                    exe: Some(PathBuf::from("C:/osu!/osu!.exe")),
                })
                .ok_or_else(|| Error::ProcessNotFound("osu!.exe".to_string()))
        }

        fn open_process(&self, pid: u32) -> Result<Self::Process> {
            match self.pid {
                Some(p) if p == pid => self.find_process(),
                _ => Err(Error::ProcessNotFound(format!("PID {} not found", pid))),
            }
        }
    }

    #[test]
    fn test_fake_provider_find_process() {
        let provider = FakeProvider { pid: Some(1234) };
        let process = provider.find_process().unwrap();
        assert_eq!(process.pid(), 1234);
        assert!(process.is_alive());
        assert_eq!(
            process.executable_path().unwrap(),
            PathBuf::from("C:/osu!/osu!.exe")
        );
    }

    #[test]
    fn test_fake_provider_not_found() {
        let provider = FakeProvider { pid: None };
        assert!(matches!(
            provider.find_process(),
            Err(Error::ProcessNotFound(_))
        ));
    }

    #[test]
    fn test_fake_provider_open_process() {
        let provider = FakeProvider { pid: Some(1234) };
        assert!(provider.open_process(1234).is_ok());
        assert!(provider.open_process(9999).is_err());
    }

    #[test]
    fn test_fake_process_without_image_name() {
        let process = FakeProcess {
            pid: 1,
            alive: false,
            exe: None,
        };
        assert!(!process.is_alive());
        assert!(process.executable_path().is_err());
    }
}
