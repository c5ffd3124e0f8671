use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::game::{BeatmapInfo, ModifierSet};
use crate::process::ProcessInfo;
use crate::session::BeatmapSession;

/// Folder next to the game executable holding the beatmaps.
pub const SONGS_FOLDER: &str = "Songs";

/// Default install folder under `%LOCALAPPDATA%`.
pub const INSTALL_FOLDER: &str = "osu!";

/// Builds sessions and remembers where the songs directory is.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    configured: Option<PathBuf>,
    local_app_data: Option<PathBuf>,
    cached: Option<PathBuf>,
}

impl SessionBuilder {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self {
            configured,
            local_app_data: std::env::var_os("LOCALAPPDATA")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            cached: None,
        }
    }

    /// Use `dir` in place of `%LOCALAPPDATA%` for the install fallback.
    pub fn with_local_app_data(mut self, dir: Option<PathBuf>) -> Self {
        self.local_app_data = dir;
        self
    }

    /// Resolve the songs directory: cached, then configured, then the
    /// executable's directory, then the default install under
    /// `%LOCALAPPDATA%`.
    pub fn songs_dir<P: ProcessInfo + ?Sized>(&mut self, process: &P) -> Option<PathBuf> {
        if let Some(dir) = &self.cached {
            return Some(dir.clone());
        }

        let resolved = self
            .configured
            .clone()
            .filter(|dir| dir.is_dir())
            .or_else(|| Self::beside_executable(process))
            .or_else(|| self.default_install());

        if let Some(dir) = &resolved {
            info!("Songs directory: {}", dir.display());
            self.cached = Some(dir.clone());
        }
        resolved
    }

    fn beside_executable<P: ProcessInfo + ?Sized>(process: &P) -> Option<PathBuf> {
        let exe = process
            .executable_path()
            .map_err(|e| debug!("Executable path unavailable: {}", e))
            .ok()?;
        let dir = exe.parent()?.join(SONGS_FOLDER);
        dir.is_dir().then_some(dir)
    }

    fn default_install(&self) -> Option<PathBuf> {
        let dir = self
            .local_app_data
            .as_ref()?
            .join(INSTALL_FOLDER)
            .join(SONGS_FOLDER);
        dir.is_dir().then_some(dir)
    }

    /// Forget the cached directory, e.g. after the game restarted elsewhere.
    pub fn forget_songs_dir(&mut self) {
        self.cached = None;
    }

    pub fn cached_songs_dir(&self) -> Option<&Path> {
        self.cached.as_deref()
    }

    /// True when no session exists or `info`/`mods` no longer match it.
    pub fn needs_rebuild(
        current: Option<&BeatmapSession>,
        info: &BeatmapInfo,
        mods: &ModifierSet,
    ) -> bool {
        current.is_none_or(|session| session.is_superseded_by(info, mods))
    }

    pub fn build<P: ProcessInfo + ?Sized>(
        &mut self,
        process: &P,
        info: &BeatmapInfo,
        mods: &ModifierSet,
    ) -> Result<Arc<BeatmapSession>> {
        let songs_dir = self.songs_dir(process).ok_or(Error::SongsDirNotFound)?;
        let path = info.file_path(&songs_dir);
        BeatmapSession::prepare(&path, info, mods).map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::process::MockMemoryBuilder;

    const MAP: &str = "[General]\nMode: 3\n\n[HitObjects]\n64,192,1000,1,0\n448,192,1200,1,0\n";

    fn info() -> BeatmapInfo {
        BeatmapInfo {
            folder: "set".to_string(),
            filename: "map.osu".to_string(),
            map_id: 1,
            cs: 2.0,
            declared_mode: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_songs_dir_from_executable() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Songs/set")).unwrap();
        fs::write(dir.path().join("Songs/set/map.osu"), MAP).unwrap();

        let process = MockMemoryBuilder::new()
            .executable_path(dir.path().join("osu!.exe"))
            .build();
        let mut builder = SessionBuilder::new(None);

        let session = builder
            .build(&process, &info(), &ModifierSet::default())
            .unwrap();
        assert_eq!(session.keys, 2);
        assert_eq!(builder.cached_songs_dir(), Some(dir.path().join("Songs").as_path()));
    }

    #[test]
    fn test_configured_dir_preferred() {
        let configured = tempfile::tempdir().unwrap();
        fs::create_dir_all(configured.path().join("set")).unwrap();
        fs::write(configured.path().join("set/map.osu"), MAP).unwrap();

        let process = MockMemoryBuilder::new().build();
        let mut builder = SessionBuilder::new(Some(configured.path().to_path_buf()));
        assert!(builder
            .build(&process, &info(), &ModifierSet::default())
            .is_ok());
    }

    #[test]
    fn test_no_songs_dir() {
        let process = MockMemoryBuilder::new().build();
        let mut builder =
            SessionBuilder::new(Some(PathBuf::from("/nonexistent/songs"))).with_local_app_data(None);
        assert!(matches!(
            builder.build(&process, &info(), &ModifierSet::default()),
            Err(Error::SongsDirNotFound)
        ));
    }

    #[test]
    fn test_cache_survives_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let process = MockMemoryBuilder::new().build();
        let mut builder =
            SessionBuilder::new(Some(dir.path().to_path_buf())).with_local_app_data(None);
        assert!(builder.songs_dir(&process).is_some());

        builder.configured = None;
        assert_eq!(builder.songs_dir(&process).as_deref(), Some(dir.path()));

        builder.forget_songs_dir();
        assert!(builder.songs_dir(&process).is_none());
    }

    #[test]
    fn test_songs_dir_falls_back_to_local_app_data() {
        let exe_dir = tempfile::tempdir().unwrap();
        let app_data = tempfile::tempdir().unwrap();
        let songs = app_data.path().join("osu!").join("Songs");
        fs::create_dir_all(&songs).unwrap();

        let process = MockMemoryBuilder::new()
            .executable_path(exe_dir.path().join("osu!.exe"))
            .build();
        let mut builder =
            SessionBuilder::new(None).with_local_app_data(Some(app_data.path().to_path_buf()));
        assert_eq!(builder.songs_dir(&process), Some(songs));
    }

    #[test]
    fn test_executable_dir_wins_over_local_app_data() {
        let exe_dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(exe_dir.path().join("Songs")).unwrap();
        let app_data = tempfile::tempdir().unwrap();
        fs::create_dir_all(app_data.path().join("osu!").join("Songs")).unwrap();

        let process = MockMemoryBuilder::new()
            .executable_path(exe_dir.path().join("osu!.exe"))
            .build();
        let mut builder =
            SessionBuilder::new(None).with_local_app_data(Some(app_data.path().to_path_buf()));
        assert_eq!(builder.songs_dir(&process), Some(exe_dir.path().join("Songs")));
    }

    #[test]
    fn test_needs_rebuild() {
        assert!(SessionBuilder::needs_rebuild(None, &info(), &ModifierSet::default()));
    }
}
