use crate::host::Host;
use crate::{APP_AUTHOR, APP_QUALIFIER};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Install and profile directories of the running addon.
#[derive(Debug, Clone)]
pub struct AddonDirs {
    addon_dir: PathBuf,
    profile_dir: PathBuf,
    log_dir: PathBuf,
}

impl AddonDirs {
    pub fn new(addon_dir: impl Into<PathBuf>, profile_dir: impl Into<PathBuf>) -> Self {
        let profile_dir = profile_dir.into();
        let log_dir = profile_dir.join("logs");
        Self {
            addon_dir: addon_dir.into(),
            profile_dir,
            log_dir,
        }
    }

    /// Ask the host where the addon is installed and where it may store data.
    pub fn from_host<H: Host + ?Sized>(host: &H) -> Self {
        Self::new(
            host.translate_path(&host.addon_info("path")),
            host.translate_path(&host.addon_info("profile")),
        )
    }

    /// Standalone fallback using the platform's per-user directories.
    pub fn discover(addon_id: &str) -> Result<Self, DirsError> {
        let dirs = ProjectDirs::from(APP_QUALIFIER, APP_AUTHOR, addon_id)
            .ok_or(DirsError::MissingProjectDirs)?;
        Ok(Self::new(dirs.data_dir(), dirs.config_dir()))
    }

    pub fn ensure_exists(&self) -> Result<(), DirsError> {
        for dir in [&self.profile_dir, &self.log_dir] {
            std::fs::create_dir_all(dir).map_err(|source| DirsError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn addon_dir(&self) -> &Path {
        &self.addon_dir
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

#[derive(Debug, Error)]
pub enum DirsError {
    #[error("unable to determine user directories for the addon")]
    MissingProjectDirs,
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingHost;

    #[test]
    fn discover_returns_dirs() {
        let dirs = AddonDirs::discover("plugin.video.example").expect("should build dirs");
        assert!(dirs.log_dir().ends_with("logs"));
        assert!(dirs.log_dir().starts_with(dirs.profile_dir()));
    }

    #[test]
    fn host_paths_are_used() {
        let host = RecordingHost::new()
            .with_info("path", "/opt/kodi/addons/plugin.video.example")
            .with_info("profile", "/home/kodi/userdata/addon_data/plugin.video.example");
        let dirs = AddonDirs::from_host(&host);
        assert_eq!(
            dirs.addon_dir(),
            Path::new("/opt/kodi/addons/plugin.video.example")
        );
        assert_eq!(
            dirs.log_dir(),
            Path::new("/home/kodi/userdata/addon_data/plugin.video.example/logs")
        );
    }

    #[test]
    fn ensure_exists_creates_profile_and_logs() {
        let root = tempfile::tempdir().unwrap();
        let dirs = AddonDirs::new(root.path().join("addon"), root.path().join("profile"));
        dirs.ensure_exists().unwrap();
        assert!(dirs.log_dir().is_dir());
        assert!(!dirs.addon_dir().exists());
    }
}
