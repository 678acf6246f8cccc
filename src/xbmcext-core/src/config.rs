//! Addon settings read from `xbmcext.toml` in the profile directory.
//!
//! Every field has a default, so a missing file or a file with only a few
//! keys is fine:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! stream = "stderr"
//!
//! [router]
//! max_redirect_depth = 8
//! ```

use crate::paths::AddonDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_VERSION: u32 = 1;
const CONFIG_FILE_NAME: &str = "xbmcext.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub config_version: u32,
    pub logging: LoggingConfig,
    pub router: RouterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            logging: LoggingConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Echo log lines to the console stream.
    #[serde(alias = "stdout")]
    pub console: bool,
    pub stream: LogStream,
    /// Write a daily log file into the profile's `logs` directory.
    pub file: bool,
    pub file_name: Option<String>,
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            stream: LogStream::Stdout,
            file: true,
            file_name: None,
            max_log_files: 7,
        }
    }
}

/// Where console log lines go.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    /// How many nested redirects a single invocation may perform.
    pub max_redirect_depth: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_redirect_depth: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config at {path} is invalid: {source}")]
    Validation {
        path: PathBuf,
        source: ValidationError,
    },
    #[error("failed to prepare addon directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("router.max_redirect_depth must be at least 1")]
    NoRedirects,
}

impl Config {
    /// Read the profile's config file, or defaults when there is none yet.
    pub fn load_or_default(dirs: &AddonDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config
            .validate()
            .map_err(|source| ConfigError::Validation {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config)
    }

    pub fn config_path(dirs: &AddonDirs) -> PathBuf {
        dirs.profile_dir().join(CONFIG_FILE_NAME)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CONFIG_VERSION,
            });
        }
        if self.router.max_redirect_depth == 0 {
            return Err(ValidationError::NoRedirects);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{text}").unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.max_log_files, 7);
        assert!(config.logging.console);
        assert_eq!(config.logging.stream, LogStream::Stdout);
        assert!(config.logging.file);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.router.max_redirect_depth, 32);
    }

    #[test]
    fn invalid_version_rejected() {
        let config = Config {
            config_version: CONFIG_VERSION + 1,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = config_file(
            r#"
[logging]
level = "debug"
stream = "stderr"

[router]
max_redirect_depth = 4
"#,
        );

        let config = Config::load_from(file.path()).expect("config should parse");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.stream, LogStream::Stderr);
        assert!(config.logging.console);
        assert_eq!(config.logging.max_log_files, 7);
        assert_eq!(config.router.max_redirect_depth, 4);
    }

    #[test]
    fn stdout_key_still_toggles_console() {
        let file = config_file("[logging]\nstdout = false\n");
        let config = Config::load_from(file.path()).unwrap();
        assert!(!config.logging.console);
    }

    #[test]
    fn zero_redirect_depth_is_rejected() {
        let file = config_file("[router]\nmax_redirect_depth = 0\n");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation {
                source: ValidationError::NoRedirects,
                ..
            }
        ));
    }

    #[test]
    fn unparsable_file_reports_path() {
        let file = config_file("router = 3\n");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = AddonDirs::new(dir.path().join("addon"), dir.path().join("profile"));
        let config = Config::load_or_default(&dirs).unwrap();
        assert_eq!(config.router, RouterConfig::default());
        assert!(dirs.profile_dir().exists());
    }
}
