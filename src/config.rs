//! Fetch configuration loaded from TOML.
//!
//! Priority of the config location:
//! 1. `$XDG_CONFIG_HOME/pubfetch/config.toml`
//! 2. `$HOME/.config/pubfetch/config.toml`
//!
//! A missing file is not an error; every field falls back to the defaults of
//! [`crate::constants`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_BUFFER_SIZE, MAX_RECOVERY_ATTEMPTS, READ_TIMEOUT_SECS,
};

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but cannot be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Config file location.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`FetchConfig`].
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// Config file location.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Accepted range.
        expected: &'static str,
    },
}

/// Settings of the HTTP client and buffered reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// HTTP connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds (1..=3600).
    pub read_timeout_secs: u64,
    /// User agent sent with every request. Defaults to the crate identifier.
    pub user_agent: Option<String>,
    /// Buffer size of buffered reads in bytes (1..=64 MiB).
    pub buffer_size: u64,
    /// Maximum number of replacement requests accepted from a client
    /// delegate for one request (0..=10).
    pub max_recovery_attempts: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            user_agent: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_recovery_attempts: MAX_RECOVERY_ATTEMPTS,
        }
    }
}

impl FetchConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Loads the file at the default location, or the defaults when there
    /// is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        match resolve_default_config_path() {
            Some(path) if path.exists() => Ok((Self::load(&path)?, Some(path))),
            _ => Ok((Self::default(), None)),
        }
    }

    /// Checks every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "connect_timeout_secs",
            self.connect_timeout_secs,
            1,
            3600,
            "1..=3600",
        )?;
        validate_range(
            "read_timeout_secs",
            self.read_timeout_secs,
            1,
            3600,
            "1..=3600",
        )?;
        validate_range(
            "buffer_size",
            self.buffer_size,
            1,
            64 * 1024 * 1024,
            "1..=67108864",
        )?;
        validate_range(
            "max_recovery_attempts",
            u64::from(self.max_recovery_attempts),
            0,
            10,
            "0..=10",
        )?;
        Ok(())
    }
}

fn validate_range(
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            value,
            expected,
        })
    }
}

/// Resolves the default config path.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("pubfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("pubfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
