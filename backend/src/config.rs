//! Runtime configuration from environment variables.
//!
//! `main` loads a `.env` file first (via `dotenvy`), so any of these can be
//! set there as well.
//!
//! | Variable                    | Default     |
//! |-----------------------------|-------------|
//! | `CUESHEET_PORT`             | `3000`      |
//! | `CUESHEET_MAX_UPLOAD_BYTES` | `10485760`  |
//! | `CUESHEET_SESSION_PREFIX`   | `cue-sheet` |

use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::export::default_session_name;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SESSION_PREFIX: &str = "cue-sheet";

const PORT_VAR: &str = "CUESHEET_PORT";
const MAX_UPLOAD_VAR: &str = "CUESHEET_MAX_UPLOAD_BYTES";
const SESSION_PREFIX_VAR: &str = "CUESHEET_SESSION_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Largest accepted import upload.
    pub max_upload_bytes: usize,
    /// Prefix for generated session names.
    pub session_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup. Unset or blank
    /// values fall back to defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_or(value(PORT_VAR), PORT_VAR, defaults.port)?,
            max_upload_bytes: parse_or(value(MAX_UPLOAD_VAR), MAX_UPLOAD_VAR, defaults.max_upload_bytes)?,
            session_prefix: value(SESSION_PREFIX_VAR)
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.session_prefix),
        })
    }

    /// Name suggested for a fresh session.
    pub fn default_session_name(&self) -> String {
        default_session_name(&self.session_prefix)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> ConfigResult<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
