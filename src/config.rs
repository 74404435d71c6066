use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::paths::database_file_path;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080";
pub const DEFAULT_PLAYER_BIN: &str = "mpv";

pub const PROBE_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub probe: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: PROBE_TIMEOUT,
            request: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub player_bin: PathBuf,
    pub db_path: PathBuf,
    pub timeouts: Timeouts,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = match env::var_os("VIDSEEK_DB_PATH") {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => database_file_path()?,
        };
        Ok(Self {
            api_base: api_base_from_env(env::var_os("VIDSEEK_API_BASE")),
            player_bin: player_bin_from_env(env::var_os("VIDSEEK_PLAYER_BIN")),
            db_path,
            timeouts: Timeouts::default(),
        })
    }
}

pub(crate) fn api_base_from_env(env_value: Option<OsString>) -> String {
    match env_value {
        Some(value) if !value.is_empty() => value
            .to_string_lossy()
            .trim()
            .trim_end_matches('/')
            .to_string(),
        _ => DEFAULT_API_BASE.to_string(),
    }
}

pub(crate) fn player_bin_from_env(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_PLAYER_BIN),
    }
}
