//! Client configuration parsed from environment variables.
//!
//! Variables:
//! - `BLOG_API_URL`: API base URL (default `http://localhost:8000/api`)
//! - `BLOG_REQUEST_TIMEOUT_SECS`: default 10
//! - `BLOG_CONNECT_TIMEOUT_SECS`: default 5
//! - `BLOG_TOKEN_PERSISTENCE`: `memory` (default) or `mirror`
//! - `BLOG_TOKEN_MIRROR_PATH`: mirror file; defaults to the user config dir

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const MIRROR_FILE_NAME: &str = "session.json";
const APP_DIR: &str = "blogline";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("no config directory available; set BLOG_TOKEN_MIRROR_PATH")]
    NoMirrorPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Where (if anywhere) the access token survives past the process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenPersistence {
    /// Tokens live only in memory.
    #[default]
    Memory,
    /// The access token is mirrored to a JSON file at this path.
    Mirror(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
    pub persistence: TokenPersistence,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_owned(), timeouts: Timeouts::default(), persistence: TokenPersistence::Memory }
    }
}

impl ClientConfig {
    /// Build typed config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is malformed or a mirror is requested
    /// with no resolvable path.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = normalize_base_url(&lookup("BLOG_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()))?;
        let timeouts = Timeouts {
            request_secs: parse_secs(lookup("BLOG_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_secs(lookup("BLOG_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let persistence = parse_persistence(
            lookup("BLOG_TOKEN_PERSISTENCE").as_deref(),
            lookup("BLOG_TOKEN_MIRROR_PATH").map(PathBuf::from),
        )?;
        Ok(Self { base_url, timeouts, persistence })
    }
}

/// Trim trailing slashes and require an http(s) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for anything that is not an http(s) URL.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Parse(format!("invalid BLOG_API_URL '{raw}' (expected http:// or https://)")));
    }
    Ok(trimmed.to_owned())
}

fn parse_secs(raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::Parse(format!("invalid timeout '{raw}' (expected positive seconds)"))),
        Ok(secs) => Ok(secs),
    }
}

/// Resolve the persistence policy from its textual form.
///
/// # Errors
///
/// Returns [`ConfigError`] for unknown modes or when `mirror` has no path.
pub fn parse_persistence(mode: Option<&str>, path: Option<PathBuf>) -> Result<TokenPersistence, ConfigError> {
    match mode.unwrap_or("memory") {
        "memory" => Ok(TokenPersistence::Memory),
        "mirror" => {
            let path = path.or_else(default_mirror_path).ok_or(ConfigError::NoMirrorPath)?;
            Ok(TokenPersistence::Mirror(path))
        }
        other => Err(ConfigError::Parse(format!(
            "unsupported token persistence '{other}' (expected 'memory' or 'mirror')"
        ))),
    }
}

/// `<config dir>/blogline/session.json`, when the platform has a config dir.
#[must_use]
pub fn default_mirror_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(MIRROR_FILE_NAME))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
