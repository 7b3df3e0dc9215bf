//! Client Configuration
//!
//! Endpoints and timeouts for both server channels, plus the player name.
//! Defaults point at the public servers; every value can be overridden
//! from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::network::transport::SessionConfig;

/// Public game server.
pub const DEFAULT_GAME_URL: &str = "wss://server.lucasholten.com:21212";

/// Public highscores server.
pub const DEFAULT_HIGHSCORES_URL: &str = "wss://server.lucasholten.com:12121";

/// Game receives wait up to half a second per poll.
pub const DEFAULT_GAME_TIMEOUT: Duration = Duration::from_millis(500);

/// Highscores receives barely wait; the list arrives once.
pub const DEFAULT_HIGHSCORES_TIMEOUT: Duration = Duration::from_millis(10);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("invalid value {value:?} for {key}: expected seconds or `off`")]
    InvalidDuration {
        /// Environment variable.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Game channel session.
    pub game: SessionConfig,
    /// Highscores channel session.
    pub highscores: SessionConfig,
    /// Display name. `None` means ask the player.
    pub player_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            game: SessionConfig::new(DEFAULT_GAME_URL, Some(DEFAULT_GAME_TIMEOUT)),
            highscores: SessionConfig::new(DEFAULT_HIGHSCORES_URL, Some(DEFAULT_HIGHSCORES_TIMEOUT)),
            player_name: None,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// - `NUMGRID_GAME_URL`, `NUMGRID_HIGHSCORES_URL`
    /// - `NUMGRID_GAME_TIMEOUT_SECS`, `NUMGRID_HIGHSCORES_TIMEOUT_SECS`:
    ///   seconds, or `off` to wait indefinitely
    /// - `NUMGRID_CONNECT_TIMEOUT_SECS`: seconds, both channels
    /// - `NUMGRID_PLAYER`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("NUMGRID_GAME_URL") {
            config.game.url = url;
        }
        if let Some(url) = lookup("NUMGRID_HIGHSCORES_URL") {
            config.highscores.url = url;
        }

        const GAME_TIMEOUT: &str = "NUMGRID_GAME_TIMEOUT_SECS";
        if let Some(raw) = lookup(GAME_TIMEOUT) {
            config.game.receive_timeout = parse_timeout(GAME_TIMEOUT, &raw)?;
        }
        const HIGHSCORES_TIMEOUT: &str = "NUMGRID_HIGHSCORES_TIMEOUT_SECS";
        if let Some(raw) = lookup(HIGHSCORES_TIMEOUT) {
            config.highscores.receive_timeout = parse_timeout(HIGHSCORES_TIMEOUT, &raw)?;
        }
        const CONNECT_TIMEOUT: &str = "NUMGRID_CONNECT_TIMEOUT_SECS";
        if let Some(raw) = lookup(CONNECT_TIMEOUT) {
            let limit = parse_timeout(CONNECT_TIMEOUT, &raw)?.ok_or_else(|| ConfigError::InvalidDuration {
                key: CONNECT_TIMEOUT,
                value: raw.clone(),
            })?;
            config.game.connect_timeout = limit;
            config.highscores.connect_timeout = limit;
        }

        config.player_name = lookup("NUMGRID_PLAYER").filter(|name| !name.is_empty());
        Ok(config)
    }
}

/// `off` disables the timeout; anything else is non-negative seconds.
fn parse_timeout(key: &'static str, raw: &str) -> Result<Option<Duration>, ConfigError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidDuration {
            key,
            value: raw.to_string(),
        })
}
