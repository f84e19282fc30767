//! Process configuration, read once at startup from the environment (and `.env`).

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

/// Prefix every chat command starts with
pub const DEFAULT_PREFIX: &str = "%";

/// Upper bound on a single engine call made by a command
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing Discord token: set DISCORD_TOKEN, TOKEN or DISCORD_TOKEN_FILE")]
    MissingToken,

    #[error("Failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YouTube cookies file not found: {0}")]
    CookiesNotFound(PathBuf),

    #[error("Invalid EMPTY_CHANNEL_POLICY `{0}` (expected `stop` or `pause`)")]
    InvalidPolicy(String),

    #[error("Invalid ENGINE_TIMEOUT_SECS `{0}` (expected a positive integer)")]
    InvalidTimeout(String),

    #[error("COMMAND_PREFIX must not be empty")]
    EmptyPrefix,
}

/// What the engine does when everybody leaves the bot's voice channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyChannelPolicy {
    /// Stop playback, clear the queue and leave the channel.
    #[default]
    Stop,
    /// Pause playback and resume automatically once a listener returns.
    Pause,
}

impl FromStr for EmptyChannelPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stop" | "leave" => Ok(Self::Stop),
            "pause" => Ok(Self::Pause),
            _ => Err(ConfigError::InvalidPolicy(value.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    /// Cookies file handed to `yt-dlp` for authenticated video resolution.
    pub youtube_cookies: Option<PathBuf>,
    pub empty_channel_policy: EmptyChannelPolicy,
    pub engine_timeout: Duration,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("prefix", &self.prefix)
            .field("youtube_cookies", &self.youtube_cookies)
            .field("empty_channel_policy", &self.empty_channel_policy)
            .field("engine_timeout", &self.engine_timeout)
            .finish()
    }
}

impl BotConfig {
    /// Load the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let token = match get("DISCORD_TOKEN").or_else(|| get("TOKEN")) {
            Some(token) => token.trim().to_string(),
            None => {
                let path = get("DISCORD_TOKEN_FILE").ok_or(ConfigError::MissingToken)?;
                read_token_file(Path::new(path.trim()))?
            }
        };

        let prefix = match lookup("COMMAND_PREFIX") {
            Some(prefix) if prefix.trim().is_empty() => return Err(ConfigError::EmptyPrefix),
            Some(prefix) => prefix.trim().to_string(),
            None => DEFAULT_PREFIX.to_string(),
        };

        let youtube_cookies = match get("YOUTUBE_COOKIES") {
            Some(path) => {
                let path = PathBuf::from(path.trim());
                if !path.is_file() {
                    return Err(ConfigError::CookiesNotFound(path));
                }
                Some(path)
            }
            None => None,
        };

        let empty_channel_policy = get("EMPTY_CHANNEL_POLICY")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or_default();

        let engine_timeout = match get("ENGINE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => DEFAULT_ENGINE_TIMEOUT,
        };

        Ok(Self {
            token,
            prefix,
            youtube_cookies,
            empty_channel_policy,
            engine_timeout,
        })
    }
}

fn read_token_file(path: &Path) -> Result<String, ConfigError> {
    let token = fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let token = token.trim();
    if token.is_empty() {
        return Err(ConfigError::MissingToken);
    }
    Ok(token.to_string())
}
