//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Slack Web API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Default delay between the end of one poll and the start of the next.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default per-request timeout for chat service calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// PID file name inside the configured PID directory.
pub const PID_FILE_NAME: &str = "vulture.pid";

/// Relay configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bot token for the Slack Web API.
    pub bot_token: SecretString,
    /// Channel watched for trigger words.
    pub monitor_channel: String,
    /// Channel that receives relayed matches.
    pub notify_channel: String,
    /// Trigger words, in configured order.
    pub trigger_words: Vec<String>,
    /// Lower-case both tokens and triggers before comparing.
    pub case_insensitive: bool,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Timeout applied to every chat service request.
    pub request_timeout: Duration,
    /// Slack Web API base URL (no trailing slash).
    pub api_base_url: String,
    /// Resolve author ids to names when composing relays.
    pub resolve_users: bool,
    /// Directory holding the single-instance PID file.
    pub pid_dir: PathBuf,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let bot_token = SecretString::from(required("SLACK_BOT_TOKEN")?);
        let monitor_channel = required("VULTURE_MONITOR_CHANNEL")?;
        let notify_channel = required("VULTURE_NOTIFY_CHANNEL")?;

        let trigger_words: Vec<String> = required("VULTURE_TRIGGER_WORDS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if trigger_words.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "VULTURE_TRIGGER_WORDS".into(),
                message: "at least one trigger word is required".into(),
            });
        }

        let case_insensitive = parse_bool(&lookup, "VULTURE_CASE_INSENSITIVE", false)?;
        let resolve_users = parse_bool(&lookup, "VULTURE_RESOLVE_USERS", true)?;

        let poll_interval = Duration::from_secs(parse_secs(
            &lookup,
            "VULTURE_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?);
        let request_timeout = Duration::from_secs(parse_secs(
            &lookup,
            "VULTURE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let api_base_url = lookup("SLACK_API_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let pid_dir = lookup("VULTURE_PID_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            bot_token,
            monitor_channel,
            notify_channel,
            trigger_words,
            case_insensitive,
            poll_interval,
            request_timeout,
            api_base_url,
            resolve_users,
            pid_dir,
        })
    }

    /// Full path of the PID file.
    pub fn pid_file_path(&self) -> PathBuf {
        self.pid_dir.join(PID_FILE_NAME)
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key).filter(|s| !s.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
