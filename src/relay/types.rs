//! Shared types for the poll-match-relay pipeline.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChannelError;

// ── Timestamp ───────────────────────────────────────────────────────

/// Stream position marker.
///
/// Slack assigns every message a `ts` such as `"1512085950.000216"`: seconds
/// since the epoch with a microsecond suffix. It doubles as the message id and
/// as the ordering key, so it is held as an exact decimal and never as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Decimal);

impl Timestamp {
    /// Sentinel position before the first poll ("beginning of time").
    pub const BEGINNING: Timestamp = Timestamp(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Wall-clock time this marker encodes, in UTC.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.0.trunc().to_i64()?;
        let nanos = (self.0.fract() * Decimal::from(1_000_000_000u32))
            .trunc()
            .to_u32()?;
        DateTime::from_timestamp(secs, nanos)
    }

    /// Wall-clock time this marker encodes, in the host's local zone.
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        self.to_utc().map(|t| t.with_timezone(&Local))
    }
}

impl From<Decimal> for Timestamp {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Timestamp {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

// ── Messages and users ──────────────────────────────────────────────

/// One message from the monitored stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Stream-assigned ordering key.
    pub ts: Timestamp,
    /// Opaque author identifier.
    pub author: String,
    /// Message body, possibly empty.
    pub text: String,
}

impl ChatMessage {
    pub fn new(ts: impl Into<Timestamp>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            ts: ts.into(),
            author: author.into(),
            text: text.into(),
        }
    }
}

/// Resolved profile of a message author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    /// Account handle.
    pub name: String,
    pub real_name: Option<String>,
    pub display_name: Option<String>,
    /// IANA time zone name, if the service reports one.
    pub tz: Option<String>,
}

impl UserProfile {
    /// Display name, then real name, then handle.
    pub fn preferred_name(&self) -> &str {
        [self.display_name.as_deref(), self.real_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

// ── Capabilities ────────────────────────────────────────────────────

/// Narrow chat-service capability the poller depends on.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Messages in `channel` with `ts > oldest`, in any order.
    async fn fetch_since(
        &self,
        channel: &str,
        oldest: Timestamp,
    ) -> Result<Vec<ChatMessage>, ChannelError>;

    /// Post `text` to `channel`. Best effort; no delivery confirmation.
    async fn relay(&self, channel: &str, text: &str) -> Result<(), ChannelError>;
}

/// Optional author lookup used to enrich relay text.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_user(&self, user_id: &str) -> Result<UserProfile, ChannelError>;
}
