//! Relay text composition.

use std::fmt;

use chrono::{DateTime, Local};

use super::types::ChatMessage;

/// Emoji used for the relay header.
pub const RELAY_EMOJI: &str = ":vulture:";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text posted to the notification channel for one matched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRecord {
    monitor_channel: String,
    author: String,
    posted_at: Option<DateTime<Local>>,
    text: String,
}

impl RelayRecord {
    /// Record for `message`, attributed with a mention of its author.
    pub fn new(message: &ChatMessage, monitor_channel: &str) -> Self {
        Self {
            monitor_channel: monitor_channel.to_string(),
            author: mention(&message.author),
            posted_at: message.ts.to_local(),
            text: message.text.clone(),
        }
    }

    /// Replace the author mention with a resolved name.
    pub fn with_author_name(mut self, name: &str) -> Self {
        if !name.trim().is_empty() {
            self.author = name.to_string();
        }
        self
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RelayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{RELAY_EMOJI} Trigger word spotted in <#{}>",
            self.monitor_channel
        )?;
        match self.posted_at {
            Some(at) => writeln!(f, "*{}* at {}", self.author, at.format(TIME_FORMAT))?,
            None => writeln!(f, "*{}*", self.author)?,
        }
        let mut lines = self.text.lines().peekable();
        if lines.peek().is_none() {
            return write!(f, ">");
        }
        let mut first = true;
        for line in lines {
            if !first {
                writeln!(f)?;
            }
            first = false;
            if line.is_empty() {
                write!(f, ">")?;
            } else {
                write!(f, "> {line}")?;
            }
        }
        Ok(())
    }
}

/// Slack mention markup for a user id. Non-user authors are shown as-is.
fn mention(author: &str) -> String {
    if is_user_id(author) {
        format!("<@{author}>")
    } else {
        author.to_string()
    }
}

/// Slack user ids start with `U` or `W` followed by upper-case alphanumerics.
pub fn is_user_id(author: &str) -> bool {
    let mut chars = author.chars();
    matches!(chars.next(), Some('U' | 'W'))
        && author.len() > 1
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
