//! Slack Web API wire types.

use serde::{Deserialize, Serialize};

use crate::relay::types::{ChatMessage, Timestamp, UserProfile};

/// Envelope fields present on every Web API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiStatus {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `conversations.history` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
    #[serde(default)]
    pub has_more: bool,
}

/// Subtypes Slack generates for channel housekeeping rather than user posts.
const SYSTEM_SUBTYPES: &[&str] = &[
    "channel_join",
    "channel_leave",
    "channel_topic",
    "channel_purpose",
    "channel_name",
    "channel_archive",
    "channel_unarchive",
    "group_join",
    "group_leave",
    "pinned_item",
    "unpinned_item",
];

/// One entry of `conversations.history`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    pub ts: Timestamp,
}

impl SlackMessage {
    /// Join, leave, topic and pin notices. Their text is generated by Slack.
    pub fn is_system_event(&self) -> bool {
        self.subtype
            .as_deref()
            .is_some_and(|s| SYSTEM_SUBTYPES.contains(&s))
    }
}

/// System events keep their `ts` so the cursor moves past them, but carry no
/// text to match.
impl From<SlackMessage> for ChatMessage {
    fn from(msg: SlackMessage) -> Self {
        let text = if msg.is_system_event() {
            String::new()
        } else {
            msg.text
        };
        let author = msg
            .user
            .or(msg.bot_id)
            .unwrap_or_else(|| "unknown".to_string());
        ChatMessage {
            ts: msg.ts,
            author,
            text,
        }
    }
}

/// `chat.postMessage` request body.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage<'a> {
    pub channel: &'a str,
    pub text: &'a str,
    pub icon_emoji: &'a str,
}

/// `users.info` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoResponse {
    pub user: SlackUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default)]
    pub profile: SlackUserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackUserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

impl From<SlackUser> for UserProfile {
    fn from(user: SlackUser) -> Self {
        UserProfile {
            id: user.id,
            name: user.name,
            real_name: user.profile.real_name.or(user.real_name),
            display_name: user.profile.display_name,
            tz: user.tz,
        }
    }
}
