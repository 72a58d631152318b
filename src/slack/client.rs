//! Slack Web API client.
//!
//! One long-lived `reqwest::Client` per process. Channel and position are call
//! arguments, never client state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::RelayConfig;
use crate::error::ChannelError;
use crate::relay::record::RELAY_EMOJI;
use crate::relay::types::{ChatMessage, ChatService, Timestamp, UserDirectory, UserProfile};
use crate::slack::types::{ApiStatus, HistoryResponse, PostMessage, UserInfoResponse};

/// Page size requested from `conversations.history`.
const HISTORY_PAGE_LIMIT: u32 = 200;

/// Slack Web API client: fetches history, posts relays, looks up users.
pub struct SlackClient {
    base_url: String,
    token: SecretString,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::RequestFailed {
                method: "client".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, ChannelError> {
        Self::new(
            config.api_base_url.clone(),
            config.bot_token.clone(),
            config.request_timeout,
        )
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Send an authorized request and decode the body as `T`.
    ///
    /// Checks transport, then HTTP status, then the `ok` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: RequestBuilder,
    ) -> Result<T, ChannelError> {
        let resp = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| ChannelError::RequestFailed {
                method: method.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ChannelError::Http {
                method: method.into(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| ChannelError::RequestFailed {
            method: method.into(),
            reason: e.to_string(),
        })?;

        let envelope: ApiStatus =
            serde_json::from_slice(&body).map_err(|e| ChannelError::InvalidResponse {
                method: method.into(),
                reason: e.to_string(),
            })?;
        if !envelope.ok {
            return Err(ChannelError::Api {
                method: method.into(),
                error: envelope.error.unwrap_or_else(|| "unknown_error".into()),
            });
        }

        serde_json::from_slice(&body).map_err(|e| ChannelError::InvalidResponse {
            method: method.into(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn fetch_since(
        &self,
        channel: &str,
        oldest: Timestamp,
    ) -> Result<Vec<ChatMessage>, ChannelError> {
        let method = "conversations.history";
        let request = self.client.get(self.api_url(method)).query(&[
            ("channel", channel.to_string()),
            ("oldest", oldest.to_string()),
            ("limit", HISTORY_PAGE_LIMIT.to_string()),
        ]);
        let history: HistoryResponse = self.call(method, request).await?;

        if history.has_more {
            tracing::warn!(
                channel,
                oldest = %oldest,
                "More than {HISTORY_PAGE_LIMIT} new messages since last poll; older ones are skipped"
            );
        }

        Ok(history.messages.into_iter().map(ChatMessage::from).collect())
    }

    async fn relay(&self, channel: &str, text: &str) -> Result<(), ChannelError> {
        let method = "chat.postMessage";
        let body = PostMessage {
            channel,
            text,
            icon_emoji: RELAY_EMOJI,
        };
        let request = self.client.post(self.api_url(method)).json(&body);
        let _: ApiStatus = self.call(method, request).await?;
        tracing::debug!(channel, "Relay posted");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SlackClient {
    async fn lookup_user(&self, user_id: &str) -> Result<UserProfile, ChannelError> {
        let method = "users.info";
        let request = self
            .client
            .get(self.api_url(method))
            .query(&[("user", user_id)]);
        let info: UserInfoResponse = self.call(method, request).await?;
        Ok(info.user.into())
    }
}
