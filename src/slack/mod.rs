//! Slack Web API implementation of the chat-service capabilities.

pub mod client;
pub mod types;

pub use client::SlackClient;
