//! Vulture: watches a chat channel for trigger words and relays matches.

pub mod config;
pub mod error;
pub mod pidfile;
pub mod relay;
pub mod slack;
