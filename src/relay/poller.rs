//! Poll-match-relay loop.
//!
//! Each poll:
//! 1. `ChatService::fetch_since()` from the cursor position
//! 2. Sort the page by `ts`, skip anything at or behind the cursor
//! 3. `TriggerSet::matches()` → `RelayRecord` → `ChatService::relay()`
//! 4. Advance the cursor past each message as soon as it is handled
//!
//! The first poll after start is a priming poll: it only moves the cursor to
//! the newest message in the channel, so a restart does not re-alert on the
//! whole backlog. Relays are at-most-once per message; a failed relay is
//! logged and the message still counts as handled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_POLL_INTERVAL_SECS, RelayConfig};
use crate::error::ChannelError;
use crate::relay::cursor::Cursor;
use crate::relay::matcher::TriggerSet;
use crate::relay::record::{RelayRecord, is_user_id};
use crate::relay::types::{ChatMessage, ChatService, Timestamp, UserDirectory};

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// First poll after start: advance only, never relay.
    Priming,
    /// Every later poll.
    Steady,
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Phase the poll ran in.
    pub phase: PollPhase,
    pub fetched: usize,
    /// Messages at or behind the cursor.
    pub skipped: usize,
    pub matched: usize,
    pub relayed: usize,
    pub relay_failures: usize,
}

impl PollOutcome {
    fn new(phase: PollPhase) -> Self {
        Self {
            phase,
            fetched: 0,
            skipped: 0,
            matched: 0,
            relayed: 0,
            relay_failures: 0,
        }
    }
}

/// Watches one channel and relays trigger matches to another.
pub struct RelayPoller {
    service: Arc<dyn ChatService>,
    users: Option<Arc<dyn UserDirectory>>,
    triggers: TriggerSet,
    monitor_channel: String,
    notify_channel: String,
    poll_interval: Duration,
    cursor: Cursor,
    phase: PollPhase,
}

impl RelayPoller {
    pub fn new(
        service: Arc<dyn ChatService>,
        triggers: TriggerSet,
        monitor_channel: impl Into<String>,
        notify_channel: impl Into<String>,
    ) -> Self {
        Self {
            service,
            users: None,
            triggers,
            monitor_channel: monitor_channel.into(),
            notify_channel: notify_channel.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cursor: Cursor::new(),
            phase: PollPhase::Priming,
        }
    }

    pub fn from_config(config: &RelayConfig, service: Arc<dyn ChatService>) -> Self {
        let triggers = TriggerSet::new(&config.trigger_words, config.case_insensitive);
        Self::new(
            service,
            triggers,
            config.monitor_channel.clone(),
            config.notify_channel.clone(),
        )
        .with_poll_interval(config.poll_interval)
    }

    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn position(&self) -> Timestamp {
        self.cursor.position()
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Run one poll. A fetch error leaves the cursor untouched.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, ChannelError> {
        let phase = self.phase;
        // Priming ends after the first attempt, successful or not.
        self.phase = PollPhase::Steady;

        let start = self.cursor.position();
        let mut messages = self
            .service
            .fetch_since(&self.monitor_channel, start)
            .await?;
        messages.sort_by_key(|m| m.ts);

        let mut outcome = PollOutcome::new(phase);
        outcome.fetched = messages.len();

        if phase == PollPhase::Priming {
            if let Some(newest) = messages.last() {
                self.cursor.advance(newest.ts);
            }
            outcome.skipped = messages.len();
            info!(
                channel = %self.monitor_channel,
                backlog = messages.len(),
                position = %self.cursor.position(),
                "Priming poll complete, relaying from here on"
            );
            return Ok(outcome);
        }

        for message in &messages {
            // Covers overlapping pages and duplicate ts within a page.
            if self.cursor.has_seen(message.ts) {
                outcome.skipped += 1;
                continue;
            }

            if let Some(trigger) = self.triggers.first_match(&message.text) {
                outcome.matched += 1;
                info!(ts = %message.ts, author = %message.author, trigger, "Trigger word matched");
                match self.relay(message).await {
                    Ok(()) => outcome.relayed += 1,
                    Err(e) => {
                        error!(ts = %message.ts, error = %e, "Failed to relay message");
                        outcome.relay_failures += 1;
                    }
                }
            }

            self.cursor.advance(message.ts);
        }

        debug!(
            fetched = outcome.fetched,
            skipped = outcome.skipped,
            matched = outcome.matched,
            relayed = outcome.relayed,
            position = %self.cursor.position(),
            "Poll complete"
        );

        Ok(outcome)
    }

    async fn relay(&self, message: &ChatMessage) -> Result<(), ChannelError> {
        let mut record = RelayRecord::new(message, &self.monitor_channel);
        if let Some(name) = self.resolve_author(&message.author).await {
            record = record.with_author_name(&name);
        }
        self.service
            .relay(&self.notify_channel, &record.render())
            .await
    }

    async fn resolve_author(&self, author: &str) -> Option<String> {
        let users = self.users.as_ref()?;
        if !is_user_id(author) {
            return None;
        }
        match users.lookup_user(author).await {
            Ok(profile) => Some(profile.preferred_name().to_string()),
            Err(e) => {
                debug!(user = %author, error = %e, "User lookup failed, using mention");
                None
            }
        }
    }

    /// Poll until `shutdown` is raised. Checked before every poll.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!(
            monitor = %self.monitor_channel,
            notify = %self.notify_channel,
            triggers = self.triggers.len(),
            "Relay poller started, polling every {}s",
            self.poll_interval.as_secs_f64()
        );

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!(position = %self.cursor.position(), "Relay poller shutting down");
                return;
            }

            if let Err(e) = self.poll_once().await {
                warn!(
                    channel = %self.monitor_channel,
                    position = %self.cursor.position(),
                    error = %e,
                    "Poll failed, retrying next tick"
                );
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Spawn the poller as a background task.
///
/// Returns a `JoinHandle` and a shutdown flag. Set the flag to stop polling.
pub fn spawn_relay_poller(poller: RelayPoller) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    let handle = tokio::spawn(poller.run(shutdown));
    (handle, shutdown_flag)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::relay::types::UserProfile;

    /// Scripted chat service: each fetch pops the next page.
    #[derive(Default)]
    struct ScriptedService {
        pages: Mutex<VecDeque<Result<Vec<ChatMessage>, ChannelError>>>,
        fetched_from: Mutex<Vec<Timestamp>>,
        relayed: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn push_page(&self, page: Vec<ChatMessage>) {
            self.pages.lock().unwrap().push_back(Ok(page));
        }
    }

    #[async_trait]
    impl ChatService for ScriptedService {
        async fn fetch_since(
            &self,
            _channel: &str,
            oldest: Timestamp,
        ) -> Result<Vec<ChatMessage>, ChannelError> {
            self.fetched_from.lock().unwrap().push(oldest);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn relay(&self, _channel: &str, text: &str) -> Result<(), ChannelError> {
            self.relayed.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Directory;

    #[async_trait]
    impl UserDirectory for Directory {
        async fn lookup_user(&self, user_id: &str) -> Result<UserProfile, ChannelError> {
            if user_id == "UKNOWN" {
                Ok(UserProfile {
                    id: user_id.into(),
                    name: "jdoe".into(),
                    real_name: Some("Jane Doe".into()),
                    ..Default::default()
                })
            } else {
                Err(ChannelError::Api {
                    method: "users.info".into(),
                    error: "user_not_found".into(),
                })
            }
        }
    }

    fn msg(ts: i64, author: &str, text: &str) -> ChatMessage {
        ChatMessage::new(Timestamp::new(Decimal::from(ts)), author, text)
    }

    fn poller(service: &Arc<ScriptedService>) -> RelayPoller {
        let svc: Arc<dyn ChatService> = service.clone();
        RelayPoller::new(svc, TriggerSet::new(["urgent"], false), "CMON", "CNOTIFY")
    }

    #[tokio::test]
    async fn unordered_page_processed_ascending() {
        let service = Arc::new(ScriptedService::default());
        service.push_page(vec![]);
        service.push_page(vec![
            msg(9, "U1", "urgent nine"),
            msg(7, "U1", "urgent seven"),
            msg(8, "U1", "calm"),
        ]);
        let mut p = poller(&service);
        p.poll_once().await.unwrap();
        let outcome = p.poll_once().await.unwrap();
        assert_eq!(outcome.matched, 2);
        assert_eq!(p.position(), Timestamp::new(Decimal::from(9)));

        let relayed = service.relayed.lock().unwrap();
        assert!(relayed[0].contains("urgent seven"));
        assert!(relayed[1].contains("urgent nine"));
    }

    #[tokio::test]
    async fn duplicate_ts_in_page_relayed_once() {
        let service = Arc::new(ScriptedService::default());
        service.push_page(vec![]);
        service.push_page(vec![msg(4, "U1", "urgent"), msg(4, "U1", "urgent")]);
        let mut p = poller(&service);
        p.poll_once().await.unwrap();
        let outcome = p.poll_once().await.unwrap();
        assert_eq!(outcome.relayed, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn priming_reports_phase_and_backlog() {
        let service = Arc::new(ScriptedService::default());
        service.push_page(vec![msg(1, "U1", "urgent"), msg(2, "U1", "urgent")]);
        let mut p = poller(&service);
        assert_eq!(p.phase(), PollPhase::Priming);
        let outcome = p.poll_once().await.unwrap();
        assert_eq!(outcome.phase, PollPhase::Priming);
        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.matched, 0);
        assert_eq!(p.phase(), PollPhase::Steady);
        assert!(service.relayed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn priming_error_still_ends_priming() {
        let service = Arc::new(ScriptedService::default());
        service.pages.lock().unwrap().push_back(Err(ChannelError::RequestFailed {
            method: "conversations.history".into(),
            reason: "timeout".into(),
        }));
        let mut p = poller(&service);
        assert!(p.poll_once().await.is_err());
        assert_eq!(p.phase(), PollPhase::Steady);
        assert_eq!(p.position(), Timestamp::BEGINNING);
    }

    #[tokio::test]
    async fn author_resolved_through_directory() {
        let service = Arc::new(ScriptedService::default());
        service.push_page(vec![]);
        service.push_page(vec![msg(1, "UKNOWN", "urgent"), msg(2, "UMISSING", "urgent")]);
        let mut p = poller(&service).with_user_directory(Arc::new(Directory));
        p.poll_once().await.unwrap();
        p.poll_once().await.unwrap();

        let relayed = service.relayed.lock().unwrap();
        assert!(relayed[0].contains("*Jane Doe*"));
        assert!(relayed[1].contains("*<@UMISSING>*"));
    }

    #[tokio::test]
    async fn run_stops_when_flag_raised() {
        let service = Arc::new(ScriptedService::default());
        let p = poller(&service).with_poll_interval(Duration::from_millis(10));
        let (handle, shutdown) = spawn_relay_poller(p);
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.store(true, Ordering::Relaxed);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
        assert!(!service.fetched_from.lock().unwrap().is_empty());
    }
}
