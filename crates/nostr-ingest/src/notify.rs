//! Out-of-band alerts for saved report events.
//!
//! The hook composes a message on the publishing task and hands it to a
//! detached worker over a bounded channel. Delivery failures are logged by
//! the worker and go no further. When the queue is full the notification is
//! dropped. Each delivery is bounded by a timeout so one stalled request
//! cannot hold up the reports queued behind it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use nostr_ingest_core::{Event, PublicKey, KIND_REPORT};

use crate::error::NotifyError;

/// Default Pushover messages endpoint.
pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Title of every report notification.
pub const REPORT_TITLE: &str = "Nostr Report (kind 1984)";

/// Delivery deadline used when none is configured.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// The `[notify]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub pushover_token: Option<String>,
    pub pushover_user: Option<String>,
    pub endpoint: String,
    /// Notifications buffered before new ones are dropped.
    pub queue_capacity: usize,
    /// Seconds a single delivery may take before it is abandoned.
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            pushover_token: None,
            pushover_user: None,
            endpoint: PUSHOVER_ENDPOINT.to_owned(),
            queue_capacity: 64,
            timeout_secs: DEFAULT_SEND_TIMEOUT.as_secs(),
        }
    }
}

impl NotifyConfig {
    /// Token and user, when both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.pushover_token.as_deref(), self.pushover_user.as_deref()) {
            (Some(token), Some(user)) if !token.is_empty() && !user.is_empty() => {
                Some((token, user))
            }
            _ => None,
        }
    }

    /// Delivery deadline; zero is raised to one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// The parts of a report event that go into the alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub reporter: PublicKey,
    pub report_type: String,
    pub reported_pubkey: String,
    pub reported_event: String,
    pub content: String,
}

impl Report {
    /// Extract a report from a kind 1984 event; other kinds yield `None`.
    ///
    /// The report type is the third field of the first `p` or `e` tag.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind != KIND_REPORT {
            return None;
        }

        let subject = |name: &str| {
            event
                .tags_named(name)
                .find_map(|t| t.value())
                .unwrap_or_default()
                .to_owned()
        };

        let report_type = event
            .tags
            .iter()
            .filter(|t| t.len() >= 2 && matches!(t.name(), Some("p") | Some("e")))
            .map(|t| t.get(2).unwrap_or_default())
            .next()
            .unwrap_or_default()
            .to_owned();

        Some(Self {
            reporter: event.pubkey.clone(),
            report_type,
            reported_pubkey: subject("p"),
            reported_event: subject("e"),
            content: event.content.clone(),
        })
    }

    /// The notification body.
    pub fn message(&self) -> String {
        format!(
            "Reporter: {}\nType: {}\nPubkey: {}\nEvent: {}\n{}",
            self.reporter, self.report_type, self.reported_pubkey, self.reported_event, self.content
        )
    }

    pub fn to_notification(&self) -> Notification {
        Notification {
            title: REPORT_TITLE.to_owned(),
            message: self.message(),
        }
    }
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Delivers notifications somewhere.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Delivery through the Pushover messages API.
pub struct PushoverDispatch {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    user: String,
}

impl PushoverDispatch {
    /// Fails only when the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        user: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            user: user.into(),
        })
    }
}

#[async_trait]
impl Dispatch for PushoverDispatch {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let form = [
            ("token", self.token.as_str()),
            ("user", self.user.as_str()),
            ("title", notification.title.as_str()),
            ("message", notification.message.as_str()),
        ];
        let response = self.client.post(&self.endpoint).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::info!(status = status.as_u16(), "pushover notification sent");
        Ok(())
    }
}

/// Fires report notifications after a successful save.
#[derive(Debug, Clone, Default)]
pub struct NotificationHook {
    tx: Option<mpsc::Sender<Notification>>,
}

impl NotificationHook {
    /// A hook that does nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Start the delivery worker on the current tokio runtime.
    pub fn spawn(dispatch: impl Dispatch, capacity: usize) -> Self {
        Self::spawn_with_timeout(dispatch, capacity, DEFAULT_SEND_TIMEOUT)
    }

    /// Like [`spawn`](Self::spawn), abandoning any delivery that runs past
    /// `timeout`.
    pub fn spawn_with_timeout(dispatch: impl Dispatch, capacity: usize, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(rx, dispatch, timeout));
        Self { tx: Some(tx) }
    }

    /// Pushover delivery when credentials are configured, otherwise disabled.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let Some((token, user)) = config.credentials() else {
            tracing::info!("pushover credentials not set, report notifications disabled");
            return Self::disabled();
        };

        match PushoverDispatch::new(config.endpoint.as_str(), token, user, config.timeout()) {
            Ok(dispatch) => {
                Self::spawn_with_timeout(dispatch, config.queue_capacity, config.timeout())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to build pushover client, report notifications disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a notification for `event` if it is a report. Never blocks.
    pub fn on_saved(&self, event: &Event) {
        let Some(tx) = &self.tx else {
            return;
        };
        let Some(report) = Report::from_event(event) else {
            return;
        };

        match tx.try_send(report.to_notification()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(id = %event.id, "notification queue full, dropping report alert");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(id = %event.id, "notification worker gone, dropping report alert");
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Notification>,
    dispatch: impl Dispatch,
    timeout: Duration,
) {
    while let Some(notification) = rx.recv().await {
        match tokio::time::timeout(timeout, dispatch.send(&notification)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "failed to send report notification"),
            Err(_) => tracing::error!(?timeout, "report notification timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nostr_ingest_core::{EventBuilder, Keypair, Tag};

    struct Recording(mpsc::UnboundedSender<Notification>);

    #[async_trait]
    impl Dispatch for Recording {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            let _ = self.0.send(notification.clone());
            Ok(())
        }
    }

    /// Fails (or hangs) on the first call, records every later one.
    struct FirstCall {
        first: std::sync::atomic::AtomicBool,
        hang: bool,
        rest: mpsc::UnboundedSender<Notification>,
    }

    impl FirstCall {
        fn new(hang: bool, rest: mpsc::UnboundedSender<Notification>) -> Self {
            Self {
                first: std::sync::atomic::AtomicBool::new(true),
                hang,
                rest,
            }
        }
    }

    #[async_trait]
    impl Dispatch for FirstCall {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            if self.first.swap(false, std::sync::atomic::Ordering::SeqCst) {
                if self.hang {
                    std::future::pending::<()>().await;
                }
                return Err(NotifyError::Status(500));
            }
            let _ = self.rest.send(notification.clone());
            Ok(())
        }
    }

    fn reporter() -> Keypair {
        Keypair::from_seed(&[5; 32]).unwrap()
    }

    fn report(tags: Vec<Tag>, content: &str) -> Event {
        EventBuilder::new(KIND_REPORT)
            .created_at(1)
            .tags(tags)
            .content(content)
            .sign(&reporter())
            .unwrap()
    }

    #[test]
    fn test_report_fields() {
        let event = report(
            vec![
                Tag::new(["p", "badkey", "spam"]),
                Tag::new(["e", "badnote", "illegal"]),
            ],
            "please look",
        );
        let r = Report::from_event(&event).unwrap();

        assert_eq!(r.report_type, "spam");
        assert_eq!(r.reported_pubkey, "badkey");
        assert_eq!(r.reported_event, "badnote");
        assert_eq!(
            r.message(),
            format!(
                "Reporter: {}\nType: spam\nPubkey: badkey\nEvent: badnote\nplease look",
                reporter().public_key()
            )
        );
    }

    #[test]
    fn test_report_type_from_event_tag_when_first() {
        let event = report(vec![Tag::new(["e", "note", "nudity"])], "");
        let r = Report::from_event(&event).unwrap();

        assert_eq!(r.report_type, "nudity");
        assert_eq!(r.reported_pubkey, "");
    }

    #[test]
    fn test_non_report_ignored() {
        let event = EventBuilder::new(1).sign(&reporter()).unwrap();
        assert_eq!(Report::from_event(&event), None);
    }

    #[test]
    fn test_credentials_need_both() {
        let mut config = NotifyConfig::default();
        assert!(config.credentials().is_none());

        config.pushover_token = Some("t".into());
        config.pushover_user = Some(String::new());
        assert!(config.credentials().is_none());

        config.pushover_user = Some("u".into());
        assert_eq!(config.credentials(), Some(("t", "u")));
        assert!(NotificationHook::disabled().tx.is_none());
    }

    #[tokio::test]
    async fn test_hook_delivers_reports_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hook = NotificationHook::spawn(Recording(tx), 8);

        hook.on_saved(&EventBuilder::new(1).sign(&reporter()).unwrap());
        hook.on_saved(&report(vec![Tag::new(["p", "k", "spam"])], "x"));

        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.title, REPORT_TITLE);
        assert!(got.message.contains("Type: spam"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_worker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hook = NotificationHook::spawn(FirstCall::new(false, tx), 8);

        hook.on_saved(&report(vec![Tag::new(["p", "k", "spam"])], "first"));
        hook.on_saved(&report(vec![Tag::new(["p", "k", "spam"])], "second"));

        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(got.message.ends_with("second"));
    }

    #[tokio::test]
    async fn test_stalled_delivery_is_abandoned() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hook = NotificationHook::spawn_with_timeout(
            FirstCall::new(true, tx),
            8,
            Duration::from_millis(100),
        );

        hook.on_saved(&report(vec![], "stuck"));
        hook.on_saved(&report(vec![], "next"));

        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(got.message.ends_with("next"));
    }

    #[tokio::test]
    async fn test_pushover_request_times_out_on_silent_endpoint() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dispatch = PushoverDispatch::new(
            format!("http://{addr}/1/messages.json"),
            "token",
            "user",
            Duration::from_millis(200),
        )
        .unwrap();
        let notification = Report::from_event(&report(vec![], "x"))
            .unwrap()
            .to_notification();

        let result = tokio::time::timeout(Duration::from_secs(5), dispatch.send(&notification))
            .await
            .unwrap();
        assert!(matches!(result, Err(NotifyError::Http(e)) if e.is_timeout()));
    }

    #[test]
    fn test_timeout_config() {
        assert_eq!(NotifyConfig::default().timeout(), DEFAULT_SEND_TIMEOUT);

        let config = NotifyConfig {
            timeout_secs: 0,
            ..NotifyConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_disabled_hook_is_noop() {
        let hook = NotificationHook::from_config(&NotifyConfig::default());
        assert!(!hook.is_enabled());
        hook.on_saved(&report(vec![], "x"));
    }
}
