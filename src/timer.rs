//! Timer session state machine owned by the background context.

use chrono::{DateTime, Utc};
use jira_api::{JiraClient, JiraConfig, StatusCode, WorklogCreate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::bus::MessageBus;
use crate::clock::Clock;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::messages::{Envelope, Message, NotificationData, TimerData, TimerStartData};

pub const MSG_SERVER_NOT_FOUND: &str = "Jira server address not found";
pub const MSG_SAVE_FAILED: &str = "Saving tracked time error";
pub const MSG_SAVED: &str = "Successfully saved tracked time!";
pub const MSG_TICKET_NOT_FOUND: &str = "Ticket not found";
pub const MSG_GENERIC_FAILURE: &str = "Something went wrong";

/// Fields that only exist while a session is running.
#[derive(Debug, Clone)]
struct ActiveSession {
    task_name: String,
    task_description: String,
    started_at: DateTime<Utc>,
    started_monotonic: Duration,
    elapsed: Duration,
}

/// Point-in-time copy of the manager state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerState {
    pub busy: bool,
    pub task_name: Option<String>,
    pub task_description: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
}

/// Owns the one timer session. Mutated only through `start`, `tick` and `stop`.
pub struct SessionManager {
    session: Option<ActiveSession>,
    ticker: Option<Interval>,
    tick_interval: Duration,
    request_timeout: Duration,
    bus: MessageBus,
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        bus: MessageBus,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            session: None,
            ticker: None,
            tick_interval: config.tick_interval(),
            request_timeout: config.request_timeout(),
            bus,
            credentials,
            clock,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_some()
    }

    /// True while progress events are being emitted.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn snapshot(&self) -> TimerState {
        match &self.session {
            Some(active) => TimerState {
                busy: true,
                task_name: Some(active.task_name.clone()),
                task_description: Some(active.task_description.clone()),
                started_at: Some(active.started_at),
                elapsed_ms: duration_millis(active.elapsed),
            },
            None => TimerState {
                busy: false,
                task_name: None,
                task_description: None,
                started_at: None,
                elapsed_ms: 0,
            },
        }
    }

    /// Handles envelopes addressed to the background until the bus closes the inbox.
    pub async fn run(mut self, mut inbox: UnboundedReceiver<Envelope>) {
        log::debug!("Session manager listening");
        loop {
            tokio::select! {
                envelope = inbox.recv() => match envelope {
                    Some(envelope) => self.handle(envelope).await,
                    None => break,
                },
                _ = next_tick(&mut self.ticker) => self.tick(),
            }
        }
        if let Some(active) = &self.session {
            log::warn!(
                "Session manager stopped with an unsaved session for {}",
                active.task_name
            );
        }
        log::debug!("Session manager finished");
    }

    pub async fn handle(&mut self, envelope: Envelope) {
        match envelope.message {
            Message::TimerStart(request) => {
                self.start(request);
            }
            Message::TimerStop => self.stop().await,
            other => log::debug!("Ignoring message not meant for the background: {:?}", other),
        }
    }

    /// Idle → Running. Returns false when the request is ignored.
    pub fn start(&mut self, request: TimerStartData) -> bool {
        if self.session.is_some() {
            log::debug!("Start ignored, a session is already running");
            return false;
        }
        if request.task_name.is_empty() || request.task_description.is_empty() {
            log::debug!("Start ignored, task name and description are required");
            return false;
        }

        log::info!("Timer started for {}", request.task_name);
        self.session = Some(ActiveSession {
            task_name: request.task_name,
            task_description: request.task_description,
            started_at: self.clock.wall(),
            started_monotonic: self.clock.monotonic(),
            elapsed: Duration::ZERO,
        });

        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        true
    }

    /// Recomputes elapsed time and broadcasts an `ongoing` progress event.
    pub fn tick(&mut self) {
        let now = self.clock.monotonic();
        let Some(active) = self.session.as_mut() else {
            return;
        };
        active.elapsed = now.saturating_sub(active.started_monotonic);
        let data = TimerData::ongoing(
            &active.task_name,
            &active.task_description,
            active.started_at,
            duration_millis(active.elapsed),
        );
        self.bus.send(Envelope::to_popup(Message::TimerData(data)));
    }

    /// Running → Idle, submitting the worklog on the way.
    ///
    /// A missing server address or a transport failure is reported but leaves the
    /// session busy with the tick cancelled; another stop retries the submission.
    /// Any HTTP response resets the session before its status is interpreted.
    pub async fn stop(&mut self) {
        let Some(active) = self.session.as_mut() else {
            log::debug!("Stop ignored, no session is running");
            return;
        };
        self.ticker = None;
        active.elapsed = self
            .clock
            .monotonic()
            .saturating_sub(active.started_monotonic);
        let task_name = active.task_name.clone();
        let worklog = WorklogCreate::new(
            active.task_description.clone(),
            active.started_at,
            active.elapsed,
        );

        let base_url = match self.credentials.server_address() {
            Ok(base_url) => base_url,
            Err(err) => {
                log::warn!("Fetching jira server address error: {}", err);
                self.notify(NotificationData::error(MSG_SERVER_NOT_FOUND));
                return;
            }
        };

        let config = JiraConfig::new(base_url).with_timeout(self.request_timeout);
        let submitted = match JiraClient::new(config) {
            Ok(client) => client.add_worklog(&task_name, &worklog).await,
            Err(err) => Err(err),
        };
        let status = match submitted {
            Ok(status) => status,
            Err(err) => {
                log::warn!("Saving tracked time error: {}", err);
                self.notify(NotificationData::error(MSG_SAVE_FAILED));
                return;
            }
        };

        self.session = None;
        self.bus
            .send(Envelope::to_popup(Message::TimerData(TimerData::stopped())));

        match status {
            StatusCode::CREATED => {
                log::info!("Logged {} on {}", worklog.time_spent, task_name);
                self.notify(NotificationData::success(MSG_SAVED));
            }
            StatusCode::NOT_FOUND => {
                log::warn!("Worklog rejected, {} does not exist", task_name);
                self.notify(NotificationData::error(MSG_TICKET_NOT_FOUND));
            }
            other => {
                log::warn!("Worklog for {} rejected with {}", task_name, other);
                self.notify(NotificationData::error(MSG_GENERIC_FAILURE));
            }
        }
    }

    fn notify(&self, notification: NotificationData) {
        self.bus
            .send(Envelope::to_popup(Message::TimerNotification(notification)));
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::credentials::MemoryCredentialStore;
    use crate::messages::{Context, NotificationKind, TimerStatus};
    use chrono::TimeZone;
    use mockito::Matcher;

    struct Harness {
        manager: SessionManager,
        clock: Arc<ManualClock>,
        credentials: Arc<MemoryCredentialStore>,
        popup: UnboundedReceiver<Envelope>,
    }

    fn harness(address: Option<&str>) -> Harness {
        let bus = MessageBus::new();
        let popup = bus.listen(Context::Popup);
        let start = Utc
            .with_ymd_and_hms(2024, 3, 5, 9, 7, 1)
            .single()
            .expect("valid date");
        let clock = Arc::new(ManualClock::new(start));
        let credentials = Arc::new(match address {
            Some(address) => MemoryCredentialStore::with_address(address),
            None => MemoryCredentialStore::default(),
        });
        let manager = SessionManager::new(
            bus,
            credentials.clone(),
            clock.clone(),
            &Config::default(),
        );
        Harness {
            manager,
            clock,
            credentials,
            popup,
        }
    }

    fn start_request(name: &str, description: &str) -> TimerStartData {
        TimerStartData {
            task_name: name.to_string(),
            task_description: description.to_string(),
        }
    }

    fn drain(popup: &mut UnboundedReceiver<Envelope>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(envelope) = popup.try_recv() {
            assert_eq!(envelope.to, Context::Popup);
            messages.push(envelope.message);
        }
        messages
    }

    #[tokio::test]
    async fn start_captures_task_and_begins_ticking() {
        let mut h = harness(None);
        assert!(h.manager.start(start_request("PROJ-1", "fix bug")));

        let state = h.manager.snapshot();
        assert!(state.busy);
        assert_eq!(state.task_name.as_deref(), Some("PROJ-1"));
        assert_eq!(state.task_description.as_deref(), Some("fix bug"));
        assert_eq!(state.started_at, Some(h.clock.wall()));
        assert!(h.manager.is_ticking());
    }

    #[tokio::test]
    async fn start_while_busy_is_ignored() {
        let mut h = harness(None);
        h.manager.start(start_request("PROJ-1", "fix bug"));
        h.clock.advance(Duration::from_secs(5));
        let before = h.manager.snapshot();

        assert!(!h.manager.start(start_request("PROJ-2", "other")));
        assert_eq!(h.manager.snapshot(), before);
        assert!(h.manager.is_ticking());
    }

    #[tokio::test]
    async fn start_requires_name_and_description() {
        let mut h = harness(None);
        assert!(!h.manager.start(start_request("", "fix bug")));
        assert!(!h.manager.start(start_request("PROJ-1", "")));
        assert!(!h.manager.is_busy());
        assert!(!h.manager.is_ticking());
    }

    #[tokio::test]
    async fn tick_broadcasts_elapsed_progress() {
        let mut h = harness(None);
        h.manager.start(start_request("PROJ-1", "fix bug"));
        h.clock.advance(Duration::from_millis(1200));
        h.manager.tick();

        let messages = drain(&mut h.popup);
        assert_eq!(
            messages,
            vec![Message::TimerData(TimerData {
                status: TimerStatus::Ongoing,
                task_name: Some("PROJ-1".into()),
                task_description: Some("fix bug".into()),
                task_start_date: Some("2024-03-05T09:07:01.000Z".into()),
                task_timer: Some(1200),
            })]
        );
        assert_eq!(h.manager.snapshot().elapsed_ms, 1200);
    }

    #[tokio::test]
    async fn tick_while_idle_emits_nothing() {
        let mut h = harness(None);
        h.manager.tick();
        assert!(drain(&mut h.popup).is_empty());
    }

    #[tokio::test]
    async fn stop_while_idle_is_silent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let mut h = harness(Some(&server.url()));

        h.manager.stop().await;

        assert!(drain(&mut h.popup).is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn successful_stop_posts_worklog_then_reports_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/2/issue/PROJ-1/worklog")
            .match_query(Matcher::UrlEncoded("adjustEstimate".into(), "AUTO".into()))
            .match_body(Matcher::Json(serde_json::json!({
                "comment": "fix bug",
                "started": "2024-03-05T09:07:01.000+0000",
                "timeSpent": "3m"
            })))
            .with_status(201)
            .create_async()
            .await;
        let mut h = harness(Some(&server.url()));

        h.manager.start(start_request("PROJ-1", "fix bug"));
        h.clock.advance(Duration::from_millis(125_000));
        h.manager.stop().await;

        mock.assert_async().await;
        assert!(!h.manager.is_busy());
        assert!(!h.manager.is_ticking());
        assert_eq!(
            drain(&mut h.popup),
            vec![
                Message::TimerData(TimerData::stopped()),
                Message::TimerNotification(NotificationData::success(MSG_SAVED)),
            ]
        );
    }

    #[tokio::test]
    async fn not_found_still_resets_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/api/2/issue/NOPE-1/worklog")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let mut h = harness(Some(&server.url()));

        h.manager.start(start_request("NOPE-1", "fix bug"));
        h.clock.advance(Duration::from_secs(30));
        h.manager.stop().await;

        assert!(!h.manager.is_busy());
        assert_eq!(
            drain(&mut h.popup),
            vec![
                Message::TimerData(TimerData::stopped()),
                Message::TimerNotification(NotificationData::error(MSG_TICKET_NOT_FOUND)),
            ]
        );
    }

    #[tokio::test]
    async fn other_status_reports_generic_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/api/2/issue/PROJ-1/worklog")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let mut h = harness(Some(&server.url()));

        h.manager.start(start_request("PROJ-1", "fix bug"));
        h.manager.stop().await;

        assert!(!h.manager.is_busy());
        let messages = drain(&mut h.popup);
        assert_eq!(messages[0], Message::TimerData(TimerData::stopped()));
        assert_eq!(
            messages[1],
            Message::TimerNotification(NotificationData::error(MSG_GENERIC_FAILURE))
        );
    }

    #[tokio::test]
    async fn missing_server_address_leaves_session_busy() {
        let mut h = harness(None);
        h.manager.start(start_request("PROJ-1", "fix bug"));
        h.manager.stop().await;

        assert!(h.manager.is_busy());
        assert!(!h.manager.is_ticking());
        assert_eq!(
            drain(&mut h.popup),
            vec![Message::TimerNotification(NotificationData::error(
                MSG_SERVER_NOT_FOUND
            ))]
        );

        // The stop guard still sees a busy session, so a second stop retries.
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/2/issue/PROJ-1/worklog")
            .match_query(Matcher::Any)
            .with_status(201)
            .create_async()
            .await;
        h.credentials
            .save_server_address(&server.url())
            .expect("store address");
        h.manager.stop().await;

        mock.assert_async().await;
        assert!(!h.manager.is_busy());
        let messages = drain(&mut h.popup);
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &messages[1],
            Message::TimerNotification(NotificationData {
                notification: NotificationKind::Success,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn transport_failure_leaves_session_busy() {
        let mut h = harness(Some("http://127.0.0.1:1"));
        h.manager.start(start_request("PROJ-1", "fix bug"));
        h.manager.stop().await;

        assert!(h.manager.is_busy());
        assert!(!h.manager.is_ticking());
        assert_eq!(h.manager.snapshot().task_name.as_deref(), Some("PROJ-1"));
        assert_eq!(
            drain(&mut h.popup),
            vec![Message::TimerNotification(NotificationData::error(MSG_SAVE_FAILED))]
        );

        h.credentials.clear();
        h.manager.stop().await;
        assert!(h.manager.is_busy());
        assert_eq!(
            drain(&mut h.popup),
            vec![Message::TimerNotification(NotificationData::error(
                MSG_SERVER_NOT_FOUND
            ))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_ticks_until_stop_request() {
        let bus = MessageBus::new();
        let inbox = bus.listen(Context::Background);
        let mut popup = bus.listen(Context::Popup);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = SessionManager::new(
            bus.clone(),
            Arc::new(MemoryCredentialStore::default()),
            clock.clone(),
            &Config::default(),
        );
        let handle = tokio::spawn(manager.run(inbox));

        bus.send(Envelope::to_background(Message::TimerStart(start_request(
            "PROJ-1", "fix bug",
        ))));
        tokio::time::sleep(Duration::from_millis(650)).await;

        let ticks = drain(&mut popup);
        assert_eq!(ticks.len(), 3);
        assert!(ticks.iter().all(|message| matches!(
            message,
            Message::TimerData(TimerData {
                status: TimerStatus::Ongoing,
                ..
            })
        )));

        bus.send(Envelope::to_background(Message::TimerStop));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(
            drain(&mut popup),
            vec![Message::TimerNotification(NotificationData::error(
                MSG_SERVER_NOT_FOUND
            ))]
        );

        bus.close(Context::Background);
        handle.await.expect("manager task finishes");
    }

    #[tokio::test]
    async fn popup_round_trip_logs_worklog_and_returns_to_idle() {
        use crate::popup::{Banner, PopupController};

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/2/issue/PROJ-1/worklog")
            .match_query(Matcher::UrlEncoded("adjustEstimate".into(), "AUTO".into()))
            .match_body(Matcher::Json(serde_json::json!({
                "comment": "fix bug",
                "started": "2024-03-05T09:07:01.000+0000",
                "timeSpent": "3m"
            })))
            .with_status(201)
            .create_async()
            .await;

        let bus = MessageBus::new();
        let start = Utc
            .with_ymd_and_hms(2024, 3, 5, 9, 7, 1)
            .single()
            .expect("valid date");
        let clock = Arc::new(ManualClock::new(start));
        let manager = SessionManager::new(
            bus.clone(),
            Arc::new(MemoryCredentialStore::with_address(&server.url())),
            clock.clone(),
            &Config::default(),
        );
        let handle = tokio::spawn(manager.run(bus.listen(Context::Background)));
        let mut inbox = bus.listen(Context::Popup);
        let mut popup = PopupController::new(bus.clone(), &Config::default());

        popup.type_task_name("PROJ-1");
        popup.type_task_description("fix bug");
        assert!(popup.click_start());

        let first = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .expect("progress arrives")
            .expect("bus open");
        popup.apply(first);
        assert!(!popup.is_idle());
        assert!(!popup.view().inputs_enabled);

        clock.advance(Duration::from_millis(125_000));
        popup.click_stop();

        let mut received = Vec::new();
        loop {
            let envelope = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
                .await
                .expect("stop result arrives")
                .expect("bus open");
            let done = matches!(envelope.message, Message::TimerNotification(_));
            received.push(envelope.message.clone());
            popup.apply(envelope);
            if done {
                break;
            }
        }

        mock.assert_async().await;
        let tail = &received[received.len() - 2..];
        assert_eq!(
            tail,
            &[
                Message::TimerData(TimerData::stopped()),
                Message::TimerNotification(NotificationData::success(MSG_SAVED)),
            ]
        );
        assert!(popup.is_idle());
        assert!(popup.view().inputs_enabled);
        assert!(popup.view().task_name.is_empty());
        assert_eq!(popup.view().clock, "00:00:00");
        assert_eq!(
            popup.view().banner,
            Some(Banner {
                kind: NotificationKind::Success,
                message: MSG_SAVED.into(),
            })
        );

        bus.close(Context::Background);
        handle.await.expect("manager task finishes");
    }
}
