//! Popup-side controller: task form, timer display, notifications and task-name hints.
//!
//! The controller never measures time itself. It mirrors whatever the background
//! session manager last reported and turns user actions into bus messages.

use std::time::Duration;
use tokio::time::Instant;

use crate::bus::MessageBus;
use crate::config::Config;
use crate::issue_store::IssueStore;
use crate::messages::{
    Envelope, Message, NotificationData, NotificationKind, TimerData, TimerStartData, TimerStatus,
};

pub const MSG_MISSING_TASK: &str = "Provide task name and description!";
pub const MSG_HINTS_FAILED: &str = "Cannot fetch tasks hints";

/// Formats elapsed milliseconds as `HH:MM:SS`.
pub fn format_clock(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: NotificationKind,
    pub message: String,
}

/// Everything the popup displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupView {
    pub task_name: String,
    pub task_description: String,
    pub inputs_enabled: bool,
    pub clock: String,
    pub affordance: Affordance,
    pub banner: Option<Banner>,
    pub suggestions: Vec<String>,
}

impl Default for PopupView {
    fn default() -> Self {
        Self {
            task_name: String::new(),
            task_description: String::new(),
            inputs_enabled: true,
            clock: format_clock(0),
            affordance: Affordance::Start,
            banner: None,
            suggestions: Vec::new(),
        }
    }
}

impl PopupView {
    /// Single-line terminal rendering.
    pub fn render_line(&self) -> String {
        let action = match self.affordance {
            Affordance::Start => "[start]",
            Affordance::Stop => "[stop]",
        };
        let mut line = format!("{} {}", self.clock, action);
        if !self.task_name.is_empty() {
            line.push(' ');
            line.push_str(&self.task_name);
        }
        if !self.task_description.is_empty() {
            line.push_str(": ");
            line.push_str(&self.task_description);
        }
        if let Some(banner) = &self.banner {
            let marker = match banner.kind {
                NotificationKind::Success => "ok",
                NotificationKind::Error => "error",
            };
            line.push_str(&format!("  ({}: {})", marker, banner.message));
        }
        if !self.suggestions.is_empty() {
            line.push_str("  hints:");
            for (index, key) in self.suggestions.iter().enumerate() {
                line.push_str(&format!(" {}) {}", index + 1, key));
            }
        }
        line
    }
}

/// Writes `value` into `slot` only when it differs. Returns whether it wrote.
fn set_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

pub struct PopupController {
    view: PopupView,
    bus: MessageBus,
    issues: IssueStore,
    banner_expires_at: Option<Instant>,
    hint_query_due_at: Option<Instant>,
    notification_duration: Duration,
    debounce: Duration,
    min_query_chars: usize,
    max_suggestions: usize,
}

impl PopupController {
    pub fn new(bus: MessageBus, config: &Config) -> Self {
        Self {
            view: PopupView::default(),
            bus,
            issues: IssueStore::default(),
            banner_expires_at: None,
            hint_query_due_at: None,
            notification_duration: config.notification_duration(),
            debounce: config.autocomplete_debounce(),
            min_query_chars: config.autocomplete_min_chars,
            max_suggestions: config.autocomplete_limit,
        }
    }

    pub fn view(&self) -> &PopupView {
        &self.view
    }

    pub fn is_idle(&self) -> bool {
        self.view.affordance == Affordance::Start
    }

    /// Keystroke in the task-name input. Refreshing hints is debounced.
    pub fn type_task_name(&mut self, text: &str) -> bool {
        if !self.view.inputs_enabled {
            return false;
        }
        self.hint_query_due_at = Some(Instant::now() + self.debounce);
        set_if_changed(&mut self.view.task_name, text.to_string())
    }

    pub fn type_task_description(&mut self, text: &str) -> bool {
        if !self.view.inputs_enabled {
            return false;
        }
        set_if_changed(&mut self.view.task_description, text.to_string())
    }

    /// Picks the `position`-th (1-based) displayed hint. Returns the chosen key.
    pub fn choose_nth_suggestion(&mut self, position: usize) -> Option<String> {
        let key = self
            .view
            .suggestions
            .get(position.checked_sub(1)?)
            .cloned()?;
        self.choose_suggestion(&key);
        Some(key)
    }

    pub fn choose_suggestion(&mut self, key: &str) -> bool {
        let mut changed = set_if_changed(&mut self.view.task_name, key.to_string());
        changed |= self.clear_suggestions();
        changed
    }

    /// Result of the fire-and-forget issue fetch started when the popup opens.
    pub fn issues_loaded(&mut self, result: jira_api::Result<Vec<String>>) -> bool {
        match result {
            Ok(keys) => {
                log::debug!("Loaded {} task hints", keys.len());
                self.issues.set(keys);
                false
            }
            Err(err) => {
                log::warn!("Fetching task hints failed: {}", err);
                self.show_notification(NotificationKind::Error, MSG_HINTS_FAILED)
            }
        }
    }

    /// Earliest pending timer: the debounced hint refresh or the banner expiry.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.hint_query_due_at, self.banner_expires_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs whatever timers are due at `now`.
    pub fn on_deadline(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.hint_query_due_at.is_some_and(|due| due <= now) {
            self.hint_query_due_at = None;
            let suggestions =
                self.issues
                    .suggest(&self.view.task_name, self.min_query_chars, self.max_suggestions);
            changed |= set_if_changed(&mut self.view.suggestions, suggestions);
        }
        if self.banner_expires_at.is_some_and(|expires| expires <= now) {
            self.banner_expires_at = None;
            changed |= set_if_changed(&mut self.view.banner, None);
        }
        changed
    }

    pub fn click_start(&mut self) -> bool {
        if self.view.task_name.is_empty() || self.view.task_description.is_empty() {
            self.show_notification(NotificationKind::Error, MSG_MISSING_TASK);
            return false;
        }
        self.bus
            .send(Envelope::to_background(Message::TimerStart(TimerStartData {
                task_name: self.view.task_name.clone(),
                task_description: self.view.task_description.clone(),
            })));
        self.clear_suggestions();
        true
    }

    pub fn click_stop(&mut self) {
        self.bus.send(Envelope::to_background(Message::TimerStop));
        self.clear_suggestions();
    }

    /// Applies one envelope from the background. Returns whether the view changed.
    pub fn apply(&mut self, envelope: Envelope) -> bool {
        match envelope.message {
            Message::TimerData(data) => self.apply_timer_data(data),
            Message::TimerNotification(NotificationData {
                notification,
                message,
            }) => {
                if message.is_empty() {
                    return false;
                }
                self.show_notification(notification, &message)
            }
            other => {
                log::debug!("Popup ignoring {:?}", other);
                false
            }
        }
    }

    fn apply_timer_data(&mut self, data: TimerData) -> bool {
        let view = &mut self.view;
        let mut changed = false;

        if data.status != TimerStatus::Ongoing {
            changed |= set_if_changed(&mut view.clock, format_clock(0));
            changed |= set_if_changed(&mut view.inputs_enabled, true);
            changed |= set_if_changed(&mut view.task_name, String::new());
            changed |= set_if_changed(&mut view.task_description, String::new());
            changed |= set_if_changed(&mut view.affordance, Affordance::Start);
            return changed;
        }

        if let Some(elapsed_ms) = data.task_timer.filter(|ms| *ms > 0) {
            changed |= set_if_changed(&mut view.clock, format_clock(elapsed_ms));
        }
        changed |= set_if_changed(&mut view.inputs_enabled, false);
        if let Some(task_name) = data.task_name {
            changed |= set_if_changed(&mut view.task_name, task_name);
        }
        if let Some(task_description) = data.task_description {
            changed |= set_if_changed(&mut view.task_description, task_description);
        }
        changed |= set_if_changed(&mut view.affordance, Affordance::Stop);
        changed
    }

    /// Shows `message`, replacing any current banner and restarting its display window.
    pub fn show_notification(&mut self, kind: NotificationKind, message: &str) -> bool {
        self.banner_expires_at = Some(Instant::now() + self.notification_duration);
        set_if_changed(
            &mut self.view.banner,
            Some(Banner {
                kind,
                message: message.to_string(),
            }),
        )
    }

    fn clear_suggestions(&mut self) -> bool {
        self.hint_query_due_at = None;
        set_if_changed(&mut self.view.suggestions, Vec::new())
    }
}
