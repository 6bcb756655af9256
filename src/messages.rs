//! Envelope types exchanged between the background session manager and the popup.
//!
//! Every envelope serializes as `{from, to, type, data?}` with snake_case type tags,
//! the same shape the popup and background contexts have always exchanged.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Background,
    Popup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: Context,
    pub to: Context,
    #[serde(flatten)]
    pub message: Message,
}

impl Envelope {
    pub fn to_background(message: Message) -> Self {
        Self {
            from: Context::Popup,
            to: Context::Background,
            message,
        }
    }

    pub fn to_popup(message: Message) -> Self {
        Self {
            from: Context::Background,
            to: Context::Popup,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    TimerStart(TimerStartData),
    TimerStop,
    TimerData(TimerData),
    TimerNotification(NotificationData),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStartData {
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub task_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Ongoing,
    Stopped,
}

/// Progress event. Task fields are only present while the status is `ongoing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerData {
    pub status: TimerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_start_date: Option<String>,
    /// Elapsed milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timer: Option<u64>,
}

impl TimerData {
    pub fn ongoing(
        task_name: &str,
        task_description: &str,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            status: TimerStatus::Ongoing,
            task_name: Some(task_name.to_string()),
            task_description: Some(task_description.to_string()),
            task_start_date: Some(started_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            task_timer: Some(elapsed_ms),
        }
    }

    pub fn stopped() -> Self {
        Self {
            status: TimerStatus::Stopped,
            task_name: None,
            task_description: None,
            task_start_date: None,
            task_timer: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub notification: NotificationKind,
    pub message: String,
}

impl NotificationData {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            notification: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            notification: NotificationKind::Error,
            message: message.into(),
        }
    }
}
