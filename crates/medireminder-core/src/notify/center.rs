//! Port to the host's local-notification service.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::planner::Trigger;

pub const MEDICATION_CATEGORY: &str = "MEDICATION";
pub const TAKE_ACTION: &str = "TAKE_ACTION";
pub const POSTPONE_ACTION: &str = "POSTPONE_ACTION";
pub const IGNORE_ACTION: &str = "IGNORE_ACTION";

/// A reminder registration as handed to the notification center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRequest {
    /// Registration id. Adding a request with an existing id replaces it.
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub critical_sound: bool,
    /// Opaque string tags echoed back on delivery and response.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub trigger: Trigger,
}

/// A reminder the center has already shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredReminder {
    pub request: ReminderRequest,
    pub delivered_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
}

/// Group of actions offered on a delivered reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCategory {
    pub id: String,
    pub actions: Vec<NotificationAction>,
}

impl NotificationCategory {
    /// The Taken / Postpone / Ignore category attached to every dose reminder.
    pub fn medication() -> Self {
        let action = |id: &str, title: &str| NotificationAction {
            id: id.to_string(),
            title: title.to_string(),
        };
        Self {
            id: MEDICATION_CATEGORY.to_string(),
            actions: vec![
                action(TAKE_ACTION, "Taken"),
                action(POSTPONE_ACTION, "Postpone"),
                action(IGNORE_ACTION, "Ignore"),
            ],
        }
    }
}

/// The OS notification service.
///
/// Constructed by the host and passed to whatever needs it. Only the
/// permission request suspends; every other call is request/response.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    /// Ask for alert, badge and sound authorization.
    async fn request_authorization(&self) -> bool;

    fn set_categories(&self, categories: Vec<NotificationCategory>);

    fn add(&self, request: ReminderRequest) -> Result<(), NotifyError>;

    fn remove_pending(&self, ids: &[String]);

    fn pending(&self) -> Vec<ReminderRequest>;

    fn delivered(&self) -> Vec<DeliveredReminder>;

    fn remove_delivered(&self, ids: &[String]);
}
