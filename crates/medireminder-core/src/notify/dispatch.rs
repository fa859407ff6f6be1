//! Outbound side of the bridge: turning schedule entries into registrations.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use uuid::Uuid;

use super::center::{
    DeliveredReminder, NotificationCategory, NotificationCenter, ReminderRequest,
    MEDICATION_CATEGORY,
};
use super::payload::ReminderPayload;
use crate::events::Event;
use crate::medication::{Medication, ScheduleEntry};
use crate::planner::{plan, Trigger};
use crate::storage::RemindersConfig;

/// Id and fire time of a postponed-dose reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostponedReminder {
    pub id: String,
    pub remind_at: NaiveDateTime,
}

/// Registers and cancels dose reminders with a [`NotificationCenter`].
///
/// Registration is fire-and-forget: failures are logged and never retried.
#[derive(Clone)]
pub struct ReminderDispatcher {
    center: Arc<dyn NotificationCenter>,
    config: RemindersConfig,
}

impl ReminderDispatcher {
    pub fn new(center: Arc<dyn NotificationCenter>, config: RemindersConfig) -> Self {
        Self { center, config }
    }

    pub fn center(&self) -> &Arc<dyn NotificationCenter> {
        &self.center
    }

    pub fn register_categories(&self) {
        self.center
            .set_categories(vec![NotificationCategory::medication()]);
    }

    pub async fn request_permission(&self) -> bool {
        let granted = self.center.request_authorization().await;
        tracing::info!(granted, "notification permission");
        granted
    }

    // ── Scheduling ───────────────────────────────────────────────────

    /// Register the reminder for one entry, keyed by the entry id.
    pub fn schedule_entry(
        &self,
        medication: &Medication,
        entry: &ScheduleEntry,
        now: NaiveDateTime,
    ) -> Option<Event> {
        let trigger = plan(entry, now);
        let title = medication
            .notification_title
            .clone()
            .unwrap_or_else(|| self.config.default_title.clone());
        let request = ReminderRequest {
            id: entry.reminder_id(),
            title,
            body: format!("It's time to take {}", medication.name),
            category: MEDICATION_CATEGORY.to_string(),
            critical_sound: self.config.critical_sound,
            metadata: ReminderPayload::new(medication.id, entry.id).to_metadata(),
            trigger,
        };
        self.register(request, medication.id, entry.id)
    }

    pub fn schedule_medication(&self, medication: &Medication, now: NaiveDateTime) -> Vec<Event> {
        medication
            .schedule
            .iter()
            .filter_map(|entry| self.schedule_entry(medication, entry, now))
            .collect()
    }

    /// One-shot reminder `delay` after `now` under a fresh id.
    pub fn schedule_postpone(
        &self,
        medication: &Medication,
        entry: &ScheduleEntry,
        delay: Duration,
        now: NaiveDateTime,
    ) -> PostponedReminder {
        let remind_at = now + delay;
        let id = format!("reminder-{}", Uuid::new_v4());
        let request = ReminderRequest {
            id: id.clone(),
            title: format!("Reminder: {}", medication.name),
            body: "Don't forget to take your medication".to_string(),
            category: MEDICATION_CATEGORY.to_string(),
            critical_sound: self.config.critical_sound,
            metadata: ReminderPayload::new(medication.id, entry.id).to_metadata(),
            trigger: Trigger::Once { at: remind_at },
        };
        self.register(request, medication.id, entry.id);
        PostponedReminder { id, remind_at }
    }

    fn register(&self, request: ReminderRequest, medication_id: Uuid, entry_id: Uuid) -> Option<Event> {
        let reminder_id = request.id.clone();
        let trigger = request.trigger;
        match self.center.add(request) {
            Ok(()) => {
                tracing::debug!(%reminder_id, %trigger, "reminder registered");
                Some(Event::ReminderScheduled {
                    reminder_id,
                    medication_id,
                    entry_id,
                    trigger,
                    at: Utc::now(),
                })
            }
            Err(e) => {
                tracing::warn!(%reminder_id, error = %e, "reminder registration failed");
                None
            }
        }
    }

    // ── Cancellation ─────────────────────────────────────────────────

    /// Cancel the pending reminder of one entry.
    pub fn cancel_entry(&self, entry: &ScheduleEntry) -> Event {
        let reminder_id = entry.reminder_id();
        self.center.remove_pending(std::slice::from_ref(&reminder_id));
        tracing::debug!(%reminder_id, "reminder cancelled");
        Event::ReminderCancelled {
            reminder_id,
            at: Utc::now(),
        }
    }

    /// One cancellation call per schedule entry.
    pub fn cancel_medication(&self, medication: &Medication) -> Vec<Event> {
        medication
            .schedule
            .iter()
            .map(|entry| self.cancel_entry(entry))
            .collect()
    }

    /// Cancel postponed follow-ups still pending for `medication`.
    ///
    /// Entry registrations are left alone. Matching requests go out in a
    /// single removal call, and no call is made when there are none.
    pub fn cancel_postponed(&self, medication: &Medication) -> Vec<Event> {
        let entry_ids: Vec<String> = medication
            .schedule
            .iter()
            .map(ScheduleEntry::reminder_id)
            .collect();
        let ids: Vec<String> = self
            .center
            .pending()
            .into_iter()
            .filter(|r| !entry_ids.contains(&r.id))
            .filter(|r| {
                ReminderPayload::from_metadata(&r.metadata)
                    .is_some_and(|p| p.medication_id == medication.id)
            })
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Vec::new();
        }

        self.center.remove_pending(&ids);
        let at = Utc::now();
        ids.into_iter()
            .map(|reminder_id| {
                tracing::debug!(%reminder_id, "postponed reminder cancelled");
                Event::ReminderCancelled { reminder_id, at }
            })
            .collect()
    }

    /// Drop one-shot requests that already fired but were never delivered.
    pub fn retire_fired(&self, ids: &[String]) {
        self.center.remove_pending(ids);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn pending(&self) -> Vec<ReminderRequest> {
        self.center.pending()
    }

    pub fn delivered(&self) -> Vec<DeliveredReminder> {
        self.center.delivered()
    }

    pub fn remove_delivered(&self, ids: &[String]) {
        self.center.remove_delivered(ids);
    }
}
