//! Desktop stand-in for the OS notification service.
//!
//! Pending and delivered reminders live in the same SQLite key-value table
//! as the app data, so separate CLI invocations see one notification
//! center. Nothing fires by itself: `reminder deliver` and `watch` move due
//! reminders to the delivered list.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use medireminder_core::notify::{DeliveredReminder, NotificationCategory};
use medireminder_core::{
    KeyValueStore, NotificationCenter, NotifyError, PersistenceGateway, ReminderRequest,
};

const PENDING_KEY: &str = "os.pending";
const DELIVERED_KEY: &str = "os.delivered";
const CATEGORIES_KEY: &str = "os.categories";
const AUTHORIZED_KEY: &str = "os.authorized";
/// Local time up to which repeating reminders have been delivered.
const CHECKED_KEY: &str = "os.checked_at";

pub struct StoredCenter {
    blobs: PersistenceGateway,
}

impl StoredCenter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            blobs: PersistenceGateway::new(store),
        }
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.blobs.load_value(key).unwrap_or_default()
    }

    fn store<T: serde::Serialize>(&self, key: &str, items: &[T]) {
        if let Err(e) = self.blobs.save_value(key, items) {
            tracing::warn!(key, error = %e, "failed to persist notification center");
        }
    }

    /// Deliver one pending reminder now, whatever its trigger says.
    pub fn deliver(&self, id: &str, at: NaiveDateTime) -> Option<DeliveredReminder> {
        let mut pending: Vec<ReminderRequest> = self.load(PENDING_KEY);
        let index = pending.iter().position(|r| r.id == id)?;
        let request = if pending[index].trigger.repeats() {
            pending[index].clone()
        } else {
            let request = pending.remove(index);
            self.store(PENDING_KEY, &pending);
            request
        };
        let delivered = DeliveredReminder {
            request,
            delivered_at: at,
        };
        let mut all: Vec<DeliveredReminder> = self.load(DELIVERED_KEY);
        all.push(delivered.clone());
        self.store(DELIVERED_KEY, &all);
        Some(delivered)
    }

    /// Deliver every reminder whose trigger fired since the last check.
    ///
    /// The first check only records the time, so a fresh install does not
    /// replay every daily reminder at once.
    pub fn deliver_due(&self, now: NaiveDateTime) -> Vec<DeliveredReminder> {
        let checked: Option<NaiveDateTime> = self.blobs.load_value(CHECKED_KEY);
        if let Err(e) = self.blobs.save_value(CHECKED_KEY, &now) {
            tracing::warn!(error = %e, "failed to record delivery check");
        }

        let pending: Vec<ReminderRequest> = self.load(PENDING_KEY);
        let due: Vec<String> = pending
            .iter()
            .filter(|r| match (r.trigger.fixed_date(), checked) {
                (Some(at), _) => at <= now,
                (None, Some(since)) => r.trigger.next_fire_after(since).is_some_and(|at| at <= now),
                (None, None) => false,
            })
            .map(|r| r.id.clone())
            .collect();

        due.iter().filter_map(|id| self.deliver(id, now)).collect()
    }

    pub fn is_authorized(&self) -> bool {
        self.blobs.load_value(AUTHORIZED_KEY).unwrap_or(false)
    }
}

#[async_trait]
impl NotificationCenter for StoredCenter {
    async fn request_authorization(&self) -> bool {
        if let Err(e) = self.blobs.save_value(AUTHORIZED_KEY, &true) {
            tracing::warn!(error = %e, "failed to record authorization");
        }
        true
    }

    fn set_categories(&self, categories: Vec<NotificationCategory>) {
        self.store(CATEGORIES_KEY, &categories);
    }

    fn add(&self, request: ReminderRequest) -> Result<(), NotifyError> {
        let mut pending: Vec<ReminderRequest> = self.load(PENDING_KEY);
        pending.retain(|r| r.id != request.id);
        let id = request.id.clone();
        pending.push(request);
        self.blobs
            .save_value(PENDING_KEY, &pending)
            .map_err(|e| NotifyError::RegistrationFailed {
                id,
                message: e.to_string(),
            })
    }

    fn remove_pending(&self, ids: &[String]) {
        let mut pending: Vec<ReminderRequest> = self.load(PENDING_KEY);
        pending.retain(|r| !ids.contains(&r.id));
        self.store(PENDING_KEY, &pending);
    }

    fn pending(&self) -> Vec<ReminderRequest> {
        self.load(PENDING_KEY)
    }

    fn delivered(&self) -> Vec<DeliveredReminder> {
        self.load(DELIVERED_KEY)
    }

    fn remove_delivered(&self, ids: &[String]) {
        let mut delivered: Vec<DeliveredReminder> = self.load(DELIVERED_KEY);
        delivered.retain(|d| !ids.contains(&d.request.id));
        self.store(DELIVERED_KEY, &delivered);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Duration, NaiveDate, NaiveTime};
    use medireminder_core::{MemoryStore, Trigger};

    use super::*;

    fn request(id: &str, trigger: Trigger) -> ReminderRequest {
        ReminderRequest {
            id: id.into(),
            title: "Time to take your medication".into(),
            body: "It's time to take Aspirin".into(),
            category: "MEDICATION".into(),
            critical_sound: true,
            metadata: HashMap::new(),
            trigger,
        }
    }

    fn morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    #[test]
    fn first_check_only_records_time() {
        let center = StoredCenter::new(Arc::new(MemoryStore::new()));
        let daily = Trigger::Daily {
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        };
        center.add(request("daily", daily)).unwrap();

        assert!(center.deliver_due(morning()).is_empty());
        assert!(center.deliver_due(morning() + Duration::minutes(30)).is_empty());

        let delivered = center.deliver_due(morning() + Duration::hours(2));
        assert_eq!(delivered.len(), 1);
        assert_eq!(center.pending().len(), 1);
        assert!(center.deliver_due(morning() + Duration::hours(3)).is_empty());
    }

    #[test]
    fn one_shot_moves_to_delivered() {
        let center = StoredCenter::new(Arc::new(MemoryStore::new()));
        let at = morning() + Duration::minutes(5);
        center.add(request("later", Trigger::Once { at })).unwrap();

        assert!(center.deliver_due(morning()).is_empty());
        assert_eq!(center.deliver_due(at).len(), 1);
        assert!(center.pending().is_empty());
        assert_eq!(center.delivered().len(), 1);

        center.remove_delivered(&["later".to_string()]);
        assert!(center.delivered().is_empty());
    }

    #[tokio::test]
    async fn authorization_is_remembered() {
        let center = StoredCenter::new(Arc::new(MemoryStore::new()));
        assert!(!center.is_authorized());
        assert!(center.request_authorization().await);
        assert!(center.is_authorized());
    }
}
