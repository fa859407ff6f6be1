use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::center::{DeliveredReminder, NotificationCategory, NotificationCenter, ReminderRequest};
use crate::error::NotifyError;

#[derive(Debug, Default)]
struct Inner {
    categories: Vec<NotificationCategory>,
    pending: Vec<ReminderRequest>,
    delivered: Vec<DeliveredReminder>,
    added: Vec<ReminderRequest>,
    removal_calls: Vec<Vec<String>>,
}

/// In-process notification center that records every call.
///
/// Nothing fires on its own; call [`MemoryCenter::deliver`] to move a
/// pending reminder to the delivered list.
#[derive(Debug)]
pub struct MemoryCenter {
    authorized: bool,
    fail_adds: AtomicBool,
    inner: Mutex<Inner>,
}

impl Default for MemoryCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCenter {
    pub fn new() -> Self {
        Self {
            authorized: true,
            fail_adds: AtomicBool::new(false),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// A center whose permission request is declined.
    pub fn denying() -> Self {
        Self {
            authorized: false,
            ..Self::new()
        }
    }

    /// Make subsequent `add` calls fail.
    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    /// Mark a pending reminder as shown at `at`. Repeating reminders stay pending.
    pub fn deliver(&self, id: &str, at: NaiveDateTime) -> Option<DeliveredReminder> {
        let mut inner = self.inner.lock().ok()?;
        let index = inner.pending.iter().position(|r| r.id == id)?;
        let request = if inner.pending[index].trigger.repeats() {
            inner.pending[index].clone()
        } else {
            inner.pending.remove(index)
        };
        let delivered = DeliveredReminder {
            request,
            delivered_at: at,
        };
        inner.delivered.push(delivered.clone());
        Some(delivered)
    }

    /// Every request passed to `add`, in call order.
    pub fn added(&self) -> Vec<ReminderRequest> {
        self.inner.lock().map(|i| i.added.clone()).unwrap_or_default()
    }

    /// The id lists of every `remove_pending` call, in call order.
    pub fn removal_calls(&self) -> Vec<Vec<String>> {
        self.inner
            .lock()
            .map(|i| i.removal_calls.clone())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> Vec<NotificationCategory> {
        self.inner
            .lock()
            .map(|i| i.categories.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationCenter for MemoryCenter {
    async fn request_authorization(&self) -> bool {
        self.authorized
    }

    fn set_categories(&self, categories: Vec<NotificationCategory>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.categories = categories;
        }
    }

    fn add(&self, request: ReminderRequest) -> Result<(), NotifyError> {
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(NotifyError::RegistrationFailed {
                id: request.id,
                message: "rejected by test center".into(),
            });
        }
        let mut inner = self.inner.lock().map_err(|_| NotifyError::RegistrationFailed {
            id: request.id.clone(),
            message: "center lock poisoned".into(),
        })?;
        inner.added.push(request.clone());
        inner.pending.retain(|r| r.id != request.id);
        inner.pending.push(request);
        Ok(())
    }

    fn remove_pending(&self, ids: &[String]) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.removal_calls.push(ids.to_vec());
            inner.pending.retain(|r| !ids.contains(&r.id));
        }
    }

    fn pending(&self) -> Vec<ReminderRequest> {
        self.inner
            .lock()
            .map(|i| i.pending.clone())
            .unwrap_or_default()
    }

    fn delivered(&self) -> Vec<DeliveredReminder> {
        self.inner
            .lock()
            .map(|i| i.delivered.clone())
            .unwrap_or_default()
    }

    fn remove_delivered(&self, ids: &[String]) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.delivered.retain(|d| !ids.contains(&d.request.id));
        }
    }
}
