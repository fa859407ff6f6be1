//! Inbound side of the bridge: what the notification center reports back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::center::{IGNORE_ACTION, POSTPONE_ACTION, TAKE_ACTION};
use super::payload::ReminderPayload;
use crate::events::DropReason;
use crate::medication::{Medication, ScheduleEntry};
use crate::storage::PersistenceGateway;

/// What the user did with a delivered reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderAction {
    Take,
    Postpone,
    Ignore,
    /// Tapped the reminder itself, or any action we don't know.
    Open,
}

impl ReminderAction {
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            TAKE_ACTION => Self::Take,
            POSTPONE_ACTION => Self::Postpone,
            IGNORE_ACTION => Self::Ignore,
            _ => Self::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// Delivered while the app was in the foreground.
    Presented { metadata: HashMap<String, String> },
    /// The user acted on a delivered reminder.
    Responded {
        metadata: HashMap<String, String>,
        action: ReminderAction,
    },
}

impl Receipt {
    pub fn metadata(&self) -> &HashMap<String, String> {
        match self {
            Self::Presented { metadata } | Self::Responded { metadata, .. } => metadata,
        }
    }

    pub fn payload(&self) -> Option<ReminderPayload> {
        ReminderPayload::from_metadata(self.metadata())
    }

    pub fn action(&self) -> Option<ReminderAction> {
        match self {
            Self::Presented { .. } => None,
            Self::Responded { action, .. } => Some(*action),
        }
    }
}

/// Look up the medication and entry a payload points at.
///
/// Reads the medication list from storage on every call, so a medication
/// deleted since the reminder was registered is reported missing.
pub fn resolve(
    gateway: &PersistenceGateway,
    payload: &ReminderPayload,
) -> Result<(Medication, ScheduleEntry), DropReason> {
    let medication = gateway
        .load_medications()
        .into_iter()
        .find(|m| m.id == payload.medication_id)
        .ok_or(DropReason::MedicationMissing)?;
    let entry = medication
        .entry(payload.entry_id)
        .cloned()
        .ok_or(DropReason::EntryMissing)?;
    Ok((medication, entry))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveTime;
    use uuid::Uuid;

    use super::*;
    use crate::medication::DosageForm;
    use crate::storage::MemoryStore;

    fn seeded() -> (PersistenceGateway, Medication) {
        let gateway = PersistenceGateway::new(Arc::new(MemoryStore::new()));
        let med = Medication::new(
            "Ibuprofen",
            DosageForm::Capsule,
            vec![ScheduleEntry::daily(NaiveTime::from_hms_opt(9, 0, 0).unwrap())],
        );
        gateway.save_medications(std::slice::from_ref(&med)).unwrap();
        (gateway, med)
    }

    #[test]
    fn action_identifiers() {
        assert_eq!(ReminderAction::from_identifier("TAKE_ACTION"), ReminderAction::Take);
        assert_eq!(
            ReminderAction::from_identifier("POSTPONE_ACTION"),
            ReminderAction::Postpone
        );
        assert_eq!(ReminderAction::from_identifier("IGNORE_ACTION"), ReminderAction::Ignore);
        assert_eq!(
            ReminderAction::from_identifier("com.apple.UNNotificationDefaultActionIdentifier"),
            ReminderAction::Open
        );
    }

    #[test]
    fn resolves_live_medication() {
        let (gateway, med) = seeded();
        let payload = ReminderPayload::new(med.id, med.schedule[0].id);
        let (found, entry) = resolve(&gateway, &payload).unwrap();
        assert_eq!(found.id, med.id);
        assert_eq!(entry.id, med.schedule[0].id);
    }

    #[test]
    fn deleted_medication_is_missing() {
        let (gateway, med) = seeded();
        let payload = ReminderPayload::new(med.id, med.schedule[0].id);
        gateway.save_medications(&[]).unwrap();
        assert_eq!(
            resolve(&gateway, &payload).unwrap_err(),
            DropReason::MedicationMissing
        );
    }

    #[test]
    fn unknown_entry_is_missing() {
        let (gateway, med) = seeded();
        let payload = ReminderPayload::new(med.id, Uuid::new_v4());
        assert_eq!(resolve(&gateway, &payload).unwrap_err(), DropReason::EntryMissing);
    }
}
