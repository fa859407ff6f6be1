use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::planner::Trigger;

/// Why a notification receipt never reached the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// `medication_id` / `entry_id` tags missing or not UUIDs.
    MalformedPayload,
    MedicationMissing,
    EntryMissing,
}

/// Every state change in the system produces an Event.
/// The runtime logs them; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ReminderScheduled {
        reminder_id: String,
        medication_id: Uuid,
        entry_id: Uuid,
        trigger: Trigger,
        at: DateTime<Utc>,
    },
    ReminderCancelled {
        reminder_id: String,
        at: DateTime<Utc>,
    },
    /// A dose prompt became visible. `replaced` is set when it overwrote
    /// a prompt that was still showing.
    PromptStarted {
        medication_id: Uuid,
        entry_id: Uuid,
        medication_name: String,
        replaced: bool,
        at: DateTime<Utc>,
    },
    DoseTaken {
        record_id: Uuid,
        medication_id: Uuid,
        entry_id: Uuid,
        at: DateTime<Utc>,
    },
    DosePostponed {
        record_id: Uuid,
        medication_id: Uuid,
        entry_id: Uuid,
        reminder_id: String,
        remind_at: NaiveDateTime,
        at: DateTime<Utc>,
    },
    DoseIgnored {
        record_id: Uuid,
        medication_id: Uuid,
        entry_id: Uuid,
        at: DateTime<Utc>,
    },
    ReceiptDropped {
        reason: DropReason,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::ReminderScheduled { at, .. }
            | Self::ReminderCancelled { at, .. }
            | Self::PromptStarted { at, .. }
            | Self::DoseTaken { at, .. }
            | Self::DosePostponed { at, .. }
            | Self::DoseIgnored { at, .. }
            | Self::ReceiptDropped { at, .. } => *at,
        }
    }
}
