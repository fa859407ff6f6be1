use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Medication;
use super::schedule::ScheduleEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    Taken,
    Pending,
    Ignored,
}

impl DoseStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Taken => "Taken",
            Self::Pending => "Pending",
            Self::Ignored => "Ignored",
        }
    }
}

/// Outcome of one prompted dose. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceRecord {
    pub id: Uuid,
    pub medication_id: Uuid,
    /// Name at record time, so history survives rename and deletion.
    pub medication_name: String,
    #[serde(default)]
    pub entry_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub status: DoseStatus,
    #[serde(default)]
    pub postponed: bool,
}

impl AdherenceRecord {
    fn new(
        medication: &Medication,
        entry: &ScheduleEntry,
        now: DateTime<Utc>,
        status: DoseStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            medication_id: medication.id,
            medication_name: medication.name.clone(),
            entry_id: Some(entry.id),
            scheduled_at: slot_on_day_of(entry.time, now),
            taken_at: None,
            status,
            postponed: false,
        }
    }

    pub fn taken(medication: &Medication, entry: &ScheduleEntry, now: DateTime<Utc>) -> Self {
        Self {
            taken_at: Some(now),
            ..Self::new(medication, entry, now, DoseStatus::Taken)
        }
    }

    pub fn postponed(medication: &Medication, entry: &ScheduleEntry, now: DateTime<Utc>) -> Self {
        Self {
            postponed: true,
            ..Self::new(medication, entry, now, DoseStatus::Pending)
        }
    }

    pub fn ignored(medication: &Medication, entry: &ScheduleEntry, now: DateTime<Utc>) -> Self {
        Self::new(medication, entry, now, DoseStatus::Ignored)
    }
}

/// The slot's time of day on the local calendar day of `now`.
fn slot_on_day_of(time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(&Local)
        .date_naive()
        .and_time(time)
        .and_local_timezone(Local)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now)
}
