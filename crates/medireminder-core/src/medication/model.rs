use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schedule::ScheduleEntry;
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// DosageForm
// ---------------------------------------------------------------------------

/// Physical form of a medication. Cosmetic only; nothing schedules off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DosageForm {
    Capsule,
    Tablet,
    Liquid,
    Topical,
    Patch,
    Cream,
    Device,
    Foam,
    Gel,
    Drops,
    Inhaler,
    Injection,
    Lotion,
    Ointment,
    Powder,
    Spray,
    Suppository,
}

/// Grouping used by the form picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DosageCategory {
    Common,
    Other,
}

impl DosageForm {
    pub const ALL: [DosageForm; 17] = [
        Self::Capsule,
        Self::Tablet,
        Self::Liquid,
        Self::Topical,
        Self::Patch,
        Self::Cream,
        Self::Device,
        Self::Foam,
        Self::Gel,
        Self::Drops,
        Self::Inhaler,
        Self::Injection,
        Self::Lotion,
        Self::Ointment,
        Self::Powder,
        Self::Spray,
        Self::Suppository,
    ];

    pub fn category(self) -> DosageCategory {
        match self {
            Self::Capsule | Self::Tablet | Self::Liquid | Self::Topical => DosageCategory::Common,
            _ => DosageCategory::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Capsule => "Capsule",
            Self::Tablet => "Tablet",
            Self::Liquid => "Liquid",
            Self::Topical => "Topical",
            Self::Patch => "Patch",
            Self::Cream => "Cream",
            Self::Device => "Device",
            Self::Foam => "Foam",
            Self::Gel => "Gel",
            Self::Drops => "Drops",
            Self::Inhaler => "Inhaler",
            Self::Injection => "Injection",
            Self::Lotion => "Lotion",
            Self::Ointment => "Ointment",
            Self::Powder => "Powder",
            Self::Spray => "Spray",
            Self::Suppository => "Suppository",
        }
    }
}

impl Default for DosageForm {
    fn default() -> Self {
        Self::Tablet
    }
}

impl fmt::Display for DosageForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DosageForm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|form| form.label().to_lowercase() == wanted)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "form".into(),
                message: format!("unknown dosage form '{s}'"),
            })
    }
}

// ---------------------------------------------------------------------------
// Medication
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub form: DosageForm,
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub note: Option<String>,
    /// Overrides the default reminder title.
    #[serde(default)]
    pub notification_title: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Medication {
    pub fn new(name: impl Into<String>, form: DosageForm, schedule: Vec<ScheduleEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            form,
            schedule,
            note: None,
            notification_title: None,
            created_at: Utc::now(),
            active: true,
        }
    }

    pub fn entry(&self, entry_id: Uuid) -> Option<&ScheduleEntry> {
        self.schedule.iter().find(|e| e.id == entry_id)
    }

    /// Reject medications the form would not let through.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.schedule.is_empty() {
            return Err(ValidationError::NoScheduleEntries);
        }
        self.schedule.iter().try_for_each(ScheduleEntry::validate)
    }
}
