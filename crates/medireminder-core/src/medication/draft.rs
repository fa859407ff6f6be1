//! Multi-step medication form.
//!
//! ```text
//! Name -> Form -> Schedule -> Review
//! ```
//!
//! Each step validates before the user may move on. Failures come back
//! synchronously as a [`ValidationError`] whose message is shown inline.

use chrono::{Datelike, Local, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{DosageForm, Medication};
use super::schedule::{weekday_number, Recurrence, ScheduleEntry};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStep {
    Name = 1,
    Form = 2,
    Schedule = 3,
    Review = 4,
}

impl FormStep {
    pub const COUNT: usize = 4;

    pub fn number(self) -> usize {
        self as usize
    }

    fn next(self) -> Self {
        match self {
            Self::Name => Self::Form,
            Self::Form => Self::Schedule,
            Self::Schedule | Self::Review => Self::Review,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Name | Self::Form => Self::Name,
            Self::Schedule => Self::Form,
            Self::Review => Self::Schedule,
        }
    }
}

/// In-progress medication being created or edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationDraft {
    pub step: FormStep,
    pub name: String,
    pub form: DosageForm,
    pub schedule: Vec<ScheduleEntry>,
    pub note: String,
    pub notification_title: String,
    /// Set when editing an existing medication.
    pub editing: Option<Uuid>,
}

impl Default for MedicationDraft {
    fn default() -> Self {
        Self {
            step: FormStep::Name,
            name: String::new(),
            form: DosageForm::default(),
            schedule: Vec::new(),
            note: String::new(),
            notification_title: String::new(),
            editing: None,
        }
    }
}

impl MedicationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing medication into the form for editing.
    pub fn from_medication(medication: &Medication) -> Self {
        Self {
            step: FormStep::Name,
            name: medication.name.clone(),
            form: medication.form,
            schedule: medication.schedule.clone(),
            note: medication.note.clone().unwrap_or_default(),
            notification_title: medication.notification_title.clone().unwrap_or_default(),
            editing: Some(medication.id),
        }
    }

    /// Validate the current step and move forward.
    pub fn advance(&mut self) -> Result<FormStep, ValidationError> {
        self.validate_step(self.step)?;
        self.step = self.step.next();
        Ok(self.step)
    }

    pub fn back(&mut self) -> FormStep {
        self.step = self.step.previous();
        self.step
    }

    /// Validate every step, jumping to the first one that fails.
    pub fn validate_all(&mut self) -> Result<(), ValidationError> {
        for step in [FormStep::Name, FormStep::Form, FormStep::Schedule] {
            if let Err(e) = self.validate_step(step) {
                self.step = step;
                return Err(e);
            }
        }
        Ok(())
    }

    fn validate_step(&self, step: FormStep) -> Result<(), ValidationError> {
        match step {
            FormStep::Name => {
                if self.name.trim().is_empty() {
                    return Err(ValidationError::EmptyName);
                }
            }
            FormStep::Form | FormStep::Review => {}
            FormStep::Schedule => {
                if self.schedule.is_empty() {
                    return Err(ValidationError::NoScheduleEntries);
                }
                self.schedule.iter().try_for_each(ScheduleEntry::validate)?;
            }
        }
        Ok(())
    }

    /// Add a dosing time. A weekday rule with nothing selected defaults to today.
    pub fn add_entry(&mut self, time: NaiveTime, recurrence: Recurrence) -> &ScheduleEntry {
        let recurrence = match recurrence {
            Recurrence::Weekdays { days } if days.is_empty() => Recurrence::Weekdays {
                days: vec![weekday_number(Local::now().weekday())],
            },
            other => other,
        };
        self.schedule.push(ScheduleEntry::new(time, recurrence));
        let last = self.schedule.len() - 1;
        &self.schedule[last]
    }

    pub fn remove_entry(&mut self, entry_id: Uuid) -> bool {
        let before = self.schedule.len();
        self.schedule.retain(|e| e.id != entry_id);
        self.schedule.len() != before
    }

    /// Produce the medication. Blank note/title become `None`.
    pub fn build(&mut self) -> Result<Medication, ValidationError> {
        self.validate_all()?;
        let mut medication = Medication::new(self.name.trim(), self.form, self.schedule.clone());
        if let Some(id) = self.editing {
            medication.id = id;
        }
        medication.note = non_blank(&self.note);
        medication.notification_title = non_blank(&self.notification_title);
        Ok(medication)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
