//! Medication list management.
//!
//! Every change keeps the notification center in step with storage: the
//! stored version's registrations are cancelled before a save and the new
//! version is registered after it.

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::medication::{Medication, MedicationDraft};
use crate::notify::ReminderDispatcher;
use crate::storage::PersistenceGateway;

#[derive(Clone)]
pub struct MedicationService {
    gateway: PersistenceGateway,
    dispatcher: ReminderDispatcher,
}

impl MedicationService {
    pub fn new(gateway: PersistenceGateway, dispatcher: ReminderDispatcher) -> Self {
        Self {
            gateway,
            dispatcher,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn list(&self) -> Vec<Medication> {
        self.gateway.load_medications()
    }

    pub fn get(&self, id: Uuid) -> Result<Medication> {
        self.list()
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found(id))
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Save a finished draft and register its reminders.
    ///
    /// A draft opened on an existing medication updates it instead.
    pub fn add(&self, draft: &mut MedicationDraft) -> Result<(Medication, Vec<Event>)> {
        draft.validate_all()?;
        let medication = draft.build()?;
        if draft.editing.is_some() {
            let events = self.update(medication.clone())?;
            return Ok((self.get(medication.id)?, events));
        }

        let mut medications = self.list();
        medications.push(medication.clone());
        self.gateway.save_medications(&medications)?;
        tracing::info!(name = %medication.name, entries = medication.schedule.len(), "medication added");

        let events = self.dispatcher.schedule_medication(&medication, now());
        Ok((medication, events))
    }

    /// Replace the stored medication with the same id.
    ///
    /// `created_at` is kept from the stored version.
    pub fn update(&self, mut medication: Medication) -> Result<Vec<Event>> {
        medication.validate()?;
        let mut medications = self.list();
        let slot = medications
            .iter_mut()
            .find(|m| m.id == medication.id)
            .ok_or_else(|| not_found(medication.id))?;

        let mut events = self.dispatcher.cancel_medication(slot);
        medication.created_at = slot.created_at;
        *slot = medication.clone();
        self.gateway.save_medications(&medications)?;
        tracing::info!(name = %medication.name, "medication updated");

        if medication.active {
            events.extend(self.dispatcher.schedule_medication(&medication, now()));
        }
        Ok(events)
    }

    /// Cancel every entry's reminder and any postponed follow-up, then drop
    /// the medication.
    ///
    /// Returns whether a medication was removed. Adherence history is kept.
    pub fn delete(&self, id: Uuid) -> Result<(bool, Vec<Event>)> {
        let mut medications = self.list();
        let Some(index) = medications.iter().position(|m| m.id == id) else {
            return Ok((false, Vec::new()));
        };

        let mut events = self.dispatcher.cancel_medication(&medications[index]);
        events.extend(self.dispatcher.cancel_postponed(&medications[index]));
        let removed = medications.remove(index);
        self.gateway.save_medications(&medications)?;
        tracing::info!(name = %removed.name, "medication deleted");
        Ok((true, events))
    }

    /// Pause or resume every reminder of a medication.
    pub fn set_active(&self, id: Uuid, active: bool) -> Result<Vec<Event>> {
        let mut medications = self.list();
        let medication = medications
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found(id))?;
        if medication.active == active {
            return Ok(Vec::new());
        }

        medication.active = active;
        let medication = medication.clone();
        self.gateway.save_medications(&medications)?;

        let events = if active {
            self.dispatcher.schedule_medication(&medication, now())
        } else {
            self.dispatcher.cancel_medication(&medication)
        };
        tracing::info!(name = %medication.name, active, "medication toggled");
        Ok(events)
    }

    /// Register every active medication again.
    ///
    /// Re-arms one-shot interval reminders that already fired.
    pub fn reschedule_all(&self) -> Vec<Event> {
        let now = now();
        self.list()
            .iter()
            .filter(|m| m.active)
            .flat_map(|m| self.dispatcher.schedule_medication(m, now))
            .collect()
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn not_found(id: Uuid) -> CoreError {
    CoreError::NotFound {
        what: "medication",
        id: id.to_string(),
    }
}
