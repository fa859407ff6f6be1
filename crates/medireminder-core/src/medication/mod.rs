mod draft;
mod model;
mod record;
mod schedule;

pub use draft::{FormStep, MedicationDraft};
pub use model::{DosageCategory, DosageForm, Medication};
pub use record::{AdherenceRecord, DoseStatus};
pub use schedule::{weekday_from_number, weekday_number, Recurrence, ScheduleEntry};
