//! # MediReminder Core Library
//!
//! This library provides the core logic for MediReminder, a personal
//! medication reminder. The user registers medications with dosing
//! schedules, receives timed local alerts, and confirms, postpones or
//! ignores each dose while an adherence history is kept.
//!
//! The OS notification service and feedback hardware stay outside the
//! crate behind traits; the CLI binary supplies desktop stand-ins.
//!
//! ## Architecture
//!
//! - **Medication**: medications, schedule entries, recurrence rules, the
//!   multi-step form and adherence records
//! - **Planner**: maps a schedule entry to the trigger the OS registers
//! - **Notify**: dispatch of reminders and resolution of receipts
//! - **Confirm**: the Idle/Prompting state machine driven by receipts
//! - **Runtime**: single-owner main loop that callbacks hop onto
//! - **Storage**: key-value persistence (SQLite) and TOML configuration
//!
//! ## Key Components
//!
//! - [`ConfirmationMachine`]: dose prompt state machine
//! - [`ReminderDispatcher`]: registers and cancels reminders
//! - [`MedicationService`] / [`HistoryService`]: list and history management
//! - [`PersistenceGateway`]: whole-collection JSON persistence
//! - [`Config`]: application configuration management

pub mod confirm;
pub mod error;
pub mod events;
pub mod feedback;
pub mod history;
pub mod medication;
pub mod medications;
pub mod notify;
pub mod planner;
pub mod runtime;
pub mod storage;

pub use confirm::{ConfirmationMachine, PromptSnapshot, PromptState};
pub use error::{ConfigError, CoreError, NotifyError, StorageError, ValidationError};
pub use events::{DropReason, Event};
pub use feedback::{FeedbackSink, NoFeedback, PulseHandle, PulseLoop};
pub use history::{AdherenceStats, HistoryFilter, HistoryPeriod, HistoryService};
pub use medication::{
    AdherenceRecord, DosageCategory, DosageForm, DoseStatus, FormStep, Medication,
    MedicationDraft, Recurrence, ScheduleEntry,
};
pub use medications::MedicationService;
pub use notify::{
    MemoryCenter, NotificationCenter, Receipt, ReminderAction, ReminderDispatcher,
    ReminderPayload, ReminderRequest,
};
pub use planner::{plan, Trigger};
pub use runtime::{Command, MainHandle, MainLoop};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, PersistenceGateway};
