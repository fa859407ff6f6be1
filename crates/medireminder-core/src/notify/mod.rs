//! Bridge between the app and the OS notification service.
//!
//! Outbound, [`ReminderDispatcher`] turns schedule entries into
//! [`ReminderRequest`]s. Inbound, [`Receipt`]s carry a [`ReminderPayload`]
//! that [`resolve`] maps back to a live medication and entry.

mod center;
mod dispatch;
mod memory;
mod payload;
mod receipt;

pub use center::{
    DeliveredReminder, NotificationAction, NotificationCategory, NotificationCenter,
    ReminderRequest, IGNORE_ACTION, MEDICATION_CATEGORY, POSTPONE_ACTION, TAKE_ACTION,
};
pub use dispatch::{PostponedReminder, ReminderDispatcher};
pub use memory::MemoryCenter;
pub use payload::{ReminderPayload, ENTRY_ID_KEY, MEDICATION_ID_KEY};
pub use receipt::{resolve, Receipt, ReminderAction};
