mod trigger;

pub use trigger::{plan, Trigger};
