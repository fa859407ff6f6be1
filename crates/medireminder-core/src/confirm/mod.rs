mod machine;
mod state;

pub use machine::ConfirmationMachine;
pub use state::{PromptSnapshot, PromptState};
