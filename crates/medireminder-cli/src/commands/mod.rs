pub mod config;
pub mod history;
pub mod med;
pub mod prompt;
pub mod reminder;
pub mod watch;
