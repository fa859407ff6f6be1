use std::error::Error;
use std::sync::Arc;

use chrono::Local;
use clap::Subcommand;
use medireminder_core::{Event, NoFeedback};

use crate::app::{print_events, App};

#[derive(Subcommand)]
pub enum PromptAction {
    /// Print the prompt the view would show
    Status,
    /// Record the prompted dose as taken
    Confirm,
    /// Record the prompted dose as pending and re-alert later
    Postpone,
    /// Record the prompted dose as ignored
    Ignore,
    /// Prompt for the latest delivered or due reminder
    Poll,
}

pub fn run(action: PromptAction) -> Result<(), Box<dyn Error>> {
    let app = App::open()?;
    let mut machine = app.machine(Arc::new(NoFeedback));

    let events: Vec<Event> = match action {
        PromptAction::Status => {
            println!("{}", serde_json::to_string_pretty(&machine.snapshot())?);
            return Ok(());
        }
        PromptAction::Confirm => machine.confirm().into_iter().collect(),
        PromptAction::Postpone => machine.postpone().into_iter().collect(),
        PromptAction::Ignore => machine.ignore().into_iter().collect(),
        PromptAction::Poll => machine.poll_foreground(Local::now().naive_local()),
    };

    app.save_prompt(&machine)?;
    if events.is_empty() {
        println!("nothing to do");
    }
    print_events(&events)
}
