use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use chrono::Local;
use clap::{Subcommand, ValueEnum};
use medireminder_core::notify;
use medireminder_core::{NoFeedback, Receipt};

use crate::app::{find_by_prefix, print_events, App};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// List pending and delivered reminders
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register every active medication again
    Sync,
    /// Deliver due reminders (or one reminder by id, due or not)
    Deliver {
        /// Reminder id or id prefix
        id: Option<String>,
    },
    /// Answer a reminder as if from the notification itself
    Respond {
        /// Reminder id or id prefix
        id: String,
        #[arg(value_enum)]
        action: Response,
    },
    /// Ask for notification permission
    Permission,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Response {
    Take,
    Postpone,
    Ignore,
    Open,
}

impl From<Response> for notify::ReminderAction {
    fn from(response: Response) -> Self {
        match response {
            Response::Take => Self::Take,
            Response::Postpone => Self::Postpone,
            Response::Ignore => Self::Ignore,
            Response::Open => Self::Open,
        }
    }
}

pub async fn run(action: ReminderAction) -> Result<(), Box<dyn Error>> {
    let app = App::open()?;
    let now = Local::now().naive_local();

    match action {
        ReminderAction::List { json } => {
            let pending = app.dispatcher.pending();
            let delivered = app.dispatcher.delivered();
            if json {
                let out = serde_json::json!({ "pending": pending, "delivered": delivered });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }
            for request in &pending {
                let next = request
                    .trigger
                    .next_fire_after(now)
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "due".into());
                println!("pending    {}  {}  next: {}", request.id, request.trigger, next);
            }
            for d in &delivered {
                println!(
                    "delivered  {}  {}  at {}",
                    d.request.id,
                    d.request.title,
                    d.delivered_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ReminderAction::Sync => {
            print_events(&app.medications().reschedule_all())?;
        }
        ReminderAction::Deliver { id } => {
            let delivered = match id {
                Some(id) => {
                    let request =
                        find_by_prefix(app.dispatcher.pending(), strip(&id), reminder_uuid)?;
                    app.center.deliver(&request.id, now).into_iter().collect()
                }
                None => app.center.deliver_due(now),
            };
            for d in &delivered {
                println!("delivered {}: {}", d.request.id, d.request.body);
            }
        }
        ReminderAction::Respond { id, action } => {
            // A delivered repeating reminder is still pending under the same id.
            let mut seen = HashSet::new();
            let known: Vec<_> = app
                .dispatcher
                .delivered()
                .into_iter()
                .map(|d| d.request)
                .chain(app.dispatcher.pending())
                .filter(|r| seen.insert(r.id.clone()))
                .collect();
            let request = find_by_prefix(known, strip(&id), reminder_uuid)?;
            app.dispatcher
                .remove_delivered(std::slice::from_ref(&request.id));

            let mut machine = app.machine(Arc::new(NoFeedback));
            let events = machine.handle_receipt(Receipt::Responded {
                metadata: request.metadata,
                action: action.into(),
            });
            app.save_prompt(&machine)?;
            print_events(&events)?;
        }
        ReminderAction::Permission => {
            let granted = app.dispatcher.request_permission().await;
            println!("{}", if granted { "granted" } else { "denied" });
        }
    }
    Ok(())
}

fn strip(id: &str) -> &str {
    id.strip_prefix("reminder-").unwrap_or(id)
}

/// Reminder ids are entry UUIDs, or `reminder-<uuid>` for postponed doses.
fn reminder_uuid(request: &medireminder_core::ReminderRequest) -> uuid::Uuid {
    uuid::Uuid::parse_str(strip(&request.id)).unwrap_or_default()
}
