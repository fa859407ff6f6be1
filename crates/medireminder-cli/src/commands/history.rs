use std::error::Error;

use clap::Subcommand;
use medireminder_core::{HistoryFilter, HistoryPeriod};

use crate::app::{find_by_prefix, App};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List adherence records, newest first
    List {
        /// today, week, month, all or <days>d (defaults to history.days_shown
        /// unless history.show_full_history is set)
        #[arg(long)]
        period: Option<HistoryPeriod>,
        /// Only records of this medication (id or id prefix)
        #[arg(long)]
        med: Option<String>,
        /// Maximum records to print (defaults to history.page_size)
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Adherence statistics
    Stats {
        #[arg(long)]
        period: Option<HistoryPeriod>,
        #[arg(long)]
        med: Option<String>,
    },
    /// Delete one record
    Remove {
        /// Record id or id prefix
        id: String,
    },
}

fn filter(
    app: &App,
    period: Option<HistoryPeriod>,
    med: Option<String>,
) -> Result<HistoryFilter, Box<dyn Error>> {
    let period = period.unwrap_or_else(|| HistoryPeriod::from_config(&app.config.history));
    let medication_id = med
        .map(|id| app.find_medication(&id).map(|m| m.id))
        .transpose()?;
    Ok(HistoryFilter {
        period,
        medication_id,
    })
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn Error>> {
    let app = App::open()?;
    let service = app.history();

    match action {
        HistoryAction::List {
            period,
            med,
            limit,
            json,
        } => {
            let limit = limit.unwrap_or(app.config.history.page_size as usize);
            let records: Vec<_> = service
                .list(&filter(&app, period, med)?)
                .into_iter()
                .take(limit)
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("no records");
            }
            for r in &records {
                let postponed = if r.postponed { " (postponed)" } else { "" };
                println!(
                    "{}  {}  {}  {}{}",
                    &r.id.to_string()[..8],
                    r.scheduled_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M"),
                    r.medication_name,
                    r.status.label(),
                    postponed
                );
            }
        }
        HistoryAction::Stats { period, med } => {
            let stats = service.stats(&filter(&app, period, med)?);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        HistoryAction::Remove { id } => {
            let record = find_by_prefix(app.gateway.load_history(), &id, |r| r.id)?;
            service.remove(record.id)?;
            println!("removed {}", record.id);
        }
    }
    Ok(())
}
