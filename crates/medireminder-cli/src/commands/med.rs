use std::error::Error;

use chrono::NaiveTime;
use clap::Subcommand;
use medireminder_core::{
    DosageForm, Medication, MedicationDraft, Recurrence, ScheduleEntry, ValidationError,
};

use crate::app::{print_events, App};

#[derive(Subcommand)]
pub enum MedAction {
    /// Add a medication
    Add {
        /// Medication name
        name: String,
        /// Dosage form (tablet, capsule, liquid, inhaler, ...)
        #[arg(long, default_value = "tablet")]
        form: String,
        /// Dosing time, repeatable: "08:00", "08:00@daily", "08:00@weekdays:2,4",
        /// "20:00@every:3", "09:00@cycle:21/7", "12:00@adhoc"
        #[arg(long = "schedule", short = 's', required = true)]
        schedule: Vec<String>,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
        /// Custom reminder title
        #[arg(long)]
        title: Option<String>,
    },
    /// List medications
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one medication as JSON
    Show {
        /// Medication id or id prefix
        id: String,
    },
    /// Edit a medication
    Edit {
        /// Medication id or id prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        form: Option<String>,
        /// Replaces the whole schedule when given
        #[arg(long = "schedule", short = 's')]
        schedule: Vec<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete a medication and cancel its reminders
    Delete {
        /// Medication id or id prefix
        id: String,
    },
    /// Stop reminders for a medication
    Pause {
        /// Medication id or id prefix
        id: String,
    },
    /// Re-enable reminders for a medication
    Resume {
        /// Medication id or id prefix
        id: String,
    },
}

/// Parse `HH:MM[@rule]` into a dosing time and recurrence.
pub fn parse_schedule(spec: &str) -> Result<(NaiveTime, Recurrence), ValidationError> {
    let invalid = |message: String| ValidationError::InvalidValue {
        field: "schedule".into(),
        message,
    };
    let (time, rule) = spec.split_once('@').unwrap_or((spec, "daily"));
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| invalid(format!("bad time in '{spec}', expected HH:MM")))?;

    let (kind, args) = rule.trim().split_once(':').unwrap_or((rule.trim(), ""));
    let number = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|_| invalid(format!("bad number '{s}' in '{spec}'")))
    };

    let recurrence = match kind.to_ascii_lowercase().as_str() {
        "daily" => Recurrence::Daily,
        "weekdays" => Recurrence::Weekdays {
            days: args
                .split(',')
                .filter(|d| !d.trim().is_empty())
                .map(|d| {
                    d.trim()
                        .parse::<u8>()
                        .map_err(|_| invalid(format!("bad weekday '{d}' in '{spec}'")))
                })
                .collect::<Result<_, _>>()?,
        },
        "every" => Recurrence::Interval {
            every_days: number(args)?,
        },
        "cycle" => {
            let (active, rest) = args
                .split_once('/')
                .ok_or_else(|| invalid(format!("cycle needs ACTIVE/REST in '{spec}'")))?;
            Recurrence::Cycle {
                active_days: number(active)?,
                rest_days: number(rest)?,
            }
        }
        "adhoc" => Recurrence::AdHoc,
        other => return Err(invalid(format!("unknown rule '{other}' in '{spec}'"))),
    };
    Ok((time, recurrence))
}

fn add_entries(draft: &mut MedicationDraft, specs: &[String]) -> Result<(), ValidationError> {
    for spec in specs {
        let (time, recurrence) = parse_schedule(spec)?;
        draft.add_entry(time, recurrence);
    }
    Ok(())
}

fn print_medication_line(medication: &Medication) {
    let times: Vec<String> = medication.schedule.iter().map(describe_entry).collect();
    let paused = if medication.active { "" } else { " (paused)" };
    println!(
        "{}  {} [{}]{}  {}",
        &medication.id.to_string()[..8],
        medication.name,
        medication.form,
        paused,
        times.join("; ")
    );
}

fn describe_entry(entry: &ScheduleEntry) -> String {
    format!("{} {}", entry.time.format("%H:%M"), entry.recurrence.label())
}

pub fn run(action: MedAction) -> Result<(), Box<dyn Error>> {
    let app = App::open()?;
    let service = app.medications();

    match action {
        MedAction::Add {
            name,
            form,
            schedule,
            note,
            title,
        } => {
            let mut draft = MedicationDraft::new();
            draft.name = name;
            draft.form = form.parse::<DosageForm>()?;
            add_entries(&mut draft, &schedule)?;
            draft.note = note.unwrap_or_default();
            draft.notification_title = title.unwrap_or_default();

            let (medication, events) = service.add(&mut draft)?;
            println!("{}", serde_json::to_string_pretty(&medication)?);
            print_events(&events)?;
        }
        MedAction::List { json } => {
            let medications = service.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&medications)?);
            } else if medications.is_empty() {
                println!("no medications");
            } else {
                medications.iter().for_each(print_medication_line);
            }
        }
        MedAction::Show { id } => {
            let medication = app.find_medication(&id)?;
            println!("{}", serde_json::to_string_pretty(&medication)?);
        }
        MedAction::Edit {
            id,
            name,
            form,
            schedule,
            note,
            title,
        } => {
            let medication = app.find_medication(&id)?;
            let mut draft = MedicationDraft::from_medication(&medication);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(form) = form {
                draft.form = form.parse()?;
            }
            if !schedule.is_empty() {
                draft.schedule.clear();
                add_entries(&mut draft, &schedule)?;
            }
            if let Some(note) = note {
                draft.note = note;
            }
            if let Some(title) = title {
                draft.notification_title = title;
            }

            let (medication, events) = service.add(&mut draft)?;
            println!("{}", serde_json::to_string_pretty(&medication)?);
            print_events(&events)?;
        }
        MedAction::Delete { id } => {
            let medication = app.find_medication(&id)?;
            let (_, events) = service.delete(medication.id)?;
            print_events(&events)?;
            println!("deleted {}", medication.name);
        }
        MedAction::Pause { id } => {
            let medication = app.find_medication(&id)?;
            print_events(&service.set_active(medication.id, false)?)?;
        }
        MedAction::Resume { id } => {
            let medication = app.find_medication(&id)?;
            print_events(&service.set_active(medication.id, true)?)?;
        }
    }
    Ok(())
}
