//! Foreground loop: the desktop equivalent of keeping the app open.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Args;
use medireminder_core::{Command, FeedbackSink, MainLoop, NoFeedback, PromptSnapshot, Receipt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::app::App;
use crate::bell::TerminalBell;

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between checks for due reminders
    #[arg(long, default_value = "30")]
    tick: u64,
}

const HELP: &str = "c = taken, p = postpone, i = ignore, s = silence, q = quit";

fn show(snapshot: &PromptSnapshot) {
    match (&snapshot.medication, &snapshot.entry) {
        (Some(medication), Some(entry)) if snapshot.visible => {
            println!(
                ">>> {} ({} {}), {HELP}",
                medication.name,
                entry.time.format("%H:%M"),
                entry.recurrence.label()
            );
        }
        _ => println!("waiting for reminders ({HELP})"),
    }
}

pub async fn run(args: WatchArgs) -> Result<(), Box<dyn Error>> {
    let app = App::open()?;
    let feedback: Arc<dyn FeedbackSink> = if app.config.feedback.vibration {
        Arc::new(TerminalBell::new(app.config.ui.sound))
    } else {
        Arc::new(NoFeedback)
    };

    let (main_loop, handle, mut snapshots) = MainLoop::new(app.machine(feedback));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(main_loop.with_events(events_tx).run());
    show(&snapshots.borrow());

    let mut ticker = tokio::time::interval(Duration::from_secs(args.tick.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                for delivered in app.center.deliver_due(Local::now().naive_local()) {
                    app.dispatcher.remove_delivered(std::slice::from_ref(&delivered.request.id));
                    handle.deliver(Receipt::Presented {
                        metadata: delivered.request.metadata,
                    });
                }
            }
            line = lines.next_line() => {
                let command = match line {
                    Ok(Some(line)) => match line.trim() {
                        "c" => Command::Confirm,
                        "p" => Command::Postpone,
                        "i" => Command::Ignore,
                        "s" => Command::StopFeedback,
                        "q" => break,
                        "" => continue,
                        other => {
                            eprintln!("unknown input '{other}' ({HELP})");
                            continue;
                        }
                    },
                    Ok(None) | Err(_) => break,
                };
                handle.send(command);
            }
            Some(event) = events_rx.recv() => {
                println!("{}", serde_json::to_string(&event)?);
            }
            Ok(()) = snapshots.changed() => {
                show(&snapshots.borrow_and_update());
            }
        }
    }

    handle.shutdown();
    let machine = task.await?;
    while let Ok(event) = events_rx.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    app.save_prompt(&machine)?;
    Ok(())
}
