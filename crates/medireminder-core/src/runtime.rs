//! Main-loop ownership of the confirmation machine.
//!
//! Notification callbacks arrive on arbitrary threads. They never touch the
//! machine directly: a [`MainHandle`] enqueues a [`Command`] and the single
//! [`MainLoop`] task applies commands in arrival order, then publishes the
//! new [`PromptSnapshot`] on a watch channel for the view layer.

use chrono::NaiveDateTime;
use tokio::sync::{mpsc, watch};

use crate::confirm::{ConfirmationMachine, PromptSnapshot, PromptState};
use crate::events::Event;
use crate::medication::{Medication, ScheduleEntry};
use crate::notify::Receipt;

#[derive(Debug, Clone)]
pub enum Command {
    Receipt(Receipt),
    Prompt {
        medication: Medication,
        entry: ScheduleEntry,
    },
    Confirm,
    Postpone,
    Ignore,
    PollForeground(NaiveDateTime),
    /// The view displaying the prompt went away.
    StopFeedback,
    Restore(PromptState),
    Shutdown,
}

/// Cloneable, `Send` entry point onto the main loop.
#[derive(Debug, Clone)]
pub struct MainHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl MainHandle {
    /// Returns `false` once the loop has exited.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn deliver(&self, receipt: Receipt) -> bool {
        self.send(Command::Receipt(receipt))
    }

    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }
}

pub struct MainLoop {
    machine: ConfirmationMachine,
    rx: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<PromptSnapshot>,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl MainLoop {
    pub fn new(
        machine: ConfirmationMachine,
    ) -> (Self, MainHandle, watch::Receiver<PromptSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(machine.snapshot());
        let main_loop = Self {
            machine,
            rx,
            snapshot,
            events: None,
        };
        (main_loop, MainHandle { tx }, snapshot_rx)
    }

    /// Forward every event to `events` as well as the log.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Apply commands until `Shutdown` or every handle is dropped.
    ///
    /// Returns the machine so the caller can persist its state.
    pub async fn run(mut self) -> ConfirmationMachine {
        tracing::debug!("main loop started");
        while let Some(command) = self.rx.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            let events = self.apply(command);
            for event in events {
                tracing::debug!(?event, "event");
                if let Some(tx) = &self.events {
                    let _ = tx.send(event);
                }
            }
            self.snapshot.send_replace(self.machine.snapshot());
        }
        self.machine.stop_feedback();
        tracing::debug!("main loop stopped");
        self.machine
    }

    fn apply(&mut self, command: Command) -> Vec<Event> {
        let machine = &mut self.machine;
        match command {
            Command::Receipt(receipt) => machine.handle_receipt(receipt),
            Command::Prompt { medication, entry } => vec![machine.prompt(medication, entry)],
            Command::Confirm => machine.confirm().into_iter().collect(),
            Command::Postpone => machine.postpone().into_iter().collect(),
            Command::Ignore => machine.ignore().into_iter().collect(),
            Command::PollForeground(now) => machine.poll_foreground(now),
            Command::StopFeedback => {
                machine.stop_feedback();
                Vec::new()
            }
            Command::Restore(state) => {
                machine.restore(state);
                Vec::new()
            }
            Command::Shutdown => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveTime;

    use super::*;
    use crate::feedback::NoFeedback;
    use crate::medication::{DoseStatus, DosageForm};
    use crate::notify::{MemoryCenter, ReminderDispatcher, ReminderPayload};
    use crate::storage::{Config, MemoryStore, PersistenceGateway};

    fn setup() -> (ConfirmationMachine, PersistenceGateway, Medication) {
        let gateway = PersistenceGateway::new(Arc::new(MemoryStore::new()));
        let config = Config::default();
        let dispatcher =
            ReminderDispatcher::new(Arc::new(MemoryCenter::new()), config.reminders.clone());
        let med = Medication::new(
            "Atorvastatin",
            DosageForm::Tablet,
            vec![ScheduleEntry::daily(NaiveTime::from_hms_opt(22, 0, 0).unwrap())],
        );
        gateway.save_medications(std::slice::from_ref(&med)).unwrap();
        let machine =
            ConfirmationMachine::new(gateway.clone(), dispatcher, Arc::new(NoFeedback), config);
        (machine, gateway, med)
    }

    #[tokio::test]
    async fn callbacks_from_other_threads_hop_onto_loop() {
        let (machine, gateway, med) = setup();
        let (main_loop, handle, mut snapshots) = MainLoop::new(machine);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(main_loop.with_events(events_tx).run());

        let metadata = ReminderPayload::new(med.id, med.schedule[0].id).to_metadata();
        let callback = handle.clone();
        std::thread::spawn(move || {
            callback.deliver(Receipt::Presented { metadata });
        })
        .join()
        .unwrap();

        snapshots.changed().await.unwrap();
        assert!(snapshots.borrow().visible);
        assert!(matches!(
            events_rx.recv().await,
            Some(Event::PromptStarted { .. })
        ));

        handle.send(Command::Confirm);
        snapshots.changed().await.unwrap();
        assert!(!snapshots.borrow().visible);

        handle.shutdown();
        let machine = task.await.unwrap();
        assert!(!machine.is_prompting());
        assert!(!handle.send(Command::Confirm));

        let history = gateway.load_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, DoseStatus::Taken);
    }

    #[tokio::test]
    async fn loop_ends_when_handles_drop() {
        let (machine, _, med) = setup();
        let (main_loop, handle, _snapshots) = MainLoop::new(machine);
        handle.send(Command::Prompt {
            entry: med.schedule[0].clone(),
            medication: med,
        });
        drop(handle);
        let machine = main_loop.run().await;
        assert!(machine.is_prompting());
        assert!(!machine.is_pulsing());
    }
}
