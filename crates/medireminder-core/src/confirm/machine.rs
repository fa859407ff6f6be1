//! Dose confirmation state machine.
//!
//! ```text
//! Idle ──prompt/receipt/poll──▶ Prompting ──confirm|postpone|ignore──▶ Idle
//!                                   ▲   │
//!                                   └───┘ prompt again (last wins)
//! ```
//!
//! Every exit from `Prompting` drops the feedback pulse. The machine is
//! not thread-safe; the runtime owns it on a single task.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use super::state::{PromptSnapshot, PromptState};
use crate::events::{DropReason, Event};
use crate::feedback::{FeedbackSink, PulseHandle, PulseLoop};
use crate::medication::{AdherenceRecord, Medication, ScheduleEntry};
use crate::notify::{resolve, Receipt, ReminderAction, ReminderDispatcher};
use crate::storage::{Config, PersistenceGateway};

pub struct ConfirmationMachine {
    gateway: PersistenceGateway,
    dispatcher: ReminderDispatcher,
    feedback: Arc<dyn FeedbackSink>,
    config: Config,
    state: PromptState,
    pulse: Option<PulseHandle>,
}

impl ConfirmationMachine {
    pub fn new(
        gateway: PersistenceGateway,
        dispatcher: ReminderDispatcher,
        feedback: Arc<dyn FeedbackSink>,
        config: Config,
    ) -> Self {
        Self {
            gateway,
            dispatcher,
            feedback,
            config,
            state: PromptState::Idle,
            pulse: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &PromptState {
        &self.state
    }

    pub fn is_prompting(&self) -> bool {
        self.state.is_prompting()
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn snapshot(&self) -> PromptSnapshot {
        PromptSnapshot::from(&self.state)
    }

    // ── Entering Prompting ───────────────────────────────────────────

    /// Show the prompt for `entry`, replacing any prompt already showing.
    pub fn prompt(&mut self, medication: Medication, entry: ScheduleEntry) -> Event {
        let replaced = self.state.is_prompting();
        self.stop_feedback();

        let now = Utc::now();
        let event = Event::PromptStarted {
            medication_id: medication.id,
            entry_id: entry.id,
            medication_name: medication.name.clone(),
            replaced,
            at: now,
        };
        tracing::info!(medication = %medication.name, replaced, "dose prompt");

        self.state = PromptState::Prompting {
            medication,
            entry,
            since: now,
        };
        if self.config.feedback.vibration {
            self.pulse = PulseLoop::start(
                self.feedback.clone(),
                self.config.feedback.pulse_interval(),
                self.config.feedback.max_pulses,
            );
        }
        event
    }

    /// Resolve a receipt to a live medication and prompt for it.
    ///
    /// A `Responded` receipt carrying Take/Postpone/Ignore is applied right
    /// away; `Open` leaves the prompt showing.
    pub fn handle_receipt(&mut self, receipt: Receipt) -> Vec<Event> {
        let Some(payload) = receipt.payload() else {
            return vec![dropped(DropReason::MalformedPayload)];
        };
        let (medication, entry) = match resolve(&self.gateway, &payload) {
            Ok(found) => found,
            Err(reason) => return vec![dropped(reason)],
        };

        let mut events = vec![self.prompt(medication, entry)];
        let decision = match receipt.action() {
            Some(ReminderAction::Take) => self.confirm(),
            Some(ReminderAction::Postpone) => self.postpone(),
            Some(ReminderAction::Ignore) => self.ignore(),
            Some(ReminderAction::Open) | None => None,
        };
        events.extend(decision);
        events
    }

    /// Pick up a reminder that fired while the app was not listening.
    ///
    /// Prefers the most recently delivered reminder (removing it from the
    /// delivered list); otherwise the last pending one-shot already due,
    /// which is retired so later polls do not prompt for it again.
    pub fn poll_foreground(&mut self, now: NaiveDateTime) -> Vec<Event> {
        if let Some(last) = self.dispatcher.delivered().pop() {
            self.dispatcher
                .remove_delivered(std::slice::from_ref(&last.request.id));
            return self.handle_receipt(Receipt::Presented {
                metadata: last.request.metadata,
            });
        }

        let due = self
            .dispatcher
            .pending()
            .into_iter()
            .filter(|r| r.trigger.fixed_date().is_some_and(|at| at <= now))
            .last();
        let Some(request) = due else {
            return Vec::new();
        };
        self.dispatcher
            .retire_fired(std::slice::from_ref(&request.id));
        self.handle_receipt(Receipt::Presented {
            metadata: request.metadata,
        })
    }

    // ── Decisions ────────────────────────────────────────────────────

    pub fn confirm(&mut self) -> Option<Event> {
        let (medication, entry) = self.finish("confirm")?;
        let record = AdherenceRecord::taken(&medication, &entry, Utc::now());
        let event = Event::DoseTaken {
            record_id: record.id,
            medication_id: medication.id,
            entry_id: entry.id,
            at: record.taken_at.unwrap_or_else(Utc::now),
        };
        self.append(record);
        tracing::info!(medication = %medication.name, "dose taken");
        Some(event)
    }

    /// Record a pending dose and re-alert after the postpone delay.
    pub fn postpone(&mut self) -> Option<Event> {
        let (medication, entry) = self.finish("postpone")?;
        let now = Utc::now();
        let record = AdherenceRecord::postponed(&medication, &entry, now);
        let reminder = self.dispatcher.schedule_postpone(
            &medication,
            &entry,
            self.config.reminders.postpone_delay(),
            local(now),
        );
        let event = Event::DosePostponed {
            record_id: record.id,
            medication_id: medication.id,
            entry_id: entry.id,
            reminder_id: reminder.id,
            remind_at: reminder.remind_at,
            at: now,
        };
        self.append(record);
        tracing::info!(medication = %medication.name, remind_at = %reminder.remind_at, "dose postponed");
        Some(event)
    }

    pub fn ignore(&mut self) -> Option<Event> {
        let (medication, entry) = self.finish("ignore")?;
        let record = AdherenceRecord::ignored(&medication, &entry, Utc::now());
        let event = Event::DoseIgnored {
            record_id: record.id,
            medication_id: medication.id,
            entry_id: entry.id,
            at: Utc::now(),
        };
        self.append(record);
        tracing::info!(medication = %medication.name, "dose ignored");
        Some(event)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop the pulse without leaving `Prompting`, e.g. when the view goes away.
    pub fn stop_feedback(&mut self) {
        if let Some(pulse) = self.pulse.take() {
            pulse.stop();
        }
    }

    /// Rehydrate a persisted prompt. Feedback is not restarted.
    pub fn restore(&mut self, state: PromptState) {
        self.stop_feedback();
        self.state = state;
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Leave `Prompting`, handing back what was on screen.
    fn finish(&mut self, decision: &str) -> Option<(Medication, ScheduleEntry)> {
        match std::mem::take(&mut self.state) {
            PromptState::Prompting {
                medication, entry, ..
            } => {
                self.stop_feedback();
                Some((medication, entry))
            }
            PromptState::Idle => {
                tracing::debug!(decision, "no dose prompt showing, ignoring");
                None
            }
        }
    }

    fn append(&self, record: AdherenceRecord) {
        if let Err(e) = self.gateway.append_record(record) {
            tracing::warn!(error = %e, "failed to persist adherence record");
        }
    }
}

fn dropped(reason: DropReason) -> Event {
    tracing::warn!(?reason, "notification receipt dropped");
    Event::ReceiptDropped {
        reason,
        at: Utc::now(),
    }
}

fn local(at: DateTime<Utc>) -> NaiveDateTime {
    at.with_timezone(&Local).naive_local()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration as StdDuration;

    use chrono::{Duration, NaiveTime};
    use uuid::Uuid;

    use super::*;
    use crate::feedback::NoFeedback;
    use crate::medication::{DoseStatus, DosageForm};
    use crate::notify::{MemoryCenter, NotificationCenter, ReminderPayload};
    use crate::planner::Trigger;
    use crate::storage::MemoryStore;

    struct Fixture {
        machine: ConfirmationMachine,
        gateway: PersistenceGateway,
        center: Arc<MemoryCenter>,
        med: Medication,
    }

    fn fixture_with(feedback: Arc<dyn FeedbackSink>) -> Fixture {
        let gateway = PersistenceGateway::new(Arc::new(MemoryStore::new()));
        let center = Arc::new(MemoryCenter::new());
        let config = Config::default();
        let dispatcher = ReminderDispatcher::new(center.clone(), config.reminders.clone());
        let med = Medication::new(
            "Amoxicillin",
            DosageForm::Capsule,
            vec![
                ScheduleEntry::daily(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
                ScheduleEntry::daily(NaiveTime::from_hms_opt(20, 0, 0).unwrap()),
            ],
        );
        gateway.save_medications(std::slice::from_ref(&med)).unwrap();
        let machine = ConfirmationMachine::new(gateway.clone(), dispatcher, feedback, config);
        Fixture {
            machine,
            gateway,
            center,
            med,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(NoFeedback))
    }

    fn presented(payload: ReminderPayload) -> Receipt {
        Receipt::Presented {
            metadata: payload.to_metadata(),
        }
    }

    #[test]
    fn receipt_then_confirm_records_taken() {
        let mut f = fixture();
        let entry = f.med.schedule[0].clone();

        let events = f
            .machine
            .handle_receipt(presented(ReminderPayload::new(f.med.id, entry.id)));
        assert!(matches!(events[..], [Event::PromptStarted { replaced: false, .. }]));
        assert_eq!(f.machine.state().current(), Some((&f.med, &entry)));

        let event = f.machine.confirm().unwrap();
        assert!(matches!(event, Event::DoseTaken { .. }));

        let history = f.gateway.load_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, DoseStatus::Taken);
        assert!(history[0].taken_at.is_some());
        assert_eq!(history[0].entry_id, Some(entry.id));
        assert_eq!(*f.machine.state(), PromptState::Idle);
        assert_eq!(f.machine.snapshot(), PromptSnapshot::default());
    }

    #[test]
    fn postpone_registers_one_tagged_one_shot() {
        let mut f = fixture();
        let entry = f.med.schedule[1].clone();
        f.machine.prompt(f.med.clone(), entry.clone());

        let before = Local::now().naive_local();
        let event = f.machine.postpone().unwrap();
        let after = Local::now().naive_local();

        let history = f.gateway.load_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, DoseStatus::Pending);
        assert!(history[0].postponed);
        assert!(history[0].taken_at.is_none());

        let added = f.center.added();
        assert_eq!(added.len(), 1);
        let Trigger::Once { at } = added[0].trigger else {
            panic!("postponed reminder must be one-shot");
        };
        assert!(at >= before + Duration::minutes(5));
        assert!(at <= after + Duration::minutes(5));
        assert!(at > after);
        assert_eq!(
            ReminderPayload::from_metadata(&added[0].metadata),
            Some(ReminderPayload::new(f.med.id, entry.id))
        );
        match event {
            Event::DosePostponed {
                reminder_id,
                remind_at,
                ..
            } => {
                assert_eq!(reminder_id, added[0].id);
                assert_eq!(remind_at, at);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!f.machine.is_prompting());
    }

    #[test]
    fn ignore_records_ignored() {
        let mut f = fixture();
        f.machine.prompt(f.med.clone(), f.med.schedule[0].clone());
        assert!(matches!(f.machine.ignore(), Some(Event::DoseIgnored { .. })));
        let history = f.gateway.load_history();
        assert_eq!(history[0].status, DoseStatus::Ignored);
        assert!(history[0].taken_at.is_none());
        assert!(!history[0].postponed);
    }

    #[test]
    fn decisions_while_idle_are_noops() {
        let mut f = fixture();
        assert!(f.machine.confirm().is_none());
        assert!(f.machine.postpone().is_none());
        assert!(f.machine.ignore().is_none());
        assert!(f.gateway.load_history().is_empty());
        assert!(f.center.added().is_empty());
        assert_eq!(*f.machine.state(), PromptState::Idle);
    }

    #[test]
    fn second_prompt_replaces_first() {
        let mut f = fixture();
        f.machine.prompt(f.med.clone(), f.med.schedule[0].clone());
        let event = f.machine.prompt(f.med.clone(), f.med.schedule[1].clone());
        assert!(matches!(event, Event::PromptStarted { replaced: true, .. }));
        assert_eq!(
            f.machine.snapshot().entry.map(|e| e.id),
            Some(f.med.schedule[1].id)
        );
    }

    #[test]
    fn responded_receipt_applies_action() {
        let mut f = fixture();
        let entry = &f.med.schedule[0];
        let events = f.machine.handle_receipt(Receipt::Responded {
            metadata: ReminderPayload::new(f.med.id, entry.id).to_metadata(),
            action: ReminderAction::Take,
        });
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::DoseTaken { .. }));
        assert!(!f.machine.is_prompting());

        let events = f.machine.handle_receipt(Receipt::Responded {
            metadata: ReminderPayload::new(f.med.id, entry.id).to_metadata(),
            action: ReminderAction::Open,
        });
        assert_eq!(events.len(), 1);
        assert!(f.machine.is_prompting());
    }

    #[test]
    fn unresolvable_receipts_are_dropped() {
        let mut f = fixture();
        let cases = [
            (Receipt::Presented { metadata: Default::default() }, DropReason::MalformedPayload),
            (presented(ReminderPayload::new(Uuid::new_v4(), f.med.schedule[0].id)), DropReason::MedicationMissing),
            (presented(ReminderPayload::new(f.med.id, Uuid::new_v4())), DropReason::EntryMissing),
        ];
        for (receipt, expected) in cases {
            let events = f.machine.handle_receipt(receipt);
            assert!(
                matches!(events[..], [Event::ReceiptDropped { reason, .. }] if reason == expected)
            );
            assert!(!f.machine.is_prompting());
        }
    }

    #[test]
    fn poll_prefers_latest_delivered() {
        let mut f = fixture();
        let now = Local::now().naive_local();
        let dispatcher = ReminderDispatcher::new(f.center.clone(), Default::default());
        dispatcher.schedule_medication(&f.med, now);
        f.center.deliver(&f.med.schedule[0].reminder_id(), now);
        f.center.deliver(&f.med.schedule[1].reminder_id(), now);

        let events = f.machine.poll_foreground(now);
        assert!(matches!(events[..], [Event::PromptStarted { .. }]));
        assert_eq!(
            f.machine.snapshot().entry.map(|e| e.id),
            Some(f.med.schedule[1].id)
        );
        assert_eq!(f.center.delivered().len(), 1);
    }

    #[test]
    fn poll_falls_back_to_due_pending_one_shot() {
        let mut f = fixture();
        let now = Local::now().naive_local();
        let dispatcher = ReminderDispatcher::new(f.center.clone(), Default::default());
        let entry = f.med.schedule[0].clone();
        dispatcher.schedule_postpone(&f.med, &entry, Duration::minutes(5), now);

        assert!(f.machine.poll_foreground(now).is_empty());
        let events = f.machine.poll_foreground(now + Duration::minutes(6));
        assert_eq!(events.len(), 1);
        assert!(f.machine.is_prompting());
    }

    #[test]
    fn postponed_dose_prompts_once() {
        let mut f = fixture();
        f.machine.config.reminders.postpone_delay_min = 0;
        f.machine.prompt(f.med.clone(), f.med.schedule[0].clone());
        f.machine.postpone();
        let later = Local::now().naive_local() + Duration::minutes(1);

        let mut prompts = 0;
        for _ in 0..3 {
            let events = f.machine.poll_foreground(later);
            prompts += events
                .iter()
                .filter(|e| matches!(e, Event::PromptStarted { .. }))
                .count();
            f.machine.confirm();
        }
        assert_eq!(prompts, 1);
        assert!(f.center.pending().is_empty());

        let history = f.gateway.load_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, DoseStatus::Taken);
    }

    #[test]
    fn restore_rehydrates_prompt() {
        let mut f = fixture();
        f.machine.prompt(f.med.clone(), f.med.schedule[0].clone());
        let saved = f.machine.state().clone();

        let mut other = fixture().machine;
        other.restore(saved.clone());
        assert_eq!(*other.state(), saved);
        assert!(!other.is_pulsing());
    }

    #[derive(Default)]
    struct Counter(AtomicU32);

    impl FeedbackSink for Counter {
        fn pulse(&self, _n: u32) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn decision_stops_feedback() {
        let counter = Arc::new(Counter::default());
        let mut f = fixture_with(counter.clone());
        f.machine.prompt(f.med.clone(), f.med.schedule[0].clone());
        tokio::time::sleep(StdDuration::from_secs(3)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(f.machine.is_pulsing());

        f.machine.confirm();
        tokio::time::sleep(StdDuration::from_secs(30)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(!f.machine.is_pulsing());
    }

    #[tokio::test(start_paused = true)]
    async fn vibration_off_disables_pulse() {
        let counter = Arc::new(Counter::default());
        let mut f = fixture_with(counter.clone());
        f.machine.config.feedback.vibration = false;
        f.machine.prompt(f.med.clone(), f.med.schedule[0].clone());
        tokio::time::sleep(StdDuration::from_secs(5)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
