//! Wiring shared by every command: one database, one notification center.

use std::error::Error;
use std::sync::Arc;

use medireminder_core::{
    Config, ConfirmationMachine, CoreError, Database, Event, FeedbackSink, HistoryService,
    Medication, MedicationService, PersistenceGateway, PromptState, ReminderDispatcher,
};
use uuid::Uuid;

use crate::center::StoredCenter;

/// Persisted prompt between invocations.
const PROMPT_STATE_KEY: &str = "prompt.state";

pub struct App {
    pub config: Config,
    pub gateway: PersistenceGateway,
    pub center: Arc<StoredCenter>,
    pub dispatcher: ReminderDispatcher,
}

impl App {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);
        let gateway = PersistenceGateway::new(db.clone());
        let center = Arc::new(StoredCenter::new(db));
        let dispatcher = ReminderDispatcher::new(center.clone(), config.reminders.clone());
        dispatcher.register_categories();
        Ok(Self {
            config,
            gateway,
            center,
            dispatcher,
        })
    }

    pub fn medications(&self) -> MedicationService {
        MedicationService::new(self.gateway.clone(), self.dispatcher.clone())
    }

    pub fn history(&self) -> HistoryService {
        HistoryService::new(self.gateway.clone())
    }

    /// Build the confirmation machine with the last saved prompt restored.
    pub fn machine(&self, feedback: Arc<dyn FeedbackSink>) -> ConfirmationMachine {
        let mut machine = ConfirmationMachine::new(
            self.gateway.clone(),
            self.dispatcher.clone(),
            feedback,
            self.config.clone(),
        );
        if let Some(state) = self.gateway.load_value::<PromptState>(PROMPT_STATE_KEY) {
            machine.restore(state);
        }
        machine
    }

    pub fn save_prompt(&self, machine: &ConfirmationMachine) -> Result<(), Box<dyn Error>> {
        self.gateway.save_value(PROMPT_STATE_KEY, machine.state())?;
        Ok(())
    }

    /// Find a medication by full id or unique id prefix.
    pub fn find_medication(&self, id: &str) -> Result<Medication, Box<dyn Error>> {
        find_by_prefix(self.medications().list(), id, |m| m.id)
    }
}

/// Match a full UUID or an unambiguous prefix of one.
pub fn find_by_prefix<T>(
    items: Vec<T>,
    needle: &str,
    id_of: impl Fn(&T) -> Uuid,
) -> Result<T, Box<dyn Error>> {
    let needle = needle.trim().to_ascii_lowercase();
    let not_found = || -> Box<dyn Error> {
        Box::new(CoreError::NotFound {
            what: "id",
            id: needle.clone(),
        })
    };
    if needle.is_empty() {
        return Err(not_found());
    }

    let mut matches: Vec<T> = items
        .into_iter()
        .filter(|item| id_of(item).to_string().starts_with(&needle))
        .collect();
    match matches.len() {
        0 => Err(not_found()),
        1 => Ok(matches.remove(0)),
        n => Err(format!("id prefix '{needle}' is ambiguous ({n} matches)").into()),
    }
}

pub fn print_events(events: &[Event]) -> Result<(), Box<dyn Error>> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
