use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::medication::{Medication, ScheduleEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PromptState {
    #[default]
    Idle,
    /// A due dose is on screen waiting for a decision.
    Prompting {
        medication: Medication,
        entry: ScheduleEntry,
        since: DateTime<Utc>,
    },
}

impl PromptState {
    pub fn current(&self) -> Option<(&Medication, &ScheduleEntry)> {
        match self {
            Self::Idle => None,
            Self::Prompting {
                medication, entry, ..
            } => Some((medication, entry)),
        }
    }

    pub fn is_prompting(&self) -> bool {
        matches!(self, Self::Prompting { .. })
    }
}

/// The fields a view binds to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSnapshot {
    pub visible: bool,
    pub medication: Option<Medication>,
    pub entry: Option<ScheduleEntry>,
}

impl From<&PromptState> for PromptSnapshot {
    fn from(state: &PromptState) -> Self {
        match state.current() {
            Some((medication, entry)) => Self {
                visible: true,
                medication: Some(medication.clone()),
                entry: Some(entry.clone()),
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::medication::DosageForm;

    #[test]
    fn prompting_state_survives_persistence() {
        let med = Medication::new(
            "Aspirin",
            DosageForm::Tablet,
            vec![ScheduleEntry::daily(NaiveTime::from_hms_opt(7, 0, 0).unwrap())],
        );
        let state = PromptState::Prompting {
            entry: med.schedule[0].clone(),
            medication: med,
            since: Utc::now(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""state":"prompting""#));
        assert_eq!(serde_json::from_str::<PromptState>(&json).unwrap(), state);

        let snapshot = PromptSnapshot::from(&state);
        assert!(snapshot.visible);
        assert_eq!(snapshot.medication.unwrap().name, "Aspirin");
    }
}
