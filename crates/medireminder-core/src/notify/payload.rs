use std::collections::HashMap;

use uuid::Uuid;

pub const MEDICATION_ID_KEY: &str = "medication_id";
pub const ENTRY_ID_KEY: &str = "entry_id";

/// The two tags every dose reminder carries back to the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPayload {
    pub medication_id: Uuid,
    pub entry_id: Uuid,
}

impl ReminderPayload {
    pub fn new(medication_id: Uuid, entry_id: Uuid) -> Self {
        Self {
            medication_id,
            entry_id,
        }
    }

    /// Both tags must be present and parse as UUIDs.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Option<Self> {
        let parse = |key: &str| {
            metadata
                .get(key)
                .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        };
        Some(Self {
            medication_id: parse(MEDICATION_ID_KEY)?,
            entry_id: parse(ENTRY_ID_KEY)?,
        })
    }

    pub fn to_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (MEDICATION_ID_KEY.to_string(), self.medication_id.to_string()),
            (ENTRY_ID_KEY.to_string(), self.entry_id.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_its_own_tags() {
        let payload = ReminderPayload::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(
            ReminderPayload::from_metadata(&payload.to_metadata()),
            Some(payload)
        );
    }

    #[test]
    fn missing_tag_is_rejected() {
        let mut metadata = ReminderPayload::new(Uuid::new_v4(), Uuid::new_v4()).to_metadata();
        metadata.remove(ENTRY_ID_KEY);
        assert!(ReminderPayload::from_metadata(&metadata).is_none());
        assert!(ReminderPayload::from_metadata(&HashMap::new()).is_none());
    }

    #[test]
    fn malformed_tag_is_rejected() {
        let mut metadata = ReminderPayload::new(Uuid::new_v4(), Uuid::new_v4()).to_metadata();
        metadata.insert(MEDICATION_ID_KEY.to_string(), "not-a-uuid".to_string());
        assert!(ReminderPayload::from_metadata(&metadata).is_none());
    }
}
