//! Whole-collection JSON persistence.
//!
//! The medication list and the adherence history each live under one key
//! as a JSON array. Every load reads the full collection and every save
//! overwrites it; there are no partial updates, so concurrent writers are
//! last-write-wins.
//!
//! Loads never fail: a missing key or an undecodable blob yields an empty
//! collection.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::kv::KeyValueStore;
use crate::error::Result;
use crate::medication::{AdherenceRecord, Medication};

pub const MEDICATIONS_KEY: &str = "medications";
pub const HISTORY_KEY: &str = "history";

#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    // ── Medications ──────────────────────────────────────────────────

    pub fn load_medications(&self) -> Vec<Medication> {
        self.load_list(MEDICATIONS_KEY)
    }

    pub fn save_medications(&self, medications: &[Medication]) -> Result<()> {
        self.save_value(MEDICATIONS_KEY, medications)
    }

    // ── History ──────────────────────────────────────────────────────

    pub fn load_history(&self) -> Vec<AdherenceRecord> {
        self.load_list(HISTORY_KEY)
    }

    pub fn save_history(&self, records: &[AdherenceRecord]) -> Result<()> {
        self.save_value(HISTORY_KEY, records)
    }

    pub fn append_record(&self, record: AdherenceRecord) -> Result<()> {
        let mut history = self.load_history();
        history.push(record);
        self.save_history(&history)
    }

    /// Returns whether a record was removed.
    pub fn remove_record(&self, record_id: Uuid) -> Result<bool> {
        let mut history = self.load_history();
        let before = history.len();
        history.retain(|r| r.id != record_id);
        if history.len() == before {
            return Ok(false);
        }
        self.save_history(&history)?;
        Ok(true)
    }

    // ── Generic blobs ────────────────────────────────────────────────

    /// Decode a single value. Missing or malformed blobs yield `None`.
    pub fn load_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = match self.store.kv_get(key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read persisted value");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable persisted value");
                None
            }
        }
    }

    pub fn save_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.kv_set(key, &json)?;
        Ok(())
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.store.kv_remove(key)?;
        Ok(())
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.load_value(key).unwrap_or_default()
    }
}
