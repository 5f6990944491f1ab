//! Snapshot export and import
//!
//! An export document is the full snapshot plus the time it was taken,
//! written as formatted JSON. Import accepts any JSON object that carries the
//! four collections (extra keys such as `exportedAt` are ignored), validates
//! it completely before touching state, writes it through the data service
//! and reloads the store.

use crate::error::{Error, Result};
use crate::roster::store::RosterStore;
use crate::roster::types::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keys every snapshot document must carry
pub const REQUIRED_KEYS: [&str; 4] = ["people", "committees", "programs", "assignments"];

/// Backup file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub exported_at: DateTime<Utc>,
}

impl ExportDocument {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            exported_at: Utc::now(),
        }
    }

    /// Capture the store's current state
    pub fn from_store(store: &RosterStore) -> Self {
        Self::new(store.snapshot().clone())
    }

    /// Suggested download name, e.g. `volunteer-backup-2026-02-01.json`
    pub fn file_name(&self) -> String {
        format!(
            "volunteer-backup-{}.json",
            self.exported_at.format("%Y-%m-%d")
        )
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Check that `value` is an object with all four collections as arrays and
/// that every entity is well formed
pub fn validate_document(value: &serde_json::Value) -> Result<Snapshot> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidSnapshot("expected a JSON object".to_string()))?;

    for key in REQUIRED_KEYS {
        match object.get(key) {
            Some(serde_json::Value::Array(_)) => {}
            Some(_) => {
                return Err(Error::InvalidSnapshot(format!("'{}' must be an array", key)))
            }
            None => return Err(Error::InvalidSnapshot(format!("missing '{}'", key))),
        }
    }

    Snapshot::deserialize(value).map_err(|e| Error::InvalidSnapshot(e.to_string()))
}

/// Parse and validate a user-supplied backup document
pub fn parse_import(text: &str) -> Result<Snapshot> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::InvalidSnapshot(format!("malformed JSON: {}", e)))?;
    validate_document(&value)
}

/// Replace all durable state with the contents of a backup document, then
/// reload the store from the data service.
///
/// Nothing is written and the store is untouched if validation fails.
pub async fn import_into(store: &mut RosterStore, text: &str) -> Result<Snapshot> {
    let snapshot = parse_import(text)?;
    let sync = store
        .sync()
        .ok_or_else(|| Error::Internal("No data service attached".to_string()))?;

    // A pending debounced save must not land after the import
    sync.flush().await;
    sync.service().replace(&snapshot).await?;

    tracing::info!(
        people = snapshot.people.len(),
        committees = snapshot.committees.len(),
        programs = snapshot.programs.len(),
        assignments = snapshot.assignments.len(),
        "Imported roster backup"
    );

    store.load().await?;
    Ok(snapshot)
}
