//! Change-Detection Ledger
//!
//! Persisted record of the last derived value per icon node and per color name.
//! Classification is read-only; the ledger only changes through the explicit
//! `record_*` / `remove_*` calls made after the caller has done the work.

pub mod hasher;
pub mod storage;

pub use hasher::{content_hash, file_content_hash};
pub use storage::{JsonFileLedgerStorage, LedgerStorage, MemoryLedgerStorage};

use crate::error::LedgerError;
use crate::types::{ContentHash, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Schema version written to and required from persisted ledgers
pub const LEDGER_SCHEMA_VERSION: &str = "1.0";

/// Last-known state of one icon artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconLedgerEntry {
    pub node_id: NodeId,
    pub file_name: String,
    pub remote_locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_content_hash: Option<ContentHash>,
    pub last_updated: DateTime<Utc>,
}

/// Last-known state of one color token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorLedgerEntry {
    pub color_name: String,
    pub hex_value: String,
    pub original_name: String,
    pub last_updated: DateTime<Utc>,
}

/// Serialized form of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub version: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub source_document_key: String,
    #[serde(default)]
    pub colors: BTreeMap<String, ColorLedgerEntry>,
    #[serde(default)]
    pub icons: BTreeMap<NodeId, IconLedgerEntry>,
}

impl LedgerRecord {
    pub fn new(source_document_key: impl Into<String>) -> Self {
        Self {
            version: LEDGER_SCHEMA_VERSION.to_string(),
            last_sync: None,
            source_document_key: source_document_key.into(),
            colors: BTreeMap::new(),
            icons: BTreeMap::new(),
        }
    }
}

/// Why a candidate needs re-processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    LocatorChanged,
    FileNameChanged,
    ArtifactMissing,
    ContentChanged,
    ValueChanged,
    OriginalNameChanged,
}

/// Classification of a candidate against the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    New,
    Changed(ChangeReason),
    Unchanged,
}

impl Classification {
    /// Whether the caller must download or regenerate
    pub fn needs_work(&self) -> bool {
        !matches!(self, Classification::Unchanged)
    }
}

/// Entry counts for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub location: String,
    pub source_document_key: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub colors: usize,
    pub icons: usize,
    pub icons_without_hash: usize,
}

impl LedgerSummary {
    pub fn from_record(record: &LedgerRecord, location: String) -> Self {
        Self {
            location,
            source_document_key: record.source_document_key.clone(),
            last_sync: record.last_sync,
            colors: record.colors.len(),
            icons: record.icons.len(),
            icons_without_hash: record
                .icons
                .values()
                .filter(|e| e.local_content_hash.is_none())
                .count(),
        }
    }
}

/// In-memory ledger for one run, bound to its storage
pub struct Ledger {
    record: LedgerRecord,
    storage: Box<dyn LedgerStorage>,
}

impl Ledger {
    /// Empty ledger for `document_key`; nothing is read from storage.
    pub fn fresh(storage: Box<dyn LedgerStorage>, document_key: &str) -> Self {
        Self {
            record: LedgerRecord::new(document_key),
            storage,
        }
    }

    /// Ledger backed by in-process storage
    pub fn in_memory(document_key: &str) -> Self {
        Self::fresh(Box::new(MemoryLedgerStorage::new()), document_key)
    }

    /// Load the persisted ledger for `document_key`.
    ///
    /// Corrupt content and ledgers recorded for another document are discarded and
    /// replaced with an empty ledger. Only storage I/O failures are returned.
    pub fn load(storage: Box<dyn LedgerStorage>, document_key: &str) -> Result<Self, LedgerError> {
        match storage.read() {
            Ok(Some(record)) if record.source_document_key == document_key => {
                debug!(
                    location = %storage.location(),
                    colors = record.colors.len(),
                    icons = record.icons.len(),
                    "Loaded ledger"
                );
                Ok(Self { record, storage })
            }
            Ok(Some(record)) => {
                info!(
                    location = %storage.location(),
                    stored_key = %record.source_document_key,
                    document_key,
                    "Ledger belongs to another document, starting fresh"
                );
                Ok(Self::fresh(storage, document_key))
            }
            Ok(None) => {
                debug!(location = %storage.location(), "No ledger found, starting fresh");
                Ok(Self::fresh(storage, document_key))
            }
            Err(LedgerError::Corrupt(reason)) => {
                warn!(
                    location = %storage.location(),
                    reason = %reason,
                    "Ledger is corrupt, starting fresh"
                );
                Ok(Self::fresh(storage, document_key))
            }
            Err(e) => Err(e),
        }
    }

    pub fn record(&self) -> &LedgerRecord {
        &self.record
    }

    pub fn icon(&self, node_id: &str) -> Option<&IconLedgerEntry> {
        self.record.icons.get(node_id)
    }

    pub fn color(&self, name: &str) -> Option<&ColorLedgerEntry> {
        self.record.colors.get(name)
    }

    /// Classify an icon candidate. Reads the local artifact, never mutates.
    pub fn classify_icon(
        &self,
        node_id: &str,
        file_name: &str,
        remote_locator: &str,
        local_path: &Path,
    ) -> Classification {
        let Some(entry) = self.record.icons.get(node_id) else {
            return Classification::New;
        };
        if entry.remote_locator != remote_locator {
            return Classification::Changed(ChangeReason::LocatorChanged);
        }
        if entry.file_name != file_name {
            return Classification::Changed(ChangeReason::FileNameChanged);
        }
        if !local_path.exists() {
            return Classification::Changed(ChangeReason::ArtifactMissing);
        }
        if let Some(stored) = &entry.local_content_hash {
            match file_content_hash(local_path) {
                Ok(Some(current)) if &current == stored => {}
                Ok(Some(_)) => return Classification::Changed(ChangeReason::ContentChanged),
                Ok(None) => return Classification::Changed(ChangeReason::ArtifactMissing),
                Err(e) => {
                    debug!(path = %local_path.display(), error = %e, "Failed to hash local artifact");
                    return Classification::Changed(ChangeReason::ContentChanged);
                }
            }
        }
        Classification::Unchanged
    }

    /// Classify a color token. Never mutates.
    pub fn classify_color(&self, name: &str, hex_value: &str, original_name: &str) -> Classification {
        match self.record.colors.get(name) {
            None => Classification::New,
            Some(entry) if entry.hex_value != hex_value => {
                Classification::Changed(ChangeReason::ValueChanged)
            }
            Some(entry) if entry.original_name != original_name => {
                Classification::Changed(ChangeReason::OriginalNameChanged)
            }
            Some(_) => Classification::Unchanged,
        }
    }

    /// Store the state of an icon after it has been materialized at `local_path`.
    ///
    /// The content hash is omitted when the artifact is absent.
    pub fn record_icon(
        &mut self,
        node_id: &str,
        file_name: &str,
        remote_locator: &str,
        local_path: &Path,
    ) -> Result<(), LedgerError> {
        let local_content_hash = file_content_hash(local_path)?;
        self.record.icons.insert(
            node_id.to_string(),
            IconLedgerEntry {
                node_id: node_id.to_string(),
                file_name: file_name.to_string(),
                remote_locator: remote_locator.to_string(),
                local_content_hash,
                last_updated: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn record_color(&mut self, name: &str, hex_value: &str, original_name: &str) {
        self.record.colors.insert(
            name.to_string(),
            ColorLedgerEntry {
                color_name: name.to_string(),
                hex_value: hex_value.to_string(),
                original_name: original_name.to_string(),
                last_updated: Utc::now(),
            },
        );
    }

    /// Ledger icon keys absent from `current_node_ids`
    pub fn orphaned_icons<I, S>(&self, current_node_ids: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let current: HashSet<String> = current_node_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        self.record
            .icons
            .keys()
            .filter(|id| !current.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Ledger color keys absent from `current_names`
    pub fn orphaned_colors<I, S>(&self, current_names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let current: HashSet<String> = current_names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();
        self.record
            .colors
            .keys()
            .filter(|name| !current.contains(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn remove_icon(&mut self, node_id: &str) -> Option<IconLedgerEntry> {
        self.record.icons.remove(node_id)
    }

    pub fn remove_color(&mut self, name: &str) -> Option<ColorLedgerEntry> {
        self.record.colors.remove(name)
    }

    /// Overwrite the persisted ledger with the in-memory state.
    pub fn persist(&mut self) -> Result<(), LedgerError> {
        self.record.last_sync = Some(Utc::now());
        self.storage.write(&self.record)?;
        info!(
            location = %self.storage.location(),
            colors = self.record.colors.len(),
            icons = self.record.icons.len(),
            "Persisted ledger"
        );
        Ok(())
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary::from_record(&self.record, self.storage.location())
    }
}
