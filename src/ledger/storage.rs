//! Ledger persistence
//!
//! Storage implementations read and write the whole record at once. Content that
//! does not decode or fails validation is reported as `LedgerError::Corrupt`.

use crate::error::LedgerError;
use crate::ledger::{LedgerRecord, LEDGER_SCHEMA_VERSION};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait LedgerStorage: Send + Sync {
    /// Load the persisted record, `None` if nothing has been persisted yet.
    fn read(&self) -> Result<Option<LedgerRecord>, LedgerError>;

    /// Replace the persisted record.
    fn write(&self, record: &LedgerRecord) -> Result<(), LedgerError>;

    /// Delete the persisted record. Returns whether anything was removed.
    fn clear(&self) -> Result<bool, LedgerError>;

    /// Human-readable location for logs and status output
    fn location(&self) -> String;
}

/// Decode and validate a serialized ledger.
pub fn decode_record(text: &str) -> Result<LedgerRecord, LedgerError> {
    let record: LedgerRecord =
        serde_json::from_str(text).map_err(|e| LedgerError::Corrupt(e.to_string()))?;

    if record.version != LEDGER_SCHEMA_VERSION {
        return Err(LedgerError::Corrupt(format!(
            "unsupported schema version {} (expected {})",
            record.version, LEDGER_SCHEMA_VERSION
        )));
    }
    for (key, entry) in &record.icons {
        if key != &entry.node_id {
            return Err(LedgerError::Corrupt(format!(
                "icon key {} does not match entry node id {}",
                key, entry.node_id
            )));
        }
    }
    for (key, entry) in &record.colors {
        if key != &entry.color_name {
            return Err(LedgerError::Corrupt(format!(
                "color key {} does not match entry name {}",
                key, entry.color_name
            )));
        }
    }
    Ok(record)
}

pub fn encode_record(record: &LedgerRecord) -> Result<String, LedgerError> {
    serde_json::to_string_pretty(record).map_err(|e| LedgerError::Serialize(e.to_string()))
}

/// Ledger stored as a pretty-printed JSON file
pub struct JsonFileLedgerStorage {
    path: PathBuf,
}

impl JsonFileLedgerStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStorage for JsonFileLedgerStorage {
    fn read(&self) -> Result<Option<LedgerRecord>, LedgerError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(LedgerError::Corrupt(format!("not valid UTF-8: {}", e)))
            }
            Err(e) => return Err(LedgerError::Io(e)),
        };
        decode_record(&text).map(Some)
    }

    fn write(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        let content = encode_record(record)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Write beside the target and rename so a crash never leaves half a ledger.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Wrote ledger");
        Ok(())
    }

    fn clear(&self) -> Result<bool, LedgerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LedgerError::Io(e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process storage holding the serialized ledger text
#[derive(Default)]
pub struct MemoryLedgerStorage {
    content: Mutex<Option<String>>,
}

impl MemoryLedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with raw text, valid or not.
    pub fn with_content(text: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(text.into())),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.content.lock().clone()
    }
}

impl LedgerStorage for MemoryLedgerStorage {
    fn read(&self) -> Result<Option<LedgerRecord>, LedgerError> {
        match self.content.lock().as_deref() {
            Some(text) => decode_record(text).map(Some),
            None => Ok(None),
        }
    }

    fn write(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        let text = encode_record(record)?;
        *self.content.lock() = Some(text);
        Ok(())
    }

    fn clear(&self) -> Result<bool, LedgerError> {
        Ok(self.content.lock().take().is_some())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

impl<T: LedgerStorage + ?Sized> LedgerStorage for std::sync::Arc<T> {
    fn read(&self) -> Result<Option<LedgerRecord>, LedgerError> {
        (**self).read()
    }

    fn write(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        (**self).write(record)
    }

    fn clear(&self) -> Result<bool, LedgerError> {
        (**self).clear()
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
