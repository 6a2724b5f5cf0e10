//! Sync progress events and sinks.
//!
//! The runner never prints. Everything a user might want to see is emitted as a
//! `SyncEvent` to the sink passed in by the caller.

use crate::ledger::Classification;
use crate::types::NodeId;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Asset family an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Color,
    Icon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    DocumentFetched {
        file_key: String,
        name: String,
    },
    ColorClassified {
        name: String,
        classification: Classification,
    },
    ColorsWritten {
        path: PathBuf,
        count: usize,
    },
    IconsExtracted {
        candidates: usize,
        skipped_duplicates: usize,
        unresolved: usize,
    },
    IconSkippedDuplicate {
        node_id: NodeId,
        file_name: String,
        kept_node_id: NodeId,
    },
    IconUnchanged {
        node_id: NodeId,
        file_name: String,
    },
    IconDownloaded {
        node_id: NodeId,
        file_name: String,
        bytes: usize,
        classification: Classification,
    },
    IconFailed {
        node_id: NodeId,
        file_name: String,
        error: String,
    },
    IconQueueAbandoned {
        consecutive_failures: usize,
        remaining: usize,
    },
    IconIndexWritten {
        path: PathBuf,
        count: usize,
    },
    OrphanDetected {
        kind: AssetKind,
        key: String,
    },
    OrphanRemoved {
        kind: AssetKind,
        key: String,
    },
    LedgerPersisted {
        location: String,
    },
}

pub trait SyncEventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl SyncEventSink for TracingEventSink {
    fn emit(&self, event: SyncEvent) {
        match &event {
            SyncEvent::IconFailed {
                node_id,
                file_name,
                error,
            } => warn!(node_id = %node_id, file_name = %file_name, error = %error, "Icon download failed"),
            SyncEvent::IconQueueAbandoned {
                consecutive_failures,
                remaining,
            } => warn!(
                consecutive_failures,
                remaining, "Too many consecutive download failures, abandoning icon queue"
            ),
            SyncEvent::IconDownloaded {
                file_name, bytes, ..
            } => info!(file_name = %file_name, bytes, "Downloaded icon"),
            SyncEvent::ColorsWritten { path, count } => {
                info!(path = %path.display(), count, "Wrote colors")
            }
            SyncEvent::IconIndexWritten { path, count } => {
                info!(path = %path.display(), count, "Wrote icon index")
            }
            SyncEvent::OrphanRemoved { kind, key } => info!(?kind, key = %key, "Removed orphan"),
            other => debug!(event = ?other, "Sync event"),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&SyncEvent) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl SyncEventSink for CollectingEventSink {
    fn emit(&self, event: SyncEvent) {
        self.events.lock().push(event);
    }
}
