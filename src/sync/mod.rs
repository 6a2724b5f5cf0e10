//! Sync Runner
//!
//! Drives one run against a document: classify every color and icon against the
//! ledger, regenerate or download only what changed, handle orphans, and persist
//! the ledger. Icon downloads are strictly sequential with a pacing delay between
//! them, and the queue is abandoned once consecutive failures pass a threshold.

pub mod emit;
pub mod events;

pub use events::{AssetKind, CollectingEventSink, SyncEvent, SyncEventSink, TracingEventSink};

use crate::client::DesignApi;
use crate::color::extract_colors;
use crate::document::Document;
use crate::error::{SyncError, TransportError};
use crate::icons::{extract_icons, IconFormat, IconQuery, SkippedDuplicate};
use crate::ledger::{Classification, Ledger, LedgerStorage};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Download pacing and failure limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPolicy {
    /// Delay between consecutive downloads (milliseconds)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Per-download timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// The queue is abandoned once this many downloads in a row have failed and one more fails
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: usize,
}

fn default_pacing_ms() -> u64 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_consecutive_failures() -> usize {
    3
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            timeout_secs: default_timeout_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

/// Where and how a run materializes assets
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub file_key: String,
    pub colors_file: PathBuf,
    pub icons_dir: PathBuf,
    pub icons_index_file: Option<PathBuf>,
    /// Path prefix written into the icon index for each asset
    pub icons_asset_prefix: String,
    pub container_pattern: String,
    pub format: IconFormat,
    pub scale: f32,
    pub download: DownloadPolicy,
}

/// Which phases to run and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub colors: bool,
    pub icons: bool,
    /// Treat every candidate as changed
    pub force: bool,
    /// Drop orphaned ledger entries and delete orphaned icon files
    pub clean_orphans: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            colors: true,
            icons: true,
            force: false,
            clean_orphans: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorSyncReport {
    pub total: usize,
    pub new: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: usize,
    pub orphaned: Vec<String>,
    pub removed: Vec<String>,
    pub written: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFailure {
    pub node_id: NodeId,
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IconSyncReport {
    pub candidates: usize,
    pub skipped_duplicates: Vec<SkippedDuplicate>,
    pub unresolved: Vec<NodeId>,
    pub downloaded: Vec<String>,
    pub unchanged: usize,
    pub failed: Vec<DownloadFailure>,
    /// Consecutive-failure threshold was exceeded
    pub abandoned: bool,
    /// Queued downloads never attempted because the queue was abandoned
    pub not_attempted: usize,
    pub orphaned: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub index_written: Option<PathBuf>,
}

impl IconSyncReport {
    pub fn is_partial(&self) -> bool {
        self.abandoned || !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub document_name: String,
    pub colors: Option<ColorSyncReport>,
    pub icons: Option<IconSyncReport>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn is_partial(&self) -> bool {
        self.icons.as_ref().map(|i| i.is_partial()).unwrap_or(false)
    }
}

/// Write `content` beside `path` and rename it into place.
///
/// A failed write leaves any previous file at `path` untouched.
fn write_output(path: &Path, content: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = std::fs::write(&tmp, content) {
        let _ = std::fs::remove_file(&tmp);
        return Err(SyncError::io(&tmp, e));
    }
    std::fs::rename(&tmp, path).map_err(|e| SyncError::io(path, e))
}

/// Write generated source unless the file already holds exactly `content`.
///
/// Returns whether the file was written.
fn write_generated(path: &Path, content: &str, force: bool) -> Result<bool, SyncError> {
    if !force {
        match std::fs::read(path) {
            Ok(existing) if existing == content.as_bytes() => {
                debug!(path = %path.display(), "Generated source unchanged, skipping write");
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::io(path, e)),
        }
    }
    write_output(path, content.as_bytes())?;
    Ok(true)
}

pub struct SyncRunner<'a> {
    api: &'a dyn DesignApi,
    settings: SyncSettings,
    sink: &'a dyn SyncEventSink,
}

impl<'a> SyncRunner<'a> {
    pub fn new(api: &'a dyn DesignApi, settings: SyncSettings, sink: &'a dyn SyncEventSink) -> Self {
        Self {
            api,
            settings,
            sink,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Full run: fetch the document, load the ledger, sync, persist.
    ///
    /// The ledger is persisted even when the icon phase fails or is cut short.
    #[instrument(skip_all, fields(file_key = %self.settings.file_key))]
    pub async fn run(
        &self,
        storage: Box<dyn LedgerStorage>,
        options: SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let document = self.api.fetch_document(&self.settings.file_key).await?;
        self.sink.emit(SyncEvent::DocumentFetched {
            file_key: self.settings.file_key.clone(),
            name: document.name.clone(),
        });

        let mut ledger = Ledger::load(storage, &self.settings.file_key)?;
        let result = self.sync_document(&document, &mut ledger, options).await;

        match ledger.persist() {
            Ok(()) => self.sink.emit(SyncEvent::LedgerPersisted {
                location: ledger.summary().location,
            }),
            // A sync error takes precedence over a persist error.
            Err(persist_err) if result.is_err() => {
                warn!(error = %persist_err, "Failed to persist ledger after sync error");
            }
            Err(persist_err) => return Err(persist_err.into()),
        }
        result
    }

    /// Sync an already fetched document against `ledger` without persisting it.
    pub async fn sync_document(
        &self,
        document: &Document,
        ledger: &mut Ledger,
        options: SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let start_time = Instant::now();
        let mut report = SyncReport {
            document_name: document.name.clone(),
            ..SyncReport::default()
        };

        if options.colors {
            report.colors = Some(self.sync_colors(document, ledger, options)?);
        }
        if options.icons {
            report.icons = Some(self.sync_icons(document, ledger, options).await?);
        }

        report.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            duration_ms = report.duration_ms,
            partial = report.is_partial(),
            "Sync finished"
        );
        Ok(report)
    }

    /// Classify colors and regenerate the color source when anything differs.
    pub fn sync_colors(
        &self,
        document: &Document,
        ledger: &mut Ledger,
        options: SyncOptions,
    ) -> Result<ColorSyncReport, SyncError> {
        let colors = extract_colors(document);
        let mut report = ColorSyncReport {
            total: colors.len(),
            ..ColorSyncReport::default()
        };

        let mut pending = Vec::new();
        for entry in colors.values() {
            let classification = ledger.classify_color(&entry.name, &entry.hex, &entry.original_name);
            self.sink.emit(SyncEvent::ColorClassified {
                name: entry.name.clone(),
                classification,
            });
            match classification {
                Classification::New => report.new.push(entry.name.clone()),
                Classification::Changed(_) => report.changed.push(entry.name.clone()),
                Classification::Unchanged => report.unchanged += 1,
            }
            if classification.needs_work() || options.force {
                pending.push(entry);
            }
        }

        report.orphaned = ledger.orphaned_colors(colors.keys());
        for name in &report.orphaned {
            self.sink.emit(SyncEvent::OrphanDetected {
                kind: AssetKind::Color,
                key: name.clone(),
            });
        }

        let colors_file = &self.settings.colors_file;
        let content = emit::render_colors_dart(&colors);
        if write_generated(colors_file, &content, options.force)? {
            self.sink.emit(SyncEvent::ColorsWritten {
                path: colors_file.clone(),
                count: colors.len(),
            });
            report.written = Some(colors_file.clone());
        }
        for entry in pending {
            ledger.record_color(&entry.name, &entry.hex, &entry.original_name);
        }

        if options.clean_orphans {
            for name in &report.orphaned {
                if ledger.remove_color(name).is_some() {
                    self.sink.emit(SyncEvent::OrphanRemoved {
                        kind: AssetKind::Color,
                        key: name.clone(),
                    });
                    report.removed.push(name.clone());
                }
            }
        }

        Ok(report)
    }

    /// Extract icons and download the ones the ledger reports as new or changed.
    pub async fn sync_icons(
        &self,
        document: &Document,
        ledger: &mut Ledger,
        options: SyncOptions,
    ) -> Result<IconSyncReport, SyncError> {
        let query = IconQuery::new(
            self.settings.file_key.clone(),
            &self.settings.container_pattern,
            self.settings.format,
        )
        .with_scale(self.settings.scale);
        let extraction = extract_icons(self.api, document, &query).await?;

        self.sink.emit(SyncEvent::IconsExtracted {
            candidates: extraction.candidates.len(),
            skipped_duplicates: extraction.skipped_duplicates.len(),
            unresolved: extraction.unresolved.len(),
        });
        for skipped in &extraction.skipped_duplicates {
            self.sink.emit(SyncEvent::IconSkippedDuplicate {
                node_id: skipped.node_id.clone(),
                file_name: skipped.file_name.clone(),
                kept_node_id: skipped.kept_node_id.clone(),
            });
        }

        let mut report = IconSyncReport {
            candidates: extraction.candidates.len(),
            skipped_duplicates: extraction.skipped_duplicates.clone(),
            unresolved: extraction.unresolved.clone(),
            ..IconSyncReport::default()
        };

        let icons_dir = &self.settings.icons_dir;
        let mut queue = Vec::new();
        for candidate in &extraction.candidates {
            let local_path = icons_dir.join(&candidate.file_name);
            let classification = ledger.classify_icon(
                &candidate.node_id,
                &candidate.file_name,
                &candidate.remote_locator,
                &local_path,
            );
            if classification.needs_work() || options.force {
                queue.push((candidate, local_path, classification));
            } else {
                report.unchanged += 1;
                self.sink.emit(SyncEvent::IconUnchanged {
                    node_id: candidate.node_id.clone(),
                    file_name: candidate.file_name.clone(),
                });
            }
        }

        if !queue.is_empty() {
            std::fs::create_dir_all(icons_dir).map_err(|e| SyncError::io(icons_dir, e))?;
        }

        let policy = &self.settings.download;
        let mut consecutive_failures = 0usize;
        for (index, (candidate, local_path, classification)) in queue.iter().enumerate() {
            if index > 0 && policy.pacing_ms > 0 {
                tokio::time::sleep(Duration::from_millis(policy.pacing_ms)).await;
            }

            match self.download(&candidate.remote_locator, local_path).await {
                Ok(bytes) => {
                    consecutive_failures = 0;
                    ledger.record_icon(
                        &candidate.node_id,
                        &candidate.file_name,
                        &candidate.remote_locator,
                        local_path,
                    )?;
                    self.sink.emit(SyncEvent::IconDownloaded {
                        node_id: candidate.node_id.clone(),
                        file_name: candidate.file_name.clone(),
                        bytes,
                        classification: *classification,
                    });
                    report.downloaded.push(candidate.file_name.clone());
                }
                Err(err) => {
                    consecutive_failures += 1;
                    self.sink.emit(SyncEvent::IconFailed {
                        node_id: candidate.node_id.clone(),
                        file_name: candidate.file_name.clone(),
                        error: err.to_string(),
                    });
                    report.failed.push(DownloadFailure {
                        node_id: candidate.node_id.clone(),
                        file_name: candidate.file_name.clone(),
                        error: err.to_string(),
                    });
                    if consecutive_failures > policy.max_consecutive_failures {
                        report.abandoned = true;
                        report.not_attempted = queue.len() - index - 1;
                        self.sink.emit(SyncEvent::IconQueueAbandoned {
                            consecutive_failures,
                            remaining: report.not_attempted,
                        });
                        break;
                    }
                }
            }
        }

        self.handle_icon_orphans(&extraction, ledger, options, &mut report);

        if let Some(index_file) = &self.settings.icons_index_file {
            let content =
                emit::render_icons_dart(&extraction.candidates, &self.settings.icons_asset_prefix);
            if write_generated(index_file, &content, options.force)? {
                self.sink.emit(SyncEvent::IconIndexWritten {
                    path: index_file.clone(),
                    count: extraction.candidates.len(),
                });
                report.index_written = Some(index_file.clone());
            }
        }

        Ok(report)
    }

    async fn download(&self, locator: &str, local_path: &Path) -> Result<usize, SyncError> {
        let secs = self.settings.download.timeout_secs;
        let bytes = tokio::time::timeout(Duration::from_secs(secs), self.api.fetch_bytes(locator))
            .await
            .map_err(|_| TransportError::Timeout { secs })??;
        write_output(local_path, &bytes)?;
        Ok(bytes.len())
    }

    fn handle_icon_orphans(
        &self,
        extraction: &crate::icons::IconExtraction,
        ledger: &mut Ledger,
        options: SyncOptions,
        report: &mut IconSyncReport,
    ) {
        // Unresolved nodes still exist in the document; only their render failed.
        let current_ids = extraction
            .candidates
            .iter()
            .map(|c| c.node_id.as_str())
            .chain(extraction.unresolved.iter().map(String::as_str));
        report.orphaned = ledger.orphaned_icons(current_ids);

        let live_files: HashSet<&str> = extraction
            .candidates
            .iter()
            .map(|c| c.file_name.as_str())
            .collect();

        for node_id in &report.orphaned {
            self.sink.emit(SyncEvent::OrphanDetected {
                kind: AssetKind::Icon,
                key: node_id.clone(),
            });
            if !options.clean_orphans {
                continue;
            }
            let Some(entry) = ledger.remove_icon(node_id) else {
                continue;
            };
            if !live_files.contains(entry.file_name.as_str()) {
                let path = self.settings.icons_dir.join(&entry.file_name);
                match std::fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Deleted orphaned icon file"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to delete orphaned icon file")
                    }
                }
            }
            self.sink.emit(SyncEvent::OrphanRemoved {
                kind: AssetKind::Icon,
                key: node_id.clone(),
            });
            report.removed.push(node_id.clone());
        }
    }
}
