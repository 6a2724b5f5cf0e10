//! CLI Tooling
//!
//! Command-line interface for sync, status and reset. All commands are
//! workspace-scoped: output paths and the ledger resolve against `--workspace`.

use crate::client::FigmaClient;
use crate::config::{ConfigLoader, SyncConfig};
use crate::error::{LedgerError, SyncError};
use crate::ledger::{JsonFileLedgerStorage, LedgerStorage, LedgerSummary};
use crate::logging::LoggingConfig;
use crate::sync::{SyncOptions, SyncRunner, TracingEventSink};
use crate::tooling::format::{format_ledger_status_text, format_sync_report_text, LedgerStatus};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// figma-sync - Incremental design asset sync
#[derive(Parser)]
#[command(name = "figma-sync")]
#[command(about = "Extract colors and icons from a design document and keep local assets in sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply logging flags on top of the configured logging section.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the document and bring colors and icons up to date
    Sync {
        /// Only sync colors
        #[arg(long, conflicts_with = "icons_only")]
        colors_only: bool,

        /// Only sync icons
        #[arg(long)]
        icons_only: bool,

        /// Regenerate and re-download everything regardless of the ledger
        #[arg(long)]
        force: bool,

        /// Remove orphaned ledger entries and their icon files
        #[arg(long)]
        clean_orphans: bool,

        /// Document key (overrides figma.file_key)
        #[arg(long)]
        file_key: Option<String>,
    },
    /// Show what the ledger currently records
    Status {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete the ledger so the next sync starts fresh
    Reset,
}

impl Commands {
    fn sync_options(colors_only: bool, icons_only: bool, force: bool, clean_orphans: bool) -> SyncOptions {
        SyncOptions {
            colors: !icons_only,
            icons: !colors_only,
            force,
            clean_orphans,
        }
    }
}

/// CLI context holding the workspace root and its loaded configuration
pub struct CliContext {
    workspace_root: PathBuf,
    config: SyncConfig,
}

impl CliContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SyncError> {
        let config = if let Some(path) = config_path {
            ConfigLoader::load_from_file(&path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    /// Context with an explicit configuration, bypassing file and env loading.
    pub fn with_config(workspace_root: PathBuf, config: SyncConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn ledger_storage(&self) -> JsonFileLedgerStorage {
        JsonFileLedgerStorage::new(self.config.ledger_path(&self.workspace_root))
    }

    /// Execute a CLI command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        match command {
            Commands::Sync {
                colors_only,
                icons_only,
                force,
                clean_orphans,
                file_key,
            } => {
                let options =
                    Commands::sync_options(*colors_only, *icons_only, *force, *clean_orphans);
                self.handle_sync(options, file_key.as_deref())
            }
            Commands::Status { format } => self.handle_status(format),
            Commands::Reset => self.handle_reset(),
        }
    }

    fn handle_sync(&self, options: SyncOptions, file_key: Option<&str>) -> Result<String, SyncError> {
        let settings = self.config.settings(&self.workspace_root, file_key)?;
        let token = self.config.figma.resolve_token().ok_or_else(|| {
            SyncError::ConfigError(
                "No API token configured (set figma.token or FIGMA_TOKEN)".to_string(),
            )
        })?;
        let client = FigmaClient::new(
            self.config.figma.api_base.clone(),
            token,
            Duration::from_secs(self.config.figma.request_timeout_secs),
        )?;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SyncError::ConfigError(format!("Failed to create async runtime: {}", e)))?;

        let sink = TracingEventSink;
        let runner = SyncRunner::new(&client, settings, &sink);
        let storage = Box::new(self.ledger_storage());
        info!(file_key = %runner.settings().file_key, "Starting sync");
        let report = rt.block_on(runner.run(storage, options))?;
        Ok(format_sync_report_text(&report))
    }

    fn handle_status(&self, format: &str) -> Result<String, SyncError> {
        let storage = self.ledger_storage();
        let location = storage.location();
        let status = match storage.read() {
            Ok(Some(record)) => LedgerStatus {
                ledger_path: location.clone(),
                exists: true,
                message: None,
                summary: Some(LedgerSummary::from_record(&record, location)),
            },
            Ok(None) => LedgerStatus {
                ledger_path: location,
                exists: false,
                message: Some("No ledger yet; run `figma-sync sync`.".to_string()),
                summary: None,
            },
            Err(LedgerError::Corrupt(reason)) => LedgerStatus {
                ledger_path: location,
                exists: true,
                message: Some(format!(
                    "Ledger is unreadable ({}); the next sync will start fresh.",
                    reason
                )),
                summary: None,
            },
            Err(e) => return Err(e.into()),
        };

        match format {
            "json" => serde_json::to_string_pretty(&status)
                .map_err(|e| SyncError::ConfigError(format!("Failed to serialize status: {}", e))),
            "text" => Ok(format_ledger_status_text(&status)),
            other => Err(SyncError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }

    fn handle_reset(&self) -> Result<String, SyncError> {
        let storage = self.ledger_storage();
        if storage.clear()? {
            info!(location = %storage.location(), "Ledger removed");
            Ok(format!("Removed ledger at {}", storage.location()))
        } else {
            Ok(format!("No ledger at {}", storage.location()))
        }
    }
}
