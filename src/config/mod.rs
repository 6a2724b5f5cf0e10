//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then `figma-sync.toml` in
//! the workspace root, then `FIGMA_SYNC__*` environment variables.

pub mod facade;
pub mod merge;
pub mod sources;

pub use facade::ConfigLoader;

use crate::client::figma::DEFAULT_API_BASE;
use crate::error::SyncError;
use crate::icons::IconFormat;
use crate::logging::LoggingConfig;
use crate::sync::{DownloadPolicy, SyncSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace config file name
pub const CONFIG_FILE_NAME: &str = "figma-sync.toml";

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV_VAR: &str = "FIGMA_TOKEN";

/// Design API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigmaConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Personal access token; falls back to `FIGMA_TOKEN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Key of the design file to sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,

    /// Timeout for API requests (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for FigmaConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            file_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl FigmaConfig {
    /// Configured token, else the `FIGMA_TOKEN` environment variable.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Output locations, relative to the workspace root unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_icons_dir")]
    pub icons_dir: PathBuf,

    #[serde(default = "default_colors_file")]
    pub colors_file: PathBuf,

    /// Icon index source file; an empty path disables it
    #[serde(default = "default_icons_index_file")]
    pub icons_index_file: PathBuf,

    #[serde(default = "default_ledger_file")]
    pub ledger_file: PathBuf,
}

fn default_icons_dir() -> PathBuf {
    PathBuf::from("assets/icons")
}

fn default_colors_file() -> PathBuf {
    PathBuf::from("lib/generated/app_colors.dart")
}

fn default_icons_index_file() -> PathBuf {
    PathBuf::from("lib/generated/app_icons.dart")
}

fn default_ledger_file() -> PathBuf {
    PathBuf::from(".figma-sync/ledger.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            icons_dir: default_icons_dir(),
            colors_file: default_colors_file(),
            icons_index_file: default_icons_index_file(),
            ledger_file: default_ledger_file(),
        }
    }
}

/// Icon discovery and rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconConfig {
    /// Case-insensitive pattern naming icon container nodes
    #[serde(default = "default_container_pattern")]
    pub container_pattern: String,

    #[serde(default)]
    pub format: IconFormat,

    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_container_pattern() -> String {
    "icons".to_string()
}

fn default_scale() -> f32 {
    1.0
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            container_pattern: default_container_pattern(),
            format: IconFormat::default(),
            scale: default_scale(),
        }
    }
}

/// Complete tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub figma: FigmaConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub icons: IconConfig,

    #[serde(default)]
    pub download: DownloadPolicy,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn resolve(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

impl SyncConfig {
    /// Check values that would make a run impossible or nonsensical.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !(0.01..=4.0).contains(&self.icons.scale) {
            return Err(SyncError::ConfigError(format!(
                "Icon scale must be between 0.01 and 4, got {}",
                self.icons.scale
            )));
        }
        if self.icons.container_pattern.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "Icon container pattern cannot be empty".to_string(),
            ));
        }
        if self.download.timeout_secs == 0 {
            return Err(SyncError::ConfigError(
                "Download timeout must be at least 1 second".to_string(),
            ));
        }
        let api_base = self.figma.api_base.trim();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(SyncError::ConfigError(format!(
                "Invalid API base URL: {}",
                self.figma.api_base
            )));
        }
        Ok(())
    }

    /// File key from the override or the config, whichever is set.
    pub fn file_key(&self, override_key: Option<&str>) -> Result<String, SyncError> {
        override_key
            .map(str::to_string)
            .or_else(|| self.figma.file_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SyncError::ConfigError(
                    "No file key configured (set figma.file_key or pass --file-key)".to_string(),
                )
            })
    }

    pub fn ledger_path(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.output.ledger_file)
    }

    /// Runner settings with every path resolved against `workspace_root`.
    pub fn settings(
        &self,
        workspace_root: &Path,
        file_key_override: Option<&str>,
    ) -> Result<SyncSettings, SyncError> {
        self.validate()?;
        let icons_index_file = if self.output.icons_index_file.as_os_str().is_empty() {
            None
        } else {
            Some(resolve(workspace_root, &self.output.icons_index_file))
        };
        Ok(SyncSettings {
            file_key: self.file_key(file_key_override)?,
            colors_file: resolve(workspace_root, &self.output.colors_file),
            icons_dir: resolve(workspace_root, &self.output.icons_dir),
            icons_index_file,
            icons_asset_prefix: self.output.icons_dir.to_string_lossy().replace('\\', "/"),
            container_pattern: self.icons.container_pattern.clone(),
            format: self.icons.format,
            scale: self.icons.scale,
            download: self.download.clone(),
        })
    }
}
