//! Environment variable source: FIGMA_SYNC_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// `FIGMA_SYNC_FIGMA__FILE_KEY=abc` sets `figma.file_key`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("FIGMA_SYNC")
            .separator("__")
            .try_parsing(true),
    );
    Ok(builder)
}
