//! Viewer configuration loading.
//!
//! Settings come from an optional YAML file, then environment variables
//! override individual fields.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use frame_cache::ViewerConfig;

/// Load and validate the viewer configuration.
pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: ViewerConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            info!(path = %path.display(), "Loaded viewer config");
            config
        }
        None => {
            debug!("No config file given, using defaults");
            ViewerConfig::default()
        }
    };

    config.apply_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid viewer config: {}", e))?;

    Ok(config)
}
