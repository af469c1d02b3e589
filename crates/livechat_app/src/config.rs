use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chat_logging::chat_info;
use livechat_core::ListenerConfig;

/// Reads listener settings from a RON file, or returns the defaults.
///
/// Missing fields fall back to their defaults.
pub fn load(path: Option<&Path>) -> Result<ListenerConfig> {
    let Some(path) = path else {
        return Ok(ListenerConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: ListenerConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    chat_info!("Loaded listener config from {:?}", path);
    Ok(config)
}
