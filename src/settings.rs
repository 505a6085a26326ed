use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{read_json, write_json, StoreError};

/// Interpreter configuration stored in the config directory.
///
/// Every field has a default so partial files from older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterSettings {
    pub version: u32,
    /// Character that starts every command token, e.g. `/model`.
    pub command_prefix: char,
    /// Character that joins commands into a chain, e.g. `/a & /b`.
    pub chain_separator: char,
    /// Scheduler cadence in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum similarity (exclusive) for a fuzzy match to be accepted.
    pub fuzzy_threshold: f64,
    /// Run the keyword pass (`((now))` etc.) over string arguments.
    pub replace_keywords: bool,
    /// Startup aliases as `"name value"` lines.
    pub aliases: Vec<String>,
    /// Palette shows command names as labels and descriptions as tooltips.
    pub alt_palette: bool,
}

const SETTINGS_VERSION: u32 = 1;

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            command_prefix: '/',
            chain_separator: '&',
            tick_interval_ms: 25,
            fuzzy_threshold: 0.6,
            replace_keywords: true,
            aliases: Vec::new(),
            alt_palette: false,
        }
    }
}

impl InterpreterSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Load settings from the config directory. Returns None if no settings file
/// exists or it cannot be parsed.
pub fn load_settings(config_dir: &Path) -> Option<InterpreterSettings> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        return None;
    }
    match read_json::<InterpreterSettings>(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("Ignoring unreadable settings at {}: {e}", path.display());
            None
        }
    }
}

/// Save settings to the config directory.
pub fn save_settings(config_dir: &Path, settings: &InterpreterSettings) -> Result<(), StoreError> {
    std::fs::create_dir_all(config_dir)?;
    write_json(&crate::paths::settings_path(config_dir), settings)
}
