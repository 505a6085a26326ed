//! Per-command "last used" metadata, persisted as
//! `{ "<name>": { "date": <epoch seconds> } }`.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{read_json, write_json, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: f64,
}

pub type UsageSnapshot = IndexMap<String, UsageRecord>;

pub fn to_epoch_secs(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Out-of-range or negative values read as never used.
pub fn from_epoch_secs(secs: f64) -> SystemTime {
    Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|offset| UNIX_EPOCH.checked_add(offset))
        .unwrap_or(UNIX_EPOCH)
}

/// Load the usage file. Missing or unreadable files give an empty snapshot;
/// records without a numeric `date` are skipped.
pub fn load_usage(path: &Path) -> UsageSnapshot {
    if !path.is_file() {
        return UsageSnapshot::new();
    }
    let raw: IndexMap<String, Value> = match read_json(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Ignoring unreadable usage file {}: {e}", path.display());
            return UsageSnapshot::new();
        }
    };
    raw.into_iter()
        .filter_map(|(name, value)| {
            let date = value.get("date")?.as_f64()?;
            Some((name, UsageRecord { date }))
        })
        .collect()
}

pub fn save_usage(path: &Path, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
    write_json(path, snapshot)
}
