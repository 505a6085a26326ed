//! User-defined shorthands that expand to a command chain.
//!
//! The table is written to disk after every change and reloaded at startup.
//! Storage problems are logged and never stop the interpreter.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::CommandError;
use crate::store::{read_json, write_json};

/// Split `"name value..."` at the first whitespace run. Both halves must be
/// non-empty.
pub fn split_name_value(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.trim().split_once(char::is_whitespace)?;
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}

fn valid_entry(name: &str, expansion: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace) && !expansion.trim().is_empty()
}

#[derive(Debug, Default)]
pub struct AliasTable {
    entries: IndexMap<String, String>,
    path: Option<PathBuf>,
}

impl AliasTable {
    /// A table that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the table stored at `path`. Entries that are not a
    /// `name → non-empty string` pair are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            entries,
            path: Some(path),
        }
    }

    /// Add startup aliases given as `"name value"` lines without persisting
    /// them. Existing entries win.
    pub fn seed<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for line in lines {
            match split_name_value(line) {
                Some((name, value)) => {
                    if !self.entries.contains_key(name) {
                        self.entries.insert(name.to_string(), value.to_string());
                    }
                }
                None => tracing::debug!("Skipping malformed startup alias: {line:?}"),
            }
        }
    }

    /// Drop entries for which `shadows` is true, returning their names. Only
    /// the in-memory table changes; the file catches up on the next save.
    pub fn remove_where<F>(&mut self, shadows: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let removed: Vec<String> = self
            .names()
            .filter(|name| shadows(name))
            .map(str::to_string)
            .collect();
        for name in &removed {
            self.entries.shift_remove(name);
        }
        removed
    }

    pub fn set(&mut self, name: &str, expansion: &str) -> Result<(), CommandError> {
        if !valid_entry(name, expansion) {
            return Err(CommandError::InvalidAlias {
                message: "Format: [name] [value]".to_string(),
            });
        }
        self.entries
            .insert(name.to_string(), expansion.trim().to_string());
        self.persist();
        Ok(())
    }

    pub fn unset(&mut self, name: &str) -> Result<(), CommandError> {
        if self.entries.shift_remove(name).is_none() {
            return Err(CommandError::NotFound {
                what: format!("Alias {name}"),
            });
        }
        self.persist();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_json(path, &self.entries) {
            tracing::warn!("Failed to save aliases to {}: {e}", path.display());
        }
    }
}

fn load_entries(path: &Path) -> IndexMap<String, String> {
    if !path.is_file() {
        return IndexMap::new();
    }
    let raw: IndexMap<String, Value> = match read_json(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Ignoring unreadable alias file {}: {e}", path.display());
            return IndexMap::new();
        }
    };
    raw.into_iter()
        .filter_map(|(name, value)| {
            let expansion = value.as_str()?.trim().to_string();
            valid_entry(&name, &expansion).then_some((name, expansion))
        })
        .collect()
}
