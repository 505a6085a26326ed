//! Single-command dispatch: lookup (with typo fallback), argument checks,
//! coercion, invocation, and usage bookkeeping.

use std::path::Path;
use std::time::SystemTime;

use crate::error::CommandError;
use crate::fuzzy;
use crate::keywords::KeywordExpander;
use crate::registry::coerce::coerce;
use crate::registry::usage::save_usage;
use crate::registry::Registry;

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The action ran under `name` (the fuzzy-resolved name when it differs).
    Ran { name: String },
    /// No command matched, not even approximately.
    NotFound,
    /// The command exists but its argument was missing or malformed. The
    /// action was not invoked.
    Rejected { name: String, error: CommandError },
}

impl Dispatch {
    pub fn succeeded(&self) -> bool {
        matches!(self, Dispatch::Ran { .. })
    }
}

/// Borrowed view of everything a dispatch needs.
pub struct Executor<'a> {
    pub registry: &'a mut Registry,
    pub keywords: &'a dyn KeywordExpander,
    pub fuzzy_threshold: f64,
    /// Where the usage snapshot is written. `None` keeps usage in memory.
    pub usage_path: Option<&'a Path>,
}

impl Executor<'_> {
    /// Run `name` with `argument`. Returns true only when the action ran.
    pub fn execute(&mut self, name: &str, argument: &str, record_usage: bool) -> bool {
        self.dispatch(name, argument, record_usage).succeeded()
    }

    pub fn dispatch(&mut self, name: &str, argument: &str, record_usage: bool) -> Dispatch {
        let Some(resolved) = self.resolve(name) else {
            tracing::debug!("No command matches '{name}'");
            return Dispatch::NotFound;
        };
        let Some(spec) = self.registry.get(&resolved) else {
            return Dispatch::NotFound;
        };

        if spec.needs_argument() && argument.trim().is_empty() {
            return Dispatch::Rejected {
                error: CommandError::argument(format!("'{resolved}' requires an argument")),
                name: resolved,
            };
        }

        let coerced = match coerce(spec.kind, argument, self.keywords) {
            Ok(arg) => arg,
            Err(error) => return Dispatch::Rejected { name: resolved, error },
        };

        tracing::debug!("Running '{resolved}' with {coerced:?}");
        spec.invoke(coerced);

        if record_usage {
            self.registry.touch(&resolved, SystemTime::now());
            self.persist_usage();
        }

        Dispatch::Ran { name: resolved }
    }

    /// Literal name, else the most similar registered name.
    fn resolve(&self, name: &str) -> Option<String> {
        if self.registry.contains(name) {
            return Some(name.to_string());
        }
        let similar = fuzzy::most_similar(name, self.registry.names(), self.fuzzy_threshold)?;
        tracing::debug!("Resolved '{name}' to '{similar}'");
        Some(similar.to_string())
    }

    fn persist_usage(&self) {
        let Some(path) = self.usage_path else {
            return;
        };
        if let Err(e) = save_usage(path, &self.registry.usage_snapshot()) {
            tracing::warn!("Failed to save command usage to {}: {e}", path.display());
        }
    }
}
