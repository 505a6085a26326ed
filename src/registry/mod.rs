pub mod catalog;
pub mod coerce;
pub mod usage;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::error::CommandError;

pub use coerce::{ArgKind, ArgRequirement, Argument};
use usage::{from_epoch_secs, to_epoch_secs, UsageRecord, UsageSnapshot};

/// The capability bound to a command. Must return promptly: long-running
/// work is handed off elsewhere.
pub type Action = Box<dyn Fn(Argument) + Send + Sync>;

// ── Command metadata ────────────────────────────────────────────

/// One named command: documentation, argument policy, the bound action, and
/// its last-used timestamp.
pub struct CommandSpec {
    pub name: String,
    /// One-line description. Unique across the registry.
    pub info: String,
    /// Longer notes shown under the description in help output.
    pub extra: Option<String>,
    pub requirement: ArgRequirement,
    pub kind: ArgKind,
    /// Hidden from the palette (still runnable and documented).
    pub skip_palette: bool,
    pub last_used: SystemTime,
    action: Action,
}

impl CommandSpec {
    /// A command that takes no argument.
    pub fn new<F>(name: impl Into<String>, info: impl Into<String>, action: F) -> Self
    where
        F: Fn(Argument) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            info: info.into(),
            extra: None,
            requirement: ArgRequirement::None,
            kind: ArgKind::None,
            skip_palette: false,
            last_used: UNIX_EPOCH,
            action: Box::new(action),
        }
    }

    pub fn required(mut self, kind: ArgKind) -> Self {
        self.requirement = ArgRequirement::Required;
        self.kind = kind;
        self
    }

    pub fn optional(mut self, kind: ArgKind) -> Self {
        self.requirement = ArgRequirement::Optional;
        self.kind = kind;
        self
    }

    pub fn extra(mut self, text: impl Into<String>) -> Self {
        self.extra = Some(text.into());
        self
    }

    pub fn skip_palette(mut self) -> Self {
        self.skip_palette = true;
        self
    }

    pub fn needs_argument(&self) -> bool {
        self.requirement == ArgRequirement::Required
    }

    pub(crate) fn invoke(&self, argument: Argument) {
        (self.action)(argument);
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("info", &self.info)
            .field("requirement", &self.requirement)
            .field("kind", &self.kind)
            .field("last_used", &self.last_used)
            .finish_non_exhaustive()
    }
}

// ── Registry ────────────────────────────────────────────────────

/// Name → command table. Iteration follows registration order, which is also
/// the tie-break order for fuzzy matching.
#[derive(Debug, Default)]
pub struct Registry {
    commands: IndexMap<String, CommandSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the host's declarations. Any duplicate name or
    /// description fails the whole build.
    pub fn with_commands<I>(specs: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = CommandSpec>,
    {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, spec: CommandSpec) -> Result<(), CommandError> {
        if self.commands.contains_key(&spec.name) {
            return Err(CommandError::DuplicateName { name: spec.name });
        }
        if self.commands.values().any(|c| c.info == spec.info) {
            return Err(CommandError::DuplicateInfo { info: spec.info });
        }
        self.commands.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Set `last_used` for `name`. Returns false for unknown names.
    pub fn touch(&mut self, name: &str, at: SystemTime) -> bool {
        match self.commands.get_mut(name) {
            Some(spec) => {
                spec.last_used = at;
                true
            }
            None => false,
        }
    }

    /// Commands ordered most recently used first; never-used commands keep
    /// registration order at the end.
    pub fn by_recency(&self) -> Vec<&CommandSpec> {
        let mut specs: Vec<&CommandSpec> = self.commands.values().collect();
        specs.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        specs
    }

    pub fn usage_snapshot(&self) -> UsageSnapshot {
        self.commands
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    UsageRecord {
                        date: to_epoch_secs(spec.last_used),
                    },
                )
            })
            .collect()
    }

    /// Restore timestamps from a stored snapshot. Unknown names are ignored.
    pub fn apply_usage(&mut self, snapshot: &UsageSnapshot) {
        for (name, record) in snapshot {
            if let Some(spec) = self.commands.get_mut(name) {
                spec.last_used = from_epoch_secs(record.date);
            }
        }
    }
}
