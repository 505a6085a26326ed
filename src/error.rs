use std::fmt;

use serde::Serialize;

/// Structured error type for the interpreter. Callers match on the variant
/// (or the serialized `code`) to decide whether a failure is fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum CommandError {
    DuplicateName { name: String },
    DuplicateInfo { info: String },
    NotFound { what: String },
    ArgumentError { message: String },
    InvalidAlias { message: String },
    AliasShadowsCommand { name: String },
    PersistenceError { message: String },
}

impl CommandError {
    /// Configuration errors abort startup; everything else is recoverable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CommandError::DuplicateName { .. } | CommandError::DuplicateInfo { .. }
        )
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        CommandError::ArgumentError {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::DuplicateName { name } => {
                write!(f, "Duplicate command name: {name}")
            }
            CommandError::DuplicateInfo { info } => {
                write!(f, "Duplicate command description: {info}")
            }
            CommandError::NotFound { what } => write!(f, "{what} not found"),
            CommandError::ArgumentError { message } => write!(f, "Invalid argument: {message}"),
            CommandError::InvalidAlias { message } => write!(f, "{message}"),
            CommandError::AliasShadowsCommand { name } => {
                write!(f, "Alias name '{name}' is already a command")
            }
            CommandError::PersistenceError { message } => {
                write!(f, "Storage error: {message}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::PersistenceError {
            message: e.to_string(),
        }
    }
}

impl From<crate::store::StoreError> for CommandError {
    fn from(e: crate::store::StoreError) -> Self {
        CommandError::PersistenceError {
            message: e.to_string(),
        }
    }
}

/// Allow converting CommandError to String for display surfaces.
impl From<CommandError> for String {
    fn from(e: CommandError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_fatal_class() {
        assert!(CommandError::DuplicateName { name: "a".into() }.is_configuration());
        assert!(CommandError::DuplicateInfo { info: "b".into() }.is_configuration());
        assert!(!CommandError::NotFound { what: "Alias x".into() }.is_configuration());
        assert!(!CommandError::argument("bad").is_configuration());
    }

    #[test]
    fn serializes_with_code_tag() {
        let value = serde_json::to_value(CommandError::NotFound {
            what: "Alias foo".into(),
        })
        .unwrap_or_default();
        assert_eq!(value["code"], "NotFound");
        assert_eq!(value["detail"]["what"], "Alias foo");
    }
}
