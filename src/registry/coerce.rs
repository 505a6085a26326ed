//! Argument-type policies and the coercion each one applies.
//!
//! Every command declares one [`ArgKind`]; the raw argument text is turned
//! into the matching [`Argument`] variant before the action runs. A failed
//! coercion means the action is never invoked.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::keywords::KeywordExpander;

/// Whether a command needs an argument at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgRequirement {
    #[default]
    None,
    Optional,
    Required,
}

/// How the raw argument text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    #[default]
    None,
    Text,
    Integer,
    Float,
    /// `true` only for the literal word "force" (any case).
    Force,
}

impl ArgKind {
    pub fn label(self) -> &'static str {
        match self {
            ArgKind::None => "none",
            ArgKind::Text => "text",
            ArgKind::Integer => "integer",
            ArgKind::Float => "number",
            ArgKind::Force => "force",
        }
    }
}

/// A coerced argument as handed to an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    None,
    Text(String),
    Integer(i64),
    Float(f64),
    Force(bool),
}

impl Argument {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Argument::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Argument::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Argument::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// For `Force` commands; every other variant reads as not forced.
    pub fn is_forced(&self) -> bool {
        matches!(self, Argument::Force(true))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Argument::None)
    }
}

/// Coerce raw argument text per `kind`. Empty text yields `Argument::None`
/// for every kind except `Force`, which yields `Force(false)`.
pub fn coerce(
    kind: ArgKind,
    raw: &str,
    keywords: &dyn KeywordExpander,
) -> Result<Argument, CommandError> {
    let raw = raw.trim();
    match kind {
        ArgKind::None => Ok(Argument::None),
        ArgKind::Force => Ok(Argument::Force(raw.to_lowercase() == "force")),
        _ if raw.is_empty() => Ok(Argument::None),
        ArgKind::Text => Ok(Argument::Text(keywords.expand(raw))),
        ArgKind::Integer => raw
            .parse::<i64>()
            .map(Argument::Integer)
            .map_err(|_| CommandError::argument(format!("'{raw}' is not an integer"))),
        ArgKind::Float => {
            let value = raw
                .parse::<f64>()
                .map_err(|_| CommandError::argument(format!("'{raw}' is not a number")))?;
            if value.is_finite() {
                Ok(Argument::Float(value))
            } else {
                Err(CommandError::argument(format!("'{raw}' must be finite")))
            }
        }
    }
}
