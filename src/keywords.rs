use std::time::{SystemTime, UNIX_EPOCH};

/// Keyword pass applied to string arguments before they reach an action.
pub trait KeywordExpander: Send + Sync {
    fn expand(&self, text: &str) -> String;
}

/// Leaves text untouched. Used when keyword replacement is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeywords;

impl KeywordExpander for NoKeywords {
    fn expand(&self, text: &str) -> String {
        text.to_string()
    }
}

/// `((now))` → current Unix time in seconds, `((prefix))` → command prefix.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinKeywords {
    pub prefix: char,
}

impl KeywordExpander for BuiltinKeywords {
    fn expand(&self, text: &str) -> String {
        if !text.contains("((") {
            return text.to_string();
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        text.replace("((now))", &now.to_string())
            .replace("((prefix))", &self.prefix.to_string())
    }
}
