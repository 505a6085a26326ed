//! Splits raw input like `/model foo & /sleep 2 & /send` into queue items.
//!
//! A chain separator only splits when it is followed by exactly one space and
//! the start of another command (`& /word`), so arguments may contain the
//! separator character freely.

use crate::scheduler::QueueItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    prefix: char,
    separator: char,
}

impl Tokenizer {
    pub fn new(prefix: char, separator: char) -> Self {
        Self { prefix, separator }
    }

    /// True when `text` is a single line that starts with the prefix followed
    /// by a letter. Callers use this to decide whether input is a command
    /// chain at all.
    pub fn is_command_text(&self, text: &str) -> bool {
        if text.is_empty() || text.contains('\n') {
            return false;
        }
        let mut chars = text.chars();
        chars.next() == Some(self.prefix) && chars.next().is_some_and(char::is_alphabetic)
    }

    /// Tokenize a chain into ordered items. Never fails: text that is not a
    /// command chain yields an empty list.
    pub fn tokenize(&self, text: &str) -> Vec<QueueItem> {
        let text = text.trim();
        if !self.is_command_text(text) {
            return Vec::new();
        }

        self.split_chain(text)
            .into_iter()
            .filter_map(|fragment| self.parse_fragment(fragment))
            .collect()
    }

    fn split_chain<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut fragments = Vec::new();
        let mut start = 0;

        for (i, c) in text.char_indices() {
            if c != self.separator {
                continue;
            }
            let after = i + c.len_utf8();
            let rest = text.get(after..).unwrap_or_default();
            if self.starts_command(rest) {
                fragments.push(text.get(start..i).unwrap_or_default());
                start = after;
            }
        }

        fragments.push(text.get(start..).unwrap_or_default());
        fragments
    }

    /// `rest` is one space, the prefix, then a word character.
    fn starts_command(&self, rest: &str) -> bool {
        let mut chars = rest.chars();
        chars.next() == Some(' ')
            && chars.next() == Some(self.prefix)
            && chars.next().is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn parse_fragment(&self, fragment: &str) -> Option<QueueItem> {
        let mut words = fragment.split_whitespace();
        let head = words.next()?;
        let name = head.strip_prefix(self.prefix).unwrap_or(head);
        if name.is_empty() {
            return None;
        }
        let argument = words.collect::<Vec<_>>().join(" ");
        Some(QueueItem::new(name, argument))
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new('/', '&')
    }
}
