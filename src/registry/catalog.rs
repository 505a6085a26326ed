use std::path::Path;

use serde::Serialize;

use super::{ArgKind, ArgRequirement, CommandSpec, Registry};
use crate::error::CommandError;
use crate::store::atomic_write;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Generate markdown help for every command.
///
/// Without a filter the text opens with a short chaining tutorial. With a
/// filter only the sections containing it (case-insensitive) are kept.
pub fn describe_all(
    registry: &Registry,
    prefix: char,
    separator: char,
    filter: Option<&str>,
) -> String {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    let mut text = String::new();

    if filter.is_none() {
        text.push_str("# Commands\n\n");
        text.push_str("Commands can be chained:\n\n");
        text.push_str("```\n");
        text.push_str(&format!(
            "{prefix}tab 2 {separator} {prefix}sleep 0.5 {separator} {prefix}select\n"
        ));
        text.push_str("```\n\n");
        text.push_str("This will select tab 2, then wait 500ms, then select all.\n\n");
        text.push_str("Here are all the available commands:");
    }

    let needle = filter.map(str::to_lowercase);
    for spec in registry.iter() {
        let section = describe_one(spec);
        if let Some(needle) = &needle {
            if !section.to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }
        text.push_str(&section);
    }

    text.push('\n');
    text.trim_start().to_string()
}

fn describe_one(spec: &CommandSpec) -> String {
    let mut section = format!("{SECTION_SEPARATOR}### {}\n\n{}", spec.name, spec.info);
    if let Some(extra) = &spec.extra {
        section.push_str("\n\n");
        section.push_str(extra);
    }
    if spec.kind != ArgKind::None {
        let need = match spec.requirement {
            ArgRequirement::Required => "required",
            ArgRequirement::Optional | ArgRequirement::None => "optional",
        };
        section.push_str(&format!("\n\nArgument: {need} ({})", spec.kind.label()));
    }
    section
}

/// Write the full help text to `path`. The parent directory must exist.
pub fn write_command_doc(
    registry: &Registry,
    prefix: char,
    separator: char,
    path: &Path,
) -> Result<(), CommandError> {
    let parent_ok = path
        .parent()
        .is_some_and(|p| p.as_os_str().is_empty() || p.is_dir());
    if !parent_ok {
        return Err(CommandError::NotFound {
            what: format!("Directory for {}", path.display()),
        });
    }
    let text = describe_all(registry, prefix, separator, None);
    atomic_write(path, text.as_bytes())?;
    tracing::info!("Saved command documentation to {}", path.display());
    Ok(())
}

/// One row of the command palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    pub name: String,
    pub label: String,
    pub tooltip: String,
    pub needs_argument: bool,
}

/// Palette rows, most recently used first. `alt_palette` swaps label and
/// tooltip so names are shown instead of descriptions.
pub fn palette(registry: &Registry, alt_palette: bool) -> Vec<PaletteEntry> {
    registry
        .by_recency()
        .into_iter()
        .filter(|spec| !spec.skip_palette)
        .map(|spec| {
            let (label, tooltip) = if alt_palette {
                (spec.name.clone(), spec.info.clone())
            } else {
                (spec.info.clone(), spec.name.clone())
            };
            PaletteEntry {
                name: spec.name.clone(),
                label,
                tooltip,
                needs_argument: spec.needs_argument(),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    use std::time::{Duration, UNIX_EPOCH};

    fn sample() -> Registry {
        Registry::with_commands(vec![
            CommandSpec::new("tab", "Select a tab by number", |_| {}).required(ArgKind::Integer),
            CommandSpec::new("select", "Select all text", |_| {}),
            CommandSpec::new("clear", "Clear the conversation", |_| {})
                .optional(ArgKind::Force)
                .extra("Use 'force' to skip the confirmation.")
                .skip_palette(),
        ])
        .unwrap()
    }

    #[test]
    fn test_full_help_has_header_and_every_command() {
        let text = describe_all(&sample(), '/', '&', None);
        assert!(text.starts_with("# Commands"));
        assert!(text.contains("/tab 2 & /sleep 0.5 & /select"));
        assert!(text.contains("### tab\n\nSelect a tab by number\n\nArgument: required (integer)"));
        assert!(text.contains("### select\n\nSelect all text"));
        assert!(text.contains("Use 'force' to skip the confirmation."));
        assert_eq!(text.matches("---").count(), 3);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_filtered_help_keeps_matching_sections_only() {
        let text = describe_all(&sample(), '/', '&', Some("SELECT"));
        assert!(!text.contains("# Commands"));
        assert!(text.starts_with("---"));
        assert!(text.contains("### tab"));
        assert!(text.contains("### select"));
        assert!(!text.contains("### clear"));
    }

    #[test]
    fn test_palette_order_and_hidden() {
        let mut registry = sample();
        registry.touch("select", UNIX_EPOCH + Duration::from_secs(10));

        let rows = palette(&registry, false);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["select", "tab"]);
        assert_eq!(rows[0].label, "Select all text");
        assert_eq!(rows[0].tooltip, "select");
        assert!(rows[1].needs_argument);

        let alt = palette(&registry, true);
        assert_eq!(alt[0].label, "select");
    }

    #[test]
    fn test_write_command_doc() {
        let dir = std::env::temp_dir().join("chainline_test_command_doc");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("commands.md");

        write_command_doc(&sample(), '/', '&', &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, describe_all(&sample(), '/', '&', None));

        let missing = dir.join("no_such_dir").join("commands.md");
        assert!(matches!(
            write_command_doc(&sample(), '/', '&', &missing),
            Err(CommandError::NotFound { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
