//! Reference section scanner.
//!
//! Discovers section headers the way a strict general-purpose INI reader
//! does, independent of the `#:` state machine, so section enumeration can
//! be cross-checked against a second interpretation of the same text.

use crate::error::{Error, Origin, Result};
use regex::Regex;
use std::sync::LazyLock;

static RE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").unwrap());

/// Return section names in order of first appearance, duplicates merged.
///
/// Comment lines (`#`, `;`) and blank lines are skipped, as are indented
/// lines following an option (value continuations). Any other line before
/// the first header is a missing-section-header error.
pub fn section_names(text: &str, origin: &Origin) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut in_section = false;
    let mut in_option = false;

    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indented = raw.starts_with(char::is_whitespace);
        if indented && in_option {
            continue;
        }

        if let Some(caps) = RE_HEADER.captures(trimmed) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
            in_section = true;
            in_option = false;
            continue;
        }

        if !in_section {
            return Err(Error::MissingSectionHeader {
                origin: origin.clone(),
                line: index + 1,
            });
        }
        in_option = true;
    }

    Ok(names)
}
