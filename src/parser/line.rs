//! `#:`-annotated INI parser: line-by-line state machine.
//!
//! Every physical line moves the accumulator between three states. A
//! complete state holds a full option and is emitted as a [`DocItem`] when a
//! later line (or end of input) concludes it.

use crate::model::{DocItem, UNDOCUMENTED};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

// word chars + opt whitespace + '=' or ':' + opt whitespace + opt value
static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s*[=:]\s*(.*)").unwrap());

/// Escapes authors may embed in `#:` comments.
const DESC_TOKENS: &[(&str, &str)] = &[("{n}", "\n"), ("{t}", "    ")];

/// Minimum indentation marking a value-continuation line.
const CONTINUATION_INDENT: &str = "   ";

/// Accumulator for the item currently being parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseState {
    /// No section header seen yet; nothing here can be emitted.
    #[default]
    Unscoped,
    /// Inside a section, description (possibly placeholder) but no option.
    Partial { subthing: String, desc: String },
    /// A full option, waiting for the line that concludes it.
    Complete {
        subthing: String,
        option: String,
        desc: String,
        value: String,
    },
}

impl ParseState {
    /// Fresh, incomplete state scoped to `subthing`.
    pub fn section(subthing: impl Into<String>) -> Self {
        ParseState::Partial {
            subthing: subthing.into(),
            desc: UNDOCUMENTED.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ParseState::Complete { .. })
    }

    /// Item a complete state stands for.
    pub fn item(&self) -> Option<DocItem> {
        match self {
            ParseState::Complete {
                subthing,
                option,
                desc,
                value,
            } => Some(DocItem::new(
                subthing.clone(),
                option.clone(),
                desc.clone(),
                value.clone(),
            )),
            _ => None,
        }
    }

    /// Consume one line, returning the next state and any item the line
    /// concluded.
    pub fn step(self, line: &str) -> (ParseState, Option<DocItem>) {
        let line = line.trim_end();

        if line.starts_with('[') && line.ends_with(']') {
            let name = &line[1..line.len() - 1];
            trace!(section = name, "section header");
            let emitted = self.item();
            return (ParseState::section(name), emitted);
        }

        if let Some(text) = line.strip_prefix("#:") {
            return self.doc_comment(text.trim());
        }

        if let Some(caps) = RE_OPTION.captures(line) {
            let option = caps[1].to_string();
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
            return self.option(option, value);
        }

        self.non_option(line)
    }

    /// Flush a state that is still complete at end of input.
    pub fn finish(self) -> Option<DocItem> {
        self.item()
    }

    fn doc_comment(self, text: &str) -> (ParseState, Option<DocItem>) {
        let (subthing, desc, emitted) = match self {
            ParseState::Unscoped => return (ParseState::Unscoped, None),
            ParseState::Partial { subthing, desc } => (subthing, desc, None),
            ParseState::Complete {
                subthing,
                option,
                desc,
                value,
            } => {
                let emitted = DocItem::new(subthing.clone(), option, desc, value);
                (subthing, UNDOCUMENTED.to_string(), Some(emitted))
            }
        };

        let desc = if desc == UNDOCUMENTED {
            text.to_string()
        } else {
            format!("{} {}", desc, text)
        };
        let state = ParseState::Partial {
            subthing,
            desc: substitute_tokens(&desc),
        };
        (state, emitted)
    }

    fn option(self, key: String, value: String) -> (ParseState, Option<DocItem>) {
        trace!(option = %key, %value, "option line");
        match self {
            ParseState::Unscoped => (ParseState::Unscoped, None),
            ParseState::Partial { subthing, desc } => (
                ParseState::Complete {
                    subthing,
                    option: key,
                    desc: desc.trim().to_string(),
                    value,
                },
                None,
            ),
            ParseState::Complete {
                subthing,
                option,
                desc,
                value: previous,
            } => {
                let emitted = DocItem::new(subthing.clone(), option, desc, previous);
                (
                    ParseState::Complete {
                        subthing,
                        option: key,
                        desc: UNDOCUMENTED.to_string(),
                        value,
                    },
                    Some(emitted),
                )
            }
        }
    }

    fn non_option(self, line: &str) -> (ParseState, Option<DocItem>) {
        match self {
            ParseState::Complete {
                subthing,
                option,
                desc,
                value,
            } if line.starts_with(CONTINUATION_INDENT) => {
                let value = format!("{} {}", value, line.trim_start())
                    .trim()
                    .to_string();
                (
                    ParseState::Complete {
                        subthing,
                        option,
                        desc,
                        value,
                    },
                    None,
                )
            }
            complete @ ParseState::Complete { .. } => {
                trace!(line, "junk line concludes option");
                let emitted = complete.item();
                (complete, emitted)
            }
            other => (other, None),
        }
    }
}

fn substitute_tokens(desc: &str) -> String {
    DESC_TOKENS
        .iter()
        .fold(desc.to_string(), |acc, (token, with)| acc.replace(token, with))
}

/// Run the state machine over `lines`, returning every emitted item in
/// source order (duplicates included).
pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<DocItem> {
    let mut items = Vec::new();
    let mut state = ParseState::default();
    for line in lines {
        let (next, emitted) = state.step(line);
        items.extend(emitted);
        state = next;
    }
    items.extend(state.finish());
    items
}
