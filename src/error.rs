//! Error type shared by the parser, the composer and the assemblers.

use std::fmt;
use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Where parsed configuration text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Absolute path of an `.ini` file.
    File(PathBuf),
    /// Literal in-memory content.
    Text(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File(path) => write!(f, "ini file: {}", path.display()),
            Origin::Text(text) => write!(f, "ini string: '{}'", text),
        }
    }
}

/// What went wrong while expanding a `%(key)s` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateFault {
    MissingKey(String),
    Unterminated { offset: usize },
    UnsupportedConversion { key: String, conversion: char },
}

impl fmt::Display for TemplateFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateFault::MissingKey(key) => write!(f, "missing key '{}'", key),
            TemplateFault::Unterminated { offset } => {
                write!(f, "unterminated key starting at offset {}", offset)
            }
            TemplateFault::UnsupportedConversion { key, conversion } => write!(
                f,
                "unsupported format character '{}' for key '{}'",
                conversion, key
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No sections found in {origin}")]
    NoSections { origin: Origin },

    #[error("Missing section header at line {line} in {origin}")]
    MissingSectionHeader { origin: Origin, line: usize },

    #[error("Multiple subtest sections found in {origin}: subtest \"{subtest}\" == sub-subtest \"{other}\"")]
    AmbiguousSubtest {
        origin: Origin,
        subtest: String,
        other: String,
    },

    #[error("{fault}: fmt='{template}' with dct='{substitutions}'")]
    Template {
        fault: TemplateFault,
        template: String,
        substitutions: String,
    },

    #[error("No defaults.ini options were parsed from {}", path.display())]
    NoDefaults { path: PathBuf },

    #[error("{what} {name} not found under {}", base.display())]
    NotFound {
        what: &'static str,
        name: String,
        base: PathBuf,
    },

    #[error("cannot interpolate [{section}] {key}: {reason}")]
    Interpolation {
        section: String,
        key: String,
        reason: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors describing a malformed configuration layout rather
    /// than an unreadable file or a bad template.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::NoSections { .. }
                | Error::MissingSectionHeader { .. }
                | Error::AmbiguousSubtest { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
