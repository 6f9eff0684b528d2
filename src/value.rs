//! Single-value lookup across a stack of `.ini` files.
//!
//! Reading follows the plain configparser dialect rather than the `#:`
//! documentation dialect: option names are case-insensitive, may hold any
//! character but the delimiters, and continuation lines join with newlines.

use crate::error::{Error, Origin, Result, TemplateFault};
use crate::model::EMPTY_VALUE;
use crate::parser::absolute;
use crate::render::{substitute, MissingKey, Substitutions};
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Section whose options every other section can reference.
pub const DEFAULTS_SECTION: &str = "DEFAULTS";

/// Deepest chain of `%(name)s` references followed before giving up.
pub const MAX_INTERPOLATION_DEPTH: usize = 10;

static RE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%\(([^)]*)\)s").unwrap());

static RE_SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").unwrap());

// key: anything up to the first delimiter, lazily trimmed
static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^=:\s][^=:]*?)\s*[=:]\s*(.*)$").unwrap());

/// Raw option values by section, later files overriding earlier ones.
#[derive(Debug, Default)]
pub struct ConfigValues {
    sections: IndexMap<String, IndexMap<String, String>>,
    sources: Vec<PathBuf>,
}

/// Option names are compared lowercased.
fn option_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ConfigValues {
    /// Read `files` in order; unreadable files are an error.
    pub fn load<I, P>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut values = Self::default();
        for file in files {
            let path = absolute(file.as_ref())?;
            let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            let text = String::from_utf8_lossy(&bytes);
            values.read(&text, Origin::File(path.clone()))?;
            values.sources.push(path);
        }
        debug!(files = values.sources.len(), sections = values.sections.len(), "loaded values");
        Ok(values)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut values = Self::default();
        values.read(text, Origin::Text(text.to_string()))?;
        Ok(values)
    }

    /// Merge one file's options. Indented lines continue the previous
    /// value; blank lines inside a value are kept unless trailing.
    fn read(&mut self, text: &str, origin: Origin) -> Result<()> {
        let mut section: Option<String> = None;
        let mut current: Option<(String, Vec<String>)> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            let trimmed = line.trim_start();

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if trimmed.is_empty() {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(String::new());
                }
                continue;
            }
            if line.len() != trimmed.len() {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(trimmed.to_string());
                    continue;
                }
            }

            self.flush(section.as_deref(), current.take());
            if let Some(caps) = RE_SECTION.captures(trimmed) {
                let name = caps[1].to_string();
                trace!(section = %name, "section header");
                self.sections.entry(name.clone()).or_default();
                section = Some(name);
                continue;
            }
            if section.is_none() {
                return Err(Error::MissingSectionHeader {
                    origin,
                    line: index + 1,
                });
            }
            if let Some(caps) = RE_OPTION.captures(trimmed) {
                current = Some((option_key(&caps[1]), vec![caps[2].to_string()]));
            }
        }
        self.flush(section.as_deref(), current);
        Ok(())
    }

    fn flush(&mut self, section: Option<&str>, current: Option<(String, Vec<String>)>) {
        let (Some(section), Some((key, mut lines))) = (section, current) else {
            return;
        };
        while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key, lines.join("\n"));
    }

    /// The uninterpolated value, looked up in `section` then `DEFAULTS`.
    pub fn raw(&self, section: &str, key: &str) -> Option<&str> {
        let key = option_key(key);
        [section, DEFAULTS_SECTION]
            .iter()
            .filter_map(|s| self.sections.get(*s))
            .find_map(|options| options.get(&key))
            .map(String::as_str)
    }

    /// The interpolated value of `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Result<String> {
        if !self.sections.contains_key(section) {
            return Err(self.not_found("Section", section));
        }
        let raw = self
            .raw(section, key)
            .ok_or_else(|| self.not_found("Option", &format!("{section}.{key}")))?;
        self.interpolate(section, key, raw, 0)
    }

    fn interpolate(&self, section: &str, key: &str, raw: &str, depth: usize) -> Result<String> {
        let fail = |reason: String| Error::Interpolation {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        };
        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(fail(format!(
                "more than {MAX_INTERPOLATION_DEPTH} nested references"
            )));
        }
        let raw = if raw == EMPTY_VALUE { "" } else { raw };
        if !raw.contains('%') {
            return Ok(raw.to_string());
        }

        let mut subs = Substitutions::new();
        for caps in RE_REFERENCE.captures_iter(raw) {
            let name = &caps[1];
            if subs.contains_key(name) {
                continue;
            }
            let Some(target) = self.raw(section, name) else {
                return Err(fail(TemplateFault::MissingKey(name.to_string()).to_string()));
            };
            let value = self.interpolate(section, key, target, depth + 1)?;
            subs.insert(name.to_string(), value);
        }
        substitute(raw, &subs, MissingKey::Error).map_err(|e| match e {
            Error::Template { fault, .. } => fail(fault.to_string()),
            other => other,
        })
    }

    fn not_found(&self, what: &'static str, name: &str) -> Error {
        Error::NotFound {
            what,
            name: name.to_string(),
            base: self.sources.last().cloned().unwrap_or_default(),
        }
    }
}

/// Look up one interpolated value across `files`.
pub fn lookup<I, P>(section: &str, key: &str, files: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    ConfigValues::load(files)?.get(section, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn values(text: &str) -> ConfigValues {
        ConfigValues::from_text(text).unwrap()
    }

    #[test]
    fn plain_and_empty_values() {
        let values = values("[s]\nname = docker\nempty =\n");
        assert_eq!(values.get("s", "name").unwrap(), "docker");
        assert_eq!(values.get("s", "empty").unwrap(), "");
    }

    #[test]
    fn option_names_ignore_case() {
        let values = values("[s]\nFoo = 1\nbar = %(FOO)s2\n");
        assert_eq!(values.get("s", "foo").unwrap(), "1");
        assert_eq!(values.get("s", "FOO").unwrap(), "1");
        assert_eq!(values.get("s", "Bar").unwrap(), "12");
        // Section names stay case-sensitive.
        assert!(values.get("S", "foo").unwrap_err().is_not_found());
    }

    #[test]
    fn continuation_lines_join_with_newlines() {
        let values = values("[s]\nlist = one\n    two\n\n    three\n\nnext = x\n");
        assert_eq!(values.get("s", "list").unwrap(), "one\ntwo\n\nthree");
        assert_eq!(values.get("s", "next").unwrap(), "x");
    }

    #[test]
    fn dashed_and_dotted_option_names() {
        let values = values("[s]\nrun-opts = -d\ndocker.path: /usr/bin/docker\nwith space = y\n");
        assert_eq!(values.get("s", "run-opts").unwrap(), "-d");
        assert_eq!(values.get("s", "docker.path").unwrap(), "/usr/bin/docker");
        assert_eq!(values.get("s", "with space").unwrap(), "y");
    }

    #[test]
    fn comments_and_percent_escapes() {
        let values = values("; header\n[s]\n# note\nrate = 100%%\n");
        assert_eq!(values.get("s", "rate").unwrap(), "100%");
    }

    #[test]
    fn option_before_section_fails() {
        let err = ConfigValues::from_text("x = 1\n[s]\n").unwrap_err();
        assert!(matches!(err, Error::MissingSectionHeader { line: 1, .. }));
    }

    #[test]
    fn references_resolve_through_defaults() {
        let values = values(
            "[DEFAULTS]\nroot = /srv\nimages = %(root)s/images\n\
             [s]\npath = %(images)s/%(name)s\nname = busybox\n",
        );
        assert_eq!(values.get("s", "path").unwrap(), "/srv/images/busybox");
        assert_eq!(values.raw("s", "root"), Some("/srv"));
    }

    #[test]
    fn section_value_shadows_default() {
        let values = values("[DEFAULTS]\nroot = /srv\n[s]\nroot = /opt\nbin = %(root)s/bin\n");
        assert_eq!(values.get("s", "bin").unwrap(), "/opt/bin");
    }

    #[test]
    fn missing_section_and_key() {
        let values = values("[s]\na = 1\n");
        assert!(values.get("t", "a").unwrap_err().is_not_found());
        assert!(values.get("s", "b").unwrap_err().is_not_found());
    }

    #[test]
    fn bad_references_fail() {
        let values = values("[s]\na = %(nope)s\nloop = %(loop)s\n");
        let err = values.get("s", "a").unwrap_err();
        assert!(matches!(err, Error::Interpolation { .. }));
        assert!(err.to_string().contains("missing key 'nope'"));
        let err = values.get("s", "loop").unwrap_err();
        assert!(err.to_string().contains("nested references"));
    }

    #[test]
    fn later_files_override() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.ini");
        let second = dir.path().join("b.ini");
        fs::write(&first, "[s]\nx = 1\ny = 2\n").unwrap();
        fs::write(&second, "[s]\nX = 3\n").unwrap();
        assert_eq!(lookup("s", "x", [&first, &second]).unwrap(), "3");
        assert_eq!(lookup("s", "y", [&first, &second]).unwrap(), "2");
    }
}
