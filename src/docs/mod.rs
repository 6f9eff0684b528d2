//! Documentation assemblers for a test tree.
//!
//! A tree has a base directory holding `config_defaults/` (the shared
//! `defaults.ini` plus one `.ini` per test, in any subdirectory) and one
//! directory per [`TestKind`] with a `<name>/<leaf>.py` module per test.

pub mod config;
pub mod defaults;
pub mod subtest;

use crate::error::Result;
use crate::parser::absolute;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use config::ConfigDoc;
pub use defaults::DefaultDoc;
pub use subtest::{SubtestDoc, SubtestDocs};

/// Template for one documented option: `*  ``option`` : (``value``) desc`.
pub const ITEM_FMT: &str = "*  ``%(option)s`` : (``%(value)s``) %(desc)s";

/// Locations inside a test tree, resolved against one absolute base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLayout {
    base_path: PathBuf,
}

impl DocLayout {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            base_path: absolute(base_path.as_ref())?,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_path.join("config_defaults")
    }

    pub fn defaults_ini(&self) -> PathBuf {
        self.config_dir().join("defaults.ini")
    }

    pub fn kind_dir(&self, kind: TestKind) -> PathBuf {
        self.base_path.join(kind.tld_name())
    }
}

/// The kinds of test module a tree may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestKind {
    Subtest,
    Pretest,
    Intratest,
    Posttest,
}

impl TestKind {
    pub const ALL: [TestKind; 4] = [
        TestKind::Subtest,
        TestKind::Pretest,
        TestKind::Intratest,
        TestKind::Posttest,
    ];

    /// Top-level directory holding modules of this kind.
    pub fn tld_name(self) -> &'static str {
        match self {
            TestKind::Subtest => "subtests",
            TestKind::Pretest => "pretests",
            TestKind::Intratest => "intratests",
            TestKind::Posttest => "posttests",
        }
    }

    /// Word following the test name in document titles.
    pub fn postfix(self) -> &'static str {
        match self {
            TestKind::Subtest => "Subtest",
            TestKind::Pretest => "Pre-test",
            TestKind::Intratest => "Intra-test",
            TestKind::Posttest => "Post-test",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tld_name())
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subtest" | "subtests" => Ok(TestKind::Subtest),
            "pretest" | "pretests" => Ok(TestKind::Pretest),
            "intratest" | "intratests" => Ok(TestKind::Intratest),
            "posttest" | "posttests" => Ok(TestKind::Posttest),
            _ => Err(format!(
                "unknown test kind: {}. Use subtest, pretest, intratest, or posttest",
                s
            )),
        }
    }
}

/// Indent continuation lines of a description so they stay inside their
/// bullet item.
pub(crate) fn hang_desc(desc: &str) -> String {
    desc.replace('\n', "\n   ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = DocLayout::new("/srv/tests").unwrap();
        assert_eq!(layout.config_dir(), Path::new("/srv/tests/config_defaults"));
        assert_eq!(
            layout.defaults_ini(),
            Path::new("/srv/tests/config_defaults/defaults.ini")
        );
        assert_eq!(layout.kind_dir(TestKind::Posttest), Path::new("/srv/tests/posttests"));
    }

    #[test]
    fn relative_base_is_made_absolute() {
        let layout = DocLayout::new(".").unwrap();
        assert!(layout.base_path().is_absolute());
    }

    #[test]
    fn kind_names() {
        assert_eq!("pretests".parse::<TestKind>().unwrap(), TestKind::Pretest);
        assert_eq!("Subtest".parse::<TestKind>().unwrap(), TestKind::Subtest);
        assert!("bogus".parse::<TestKind>().is_err());
        assert_eq!(TestKind::Intratest.postfix(), "Intra-test");
        assert_eq!(TestKind::Posttest.to_string(), "posttests");
    }

    #[test]
    fn descriptions_hang_under_bullets() {
        assert_eq!(hang_desc("one\ntwo"), "one\n   two");
        assert_eq!(hang_desc("flat"), "flat");
    }
}
