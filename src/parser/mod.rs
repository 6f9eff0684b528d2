//! Parser module: turns annotated `.ini` text into deduplicated [`DocItem`]s.

pub mod line;
pub mod sections;

use crate::error::{Error, Origin, Result};
use crate::model::{DocItem, DocKey};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parsed, deduplicated documentation for one `.ini` source.
///
/// Dereferences to the ordered items. Section classification is computed on
/// first use and cached.
#[derive(Debug)]
pub struct ConfigDocParser {
    items: Vec<DocItem>,
    origin: Origin,
    source: String,
    subthing_names: OnceCell<Vec<String>>,
    subtest_name: OnceCell<String>,
    subsub_names: OnceCell<BTreeSet<String>>,
}

impl ConfigDocParser {
    /// Parse the `.ini` file at `path` (made absolute).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = absolute(path.as_ref())?;
        let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let source = String::from_utf8_lossy(&bytes).into_owned();
        let parsed = Self::build(source, Origin::File(path));
        debug!(origin = %parsed.origin, items = parsed.items.len(), "parsed ini file");
        Ok(parsed)
    }

    /// Parse in-memory `.ini` content.
    pub fn from_text(text: &str) -> Self {
        Self::build(text.to_string(), Origin::Text(text.to_string()))
    }

    fn build(source: String, origin: Origin) -> Self {
        let items = dedupe(line::parse_lines(source.lines()));
        Self {
            items,
            origin,
            source,
            subthing_names: OnceCell::new(),
            subtest_name: OnceCell::new(),
            subsub_names: OnceCell::new(),
        }
    }

    pub fn items(&self) -> &[DocItem] {
        &self.items
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Absolute path of the parsed file, `None` for in-memory content.
    pub fn ini_path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File(path) => Some(path),
            Origin::Text(_) => None,
        }
    }

    /// All section names, longest first; equal lengths keep file order.
    pub fn subthing_names(&self) -> Result<&[String]> {
        let names = self.subthing_names.get_or_try_init(|| {
            let mut names = sections::section_names(&self.source, &self.origin)?;
            if names.is_empty() {
                return Err(Error::NoSections {
                    origin: self.origin.clone(),
                });
            }
            names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
            Ok(names)
        })?;
        Ok(names)
    }

    /// The single shortest section name: the subtest this file configures.
    pub fn subtest_name(&self) -> Result<&str> {
        let name = self.subtest_name.get_or_try_init(|| {
            let names = self.subthing_names()?;
            let (shortest, others) = names
                .split_last()
                .ok_or_else(|| Error::NoSections {
                    origin: self.origin.clone(),
                })?;
            let len = shortest.chars().count();
            if let Some(tied) = others.iter().find(|n| n.chars().count() == len) {
                return Err(Error::AmbiguousSubtest {
                    origin: self.origin.clone(),
                    subtest: shortest.clone(),
                    other: tied.clone(),
                });
            }
            Ok(shortest.clone())
        })?;
        Ok(name)
    }

    /// Every section other than the subtest section.
    pub fn subsub_names(&self) -> Result<&BTreeSet<String>> {
        let names = self.subsub_names.get_or_try_init(|| {
            let names = self.subthing_names()?;
            if names.len() == 1 {
                return Ok(BTreeSet::new());
            }
            let subtest = self.subtest_name()?;
            Ok(names
                .iter()
                .filter(|n| n.as_str() != subtest)
                .cloned()
                .collect())
        })?;
        Ok(names)
    }

    /// Items belonging to section `subthing`, in order.
    pub fn section_items<'a>(&'a self, subthing: &'a str) -> impl Iterator<Item = &'a DocItem> {
        self.items.iter().filter(move |i| i.subthing() == subthing)
    }
}

impl Deref for ConfigDocParser {
    type Target = [DocItem];

    fn deref(&self) -> &[DocItem] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a ConfigDocParser {
    type Item = &'a DocItem;
    type IntoIter = std::slice::Iter<'a, DocItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Collapse items sharing `(subthing, option)`: the last occurrence wins but
/// keeps the position of the first.
pub fn dedupe(items: Vec<DocItem>) -> Vec<DocItem> {
    let mut by_key: IndexMap<DocKey, DocItem> = IndexMap::with_capacity(items.len());
    for item in items {
        by_key.insert(item.key(), item);
    }
    by_key.into_values().collect()
}

pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::io(path, e))
}
