//! Documentation of the shared `defaults.ini`.

use super::{hang_desc, DocLayout, ITEM_FMT};
use crate::error::{Error, Result};
use crate::model::DocItem;
use crate::parser::ConfigDocParser;
use crate::render::{substitute, Composer, Conversion, MissingKey};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parsed `defaults.ini` with an option-name index.
#[derive(Debug)]
pub struct DefaultDoc {
    parser: ConfigDocParser,
    by_option: IndexMap<String, usize>,
}

impl DefaultDoc {
    /// Load `config_defaults/defaults.ini` under the layout's base path.
    pub fn load(layout: &DocLayout) -> Result<Self> {
        Self::from_path(layout.defaults_ini())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let parser = ConfigDocParser::from_path(path)?;
        debug!(origin = %parser.origin(), options = parser.len(), "loaded defaults");
        Ok(Self::from_parser(parser))
    }

    pub fn from_parser(parser: ConfigDocParser) -> Self {
        let mut by_option = IndexMap::with_capacity(parser.len());
        for (index, item) in parser.iter().enumerate() {
            // Later sections override earlier ones.
            by_option.insert(item.option().to_string(), index);
        }
        Self { parser, by_option }
    }

    pub fn items(&self) -> &[DocItem] {
        self.parser.items()
    }

    pub fn parser(&self) -> &ConfigDocParser {
        &self.parser
    }

    /// The default item for `option`, whatever section it came from.
    pub fn get_default(&self, option: &str) -> Option<&DocItem> {
        self.by_option.get(option).map(|&index| &self.parser[index])
    }

    /// One bullet line per default option, followed by a blank line.
    pub fn fmt(&self) -> Result<String> {
        if self.parser.is_empty() {
            return Err(Error::NoDefaults {
                path: self
                    .parser
                    .ini_path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(self.parser.origin().to_string())),
            });
        }
        let lines = self
            .parser
            .iter()
            .map(|item| item_line(ITEM_FMT, item, &[]))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}\n\n", lines.join("\n")))
    }

    pub fn composer<'a>(&self, conversion: Conversion<'a>) -> Result<Composer<'a>> {
        Ok(Composer::new(self.fmt()?).conversion(conversion))
    }
}

/// Expand one option template. `extra` entries override the item's own
/// fields.
pub(crate) fn item_line(template: &str, item: &DocItem, extra: &[(&str, &str)]) -> Result<String> {
    let mut subs = item.as_mapping();
    for (key, value) in extra {
        subs.insert(key.to_string(), value.to_string());
    }
    if let Some(desc) = subs.get_mut("desc") {
        *desc = hang_desc(desc);
    }
    substitute(template, &subs, MissingKey::Error)
}
