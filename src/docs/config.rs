//! Documentation of one test's `.ini` file.

use super::defaults::item_line;
use super::{DefaultDoc, DocLayout, ITEM_FMT};
use crate::error::{Error, Result};
use crate::model::DocItem;
use crate::parser::ConfigDocParser;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Template for an option overriding a default, with a cross-reference to
/// the defaults section.
pub const OVERRIDE_ITEM_FMT: &str = "*  ``%(option)s`` : ``%(value)s`` \
     :ref:`Overrides default value <default configuration options>`: ``%(def_value)s``";

/// Template for an undocumented sub-subtest option inheriting its
/// description from the subtest section.
pub const INHERIT_ITEM_FMT: &str = "*  ``%(option)s`` : (``%(value)s``) %(desc)s - *inherited*";

/// Subtest option naming the sub-subtests; never listed as a setting.
pub(crate) const SUBSUBTESTS_OPTION: &str = "subsubtests";

#[derive(Debug)]
pub struct ConfigDoc {
    parser: ConfigDocParser,
}

impl ConfigDoc {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_parser(ConfigDocParser::from_path(path)?))
    }

    pub fn from_parser(parser: ConfigDocParser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &ConfigDocParser {
        &self.parser
    }

    /// Every `.ini` file under `config_defaults/` except `defaults.ini`,
    /// sorted by path.
    pub fn ini_filenames(layout: &DocLayout) -> Result<Vec<PathBuf>> {
        let root = layout.config_dir();
        let mut files = Vec::new();
        if !root.is_dir() {
            warn!(root = %root.display(), "no configuration directory");
            return Ok(files);
        }
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).to_path_buf();
                Error::io(path, e.into())
            })?;
            if !entry.file_type().is_file() || entry.file_name() == "defaults.ini" {
                continue;
            }
            if entry.path().extension().is_some_and(|ext| ext == "ini") {
                files.push(entry.into_path());
            }
        }
        files.sort();
        debug!(root = %root.display(), count = files.len(), "found ini files");
        Ok(files)
    }

    /// The document whose subtest section is named `name`.
    pub fn new_by_name(name: &str, layout: &DocLayout) -> Result<Self> {
        let wanted = name.trim();
        for path in Self::ini_filenames(layout)? {
            let parser = ConfigDocParser::from_path(&path)?;
            match parser.subtest_name() {
                Ok(subtest) if subtest == wanted => return Ok(Self::from_parser(parser)),
                Ok(_) => {}
                Err(e) if e.is_structural() => {
                    warn!(path = %path.display(), error = %e, "skipping ini file");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::NotFound {
            what: "Subtest",
            name: wanted.to_string(),
            base: layout.config_dir(),
        })
    }

    /// `Configuration` section for this file; empty when nothing is
    /// documented.
    pub fn fmt(&self, defaults: &DefaultDoc) -> Result<String> {
        if self.parser.is_empty() {
            return Ok(String::new());
        }
        let mut out = String::from("\n\nConfiguration\n---------------\n\n");

        let subsubs = self.parser.subsub_names()?;
        if !subsubs.is_empty() {
            let listed: Vec<String> = subsubs.iter().map(|name| format!("``{name}``")).collect();
            out.push_str(&format!(":Sub-subtests: {}\n\n", listed.join(", ")));
        }

        let general = self.general_fmt(defaults)?;
        if general.len() > 1 {
            out = format!("{out}\n{general}\n");
        }

        let subsub = self.subsub_fmt(defaults)?;
        if subsub.len() > 1 {
            out = format!("{out}\n{subsub}\n");
        }
        Ok(out)
    }

    fn general_fmt(&self, defaults: &DefaultDoc) -> Result<String> {
        let subtest = self.parser.subtest_name()?;
        let options: Vec<&DocItem> = self
            .parser
            .section_items(subtest)
            .filter(|item| item.option() != SUBSUBTESTS_OPTION)
            .collect();
        Ok(self.fmt_options(&options, &IndexMap::new(), defaults)?.join("\n"))
    }

    fn subsub_fmt(&self, defaults: &DefaultDoc) -> Result<String> {
        let subtest = self.parser.subtest_name()?;
        let inherited: IndexMap<&str, &DocItem> = self
            .parser
            .section_items(subtest)
            .map(|item| (item.option(), item))
            .collect();

        let mut lines: Vec<String> = Vec::new();
        for name in self.parser.subsub_names()? {
            let options: Vec<&DocItem> = self.parser.section_items(name).collect();
            if options.is_empty() {
                continue;
            }
            let heading = format!("``{name}`` Sub-subtest");
            let underline = "~".repeat(heading.chars().count() + 2);
            lines.push(String::new());
            lines.push(heading);
            lines.push(underline);
            lines.push(String::new());
            lines.extend(self.fmt_options(&options, &inherited, defaults)?);
        }
        Ok(lines.join("\n"))
    }

    fn fmt_options(
        &self,
        options: &[&DocItem],
        inherited: &IndexMap<&str, &DocItem>,
        defaults: &DefaultDoc,
    ) -> Result<Vec<String>> {
        options
            .iter()
            .map(|item| {
                if let Some(default) = defaults.get_default(item.option()) {
                    return item_line(OVERRIDE_ITEM_FMT, item, &[("def_value", default.value())]);
                }
                match inherited.get(item.option()) {
                    Some(parent) if !item.is_documented() => {
                        item_line(INHERIT_ITEM_FMT, item, &[("desc", parent.desc())])
                    }
                    _ => item_line(ITEM_FMT, item, &[]),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn defaults() -> DefaultDoc {
        DefaultDoc::from_parser(ConfigDocParser::from_text(
            "[DEFAULTS]\n#: Wait time\ntimeout = 60\n",
        ))
    }

    fn config(text: &str) -> ConfigDoc {
        ConfigDoc::from_parser(ConfigDocParser::from_text(text))
    }

    #[test]
    fn empty_file_renders_nothing() {
        assert_eq!(config("[mytest]\n").fmt(&defaults()).unwrap(), "");
    }

    #[test]
    fn general_options() {
        let doc = config("[mytest]\n#: Explains foo\nfoo = 1\nsubsubtests = a\n");
        assert_eq!(
            doc.fmt(&defaults()).unwrap(),
            "\n\nConfiguration\n---------------\n\n\n*  ``foo`` : (``1``) Explains foo\n"
        );
    }

    #[test]
    fn overrides_reference_defaults() {
        let doc = config("[mytest]\n#: Longer wait\ntimeout = 120\n");
        let out = doc.fmt(&defaults()).unwrap();
        assert!(out.contains(
            "*  ``timeout`` : ``120`` :ref:`Overrides default value \
             <default configuration options>`: ``60``"
        ));
    }

    #[test]
    fn subsub_sections_and_inheritance() {
        let doc = config(
            "[t]\n#: Explains foo\nfoo = 1\nsubsubtests = t_one,t_two\n\
             [t_one]\nfoo = 2\n#: Only here\nbar = x\n\
             [t_two]\n",
        );
        let out = doc.fmt(&defaults()).unwrap();
        assert!(out.contains(":Sub-subtests: ``t_one``, ``t_two``\n\n"));
        assert!(out.contains(
            "\n``t_one`` Sub-subtest\n~~~~~~~~~~~~~~~~~~~~~~~\n\n\
             *  ``foo`` : (``2``) Explains foo - *inherited*\n\
             *  ``bar`` : (``x``) Only here"
        ));
        // Empty sub-subtest sections get no heading.
        assert!(!out.contains("``t_two`` Sub-subtest"));
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config_defaults");
        fs::create_dir_all(config.join("subtests/b")).unwrap();
        fs::write(config.join("defaults.ini"), "[DEFAULTS]\nx = 1\n").unwrap();
        fs::write(config.join("subtests/b/beta.ini"), "[b/beta]\ny = 2\n").unwrap();
        fs::write(config.join("alpha.ini"), "[alpha]\nz = 3\n").unwrap();
        fs::write(config.join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn ini_filenames_skip_defaults() {
        let dir = tree();
        let layout = DocLayout::new(dir.path()).unwrap();
        let files = ConfigDoc::ini_filenames(&layout).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["alpha.ini", "beta.ini"]);
    }

    #[test]
    fn find_by_subtest_name() {
        let dir = tree();
        let layout = DocLayout::new(dir.path()).unwrap();
        let doc = ConfigDoc::new_by_name(" b/beta ", &layout).unwrap();
        assert_eq!(doc.parser().subtest_name().unwrap(), "b/beta");

        let err = ConfigDoc::new_by_name("gamma", &layout).unwrap_err();
        assert!(err.is_not_found());
    }
}
