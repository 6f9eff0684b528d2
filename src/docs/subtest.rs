//! Per-module test documentation and the combined document for a kind.

use super::{ConfigDoc, DefaultDoc, DocLayout, TestKind};
use crate::error::{Error, Result};
use crate::markup::block::expand_tabs;
use crate::parser::absolute;
use crate::render::{render, Composer, Conversion};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Title line, docstring and configuration of one test module.
pub const SUBTEST_FMT: &str = "``%(name)s`` %(postfix)s\n\
    ====================================================================\n\n\
    %(docstring)s\n\n\
    %(configuration)s\n";

/// Stands in for the configuration of a test without an `.ini` file.
pub const NO_CONFIG_NOTE: &str = "\n:Note: Subtest does not have any default configuration\n";

/// Test names left out of combined documents unless overridden.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "example",
    "subexample",
    "pretest_example",
    "intratest_example",
    "posttest_example",
];

/// Local table of contents placed before the combined tests.
pub const CONTENTS_BLOCK: &str = ".. contents::\n   :depth: 1\n   :local:\n\n";

#[derive(Debug, Clone)]
pub struct SubtestDoc {
    kind: TestKind,
    layout: DocLayout,
    module_path: PathBuf,
    name: String,
    configuration: bool,
}

impl SubtestDoc {
    pub fn new(kind: TestKind, layout: &DocLayout, module_path: impl AsRef<Path>) -> Result<Self> {
        let module_path = absolute(module_path.as_ref())?;
        let name = Self::name_for(kind, layout, &module_path);
        Ok(Self {
            kind,
            layout: layout.clone(),
            module_path,
            name,
            configuration: true,
        })
    }

    /// Find the module of `kind` called `name`.
    pub fn new_by_name(kind: TestKind, name: &str, layout: &DocLayout) -> Result<Self> {
        let wanted = name.trim();
        for path in Self::module_filenames(kind, layout)? {
            if Self::name_for(kind, layout, &path) == wanted {
                return Self::new(kind, layout, path);
            }
        }
        Err(Error::NotFound {
            what: kind.postfix(),
            name: wanted.to_string(),
            base: layout.kind_dir(kind),
        })
    }

    /// Standardized name: the module's directory relative to the kind
    /// directory, `/`-separated.
    pub fn name_for(kind: TestKind, layout: &DocLayout, module_path: &Path) -> String {
        let dir = module_path.parent().unwrap_or(module_path);
        match dir.strip_prefix(layout.kind_dir(kind)) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Every `<dir>/<dir>.py` module under the kind directory, sorted.
    pub fn module_filenames(kind: TestKind, layout: &DocLayout) -> Result<Vec<PathBuf>> {
        let root = layout.kind_dir(kind);
        let mut modules = Vec::new();
        if !root.is_dir() {
            debug!(root = %root.display(), "no test directory");
            return Ok(modules);
        }
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).to_path_buf();
                Error::io(path, e.into())
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let mut leaf = entry.file_name().to_os_string();
            leaf.push(".py");
            let candidate = entry.path().join(leaf);
            if candidate.is_file() {
                modules.push(candidate);
            }
        }
        modules.sort();
        Ok(modules)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// Render without looking up the test's `.ini` file.
    pub fn without_configuration(mut self) -> Self {
        self.configuration = false;
        self
    }

    /// The module's leading string literal, cleaned.
    pub fn docstring(&self) -> Result<String> {
        let bytes = fs::read(&self.module_path).map_err(|e| Error::io(&self.module_path, e))?;
        let source = String::from_utf8_lossy(&bytes);
        match module_docstring(&source) {
            Some(raw) => Ok(cleandoc(&raw)),
            None => {
                warn!(module = %self.module_path.display(), "module has no docstring");
                Ok(String::new())
            }
        }
    }

    /// Configuration section from the test's `.ini` file, or a note when
    /// there is none.
    pub fn configuration(&self, defaults: &DefaultDoc) -> Result<String> {
        if !self.configuration {
            return Ok("\n".to_string());
        }
        match ConfigDoc::new_by_name(&self.name, &self.layout) {
            Ok(config) => Ok(config.fmt(defaults)?.trim().to_string()),
            Err(e) if e.is_not_found() => Ok(NO_CONFIG_NOTE.to_string()),
            Err(e) => Err(e),
        }
    }

    pub fn composer<'a>(&'a self, defaults: &'a DefaultDoc, conversion: Conversion<'a>) -> Composer<'a> {
        Composer::new(SUBTEST_FMT)
            .sub_str("postfix", self.kind.postfix())
            .sub_method("name", move |_| Ok(self.name.clone()))
            .sub_method("docstring", move |_| self.docstring())
            .sub_method("configuration", move |_| self.configuration(defaults))
            .conversion(conversion)
    }

    pub fn render(&self, defaults: &DefaultDoc, conversion: Conversion<'_>) -> Result<String> {
        render(&self.composer(defaults, conversion))
    }
}

/// Every module of one kind, concatenated in name order.
#[derive(Debug, Clone)]
pub struct SubtestDocs {
    kind: TestKind,
    layout: DocLayout,
    exclude: Vec<String>,
    contents: bool,
}

impl SubtestDocs {
    pub fn new(kind: TestKind, layout: &DocLayout) -> Self {
        Self {
            kind,
            layout: layout.clone(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            contents: true,
        }
    }

    /// Replace the exclude list.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn contents(mut self, contents: bool) -> Self {
        self.contents = contents;
        self
    }

    /// Name to module path for every module, excluded ones included.
    pub fn names_filenames(&self) -> Result<IndexMap<String, PathBuf>> {
        Ok(SubtestDoc::module_filenames(self.kind, &self.layout)?
            .into_iter()
            .map(|path| (SubtestDoc::name_for(self.kind, &self.layout, &path), path))
            .collect())
    }

    fn included(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut included: Vec<_> = self
            .names_filenames()?
            .into_iter()
            .filter(|(name, _)| !self.exclude.contains(name))
            .collect();
        included.sort();
        Ok(included)
    }

    pub fn fmt(&self) -> Result<String> {
        let keys: Vec<String> = self
            .included()?
            .into_iter()
            .map(|(name, _)| format!("%({name})s"))
            .collect();
        let contents = if self.contents { CONTENTS_BLOCK } else { "" };
        Ok(format!("{}{}\n", contents, keys.join("\n\n")))
    }

    pub fn composer<'a>(&self, defaults: &'a DefaultDoc, conversion: Conversion<'a>) -> Result<Composer<'a>> {
        let mut composer = Composer::new(self.fmt()?).conversion(conversion);
        for (name, path) in self.included()? {
            let doc = SubtestDoc::new(self.kind, &self.layout, path)?;
            composer = composer.sub_method(name, move |_| doc.render(defaults, Conversion::Identity));
        }
        Ok(composer)
    }

    pub fn render(&self, defaults: &DefaultDoc, conversion: Conversion<'_>) -> Result<String> {
        render(&self.composer(defaults, conversion)?)
    }
}

/// Leading string literal of a Python module, escapes resolved. Comments
/// and blank lines before it are skipped.
fn module_docstring(source: &str) -> Option<String> {
    let mut rest = source.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if !rest.starts_with('#') {
            break;
        }
        rest = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
    }

    let (raw, rest) = match rest.chars().next()? {
        'r' | 'R' => (true, &rest[1..]),
        'u' | 'U' => (false, &rest[1..]),
        _ => (false, rest),
    };
    let quote = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| rest.starts_with(q))?;
    let body = &rest[quote.len()..];
    let literal = &body[..closing_quote(body, quote)?];
    Some(if raw {
        literal.to_string()
    } else {
        unescape(literal)
    })
}

fn closing_quote(body: &str, quote: &str) -> Option<usize> {
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' if quote.len() == 1 => return None,
            _ if body[i..].starts_with(quote) => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\n') => {}
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Remove the common indentation of all lines after the first, strip the
/// first line's leading whitespace and drop blank lines at both ends.
/// Indentation is counted in characters, so any Unicode whitespace counts.
fn cleandoc(doc: &str) -> String {
    let lines: Vec<String> = doc.lines().map(expand_tabs).collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            cleaned.push(line.trim_start());
        } else {
            cleaned.push(skip_chars(line, margin));
        }
    }

    let start = cleaned.iter().position(|l| !l.trim().is_empty());
    let end = cleaned.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => cleaned[start..=end].join("\n"),
        _ => String::new(),
    }
}

/// `line` without its first `count` characters; empty when shorter.
fn skip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((offset, _)) => &line[offset..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn docstring_after_comments() {
        let source = "#!/usr/bin/env python\n# header\n\n\"\"\"\n    Summary\n    -------\n\n    Text\n\"\"\"\nimport os\n";
        let raw = module_docstring(source).unwrap();
        assert_eq!(cleandoc(&raw), "Summary\n-------\n\nText");
    }

    #[test]
    fn docstring_escapes() {
        let raw = module_docstring("'''a\\\\\nb \\'q\\' \\d'''").unwrap();
        assert_eq!(raw, "a\\\nb 'q' \\d");
        let raw = module_docstring("r\"\"\"keep \\n\"\"\"").unwrap();
        assert_eq!(raw, "keep \\n");
        assert_eq!(module_docstring("\"one line\"\nx = 1").unwrap(), "one line");
    }

    #[test]
    fn modules_without_docstring() {
        assert!(module_docstring("import os\n").is_none());
        assert!(module_docstring("").is_none());
        assert!(module_docstring("return 1").is_none());
    }

    #[test]
    fn cleandoc_keeps_relative_indent() {
        assert_eq!(
            cleandoc("  First\n      code\n    back\n\n"),
            "First\n  code\nback"
        );
    }

    #[test]
    fn cleandoc_counts_unicode_indent_in_chars() {
        let raw = module_docstring("\"\"\"Title\n   body\n  \u{a0}more\n\"\"\"").unwrap();
        assert_eq!(cleandoc(&raw), "Title\nbody\nmore");
        // Whitespace past the margin is content.
        assert_eq!(cleandoc("x\n  a\n  \u{a0}b"), "x\na\n\u{a0}b");
        assert_eq!(cleandoc("x\n  \u{a0}\u{a0}é\n   ü"), "x\n\u{a0}é\nü");
    }

    #[test]
    fn cleandoc_mixed_tabs_and_spaces() {
        assert_eq!(cleandoc("Title\n\tbody\n        more\n\t  deeper"), "Title\nbody\nmore\n  deeper");
        assert_eq!(cleandoc("Title\n    a\n  \u{a0}\tb"), "Title\na\n    b");
    }

    fn write(path: PathBuf, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn tree() -> (TempDir, DocLayout) {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        write(
            base.join("config_defaults/defaults.ini"),
            "[DEFAULTS]\n#: Wait time\ntimeout = 60\n",
        );
        write(
            base.join("config_defaults/subtests/docker_cli/run.ini"),
            "[docker_cli/run]\n#: Image to run\nimage = busybox\n",
        );
        write(
            base.join("subtests/docker_cli/run/run.py"),
            "\"\"\"\nSummary\n-------\n\nRuns a container.\n\nOperational Detail\n------------------\n\nLong.\n\"\"\"\n",
        );
        write(
            base.join("subtests/docker_cli/ps/ps.py"),
            "\"\"\"\nSummary\n-------\n\nLists **containers**.\n\"\"\"\n",
        );
        write(base.join("subtests/example/example.py"), "\"\"\"Example\"\"\"\n");
        write(base.join("subtests/docker_cli/helpers.py"), "\"\"\"Not a test\"\"\"\n");
        let layout = DocLayout::new(base).unwrap();
        (dir, layout)
    }

    fn defaults(layout: &DocLayout) -> DefaultDoc {
        DefaultDoc::load(layout).unwrap()
    }

    #[test]
    fn module_discovery_and_names() {
        let (_dir, layout) = tree();
        let names: Vec<String> = SubtestDoc::module_filenames(TestKind::Subtest, &layout)
            .unwrap()
            .iter()
            .map(|p| SubtestDoc::name_for(TestKind::Subtest, &layout, p))
            .collect();
        assert_eq!(names, ["docker_cli/ps", "docker_cli/run", "example"]);
        assert!(SubtestDoc::module_filenames(TestKind::Pretest, &layout)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn render_with_configuration() {
        let (_dir, layout) = tree();
        let doc = SubtestDoc::new_by_name(TestKind::Subtest, "docker_cli/run", &layout).unwrap();
        let defaults = defaults(&layout);
        let out = doc.render(&defaults, Conversion::Identity).unwrap();
        assert!(out.starts_with("``docker_cli/run`` Subtest\n====="));
        assert!(out.contains("Runs a container."));
        assert!(out.contains("Configuration\n---------------\n\n\n*  ``image`` : (``busybox``) Image to run"));
    }

    #[test]
    fn render_without_ini_adds_note() {
        let (_dir, layout) = tree();
        let doc = SubtestDoc::new_by_name(TestKind::Subtest, "docker_cli/ps", &layout).unwrap();
        let out = doc.render(&defaults(&layout), Conversion::Identity).unwrap();
        assert!(out.ends_with(":Note: Subtest does not have any default configuration"));
    }

    #[test]
    fn configuration_can_be_disabled() {
        let (_dir, layout) = tree();
        let doc = SubtestDoc::new_by_name(TestKind::Subtest, "docker_cli/run", &layout)
            .unwrap()
            .without_configuration();
        let out = doc.render(&defaults(&layout), Conversion::Identity).unwrap();
        assert!(!out.contains("Configuration"));
        assert!(out.ends_with("Long."));
    }

    #[test]
    fn summary_html_drops_detail() {
        let (_dir, layout) = tree();
        let doc = SubtestDoc::new_by_name(TestKind::Subtest, "docker_cli/run", &layout).unwrap();
        let out = doc.render(&defaults(&layout), Conversion::HtmlSummary).unwrap();
        assert!(out.starts_with("<h1 class=\"title\"><code class=\"docutils literal\">docker_cli/run</code> Subtest</h1>"));
        assert!(out.contains("Runs a container."));
        assert!(!out.contains("Long."));
        assert!(!out.contains("busybox"));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let (_dir, layout) = tree();
        let err = SubtestDoc::new_by_name(TestKind::Subtest, "nope", &layout).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn combined_docs_sorted_and_filtered() {
        let (_dir, layout) = tree();
        let docs = SubtestDocs::new(TestKind::Subtest, &layout);
        assert_eq!(
            docs.fmt().unwrap(),
            ".. contents::\n   :depth: 1\n   :local:\n\n%(docker_cli/ps)s\n\n%(docker_cli/run)s\n"
        );
        let out = docs.render(&defaults(&layout), Conversion::Identity).unwrap();
        let ps = out.find("``docker_cli/ps`` Subtest").unwrap();
        let run = out.find("``docker_cli/run`` Subtest").unwrap();
        assert!(ps < run);
        assert!(!out.contains("Example"));
    }

    #[test]
    fn combined_docs_custom_exclude_and_no_contents() {
        let (_dir, layout) = tree();
        let docs = SubtestDocs::new(TestKind::Subtest, &layout)
            .exclude(["docker_cli/ps"])
            .contents(false);
        assert_eq!(docs.fmt().unwrap(), "%(docker_cli/run)s\n\n%(example)s\n");
        assert_eq!(docs.names_filenames().unwrap().len(), 3);
    }

    #[test]
    fn combined_html_has_contents() {
        let (_dir, layout) = tree();
        let out = SubtestDocs::new(TestKind::Subtest, &layout)
            .render(&defaults(&layout), Conversion::Html)
            .unwrap();
        assert!(out.starts_with("<div class=\"contents local topic\" id=\"contents\">"));
        assert!(out.contains("href=\"#docker-cli-ps-subtest\""));
    }
}
