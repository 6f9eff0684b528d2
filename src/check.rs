//! Consistency checks over a test tree's documentation.

use crate::docs::config::SUBSUBTESTS_OPTION;
use crate::docs::{ConfigDoc, DefaultDoc, DocLayout, SubtestDoc, TestKind};
use crate::error::Result;
use crate::markup::SectionNames;
use crate::parser::ConfigDocParser;
use crate::render::{render, rst_to_doctree, Conversion};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// Sections every test docstring must have.
pub const REQUIRED_SECTIONS: &[&str] = &["summary", "operational summary"];

/// Canonical order of the sections a docstring may have.
pub const SECTION_ORDER: &[&str] = &[
    "summary",
    "operational summary",
    "operational detail",
    "prerequisites",
];

/// One problem found in a test's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    MissingSection(String),
    ExtraSection(String),
    HardCodedConfiguration,
    OutOfOrder { section: String, position: usize },
    Undocumented(Vec<String>),
    MissingTests(Vec<String>),
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MissingSection(name) => write!(f, "Missing '{}' section", title_case(name)),
            Finding::ExtraSection(name) => {
                write!(f, "Extra nonstandard '{}' section found", title_case(name))
            }
            Finding::HardCodedConfiguration => f.write_str("Hard-coded configuration section found"),
            Finding::OutOfOrder { section, position } => {
                write!(f, "Out of order section: {}.  Should be: #{}", section, position)
            }
            Finding::Undocumented(options) => write!(
                f,
                "Undocumented configuration option(s): {}",
                options.join(", ")
            ),
            Finding::MissingTests(names) => write!(
                f,
                "{} tests are documented, but not present in the file structure.",
                names.join(", ")
            ),
        }
    }
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top-level section names of a test's docstring, configuration left out.
pub fn section_names(doc: &SubtestDoc, defaults: &DefaultDoc) -> Result<Vec<String>> {
    let doc = doc.clone().without_configuration();
    let rst = render(&doc.composer(defaults, Conversion::Identity))?;
    let mut names = SectionNames::default();
    rst_to_doctree(&rst, Some(&mut names));
    Ok(names.names)
}

/// Section-level findings, in the order they are reported.
pub fn section_findings(sections: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for required in REQUIRED_SECTIONS {
        if !sections.iter().any(|s| s == required) {
            findings.push(Finding::MissingSection(required.to_string()));
        }
    }
    let mut extra = BTreeSet::new();
    for section in sections {
        if !SECTION_ORDER.contains(&section.as_str()) && section != "configuration" {
            extra.insert(section.clone());
        }
    }
    findings.extend(extra.into_iter().map(Finding::ExtraSection));
    if sections.iter().any(|s| s == "configuration") {
        findings.push(Finding::HardCodedConfiguration);
    }
    if let Some(finding) = out_of_order(sections) {
        findings.push(finding);
    }
    findings
}

/// The first known section not where the canonical order puts it.
pub fn out_of_order(sections: &[String]) -> Option<Finding> {
    let found: Vec<&str> = sections
        .iter()
        .map(String::as_str)
        .filter(|s| SECTION_ORDER.contains(s))
        .collect();
    let mut expected = found.clone();
    expected.sort_by_key(|s| SECTION_ORDER.iter().position(|o| o == s));
    found
        .iter()
        .zip(&expected)
        .find(|(actual, wanted)| actual != wanted)
        .and_then(|(actual, _)| {
            SECTION_ORDER
                .iter()
                .position(|o| o == actual)
                .map(|index| Finding::OutOfOrder {
                    section: actual.to_string(),
                    position: index + 1,
                })
        })
}

/// Options still carrying the undocumented placeholder, sorted. Defaults
/// and sub-subtest options repeating a subtest option are not counted.
pub fn undocumented_options(parser: &ConfigDocParser, defaults: &DefaultDoc) -> Result<Vec<String>> {
    let subtest = parser.subtest_name()?;
    let mut subtest_options = BTreeSet::new();
    let mut subtest_items = Vec::new();
    let mut subsub_items = Vec::new();
    for item in parser.iter() {
        if defaults.get_default(item.option()).is_some() {
            continue;
        }
        if item.subthing() == subtest {
            if item.option() != SUBSUBTESTS_OPTION {
                subtest_options.insert(item.option());
                subtest_items.push(item);
            }
        } else {
            subsub_items.push(item);
        }
    }
    subsub_items.retain(|item| !subtest_options.contains(item.option()));

    let options: BTreeSet<String> = subtest_items
        .into_iter()
        .chain(subsub_items)
        .filter(|item| !item.is_documented())
        .map(|item| item.option().to_string())
        .collect();
    Ok(options.into_iter().collect())
}

/// Names documented in `rendered` as tests of `kind` but absent from `names`.
pub fn missing_tests(rendered: &str, kind: TestKind, names: &[String]) -> Vec<String> {
    let pattern = format!(r"``([^`\n]+)`` {}\n===", regex::escape(kind.postfix()));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let documented: BTreeSet<&str> = re
        .captures_iter(rendered)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    documented
        .into_iter()
        .filter(|name| !names.iter().any(|n| n == name))
        .map(String::from)
        .collect()
}

/// Check every test of every kind. Findings are paired with the test name;
/// missing-test findings are paired with the kind's directory name.
pub fn check_tree(
    layout: &DocLayout,
    defaults: &DefaultDoc,
    against: Option<&str>,
) -> Result<Vec<(String, Finding)>> {
    let mut findings = Vec::new();
    for kind in TestKind::ALL {
        let mut names = Vec::new();
        for path in SubtestDoc::module_filenames(kind, layout)? {
            let doc = SubtestDoc::new(kind, layout, path)?;
            let name = doc.name().to_string();
            names.push(name.clone());
            if name.contains("example") {
                debug!(name = %name, "skipping example");
                continue;
            }
            let sections = section_names(&doc, defaults)?;
            findings.extend(
                section_findings(&sections)
                    .into_iter()
                    .map(|f| (name.clone(), f)),
            );

            match ConfigDoc::new_by_name(&name, layout) {
                Ok(config) => {
                    let undocumented = undocumented_options(config.parser(), defaults)?;
                    if !undocumented.is_empty() {
                        findings.push((name.clone(), Finding::Undocumented(undocumented)));
                    }
                }
                Err(e) if e.is_not_found() => {
                    warn!(name = %name, "no configuration found");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(rendered) = against {
            let missing = missing_tests(rendered, kind, &names);
            if !missing.is_empty() {
                findings.push((kind.tld_name().to_string(), Finding::MissingTests(missing)));
            }
        }
    }
    Ok(findings)
}
