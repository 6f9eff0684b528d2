//! Composer: template substitution followed by a format conversion.

pub mod html;
pub mod template;
pub mod text;

use crate::error::Result;
use crate::markup::{self, Document, SectionFilter, Visitor};
use std::fmt;
use tracing::trace;

pub use template::{substitute, MissingKey, Substitutions};

/// Closure producing the value for the key it is registered under.
pub type SubMethod<'a> = Box<dyn Fn(&str) -> Result<String> + 'a>;

/// Closure bound to its own arguments, producing a `(key, value)` pair.
pub type SubMethodArgs<'a> = Box<dyn Fn() -> Result<(String, String)> + 'a>;

/// Trait for writing a document tree in a specific output format.
pub trait Writer {
    fn write(&self, doc: &Document) -> String;
}

/// Output formats selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Rst,
    Html,
    Text,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rst" | "restructuredtext" => Some(OutputFormat::Rst),
            "html" => Some(OutputFormat::Html),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            OutputFormat::Rst => "rst",
            OutputFormat::Html => "html",
            OutputFormat::Text => "txt",
        }
    }

    /// Conversion producing this format. Summaries of markup come out as
    /// text, since the filtered tree has to be written back somehow.
    pub fn conversion<'a>(self, summary: bool) -> Conversion<'a> {
        match (self, summary) {
            (OutputFormat::Rst, false) => Conversion::Identity,
            (OutputFormat::Html, false) => Conversion::Html,
            (OutputFormat::Html, true) => Conversion::HtmlSummary,
            (OutputFormat::Text, false) => Conversion::Text,
            (OutputFormat::Rst | OutputFormat::Text, true) => Conversion::TextSummary,
        }
    }
}

/// Final step applied to the substituted text.
#[derive(Default)]
pub enum Conversion<'a> {
    #[default]
    Identity,
    Html,
    HtmlSummary,
    Text,
    TextSummary,
    Custom(Box<dyn Fn(&str) -> Result<String> + 'a>),
}

impl Conversion<'_> {
    pub fn apply(&self, input: &str) -> Result<String> {
        let converted = match self {
            Conversion::Identity => input.to_string(),
            Conversion::Html => doctree_to_html(&rst_to_doctree(input, None)),
            Conversion::HtmlSummary => {
                let mut filter = SectionFilter::default();
                doctree_to_html(&rst_to_doctree(input, Some(&mut filter)))
            }
            Conversion::Text => doctree_to_text(&rst_to_doctree(input, None)),
            Conversion::TextSummary => {
                let mut filter = SectionFilter::default();
                doctree_to_text(&rst_to_doctree(input, Some(&mut filter)))
            }
            Conversion::Custom(convert) => convert(input)?,
        };
        Ok(converted)
    }
}

impl fmt::Debug for Conversion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Conversion::Identity => "Identity",
            Conversion::Html => "Html",
            Conversion::HtmlSummary => "HtmlSummary",
            Conversion::Text => "Text",
            Conversion::TextSummary => "TextSummary",
            Conversion::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

/// Everything needed to produce one rendered document.
///
/// Substitutions are merged in a fixed order, later sources overriding
/// earlier ones: `sub_str`, then `sub_method`, then `sub_method_args`.
pub struct Composer<'a> {
    fmt: String,
    sub_str: Substitutions,
    sub_method: Vec<(String, SubMethod<'a>)>,
    sub_method_args: Vec<SubMethodArgs<'a>>,
    missing: MissingKey,
    conversion: Conversion<'a>,
}

impl<'a> Composer<'a> {
    pub fn new(fmt: impl Into<String>) -> Self {
        Self {
            fmt: fmt.into(),
            sub_str: Substitutions::new(),
            sub_method: Vec::new(),
            sub_method_args: Vec::new(),
            missing: MissingKey::default(),
            conversion: Conversion::default(),
        }
    }

    pub fn sub_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.sub_str.insert(key.into(), value.into());
        self
    }

    pub fn sub_method(
        mut self,
        key: impl Into<String>,
        method: impl Fn(&str) -> Result<String> + 'a,
    ) -> Self {
        self.sub_method.push((key.into(), Box::new(method)));
        self
    }

    pub fn sub_method_args(mut self, method: impl Fn() -> Result<(String, String)> + 'a) -> Self {
        self.sub_method_args.push(Box::new(method));
        self
    }

    pub fn missing(mut self, policy: MissingKey) -> Self {
        self.missing = policy;
        self
    }

    pub fn conversion(mut self, conversion: Conversion<'a>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn template(&self) -> &str {
        &self.fmt
    }

    /// Merged substitution map; calls every registered closure.
    pub fn substitutions(&self) -> Result<Substitutions> {
        let mut subs = self.sub_str.clone();
        for (key, method) in &self.sub_method {
            let value = method(key)?;
            subs.insert(key.clone(), value);
        }
        for method in &self.sub_method_args {
            let (key, value) = method()?;
            subs.insert(key, value);
        }
        Ok(subs)
    }

    /// The template after substitution, before conversion.
    pub fn compose(&self) -> Result<String> {
        let subs = self.substitutions()?;
        if subs.is_empty() {
            return Ok(self.fmt.clone());
        }
        trace!(keys = subs.len(), "substituting template");
        substitute(&self.fmt, &subs, self.missing)
    }
}

impl fmt::Debug for Composer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("fmt", &self.fmt)
            .field("sub_str", &self.sub_str)
            .field(
                "sub_method",
                &self.sub_method.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("sub_method_args", &self.sub_method_args.len())
            .field("missing", &self.missing)
            .field("conversion", &self.conversion)
            .finish()
    }
}

/// Substitute, convert, and trim surrounding whitespace.
pub fn render(composer: &Composer) -> Result<String> {
    let text = composer.compose()?;
    let converted = composer.conversion.apply(&text)?;
    Ok(converted.trim().to_string())
}

/// Parse markup into a tree, optionally running `visitor` over it.
pub fn rst_to_doctree(rst: &str, visitor: Option<&mut dyn Visitor>) -> Document {
    let mut doc = markup::parse(rst);
    if let Some(visitor) = visitor {
        markup::walk(&mut doc, visitor);
    }
    doc
}

pub fn doctree_to_html(doc: &Document) -> String {
    html::HtmlWriter.write(doc)
}

pub fn doctree_to_text(doc: &Document) -> String {
    text::TextWriter.write(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TemplateFault};

    #[test]
    fn empty_map_uses_template_verbatim() {
        let composer = Composer::new("  100%(foo)s  ");
        assert_eq!(render(&composer).unwrap(), "100%(foo)s");
    }

    #[test]
    fn static_substitution() {
        let composer = Composer::new("%(foo)s").sub_str("foo", "foobar");
        assert_eq!(render(&composer).unwrap(), "foobar");
    }

    #[test]
    fn method_receives_its_key() {
        let composer = Composer::new("%(foo)s").sub_method("foo", |key| Ok(format!("{key}bar")));
        assert_eq!(render(&composer).unwrap(), "foobar");
    }

    #[test]
    fn bound_arguments() {
        let (key, value) = ("foo".to_string(), "bar".to_string());
        let composer = Composer::new("%(foo)s%(foo)s")
            .sub_method_args(move || Ok((key.clone(), format!("foo{value}"))));
        assert_eq!(render(&composer).unwrap(), "foobarfoobar");
    }

    #[test]
    fn later_sources_win() {
        let composer = Composer::new("%(k)s")
            .sub_str("k", "static")
            .sub_method("k", |_| Ok("method".to_string()))
            .sub_method_args(|| Ok(("k".to_string(), "args".to_string())));
        assert_eq!(render(&composer).unwrap(), "args");

        let composer = Composer::new("%(k)s")
            .sub_str("k", "static")
            .sub_method("k", |_| Ok("method".to_string()));
        assert_eq!(render(&composer).unwrap(), "method");
    }

    #[test]
    fn missing_key_policies() {
        let passthrough = Composer::new("%(bad)s %(foo)s").sub_str("foo", "bar");
        assert_eq!(render(&passthrough).unwrap(), "%(bad)s bar");

        let strict = Composer::new("%(bad)sfoo")
            .sub_str("foo", "bar")
            .missing(MissingKey::Error);
        let err = render(&strict).unwrap_err();
        assert!(matches!(
            err,
            Error::Template {
                fault: TemplateFault::MissingKey(_),
                ..
            }
        ));
    }

    #[test]
    fn method_errors_propagate() {
        let composer = Composer::new("%(x)s").sub_method("x", |key| {
            Err(Error::NotFound {
                what: "value",
                name: key.to_string(),
                base: ".".into(),
            })
        });
        assert!(render(&composer).unwrap_err().is_not_found());
    }

    #[test]
    fn custom_conversion() {
        let composer = Composer::new("%(foo)s")
            .sub_str("foo", "bar")
            .conversion(Conversion::Custom(Box::new(|s: &str| Ok(format!(" [{s}] ")))));
        assert_eq!(render(&composer).unwrap(), "[bar]");
    }

    const DOCSTRING: &str = "\
``t/x`` Subtest
===============

Summary
-------

Short summary.

Operational Detail
------------------

Details here.

Prerequisites
-------------

Docker.
";

    #[test]
    fn html_conversion_keeps_sections() {
        let html = render(&Composer::new(DOCSTRING).conversion(Conversion::Html)).unwrap();
        assert!(html.starts_with("<h1 class=\"title\">"));
        assert!(html.contains("id=\"summary\""));
        assert!(html.contains("id=\"operational-detail\""));
        assert!(html.contains("id=\"prerequisites\""));
    }

    #[test]
    fn summaries_drop_excluded_sections() {
        let html = render(&Composer::new(DOCSTRING).conversion(Conversion::HtmlSummary)).unwrap();
        assert!(html.contains("Short summary."));
        assert!(!html.contains("operational-detail"));
        assert!(!html.contains("Docker."));

        let text = render(&Composer::new(DOCSTRING).conversion(Conversion::TextSummary)).unwrap();
        assert!(text.contains("Short summary."));
        assert!(!text.contains("Details here."));
        assert!(!text.contains("Prerequisites"));
    }

    #[test]
    fn format_names() {
        assert_eq!(OutputFormat::from_name("html"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::from_name("txt"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_name("pdf"), None);
        assert!(matches!(OutputFormat::Rst.conversion(false), Conversion::Identity));
        assert!(matches!(OutputFormat::Rst.conversion(true), Conversion::TextSummary));
    }
}
