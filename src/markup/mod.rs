//! Document tree for the reStructuredText subset used in test docstrings and
//! generated configuration docs.

pub mod block;
pub mod inline;
pub mod visit;

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

pub use block::parse;
pub use visit::{walk, SectionFilter, SectionNames, Visitor, Walk};

static RE_NON_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

static RE_ID_ENDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-0-9]+|-+$").unwrap());

/// Parsed document. `title` is set when a lone top-level section was
/// promoted to the document title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub title: Option<Vec<Inline>>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Section(Section),
    Paragraph(Vec<Inline>),
    BulletList(Vec<Vec<Node>>),
    EnumeratedList(Vec<Vec<Node>>),
    FieldList(Vec<Field>),
    LiteralBlock(String),
    BlockQuote(Vec<Node>),
    Admonition { kind: String, body: Vec<Node> },
    Contents {
        depth: Option<usize>,
        local: bool,
        entries: Vec<TocEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub title: Vec<Inline>,
    pub children: Vec<Node>,
}

impl Section {
    pub fn new(title: &str) -> Self {
        let title = inline::parse_inline(title);
        let text = inline::astext(&title);
        Self {
            ids: vec![make_id(&text)],
            names: vec![normalize_name(&text)],
            title,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub body: Vec<Node>,
}

/// One line of a resolved table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub id: String,
    pub title: Vec<Inline>,
    pub children: Vec<TocEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Literal(String),
    Emphasis(String),
    Strong(String),
    /// `` `text` `` with no role.
    Interpreted(String),
    /// `` `text`_ `` hyperlink reference.
    Reference(String),
    Role {
        role: String,
        text: String,
        target: Option<String>,
    },
}

/// Letters compatibility decomposition leaves without an ASCII base.
const ID_TRANSLATE: &[(char, &str)] = &[
    ('ø', "o"),
    ('đ', "d"),
    ('ħ', "h"),
    ('ı', "i"),
    ('ł', "l"),
    ('ŀ', "l"),
    ('ß', "sz"),
    ('æ', "ae"),
    ('œ', "oe"),
];

/// Identifier form of a name: lowercase, folded to ASCII (accents dropped,
/// other non-ASCII removed), runs of anything but `a-z0-9` become `-`,
/// leading digits/hyphens and trailing hyphens dropped.
pub fn make_id(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match ID_TRANSLATE.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => folded.push_str(to),
            None => folded.extend(c.nfkd().filter(char::is_ascii)),
        }
    }
    let joined = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let id = RE_NON_ID.replace_all(&joined, "-");
    RE_ID_ENDS.replace_all(&id, "").into_owned()
}

/// Lowercase with whitespace runs collapsed to one space.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
