//! Block-level parsing: sections, paragraphs, lists, field lists, literal
//! blocks, block quotes and a handful of directives.

use super::inline::parse_inline;
use super::{Document, Field, Node, Section, TocEntry};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const TAB_WIDTH: usize = 8;

const ADORNMENT_CHARS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const ADMONITIONS: &[&str] = &[
    "attention",
    "caution",
    "danger",
    "error",
    "hint",
    "important",
    "note",
    "tip",
    "warning",
];

static RE_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([*+-])( +|$)").unwrap());

static RE_ENUMERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#|\d+|[A-Za-z])[.)]( +|$)").unwrap());

static RE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([^:\s][^:]*):( +|$)").unwrap());

static RE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+([A-Za-z][\w-]*)::(?:\s+(.*))?$").unwrap());

static RE_DIRECTIVE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([\w-]+):(?:\s+(.*))?$").unwrap());

/// Adornment character plus whether the title carries an overline.
type Style = (char, bool);

enum Block {
    Node(Node),
    Title { level: usize, text: String },
}

/// Parse text into a document tree.
///
/// Section levels follow the order in which adornment styles first appear.
/// A document consisting of one top-level section has that section's title
/// promoted to the document title. `contents` directives are resolved
/// against the sections that follow them.
pub fn parse(text: &str) -> Document {
    let lines: Vec<String> = text.lines().map(expand_tabs).collect();
    let mut parser = BlockParser::default();
    let blocks = parser.blocks(&lines, true);

    let mut doc = Document {
        title: None,
        children: nest(blocks),
    };
    promote_title(&mut doc);
    resolve_contents(&mut doc.children);
    doc
}

#[derive(Default)]
struct BlockParser {
    styles: Vec<Style>,
}

impl BlockParser {
    fn blocks(&mut self, lines: &[String], top: bool) -> Vec<Block> {
        let mut out = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].as_str();
            if is_blank(line) {
                i += 1;
                continue;
            }

            if indent_of(line) > 0 {
                let end = indented_end(lines, i);
                let body = dedent(&lines[i..end]);
                out.push(Block::Node(Node::BlockQuote(self.nodes(&body))));
                i = end;
                continue;
            }

            if top {
                if let Some((level, text, used)) = self.title_at(lines, i) {
                    out.push(Block::Title { level, text });
                    i += used;
                    continue;
                }
            }

            // Transition line.
            if adornment(line).is_some() && line.chars().count() >= 4 {
                i += 1;
                continue;
            }

            if line == ".." || line.starts_with(".. ") {
                let end = indented_end(lines, i + 1);
                if let Some(node) = self.explicit(line, &lines[i + 1..end]) {
                    out.push(Block::Node(node));
                }
                i = end;
                continue;
            }

            if RE_BULLET.is_match(line) {
                let (items, end) = self.list(lines, i, &RE_BULLET);
                out.push(Block::Node(Node::BulletList(items)));
                i = end;
                continue;
            }

            if RE_ENUMERATOR.is_match(line) {
                let (items, end) = self.list(lines, i, &RE_ENUMERATOR);
                out.push(Block::Node(Node::EnumeratedList(items)));
                i = end;
                continue;
            }

            if RE_FIELD.is_match(line) {
                let (fields, end) = self.fields(lines, i);
                out.push(Block::Node(Node::FieldList(fields)));
                i = end;
                continue;
            }

            let (nodes, end) = self.paragraph(lines, i);
            out.extend(nodes.into_iter().map(Block::Node));
            i = end;
        }
        out
    }

    /// Parse a nested body; section titles are not recognized there.
    fn nodes(&mut self, lines: &[String]) -> Vec<Node> {
        self.blocks(lines, false)
            .into_iter()
            .filter_map(|block| match block {
                Block::Node(node) => Some(node),
                Block::Title { .. } => None,
            })
            .collect()
    }

    fn level(&mut self, style: Style) -> usize {
        match self.styles.iter().position(|s| *s == style) {
            Some(index) => index + 1,
            None => {
                self.styles.push(style);
                self.styles.len()
            }
        }
    }

    /// Recognize a section title at `i`; returns level, title text and the
    /// number of lines consumed.
    fn title_at(&mut self, lines: &[String], i: usize) -> Option<(usize, String, usize)> {
        let line = lines[i].as_str();
        if let Some(over) = adornment(line) {
            let text = lines.get(i + 1)?;
            let under = lines.get(i + 2)?;
            if is_blank(text) || adornment(under) != Some(over) {
                return None;
            }
            return Some((self.level((over, true)), text.trim().to_string(), 3));
        }

        let under = lines.get(i + 1)?;
        let ch = adornment(under)?;
        let width = under.chars().count();
        if width < 4 && width < line.trim().chars().count() {
            return None;
        }
        Some((self.level((ch, false)), line.trim().to_string(), 2))
    }

    fn paragraph(&mut self, lines: &[String], start: usize) -> (Vec<Node>, usize) {
        let mut end = start;
        while end < lines.len() && !is_blank(&lines[end]) && indent_of(&lines[end]) == 0 {
            end += 1;
        }
        let mut text = lines[start..end].join("\n");
        let mut nodes = Vec::new();
        let mut literal = None;

        if text.ends_with("::") {
            let body_start = skip_blank(lines, end);
            if body_start < lines.len() && indent_of(&lines[body_start]) > 0 {
                let body_end = indented_end(lines, body_start);
                literal = Some(dedent(&lines[body_start..body_end]).join("\n"));
                end = body_end;
            }
            text = strip_literal_marker(&text);
        }

        if !text.trim().is_empty() {
            nodes.push(Node::Paragraph(parse_inline(&text)));
        }
        if let Some(literal) = literal {
            nodes.push(Node::LiteralBlock(literal));
        }
        (nodes, end)
    }

    fn list(&mut self, lines: &[String], start: usize, marker: &Regex) -> (Vec<Vec<Node>>, usize) {
        let mut items = Vec::new();
        let mut bullet: Option<char> = None;
        let mut i = start;

        while i < lines.len() {
            let line = lines[i].as_str();
            let Some(caps) = marker.captures(line) else {
                break;
            };
            if std::ptr::eq(marker, &*RE_BULLET) {
                let first_char = line.chars().next();
                if bullet.is_some_and(|b| Some(b) != first_char) {
                    break;
                }
                bullet = first_char;
            }

            let column = caps[0].len();
            let end = indented_end(lines, i + 1);
            let body = item_body(&line[column..], &lines[i + 1..end], column);
            items.push(self.nodes(&body));
            i = skip_blank(lines, end);
        }
        (items, i)
    }

    fn fields(&mut self, lines: &[String], start: usize) -> (Vec<Field>, usize) {
        let mut fields = Vec::new();
        let mut i = start;

        while i < lines.len() {
            let line = lines[i].as_str();
            let Some(caps) = RE_FIELD.captures(line) else {
                break;
            };
            let name = caps[1].trim().to_string();
            let end = indented_end(lines, i + 1);
            let mut body: Vec<String> = Vec::new();
            let first = line[caps[0].len()..].trim();
            if !first.is_empty() {
                body.push(first.to_string());
            }
            body.extend(dedent(&lines[i + 1..end]));
            fields.push(Field {
                name,
                body: self.nodes(&body),
            });
            i = skip_blank(lines, end);
        }
        (fields, i)
    }

    /// Explicit markup: directives become nodes, comments and targets are
    /// dropped.
    fn explicit(&mut self, first: &str, body: &[String]) -> Option<Node> {
        let Some(caps) = RE_DIRECTIVE.captures(first) else {
            debug!(line = first, "skipping comment");
            return None;
        };
        let name = caps[1].to_lowercase();
        let argument = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        let body = dedent(body);

        match name.as_str() {
            "contents" => {
                let mut depth = None;
                let mut local = false;
                for line in &body {
                    let Some(option) = RE_DIRECTIVE_OPTION.captures(line.trim()) else {
                        continue;
                    };
                    match &option[1] {
                        "depth" => {
                            depth = option.get(2).and_then(|v| v.as_str().trim().parse().ok())
                        }
                        "local" => local = true,
                        _ => {}
                    }
                }
                Some(Node::Contents {
                    depth,
                    local,
                    entries: Vec::new(),
                })
            }
            kind if ADMONITIONS.contains(&kind) => {
                let mut content = Vec::new();
                if !argument.is_empty() {
                    content.push(argument.to_string());
                }
                content.extend(body);
                Some(Node::Admonition {
                    body: self.nodes(&content),
                    kind: name,
                })
            }
            _ => {
                debug!(directive = %name, "skipping unsupported directive");
                None
            }
        }
    }
}

fn nest(blocks: Vec<Block>) -> Vec<Node> {
    let mut root = Vec::new();
    let mut open: Vec<(usize, Section)> = Vec::new();

    for block in blocks {
        match block {
            Block::Node(node) => match open.last_mut() {
                Some((_, section)) => section.children.push(node),
                None => root.push(node),
            },
            Block::Title { level, text } => {
                while open.last().is_some_and(|(l, _)| *l >= level) {
                    close(&mut open, &mut root);
                }
                open.push((level, Section::new(&text)));
            }
        }
    }
    while !open.is_empty() {
        close(&mut open, &mut root);
    }
    root
}

fn close(open: &mut Vec<(usize, Section)>, root: &mut Vec<Node>) {
    if let Some((_, section)) = open.pop() {
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(Node::Section(section)),
            None => root.push(Node::Section(section)),
        }
    }
}

fn promote_title(doc: &mut Document) {
    if !matches!(doc.children.as_slice(), [Node::Section(_)]) {
        return;
    }
    if let Some(Node::Section(section)) = doc.children.pop() {
        doc.title = Some(section.title);
        doc.children = section.children;
    }
}

fn resolve_contents(nodes: &mut [Node]) {
    for k in 0..nodes.len() {
        let (head, tail) = nodes.split_at_mut(k + 1);
        match &mut head[k] {
            Node::Contents { depth, entries, .. } => {
                *entries = toc(tail, depth.unwrap_or(usize::MAX));
            }
            Node::Section(section) => resolve_contents(&mut section.children),
            _ => {}
        }
    }
}

fn toc(nodes: &[Node], depth: usize) -> Vec<TocEntry> {
    if depth == 0 {
        return Vec::new();
    }
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Section(section) => Some(TocEntry {
                id: section.ids.first().cloned().unwrap_or_default(),
                title: section.title.clone(),
                children: toc(&section.children, depth - 1),
            }),
            _ => None,
        })
        .collect()
}

fn item_body(first: &str, rest: &[String], column: usize) -> Vec<String> {
    if first.trim().is_empty() {
        return dedent(rest);
    }
    let mut body = vec![first.to_string()];
    body.extend(rest.iter().map(|line| {
        let strip = indent_of(line).min(column);
        line[strip..].to_string()
    }));
    body
}

fn strip_literal_marker(text: &str) -> String {
    let trimmed = text.trim_end();
    let head = &trimmed[..trimmed.len() - 2];
    if head.trim().is_empty() {
        String::new()
    } else if head.ends_with(char::is_whitespace) {
        head.trim_end().to_string()
    } else {
        format!("{head}:")
    }
}

/// A line made of one repeated punctuation character, at least two long.
fn adornment(line: &str) -> Option<char> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !ADORNMENT_CHARS.contains(first) || line.chars().count() < 2 {
        return None;
    }
    chars.all(|c| c == first).then_some(first)
}

/// Index just past the indented block starting at `start`, excluding
/// trailing blank lines.
fn indented_end(lines: &[String], start: usize) -> usize {
    let mut end = start;
    for (j, line) in lines.iter().enumerate().skip(start) {
        if is_blank(line) {
            continue;
        }
        if indent_of(line) == 0 {
            break;
        }
        end = j + 1;
    }
    end
}

fn skip_blank(lines: &[String], mut i: usize) -> usize {
    while i < lines.len() && is_blank(&lines[i]) {
        i += 1;
    }
    i
}

fn dedent(lines: &[String]) -> Vec<String> {
    let min = lines
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| indent_of(line))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                String::new()
            } else {
                line[min..].to_string()
            }
        })
        .collect()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub(crate) fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - col % TAB_WIDTH;
            out.push_str(&" ".repeat(pad));
            col += pad;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::inline::astext;
    use crate::markup::Inline;

    fn section(node: &Node) -> &Section {
        match node {
            Node::Section(s) => s,
            other => panic!("expected section, got {other:?}"),
        }
    }

    fn para_text(node: &Node) -> String {
        match node {
            Node::Paragraph(inlines) => astext(inlines),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn sections_nest_by_first_seen_style() {
        let doc = parse("One\n===\n\nSub\n---\n\ntext\n\nTwo\n===\n\nmore\n");
        assert!(doc.title.is_none());
        assert_eq!(doc.children.len(), 2);
        let one = section(&doc.children[0]);
        assert_eq!(one.names, ["one"]);
        let sub = section(&one.children[0]);
        assert_eq!(sub.ids, ["sub"]);
        assert_eq!(para_text(&sub.children[0]), "text");
        assert_eq!(para_text(&section(&doc.children[1]).children[0]), "more");
    }

    #[test]
    fn lone_section_becomes_title() {
        let doc = parse("``a/b`` Subtest\n==========\n\nSummary\n-------\n\nHello\n");
        let title = doc.title.as_ref().map(|t| astext(t));
        assert_eq!(title.as_deref(), Some("a/b Subtest"));
        assert_eq!(section(&doc.children[0]).names, ["summary"]);
    }

    #[test]
    fn overline_is_a_distinct_style() {
        let doc = parse("=====\nTop\n=====\n\nA\n=====\n\nx\n\nB\n=====\n\ny\n");
        let top = doc.title.as_ref().map(|t| astext(t));
        assert_eq!(top.as_deref(), Some("Top"));
        assert_eq!(doc.children.len(), 2);
    }

    #[test]
    fn bullet_items_with_continuations() {
        let doc = parse("*  daemon --tlscert=a.crt\n*  client --tls,\\\n   --tlskey=b.key\n");
        let Node::BulletList(items) = &doc.children[0] else {
            panic!("expected bullet list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(para_text(&items[1][0]), "client --tls,--tlskey=b.key");
    }

    #[test]
    fn title_directly_followed_by_list() {
        let doc = parse("Steps\n~~~~~\n#. first\n#. second\n\nNext\n~~~~\n\nbody\n");
        let steps = section(&doc.children[0]);
        assert!(matches!(&steps.children[0], Node::EnumeratedList(items) if items.len() == 2));
    }

    #[test]
    fn field_list() {
        let doc = parse(":Sub-subtests: ``a``, ``b``\n:Note: one\n   two\n");
        let Node::FieldList(fields) = &doc.children[0] else {
            panic!("expected field list");
        };
        assert_eq!(fields[0].name, "Sub-subtests");
        assert_eq!(fields[1].name, "Note");
        assert_eq!(para_text(&fields[1].body[0]), "one\ntwo");
    }

    #[test]
    fn literal_block_after_double_colon() {
        let doc = parse("Run this::\n\n    docker ps\n      -a\n\nafter\n");
        assert_eq!(para_text(&doc.children[0]), "Run this:");
        assert_eq!(doc.children[1], Node::LiteralBlock("docker ps\n  -a".to_string()));
        assert_eq!(para_text(&doc.children[2]), "after");
    }

    #[test]
    fn contents_lists_following_sections() {
        let doc = parse(
            ".. contents::\n   :depth: 1\n   :local:\n\nA\n--\n\nx\n\nInner\n~~~~~\n\ny\n\nB\n--\n\nz\n",
        );
        let Node::Contents { depth, local, entries } = &doc.children[0] else {
            panic!("expected contents");
        };
        assert_eq!(*depth, Some(1));
        assert!(*local);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(entries[0].children.is_empty());
    }

    #[test]
    fn comments_and_unknown_directives_are_dropped() {
        let doc = parse(".. a comment\n   still comment\n\n.. image:: x.png\n\ntext\n");
        assert_eq!(doc.children.len(), 1);
        assert_eq!(para_text(&doc.children[0]), "text");
    }

    #[test]
    fn admonition_keeps_body() {
        let doc = parse(".. note:: heads up\n   more\n");
        let Node::Admonition { kind, body } = &doc.children[0] else {
            panic!("expected admonition");
        };
        assert_eq!(kind, "note");
        assert_eq!(para_text(&body[0]), "heads up\nmore");
    }

    #[test]
    fn indented_text_is_block_quote() {
        let doc = parse("para\n\n    quoted\n");
        assert!(matches!(&doc.children[1], Node::BlockQuote(inner) if inner.len() == 1));
    }

    #[test]
    fn tabs_expand_to_eight() {
        assert_eq!(expand_tabs("a\tb"), "a       b");
        assert_eq!(expand_tabs("\tx"), "        x");
    }

    #[test]
    fn inline_markup_in_titles() {
        let doc = parse("``x`` **y**\n-----------\n\nbody\n\nOther\n-----\n");
        let first = section(&doc.children[0]);
        assert_eq!(
            first.title,
            [
                Inline::Literal("x".to_string()),
                Inline::Text(" ".to_string()),
                Inline::Strong("y".to_string()),
            ]
        );
    }
}
