//! Plain text writer with reStructuredText-like layout.

use crate::markup::{Document, Inline, Node, TocEntry};
use crate::render::Writer;

/// Underline characters by section depth; deeper levels reuse the last.
const UNDERLINES: &[char] = &['=', '-', '~', '^', '"'];

pub struct TextWriter;

impl Writer for TextWriter {
    fn write(&self, doc: &Document) -> String {
        let mut blocks = Vec::new();
        if let Some(ref title) = doc.title {
            let text = inline_text(title);
            let bar = "=".repeat(text.chars().count());
            blocks.push(format!("{bar}\n{text}\n{bar}"));
        }
        blocks.extend(doc.children.iter().map(|node| block_text(node, 1)));
        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }
}

fn block_text(node: &Node, depth: usize) -> String {
    match node {
        Node::Section(section) => {
            let title = inline_text(&section.title);
            let ch = UNDERLINES[(depth - 1).min(UNDERLINES.len() - 1)];
            let mut parts = vec![format!(
                "{title}\n{}",
                ch.to_string().repeat(title.chars().count())
            )];
            parts.extend(section.children.iter().map(|c| block_text(c, depth + 1)));
            parts.join("\n\n")
        }
        Node::Paragraph(inlines) => inline_text(inlines),
        Node::BulletList(items) => items
            .iter()
            .map(|item| hang(&body_text(item, depth), "* ", "  "))
            .collect::<Vec<_>>()
            .join("\n"),
        Node::EnumeratedList(items) => items
            .iter()
            .map(|item| hang(&body_text(item, depth), "#. ", "   "))
            .collect::<Vec<_>>()
            .join("\n"),
        Node::FieldList(fields) => fields
            .iter()
            .map(|field| {
                let body = body_text(&field.body, depth);
                hang(&body, &format!(":{}: ", field.name), "   ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Node::LiteralBlock(text) => format!("::\n\n{}", hang(text, "    ", "    ")),
        Node::BlockQuote(body) => {
            let text = body_text(body, depth);
            hang(&text, "    ", "    ")
        }
        Node::Admonition { kind, body } => {
            let text = body_text(body, depth);
            format!(".. {kind}::\n\n{}", hang(&text, "   ", "   "))
        }
        Node::Contents { entries, .. } => toc_text(entries),
    }
}

fn body_text(body: &[Node], depth: usize) -> String {
    body.iter()
        .map(|node| block_text(node, depth))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn toc_text(entries: &[TocEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let line = format!("* {}", inline_text(&entry.title));
            if entry.children.is_empty() {
                line
            } else {
                format!("{line}\n\n{}\n", hang(&toc_text(&entry.children), "  ", "  "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix the first line with `first` and the remaining non-blank lines
/// with `rest`.
fn hang(text: &str, first: &str, rest: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{first}{line}")
            } else if line.trim().is_empty() {
                String::new()
            } else {
                format!("{rest}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline_text(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(text) => text.clone(),
            Inline::Literal(text) => format!("``{text}``"),
            Inline::Emphasis(text) => format!("*{text}*"),
            Inline::Strong(text) => format!("**{text}**"),
            Inline::Interpreted(text) => format!("`{text}`"),
            Inline::Reference(text) => format!("`{text}`_"),
            Inline::Role { role, text, target } => match target {
                Some(target) if target != text => format!(":{role}:`{text} <{target}>`"),
                _ => format!(":{role}:`{text}`"),
            },
        })
        .collect()
}
