//! HTML writer: body fragment with docutils-style class names.

use crate::markup::{make_id, Document, Inline, Node, TocEntry};
use crate::render::Writer;

pub struct HtmlWriter;

impl Writer for HtmlWriter {
    fn write(&self, doc: &Document) -> String {
        let mut out = String::new();

        if let Some(ref title) = doc.title {
            out.push_str(&format!("<h1 class=\"title\">{}</h1>\n", inline_html(title)));
        }

        // Sections below a promoted title start one heading level down.
        let depth = if doc.title.is_some() { 2 } else { 1 };
        for node in &doc.children {
            block_html(node, depth, &mut out);
        }
        out
    }
}

fn block_html(node: &Node, depth: usize, out: &mut String) {
    match node {
        Node::Section(section) => {
            let id = section.ids.first().map(String::as_str).unwrap_or_default();
            let level = depth.min(6);
            out.push_str(&format!(
                "<div class=\"section\" id=\"{}\">\n<h{level}>{}</h{level}>\n",
                html_escape(id),
                inline_html(&section.title)
            ));
            for child in &section.children {
                block_html(child, depth + 1, out);
            }
            out.push_str("</div>\n");
        }
        Node::Paragraph(inlines) => {
            out.push_str(&format!("<p>{}</p>\n", inline_html(inlines)));
        }
        Node::BulletList(items) => list_html("<ul class=\"simple\">", "</ul>", items, depth, out),
        Node::EnumeratedList(items) => {
            list_html("<ol class=\"arabic simple\">", "</ol>", items, depth, out)
        }
        Node::FieldList(fields) => {
            out.push_str("<dl class=\"field-list\">\n");
            for field in fields {
                out.push_str(&format!(
                    "<dt>{}</dt>\n<dd>{}</dd>\n",
                    html_escape(&field.name),
                    compact_html(&field.body, depth)
                ));
            }
            out.push_str("</dl>\n");
        }
        Node::LiteralBlock(text) => {
            out.push_str(&format!(
                "<pre class=\"literal-block\">\n{}\n</pre>\n",
                html_escape(text)
            ));
        }
        Node::BlockQuote(body) => {
            out.push_str("<blockquote>\n");
            for child in body {
                block_html(child, depth, out);
            }
            out.push_str("</blockquote>\n");
        }
        Node::Admonition { kind, body } => {
            out.push_str(&format!(
                "<div class=\"admonition {}\">\n<p class=\"admonition-title\">{}</p>\n",
                html_escape(kind),
                html_escape(&capitalize(kind))
            ));
            for child in body {
                block_html(child, depth, out);
            }
            out.push_str("</div>\n");
        }
        Node::Contents { local, entries, .. } => {
            if entries.is_empty() {
                return;
            }
            let class = if *local { "contents local topic" } else { "contents topic" };
            out.push_str(&format!("<div class=\"{class}\" id=\"contents\">\n"));
            toc_html(entries, out);
            out.push_str("</div>\n");
        }
    }
}

fn list_html(open: &str, close: &str, items: &[Vec<Node>], depth: usize, out: &mut String) {
    out.push_str(open);
    out.push('\n');
    for item in items {
        out.push_str(&format!("<li>{}</li>\n", compact_html(item, depth)));
    }
    out.push_str(close);
    out.push('\n');
}

/// A body holding one paragraph renders without the `<p>` wrapper.
fn compact_html(body: &[Node], depth: usize) -> String {
    if let [Node::Paragraph(inlines)] = body {
        return inline_html(inlines);
    }
    let mut out = String::new();
    for node in body {
        block_html(node, depth, &mut out);
    }
    out
}

fn toc_html(entries: &[TocEntry], out: &mut String) {
    out.push_str("<ul class=\"simple\">\n");
    for entry in entries {
        out.push_str(&format!(
            "<li><a class=\"reference internal\" href=\"#{}\">{}</a>",
            html_escape(&entry.id),
            inline_html(&entry.title)
        ));
        if !entry.children.is_empty() {
            out.push('\n');
            toc_html(&entry.children, out);
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
}

fn inline_html(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(text) => html_escape(text),
            Inline::Literal(text) => {
                format!("<code class=\"docutils literal\">{}</code>", html_escape(text))
            }
            Inline::Emphasis(text) => format!("<em>{}</em>", html_escape(text)),
            Inline::Strong(text) => format!("<strong>{}</strong>", html_escape(text)),
            Inline::Interpreted(text) => format!("<cite>{}</cite>", html_escape(text)),
            Inline::Reference(text) => internal_link(text, text),
            Inline::Role { role, text, target } => match role.as_str() {
                "ref" | "doc" => internal_link(text, target.as_deref().unwrap_or(text)),
                _ => format!(
                    "<span class=\"{}\">{}</span>",
                    html_escape(role),
                    html_escape(text)
                ),
            },
        })
        .collect()
}

fn internal_link(text: &str, target: &str) -> String {
    format!(
        "<a class=\"reference internal\" href=\"#{}\">{}</a>",
        html_escape(&make_id(target)),
        html_escape(text)
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
