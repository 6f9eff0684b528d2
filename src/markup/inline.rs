//! Inline markup: literals, emphasis, strong, interpreted text, references
//! and roles.

use super::Inline;
use regex::Regex;
use std::sync::LazyLock;

static RE_ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z][\w.+-]*):`([^`]+)`").unwrap());

static RE_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?)\s*<([^<>]+)>$").unwrap());

/// Characters allowed right before an inline start-string.
const OPENERS: &str = "([{<'\"-/:";

/// Characters allowed right after an inline end-string.
const CLOSERS: &str = ".,;:!?)]}>'\"-/\\";

pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let prev = text[..i].chars().next_back();
        let Some(c) = rest.chars().next() else { break };

        if c == '\\' {
            let mut chars = rest[1..].chars();
            match chars.next() {
                Some(n) if n.is_whitespace() => i += 1 + n.len_utf8(),
                Some(n) => {
                    buf.push(n);
                    i += 1 + n.len_utf8();
                }
                None => i += 1,
            }
            continue;
        }

        if can_open(prev) {
            if let Some((node, used)) = markup_at(rest) {
                flush(&mut buf, &mut out);
                out.push(node);
                i += used;
                continue;
            }
        }

        buf.push(c);
        i += c.len_utf8();
    }
    flush(&mut buf, &mut out);
    out
}

/// Plain text of inline nodes, markup removed.
pub fn astext(nodes: &[Inline]) -> String {
    nodes
        .iter()
        .map(|node| match node {
            Inline::Text(t)
            | Inline::Literal(t)
            | Inline::Emphasis(t)
            | Inline::Strong(t)
            | Inline::Interpreted(t)
            | Inline::Reference(t) => t.as_str(),
            Inline::Role { text, .. } => text.as_str(),
        })
        .collect()
}

fn flush(buf: &mut String, out: &mut Vec<Inline>) {
    if !buf.is_empty() {
        out.push(Inline::Text(std::mem::take(buf)));
    }
}

fn can_open(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(p) => p.is_whitespace() || OPENERS.contains(p),
    }
}

/// Recognize inline markup starting at the beginning of `rest`, returning
/// the node and the number of bytes consumed.
fn markup_at(rest: &str) -> Option<(Inline, usize)> {
    if let Some(body) = rest.strip_prefix("``") {
        let (content, used) = delimited(body, "``")?;
        return Some((Inline::Literal(content.to_string()), 2 + used));
    }
    if rest.starts_with(':') {
        let caps = RE_ROLE.captures(rest)?;
        let (text, target) = split_target(&caps[2]);
        let node = Inline::Role {
            role: caps[1].to_string(),
            text,
            target,
        };
        return Some((node, caps[0].len()));
    }
    if let Some(body) = rest.strip_prefix("**") {
        let (content, used) = delimited(body, "**")?;
        return Some((Inline::Strong(content.to_string()), 2 + used));
    }
    if let Some(body) = rest.strip_prefix('*') {
        let (content, used) = delimited(body, "*")?;
        return Some((Inline::Emphasis(content.to_string()), 1 + used));
    }
    if let Some(body) = rest.strip_prefix('`') {
        let (content, used) = delimited(body, "`")?;
        let after = &body[used..];
        let suffix = if after.starts_with("__") {
            2
        } else if after.starts_with('_') {
            1
        } else {
            0
        };
        let consumed = 1 + used + suffix;
        if suffix > 0 {
            let (text, _) = split_target(content);
            return Some((Inline::Reference(text), consumed));
        }
        return Some((Inline::Interpreted(content.to_string()), consumed));
    }
    None
}

/// Find the end-string `delim` closing `body`; returns the content and the
/// bytes consumed including the end-string.
fn delimited<'a>(body: &'a str, delim: &str) -> Option<(&'a str, usize)> {
    let first = body.chars().next()?;
    if first.is_whitespace() || body.starts_with(delim) {
        return None;
    }
    let mut from = 0;
    while let Some(pos) = body[from..].find(delim) {
        let end = from + pos;
        let before = body[..end].chars().next_back();
        let after = body[end + delim.len()..].chars().next();
        let closes_ok = match after {
            None => true,
            Some(a) => a.is_whitespace() || CLOSERS.contains(a) || a == '_',
        };
        if end > 0 && before.is_some_and(|b| !b.is_whitespace()) && closes_ok {
            return Some((&body[..end], end + delim.len()));
        }
        from = end + delim.len();
    }
    None
}

fn split_target(content: &str) -> (String, Option<String>) {
    match RE_TARGET.captures(content) {
        Some(caps) if !caps[1].is_empty() => (caps[1].to_string(), Some(caps[2].to_string())),
        Some(caps) => (caps[2].to_string(), Some(caps[2].to_string())),
        None => (content.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn plain_text() {
        assert_eq!(parse_inline("just words"), [text("just words")]);
    }

    #[test]
    fn literal_and_strong() {
        assert_eq!(
            parse_inline("bar **123456** and ``x = 1``"),
            [
                text("bar "),
                Inline::Strong("123456".to_string()),
                text(" and "),
                Inline::Literal("x = 1".to_string()),
            ]
        );
    }

    #[test]
    fn literal_keeps_markup_characters() {
        assert_eq!(
            parse_inline("(``<None>``)"),
            [
                text("("),
                Inline::Literal("<None>".to_string()),
                text(")"),
            ]
        );
    }

    #[test]
    fn lone_star_is_text() {
        assert_eq!(parse_inline("2 * 3"), [text("2 * 3")]);
        assert_eq!(parse_inline("*inherited*"), [Inline::Emphasis("inherited".to_string())]);
    }

    #[test]
    fn role_with_target() {
        let nodes = parse_inline(":ref:`Overrides default value <default configuration options>`: x");
        assert_eq!(
            nodes[0],
            Inline::Role {
                role: "ref".to_string(),
                text: "Overrides default value".to_string(),
                target: Some("default configuration options".to_string()),
            }
        );
        assert_eq!(nodes[1], text(": x"));
    }

    #[test]
    fn references_and_interpreted() {
        assert_eq!(
            parse_inline("see `docs <http://x>`_ or `title`"),
            [
                text("see "),
                Inline::Reference("docs".to_string()),
                text(" or "),
                Inline::Interpreted("title".to_string()),
            ]
        );
    }

    #[test]
    fn escaped_newline_joins() {
        assert_eq!(
            parse_inline("--tlscert=a.crt,\\\n--tlskey=a.key"),
            [text("--tlscert=a.crt,--tlskey=a.key")]
        );
    }

    #[test]
    fn markup_needs_word_boundary() {
        assert_eq!(parse_inline("a*b*c"), [text("a*b*c")]);
    }

    #[test]
    fn astext_strips_markup() {
        assert_eq!(astext(&parse_inline("``a`` *b* **c**")), "a b c");
    }
}
