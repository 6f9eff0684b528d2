//! Tree walking with in-place pruning.

use super::{make_id, Document, Node, Section};

/// Default section names dropped from summaries.
pub const SUMMARY_EXCLUDES: &[&str] = &["operational detail", "prerequisites", "configuration"];

/// What the walker does after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipSubtree,
    /// Remove the node from its parent.
    Detach,
}

pub trait Visitor {
    fn visit_section(&mut self, _section: &Section) -> Walk {
        Walk::Continue
    }

    fn visit_node(&mut self, _node: &Node) -> Walk {
        Walk::Continue
    }
}

/// Depth-first walk over the document body. The document title is not
/// visited.
pub fn walk(doc: &mut Document, visitor: &mut dyn Visitor) {
    walk_nodes(&mut doc.children, visitor);
}

fn walk_nodes(nodes: &mut Vec<Node>, visitor: &mut dyn Visitor) {
    let mut i = 0;
    while i < nodes.len() {
        let signal = match &nodes[i] {
            Node::Section(section) => visitor.visit_section(section),
            other => visitor.visit_node(other),
        };
        match signal {
            Walk::Detach => {
                nodes.remove(i);
                continue;
            }
            Walk::SkipSubtree => {}
            Walk::Continue => descend(&mut nodes[i], visitor),
        }
        i += 1;
    }
}

fn descend(node: &mut Node, visitor: &mut dyn Visitor) {
    match node {
        Node::Section(section) => walk_nodes(&mut section.children, visitor),
        Node::BulletList(items) | Node::EnumeratedList(items) => {
            for item in items {
                walk_nodes(item, visitor);
            }
        }
        Node::FieldList(fields) => {
            for field in fields {
                walk_nodes(&mut field.body, visitor);
            }
        }
        Node::BlockQuote(body) | Node::Admonition { body, .. } => walk_nodes(body, visitor),
        Node::Paragraph(_) | Node::LiteralBlock(_) | Node::Contents { .. } => {}
    }
}

/// Removes every section whose identifier matches one of the excluded
/// names, wherever it sits in the tree.
#[derive(Debug, Clone)]
pub struct SectionFilter {
    xids: Vec<String>,
}

impl SectionFilter {
    pub fn new<I, S>(exclude_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            xids: exclude_names
                .into_iter()
                .map(|name| make_id(name.as_ref()))
                .collect(),
        }
    }

    pub fn xids(&self) -> &[String] {
        &self.xids
    }
}

impl Default for SectionFilter {
    fn default() -> Self {
        Self::new(SUMMARY_EXCLUDES)
    }
}

impl Visitor for SectionFilter {
    fn visit_section(&mut self, section: &Section) -> Walk {
        if section.ids.iter().any(|id| self.xids.contains(id)) {
            Walk::Detach
        } else {
            Walk::Continue
        }
    }
}

/// Collects the normalized names of top-level sections.
#[derive(Debug, Default)]
pub struct SectionNames {
    pub names: Vec<String>,
}

impl Visitor for SectionNames {
    fn visit_section(&mut self, section: &Section) -> Walk {
        self.names.extend(section.names.iter().cloned());
        Walk::SkipSubtree
    }

    fn visit_node(&mut self, _node: &Node) -> Walk {
        Walk::SkipSubtree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    const DOC: &str = "\
Summary
-------

Short.

Operational Summary
-------------------

#. step

Operational Detail
------------------

Long.

Nested
~~~~~~

Deep.

Prerequisites
-------------

Docker.
";

    #[test]
    fn default_filter_detaches_excluded_sections() {
        let mut doc = parse(DOC);
        walk(&mut doc, &mut SectionFilter::default());
        let mut names = SectionNames::default();
        walk(&mut doc, &mut names);
        assert_eq!(names.names, ["summary", "operational summary"]);
    }

    #[test]
    fn filter_matches_nested_sections() {
        let mut doc = parse(DOC);
        walk(&mut doc, &mut SectionFilter::new(["nested"]));
        let Node::Section(detail) = &doc.children[2] else {
            panic!("expected section");
        };
        assert_eq!(detail.children.len(), 1);
    }

    #[test]
    fn filter_compares_identifiers() {
        let filter = SectionFilter::new(["Operational  DETAIL"]);
        assert_eq!(filter.xids(), ["operational-detail"]);
    }

    #[test]
    fn names_are_top_level_only() {
        let mut doc = parse(DOC);
        let mut names = SectionNames::default();
        walk(&mut doc, &mut names);
        assert_eq!(
            names.names,
            ["summary", "operational summary", "operational detail", "prerequisites"]
        );
    }
}
