//! Capture stream over a concrete syntax tree.
//!
//! Each language declares a table of capture rules (node kind → capture name).
//! One pre-order traversal applies the table and yields an ordered stream of
//! named captures. The stream is best-effort by construction: a kind that does
//! not occur in a grammar simply never matches, and a malformed tree yields
//! whatever captures its recognizable nodes produce.

use crate::types::{FilePath, Location};
use tree_sitter::Node;

/// Maximum traversal depth. Deeply nested trees beyond this are skipped to
/// protect the stack; the stream stays valid, just truncated under the cut.
pub const MAX_TREE_DEPTH: usize = 500;

/// One declarative rule: any of `kinds` yields a capture named `name`.
#[derive(Debug, Clone, Copy)]
pub struct CaptureRule {
    pub kinds: &'static [&'static str],
    pub name: &'static str,
}

impl CaptureRule {
    pub const fn new(kinds: &'static [&'static str], name: &'static str) -> Self {
        Self { kinds, name }
    }
}

/// A named capture: the capture name plus the matched node.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'t> {
    pub name: &'static str,
    pub node: Node<'t>,
}

impl<'t> Capture<'t> {
    pub fn node_kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        node_text(self.node, source)
    }

    pub fn location(&self, file_path: &FilePath) -> Location {
        location_of(file_path, self.node)
    }
}

/// Source text of a node. Empty on out-of-range spans from broken trees.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-indexed location of a node; the end column stays exclusive.
pub fn location_of(file_path: &FilePath, node: Node<'_>) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::new(
        file_path.clone(),
        start.row as u32 + 1,
        start.column as u32 + 1,
        end.row as u32 + 1,
        end.column as u32 + 1,
    )
}

/// Run the capture table over the tree in pre-order. A node matching several
/// rules yields one capture per rule, in table order.
pub fn collect<'t>(root: Node<'t>, rules: &[CaptureRule]) -> Vec<Capture<'t>> {
    let mut captures = Vec::new();
    walk(root, rules, &mut captures, 0);
    captures
}

fn walk<'t>(node: Node<'t>, rules: &[CaptureRule], out: &mut Vec<Capture<'t>>, depth: usize) {
    if depth > MAX_TREE_DEPTH {
        tracing::debug!(
            "capture traversal depth limit hit at {}:{}",
            node.start_position().row + 1,
            node.start_position().column + 1
        );
        return;
    }
    let kind = node.kind();
    for rule in rules {
        if rule.kinds.contains(&kind) {
            out.push(Capture { name: rule.name, node });
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, rules, out, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;

    const RULES: &[CaptureRule] = &[
        CaptureRule::new(&["function_declaration"], "def.function"),
        CaptureRule::new(&["function_declaration"], "scope.function"),
        CaptureRule::new(&["call_expression"], "ref.call"),
        CaptureRule::new(&["no_such_kind"], "never"),
    ];

    #[test]
    fn captures_are_ordered_and_multi_rule() {
        let source = "function a() { b(); }\nfunction c() {}\n";
        let tree = Language::JavaScript.parse(source).unwrap().unwrap();
        let captures = collect(tree.root_node(), RULES);
        let names: Vec<_> = captures.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "def.function",
                "scope.function",
                "ref.call",
                "def.function",
                "scope.function"
            ]
        );
    }

    #[test]
    fn unknown_kinds_never_match() {
        let source = "function a() {}\n";
        let tree = Language::JavaScript.parse(source).unwrap().unwrap();
        let captures = collect(tree.root_node(), RULES);
        assert!(captures.iter().all(|c| c.name != "never"));
    }

    #[test]
    fn locations_are_one_indexed() {
        let source = "function a() {}\n";
        let tree = Language::JavaScript.parse(source).unwrap().unwrap();
        let captures = collect(tree.root_node(), RULES);
        let file = FilePath::from("a.js");
        let loc = captures[0].location(&file);
        assert_eq!((loc.start_line, loc.start_column), (1, 1));
    }
}
