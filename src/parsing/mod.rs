//! Parsing and per-language lowering.
//!
//! Each language implements [`Lowering`]: captures → scope tree → definitions
//! → references. The tree-sitter tree is consumed as an oracle; everything a
//! lowering cannot recognize is skipped rather than failed.

pub mod captures;
pub mod ecma;
pub mod javascript;
pub mod language;
pub mod python;
pub mod rust_lang;
pub mod typescript;

pub use captures::{Capture, CaptureRule, collect, location_of, node_text};
pub use language::Language;

use crate::definition::{Definition, ExportEntry};
use crate::reference::Reference;
use crate::scope::{ScopeBuilder, ScopeTree};
use crate::types::{FilePath, Location};
use tree_sitter::{Node, Tree};

/// Everything the lowering needs to know about the file being indexed.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub file_path: FilePath,
    pub file_lines: u32,
    pub file_end_column: u32,
    pub language: Language,
}

impl FileContext {
    pub fn for_source(file_path: impl Into<FilePath>, language: Language, source: &str) -> Self {
        let file_lines = source.bytes().filter(|&b| b == b'\n').count() as u32 + 1;
        let last_line_len = source.rsplit('\n').next().map(|l| l.len()).unwrap_or(0) as u32;
        Self {
            file_path: file_path.into(),
            file_lines,
            file_end_column: last_line_len + 1,
            language,
        }
    }

    pub fn location(&self, node: Node<'_>) -> Location {
        location_of(&self.file_path, node)
    }
}

/// Per-file lowering output, ready for the registries.
#[derive(Debug)]
pub struct LoweredFile {
    pub scopes: ScopeTree,
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub exports: Vec<ExportEntry>,
}

/// The per-language lowering seam.
pub trait Lowering: Send + Sync {
    fn language(&self) -> Language;

    /// Lower one file. `tree` is `None` when tree-sitter failed outright; the
    /// contract is a degenerate one-scope result, never an error.
    fn lower(&self, ctx: &FileContext, tree: Option<&Tree>, source: &str) -> LoweredFile;
}

/// Static lowering instance for a language.
pub fn lowering_for(language: Language) -> &'static dyn Lowering {
    match language {
        Language::JavaScript => &javascript::JavaScriptLowering,
        Language::TypeScript => &typescript::TypeScriptLowering,
        Language::Python => &python::PythonLowering,
        Language::Rust => &rust_lang::RustLowering,
    }
}

/// The fallback for unparseable input: a single module scope, nothing else.
pub fn degenerate_file(ctx: &FileContext) -> LoweredFile {
    let builder = ScopeBuilder::new(ctx.file_path.clone(), ctx.file_lines, ctx.file_end_column);
    LoweredFile {
        scopes: builder.finish(),
        definitions: Vec::new(),
        references: Vec::new(),
        exports: Vec::new(),
    }
}

/// Nearest ancestor whose kind is one of `kinds`.
pub(crate) fn nearest_ancestor<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// First child (named or not) with one of the given kinds.
pub(crate) fn child_of_kinds<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| kinds.contains(&c.kind()))
}

/// Whether any direct child token has the given kind (`static`, `async`, ...).
pub(crate) fn has_child_token(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == kind)
}

/// The comment node immediately preceding `node`, if any.
pub(crate) fn preceding_comment<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let prev = node.prev_named_sibling()?;
    (prev.kind() == "comment" || prev.kind() == "line_comment" || prev.kind() == "block_comment")
        .then_some(prev)
}

/// A structured block comment (`/** ... */`) directly above `node`.
pub(crate) fn preceding_jsdoc(node: Node<'_>, source: &str) -> Option<String> {
    let comment = preceding_comment(node)?;
    let text = node_text(comment, source);
    text.starts_with("/**").then(|| text.to_string())
}

/// A contiguous run of `///` line comments directly above `node`.
pub(crate) fn preceding_doc_lines(node: Node<'_>, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_named_sibling();
    while let Some(n) = current {
        if n.kind() != "line_comment" && n.kind() != "comment" {
            break;
        }
        let text = node_text(n, source);
        if !text.starts_with("///") {
            break;
        }
        lines.push(text.to_string());
        current = n.prev_named_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_context_extent() {
        let ctx = FileContext::for_source("a.js", Language::JavaScript, "const x = 1;\nfoo();\n");
        assert_eq!(ctx.file_lines, 3);
        assert_eq!(ctx.file_end_column, 1);

        let ctx = FileContext::for_source("a.js", Language::JavaScript, "const x = 1;");
        assert_eq!(ctx.file_lines, 1);
        assert_eq!(ctx.file_end_column, 13);
    }

    #[test]
    fn degenerate_file_has_single_module_scope() {
        let ctx = FileContext::for_source("broken.py", Language::Python, "def (((\n");
        let lowered = degenerate_file(&ctx);
        assert_eq!(lowered.scopes.len(), 1);
        assert!(lowered.definitions.is_empty());
        assert!(lowered.references.is_empty());
    }
}
