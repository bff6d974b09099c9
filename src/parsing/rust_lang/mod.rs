//! Rust lowering.
//!
//! Structs and enums lower to classes, traits to interfaces. Inherent impl
//! blocks fold their functions into the type's class definition, with
//! `fn new` as the constructor; `impl Trait for Type` records an implements
//! edge so trait-receiver calls expand to every implementation.

mod definitions;
mod references;

use crate::parsing::{
    Capture, CaptureRule, FileContext, Language, LoweredFile, Lowering, collect, degenerate_file,
    nearest_ancestor, node_text,
};
use crate::scope::{ScopeBuilder, ScopeKind, ScopeTree};
use tree_sitter::{Node, Tree};

const RULES: &[CaptureRule] = &[
    // Scopes.
    CaptureRule::new(&["function_item", "closure_expression"], "scope.callable"),
    CaptureRule::new(&["declaration_list"], "scope.body"),
    CaptureRule::new(&["field_declaration_list"], "scope.fields"),
    CaptureRule::new(&["block"], "scope.block"),
    // Definitions.
    CaptureRule::new(&["function_item"], "def.function"),
    CaptureRule::new(&["struct_item", "enum_item", "union_item"], "def.class"),
    CaptureRule::new(&["trait_item"], "def.interface"),
    CaptureRule::new(&["impl_item"], "def.impl"),
    CaptureRule::new(&["type_item"], "def.type_alias"),
    CaptureRule::new(&["const_item", "static_item"], "def.const"),
    CaptureRule::new(&["let_declaration"], "def.variable"),
    CaptureRule::new(&["use_declaration"], "def.import"),
    // References.
    CaptureRule::new(&["call_expression"], "ref.call"),
    CaptureRule::new(&["struct_expression"], "ref.struct"),
    CaptureRule::new(&["assignment_expression"], "ref.assignment"),
    CaptureRule::new(&["compound_assignment_expr"], "ref.augmented"),
    CaptureRule::new(&["field_expression"], "ref.member"),
    CaptureRule::new(&["index_expression"], "ref.index"),
    CaptureRule::new(&["identifier"], "ref.identifier"),
    CaptureRule::new(&["type_identifier"], "ref.type"),
];

pub struct RustLowering;

impl Lowering for RustLowering {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn lower(&self, ctx: &FileContext, tree: Option<&Tree>, source: &str) -> LoweredFile {
        let Some(tree) = tree else {
            return degenerate_file(ctx);
        };
        let captures = collect(tree.root_node(), RULES);
        let scopes = build_scopes(ctx, &captures, source);

        let mut defs = definitions::DefinitionsPass::new(ctx, source, &scopes);
        defs.run(&captures);
        let (definitions, exports) = defs.finish();

        let mut refs = references::ReferencesPass::new(ctx, source, &scopes);
        refs.run(&captures);
        let references = refs.finish();

        LoweredFile {
            scopes,
            definitions,
            references,
            exports,
        }
    }
}

fn build_scopes(ctx: &FileContext, captures: &[Capture<'_>], source: &str) -> ScopeTree {
    let mut builder = ScopeBuilder::new(ctx.file_path.clone(), ctx.file_lines, ctx.file_end_column);
    for capture in captures {
        let node = capture.node;
        match capture.name {
            "scope.callable" => {
                builder.enter(callable_scope_kind(node, source), ctx.location(node));
            }
            "scope.body" => {
                // impl/trait bodies act as the type's member scope; mod bodies
                // are plain blocks.
                let kind = match node.parent().map(|p| p.kind()) {
                    Some("impl_item") | Some("trait_item") => ScopeKind::Class,
                    _ => ScopeKind::Block,
                };
                builder.enter(kind, ctx.location(node));
            }
            "scope.fields" => {
                builder.enter(ScopeKind::Class, ctx.location(node));
            }
            "scope.block" => {
                if !is_callable_body(node) {
                    builder.enter(ScopeKind::Block, ctx.location(node));
                }
            }
            _ => {}
        }
    }
    builder.finish()
}

fn is_callable_body(block: Node<'_>) -> bool {
    block
        .parent()
        .map(|p| matches!(p.kind(), "function_item" | "closure_expression"))
        .unwrap_or(false)
}

/// Free function, associated method, or constructor (`fn new` in an impl).
pub(crate) fn callable_scope_kind(node: Node<'_>, source: &str) -> ScopeKind {
    if node.kind() == "closure_expression" {
        return ScopeKind::Function;
    }
    if nearest_ancestor(node, &["impl_item", "trait_item"]).is_none() {
        return ScopeKind::Function;
    }
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source))
        .unwrap_or("");
    if name == "new" {
        ScopeKind::Constructor
    } else {
        ScopeKind::Method
    }
}

/// Whether the item carries a `pub` visibility modifier.
pub(crate) fn is_public(node: Node<'_>, source: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier" && node_text(c, source).starts_with("pub"))
}

/// Walk a field-expression spine (`cfg.store.flush()`).
pub(crate) enum RsChainRoot {
    Identifier,
    SelfKeyword,
    Dynamic,
}

pub(crate) fn field_chain(callee: Node<'_>, source: &str) -> (RsChainRoot, Vec<String>) {
    let mut props = Vec::new();
    let mut current = callee;
    loop {
        match current.kind() {
            "field_expression" => {
                if let Some(field) = current.child_by_field_name("field") {
                    props.push(node_text(field, source).to_string());
                }
                match current.child_by_field_name("value") {
                    Some(value) => current = value,
                    None => return (RsChainRoot::Dynamic, Vec::new()),
                }
            }
            "identifier" => {
                props.push(node_text(current, source).to_string());
                props.reverse();
                return (RsChainRoot::Identifier, props);
            }
            "self" => {
                props.reverse();
                return (RsChainRoot::SelfKeyword, props);
            }
            "reference_expression" | "parenthesized_expression" => {
                match current.named_child(0) {
                    Some(inner) => current = inner,
                    None => return (RsChainRoot::Dynamic, Vec::new()),
                }
            }
            _ => return (RsChainRoot::Dynamic, Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionKind;
    use crate::scope::ScopeKind;

    fn lower(source: &str) -> LoweredFile {
        let ctx = FileContext::for_source("test.rs", Language::Rust, source);
        let tree = Language::Rust.parse(source).unwrap();
        RustLowering.lower(&ctx, tree.as_ref(), source)
    }

    #[test]
    fn impl_methods_fold_into_the_struct() {
        let source = "pub struct Store { count: u32 }\n\nimpl Store {\n    pub fn new() -> Self {\n        Store { count: 0 }\n    }\n\n    pub fn bump(&mut self) {\n        self.count += 1;\n    }\n}\n";
        let lowered = lower(source);
        let class = lowered
            .definitions
            .iter()
            .find(|d| d.kind == DefinitionKind::Class && d.name.as_str() == "Store")
            .expect("Store class");
        let detail = class.as_class().unwrap();
        assert_eq!(detail.constructors.len(), 1, "fn new is the constructor");
        assert_eq!(detail.constructors[0].name.as_str(), "new");
        assert!(detail.methods.iter().any(|m| m.name.as_str() == "bump"));
        assert!(detail.methods.iter().all(|m| m.name.as_str() != "new"));
        assert!(detail.properties.iter().any(|p| p.name.as_str() == "count"));
    }

    #[test]
    fn trait_lowers_to_interface_and_impl_records_edge() {
        let source = "pub trait Render {\n    fn draw(&self);\n}\n\npub struct Circle;\n\nimpl Render for Circle {\n    fn draw(&self) {}\n}\n";
        let lowered = lower(source);
        let interface = lowered
            .definitions
            .iter()
            .find(|d| d.kind == DefinitionKind::Interface)
            .expect("trait as interface");
        assert_eq!(interface.name.as_str(), "Render");
        assert!(
            interface
                .as_interface()
                .unwrap()
                .methods
                .iter()
                .any(|m| m.name.as_str() == "draw")
        );
        let circle = lowered
            .definitions
            .iter()
            .find(|d| d.name.as_str() == "Circle")
            .expect("Circle");
        let detail = circle.as_class().unwrap();
        assert_eq!(detail.implements[0].as_str(), "Render");
        assert!(detail.methods.iter().any(|m| m.name.as_str() == "draw"));
    }

    #[test]
    fn method_scopes_under_impl_are_methods() {
        let source = "struct A;\nimpl A {\n    fn new() -> Self { A }\n    fn go(&self) {}\n}\n";
        let lowered = lower(source);
        let kinds: Vec<_> = lowered.scopes.iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&ScopeKind::Constructor));
        assert!(kinds.contains(&ScopeKind::Method));
        assert!(kinds.contains(&ScopeKind::Class));
    }

    #[test]
    fn use_declarations_bind_imports() {
        let source = "use crate::store::Store;\nuse std::collections::HashMap as Map;\npub use crate::render::draw;\n";
        let lowered = lower(source);
        let imports: Vec<_> = lowered
            .definitions
            .iter()
            .filter(|d| d.kind == DefinitionKind::Import)
            .collect();
        let store = imports
            .iter()
            .find(|d| d.name.as_str() == "Store")
            .expect("Store import");
        assert_eq!(&*store.as_import().unwrap().source_path, "crate::store");
        let map = imports.iter().find(|d| d.name.as_str() == "Map").expect("alias");
        assert_eq!(
            map.as_import().unwrap().original_name.as_ref().map(|n| n.as_str()),
            Some("HashMap")
        );
        // `pub use` re-exports.
        assert!(lowered.exports.iter().any(|e| matches!(
            e,
            crate::definition::ExportEntry::Reexport { exported, .. }
                if exported.as_str() == "draw"
        )));
    }

    #[test]
    fn pub_items_are_exported() {
        let source = "pub fn visible() {}\nfn hidden() {}\n";
        let lowered = lower(source);
        let visible = lowered
            .definitions
            .iter()
            .find(|d| d.name.as_str() == "visible")
            .unwrap();
        assert!(visible.is_exported());
        let hidden = lowered
            .definitions
            .iter()
            .find(|d| d.name.as_str() == "hidden")
            .unwrap();
        assert!(!hidden.is_exported());
    }
}
