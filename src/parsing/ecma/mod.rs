//! Shared JavaScript/TypeScript lowering.
//!
//! JavaScript and TypeScript share most of their surface syntax; the
//! TypeScript-only constructs (interfaces, type aliases, enums, annotations)
//! are extra capture rules that simply never match in a JavaScript tree.

mod definitions;
mod references;

use crate::parsing::{
    Capture, CaptureRule, FileContext, Language, LoweredFile, Lowering, collect, degenerate_file,
    node_text,
};
use crate::scope::{ScopeBuilder, ScopeKind, ScopeTree};
use crate::types::ScopeId;
use tree_sitter::{Node, Tree};

/// Node kinds that open a function scope (covering the whole construct, so a
/// named function expression contains its own name).
pub(crate) const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
];

const RULES: &[CaptureRule] = &[
    // Scopes.
    CaptureRule::new(FUNCTION_KINDS, "scope.function"),
    CaptureRule::new(&["method_definition"], "scope.method"),
    CaptureRule::new(&["class_body"], "scope.class"),
    CaptureRule::new(&["statement_block"], "scope.block"),
    // Definitions.
    CaptureRule::new(
        &["function_declaration", "generator_function_declaration"],
        "def.function",
    ),
    CaptureRule::new(
        &[
            "function_expression",
            "function",
            "generator_function",
            "arrow_function",
        ],
        "def.function_expression",
    ),
    CaptureRule::new(
        &[
            "class_declaration",
            "class_expression",
            "abstract_class_declaration",
        ],
        "def.class",
    ),
    CaptureRule::new(&["variable_declarator"], "def.variable"),
    CaptureRule::new(&["import_statement"], "def.import"),
    CaptureRule::new(&["export_statement"], "def.export"),
    CaptureRule::new(&["interface_declaration"], "def.interface"),
    CaptureRule::new(&["type_alias_declaration"], "def.type_alias"),
    CaptureRule::new(&["enum_declaration"], "def.enum"),
    // References.
    CaptureRule::new(&["call_expression"], "ref.call"),
    CaptureRule::new(&["new_expression"], "ref.new"),
    CaptureRule::new(&["assignment_expression"], "ref.assignment"),
    CaptureRule::new(
        &["augmented_assignment_expression"],
        "ref.augmented_assignment",
    ),
    CaptureRule::new(&["member_expression"], "ref.member"),
    CaptureRule::new(&["subscript_expression"], "ref.subscript"),
    CaptureRule::new(&["identifier", "shorthand_property_identifier"], "ref.identifier"),
    CaptureRule::new(&["type_identifier"], "ref.type"),
];

/// Lowering shared by JavaScript and TypeScript.
pub struct EcmaLowering {
    pub language: Language,
}

impl Lowering for EcmaLowering {
    fn language(&self) -> Language {
        self.language
    }

    fn lower(&self, ctx: &FileContext, tree: Option<&Tree>, source: &str) -> LoweredFile {
        let Some(tree) = tree else {
            return degenerate_file(ctx);
        };
        let captures = collect(tree.root_node(), RULES);
        let scopes = build_scopes(ctx, &captures, source);

        let mut defs = definitions::DefinitionsPass::new(ctx, source, &scopes);
        defs.run(&captures);
        let (definitions, exports, suppressed) = defs.finish();

        let mut refs = references::ReferencesPass::new(ctx, source, &scopes, suppressed);
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

/// Build the scope tree from the scope captures, in stream order.
fn build_scopes(ctx: &FileContext, captures: &[Capture<'_>], source: &str) -> ScopeTree {
    let mut builder = ScopeBuilder::new(ctx.file_path.clone(), ctx.file_lines, ctx.file_end_column);
    for capture in captures {
        match capture.name {
            "scope.function" => {
                builder.enter(ScopeKind::Function, ctx.location(capture.node));
            }
            "scope.method" => {
                builder.enter(method_scope_kind(capture.node, source), ctx.location(capture.node));
            }
            "scope.class" => {
                // The class_body starts at the brace, so the class name stays
                // outside its own scope.
                builder.enter(ScopeKind::Class, ctx.location(capture.node));
            }
            "scope.block" => {
                if !is_callable_body_block(capture.node) {
                    builder.enter(ScopeKind::Block, ctx.location(capture.node));
                }
            }
            _ => {}
        }
    }
    builder.finish()
}

/// A method named `constructor` opens a constructor scope.
pub(crate) fn method_scope_kind(method: Node<'_>, source: &str) -> ScopeKind {
    if method
        .child_by_field_name("name")
        .map(|n| node_text(n, source) == "constructor")
        .unwrap_or(false)
    {
        ScopeKind::Constructor
    } else {
        ScopeKind::Method
    }
}

/// The scope id a function-like node's body scope will get. Scope synthesis is
/// deterministic, so recomputing it here always agrees with the scope pass.
pub(crate) fn body_scope_id(ctx: &FileContext, node: Node<'_>, kind: ScopeKind) -> ScopeId {
    ScopeId::synthesize(kind.token(), &ctx.location(node))
}

/// A statement_block that is the body of a function or method does not open
/// its own block scope; the callable's scope already covers it.
fn is_callable_body_block(block: Node<'_>) -> bool {
    block
        .parent()
        .map(|p| FUNCTION_KINDS.contains(&p.kind()) || p.kind() == "method_definition")
        .unwrap_or(false)
}

/// Strip the leading `:` of a type annotation's text.
pub(crate) fn annotation_text(node: Node<'_>, source: &str) -> Box<str> {
    node_text(node, source)
        .trim_start_matches(':')
        .trim()
        .into()
}

/// Unwrap TS expression wrappers that do not change the initializer shape.
pub(crate) fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    loop {
        match node.kind() {
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" | "await_expression" => {
                let Some(inner) = node.named_child(0) else {
                    return node;
                };
                node = inner;
            }
            _ => return node,
        }
    }
}

/// Walk a member-expression spine left to right. Returns the rooted chain
/// including the terminal property, or the keyword root for `this`/`super`.
/// A dynamic root (call result, literal, index) aborts the chain.
pub(crate) enum ChainRoot {
    Identifier,
    Keyword(&'static str),
    Dynamic,
}

pub(crate) fn member_chain(callee: Node<'_>, source: &str) -> (ChainRoot, Vec<String>) {
    let mut props = Vec::new();
    let mut current = callee;
    loop {
        match current.kind() {
            "member_expression" => {
                if let Some(prop) = current.child_by_field_name("property") {
                    props.push(node_text(prop, source).to_string());
                }
                match current.child_by_field_name("object") {
                    Some(obj) => current = obj,
                    None => return (ChainRoot::Dynamic, Vec::new()),
                }
            }
            "identifier" => {
                props.push(node_text(current, source).to_string());
                props.reverse();
                return (ChainRoot::Identifier, props);
            }
            "this" => {
                props.reverse();
                return (ChainRoot::Keyword("this"), props);
            }
            "super" => {
                props.reverse();
                return (ChainRoot::Keyword("super"), props);
            }
            _ => return (ChainRoot::Dynamic, Vec::new()),
        }
    }
}
