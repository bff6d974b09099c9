//! Python lowering.
//!
//! Python has no block scopes: only modules, classes, and callables. A method
//! named `__init__` is the class constructor. Module-level names double as the
//! module's exports; imports re-export under the same name.

mod definitions;
mod references;

use crate::parsing::{
    Capture, CaptureRule, FileContext, Language, LoweredFile, Lowering, collect, degenerate_file,
    node_text,
};
use crate::scope::{ScopeBuilder, ScopeKind, ScopeTree};
use tree_sitter::{Node, Tree};

const RULES: &[CaptureRule] = &[
    // Scopes.
    CaptureRule::new(&["function_definition", "lambda"], "scope.callable"),
    CaptureRule::new(&["class_definition"], "scope.class"),
    // Definitions.
    CaptureRule::new(&["function_definition"], "def.function"),
    CaptureRule::new(&["class_definition"], "def.class"),
    CaptureRule::new(&["assignment"], "def.variable"),
    CaptureRule::new(&["import_statement"], "def.import"),
    CaptureRule::new(&["import_from_statement"], "def.import_from"),
    // References.
    CaptureRule::new(&["call"], "ref.call"),
    CaptureRule::new(&["assignment"], "ref.assignment"),
    CaptureRule::new(&["augmented_assignment"], "ref.augmented"),
    CaptureRule::new(&["attribute"], "ref.member"),
    CaptureRule::new(&["subscript"], "ref.subscript"),
    CaptureRule::new(&["identifier"], "ref.identifier"),
];

pub struct PythonLowering;

impl Lowering for PythonLowering {
    fn language(&self) -> Language {
        Language::Python
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

fn build_scopes(ctx: &FileContext, captures: &[Capture<'_>], source: &str) -> ScopeTree {
    let mut builder = ScopeBuilder::new(ctx.file_path.clone(), ctx.file_lines, ctx.file_end_column);
    for capture in captures {
        match capture.name {
            "scope.callable" => {
                builder.enter(callable_scope_kind(capture.node, source), ctx.location(capture.node));
            }
            "scope.class" => {
                // The body block starts after the colon, keeping the class
                // name outside its own scope.
                if let Some(body) = capture.node.child_by_field_name("body") {
                    builder.enter(ScopeKind::Class, ctx.location(body));
                }
            }
            _ => {}
        }
    }
    builder.finish()
}

/// Whether a function definition is a direct member of a class body
/// (possibly wrapped in a decorated_definition).
pub(crate) fn is_class_member(node: Node<'_>) -> bool {
    let mut current = node.parent();
    if let Some(p) = current {
        if p.kind() == "decorated_definition" {
            current = p.parent();
        }
    }
    match current {
        Some(block) if block.kind() == "block" => block
            .parent()
            .map(|p| p.kind() == "class_definition")
            .unwrap_or(false),
        _ => false,
    }
}

/// Function, method, or constructor, by position and name.
pub(crate) fn callable_scope_kind(node: Node<'_>, source: &str) -> ScopeKind {
    if node.kind() == "lambda" || !is_class_member(node) {
        return ScopeKind::Function;
    }
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source))
        .unwrap_or("");
    if name == "__init__" {
        ScopeKind::Constructor
    } else {
        ScopeKind::Method
    }
}

/// The docstring of a definition body: a first statement that is a plain
/// string. Stored raw, unparsed.
pub(crate) fn docstring_of(body: Node<'_>, source: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    (expr.kind() == "string").then(|| node_text(expr, source).to_string())
}

/// Decorator texts when the definition sits under a decorated_definition.
pub(crate) fn decorators_of(node: Node<'_>, source: &str) -> Vec<Box<str>> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut cursor = parent.walk();
    for child in parent.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            out.push(node_text(child, source).into());
        }
    }
    out
}

/// Walk an attribute spine. Mirrors the ECMAScript chain walk, with the
/// Python-specific `super().m()` root.
pub(crate) enum PyChainRoot {
    Identifier,
    Keyword(&'static str),
    Dynamic,
}

pub(crate) fn attribute_chain(callee: Node<'_>, source: &str) -> (PyChainRoot, Vec<String>) {
    let mut props = Vec::new();
    let mut current = callee;
    loop {
        match current.kind() {
            "attribute" => {
                if let Some(attr) = current.child_by_field_name("attribute") {
                    props.push(node_text(attr, source).to_string());
                }
                match current.child_by_field_name("object") {
                    Some(obj) => current = obj,
                    None => return (PyChainRoot::Dynamic, Vec::new()),
                }
            }
            "identifier" => {
                let text = node_text(current, source);
                match text {
                    "self" => {
                        props.reverse();
                        return (PyChainRoot::Keyword("self"), props);
                    }
                    "cls" => {
                        props.reverse();
                        return (PyChainRoot::Keyword("cls"), props);
                    }
                    _ => {
                        props.push(text.to_string());
                        props.reverse();
                        return (PyChainRoot::Identifier, props);
                    }
                }
            }
            "call" => {
                // `super().method()` roots at the implicit parent class.
                let is_super = current
                    .child_by_field_name("function")
                    .map(|f| node_text(f, source) == "super")
                    .unwrap_or(false);
                if is_super {
                    props.reverse();
                    return (PyChainRoot::Keyword("super"), props);
                }
                return (PyChainRoot::Dynamic, Vec::new());
            }
            _ => return (PyChainRoot::Dynamic, Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionKind;
    use crate::scope::ScopeKind;

    fn lower(source: &str) -> LoweredFile {
        let ctx = FileContext::for_source("test.py", Language::Python, source);
        let tree = Language::Python.parse(source).unwrap();
        PythonLowering.lower(&ctx, tree.as_ref(), source)
    }

    #[test]
    fn init_opens_constructor_scope() {
        let source = "class Person:\n    def __init__(self, name):\n        self.name = name\n    def greet(self):\n        pass\n";
        let lowered = lower(source);
        let kinds: Vec<_> = lowered.scopes.iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&ScopeKind::Constructor));
        assert!(kinds.contains(&ScopeKind::Method));
        assert!(kinds.contains(&ScopeKind::Class));
    }

    #[test]
    fn class_scope_starts_past_the_keyword() {
        let source = "class Person:\n    x = 1\n";
        let lowered = lower(source);
        let class_scope = lowered
            .scopes
            .iter()
            .find(|s| s.kind == ScopeKind::Class)
            .unwrap();
        assert!(class_scope.location.start_column > 1);
    }

    #[test]
    fn init_lands_in_constructors_not_methods() {
        let source =
            "class Person:\n    def __init__(self, name: str):\n        self.name = name\n";
        let lowered = lower(source);
        let class = lowered
            .definitions
            .iter()
            .find(|d| d.kind == DefinitionKind::Class)
            .expect("class");
        let detail = class.as_class().unwrap();
        assert_eq!(detail.constructors.len(), 1);
        let ctor = &detail.constructors[0];
        assert_eq!(ctor.name.as_str(), "__init__");
        assert!(detail.methods.iter().all(|m| m.name.as_str() != "__init__"));
        // The receiver parameter is retained in the signature.
        let sig = match &ctor.detail {
            crate::definition::DefinitionDetail::Constructor(c) => &c.signature,
            _ => unreachable!(),
        };
        let names: Vec<_> = sig.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["self", "name"]);
        assert_eq!(sig.parameters[1].type_name.as_deref(), Some("str"));
    }

    #[test]
    fn docstrings_attach_raw() {
        let source = "def helper():\n    \"\"\"Do the thing.\"\"\"\n    pass\n";
        let lowered = lower(source);
        let helper = lowered
            .definitions
            .iter()
            .find(|d| d.name.as_str() == "helper")
            .unwrap();
        assert!(helper.doc.as_deref().unwrap().contains("Do the thing."));
    }

    #[test]
    fn decorators_are_textual() {
        let source = "class A:\n    @staticmethod\n    def make():\n        pass\n";
        let lowered = lower(source);
        let class = lowered
            .definitions
            .iter()
            .find(|d| d.kind == DefinitionKind::Class)
            .unwrap();
        let method = &class.as_class().unwrap().methods[0];
        let decorators = &method.as_method().unwrap().decorators;
        assert_eq!(&*decorators[0], "@staticmethod");
        assert!(method.flags.contains(crate::definition::DefinitionFlags::STATIC));
    }
}
