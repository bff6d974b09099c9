//! Reference extraction for Python.

use super::{PyChainRoot, attribute_chain};
use crate::parsing::{Capture, FileContext, node_text};
use crate::reference::{
    AccessType, PropertyAccessKind, Reference, ReferenceDetail, SelfKeyword, TypeContext,
};
use crate::scope::ScopeTree;
use crate::types::{Location, ScopeId, SymbolName};
use std::ops::Range;
use tree_sitter::Node;

/// Parents under which an identifier is a binding, a label, or a member name.
const NON_REFERENCE_PARENTS: &[&str] = &[
    "function_definition",
    "class_definition",
    "parameters",
    "typed_parameter",
    "default_parameter",
    "typed_default_parameter",
    "lambda_parameters",
    "list_splat_pattern",
    "dictionary_splat_pattern",
    "aliased_import",
    "dotted_name",
    "import_from_statement",
    "import_statement",
    "global_statement",
    "nonlocal_statement",
    "as_pattern_target",
    "pattern_list",
    "tuple_pattern",
];

pub(super) struct ReferencesPass<'a> {
    ctx: &'a FileContext,
    source: &'a str,
    scopes: &'a ScopeTree,
    suppressed: Vec<Range<usize>>,
    references: Vec<Reference>,
}

impl<'a> ReferencesPass<'a> {
    pub(super) fn new(
        ctx: &'a FileContext,
        source: &'a str,
        scopes: &'a ScopeTree,
        suppressed: Vec<Range<usize>>,
    ) -> Self {
        Self {
            ctx,
            source,
            scopes,
            suppressed,
            references: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, captures: &[Capture<'_>]) {
        for capture in captures {
            match capture.name {
                "ref.call" => self.handle_call(capture.node),
                "ref.assignment" => self.handle_assignment(capture.node, false),
                "ref.augmented" => self.handle_assignment(capture.node, true),
                "ref.member" => self.handle_attribute(capture.node),
                "ref.subscript" => self.handle_subscript(capture.node),
                "ref.identifier" => self.handle_identifier(capture.node),
                _ => {}
            }
        }
    }

    pub(super) fn finish(self) -> Vec<Reference> {
        self.references
    }

    fn loc(&self, node: Node<'_>) -> Location {
        self.ctx.location(node)
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    fn scope_at(&self, location: &Location) -> ScopeId {
        self.scopes.innermost_at(location).clone()
    }

    fn push(&mut self, name: &str, location: Location, detail: ReferenceDetail) {
        let scope_id = self.scope_at(&location);
        self.references
            .push(Reference::new(name, location, scope_id, detail));
    }

    fn is_suppressed(&self, node: Node<'_>) -> bool {
        let start = node.start_byte();
        self.suppressed.iter().any(|r| r.contains(&start))
    }

    fn is_field_of(node: Node<'_>, parent: Node<'_>, field: &str) -> bool {
        parent.child_by_field_name(field) == Some(node)
    }

    /// The binding a call flows into, for call/construct disambiguation.
    fn construct_target(&self, node: Node<'_>) -> Option<Location> {
        let parent = node.parent()?;
        match parent.kind() {
            "assignment" if Self::is_field_of(node, parent, "right") => {
                let left = parent.child_by_field_name("left")?;
                (left.kind() == "identifier").then(|| self.loc(left))
            }
            _ => None,
        }
    }

    fn handle_call(&mut self, node: Node<'_>) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        match callee.kind() {
            "identifier" => {
                let name = self.text(callee);
                if name == "super" {
                    // Bare `super()` only matters through its attribute chain.
                    return;
                }
                // Calls and constructions are syntactically identical; the
                // call resolvers rewrite once the callee resolves to a class.
                self.push(
                    name,
                    self.loc(node),
                    ReferenceDetail::FunctionCall {
                        potential_construct_target: self.construct_target(node),
                    },
                );
            }
            "attribute" => {
                let Some(attr) = callee.child_by_field_name("attribute") else {
                    return;
                };
                let Some(object) = callee.child_by_field_name("object") else {
                    return;
                };
                let name = self.text(attr).to_string();
                let receiver_location = self.loc(object);
                let (root, chain) = attribute_chain(callee, self.source);
                let chain: Vec<SymbolName> = chain.into_iter().map(SymbolName::from).collect();
                match root {
                    PyChainRoot::Keyword(keyword) => {
                        let keyword =
                            SelfKeyword::parse(keyword).unwrap_or(SelfKeyword::SelfParam);
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::SelfReferenceCall {
                                keyword,
                                property_chain: chain,
                            },
                        );
                    }
                    PyChainRoot::Identifier => {
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::MethodCall {
                                receiver_location,
                                property_chain: chain,
                                optional_chaining: false,
                            },
                        );
                    }
                    PyChainRoot::Dynamic => {
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::MethodCall {
                                receiver_location,
                                property_chain: Vec::new(),
                                optional_chaining: false,
                            },
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_assignment(&mut self, node: Node<'_>, augmented: bool) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        // Annotation-only statements (`x: int`) bind but do not assign.
        if !augmented && node.child_by_field_name("right").is_none() {
            return;
        }
        let target_location = self.loc(left);
        let assignment_type = augmented.then(|| Box::<str>::from(operator_of(node, self.source)));
        self.push(
            self.text(left),
            self.loc(node),
            ReferenceDetail::Assignment {
                target_location: target_location.clone(),
                assignment_type,
            },
        );
        if left.kind() == "identifier" {
            let name = self.text(left).to_string();
            if augmented {
                self.push(
                    &name,
                    target_location.clone(),
                    ReferenceDetail::VariableReference {
                        access_type: AccessType::Read,
                    },
                );
            }
            self.push(
                &name,
                target_location,
                ReferenceDetail::VariableReference {
                    access_type: AccessType::Write,
                },
            );
        }
    }

    fn handle_attribute(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        match parent.kind() {
            "attribute" if Self::is_field_of(node, parent, "object") => return,
            "call" if Self::is_field_of(node, parent, "function") => return,
            _ => {}
        }
        let Some(attr) = node.child_by_field_name("attribute") else {
            return;
        };
        let Some(object) = node.child_by_field_name("object") else {
            return;
        };
        let (root, chain) = attribute_chain(node, self.source);
        let chain = match root {
            PyChainRoot::Identifier | PyChainRoot::Keyword(_) => chain,
            PyChainRoot::Dynamic => Vec::new(),
        };
        self.push(
            self.text(attr),
            self.loc(node),
            ReferenceDetail::PropertyAccess {
                receiver_location: self.loc(object),
                property_chain: chain.into_iter().map(SymbolName::from).collect(),
                access_type: PropertyAccessKind::Property,
                is_optional_chain: false,
            },
        );
    }

    fn handle_subscript(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        match parent.kind() {
            "attribute" if Self::is_field_of(node, parent, "object") => return,
            "call" if Self::is_field_of(node, parent, "function") => return,
            _ => {}
        }
        // Subscripts inside annotations are generic type mentions.
        if within_type(node) {
            return;
        }
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        let (root, chain) = attribute_chain(value, self.source);
        let (name, chain) = match root {
            PyChainRoot::Identifier => (
                chain.last().cloned().unwrap_or_default(),
                chain.into_iter().map(SymbolName::from).collect(),
            ),
            _ => (self.text(value).to_string(), Vec::new()),
        };
        if name.is_empty() {
            return;
        }
        self.push(
            &name,
            self.loc(node),
            ReferenceDetail::PropertyAccess {
                receiver_location: self.loc(value),
                property_chain: chain,
                access_type: PropertyAccessKind::Index,
                is_optional_chain: false,
            },
        );
    }

    fn handle_identifier(&mut self, node: Node<'_>) {
        if self.is_suppressed(node) {
            return;
        }
        let text = self.text(node);
        if text == "self" || text == "cls" || text == "super" {
            return;
        }
        let Some(parent) = node.parent() else { return };
        let parent_kind = parent.kind();
        if NON_REFERENCE_PARENTS.contains(&parent_kind) {
            return;
        }
        if parent_kind == "attribute" && Self::is_field_of(node, parent, "attribute") {
            return;
        }
        if parent_kind == "call" && Self::is_field_of(node, parent, "function") {
            return;
        }
        if (parent_kind == "assignment" || parent_kind == "augmented_assignment")
            && Self::is_field_of(node, parent, "left")
        {
            return;
        }
        if parent_kind == "keyword_argument" && Self::is_field_of(node, parent, "name") {
            return;
        }
        if parent_kind == "for_statement" && Self::is_field_of(node, parent, "left") {
            return;
        }
        if parent_kind == "decorator" {
            return;
        }
        // Base classes are type uses, not reads.
        if parent_kind == "argument_list"
            && parent
                .parent()
                .map(|gp| {
                    gp.kind() == "class_definition"
                        && gp.child_by_field_name("superclasses") == Some(parent)
                })
                .unwrap_or(false)
        {
            self.push(
                text,
                self.loc(node),
                ReferenceDetail::TypeReference {
                    type_context: TypeContext::Extends,
                    type_info: None,
                },
            );
            return;
        }
        // Annotations are type uses.
        if within_type(node) {
            let context = if return_annotation(node) {
                TypeContext::Return
            } else if within_subscript_annotation(node) {
                TypeContext::Generic
            } else {
                TypeContext::Annotation
            };
            self.push(
                text,
                self.loc(node),
                ReferenceDetail::TypeReference {
                    type_context: context,
                    type_info: None,
                },
            );
            return;
        }
        self.push(
            text,
            self.loc(node),
            ReferenceDetail::VariableReference {
                access_type: AccessType::Read,
            },
        );
    }
}

/// Whether the node sits inside a `type` annotation node.
fn within_type(node: Node<'_>) -> bool {
    let mut current = node.parent();
    for _ in 0..8 {
        let Some(n) = current else { return false };
        if n.kind() == "type" {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Whether the enclosing annotation is a return annotation (`-> T`).
fn return_annotation(node: Node<'_>) -> bool {
    let mut current = node.parent();
    for _ in 0..8 {
        let Some(n) = current else { return false };
        if n.kind() == "type" {
            return n
                .parent()
                .and_then(|p| p.child_by_field_name("return_type"))
                .map(|rt| rt.byte_range() == n.byte_range())
                .unwrap_or(false);
        }
        current = n.parent();
    }
    false
}

/// `List[Handler]`: the bracketed part of an annotation is a generic mention.
fn within_subscript_annotation(node: Node<'_>) -> bool {
    let mut current = node.parent();
    for _ in 0..8 {
        let Some(n) = current else { return false };
        if n.kind() == "type" {
            return false;
        }
        if n.kind() == "subscript" && n.child_by_field_name("subscript") == Some(node) {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Operator of an augmented assignment (`+=`, `//=`, ...).
fn operator_of<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !child.is_named() && child.kind().ends_with('=') && child.kind() != "=" {
            return node_text(child, source);
        }
    }
    ""
}
