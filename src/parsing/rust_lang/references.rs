//! Reference extraction for Rust.

use super::{RsChainRoot, field_chain};
use crate::parsing::{Capture, FileContext, nearest_ancestor, node_text};
use crate::reference::{
    AccessType, PropertyAccessKind, Reference, ReferenceDetail, SelfKeyword, TypeContext,
};
use crate::scope::ScopeTree;
use crate::types::{Location, ScopeId, SymbolName};
use tree_sitter::Node;

const NON_REFERENCE_PARENTS: &[&str] = &[
    "function_item",
    "function_signature_item",
    "struct_item",
    "enum_item",
    "union_item",
    "trait_item",
    "impl_item",
    "type_item",
    "const_item",
    "static_item",
    "mod_item",
    "parameter",
    "closure_parameters",
    "mut_pattern",
    "tuple_pattern",
    "struct_pattern",
    "slice_pattern",
    "field_pattern",
    "use_declaration",
    "use_as_clause",
    "use_list",
    "scoped_use_list",
    "use_wildcard",
    "field_declaration",
    "enum_variant",
    "lifetime",
];

pub(super) struct ReferencesPass<'a> {
    ctx: &'a FileContext,
    source: &'a str,
    scopes: &'a ScopeTree,
    references: Vec<Reference>,
}

impl<'a> ReferencesPass<'a> {
    pub(super) fn new(ctx: &'a FileContext, source: &'a str, scopes: &'a ScopeTree) -> Self {
        Self {
            ctx,
            source,
            scopes,
            references: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, captures: &[Capture<'_>]) {
        for capture in captures {
            match capture.name {
                "ref.call" => self.handle_call(capture.node),
                "ref.struct" => self.handle_struct_expression(capture.node),
                "ref.assignment" => self.handle_assignment(capture.node, false),
                "ref.augmented" => self.handle_assignment(capture.node, true),
                "ref.member" => self.handle_field(capture.node),
                "ref.index" => self.handle_index(capture.node),
                "ref.identifier" => self.handle_identifier(capture.node),
                "ref.type" => self.handle_type(capture.node),
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

    fn is_field_of(node: Node<'_>, parent: Node<'_>, field: &str) -> bool {
        parent.child_by_field_name(field) == Some(node)
    }

    fn construct_target(&self, node: Node<'_>) -> Option<Location> {
        let parent = node.parent()?;
        match parent.kind() {
            "let_declaration" if Self::is_field_of(node, parent, "value") => {
                let pattern = parent.child_by_field_name("pattern")?;
                Some(self.loc(pattern))
            }
            "assignment_expression" if Self::is_field_of(node, parent, "right") => {
                let left = parent.child_by_field_name("left")?;
                Some(self.loc(left))
            }
            _ => None,
        }
    }

    fn handle_call(&mut self, node: Node<'_>) {
        let mut callee = match node.child_by_field_name("function") {
            Some(c) => c,
            None => return,
        };
        if callee.kind() == "generic_function" {
            match callee.child_by_field_name("function") {
                Some(inner) => callee = inner,
                None => return,
            }
        }
        match callee.kind() {
            "identifier" => {
                self.push(
                    self.text(callee),
                    self.loc(node),
                    ReferenceDetail::FunctionCall {
                        potential_construct_target: self.construct_target(node),
                    },
                );
            }
            "field_expression" => {
                let Some(field) = callee.child_by_field_name("field") else {
                    return;
                };
                let Some(value) = callee.child_by_field_name("value") else {
                    return;
                };
                let name = self.text(field).to_string();
                let (root, chain) = field_chain(callee, self.source);
                let chain: Vec<SymbolName> = chain.into_iter().map(SymbolName::from).collect();
                match root {
                    RsChainRoot::SelfKeyword => {
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::SelfReferenceCall {
                                keyword: SelfKeyword::SelfParam,
                                property_chain: chain,
                            },
                        );
                    }
                    RsChainRoot::Identifier => {
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::MethodCall {
                                receiver_location: self.loc(value),
                                property_chain: chain,
                                optional_chaining: false,
                            },
                        );
                    }
                    RsChainRoot::Dynamic => {
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::MethodCall {
                                receiver_location: self.loc(value),
                                property_chain: Vec::new(),
                                optional_chaining: false,
                            },
                        );
                    }
                }
            }
            "scoped_identifier" => {
                let Some(name_node) = callee.child_by_field_name("name") else {
                    return;
                };
                let name = self.text(name_node);
                let path = callee
                    .child_by_field_name("path")
                    .map(|p| self.text(p))
                    .unwrap_or("");
                if name == "new" && !path.is_empty() {
                    // `Store::new()` is the canonical construction.
                    self.push(
                        path.rsplit("::").next().unwrap_or(path),
                        self.loc(node),
                        ReferenceDetail::ConstructorCall {
                            construct_target: self.construct_target(node),
                        },
                    );
                    return;
                }
                // `Type::method(...)` resolves like a rooted method chain.
                let mut chain: Vec<SymbolName> = self
                    .text(callee)
                    .split("::")
                    .map(SymbolName::from)
                    .collect();
                if chain.len() > 2 {
                    // Deep paths (std::mem::replace) are not receiver chains.
                    chain = Vec::new();
                }
                self.push(
                    name,
                    self.loc(node),
                    ReferenceDetail::MethodCall {
                        receiver_location: callee
                            .child_by_field_name("path")
                            .map(|p| self.loc(p))
                            .unwrap_or_else(|| self.loc(callee)),
                        property_chain: chain,
                        optional_chaining: false,
                    },
                );
            }
            _ => {}
        }
    }

    fn handle_struct_expression(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        let name = name.rsplit("::").next().unwrap_or(name);
        // Enum variant literals (`Color::Red { .. }`) are not constructions of
        // a class in this model; they still resolve through the variant path.
        self.push(
            name,
            self.loc(node),
            ReferenceDetail::ConstructorCall {
                construct_target: self.construct_target(node),
            },
        );
    }

    fn handle_assignment(&mut self, node: Node<'_>, augmented: bool) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
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

    fn handle_field(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        match parent.kind() {
            "field_expression" if Self::is_field_of(node, parent, "value") => return,
            "call_expression" if Self::is_field_of(node, parent, "function") => return,
            _ => {}
        }
        let Some(field) = node.child_by_field_name("field") else {
            return;
        };
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        let (root, chain) = field_chain(node, self.source);
        let chain = match root {
            RsChainRoot::Identifier | RsChainRoot::SelfKeyword => chain,
            RsChainRoot::Dynamic => Vec::new(),
        };
        self.push(
            self.text(field),
            self.loc(node),
            ReferenceDetail::PropertyAccess {
                receiver_location: self.loc(value),
                property_chain: chain.into_iter().map(SymbolName::from).collect(),
                access_type: PropertyAccessKind::Property,
                is_optional_chain: false,
            },
        );
    }

    fn handle_index(&mut self, node: Node<'_>) {
        let Some(value) = node.named_child(0) else {
            return;
        };
        if value.kind() != "identifier" {
            return;
        }
        self.push(
            self.text(value),
            self.loc(node),
            ReferenceDetail::PropertyAccess {
                receiver_location: self.loc(value),
                property_chain: vec![SymbolName::from(self.text(value))],
                access_type: PropertyAccessKind::Index,
                is_optional_chain: false,
            },
        );
    }

    fn handle_identifier(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        let parent_kind = parent.kind();
        if NON_REFERENCE_PARENTS.contains(&parent_kind) {
            return;
        }
        // Paths and macro bodies are not plain reads.
        if parent_kind == "scoped_identifier" || parent_kind == "scoped_type_identifier" {
            return;
        }
        if nearest_ancestor(node, &["token_tree", "attribute_item", "macro_invocation"]).is_some() {
            return;
        }
        if parent_kind == "call_expression" && Self::is_field_of(node, parent, "function") {
            return;
        }
        if (parent_kind == "assignment_expression" || parent_kind == "compound_assignment_expr")
            && Self::is_field_of(node, parent, "left")
        {
            return;
        }
        if parent_kind == "field_expression" && Self::is_field_of(node, parent, "field") {
            return;
        }
        // Binding positions: only the pattern side of a let or for.
        if (parent_kind == "let_declaration" || parent_kind == "for_expression")
            && Self::is_field_of(node, parent, "pattern")
        {
            return;
        }
        if parent_kind == "field_initializer" && Self::is_field_of(node, parent, "field") {
            return;
        }
        self.push(
            self.text(node),
            self.loc(node),
            ReferenceDetail::VariableReference {
                access_type: AccessType::Read,
            },
        );
    }

    fn handle_type(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        let parent_kind = parent.kind();
        // Declaration names are not uses.
        if matches!(
            parent_kind,
            "struct_item" | "enum_item" | "union_item" | "trait_item" | "type_item"
        ) && Self::is_field_of(node, parent, "name")
        {
            return;
        }
        let context = if parent_kind == "type_arguments" {
            TypeContext::Generic
        } else if parent_kind == "trait_bounds" {
            TypeContext::Extends
        } else if parent_kind == "impl_item" {
            if Self::is_field_of(node, parent, "trait") {
                TypeContext::Implements
            } else {
                TypeContext::Annotation
            }
        } else if nearest_ancestor(node, &["function_item", "function_signature_item"])
            .and_then(|f| f.child_by_field_name("return_type"))
            .map(|rt| {
                rt.byte_range().start <= node.start_byte() && node.end_byte() <= rt.byte_range().end
            })
            .unwrap_or(false)
        {
            TypeContext::Return
        } else {
            TypeContext::Annotation
        };
        self.push(
            self.text(node),
            self.loc(node),
            ReferenceDetail::TypeReference {
                type_context: context,
                type_info: None,
            },
        );
    }
}

fn operator_of<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !child.is_named() && child.kind().ends_with('=') && child.kind() != "=" {
            return node_text(child, source);
        }
    }
    ""
}
