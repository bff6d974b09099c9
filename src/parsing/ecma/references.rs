//! Reference extraction for JavaScript/TypeScript.

use super::{ChainRoot, member_chain};
use crate::parsing::{Capture, FileContext, node_text};
use crate::reference::{
    AccessType, PropertyAccessKind, Reference, ReferenceDetail, SelfKeyword, TypeContext,
};
use crate::scope::ScopeTree;
use crate::types::{Location, ScopeId, SymbolName};
use std::ops::Range;
use tree_sitter::Node;

/// Parents under which an identifier is a binding or label, not a use.
const NON_REFERENCE_PARENTS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "class_declaration",
    "class_expression",
    "abstract_class_declaration",
    "method_definition",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "import_specifier",
    "import_clause",
    "namespace_import",
    "export_specifier",
    "required_parameter",
    "optional_parameter",
    "rest_parameter",
    "formal_parameters",
    "object_pattern",
    "array_pattern",
    "shorthand_property_identifier_pattern",
    "labeled_statement",
    "break_statement",
    "continue_statement",
    "catch_clause",
    "decorator",
    "nested_identifier",
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
                "ref.new" => self.handle_new(capture.node),
                "ref.assignment" => self.handle_assignment(capture.node, false),
                "ref.augmented_assignment" => self.handle_assignment(capture.node, true),
                "ref.member" => self.handle_member(capture.node),
                "ref.subscript" => self.handle_subscript(capture.node),
                "ref.identifier" => self.handle_identifier(capture.node),
                "ref.type" => self.handle_type(capture.node),
                _ => {}
            }
        }
    }

    pub(super) fn finish(self) -> Vec<Reference> {
        self.references
    }

    // === helpers ===

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

    /// Is `node` the value of the named field on its parent?
    fn is_field_of(node: Node<'_>, parent: Node<'_>, field: &str) -> bool {
        parent.child_by_field_name(field) == Some(node)
    }

    /// Walk out of wrapper expressions to the enclosing statement context.
    fn unwrapped_parent(node: Node<'_>) -> Option<Node<'_>> {
        let mut current = node.parent()?;
        loop {
            match current.kind() {
                "parenthesized_expression" | "as_expression" | "satisfies_expression"
                | "non_null_expression" | "await_expression" => {
                    current = current.parent()?;
                }
                _ => return Some(current),
            }
        }
    }

    /// The binding a construction flows into, when the construction is the
    /// immediate value of a declarator or assignment.
    fn construct_target(&self, node: Node<'_>) -> Option<Location> {
        let parent = Self::unwrapped_parent(node)?;
        match parent.kind() {
            "variable_declarator" => {
                let name = parent.child_by_field_name("name")?;
                Some(self.loc(name))
            }
            "assignment_expression" => {
                if Self::is_field_of(node, parent, "right")
                    || parent.child_by_field_name("right").map(|r| r.byte_range())
                        == Some(node.byte_range())
                {
                    let left = parent.child_by_field_name("left")?;
                    Some(self.loc(left))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    // === handlers ===

    fn handle_call(&mut self, node: Node<'_>) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        match callee.kind() {
            "identifier" => {
                let detail = ReferenceDetail::FunctionCall {
                    potential_construct_target: self.construct_target(node),
                };
                self.push(self.text(callee), self.loc(node), detail);
            }
            "member_expression" => {
                let Some(property) = callee.child_by_field_name("property") else {
                    return;
                };
                let name = self.text(property).to_string();
                let Some(object) = callee.child_by_field_name("object") else {
                    return;
                };
                let optional = self.text(callee).contains("?.");
                let receiver_location = self.loc(object);
                let (root, chain) = member_chain(callee, self.source);
                match root {
                    ChainRoot::Keyword(keyword) => {
                        let keyword = SelfKeyword::parse(keyword).unwrap_or(SelfKeyword::This);
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::SelfReferenceCall {
                                keyword,
                                property_chain: chain
                                    .into_iter()
                                    .map(SymbolName::from)
                                    .collect(),
                            },
                        );
                    }
                    ChainRoot::Identifier => {
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::MethodCall {
                                receiver_location,
                                property_chain: chain
                                    .into_iter()
                                    .map(SymbolName::from)
                                    .collect(),
                                optional_chaining: optional,
                            },
                        );
                    }
                    ChainRoot::Dynamic => {
                        // Chain extraction aborts at the dynamic boundary.
                        self.push(
                            &name,
                            self.loc(node),
                            ReferenceDetail::MethodCall {
                                receiver_location,
                                property_chain: Vec::new(),
                                optional_chaining: optional,
                            },
                        );
                    }
                }
            }
            "super" => {
                self.push(
                    "super",
                    self.loc(node),
                    ReferenceDetail::SelfReferenceCall {
                        keyword: SelfKeyword::Super,
                        property_chain: Vec::new(),
                    },
                );
            }
            _ => {
                // Computed or immediately-invoked callee: nothing nameable.
            }
        }
    }

    fn handle_new(&mut self, node: Node<'_>) {
        let Some(ctor) = node.child_by_field_name("constructor") else {
            return;
        };
        let name = match ctor.kind() {
            "identifier" | "type_identifier" => self.text(ctor).to_string(),
            "member_expression" => ctor
                .child_by_field_name("property")
                .map(|p| self.text(p).to_string())
                .unwrap_or_else(|| self.text(ctor).to_string()),
            _ => return,
        };
        let detail = ReferenceDetail::ConstructorCall {
            construct_target: self.construct_target(node),
        };
        self.push(&name, self.loc(node), detail);
    }

    fn handle_assignment(&mut self, node: Node<'_>, augmented: bool) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let target_location = self.loc(left);
        let assignment_type = augmented.then(|| {
            node.child_by_field_name("operator")
                .map(|op| Box::<str>::from(self.text(op)))
                .unwrap_or_else(|| Box::from(operator_of(node, self.source)))
        });
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

    fn handle_member(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        // Only the outermost spine node reports the access; callees belong to
        // the call reference.
        match parent.kind() {
            "member_expression" | "subscript_expression"
                if Self::is_field_of(node, parent, "object") =>
            {
                return;
            }
            "call_expression" if Self::is_field_of(node, parent, "function") => return,
            "new_expression" if Self::is_field_of(node, parent, "constructor") => return,
            _ => {}
        }
        let Some(property) = node.child_by_field_name("property") else {
            return;
        };
        let Some(object) = node.child_by_field_name("object") else {
            return;
        };
        let (root, chain) = member_chain(node, self.source);
        let chain = match root {
            ChainRoot::Identifier | ChainRoot::Keyword(_) => chain,
            ChainRoot::Dynamic => Vec::new(),
        };
        self.push(
            self.text(property),
            self.loc(node),
            ReferenceDetail::PropertyAccess {
                receiver_location: self.loc(object),
                property_chain: chain.into_iter().map(SymbolName::from).collect(),
                access_type: PropertyAccessKind::Property,
                is_optional_chain: self.text(node).contains("?."),
            },
        );
    }

    fn handle_subscript(&mut self, node: Node<'_>) {
        let Some(parent) = node.parent() else { return };
        match parent.kind() {
            "member_expression" | "subscript_expression"
                if Self::is_field_of(node, parent, "object") =>
            {
                return;
            }
            "call_expression" if Self::is_field_of(node, parent, "function") => return,
            _ => {}
        }
        let Some(object) = node.child_by_field_name("object") else {
            return;
        };
        let (root, chain) = member_chain(object, self.source);
        let (name, chain) = match root {
            ChainRoot::Identifier => (
                chain.last().cloned().unwrap_or_default(),
                chain.into_iter().map(SymbolName::from).collect(),
            ),
            _ => (self.text(object).to_string(), Vec::new()),
        };
        if name.is_empty() {
            return;
        }
        self.push(
            &name,
            self.loc(node),
            ReferenceDetail::PropertyAccess {
                receiver_location: self.loc(object),
                property_chain: chain,
                access_type: PropertyAccessKind::Index,
                is_optional_chain: self.text(node).contains("?."),
            },
        );
    }

    fn handle_identifier(&mut self, node: Node<'_>) {
        if self.is_suppressed(node) {
            return;
        }
        let Some(parent) = node.parent() else { return };
        let parent_kind = parent.kind();

        if NON_REFERENCE_PARENTS.contains(&parent_kind) {
            return;
        }
        // `class A extends B`: B is a type use.
        if parent_kind == "class_heritage" {
            self.push(
                self.text(node),
                self.loc(node),
                ReferenceDetail::TypeReference {
                    type_context: TypeContext::Extends,
                    type_info: None,
                },
            );
            return;
        }
        if parent_kind == "variable_declarator" && Self::is_field_of(node, parent, "name") {
            return;
        }
        if parent_kind == "pair" && Self::is_field_of(node, parent, "key") {
            return;
        }
        if parent_kind == "call_expression" && Self::is_field_of(node, parent, "function") {
            return;
        }
        if parent_kind == "new_expression" && Self::is_field_of(node, parent, "constructor") {
            return;
        }
        if (parent_kind == "assignment_expression"
            || parent_kind == "augmented_assignment_expression")
            && Self::is_field_of(node, parent, "left")
        {
            return;
        }
        if parent_kind == "assignment_pattern" && Self::is_field_of(node, parent, "left") {
            return;
        }
        if parent_kind == "arrow_function" && Self::is_field_of(node, parent, "parameter") {
            return;
        }
        if parent_kind == "update_expression" {
            // i++ reads and writes.
            let name = self.text(node).to_string();
            let location = self.loc(node);
            self.push(
                &name,
                location.clone(),
                ReferenceDetail::VariableReference {
                    access_type: AccessType::Read,
                },
            );
            self.push(
                &name,
                location,
                ReferenceDetail::VariableReference {
                    access_type: AccessType::Write,
                },
            );
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
        // Declaration names are not uses.
        if matches!(
            parent.kind(),
            "interface_declaration"
                | "type_alias_declaration"
                | "class_declaration"
                | "abstract_class_declaration"
                | "enum_declaration"
        ) && Self::is_field_of(node, parent, "name")
        {
            return;
        }

        let mut context = None;
        let mut current = Some(parent);
        for _ in 0..12 {
            let Some(n) = current else { break };
            match n.kind() {
                "type_arguments" => {
                    context = Some(TypeContext::Generic);
                    break;
                }
                "extends_clause" | "extends_type_clause" | "class_heritage" => {
                    context = Some(TypeContext::Extends);
                    break;
                }
                "implements_clause" => {
                    context = Some(TypeContext::Implements);
                    break;
                }
                "type_annotation" => {
                    let is_return = n
                        .parent()
                        .and_then(|p| p.child_by_field_name("return_type"))
                        .map(|rt| rt.byte_range() == n.byte_range())
                        .unwrap_or(false);
                    context = Some(if is_return {
                        TypeContext::Return
                    } else {
                        TypeContext::Annotation
                    });
                    break;
                }
                "type_alias_declaration" => {
                    context = Some(TypeContext::Annotation);
                    break;
                }
                _ => current = n.parent(),
            }
        }
        let Some(type_context) = context else { return };
        let type_info = (parent.kind() == "generic_type")
            .then(|| Box::<str>::from(self.text(parent)));
        self.push(
            self.text(node),
            self.loc(node),
            ReferenceDetail::TypeReference {
                type_context,
                type_info,
            },
        );
    }
}

/// Operator text of an augmented assignment (`+=`, `||=`, ...).
fn operator_of<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !child.is_named() && child.kind().ends_with('=') && child.kind() != "=" {
            return node_text(child, source);
        }
    }
    ""
}
