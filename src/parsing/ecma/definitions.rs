//! Definition extraction for JavaScript/TypeScript.

use super::{
    ChainRoot, FUNCTION_KINDS, annotation_text, body_scope_id, member_chain, unwrap_expression,
};
use crate::definition::{
    CallbackContext, ClassDef, CollectionSource, ConstructorDef, Definition, DefinitionDetail,
    DefinitionFlags, DefinitionKind, EnumDef, FunctionCollection, FunctionDef, ImportDef,
    ImportKind, Initializer, InterfaceDef, MethodDef, Parameter, PropertyDef, Signature,
    TypeAliasDef, VariableDef,
};
use crate::definition::ExportEntry;
use crate::parsing::{Capture, FileContext, child_of_kinds, has_child_token, node_text, preceding_jsdoc};
use crate::scope::{ScopeKind, ScopeTree};
use crate::types::{Location, ScopeId, SymbolName};
use std::ops::Range;
use tree_sitter::Node;

const CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "class_expression",
    "abstract_class_declaration",
];

/// One pass over the capture stream, folding captures into definitions.
pub(super) struct DefinitionsPass<'a> {
    ctx: &'a FileContext,
    source: &'a str,
    scopes: &'a ScopeTree,
    definitions: Vec<Definition>,
    exports: Vec<ExportEntry>,
    /// (local name, exported name, is_default) pairs finalized once all
    /// definitions are known.
    pending_exports: Vec<(String, String, bool)>,
    /// Byte ranges of collection literals; identifier reads inside them are
    /// recorded as stored references instead.
    suppressed: Vec<Range<usize>>,
}

impl<'a> DefinitionsPass<'a> {
    pub(super) fn new(ctx: &'a FileContext, source: &'a str, scopes: &'a ScopeTree) -> Self {
        Self {
            ctx,
            source,
            scopes,
            definitions: Vec::new(),
            exports: Vec::new(),
            pending_exports: Vec::new(),
            suppressed: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, captures: &[Capture<'_>]) {
        for capture in captures {
            match capture.name {
                "def.function" => self.handle_function_declaration(capture.node),
                "def.function_expression" => self.handle_function_expression(capture.node),
                "def.class" => self.handle_class(capture.node),
                "def.variable" => self.handle_variable(capture.node),
                "def.import" => self.handle_import(capture.node),
                "def.export" => self.handle_export(capture.node),
                "def.interface" => self.handle_interface(capture.node),
                "def.type_alias" => self.handle_type_alias(capture.node),
                "def.enum" => self.handle_enum(capture.node),
                _ => {}
            }
        }
    }

    pub(super) fn finish(
        mut self,
    ) -> (Vec<Definition>, Vec<ExportEntry>, Vec<Range<usize>>) {
        let root = self.scopes.root_id().clone();
        let pending = std::mem::take(&mut self.pending_exports);
        for (local, exported, is_default) in pending {
            let Some(def) = self
                .definitions
                .iter_mut()
                .rev()
                .find(|d| d.name.as_str() == local && d.defining_scope_id == root)
            else {
                continue;
            };
            def.flags |= if is_default {
                DefinitionFlags::DEFAULT_EXPORT
            } else {
                DefinitionFlags::EXPORTED
            };
            self.exports.push(ExportEntry::Local {
                name: SymbolName::from(exported.as_str()),
                symbol_id: def.symbol_id.clone(),
                is_default,
            });
        }
        // Inline-exported declarations (`export function f`) that no clause
        // mentioned still need an export entry.
        let known: std::collections::HashSet<_> = self
            .exports
            .iter()
            .filter_map(|e| match e {
                ExportEntry::Local { symbol_id, .. } => Some(symbol_id.clone()),
                _ => None,
            })
            .collect();
        for def in &self.definitions {
            if def.defining_scope_id == root
                && def.is_exported()
                && !known.contains(&def.symbol_id)
            {
                let is_default = def.flags.contains(DefinitionFlags::DEFAULT_EXPORT);
                self.exports.push(ExportEntry::Local {
                    name: if is_default {
                        SymbolName::from("default")
                    } else {
                        def.name.clone()
                    },
                    symbol_id: def.symbol_id.clone(),
                    is_default,
                });
            }
        }
        (self.definitions, self.exports, self.suppressed)
    }

    // === shared helpers ===

    fn loc(&self, node: Node<'_>) -> Location {
        self.ctx.location(node)
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    fn defining_scope(&self, location: &Location) -> ScopeId {
        self.scopes.defining_scope_for(location).clone()
    }

    /// EXPORTED/DEFAULT_EXPORT flags derived from an enclosing export statement.
    fn export_flags(&self, node: Node<'_>) -> DefinitionFlags {
        let mut current = node.parent();
        for _ in 0..3 {
            let Some(n) = current else { break };
            if n.kind() == "export_statement" {
                return if has_child_token(n, "default") {
                    DefinitionFlags::DEFAULT_EXPORT
                } else {
                    DefinitionFlags::EXPORTED
                };
            }
            current = n.parent();
        }
        DefinitionFlags::empty()
    }

    /// JSDoc directly above the node, or above its export wrapper.
    fn doc_above(&self, node: Node<'_>) -> Option<String> {
        let anchor = match node.parent() {
            Some(p) if p.kind() == "export_statement" => p,
            _ => node,
        };
        preceding_jsdoc(anchor, self.source)
    }

    fn signature_of(&self, node: Node<'_>) -> Signature {
        let mut parameters = Vec::new();
        let params_node = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"));
        if let Some(params) = params_node {
            if params.kind() == "identifier" {
                // Single-parameter arrow function without parentheses.
                parameters.push(Parameter::new(self.text(params)));
            } else {
                let mut cursor = params.walk();
                for child in params.named_children(&mut cursor) {
                    if let Some(param) = self.parameter_of(child) {
                        parameters.push(param);
                    }
                }
            }
        }
        let return_type = node
            .child_by_field_name("return_type")
            .map(|n| annotation_text(n, self.source));
        Signature {
            parameters,
            return_type,
        }
    }

    fn parameter_of(&self, node: Node<'_>) -> Option<Parameter> {
        match node.kind() {
            "identifier" => Some(Parameter::new(self.text(node))),
            "required_parameter" | "optional_parameter" => {
                let pattern = node.child_by_field_name("pattern")?;
                if pattern.kind() == "this" {
                    return None;
                }
                let mut param = Parameter::new(self.text(pattern));
                if let Some(ty) = node.child_by_field_name("type") {
                    param = param.with_type(annotation_text(ty, self.source));
                }
                if let Some(value) = node.child_by_field_name("value") {
                    param = param.with_default(self.text(value));
                }
                Some(param)
            }
            "assignment_pattern" => {
                let left = node.child_by_field_name("left")?;
                let mut param = Parameter::new(self.text(left));
                if let Some(right) = node.child_by_field_name("right") {
                    param = param.with_default(self.text(right));
                }
                Some(param)
            }
            "rest_parameter" => {
                let name = child_of_kinds(node, &["identifier"])
                    .map(|n| self.text(n))
                    .unwrap_or_else(|| self.text(node));
                Some(Parameter::new(name))
            }
            "object_pattern" | "array_pattern" => Some(Parameter::new(self.text(node))),
            _ => None,
        }
    }

    /// Surface each named parameter as a variable bound to the callable scope.
    fn emit_parameter_definitions(&mut self, fn_node: Node<'_>, signature: &Signature) {
        let params_node = fn_node
            .child_by_field_name("parameters")
            .or_else(|| fn_node.child_by_field_name("parameter"));
        let Some(params) = params_node else { return };
        for param in &signature.parameters {
            let Some(name_node) = find_parameter_name_node(params, param.name.as_str(), self.source)
            else {
                continue;
            };
            let location = self.loc(name_node);
            let scope = self.defining_scope(&location);
            let mut detail = VariableDef::default();
            detail.type_name = param.type_name.clone();
            detail.initial_value = param.default_value.clone();
            let def = Definition::new(
                DefinitionKind::Variable,
                param.name.clone(),
                scope,
                location,
                DefinitionDetail::Variable(detail),
            )
            .with_flags(DefinitionFlags::PARAMETER);
            self.definitions.push(def);
        }
    }

    fn function_flags(&self, node: Node<'_>) -> DefinitionFlags {
        let mut flags = self.export_flags(node);
        if has_child_token(node, "async") {
            flags |= DefinitionFlags::ASYNC;
        }
        if node.kind().contains("generator") {
            flags |= DefinitionFlags::GENERATOR;
        }
        flags
    }

    /// `return HANDLERS[k]` / `return table.get(k)` marks a dispatcher.
    fn collection_source_of_body(&self, fn_node: Node<'_>) -> Option<CollectionSource> {
        let body = fn_node.child_by_field_name("body")?;
        let mut stack = vec![body];
        let mut visited = 0usize;
        while let Some(node) = stack.pop() {
            visited += 1;
            if visited > 512 {
                return None;
            }
            if node.kind() == "return_statement" {
                if let Some(expr) = node.named_child(0) {
                    if let Some(source) = self.collection_read_of(unwrap_expression(expr)) {
                        return Some(source);
                    }
                }
            }
            // Nested callables have their own dispatch behavior.
            if node != body && FUNCTION_KINDS.contains(&node.kind()) {
                continue;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        None
    }

    /// An expression that reads one entry out of a named collection.
    fn collection_read_of(&self, node: Node<'_>) -> Option<CollectionSource> {
        match node.kind() {
            "subscript_expression" => {
                let object = node.child_by_field_name("object")?;
                (object.kind() == "identifier").then(|| CollectionSource {
                    collection_name: SymbolName::from(self.text(object)),
                    location: self.loc(node),
                })
            }
            "call_expression" => {
                let callee = node.child_by_field_name("function")?;
                if callee.kind() != "member_expression" {
                    return None;
                }
                let property = callee.child_by_field_name("property")?;
                if self.text(property) != "get" {
                    return None;
                }
                let object = callee.child_by_field_name("object")?;
                (object.kind() == "identifier").then(|| CollectionSource {
                    collection_name: SymbolName::from(self.text(object)),
                    location: self.loc(node),
                })
            }
            _ => None,
        }
    }

    fn emit_function(
        &mut self,
        fn_node: Node<'_>,
        name: &str,
        defining_scope: ScopeId,
        extra_flags: DefinitionFlags,
        callback_context: Option<CallbackContext>,
        doc: Option<String>,
    ) {
        let signature = self.signature_of(fn_node);
        let body_scope = body_scope_id(self.ctx, fn_node, ScopeKind::Function);
        let location = self.loc(fn_node);
        let detail = FunctionDef {
            signature: signature.clone(),
            body_scope_id: body_scope,
            decorators: Vec::new(),
            callback_context,
            collection_source: self.collection_source_of_body(fn_node),
        };
        let mut def = Definition::new(
            DefinitionKind::Function,
            name,
            defining_scope,
            location,
            DefinitionDetail::Function(detail),
        )
        .with_flags(self.function_flags(fn_node) | extra_flags);
        if let Some(doc) = doc {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
        self.emit_parameter_definitions(fn_node, &signature);
    }

    // === handlers ===

    fn handle_function_declaration(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let doc = self.doc_above(node);
        self.emit_function(node, &name, scope, DefinitionFlags::empty(), None, doc);
    }

    fn handle_function_expression(&mut self, node: Node<'_>) {
        if let Some(name_node) = node.child_by_field_name("name") {
            // A named function expression defines its name inside its own
            // scope so the body can self-refer.
            let own_scope = body_scope_id(self.ctx, node, ScopeKind::Function);
            let name = self.text(name_node).to_string();
            self.emit_function(node, &name, own_scope, DefinitionFlags::empty(), None, None);
            return;
        }
        let Some(parent) = node.parent() else { return };
        match parent.kind() {
            "arguments" => {
                // Anonymous function in argument position: a callback. The
                // receiver is the call the argument list belongs to.
                let Some(call) = parent.parent() else { return };
                let context = CallbackContext {
                    is_callback: true,
                    receiver_location: self.loc(call),
                };
                let location = self.loc(node);
                let scope = self.defining_scope(&location);
                self.emit_function(
                    node,
                    "<anonymous>",
                    scope,
                    DefinitionFlags::empty(),
                    Some(context),
                    None,
                );
            }
            // Bound via a declarator or stored in a collection literal; those
            // handlers own the emission.
            "variable_declarator" | "pair" => {}
            _ => {
                let location = self.loc(node);
                let scope = self.defining_scope(&location);
                self.emit_function(node, "<anonymous>", scope, DefinitionFlags::empty(), None, None);
            }
        }
    }

    fn handle_class(&mut self, node: Node<'_>) {
        let (name, flags_basis) = match node.child_by_field_name("name") {
            Some(name_node) => (self.text(name_node).to_string(), node),
            None => match node.parent() {
                Some(p) if p.kind() == "variable_declarator" => {
                    let Some(var_name) = p.child_by_field_name("name") else {
                        return;
                    };
                    (self.text(var_name).to_string(), p)
                }
                _ => return,
            },
        };

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        if let Some(heritage) = child_of_kinds(node, &["class_heritage"]) {
            self.collect_heritage(heritage, &mut extends, &mut implements);
        }

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let class_scope = ScopeId::synthesize(ScopeKind::Class.token(), &self.loc(body));

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        let mut constructors = Vec::new();
        let mut pending_decorators: Vec<Box<str>> = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "decorator" => pending_decorators.push(self.text(member).into()),
                "method_definition" | "abstract_method_signature" => {
                    let decorators = std::mem::take(&mut pending_decorators);
                    if let Some(def) = self.extract_class_member(member, &class_scope, decorators) {
                        if def.kind == DefinitionKind::Constructor {
                            constructors.push(def);
                        } else {
                            methods.push(def);
                        }
                    }
                }
                "public_field_definition" | "field_definition" => {
                    pending_decorators.clear();
                    if let Some(def) = self.extract_property(member, &class_scope) {
                        properties.push(def);
                    }
                }
                _ => pending_decorators.clear(),
            }
        }

        let mut decorators: Vec<Box<str>> = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(self.text(child).into());
            }
        }

        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let mut flags = self.export_flags(flags_basis);
        if node.kind() == "abstract_class_declaration" {
            flags |= DefinitionFlags::ABSTRACT;
        }
        let mut def = Definition::new(
            DefinitionKind::Class,
            name,
            scope,
            location,
            DefinitionDetail::Class(ClassDef {
                extends,
                implements,
                methods,
                properties,
                constructors,
                decorators,
                body_scope_id: class_scope,
            }),
        )
        .with_flags(flags);
        if let Some(doc) = self.doc_above(node) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
    }

    fn collect_heritage(
        &self,
        heritage: Node<'_>,
        extends: &mut Vec<SymbolName>,
        implements: &mut Vec<SymbolName>,
    ) {
        let mut cursor = heritage.walk();
        for child in heritage.named_children(&mut cursor) {
            match child.kind() {
                "extends_clause" => {
                    let mut inner = child.walk();
                    for ty in child.named_children(&mut inner) {
                        if let Some(name) = self.type_head(ty) {
                            extends.push(name);
                        }
                    }
                }
                "implements_clause" => {
                    let mut inner = child.walk();
                    for ty in child.named_children(&mut inner) {
                        if let Some(name) = self.type_head(ty) {
                            implements.push(name);
                        }
                    }
                }
                // Plain JavaScript: `class A extends B` puts the expression
                // directly under class_heritage.
                _ => {
                    if let Some(name) = self.type_head(child) {
                        extends.push(name);
                    }
                }
            }
        }
    }

    /// Head name of a type expression: `Base`, `Base<T>` → `Base`.
    fn type_head(&self, node: Node<'_>) -> Option<SymbolName> {
        match node.kind() {
            "identifier" | "type_identifier" => Some(SymbolName::from(self.text(node))),
            "generic_type" => {
                let name = node.child_by_field_name("name")?;
                Some(SymbolName::from(self.text(name)))
            }
            "member_expression" | "nested_type_identifier" => {
                Some(SymbolName::from(self.text(node)))
            }
            _ => None,
        }
    }

    fn extract_class_member(
        &mut self,
        member: Node<'_>,
        class_scope: &ScopeId,
        decorators: Vec<Box<str>>,
    ) -> Option<Definition> {
        let name_node = member.child_by_field_name("name")?;
        let name = self.text(name_node).trim_matches(['"', '\'']).to_string();
        let is_constructor = name == "constructor";
        let signature = self.signature_of(member);
        let has_body = member.child_by_field_name("body").is_some();
        let scope_kind = if is_constructor {
            ScopeKind::Constructor
        } else {
            ScopeKind::Method
        };
        let body_scope = has_body.then(|| body_scope_id(self.ctx, member, scope_kind));

        let mut flags = DefinitionFlags::empty();
        if has_child_token(member, "static") {
            flags |= DefinitionFlags::STATIC;
        }
        if has_child_token(member, "async") {
            flags |= DefinitionFlags::ASYNC;
        }
        if member.kind() == "abstract_method_signature" {
            flags |= DefinitionFlags::ABSTRACT;
        }

        let location = self.loc(member);
        let detail = if is_constructor {
            DefinitionDetail::Constructor(ConstructorDef {
                signature: signature.clone(),
                body_scope_id: body_scope,
            })
        } else {
            DefinitionDetail::Method(MethodDef {
                signature: signature.clone(),
                body_scope_id: body_scope,
                decorators,
            })
        };
        let kind = if is_constructor {
            DefinitionKind::Constructor
        } else {
            DefinitionKind::Method
        };
        let mut def = Definition::new(kind, name, class_scope.clone(), location, detail)
            .with_flags(flags);
        if let Some(doc) = preceding_jsdoc(member, self.source) {
            def = def.with_doc(doc);
        }
        if has_body {
            self.emit_parameter_definitions(member, &signature);
        }
        Some(def)
    }

    fn extract_property(&mut self, member: Node<'_>, class_scope: &ScopeId) -> Option<Definition> {
        let name_node = member
            .child_by_field_name("name")
            .or_else(|| member.child_by_field_name("property"))?;
        let name = self.text(name_node).to_string();
        let type_name = member
            .child_by_field_name("type")
            .map(|n| annotation_text(n, self.source));
        let initial_value = member
            .child_by_field_name("value")
            .map(|n| Box::<str>::from(self.text(n)));
        let mut flags = DefinitionFlags::empty();
        if has_child_token(member, "static") {
            flags |= DefinitionFlags::STATIC;
        }
        Some(
            Definition::new(
                DefinitionKind::Property,
                name,
                class_scope.clone(),
                self.loc(member),
                DefinitionDetail::Property(PropertyDef {
                    type_name,
                    initial_value,
                }),
            )
            .with_flags(flags),
        )
    }

    fn handle_variable(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        // Destructuring patterns stay one binding under their literal text.
        let name = self.text(name_node).to_string();
        let value = node.child_by_field_name("value").map(unwrap_expression);

        let is_const = node
            .parent()
            .map(|p| has_child_token(p, "const"))
            .unwrap_or(false);

        if let Some(value) = value {
            if CLASS_KINDS.contains(&value.kind()) {
                // handle_class names the class after this binding.
                return;
            }
            if FUNCTION_KINDS.contains(&value.kind()) {
                let location = self.loc(name_node);
                let scope = self.defining_scope(&location);
                let doc = self.doc_above_declaration(node);
                let flags = self.export_flags(node)
                    | if is_const {
                        DefinitionFlags::CONSTANT
                    } else {
                        DefinitionFlags::empty()
                    };
                self.emit_function(value, &name, scope, flags, None, doc);
                return;
            }
        }

        let mut detail = VariableDef::default();
        detail.type_name = node
            .child_by_field_name("type")
            .map(|n| annotation_text(n, self.source));
        if let Some(value) = value {
            detail.initial_value = Some(self.text(value).into());
            self.analyze_initializer(value, &mut detail);
        }

        let location = self.loc(name_node);
        let scope = self.defining_scope(&location);
        let (kind, const_flag) = if is_const {
            (DefinitionKind::Constant, DefinitionFlags::CONSTANT)
        } else {
            (DefinitionKind::Variable, DefinitionFlags::empty())
        };
        let mut def = Definition::new(kind, name, scope, location, DefinitionDetail::Variable(detail))
            .with_flags(self.export_flags(node) | const_flag);
        if let Some(doc) = self.doc_above_declaration(node) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
    }

    /// JSDoc above the declaration statement that owns this declarator.
    fn doc_above_declaration(&self, declarator: Node<'_>) -> Option<String> {
        let declaration = declarator.parent()?;
        self.doc_above(declaration)
    }

    fn analyze_initializer(&mut self, value: Node<'_>, detail: &mut VariableDef) {
        match value.kind() {
            "object" | "array" => {
                if let Some(collection) = self.collection_of_literal(value) {
                    detail.function_collection = Some(collection);
                    detail.initializer = Some(Initializer::CollectionLiteral);
                    self.suppressed.push(value.byte_range());
                } else {
                    detail.initializer = Some(Initializer::Other);
                }
            }
            "new_expression" => {
                let class_name = value
                    .child_by_field_name("constructor")
                    .map(|c| match c.kind() {
                        "member_expression" => c
                            .child_by_field_name("property")
                            .map(|p| self.text(p))
                            .unwrap_or_else(|| self.text(c)),
                        _ => self.text(c),
                    });
                if let Some(class_name) = class_name {
                    detail.initializer = Some(Initializer::ConstructorCall {
                        class_name: SymbolName::from(class_name),
                        location: self.loc(value),
                    });
                }
            }
            "call_expression" => {
                if let Some(source) = self.collection_read_of(value) {
                    detail.collection_source = Some(source);
                    detail.initializer = Some(Initializer::Other);
                    return;
                }
                let Some(callee) = value.child_by_field_name("function") else {
                    detail.initializer = Some(Initializer::Other);
                    return;
                };
                if callee.kind() == "member_expression" {
                    let (root, chain) = member_chain(callee, self.source);
                    if matches!(root, ChainRoot::Identifier) && !chain.is_empty() {
                        detail.initializer = Some(Initializer::MethodCall {
                            property_chain: chain.into_iter().map(SymbolName::from).collect(),
                            location: self.loc(value),
                        });
                        return;
                    }
                }
                detail.initializer = Some(Initializer::Other);
            }
            "subscript_expression" => {
                detail.collection_source = self.collection_read_of(value);
                detail.initializer = Some(Initializer::Other);
            }
            "identifier" => {
                detail.initializer = Some(Initializer::FunctionRef {
                    name: SymbolName::from(self.text(value)),
                });
            }
            _ => {
                detail.initializer = Some(Initializer::Other);
            }
        }
    }

    /// A literal container of functions. Inline functions are emitted as
    /// definitions named by their key; identifier values and spread sources
    /// are stored as named references.
    fn collection_of_literal(&mut self, literal: Node<'_>) -> Option<FunctionCollection> {
        let mut collection = FunctionCollection::default();
        let mut cursor = literal.walk();
        for entry in literal.named_children(&mut cursor) {
            match entry.kind() {
                "pair" => {
                    let Some(key) = entry.child_by_field_name("key") else {
                        continue;
                    };
                    let Some(value) = entry.child_by_field_name("value").map(unwrap_expression)
                    else {
                        continue;
                    };
                    let key_text = self.text(key).trim_matches(['"', '\'']).to_string();
                    if FUNCTION_KINDS.contains(&value.kind()) {
                        let location = self.loc(value);
                        let scope = self.defining_scope(&location);
                        self.emit_function(
                            value,
                            &key_text,
                            scope,
                            DefinitionFlags::empty(),
                            None,
                            None,
                        );
                        let id = self
                            .definitions
                            .iter()
                            .rev()
                            .find(|d| d.kind == DefinitionKind::Function && d.location == location)
                            .map(|d| d.symbol_id.clone());
                        if let Some(id) = id {
                            collection.stored_functions.push(id);
                        }
                    } else if value.kind() == "identifier" {
                        collection
                            .stored_references
                            .push(SymbolName::from(self.text(value)));
                    }
                }
                "method_definition" => {
                    // Object-literal method shorthand: an inline function.
                    let Some(name_node) = entry.child_by_field_name("name") else {
                        continue;
                    };
                    let name = self.text(name_node).to_string();
                    let location = self.loc(entry);
                    let scope = self.defining_scope(&location);
                    let signature = self.signature_of(entry);
                    let body_scope =
                        body_scope_id(self.ctx, entry, super::method_scope_kind(entry, self.source));
                    let def = Definition::new(
                        DefinitionKind::Function,
                        name,
                        scope,
                        location,
                        DefinitionDetail::Function(FunctionDef {
                            signature: signature.clone(),
                            body_scope_id: body_scope,
                            decorators: Vec::new(),
                            callback_context: None,
                            collection_source: None,
                        }),
                    );
                    collection.stored_functions.push(def.symbol_id.clone());
                    self.definitions.push(def);
                    self.emit_parameter_definitions(entry, &signature);
                }
                "shorthand_property_identifier" => {
                    collection
                        .stored_references
                        .push(SymbolName::from(self.text(entry)));
                }
                "spread_element" => {
                    if let Some(inner) = entry.named_child(0) {
                        if inner.kind() == "identifier" {
                            collection
                                .stored_references
                                .push(SymbolName::from(self.text(inner)));
                        }
                    }
                }
                "identifier" => {
                    // Array element.
                    collection
                        .stored_references
                        .push(SymbolName::from(self.text(entry)));
                }
                kind if FUNCTION_KINDS.contains(&kind) => {
                    // Array element holding an inline function.
                    let location = self.loc(entry);
                    let scope = self.defining_scope(&location);
                    self.emit_function(
                        entry,
                        "<anonymous>",
                        scope,
                        DefinitionFlags::empty(),
                        None,
                        None,
                    );
                    let id = self
                        .definitions
                        .iter()
                        .rev()
                        .find(|d| d.kind == DefinitionKind::Function && d.location == location)
                        .map(|d| d.symbol_id.clone());
                    if let Some(id) = id {
                        collection.stored_functions.push(id);
                    }
                }
                _ => {}
            }
        }
        (!collection.is_empty()).then_some(collection)
    }

    fn handle_import(&mut self, node: Node<'_>) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let source_path: Box<str> = self
            .text(source_node)
            .trim_matches(['"', '\'', '`'])
            .into();
        let location = self.loc(node);
        let scope = self.defining_scope(&location);

        let Some(clause) = child_of_kinds(node, &["import_clause"]) else {
            // `import "./polyfill"` binds nothing; keep the record.
            let def = Definition::new(
                DefinitionKind::Import,
                source_path.to_string(),
                scope,
                location,
                DefinitionDetail::Import(ImportDef {
                    import_kind: ImportKind::SideEffect,
                    source_path,
                    original_name: None,
                }),
            );
            self.definitions.push(def);
            return;
        };

        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    let def = Definition::new(
                        DefinitionKind::Import,
                        self.text(child),
                        scope.clone(),
                        self.loc(child),
                        DefinitionDetail::Import(ImportDef {
                            import_kind: ImportKind::Default,
                            source_path: source_path.clone(),
                            original_name: None,
                        }),
                    );
                    self.definitions.push(def);
                }
                "namespace_import" => {
                    if let Some(alias) = child_of_kinds(child, &["identifier"]) {
                        let def = Definition::new(
                            DefinitionKind::Import,
                            self.text(alias),
                            scope.clone(),
                            self.loc(alias),
                            DefinitionDetail::Import(ImportDef {
                                import_kind: ImportKind::Namespace,
                                source_path: source_path.clone(),
                                original_name: None,
                            }),
                        );
                        self.definitions.push(def);
                    }
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name_node) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let original = self.text(name_node).to_string();
                        let (local, local_node, original_name) =
                            match spec.child_by_field_name("alias") {
                                Some(alias) => (
                                    self.text(alias).to_string(),
                                    alias,
                                    Some(SymbolName::from(original.as_str())),
                                ),
                                None => (original.clone(), name_node, None),
                            };
                        let def = Definition::new(
                            DefinitionKind::Import,
                            local,
                            scope.clone(),
                            self.loc(local_node),
                            DefinitionDetail::Import(ImportDef {
                                import_kind: ImportKind::Named,
                                source_path: source_path.clone(),
                                original_name,
                            }),
                        );
                        self.definitions.push(def);
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_export(&mut self, node: Node<'_>) {
        let source = node
            .child_by_field_name("source")
            .map(|s| Box::<str>::from(self.text(s).trim_matches(['"', '\'', '`'])));

        if let Some(source) = source {
            if has_child_token(node, "*") {
                self.exports.push(ExportEntry::ReexportAll { source });
                return;
            }
            if let Some(clause) = child_of_kinds(node, &["export_clause"]) {
                let mut cursor = clause.walk();
                for spec in clause.named_children(&mut cursor) {
                    if spec.kind() != "export_specifier" {
                        continue;
                    }
                    let Some(name_node) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let original = SymbolName::from(self.text(name_node));
                    let exported = spec
                        .child_by_field_name("alias")
                        .map(|a| SymbolName::from(self.text(a)))
                        .unwrap_or_else(|| original.clone());
                    self.exports.push(ExportEntry::Reexport {
                        exported,
                        original,
                        source: source.clone(),
                    });
                }
            }
            return;
        }

        let is_default = has_child_token(node, "default");
        if let Some(declaration) = node.child_by_field_name("declaration") {
            for name in self.declaration_names(declaration) {
                let exported = if is_default {
                    "default".to_string()
                } else {
                    name.clone()
                };
                self.pending_exports.push((name, exported, is_default));
            }
            return;
        }
        if is_default {
            if let Some(value) = node.child_by_field_name("value") {
                if value.kind() == "identifier" {
                    self.pending_exports.push((
                        self.text(value).to_string(),
                        "default".to_string(),
                        true,
                    ));
                }
            }
            return;
        }
        if let Some(clause) = child_of_kinds(node, &["export_clause"]) {
            let mut cursor = clause.walk();
            for spec in clause.named_children(&mut cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let Some(name_node) = spec.child_by_field_name("name") else {
                    continue;
                };
                let local = self.text(name_node).to_string();
                let exported = spec
                    .child_by_field_name("alias")
                    .map(|a| self.text(a).to_string())
                    .unwrap_or_else(|| local.clone());
                let default = exported == "default";
                self.pending_exports.push((local, exported, default));
            }
        }
    }

    /// Names bound by a declaration under an export statement.
    fn declaration_names(&self, declaration: Node<'_>) -> Vec<String> {
        match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut names = Vec::new();
                let mut cursor = declaration.walk();
                for child in declaration.named_children(&mut cursor) {
                    if child.kind() == "variable_declarator" {
                        if let Some(name) = child.child_by_field_name("name") {
                            names.push(self.text(name).to_string());
                        }
                    }
                }
                names
            }
            _ => declaration
                .child_by_field_name("name")
                .map(|n| vec![self.text(n).to_string()])
                .unwrap_or_default(),
        }
    }

    fn handle_interface(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let location = self.loc(node);
        let scope = self.defining_scope(&location);

        let mut extends = Vec::new();
        if let Some(clause) = child_of_kinds(node, &["extends_type_clause", "extends_clause"]) {
            let mut cursor = clause.walk();
            for ty in clause.named_children(&mut cursor) {
                if let Some(head) = self.type_head(ty) {
                    extends.push(head);
                }
            }
        }

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "property_signature" => {
                        let Some(prop_name) = member.child_by_field_name("name") else {
                            continue;
                        };
                        properties.push(Definition::new(
                            DefinitionKind::Property,
                            self.text(prop_name),
                            scope.clone(),
                            self.loc(member),
                            DefinitionDetail::Property(PropertyDef {
                                type_name: member
                                    .child_by_field_name("type")
                                    .map(|t| annotation_text(t, self.source)),
                                initial_value: None,
                            }),
                        ));
                    }
                    "method_signature" => {
                        let Some(method_name) = member.child_by_field_name("name") else {
                            continue;
                        };
                        methods.push(Definition::new(
                            DefinitionKind::Method,
                            self.text(method_name),
                            scope.clone(),
                            self.loc(member),
                            DefinitionDetail::Method(MethodDef {
                                signature: self.signature_of(member),
                                body_scope_id: None,
                                decorators: Vec::new(),
                            }),
                        ));
                    }
                    _ => {}
                }
            }
        }

        let mut def = Definition::new(
            DefinitionKind::Interface,
            name,
            scope,
            location,
            DefinitionDetail::Interface(InterfaceDef {
                extends,
                methods,
                properties,
            }),
        )
        .with_flags(self.export_flags(node));
        if let Some(doc) = self.doc_above(node) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
    }

    fn handle_type_alias(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let type_expression = node
            .child_by_field_name("value")
            .map(|v| Box::<str>::from(self.text(v)))
            .unwrap_or_default();
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let def = Definition::new(
            DefinitionKind::TypeAlias,
            self.text(name_node),
            scope,
            location,
            DefinitionDetail::TypeAlias(TypeAliasDef { type_expression }),
        )
        .with_flags(self.export_flags(node));
        self.definitions.push(def);
    }

    fn handle_enum(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "enum_assignment" => {
                        if let Some(n) = member.child_by_field_name("name") {
                            members.push(SymbolName::from(self.text(n)));
                        }
                    }
                    "property_identifier" => {
                        members.push(SymbolName::from(self.text(member)));
                    }
                    _ => {}
                }
            }
        }
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let def = Definition::new(
            DefinitionKind::Enum,
            self.text(name_node),
            scope,
            location,
            DefinitionDetail::Enum(EnumDef { members }),
        )
        .with_flags(self.export_flags(node));
        self.definitions.push(def);
    }
}

/// Locate the identifier node of a parameter by name, for location synthesis.
fn find_parameter_name_node<'t>(
    params: Node<'t>,
    name: &str,
    source: &str,
) -> Option<Node<'t>> {
    if params.kind() == "identifier" && node_text(params, source) == name {
        return Some(params);
    }
    let mut stack = vec![params];
    while let Some(node) = stack.pop() {
        if node.kind() == "identifier" && node_text(node, source) == name {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            // Do not descend into default-value expressions.
            if node.kind() == "assignment_pattern"
                && node.child_by_field_name("right") == Some(child)
            {
                continue;
            }
            stack.push(child);
        }
    }
    None
}
