//! Definition extraction for Python.

use super::{PyChainRoot, attribute_chain, callable_scope_kind, decorators_of, docstring_of, is_class_member};
use crate::definition::{
    ClassDef, CollectionSource, ConstructorDef, Definition, DefinitionDetail, DefinitionFlags,
    DefinitionKind, ExportEntry, FunctionCollection, FunctionDef, ImportDef, ImportKind,
    Initializer, MethodDef, Parameter, PropertyDef, Signature, VariableDef,
};
use crate::parsing::{Capture, FileContext, node_text};
use crate::scope::{ScopeKind, ScopeTree};
use crate::types::{Location, ScopeId, SymbolName};
use std::ops::Range;
use tree_sitter::Node;

pub(super) struct DefinitionsPass<'a> {
    ctx: &'a FileContext,
    source: &'a str,
    scopes: &'a ScopeTree,
    definitions: Vec<Definition>,
    exports: Vec<ExportEntry>,
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
            suppressed: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, captures: &[Capture<'_>]) {
        for capture in captures {
            match capture.name {
                "def.function" => self.handle_function(capture.node),
                "def.class" => self.handle_class(capture.node),
                "def.variable" => self.handle_assignment(capture.node),
                "def.import" => self.handle_import(capture.node),
                "def.import_from" => self.handle_import_from(capture.node),
                _ => {}
            }
        }
    }

    pub(super) fn finish(mut self) -> (Vec<Definition>, Vec<ExportEntry>, Vec<Range<usize>>) {
        // Every public module-level name is importable; imports re-export
        // under their local name, which lets export chains hop through.
        let root = self.scopes.root_id().clone();
        for def in &mut self.definitions {
            if def.defining_scope_id != root || def.name.as_str().starts_with('_') {
                continue;
            }
            match &def.detail {
                DefinitionDetail::Import(import) => {
                    if import.import_kind == ImportKind::Named {
                        self.exports.push(ExportEntry::Reexport {
                            exported: def.name.clone(),
                            original: import
                                .original_name
                                .clone()
                                .unwrap_or_else(|| def.name.clone()),
                            source: import.source_path.clone(),
                        });
                    }
                }
                _ => {
                    def.flags |= DefinitionFlags::EXPORTED;
                    self.exports.push(ExportEntry::Local {
                        name: def.name.clone(),
                        symbol_id: def.symbol_id.clone(),
                        is_default: false,
                    });
                }
            }
        }
        (self.definitions, self.exports, self.suppressed)
    }

    fn loc(&self, node: Node<'_>) -> Location {
        self.ctx.location(node)
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    fn defining_scope(&self, location: &Location) -> ScopeId {
        self.scopes.defining_scope_for(location).clone()
    }

    fn signature_of(&self, node: Node<'_>) -> Signature {
        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for child in params.named_children(&mut cursor) {
                match child.kind() {
                    "identifier" => parameters.push(Parameter::new(self.text(child))),
                    "typed_parameter" => {
                        let name = child
                            .named_child(0)
                            .map(|n| self.text(n))
                            .unwrap_or_default();
                        let mut param = Parameter::new(name);
                        if let Some(ty) = child.child_by_field_name("type") {
                            param = param.with_type(self.text(ty));
                        }
                        parameters.push(param);
                    }
                    "default_parameter" | "typed_default_parameter" => {
                        let Some(name) = child.child_by_field_name("name") else {
                            continue;
                        };
                        let mut param = Parameter::new(self.text(name));
                        if let Some(ty) = child.child_by_field_name("type") {
                            param = param.with_type(self.text(ty));
                        }
                        if let Some(value) = child.child_by_field_name("value") {
                            param = param.with_default(self.text(value));
                        }
                        parameters.push(param);
                    }
                    "list_splat_pattern" | "dictionary_splat_pattern" => {
                        parameters.push(Parameter::new(self.text(child)));
                    }
                    _ => {}
                }
            }
        }
        let return_type = node
            .child_by_field_name("return_type")
            .map(|n| Box::<str>::from(self.text(n)));
        Signature {
            parameters,
            return_type,
        }
    }

    fn emit_parameter_definitions(&mut self, fn_node: Node<'_>, signature: &Signature) {
        let Some(params) = fn_node.child_by_field_name("parameters") else {
            return;
        };
        for param in &signature.parameters {
            let name = param.name.as_str();
            if name == "self" || name == "cls" || name.starts_with('*') {
                continue;
            }
            let Some(name_node) = find_identifier(params, name, self.source) else {
                continue;
            };
            let location = self.loc(name_node);
            let scope = self.defining_scope(&location);
            let detail = VariableDef {
                type_name: param.type_name.clone(),
                initial_value: param.default_value.clone(),
                ..VariableDef::default()
            };
            self.definitions.push(
                Definition::new(
                    DefinitionKind::Variable,
                    name,
                    scope,
                    location,
                    DefinitionDetail::Variable(detail),
                )
                .with_flags(DefinitionFlags::PARAMETER),
            );
        }
    }

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
                    if let Some(source) = self.collection_read_of(expr) {
                        return Some(source);
                    }
                }
            }
            if node != body && matches!(node.kind(), "function_definition" | "lambda") {
                continue;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        None
    }

    fn collection_read_of(&self, node: Node<'_>) -> Option<CollectionSource> {
        match node.kind() {
            "subscript" => {
                let value = node.child_by_field_name("value")?;
                (value.kind() == "identifier").then(|| CollectionSource {
                    collection_name: SymbolName::from(self.text(value)),
                    location: self.loc(node),
                })
            }
            "call" => {
                let callee = node.child_by_field_name("function")?;
                if callee.kind() != "attribute" {
                    return None;
                }
                let attr = callee.child_by_field_name("attribute")?;
                if self.text(attr) != "get" {
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

    // === handlers ===

    fn handle_function(&mut self, node: Node<'_>) {
        if is_class_member(node) {
            // The class handler owns its members.
            return;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let signature = self.signature_of(node);
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let body_scope = ScopeId::synthesize(ScopeKind::Function.token(), &location);
        let doc = node
            .child_by_field_name("body")
            .and_then(|b| docstring_of(b, self.source));
        let mut flags = DefinitionFlags::empty();
        if self.text(node).starts_with("async") {
            flags |= DefinitionFlags::ASYNC;
        }
        let mut def = Definition::new(
            DefinitionKind::Function,
            name,
            scope,
            location,
            DefinitionDetail::Function(FunctionDef {
                signature: signature.clone(),
                body_scope_id: body_scope,
                decorators: decorators_of(node, self.source),
                callback_context: None,
                collection_source: self.collection_source_of_body(node),
            }),
        )
        .with_flags(flags);
        if let Some(doc) = doc {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
        self.emit_parameter_definitions(node, &signature);
    }

    fn handle_class(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let class_scope = ScopeId::synthesize(ScopeKind::Class.token(), &self.loc(body));

        let mut extends = Vec::new();
        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.named_children(&mut cursor) {
                match base.kind() {
                    "identifier" | "attribute" => {
                        extends.push(SymbolName::from(self.text(base)));
                    }
                    _ => {}
                }
            }
        }

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        let mut constructors = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let fn_node = match member.kind() {
                "function_definition" => Some(member),
                "decorated_definition" => member
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition"),
                _ => None,
            };
            if let Some(fn_node) = fn_node {
                if let Some(def) = self.extract_member(fn_node, &class_scope) {
                    if def.kind == DefinitionKind::Constructor {
                        constructors.push(def);
                    } else {
                        methods.push(def);
                    }
                }
                continue;
            }
            if member.kind() == "expression_statement" {
                if let Some(assignment) = member.named_child(0).filter(|n| n.kind() == "assignment")
                {
                    if let Some(prop) = self.extract_class_attribute(assignment, &class_scope) {
                        properties.push(prop);
                    }
                }
            }
        }

        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let mut def = Definition::new(
            DefinitionKind::Class,
            name,
            scope,
            location,
            DefinitionDetail::Class(ClassDef {
                extends,
                implements: Vec::new(),
                methods,
                properties,
                constructors,
                decorators: decorators_of(node, self.source),
                body_scope_id: class_scope,
            }),
        );
        if let Some(doc) = docstring_of(body, self.source) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
    }

    fn extract_member(&mut self, fn_node: Node<'_>, class_scope: &ScopeId) -> Option<Definition> {
        let name_node = fn_node.child_by_field_name("name")?;
        let name = self.text(name_node).to_string();
        let is_constructor = name == "__init__";
        let signature = self.signature_of(fn_node);
        let location = self.loc(fn_node);
        let scope_kind = callable_scope_kind(fn_node, self.source);
        let body_scope = Some(ScopeId::synthesize(scope_kind.token(), &location));
        let decorators = decorators_of(fn_node, self.source);

        let mut flags = DefinitionFlags::empty();
        if decorators.iter().any(|d| &**d == "@staticmethod") {
            flags |= DefinitionFlags::STATIC;
        }

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
        let mut def =
            Definition::new(kind, name, class_scope.clone(), location, detail).with_flags(flags);
        if let Some(doc) = fn_node
            .child_by_field_name("body")
            .and_then(|b| docstring_of(b, self.source))
        {
            def = def.with_doc(doc);
        }
        self.emit_parameter_definitions(fn_node, &signature);
        Some(def)
    }

    fn extract_class_attribute(
        &self,
        assignment: Node<'_>,
        class_scope: &ScopeId,
    ) -> Option<Definition> {
        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        Some(Definition::new(
            DefinitionKind::Property,
            self.text(left),
            class_scope.clone(),
            self.loc(left),
            DefinitionDetail::Property(PropertyDef {
                type_name: assignment
                    .child_by_field_name("type")
                    .map(|t| Box::<str>::from(self.text(t))),
                initial_value: assignment
                    .child_by_field_name("right")
                    .map(|r| Box::<str>::from(self.text(r))),
            }),
        ))
    }

    fn handle_assignment(&mut self, node: Node<'_>) {
        // Class attributes are extracted with their class.
        if let Some(stmt) = node.parent().filter(|p| p.kind() == "expression_statement") {
            if let Some(block) = stmt.parent().filter(|b| b.kind() == "block") {
                if block
                    .parent()
                    .map(|p| p.kind() == "class_definition")
                    .unwrap_or(false)
                {
                    return;
                }
            }
        }
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let name = match left.kind() {
            "identifier" => self.text(left).to_string(),
            // Tuple targets stay one binding under their literal text.
            "pattern_list" | "tuple_pattern" => self.text(left).to_string(),
            _ => return,
        };

        let mut detail = VariableDef {
            type_name: node
                .child_by_field_name("type")
                .map(|t| Box::<str>::from(self.text(t))),
            ..VariableDef::default()
        };

        let right = node.child_by_field_name("right");
        if let Some(right) = right {
            if right.kind() == "lambda" {
                // A lambda binding is a function under the variable's name.
                let location = self.loc(left);
                let scope = self.defining_scope(&location);
                let body_scope =
                    ScopeId::synthesize(ScopeKind::Function.token(), &self.loc(right));
                self.definitions.push(Definition::new(
                    DefinitionKind::Function,
                    name,
                    scope,
                    self.loc(right),
                    DefinitionDetail::Function(FunctionDef {
                        signature: self.signature_of(right),
                        body_scope_id: body_scope,
                        decorators: Vec::new(),
                        callback_context: None,
                        collection_source: None,
                    }),
                ));
                return;
            }
            detail.initial_value = Some(self.text(right).into());
            self.analyze_initializer(right, &mut detail);
        }

        let location = self.loc(left);
        let scope = self.defining_scope(&location);
        let is_const =
            name.chars().any(|c| c.is_uppercase()) && !name.chars().any(|c| c.is_lowercase());
        let (kind, flags) = if is_const {
            (DefinitionKind::Constant, DefinitionFlags::CONSTANT)
        } else {
            (DefinitionKind::Variable, DefinitionFlags::empty())
        };
        self.definitions.push(
            Definition::new(kind, name, scope, location, DefinitionDetail::Variable(detail))
                .with_flags(flags),
        );
    }

    fn analyze_initializer(&mut self, right: Node<'_>, detail: &mut VariableDef) {
        match right.kind() {
            "dictionary" | "list" => {
                if let Some(collection) = self.collection_of_literal(right) {
                    detail.function_collection = Some(collection);
                    detail.initializer = Some(Initializer::CollectionLiteral);
                    self.suppressed.push(right.byte_range());
                } else {
                    detail.initializer = Some(Initializer::Other);
                }
            }
            "call" => {
                if let Some(source) = self.collection_read_of(right) {
                    detail.collection_source = Some(source);
                    detail.initializer = Some(Initializer::Other);
                    return;
                }
                let Some(callee) = right.child_by_field_name("function") else {
                    detail.initializer = Some(Initializer::Other);
                    return;
                };
                match callee.kind() {
                    // A bare call may be a construction; the call resolvers
                    // decide once the name resolves.
                    "identifier" => {
                        detail.initializer = Some(Initializer::ConstructorCall {
                            class_name: SymbolName::from(self.text(callee)),
                            location: self.loc(right),
                        });
                    }
                    "attribute" => {
                        let (root, chain) = attribute_chain(callee, self.source);
                        if matches!(root, PyChainRoot::Identifier) && !chain.is_empty() {
                            detail.initializer = Some(Initializer::MethodCall {
                                property_chain: chain.into_iter().map(SymbolName::from).collect(),
                                location: self.loc(right),
                            });
                        } else {
                            detail.initializer = Some(Initializer::Other);
                        }
                    }
                    _ => detail.initializer = Some(Initializer::Other),
                }
            }
            "subscript" => {
                detail.collection_source = self.collection_read_of(right);
                detail.initializer = Some(Initializer::Other);
            }
            "identifier" => {
                detail.initializer = Some(Initializer::FunctionRef {
                    name: SymbolName::from(self.text(right)),
                });
            }
            _ => detail.initializer = Some(Initializer::Other),
        }
    }

    fn collection_of_literal(&mut self, literal: Node<'_>) -> Option<FunctionCollection> {
        let mut collection = FunctionCollection::default();
        let mut cursor = literal.walk();
        for entry in literal.named_children(&mut cursor) {
            match entry.kind() {
                "pair" => {
                    let Some(value) = entry.child_by_field_name("value") else {
                        continue;
                    };
                    match value.kind() {
                        "identifier" => {
                            collection
                                .stored_references
                                .push(SymbolName::from(self.text(value)));
                        }
                        "lambda" => {
                            let key = entry
                                .child_by_field_name("key")
                                .map(|k| self.text(k).trim_matches(['"', '\'']).to_string())
                                .unwrap_or_else(|| "<lambda>".to_string());
                            let location = self.loc(value);
                            let scope = self.defining_scope(&location);
                            let body_scope = ScopeId::synthesize(
                                ScopeKind::Function.token(),
                                &location,
                            );
                            let def = Definition::new(
                                DefinitionKind::Function,
                                key,
                                scope,
                                location,
                                DefinitionDetail::Function(FunctionDef {
                                    signature: self.signature_of(value),
                                    body_scope_id: body_scope,
                                    decorators: Vec::new(),
                                    callback_context: None,
                                    collection_source: None,
                                }),
                            );
                            collection.stored_functions.push(def.symbol_id.clone());
                            self.definitions.push(def);
                        }
                        _ => {}
                    }
                }
                "dictionary_splat" => {
                    if let Some(inner) = entry.named_child(0) {
                        if inner.kind() == "identifier" {
                            collection
                                .stored_references
                                .push(SymbolName::from(self.text(inner)));
                        }
                    }
                }
                "identifier" => {
                    collection
                        .stored_references
                        .push(SymbolName::from(self.text(entry)));
                }
                "lambda" => {
                    let location = self.loc(entry);
                    let scope = self.defining_scope(&location);
                    let body_scope =
                        ScopeId::synthesize(ScopeKind::Function.token(), &location);
                    let def = Definition::new(
                        DefinitionKind::Function,
                        "<lambda>",
                        scope,
                        location,
                        DefinitionDetail::Function(FunctionDef {
                            signature: self.signature_of(entry),
                            body_scope_id: body_scope,
                            decorators: Vec::new(),
                            callback_context: None,
                            collection_source: None,
                        }),
                    );
                    collection.stored_functions.push(def.symbol_id.clone());
                    self.definitions.push(def);
                }
                _ => {}
            }
        }
        (!collection.is_empty()).then_some(collection)
    }

    fn handle_import(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let full = self.text(child);
                    // `import a.b` binds the root package name.
                    let bound = full.split('.').next().unwrap_or(full);
                    self.push_import(
                        bound,
                        child,
                        ImportKind::Namespace,
                        full.into(),
                        None,
                    );
                }
                "aliased_import" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let Some(alias) = child.child_by_field_name("alias") else {
                        continue;
                    };
                    self.push_import(
                        self.text(alias),
                        alias,
                        ImportKind::Namespace,
                        self.text(name).into(),
                        None,
                    );
                }
                _ => {}
            }
        }
    }

    fn handle_import_from(&mut self, node: Node<'_>) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };
        let source_path: Box<str> = self.text(module).into();
        let module_range = module.byte_range();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.byte_range() == module_range {
                continue;
            }
            match child.kind() {
                "dotted_name" => {
                    let name = self.text(child);
                    self.push_import(name, child, ImportKind::Named, source_path.clone(), None);
                }
                "aliased_import" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let Some(alias) = child.child_by_field_name("alias") else {
                        continue;
                    };
                    self.push_import(
                        self.text(alias),
                        alias,
                        ImportKind::Named,
                        source_path.clone(),
                        Some(SymbolName::from(self.text(name))),
                    );
                }
                "wildcard_import" => {
                    self.push_import(
                        &format!("{source_path}.*"),
                        child,
                        ImportKind::SideEffect,
                        source_path.clone(),
                        None,
                    );
                }
                _ => {}
            }
        }
    }

    fn push_import(
        &mut self,
        name: &str,
        node: Node<'_>,
        import_kind: ImportKind,
        source_path: Box<str>,
        original_name: Option<SymbolName>,
    ) {
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        self.definitions.push(Definition::new(
            DefinitionKind::Import,
            name,
            scope,
            location,
            DefinitionDetail::Import(ImportDef {
                import_kind,
                source_path,
                original_name,
            }),
        ));
    }
}

fn find_identifier<'t>(params: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    let mut stack = vec![params];
    while let Some(node) = stack.pop() {
        if node.kind() == "identifier" && node_text(node, source) == name {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            // Default values are expressions, not bindings.
            if (node.kind() == "default_parameter" || node.kind() == "typed_default_parameter")
                && node.child_by_field_name("value") == Some(child)
            {
                continue;
            }
            stack.push(child);
        }
    }
    None
}
