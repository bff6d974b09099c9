//! Definition extraction for Rust.

use super::{RsChainRoot, callable_scope_kind, field_chain, is_public};
use crate::definition::{
    ClassDef, CollectionSource, ConstructorDef, Definition, DefinitionDetail, DefinitionFlags,
    DefinitionKind, ExportEntry, FunctionDef, ImportDef, ImportKind, Initializer, InterfaceDef,
    MethodDef, Parameter, PropertyDef, Signature, TypeAliasDef, VariableDef,
};
use crate::parsing::{Capture, FileContext, nearest_ancestor, node_text, preceding_doc_lines};
use crate::scope::{ScopeKind, ScopeTree};
use crate::types::{Location, ScopeId, SymbolName};
use tree_sitter::Node;

/// Methods collected from an impl block, merged into their type at finish.
struct ImplRecord {
    type_name: String,
    trait_name: Option<String>,
    methods: Vec<Definition>,
    constructors: Vec<Definition>,
}

pub(super) struct DefinitionsPass<'a> {
    ctx: &'a FileContext,
    source: &'a str,
    scopes: &'a ScopeTree,
    definitions: Vec<Definition>,
    exports: Vec<ExportEntry>,
    impls: Vec<ImplRecord>,
}

impl<'a> DefinitionsPass<'a> {
    pub(super) fn new(ctx: &'a FileContext, source: &'a str, scopes: &'a ScopeTree) -> Self {
        Self {
            ctx,
            source,
            scopes,
            definitions: Vec::new(),
            exports: Vec::new(),
            impls: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, captures: &[Capture<'_>]) {
        for capture in captures {
            match capture.name {
                "def.function" => self.handle_function(capture.node),
                "def.class" => self.handle_type(capture.node),
                "def.interface" => self.handle_trait(capture.node),
                "def.impl" => self.handle_impl(capture.node),
                "def.type_alias" => self.handle_type_alias(capture.node),
                "def.const" => self.handle_const(capture.node),
                "def.variable" => self.handle_let(capture.node),
                "def.import" => self.handle_use(capture.node),
                _ => {}
            }
        }
    }

    pub(super) fn finish(mut self) -> (Vec<Definition>, Vec<ExportEntry>) {
        let impls = std::mem::take(&mut self.impls);
        for record in impls {
            let Some(class) = self
                .definitions
                .iter_mut()
                .find(|d| d.kind == DefinitionKind::Class && d.name.as_str() == record.type_name)
            else {
                tracing::debug!(
                    "impl block for '{}' has no type in this file; skipped",
                    record.type_name
                );
                continue;
            };
            let DefinitionDetail::Class(detail) = &mut class.detail else {
                continue;
            };
            if let Some(trait_name) = record.trait_name {
                detail.implements.push(SymbolName::from(trait_name.as_str()));
            }
            detail.methods.extend(record.methods);
            detail.constructors.extend(record.constructors);
        }
        // Public top-level items become export entries.
        let root = self.scopes.root_id().clone();
        for def in &self.definitions {
            if def.defining_scope_id == root && def.is_exported() {
                self.exports.push(ExportEntry::Local {
                    name: def.name.clone(),
                    symbol_id: def.symbol_id.clone(),
                    is_default: false,
                });
            }
        }
        (self.definitions, self.exports)
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

    fn public_flags(&self, node: Node<'_>) -> DefinitionFlags {
        if is_public(node, self.source) {
            DefinitionFlags::EXPORTED
        } else {
            DefinitionFlags::empty()
        }
    }

    fn signature_of(&self, node: Node<'_>) -> Signature {
        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for child in params.named_children(&mut cursor) {
                match child.kind() {
                    "parameter" => {
                        let Some(pattern) = child.child_by_field_name("pattern") else {
                            continue;
                        };
                        let mut param = Parameter::new(self.text(pattern));
                        if let Some(ty) = child.child_by_field_name("type") {
                            param = param.with_type(self.text(ty));
                        }
                        parameters.push(param);
                    }
                    "self_parameter" => {
                        // The receiver stays in the signature.
                        parameters.push(Parameter::new(self.text(child)));
                    }
                    _ => {}
                }
            }
        }
        let return_type = node
            .child_by_field_name("return_type")
            .map(|n| Box::<str>::from(strip_self_return(self.text(n))));
        Signature {
            parameters,
            return_type,
        }
    }

    fn emit_parameter_definitions(&mut self, fn_node: Node<'_>, signature: &Signature) {
        let Some(params) = fn_node.child_by_field_name("parameters") else {
            return;
        };
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            if child.kind() != "parameter" {
                continue;
            }
            let Some(pattern) = child.child_by_field_name("pattern") else {
                continue;
            };
            if pattern.kind() != "identifier" {
                continue;
            }
            let name = self.text(pattern);
            let type_name = signature
                .parameters
                .iter()
                .find(|p| p.name.as_str() == name)
                .and_then(|p| p.type_name.clone());
            let location = self.loc(pattern);
            let scope = self.defining_scope(&location);
            self.definitions.push(
                Definition::new(
                    DefinitionKind::Variable,
                    name,
                    scope,
                    location,
                    DefinitionDetail::Variable(VariableDef {
                        type_name,
                        ..VariableDef::default()
                    }),
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
            if node.kind() == "index_expression" {
                if let Some(value) = node.named_child(0) {
                    if value.kind() == "identifier" {
                        // Only treat it as dispatch when returned.
                        let returned = nearest_ancestor(node, &["return_expression"]).is_some()
                            || node
                                .parent()
                                .map(|p| p.kind() == "block" || p.kind() == "expression_statement")
                                .unwrap_or(false);
                        if returned {
                            return Some(CollectionSource {
                                collection_name: SymbolName::from(self.text(value)),
                                location: self.loc(node),
                            });
                        }
                    }
                }
            }
            if node != body && matches!(node.kind(), "function_item" | "closure_expression") {
                continue;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        None
    }

    // === handlers ===

    fn handle_function(&mut self, node: Node<'_>) {
        if nearest_ancestor(node, &["impl_item", "trait_item"]).is_some() {
            // Members are assembled with their type.
            return;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let signature = self.signature_of(node);
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let body_scope = ScopeId::synthesize(ScopeKind::Function.token(), &location);
        let mut flags = self.public_flags(node);
        if self.text(node).starts_with("async") || self.text(node).contains("async fn") {
            flags |= DefinitionFlags::ASYNC;
        }
        let mut def = Definition::new(
            DefinitionKind::Function,
            self.text(name_node),
            scope,
            location,
            DefinitionDetail::Function(FunctionDef {
                signature: signature.clone(),
                body_scope_id: body_scope,
                decorators: Vec::new(),
                callback_context: None,
                collection_source: self.collection_source_of_body(node),
            }),
        )
        .with_flags(flags);
        if let Some(doc) = preceding_doc_lines(node, self.source) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
        self.emit_parameter_definitions(node, &signature);
    }

    fn handle_type(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut properties = Vec::new();
        let body = node.child_by_field_name("body").or_else(|| {
            crate::parsing::child_of_kinds(node, &["field_declaration_list", "enum_variant_list"])
        });
        let body_scope = match body {
            Some(body) => ScopeId::synthesize(ScopeKind::Class.token(), &self.loc(body)),
            // Unit and tuple types get a zero-width member scope at their end.
            None => {
                let end = self.loc(node);
                let collapsed = Location::new(
                    end.file_path.clone(),
                    end.end_line,
                    end.end_column,
                    end.end_line,
                    end.end_column,
                );
                ScopeId::synthesize(ScopeKind::Class.token(), &collapsed)
            }
        };
        if let Some(body) = body {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "field_declaration" => {
                        let Some(field_name) = member.child_by_field_name("name") else {
                            continue;
                        };
                        properties.push(Definition::new(
                            DefinitionKind::Property,
                            self.text(field_name),
                            body_scope.clone(),
                            self.loc(member),
                            DefinitionDetail::Property(PropertyDef {
                                type_name: member
                                    .child_by_field_name("type")
                                    .map(|t| Box::<str>::from(self.text(t))),
                                initial_value: None,
                            }),
                        ));
                    }
                    "enum_variant" => {
                        let Some(variant_name) = member.child_by_field_name("name") else {
                            continue;
                        };
                        properties.push(Definition::new(
                            DefinitionKind::Property,
                            self.text(variant_name),
                            body_scope.clone(),
                            self.loc(member),
                            DefinitionDetail::Property(PropertyDef {
                                type_name: None,
                                initial_value: None,
                            }),
                        ));
                    }
                    _ => {}
                }
            }
        }
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let mut def = Definition::new(
            DefinitionKind::Class,
            self.text(name_node),
            scope,
            location,
            DefinitionDetail::Class(ClassDef {
                extends: Vec::new(),
                implements: Vec::new(),
                methods: Vec::new(),
                properties,
                constructors: Vec::new(),
                decorators: Vec::new(),
                body_scope_id: body_scope,
            }),
        )
        .with_flags(self.public_flags(node));
        if let Some(doc) = preceding_doc_lines(node, self.source) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
    }

    fn handle_trait(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let trait_scope = ScopeId::synthesize(ScopeKind::Class.token(), &self.loc(body));
        let mut methods = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "function_item" | "function_signature_item" => {
                    if let Some(def) = self.extract_member(member, &trait_scope) {
                        methods.push(def);
                    }
                }
                _ => {}
            }
        }
        // Supertraits surface as extends edges.
        let mut extends = Vec::new();
        if let Some(bounds) = crate::parsing::child_of_kinds(node, &["trait_bounds"]) {
            let mut cursor = bounds.walk();
            for bound in bounds.named_children(&mut cursor) {
                if bound.kind() == "type_identifier" {
                    extends.push(SymbolName::from(self.text(bound)));
                }
            }
        }
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let mut def = Definition::new(
            DefinitionKind::Interface,
            self.text(name_node),
            scope,
            location,
            DefinitionDetail::Interface(InterfaceDef {
                extends,
                methods,
                properties: Vec::new(),
            }),
        )
        .with_flags(self.public_flags(node));
        if let Some(doc) = preceding_doc_lines(node, self.source) {
            def = def.with_doc(doc);
        }
        self.definitions.push(def);
    }

    fn handle_impl(&mut self, node: Node<'_>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let type_name = last_path_segment(self.text(type_node)).to_string();
        let trait_name = node
            .child_by_field_name("trait")
            .map(|t| last_path_segment(self.text(t)).to_string());
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let member_scope = ScopeId::synthesize(ScopeKind::Class.token(), &self.loc(body));
        let mut record = ImplRecord {
            type_name,
            trait_name,
            methods: Vec::new(),
            constructors: Vec::new(),
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "function_item" {
                continue;
            }
            if let Some(def) = self.extract_member(member, &member_scope) {
                if def.kind == DefinitionKind::Constructor {
                    record.constructors.push(def);
                } else {
                    record.methods.push(def);
                }
            }
        }
        self.impls.push(record);
    }

    fn extract_member(&mut self, fn_node: Node<'_>, member_scope: &ScopeId) -> Option<Definition> {
        let name_node = fn_node.child_by_field_name("name")?;
        let name = self.text(name_node).to_string();
        let signature = self.signature_of(fn_node);
        let location = self.loc(fn_node);
        let scope_kind = callable_scope_kind(fn_node, self.source);
        let has_body = fn_node.child_by_field_name("body").is_some();
        let body_scope = has_body.then(|| ScopeId::synthesize(scope_kind.token(), &location));

        let mut flags = self.public_flags(fn_node);
        let has_receiver = signature
            .parameters
            .first()
            .map(|p| p.name.as_str().contains("self"))
            .unwrap_or(false);
        if !has_receiver {
            flags |= DefinitionFlags::STATIC;
        }

        let is_constructor = scope_kind == ScopeKind::Constructor;
        let detail = if is_constructor {
            DefinitionDetail::Constructor(ConstructorDef {
                signature: signature.clone(),
                body_scope_id: body_scope,
            })
        } else {
            DefinitionDetail::Method(MethodDef {
                signature: signature.clone(),
                body_scope_id: body_scope,
                decorators: Vec::new(),
            })
        };
        let kind = if is_constructor {
            DefinitionKind::Constructor
        } else {
            DefinitionKind::Method
        };
        let mut def =
            Definition::new(kind, name, member_scope.clone(), location, detail).with_flags(flags);
        if let Some(doc) = preceding_doc_lines(fn_node, self.source) {
            def = def.with_doc(doc);
        }
        if has_body {
            self.emit_parameter_definitions(fn_node, &signature);
        }
        Some(def)
    }

    fn handle_type_alias(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let type_expression = node
            .child_by_field_name("type")
            .map(|t| Box::<str>::from(self.text(t)))
            .unwrap_or_default();
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        self.definitions.push(
            Definition::new(
                DefinitionKind::TypeAlias,
                self.text(name_node),
                scope,
                location,
                DefinitionDetail::TypeAlias(TypeAliasDef { type_expression }),
            )
            .with_flags(self.public_flags(node)),
        );
    }

    fn handle_const(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut detail = VariableDef {
            type_name: node
                .child_by_field_name("type")
                .map(|t| Box::<str>::from(self.text(t))),
            ..VariableDef::default()
        };
        if let Some(value) = node.child_by_field_name("value") {
            detail.initial_value = Some(self.text(value).into());
            self.analyze_initializer(value, &mut detail);
        }
        let location = self.loc(name_node);
        let scope = self.defining_scope(&location);
        self.definitions.push(
            Definition::new(
                DefinitionKind::Constant,
                self.text(name_node),
                scope,
                location,
                DefinitionDetail::Variable(detail),
            )
            .with_flags(self.public_flags(node) | DefinitionFlags::CONSTANT),
        );
    }

    fn handle_let(&mut self, node: Node<'_>) {
        let Some(pattern) = node.child_by_field_name("pattern") else {
            return;
        };
        let name = match pattern.kind() {
            "identifier" => self.text(pattern).to_string(),
            "mut_pattern" => pattern
                .named_child(0)
                .map(|n| self.text(n).to_string())
                .unwrap_or_else(|| self.text(pattern).to_string()),
            // Tuple and struct patterns stay one literal binding.
            "tuple_pattern" | "struct_pattern" | "slice_pattern" => {
                self.text(pattern).to_string()
            }
            _ => return,
        };
        let mut detail = VariableDef {
            type_name: node
                .child_by_field_name("type")
                .map(|t| Box::<str>::from(self.text(t))),
            ..VariableDef::default()
        };
        if let Some(value) = node.child_by_field_name("value") {
            detail.initial_value = Some(self.text(value).into());
            self.analyze_initializer(value, &mut detail);
        }
        let location = self.loc(pattern);
        let scope = self.defining_scope(&location);
        self.definitions.push(Definition::new(
            DefinitionKind::Variable,
            name,
            scope,
            location,
            DefinitionDetail::Variable(detail),
        ));
    }

    fn analyze_initializer(&self, value: Node<'_>, detail: &mut VariableDef) {
        match value.kind() {
            "struct_expression" => {
                if let Some(name) = value.child_by_field_name("name") {
                    detail.initializer = Some(Initializer::ConstructorCall {
                        class_name: SymbolName::from(last_path_segment(self.text(name))),
                        location: self.loc(value),
                    });
                }
            }
            "call_expression" => {
                let Some(callee) = value.child_by_field_name("function") else {
                    detail.initializer = Some(Initializer::Other);
                    return;
                };
                match callee.kind() {
                    "scoped_identifier" => {
                        let name = callee
                            .child_by_field_name("name")
                            .map(|n| self.text(n))
                            .unwrap_or("");
                        let path = callee
                            .child_by_field_name("path")
                            .map(|p| self.text(p))
                            .unwrap_or("");
                        if name == "new" && !path.is_empty() {
                            detail.initializer = Some(Initializer::ConstructorCall {
                                class_name: SymbolName::from(last_path_segment(path)),
                                location: self.loc(value),
                            });
                        } else {
                            detail.initializer = Some(Initializer::Other);
                        }
                    }
                    "field_expression" => {
                        let (root, chain) = field_chain(callee, self.source);
                        if matches!(root, RsChainRoot::Identifier) && !chain.is_empty() {
                            detail.initializer = Some(Initializer::MethodCall {
                                property_chain: chain.into_iter().map(SymbolName::from).collect(),
                                location: self.loc(value),
                            });
                        } else {
                            detail.initializer = Some(Initializer::Other);
                        }
                    }
                    _ => detail.initializer = Some(Initializer::Other),
                }
            }
            "index_expression" => {
                if let Some(target) = value.named_child(0) {
                    if target.kind() == "identifier" {
                        detail.collection_source = Some(CollectionSource {
                            collection_name: SymbolName::from(self.text(target)),
                            location: self.loc(value),
                        });
                    }
                }
                detail.initializer = Some(Initializer::Other);
            }
            "identifier" => {
                detail.initializer = Some(Initializer::FunctionRef {
                    name: SymbolName::from(self.text(value)),
                });
            }
            _ => detail.initializer = Some(Initializer::Other),
        }
    }

    fn handle_use(&mut self, node: Node<'_>) {
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let public = is_public(node, self.source);
        self.collect_use(argument, "", public, node);
    }

    fn collect_use(&mut self, node: Node<'_>, prefix: &str, public: bool, statement: Node<'_>) {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                let source = if prefix.is_empty() { name } else { prefix };
                self.push_use(name, node, source, None, public);
            }
            "scoped_identifier" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or("");
                let path = node
                    .child_by_field_name("path")
                    .map(|p| self.text(p))
                    .unwrap_or("");
                let source = join_path(prefix, path);
                if !name.is_empty() {
                    self.push_use(name, node, &source, None, public);
                }
            }
            "use_as_clause" => {
                let Some(path_node) = node.child_by_field_name("path") else {
                    return;
                };
                let Some(alias) = node.child_by_field_name("alias") else {
                    return;
                };
                let full = self.text(path_node);
                let (source, original) = match full.rsplit_once("::") {
                    Some((head, last)) => (join_path(prefix, head), last),
                    None => (join_path(prefix, ""), full),
                };
                self.push_use(
                    self.text(alias),
                    alias,
                    &source,
                    Some(SymbolName::from(original)),
                    public,
                );
            }
            "scoped_use_list" => {
                let path = node
                    .child_by_field_name("path")
                    .map(|p| self.text(p))
                    .unwrap_or("");
                let joined = join_path(prefix, path);
                if let Some(list) = node.child_by_field_name("list") {
                    let mut cursor = list.walk();
                    for child in list.named_children(&mut cursor) {
                        self.collect_use(child, &joined, public, statement);
                    }
                }
            }
            "use_list" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_use(child, prefix, public, statement);
                }
            }
            "use_wildcard" => {
                // Glob imports bind nothing the index tracks.
                let full = self.text(node);
                let location = self.loc(statement);
                let scope = self.defining_scope(&location);
                self.definitions.push(Definition::new(
                    DefinitionKind::Import,
                    join_path(prefix, full),
                    scope,
                    location,
                    DefinitionDetail::Import(ImportDef {
                        import_kind: ImportKind::SideEffect,
                        source_path: join_path(prefix, full.trim_end_matches("::*")).into(),
                        original_name: None,
                    }),
                ));
            }
            "self" => {
                // `use a::{self}` binds the module name itself.
                if let Some(last) = prefix.rsplit("::").next() {
                    self.push_use(last, node, prefix, None, public);
                }
            }
            _ => {}
        }
    }

    fn push_use(
        &mut self,
        name: &str,
        node: Node<'_>,
        source: &str,
        original_name: Option<SymbolName>,
        public: bool,
    ) {
        let location = self.loc(node);
        let scope = self.defining_scope(&location);
        let mut def = Definition::new(
            DefinitionKind::Import,
            name,
            scope,
            location,
            DefinitionDetail::Import(ImportDef {
                import_kind: ImportKind::Named,
                source_path: source.into(),
                original_name: original_name.clone(),
            }),
        );
        if public {
            def = def.with_flags(DefinitionFlags::EXPORTED);
            self.exports.push(ExportEntry::Reexport {
                exported: SymbolName::from(name),
                original: original_name.unwrap_or_else(|| SymbolName::from(name)),
                source: source.into(),
            });
        }
        self.definitions.push(def);
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}::{path}"),
    }
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path).trim()
}

/// `-> Self` carries no nominal type; keep the literal text otherwise.
fn strip_self_return(text: &str) -> &str {
    text.trim_start_matches("->").trim()
}
