//! Phase 2: type-aware call resolution.
//!
//! Dispatch over the reference union is exhaustive; non-call references are
//! skipped. Every call-shaped reference emits a `CallReference`, resolved or
//! not — absence of resolutions is the intended sparse-graph output.

use super::types::TypeRegistry;
use super::{RegistryContext, ResolutionRegistry};
use crate::definition::{CollectionSource, Definition, DefinitionDetail, DefinitionKind, ImportKind};
use crate::reference::{
    CallReference, CallType, Reference, ReferenceDetail, Resolution, ResolutionReason, SelfKeyword,
};
use crate::types::{FilePath, ScopeId, SymbolId, SymbolName};
use std::collections::HashSet;

const CONFIDENCE_DIRECT: f32 = 1.0;
const CONFIDENCE_POLYMORPHIC: f32 = 0.8;
const CONFIDENCE_COLLECTION: f32 = 0.7;

pub(super) fn resolve_calls_for_files(
    registry: &mut ResolutionRegistry,
    files: &[FilePath],
    ctx: &RegistryContext,
    types: &TypeRegistry,
) {
    let mut per_file: Vec<(FilePath, Vec<CallReference>)> = Vec::new();
    {
        let resolver = CallResolver {
            registry: &*registry,
            ctx,
            types,
        };
        for file in files {
            let mut calls = Vec::new();
            for reference in ctx.references.for_file(file) {
                if let Some(call) = resolver.resolve_reference(reference) {
                    calls.push(call);
                }
            }
            resolver.synthesize_callback_invocations(file, &mut calls);
            per_file.push((file.clone(), calls));
        }
    }
    for (file, calls) in per_file {
        registry.store_calls(&file, calls);
    }
}

struct CallResolver<'a> {
    registry: &'a ResolutionRegistry,
    ctx: &'a RegistryContext<'a>,
    types: &'a TypeRegistry,
}

impl<'a> CallResolver<'a> {
    fn resolve(&self, scope: &ScopeId, name: &str) -> Option<SymbolId> {
        self.registry.resolve(scope, name)
    }

    fn definition(&self, id: &SymbolId) -> Option<&'a Definition> {
        self.ctx.definitions.get(id)
    }

    fn caller_scope(&self, reference: &Reference) -> ScopeId {
        self.ctx
            .scopes
            .caller_scope(&reference.scope_id)
            .unwrap_or_else(|| reference.scope_id.clone())
    }

    fn make_call(
        &self,
        reference: &Reference,
        call_type: CallType,
        resolutions: Vec<Resolution>,
    ) -> CallReference {
        CallReference {
            location: reference.location.clone(),
            name: reference.name.clone(),
            scope_id: reference.scope_id.clone(),
            call_type,
            resolutions,
            caller_scope_id: self.caller_scope(reference),
            is_callback_invocation: false,
        }
    }

    fn resolve_reference(&self, reference: &Reference) -> Option<CallReference> {
        match &reference.detail {
            ReferenceDetail::FunctionCall { .. } => Some(self.function_call(reference)),
            ReferenceDetail::ConstructorCall { .. } => Some(self.constructor_call(reference)),
            ReferenceDetail::MethodCall { property_chain, .. } => {
                Some(self.method_call(reference, property_chain, None))
            }
            ReferenceDetail::SelfReferenceCall {
                keyword,
                property_chain,
            } => Some(self.method_call(reference, property_chain, Some(*keyword))),
            // Not calls.
            ReferenceDetail::VariableReference { .. }
            | ReferenceDetail::PropertyAccess { .. }
            | ReferenceDetail::TypeReference { .. }
            | ReferenceDetail::Assignment { .. } => None,
        }
    }

    // === function calls ===

    fn function_call(&self, reference: &Reference) -> CallReference {
        let Some(target) = self.resolve(&reference.scope_id, reference.name.as_str()) else {
            return self.make_call(reference, CallType::Function, Vec::new());
        };
        let Some(def) = self.definition(&target) else {
            return self.make_call(reference, CallType::Function, Vec::new());
        };
        // A call whose callee names a class is a construction (Python writes
        // them identically; the rewrite happens here).
        if def.kind == DefinitionKind::Class {
            return self.make_call(reference, CallType::Constructor, self.constructor_targets(def));
        }
        let mut resolutions = vec![Resolution::direct(target.clone())];
        if let Some(source) = collection_source_of(def) {
            let dispatch = self.collection_dispatch(source, &def.defining_scope_id);
            if !dispatch.is_empty() {
                resolutions = dispatch;
            }
        }
        self.make_call(reference, CallType::Function, resolutions)
    }

    // === constructor calls ===

    fn constructor_call(&self, reference: &Reference) -> CallReference {
        let resolutions = self
            .resolve(&reference.scope_id, reference.name.as_str())
            .and_then(|target| self.definition(&target))
            .filter(|def| def.kind == DefinitionKind::Class)
            .map(|def| self.constructor_targets(def))
            .unwrap_or_default();
        self.make_call(reference, CallType::Constructor, resolutions)
    }

    /// The class's declared constructors, or a synthesized default pointing
    /// at the class itself.
    fn constructor_targets(&self, class: &Definition) -> Vec<Resolution> {
        let Some(detail) = class.as_class() else {
            return Vec::new();
        };
        if detail.constructors.is_empty() {
            return vec![Resolution::with_reason(
                class.symbol_id.clone(),
                CONFIDENCE_DIRECT,
                ResolutionReason::DefaultConstructor,
            )];
        }
        detail
            .constructors
            .iter()
            .map(|c| Resolution::direct(c.symbol_id.clone()))
            .collect()
    }

    // === method and self-reference calls ===

    fn method_call(
        &self,
        reference: &Reference,
        chain: &[SymbolName],
        keyword: Option<SelfKeyword>,
    ) -> CallReference {
        let resolutions = self
            .method_resolutions(reference, chain, keyword)
            .unwrap_or_default();
        let resolutions = if resolutions.is_empty() {
            // Last resort: a receiver fed from a collection fans out to every
            // stored function.
            self.receiver_collection_fallback(reference, chain, keyword)
                .unwrap_or(resolutions)
        } else {
            resolutions
        };
        self.make_call(reference, CallType::Method, resolutions)
    }

    fn method_resolutions(
        &self,
        reference: &Reference,
        chain: &[SymbolName],
        keyword: Option<SelfKeyword>,
    ) -> Option<Vec<Resolution>> {
        // `super(...)` with no chain targets the base constructor.
        if chain.is_empty() {
            if keyword == Some(SelfKeyword::Super) {
                let base = self.enclosing_base_class(&reference.scope_id)?;
                let base_def = self.definition(&base)?;
                return Some(self.constructor_targets(base_def));
            }
            return None;
        }

        let terminal = chain.last()?.as_str();
        let (mut current_type, intermediates) = match keyword {
            Some(SelfKeyword::Super) => {
                let base = self.enclosing_base_class(&reference.scope_id)?;
                (base, &chain[..chain.len() - 1])
            }
            Some(_) => {
                let class = self.enclosing_class(&reference.scope_id)?;
                (class, &chain[..chain.len() - 1])
            }
            None => {
                let root = self.resolve(&reference.scope_id, chain[0].as_str())?;
                let root_def = self.definition(&root)?;
                // Namespace imports resolve their terminal as an exported
                // top-level function of the target module.
                if let DefinitionDetail::Import(import) = &root_def.detail {
                    if import.import_kind == ImportKind::Namespace {
                        return Some(self.namespace_member(root_def, chain));
                    }
                    return None;
                }
                // Object-literal collections answer member calls directly.
                if let Some(var) = root_def.as_variable() {
                    if var.function_collection.is_some() && chain.len() == 2 {
                        return Some(self.collection_member(root_def, terminal));
                    }
                }
                let current = match root_def.kind {
                    // Static access roots at the type itself.
                    DefinitionKind::Class | DefinitionKind::Interface => root,
                    _ => self.types.type_of(&root)?.clone(),
                };
                (current, chain.get(1..chain.len() - 1).unwrap_or(&[]))
            }
        };

        // Walk the chain through resolved member types.
        for name in intermediates {
            let member = self.lookup_member(&current_type, name.as_str())?;
            current_type = self.types.type_of(&member)?.clone();
        }

        let member = self.lookup_member(&current_type, terminal);
        let current_def = self.definition(&current_type)?;
        let is_interface = current_def.kind == DefinitionKind::Interface;

        let mut resolutions = Vec::new();
        if let Some(member) = &member {
            // An interface's own declaration has no body to reach; only its
            // implementations count.
            if !is_interface {
                resolutions.push(Resolution::direct(member.clone()));
            }
        }
        // Polymorphic expansion: include the same-named member from every
        // transitive subtype that defines it.
        for subtype in self.ctx.definitions.transitive_subtypes(&current_type) {
            if let Some(sub_member) = self.ctx.definitions.member(&subtype, terminal) {
                let resolution = Resolution::with_reason(
                    sub_member.clone(),
                    CONFIDENCE_POLYMORPHIC,
                    ResolutionReason::InterfaceImplementation,
                );
                if !resolutions.iter().any(|r| r.symbol_id == resolution.symbol_id) {
                    resolutions.push(resolution);
                }
            }
        }
        Some(resolutions)
    }

    fn lookup_member(&self, type_id: &SymbolId, name: &str) -> Option<SymbolId> {
        self.types
            .member(type_id, name)
            .or_else(|| self.ctx.definitions.member(type_id, name))
            .cloned()
    }

    /// The class whose body (or impl block) encloses the scope.
    fn enclosing_class(&self, scope_id: &ScopeId) -> Option<SymbolId> {
        for scope in self.ctx.scopes.ancestors(scope_id) {
            if let Some(owner) = self.ctx.definitions.type_for_scope(&scope.id) {
                return Some(owner.clone());
            }
        }
        None
    }

    fn enclosing_base_class(&self, scope_id: &ScopeId) -> Option<SymbolId> {
        let class_id = self.enclosing_class(scope_id)?;
        let class = self.definition(&class_id)?;
        let base_name = class.as_class()?.extends.first()?;
        let base = self.resolve(&class.defining_scope_id, base_name.as_str())?;
        let base_def = self.definition(&base)?;
        (base_def.kind == DefinitionKind::Class).then_some(base)
    }

    /// `utils.helper()` through `import * as utils`: the terminal must be an
    /// exported top-level function of the resolved module.
    fn namespace_member(&self, import_def: &Definition, chain: &[SymbolName]) -> Vec<Resolution> {
        if chain.len() != 2 {
            return Vec::new();
        }
        let Some(target_file) = self.ctx.imports.target(&import_def.symbol_id) else {
            return Vec::new();
        };
        let Some(symbol) = self.ctx.exports.resolve_export_chain(
            target_file,
            chain[1].as_str(),
            false,
            self.ctx.resolver,
        ) else {
            return Vec::new();
        };
        let Some(def) = self.definition(&symbol) else {
            return Vec::new();
        };
        if def.kind == DefinitionKind::Function && def.is_exported() {
            vec![Resolution::with_reason(
                symbol,
                CONFIDENCE_DIRECT,
                ResolutionReason::NamespaceImport,
            )]
        } else {
            Vec::new()
        }
    }

    /// Member call on an object-literal function collection: search the
    /// inline functions by name, then the stored references.
    fn collection_member(&self, var_def: &Definition, terminal: &str) -> Vec<Resolution> {
        let Some(collection) = self.ctx.definitions.collection(&var_def.symbol_id) else {
            return Vec::new();
        };
        for id in &collection.stored_functions {
            if let Some(def) = self.definition(id) {
                if def.name.as_str() == terminal {
                    return vec![Resolution::direct(id.clone())];
                }
            }
        }
        for name in &collection.stored_references {
            if name.as_str() == terminal {
                if let Some(target) = self.resolve(&var_def.defining_scope_id, terminal) {
                    return vec![Resolution::direct(target)];
                }
            }
        }
        Vec::new()
    }

    /// Fallback for failed method resolution: a root binding produced by a
    /// dispatcher pattern fans out to the whole collection.
    fn receiver_collection_fallback(
        &self,
        reference: &Reference,
        chain: &[SymbolName],
        keyword: Option<SelfKeyword>,
    ) -> Option<Vec<Resolution>> {
        if keyword.is_some() || chain.is_empty() {
            return None;
        }
        let root = self.resolve(&reference.scope_id, chain[0].as_str())?;
        let root_def = self.definition(&root)?;
        let source = collection_source_of(root_def)?;
        let dispatch = self.collection_dispatch(source, &root_def.defining_scope_id);
        (!dispatch.is_empty()).then_some(dispatch)
    }

    /// Every function stored (transitively, spreads included) in the named
    /// collection.
    fn collection_dispatch(
        &self,
        source: &CollectionSource,
        scope: &ScopeId,
    ) -> Vec<Resolution> {
        let Some(collection_id) = self.resolve(scope, source.collection_name.as_str()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_collection_functions(&collection_id, &mut out, &mut visited);
        out.into_iter()
            .map(|id| {
                Resolution::with_reason(
                    id,
                    CONFIDENCE_COLLECTION,
                    ResolutionReason::CollectionDispatch,
                )
            })
            .collect()
    }

    fn collect_collection_functions(
        &self,
        collection_id: &SymbolId,
        out: &mut Vec<SymbolId>,
        visited: &mut HashSet<SymbolId>,
    ) {
        if !visited.insert(collection_id.clone()) {
            return;
        }
        let Some(collection) = self.ctx.definitions.collection(collection_id) else {
            return;
        };
        for id in &collection.stored_functions {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        let owner_scope = self
            .definition(collection_id)
            .map(|d| d.defining_scope_id.clone());
        let Some(owner_scope) = owner_scope else { return };
        for name in &collection.stored_references {
            let Some(target) = self.resolve(&owner_scope, name.as_str()) else {
                continue;
            };
            let Some(def) = self.definition(&target) else {
                continue;
            };
            match &def.detail {
                DefinitionDetail::Function(_) => {
                    if !out.contains(&target) {
                        out.push(target.clone());
                    }
                }
                DefinitionDetail::Variable(v) if v.function_collection.is_some() => {
                    // Spread of another collection.
                    self.collect_collection_functions(&target, out, visited);
                }
                _ => {}
            }
        }
    }

    /// Anonymous callbacks passed to higher-order calls get a synthetic
    /// invocation edge from the receiving call site, so they stop looking
    /// like entry points.
    fn synthesize_callback_invocations(&self, file: &FilePath, calls: &mut Vec<CallReference>) {
        let Some(tree) = self.ctx.scopes.tree(file) else {
            return;
        };
        for id in self.ctx.definitions.file_symbols(file) {
            let Some(def) = self.definition(id) else {
                continue;
            };
            let Some(function) = def.as_function() else {
                continue;
            };
            let Some(context) = &function.callback_context else {
                continue;
            };
            if !context.is_callback {
                continue;
            }
            let scope_id = tree.innermost_at(&context.receiver_location).clone();
            let caller_scope_id = self
                .ctx
                .scopes
                .caller_scope(&scope_id)
                .unwrap_or_else(|| scope_id.clone());
            calls.push(CallReference {
                location: context.receiver_location.clone(),
                name: def.name.clone(),
                scope_id,
                call_type: CallType::Function,
                resolutions: vec![Resolution::with_reason(
                    def.symbol_id.clone(),
                    CONFIDENCE_DIRECT,
                    ResolutionReason::CallbackInvocation,
                )],
                caller_scope_id,
                is_callback_invocation: true,
            });
        }
    }
}

/// A binding or dispatcher whose value comes out of a collection.
fn collection_source_of(def: &Definition) -> Option<&CollectionSource> {
    match &def.detail {
        DefinitionDetail::Function(f) => f.collection_source.as_ref(),
        DefinitionDetail::Variable(v) => v.collection_source.as_ref(),
        _ => None,
    }
}
