//! Two-phase project resolution.
//!
//! Phase 1 (`resolve_names`) walks every scope tree lexically and stores a
//! complete name table per scope, shadowing order parent < imports < locals.
//! The `TypeRegistry` then binds symbols to types. Phase 2
//! (`resolve_calls_for_files`) resolves every call reference against those
//! tables, with polymorphic expansion, namespace imports, collection dispatch,
//! and callback-invocation synthesis. The ordering is a hard contract:
//! violating it yields empty resolution sets, not errors.

mod calls;
mod names;
mod reachability;
mod types;

pub use types::TypeRegistry;

use crate::reference::{CallReference, ReachabilityEntry};
use crate::registry::{
    DefinitionRegistry, ExportRegistry, ImportGraph, ModuleResolver, ReferenceRegistry,
    ScopeRegistry,
};
use crate::types::{FilePath, ScopeId, SymbolId, SymbolName};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// Read-only view over the sibling registries, threaded through both phases.
pub struct RegistryContext<'a> {
    pub definitions: &'a DefinitionRegistry,
    pub scopes: &'a ScopeRegistry,
    pub references: &'a ReferenceRegistry,
    pub exports: &'a ExportRegistry,
    pub imports: &'a ImportGraph,
    pub resolver: &'a ModuleResolver,
}

/// Project-wide resolution state.
#[derive(Debug, Default)]
pub struct ResolutionRegistry {
    /// Scope → complete name table (lexically inherited, shadowed).
    resolutions: HashMap<ScopeId, IndexMap<SymbolName, SymbolId>>,
    /// Scopes resolved per file, for removal.
    file_scopes: IndexMap<FilePath, Vec<ScopeId>>,
    /// Call references per file, source order preserved.
    calls: IndexMap<FilePath, Vec<CallReference>>,
    /// Derived: caller body scope → calls made from it.
    calls_by_caller: HashMap<ScopeId, Vec<CallReference>>,
    /// Derived: every symbol any reference resolved to.
    referenced: IndexSet<SymbolId>,
    /// Indirectly reachable functions, keyed by read-site file.
    indirect: IndexMap<FilePath, Vec<ReachabilityEntry>>,
}

impl ResolutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: lexical name resolution for the given files.
    pub fn resolve_names(&mut self, files: &[FilePath], ctx: &RegistryContext) {
        for file in files {
            names::resolve_file(self, file, ctx);
        }
    }

    /// Phase 2: call resolution for the given files. Requires `resolve_names`
    /// and `TypeRegistry::update_files` to have run for the change set.
    pub fn resolve_calls_for_files(
        &mut self,
        files: &[FilePath],
        ctx: &RegistryContext,
        types: &TypeRegistry,
    ) {
        calls::resolve_calls_for_files(self, files, ctx, types);
        reachability::compute(self, files, ctx);
        self.rebuild_derived(ctx);
    }

    /// Resolve a name visible in a scope.
    pub fn resolve(&self, scope_id: &ScopeId, name: &str) -> Option<SymbolId> {
        self.resolutions.get(scope_id)?.get(name).cloned()
    }

    pub fn scope_table(&self, scope_id: &ScopeId) -> Option<&IndexMap<SymbolName, SymbolId>> {
        self.resolutions.get(scope_id)
    }

    pub fn calls_for_file(&self, file: &FilePath) -> &[CallReference] {
        self.calls.get(file).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_calls_by_caller_scope(&self, scope_id: &ScopeId) -> &[CallReference] {
        self.calls_by_caller
            .get(scope_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_all_referenced_symbols(&self) -> &IndexSet<SymbolId> {
        &self.referenced
    }

    pub fn get_indirect_reachability(&self) -> &IndexMap<FilePath, Vec<ReachabilityEntry>> {
        &self.indirect
    }

    pub fn remove_file(&mut self, file: &FilePath) {
        if let Some(scopes) = self.file_scopes.shift_remove(file) {
            for scope in scopes {
                self.resolutions.remove(&scope);
            }
        }
        self.calls.shift_remove(file);
        self.indirect.shift_remove(file);
        self.calls_by_caller.retain(|_, calls| {
            calls.retain(|c| &c.location.file_path != file);
            !calls.is_empty()
        });
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn store_scope_table(
        &mut self,
        file: &FilePath,
        scope_id: ScopeId,
        table: IndexMap<SymbolName, SymbolId>,
    ) {
        self.file_scopes
            .entry(file.clone())
            .or_default()
            .push(scope_id.clone());
        self.resolutions.insert(scope_id, table);
    }

    pub(crate) fn begin_file_names(&mut self, file: &FilePath) {
        if let Some(scopes) = self.file_scopes.shift_remove(file) {
            for scope in scopes {
                self.resolutions.remove(&scope);
            }
        }
    }

    pub(crate) fn store_calls(&mut self, file: &FilePath, calls: Vec<CallReference>) {
        self.calls.insert(file.clone(), calls);
    }

    pub(crate) fn store_reachability(&mut self, file: &FilePath, entries: Vec<ReachabilityEntry>) {
        self.indirect.insert(file.clone(), entries);
    }

    /// Rebuild the derived indices from the stored calls and references.
    fn rebuild_derived(&mut self, ctx: &RegistryContext) {
        self.calls_by_caller.clear();
        self.referenced.clear();
        for calls in self.calls.values() {
            for call in calls {
                for resolution in &call.resolutions {
                    self.referenced.insert(resolution.symbol_id.clone());
                }
                self.calls_by_caller
                    .entry(call.caller_scope_id.clone())
                    .or_default()
                    .push(call.clone());
            }
        }
        let files: Vec<FilePath> = self.calls.keys().cloned().collect();
        for file in files {
            for reference in ctx.references.for_file(&file) {
                use crate::reference::ReferenceDetail;
                match &reference.detail {
                    ReferenceDetail::VariableReference { .. }
                    | ReferenceDetail::TypeReference { .. } => {
                        if let Some(sym) =
                            self.resolve(&reference.scope_id, reference.name.as_str())
                        {
                            self.referenced.insert(sym);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
