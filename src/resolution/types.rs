//! Symbol→type bindings between the two resolution phases.
//!
//! Three inference sources only: explicit annotations (plus JSDoc `@type`),
//! constructor calls on initializers, and the declared return type of an
//! already-resolvable method call on an initializer (fluent chains). Nothing
//! flow-sensitive.

use super::{RegistryContext, ResolutionRegistry};
use crate::definition::{Definition, DefinitionDetail, DefinitionKind, Initializer};
use crate::types::{ScopeId, SymbolId, SymbolName};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static JSDOC_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@type\s*\{([^}]+)\}").expect("static pattern"));
static TYPE_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("static pattern"));

#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Variable/parameter/property/method symbol → its (return) type symbol.
    symbol_types: IndexMap<SymbolId, SymbolId>,
    /// Class or interface → name → member, inherited members merged base
    /// first so overrides win.
    resolved_type_members: IndexMap<SymbolId, IndexMap<SymbolName, SymbolId>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_of(&self, symbol: &SymbolId) -> Option<&SymbolId> {
        self.symbol_types.get(symbol)
    }

    pub fn members_of(&self, type_id: &SymbolId) -> Option<&IndexMap<SymbolName, SymbolId>> {
        self.resolved_type_members.get(type_id)
    }

    pub fn member(&self, type_id: &SymbolId, name: &str) -> Option<&SymbolId> {
        self.resolved_type_members.get(type_id)?.get(name)
    }

    pub fn clear(&mut self) {
        self.symbol_types.clear();
        self.resolved_type_members.clear();
    }

    /// Recompute the registry from the current definitions and Phase 1
    /// output. Deterministic and idempotent; must complete before Phase 2.
    pub fn update_files(&mut self, ctx: &RegistryContext, resolutions: &ResolutionRegistry) {
        self.clear();
        self.compute_type_members(ctx, resolutions);
        self.compute_member_types(ctx, resolutions);
        self.compute_binding_types(ctx, resolutions);
    }

    // === resolved_type_members ===

    fn compute_type_members(&mut self, ctx: &RegistryContext, resolutions: &ResolutionRegistry) {
        let type_ids: Vec<SymbolId> = ctx
            .definitions
            .all_definitions()
            .filter(|d| matches!(d.kind, DefinitionKind::Class | DefinitionKind::Interface))
            .map(|d| d.symbol_id.clone())
            .collect();
        for id in type_ids {
            let mut visiting = HashSet::new();
            self.members_recursive(&id, ctx, resolutions, &mut visiting);
        }
    }

    fn members_recursive(
        &mut self,
        type_id: &SymbolId,
        ctx: &RegistryContext,
        resolutions: &ResolutionRegistry,
        visiting: &mut HashSet<SymbolId>,
    ) -> IndexMap<SymbolName, SymbolId> {
        if let Some(done) = self.resolved_type_members.get(type_id) {
            return done.clone();
        }
        if !visiting.insert(type_id.clone()) {
            // Inheritance cycle: contribute own members only.
            return ctx
                .definitions
                .members(type_id)
                .cloned()
                .unwrap_or_default();
        }
        let mut merged: IndexMap<SymbolName, SymbolId> = IndexMap::new();
        if let Some(def) = ctx.definitions.get(type_id) {
            let bases: Vec<SymbolName> = match &def.detail {
                DefinitionDetail::Class(c) => c.extends.clone(),
                DefinitionDetail::Interface(i) => i.extends.clone(),
                _ => Vec::new(),
            };
            for base in bases {
                let Some(base_id) =
                    resolve_type_name(&def.defining_scope_id, base.as_str(), ctx, resolutions)
                else {
                    continue;
                };
                let base_members = self.members_recursive(&base_id, ctx, resolutions, visiting);
                merged.extend(base_members);
            }
        }
        if let Some(own) = ctx.definitions.members(type_id) {
            // Override wins.
            for (name, member) in own {
                merged.insert(name.clone(), member.clone());
            }
        }
        visiting.remove(type_id);
        self.resolved_type_members
            .insert(type_id.clone(), merged.clone());
        merged
    }

    // === member types (annotations only; no ordering dependency) ===

    fn compute_member_types(&mut self, ctx: &RegistryContext, resolutions: &ResolutionRegistry) {
        for def in ctx.definitions.all_definitions() {
            match &def.detail {
                DefinitionDetail::Property(prop) => {
                    if let Some(type_name) = &prop.type_name {
                        if let Some(ty) = resolve_type_name(
                            &def.defining_scope_id,
                            type_name,
                            ctx,
                            resolutions,
                        ) {
                            self.symbol_types.insert(def.symbol_id.clone(), ty);
                        }
                    }
                }
                DefinitionDetail::Method(_)
                | DefinitionDetail::Constructor(_)
                | DefinitionDetail::Function(_) => {
                    let Some(return_type) = def.return_type() else {
                        continue;
                    };
                    let resolved = if is_self_type(return_type) {
                        // `-> Self` / `: this` names the owning type.
                        ctx.definitions
                            .type_for_scope(&def.defining_scope_id)
                            .cloned()
                    } else {
                        resolve_type_name(&def.defining_scope_id, return_type, ctx, resolutions)
                    };
                    if let Some(ty) = resolved {
                        self.symbol_types.insert(def.symbol_id.clone(), ty);
                    }
                }
                _ => {}
            }
        }
    }

    // === binding types (file order; fluent chains may use earlier bindings) ===

    fn compute_binding_types(&mut self, ctx: &RegistryContext, resolutions: &ResolutionRegistry) {
        let files: Vec<_> = ctx.definitions.files().cloned().collect();
        for file in files {
            for id in ctx.definitions.file_symbols(&file) {
                let Some(def) = ctx.definitions.get(id) else {
                    continue;
                };
                if !matches!(def.detail, DefinitionDetail::Variable(_)) {
                    continue;
                }
                if let Some(ty) = self.infer_binding_type(def, ctx, resolutions) {
                    self.symbol_types.insert(def.symbol_id.clone(), ty);
                }
            }
        }
    }

    fn infer_binding_type(
        &self,
        def: &Definition,
        ctx: &RegistryContext,
        resolutions: &ResolutionRegistry,
    ) -> Option<SymbolId> {
        let var = def.as_variable()?;
        let scope = &def.defining_scope_id;

        if let Some(annotation) = &var.type_name {
            if let Some(ty) = resolve_type_name(scope, annotation, ctx, resolutions) {
                return Some(ty);
            }
        }
        if let Some(doc) = &def.doc {
            if let Some(captures) = JSDOC_TYPE.captures(doc) {
                if let Some(ty) = resolve_type_name(scope, &captures[1], ctx, resolutions) {
                    return Some(ty);
                }
            }
        }
        match var.initializer.as_ref()? {
            Initializer::ConstructorCall { class_name, .. } => {
                let target = resolutions.resolve(scope, class_name.as_str())?;
                let target_def = ctx.definitions.get(&target)?;
                (target_def.kind == DefinitionKind::Class).then_some(target)
            }
            Initializer::MethodCall { property_chain, .. } => {
                self.fluent_chain_type(scope, property_chain, ctx, resolutions)
            }
            _ => None,
        }
    }

    /// Type of `recv.a.b()` when the receiver's type and the terminal
    /// method's declared return type both resolve.
    fn fluent_chain_type(
        &self,
        scope: &ScopeId,
        chain: &[SymbolName],
        ctx: &RegistryContext,
        resolutions: &ResolutionRegistry,
    ) -> Option<SymbolId> {
        if chain.len() < 2 {
            return None;
        }
        let root = resolutions.resolve(scope, chain[0].as_str())?;
        let mut current = match ctx.definitions.get(&root)?.kind {
            DefinitionKind::Class | DefinitionKind::Interface => root,
            _ => self.symbol_types.get(&root)?.clone(),
        };
        for name in &chain[1..chain.len() - 1] {
            let member = self.member(&current, name.as_str())?.clone();
            current = self.symbol_types.get(&member)?.clone();
        }
        let terminal = self.member(&current, chain[chain.len() - 1].as_str())?;
        self.symbol_types.get(terminal).cloned()
    }
}

/// Resolve a type annotation's head name to a class or interface, following
/// one alias hop. `Array<Shape>` resolves `Array`; deeper inference is out of
/// scope.
pub(super) fn resolve_type_name(
    scope: &ScopeId,
    text: &str,
    ctx: &RegistryContext,
    resolutions: &ResolutionRegistry,
) -> Option<SymbolId> {
    let head = TYPE_HEAD
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|t| !matches!(*t, "dyn" | "impl" | "mut" | "ref" | "const" | "static"))?;
    let target = resolutions.resolve(scope, head)?;
    let def = ctx.definitions.get(&target)?;
    match &def.detail {
        DefinitionDetail::Class(_) | DefinitionDetail::Interface(_) => Some(target),
        DefinitionDetail::TypeAlias(alias) => {
            let inner_head = TYPE_HEAD.find(&alias.type_expression)?.as_str();
            let inner = resolutions.resolve(&def.defining_scope_id, inner_head)?;
            let inner_def = ctx.definitions.get(&inner)?;
            matches!(
                inner_def.detail,
                DefinitionDetail::Class(_) | DefinitionDetail::Interface(_)
            )
            .then_some(inner)
        }
        _ => None,
    }
}

fn is_self_type(text: &str) -> bool {
    matches!(text.trim(), "Self" | "this" | "&Self" | "&mut Self")
}
