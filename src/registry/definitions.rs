//! Project-wide definition storage and derived indices.

use crate::definition::{Definition, DefinitionDetail, DefinitionKind, FunctionCollection};
use crate::semantic::SemanticIndex;
use crate::types::{FilePath, ScopeId, SymbolId, SymbolName};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    /// Every definition, class members included.
    by_symbol_id: IndexMap<SymbolId, Definition>,
    by_file: IndexMap<FilePath, Vec<SymbolId>>,
    /// Last-wins name table per scope (extraction order).
    by_scope: HashMap<ScopeId, IndexMap<SymbolName, SymbolId>>,
    /// All definitions of a scope in registration order, duplicates kept.
    scope_definitions: HashMap<ScopeId, Vec<SymbolId>>,
    /// Class or interface → member name → member symbol.
    member_index: HashMap<SymbolId, IndexMap<SymbolName, SymbolId>>,
    function_collections: IndexMap<SymbolId, FunctionCollection>,
    /// Base type → direct subtypes. Rebuilt between the resolution phases.
    type_subtypes: HashMap<SymbolId, IndexSet<SymbolId>>,
    /// Body scopes (class bodies, impl/trait bodies) → owning type.
    type_scopes: HashMap<ScopeId, SymbolId>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_file(&mut self, index: &SemanticIndex) {
        self.remove_file(&index.file_path);
        let mut ids = Vec::new();
        for def in index.top_level_definitions() {
            self.insert_definition(def, &mut ids);
            match &def.detail {
                DefinitionDetail::Class(class) => {
                    let mut members = IndexMap::new();
                    self.type_scopes
                        .insert(class.body_scope_id.clone(), def.symbol_id.clone());
                    for member in class
                        .methods
                        .iter()
                        .chain(class.properties.iter())
                        .chain(class.constructors.iter())
                    {
                        self.insert_member(def, member, index, &mut members, &mut ids);
                    }
                    self.member_index.insert(def.symbol_id.clone(), members);
                }
                DefinitionDetail::Interface(interface) => {
                    let mut members = IndexMap::new();
                    for member in interface.methods.iter().chain(interface.properties.iter()) {
                        self.insert_member(def, member, index, &mut members, &mut ids);
                    }
                    self.member_index.insert(def.symbol_id.clone(), members);
                }
                DefinitionDetail::Variable(var) => {
                    if let Some(collection) = &var.function_collection {
                        self.function_collections
                            .insert(def.symbol_id.clone(), collection.clone());
                    }
                }
                _ => {}
            }
        }
        self.by_file.insert(index.file_path.clone(), ids);
    }

    fn insert_definition(&mut self, def: &Definition, ids: &mut Vec<SymbolId>) {
        ids.push(def.symbol_id.clone());
        self.by_scope
            .entry(def.defining_scope_id.clone())
            .or_default()
            .insert(def.name.clone(), def.symbol_id.clone());
        self.scope_definitions
            .entry(def.defining_scope_id.clone())
            .or_default()
            .push(def.symbol_id.clone());
        self.by_symbol_id.insert(def.symbol_id.clone(), def.clone());
    }

    /// Members are registered flat (for call targets) but never in the scope
    /// name tables, and their body scope's parent maps back to the owner so
    /// `self` receivers resolve inside any impl block.
    fn insert_member(
        &mut self,
        owner: &Definition,
        member: &Definition,
        index: &SemanticIndex,
        members: &mut IndexMap<SymbolName, SymbolId>,
        ids: &mut Vec<SymbolId>,
    ) {
        ids.push(member.symbol_id.clone());
        self.by_symbol_id
            .insert(member.symbol_id.clone(), member.clone());
        members.insert(member.name.clone(), member.symbol_id.clone());
        if let Some(body_scope) = member.body_scope_id() {
            if let Some(scope) = index.scopes.get(body_scope) {
                if let Some(parent) = &scope.parent_id {
                    self.type_scopes
                        .insert(parent.clone(), owner.symbol_id.clone());
                }
            }
        }
    }

    pub fn remove_file(&mut self, file_path: &FilePath) {
        let Some(ids) = self.by_file.shift_remove(file_path) else {
            return;
        };
        for id in &ids {
            if let Some(def) = self.by_symbol_id.shift_remove(id) {
                if let Some(scope_map) = self.by_scope.get_mut(&def.defining_scope_id) {
                    if scope_map.get(&def.name) == Some(&def.symbol_id) {
                        scope_map.shift_remove(&def.name);
                    }
                    if scope_map.is_empty() {
                        self.by_scope.remove(&def.defining_scope_id);
                    }
                }
                if let Some(ordered) = self.scope_definitions.get_mut(&def.defining_scope_id) {
                    ordered.retain(|sid| sid != id);
                    if ordered.is_empty() {
                        self.scope_definitions.remove(&def.defining_scope_id);
                    }
                }
            }
            self.member_index.remove(id);
            self.function_collections.shift_remove(id);
        }
        let removed: std::collections::HashSet<_> = ids.into_iter().collect();
        self.type_scopes.retain(|_, owner| !removed.contains(owner));
        for subtypes in self.type_subtypes.values_mut() {
            subtypes.retain(|s| !removed.contains(s));
        }
        self.type_subtypes
            .retain(|base, subs| !removed.contains(base) && !subs.is_empty());
    }

    // === lookups ===

    pub fn get(&self, id: &SymbolId) -> Option<&Definition> {
        self.by_symbol_id.get(id)
    }

    pub fn file_symbols(&self, file_path: &FilePath) -> &[SymbolId] {
        self.by_file
            .get(file_path)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn scope_names(&self, scope_id: &ScopeId) -> Option<&IndexMap<SymbolName, SymbolId>> {
        self.by_scope.get(scope_id)
    }

    /// Definitions of a scope in registration order (duplicate names kept).
    pub fn scope_definitions(&self, scope_id: &ScopeId) -> &[SymbolId] {
        self.scope_definitions
            .get(scope_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn member(&self, type_id: &SymbolId, name: &str) -> Option<&SymbolId> {
        self.member_index.get(type_id)?.get(name)
    }

    pub fn members(&self, type_id: &SymbolId) -> Option<&IndexMap<SymbolName, SymbolId>> {
        self.member_index.get(type_id)
    }

    pub fn collection(&self, id: &SymbolId) -> Option<&FunctionCollection> {
        self.function_collections.get(id)
    }

    /// The type whose body (or impl/trait block) is this scope.
    pub fn type_for_scope(&self, scope_id: &ScopeId) -> Option<&SymbolId> {
        self.type_scopes.get(scope_id)
    }

    pub fn all_definitions(&self) -> impl Iterator<Item = &Definition> {
        self.by_symbol_id.values()
    }

    pub fn files(&self) -> impl Iterator<Item = &FilePath> {
        self.by_file.keys()
    }

    // === subtype index ===

    /// Rebuild the base → subtypes index by resolving each type's extends and
    /// implements names in its defining scope. Runs after Phase 1, whose
    /// output the base-name resolution needs.
    pub fn rebuild_subtypes(&mut self, resolve: impl Fn(&ScopeId, &str) -> Option<SymbolId>) {
        let mut edges: Vec<(SymbolId, SymbolId)> = Vec::new();
        for def in self.by_symbol_id.values() {
            let bases: Vec<&SymbolName> = match &def.detail {
                DefinitionDetail::Class(c) => c.extends.iter().chain(c.implements.iter()).collect(),
                DefinitionDetail::Interface(i) => i.extends.iter().collect(),
                _ => continue,
            };
            for base in bases {
                let Some(base_id) = resolve(&def.defining_scope_id, base.as_str()) else {
                    continue;
                };
                let Some(base_def) = self.by_symbol_id.get(&base_id) else {
                    continue;
                };
                if matches!(
                    base_def.kind,
                    DefinitionKind::Class | DefinitionKind::Interface
                ) {
                    edges.push((base_id, def.symbol_id.clone()));
                }
            }
        }
        self.type_subtypes.clear();
        for (base, sub) in edges {
            self.type_subtypes.entry(base).or_default().insert(sub);
        }
    }

    /// All transitive subtypes of a base, cycle-safe, duplicate-free.
    pub fn transitive_subtypes(&self, base: &SymbolId) -> IndexSet<SymbolId> {
        let mut out = IndexSet::new();
        let mut stack: Vec<SymbolId> = self
            .type_subtypes
            .get(base)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(sub) = stack.pop() {
            if !out.insert(sub.clone()) {
                continue;
            }
            if let Some(next) = self.type_subtypes.get(&sub) {
                stack.extend(next.iter().cloned());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use crate::semantic::index_source;

    fn registry_with(source: &str) -> (DefinitionRegistry, SemanticIndex) {
        let index = index_source("a.ts", Language::TypeScript, source).unwrap();
        let mut registry = DefinitionRegistry::new();
        registry.update_file(&index);
        (registry, index)
    }

    #[test]
    fn members_are_flat_but_not_scope_visible() {
        let (registry, index) = registry_with("class C {\n  run() {}\n}\n");
        let class_id = index.classes.keys().next().unwrap();
        let member = registry.member(class_id, "run").expect("member indexed");
        assert!(registry.get(member).is_some());
        // `run` is not a bare name anywhere.
        assert!(
            registry
                .scope_names(index.scopes.root_id())
                .map(|names| !names.contains_key(&SymbolName::from("run")))
                .unwrap_or(true)
        );
    }

    #[test]
    fn removal_leaves_no_residue() {
        let source = "const H = { a: fnA };\nclass C { run() {} }\nfunction fnA() {}\n";
        let (mut registry, _) = registry_with(source);
        assert!(!registry.is_empty());
        registry.remove_file(&FilePath::from("a.ts"));
        assert!(registry.is_empty());
        assert!(registry.by_scope.is_empty());
        assert!(registry.member_index.is_empty());
        assert!(registry.function_collections.is_empty());
        assert!(registry.type_scopes.is_empty());
        registry.remove_file(&FilePath::from("a.ts"));
    }

    #[test]
    fn update_replaces_atomically() {
        let (mut registry, _) = registry_with("function one() {}\n");
        let index2 = index_source("a.ts", Language::TypeScript, "function two() {}\n").unwrap();
        registry.update_file(&index2);
        let names: Vec<_> = registry.all_definitions().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"two"));
        assert!(!names.contains(&"one"));
    }

    #[test]
    fn transitive_subtypes_handle_cycles() {
        let mut registry = DefinitionRegistry::new();
        let a = SymbolId::from("class:A:f:1:1:1:2");
        let b = SymbolId::from("class:B:f:2:1:2:2");
        registry
            .type_subtypes
            .entry(a.clone())
            .or_default()
            .insert(b.clone());
        registry
            .type_subtypes
            .entry(b.clone())
            .or_default()
            .insert(a.clone());
        let subs = registry.transitive_subtypes(&a);
        assert!(subs.contains(&b));
        assert!(subs.contains(&a), "cycle closes back over the base");
        assert_eq!(subs.len(), 2);
    }
}
