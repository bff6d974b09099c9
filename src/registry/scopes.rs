//! Project-wide scope storage.

use crate::scope::{Scope, ScopeKind, ScopeTree};
use crate::semantic::SemanticIndex;
use crate::types::{FilePath, ScopeId};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ScopeRegistry {
    trees: IndexMap<FilePath, ScopeTree>,
    /// Flat mirror for id-based lookups across files.
    by_id: HashMap<ScopeId, Scope>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_file(&mut self, index: &SemanticIndex) {
        self.remove_file(&index.file_path);
        for scope in index.scopes.iter() {
            self.by_id.insert(scope.id.clone(), scope.clone());
        }
        self.trees
            .insert(index.file_path.clone(), index.scopes.clone());
    }

    pub fn remove_file(&mut self, file_path: &FilePath) {
        if let Some(tree) = self.trees.shift_remove(file_path) {
            for scope in tree.iter() {
                self.by_id.remove(&scope.id);
            }
        }
    }

    pub fn tree(&self, file_path: &FilePath) -> Option<&ScopeTree> {
        self.trees.get(file_path)
    }

    pub fn get(&self, id: &ScopeId) -> Option<&Scope> {
        self.by_id.get(id)
    }

    pub fn files(&self) -> impl Iterator<Item = &FilePath> {
        self.trees.keys()
    }

    /// Walk from a scope towards its file's root, inclusive.
    pub fn ancestors<'a>(&'a self, id: &ScopeId) -> impl Iterator<Item = &'a Scope> {
        let mut current = self.by_id.get(id);
        std::iter::from_fn(move || {
            let scope = current?;
            current = scope.parent_id.as_ref().and_then(|p| self.by_id.get(p));
            Some(scope)
        })
    }

    /// Nearest enclosing scope (inclusive) of one of the given kinds.
    pub fn nearest_of_kind(&self, id: &ScopeId, pred: impl Fn(ScopeKind) -> bool) -> Option<&Scope> {
        self.ancestors(id).find(|s| pred(s.kind))
    }

    /// The caller context of a reference: the nearest enclosing callable body
    /// scope, or the module root for top-level code.
    pub fn caller_scope(&self, id: &ScopeId) -> Option<ScopeId> {
        let callable = self.nearest_of_kind(id, |k| k.is_callable_body());
        if let Some(scope) = callable {
            return Some(scope.id.clone());
        }
        self.ancestors(id).last().map(|root| root.id.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use crate::semantic::index_source;

    #[test]
    fn update_and_remove_are_symmetric() {
        let index = index_source("a.js", Language::JavaScript, "function f() {}\n").unwrap();
        let mut registry = ScopeRegistry::new();
        registry.update_file(&index);
        assert!(registry.tree(&FilePath::from("a.js")).is_some());
        assert!(!registry.by_id.is_empty());

        registry.remove_file(&FilePath::from("a.js"));
        assert!(registry.is_empty());
        assert!(registry.by_id.is_empty());
        // Idempotent.
        registry.remove_file(&FilePath::from("a.js"));
    }

    #[test]
    fn caller_scope_falls_back_to_module_root() {
        let index =
            index_source("a.js", Language::JavaScript, "function f() { g(); }\nh();\n").unwrap();
        let mut registry = ScopeRegistry::new();
        registry.update_file(&index);
        let root = index.scopes.root_id();
        assert_eq!(registry.caller_scope(root), Some(root.clone()));
    }
}
