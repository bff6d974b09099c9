//! Import graph: import definitions mapped to their target files.
//!
//! The external module resolver is consulted once per import definition; the
//! result (including failures) is cached until the file changes.

use super::ModuleResolver;
use crate::definition::DefinitionDetail;
use crate::semantic::SemanticIndex;
use crate::types::{FilePath, SymbolId};
use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct ImportGraph {
    targets: IndexMap<SymbolId, Option<FilePath>>,
    by_file: IndexMap<FilePath, Vec<SymbolId>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_file(&mut self, index: &SemanticIndex, resolve_path: &ModuleResolver) {
        self.remove_file(&index.file_path);
        let mut ids = Vec::new();
        for def in index.imported_symbols.values() {
            let DefinitionDetail::Import(import) = &def.detail else {
                continue;
            };
            let target = resolve_path(&index.file_path, &import.source_path);
            if target.is_none() {
                tracing::debug!(
                    "import '{}' in {} did not resolve ('{}')",
                    def.name,
                    index.file_path,
                    import.source_path
                );
            }
            self.targets.insert(def.symbol_id.clone(), target);
            ids.push(def.symbol_id.clone());
        }
        self.by_file.insert(index.file_path.clone(), ids);
    }

    pub fn remove_file(&mut self, file_path: &FilePath) {
        if let Some(ids) = self.by_file.shift_remove(file_path) {
            for id in ids {
                self.targets.shift_remove(&id);
            }
        }
    }

    /// Target file of an import definition, if the resolver found one.
    pub fn target(&self, import_id: &SymbolId) -> Option<&FilePath> {
        self.targets.get(import_id).and_then(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use crate::semantic::index_source;

    #[test]
    fn caches_targets_and_misses() {
        let index = index_source(
            "b.ts",
            Language::TypeScript,
            "import { helper } from './a';\nimport { gone } from './missing';\n",
        )
        .unwrap();
        let mut graph = ImportGraph::new();
        let resolve: Box<ModuleResolver> = Box::new(|_, spec| {
            (spec == "./a").then(|| FilePath::from("a.ts"))
        });
        graph.update_file(&index, &resolve);

        let helper = index
            .imported_symbols
            .values()
            .find(|d| d.name.as_str() == "helper")
            .unwrap();
        assert_eq!(graph.target(&helper.symbol_id), Some(&FilePath::from("a.ts")));

        let gone = index
            .imported_symbols
            .values()
            .find(|d| d.name.as_str() == "gone")
            .unwrap();
        assert_eq!(graph.target(&gone.symbol_id), None);

        graph.remove_file(&FilePath::from("b.ts"));
        assert!(graph.is_empty());
    }
}
