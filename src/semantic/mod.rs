//! Per-file semantic index.
//!
//! The aggregation of one file's lowering: scopes, definitions bucketed by
//! kind, the ordered reference stream, and the file's export surface. Methods,
//! constructors, and properties live inside their owning class definition and
//! never appear in the top-level maps.

use crate::definition::{Definition, DefinitionKind, ExportEntry};
use crate::parsing::{FileContext, Language, lowering_for};
use crate::reference::Reference;
use crate::scope::ScopeTree;
use crate::types::{FilePath, SymbolId};
use indexmap::IndexMap;
use serde::Serialize;
use tree_sitter::Tree;

#[derive(Debug, Serialize)]
pub struct SemanticIndex {
    pub file_path: FilePath,
    pub language: Language,
    pub functions: IndexMap<SymbolId, Definition>,
    pub classes: IndexMap<SymbolId, Definition>,
    pub interfaces: IndexMap<SymbolId, Definition>,
    pub variables: IndexMap<SymbolId, Definition>,
    pub enums: IndexMap<SymbolId, Definition>,
    pub types: IndexMap<SymbolId, Definition>,
    pub imported_symbols: IndexMap<SymbolId, Definition>,
    pub scopes: ScopeTree,
    /// Source-order reference stream.
    pub references: Vec<Reference>,
    pub exports: Vec<ExportEntry>,
}

impl SemanticIndex {
    /// All top-level definitions, in extraction order per bucket.
    pub fn top_level_definitions(&self) -> impl Iterator<Item = &Definition> {
        self.functions
            .values()
            .chain(self.classes.values())
            .chain(self.interfaces.values())
            .chain(self.variables.values())
            .chain(self.enums.values())
            .chain(self.types.values())
            .chain(self.imported_symbols.values())
    }

    pub fn definition_count(&self) -> usize {
        self.functions.len()
            + self.classes.len()
            + self.interfaces.len()
            + self.variables.len()
            + self.enums.len()
            + self.types.len()
            + self.imported_symbols.len()
    }

    /// Check the container invariants; returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        for def in self.top_level_definitions() {
            if !self.scopes.contains(&def.defining_scope_id) {
                return Err(format!(
                    "definition '{}' references missing scope {}",
                    def.name, def.defining_scope_id
                ));
            }
            let scope = self.scopes.get(&def.defining_scope_id).unwrap();
            if !scope.location.contains(&def.location) {
                return Err(format!(
                    "definition '{}' lies outside its defining scope",
                    def.name
                ));
            }
            if matches!(
                def.kind,
                DefinitionKind::Method | DefinitionKind::Constructor | DefinitionKind::Property
            ) {
                return Err(format!(
                    "member '{}' must live under its class, not top-level",
                    def.name
                ));
            }
        }
        for reference in &self.references {
            if !self.scopes.contains(&reference.scope_id) {
                return Err(format!(
                    "reference '{}' at {} references missing scope",
                    reference.name, reference.location
                ));
            }
        }
        Ok(())
    }
}

/// Lower one parsed file into its semantic index.
///
/// A `None` tree (outright parse failure) degrades to a single-module-scope
/// index; this never errors.
pub fn build_semantic_index(
    ctx: &FileContext,
    tree: Option<&Tree>,
    source: &str,
) -> SemanticIndex {
    let lowered = lowering_for(ctx.language).lower(ctx, tree, source);

    let mut index = SemanticIndex {
        file_path: ctx.file_path.clone(),
        language: ctx.language,
        functions: IndexMap::new(),
        classes: IndexMap::new(),
        interfaces: IndexMap::new(),
        variables: IndexMap::new(),
        enums: IndexMap::new(),
        types: IndexMap::new(),
        imported_symbols: IndexMap::new(),
        scopes: lowered.scopes,
        references: lowered.references,
        exports: lowered.exports,
    };

    for def in lowered.definitions {
        let bucket = match def.kind {
            DefinitionKind::Function => &mut index.functions,
            DefinitionKind::Class => &mut index.classes,
            DefinitionKind::Interface => &mut index.interfaces,
            DefinitionKind::Variable | DefinitionKind::Constant => &mut index.variables,
            DefinitionKind::Enum => &mut index.enums,
            DefinitionKind::TypeAlias => &mut index.types,
            DefinitionKind::Import => &mut index.imported_symbols,
            DefinitionKind::Method | DefinitionKind::Constructor | DefinitionKind::Property => {
                tracing::debug!("stray member '{}' dropped from top level", def.name);
                continue;
            }
        };
        bucket.insert(def.symbol_id.clone(), def);
    }
    index
}

/// Parse and lower in one step.
pub fn index_source(
    file_path: impl Into<FilePath>,
    language: Language,
    source: &str,
) -> crate::error::IndexResult<SemanticIndex> {
    let ctx = FileContext::for_source(file_path, language, source);
    let tree = language.parse(source)?;
    Ok(build_semantic_index(&ctx, tree.as_ref(), source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_kind() {
        let source = "import { x } from './x';\ninterface I { run(): void }\nclass C implements I { run(): void {} }\nfunction f() {}\nconst v = 1;\nenum E { A }\ntype T = string;\n";
        let index = index_source("a.ts", Language::TypeScript, source).unwrap();
        assert_eq!(index.imported_symbols.len(), 1);
        assert_eq!(index.interfaces.len(), 1);
        assert_eq!(index.classes.len(), 1);
        assert_eq!(index.functions.len(), 1);
        assert_eq!(index.enums.len(), 1);
        assert_eq!(index.types.len(), 1);
        assert!(index.variables.len() >= 1);
        index.validate().expect("invariants hold");
    }

    #[test]
    fn members_stay_under_their_class() {
        let source = "class C {\n  constructor() {}\n  run() {}\n}\n";
        let index = index_source("a.js", Language::JavaScript, source).unwrap();
        index.validate().expect("invariants hold");
        let class = index.classes.values().next().unwrap();
        let detail = class.as_class().unwrap();
        assert_eq!(detail.constructors.len(), 1);
        assert_eq!(detail.methods.len(), 1);
    }

    #[test]
    fn references_are_in_source_order() {
        let source = "first();\nsecond();\nthird();\n";
        let index = index_source("a.js", Language::JavaScript, source).unwrap();
        let lines: Vec<u32> = index.references.iter().map(|r| r.location.start_line).collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn unparseable_source_degrades_to_one_scope() {
        let ctx = FileContext::for_source("broken.js", Language::JavaScript, "}{ not js");
        let index = build_semantic_index(&ctx, None, "}{ not js");
        assert_eq!(index.scopes.len(), 1);
        assert_eq!(index.definition_count(), 0);
        index.validate().expect("degenerate index is still valid");
    }
}
