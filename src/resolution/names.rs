//! Phase 1: lexical name resolution.
//!
//! Each scope's table starts as a copy of its parent's (lexical inheritance),
//! imports overwrite inherited names, locals overwrite both. Two locals with
//! the same name in one scope resolve to the last one registered, which is
//! stable file order. Unresolvable imports are skipped, not errored.

use super::{RegistryContext, ResolutionRegistry};
use crate::definition::{DefinitionDetail, ImportKind};
use crate::types::{FilePath, ScopeId, SymbolId, SymbolName};
use indexmap::IndexMap;

pub(super) fn resolve_file(
    registry: &mut ResolutionRegistry,
    file: &FilePath,
    ctx: &RegistryContext,
) {
    let Some(tree) = ctx.scopes.tree(file) else {
        tracing::debug!("resolve_names: no scope tree for {file}");
        return;
    };
    registry.begin_file_names(file);
    let root = tree.root_id().clone();
    let mut stack: Vec<(ScopeId, IndexMap<SymbolName, SymbolId>)> =
        vec![(root, IndexMap::new())];

    while let Some((scope_id, parent_table)) = stack.pop() {
        let mut table = parent_table;

        // Imports shadow inherited names.
        for def_id in ctx.definitions.scope_definitions(&scope_id) {
            let Some(def) = ctx.definitions.get(def_id) else {
                continue;
            };
            let DefinitionDetail::Import(import) = &def.detail else {
                continue;
            };
            let target = match import.import_kind {
                // A namespace import is its own handle; members resolve later.
                ImportKind::Namespace => Some(def.symbol_id.clone()),
                ImportKind::SideEffect => None,
                ImportKind::Named | ImportKind::Default => {
                    resolve_import_target(def, import, ctx)
                }
            };
            match target {
                Some(target) => {
                    table.insert(def.name.clone(), target);
                }
                None => {
                    tracing::debug!("skipping unresolved import '{}' in {file}", def.name);
                }
            }
        }

        // Locals shadow imports and inherited names; last registration wins.
        for def_id in ctx.definitions.scope_definitions(&scope_id) {
            let Some(def) = ctx.definitions.get(def_id) else {
                continue;
            };
            if matches!(def.detail, DefinitionDetail::Import(_)) {
                continue;
            }
            table.insert(def.name.clone(), def.symbol_id.clone());
        }

        if let Some(scope) = tree.get(&scope_id) {
            for child in scope.child_ids.iter().rev() {
                stack.push((child.clone(), table.clone()));
            }
        }
        registry.store_scope_table(file, scope_id, table);
    }
}

fn resolve_import_target(
    def: &crate::definition::Definition,
    import: &crate::definition::ImportDef,
    ctx: &RegistryContext,
) -> Option<SymbolId> {
    let target_file = ctx.imports.target(&def.symbol_id)?;
    let want_default = import.import_kind == ImportKind::Default;
    // The local name doubles as the exported name when not aliased.
    let lookup = import
        .original_name
        .as_ref()
        .map(|n| n.as_str())
        .unwrap_or(def.name.as_str());
    ctx.exports
        .resolve_export_chain(target_file, lookup, want_default, ctx.resolver)
}
