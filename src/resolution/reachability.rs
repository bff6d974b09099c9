//! Indirect reachability.
//!
//! A function is reached without a direct call edge when its containing
//! collection is read, or when its value is read anywhere other than its own
//! definition site. Entries are keyed by the read-site file and rebuilt with
//! that file.

use super::{RegistryContext, ResolutionRegistry};
use crate::definition::DefinitionDetail;
use crate::reference::{AccessType, ReachabilityEntry, ReachabilityReason, ReferenceDetail};
use crate::types::{FilePath, SymbolId};
use std::collections::HashSet;

pub(super) fn compute(
    registry: &mut ResolutionRegistry,
    files: &[FilePath],
    ctx: &RegistryContext,
) {
    let mut per_file: Vec<(FilePath, Vec<ReachabilityEntry>)> = Vec::new();
    for file in files {
        let mut entries = Vec::new();
        for reference in ctx.references.for_file(file) {
            let ReferenceDetail::VariableReference {
                access_type: AccessType::Read,
            } = &reference.detail
            else {
                continue;
            };
            let Some(target) = registry.resolve(&reference.scope_id, reference.name.as_str())
            else {
                continue;
            };
            let Some(def) = ctx.definitions.get(&target) else {
                continue;
            };
            match &def.detail {
                DefinitionDetail::Variable(v) if v.function_collection.is_some() => {
                    let mut stored = Vec::new();
                    let mut visited = HashSet::new();
                    collect_stored(registry, ctx, &target, &mut stored, &mut visited);
                    for function in stored {
                        entries.push(ReachabilityEntry {
                            symbol_id: function,
                            reason: ReachabilityReason::CollectionRead {
                                collection_id: target.clone(),
                                read_location: reference.location.clone(),
                            },
                        });
                    }
                }
                DefinitionDetail::Function(_) => {
                    // A read at the definition itself is not a use.
                    if def.location.contains(&reference.location) {
                        continue;
                    }
                    entries.push(ReachabilityEntry {
                        symbol_id: target.clone(),
                        reason: ReachabilityReason::FunctionReference {
                            read_location: reference.location.clone(),
                        },
                    });
                }
                _ => {}
            }
        }
        per_file.push((file.clone(), entries));
    }
    for (file, entries) in per_file {
        registry.store_reachability(&file, entries);
    }
}

/// Transitively stored functions, spread references followed, cycle-guarded.
fn collect_stored(
    registry: &ResolutionRegistry,
    ctx: &RegistryContext,
    collection_id: &SymbolId,
    out: &mut Vec<SymbolId>,
    visited: &mut HashSet<SymbolId>,
) {
    if !visited.insert(collection_id.clone()) {
        return;
    }
    let Some(collection) = ctx.definitions.collection(collection_id) else {
        return;
    };
    for id in &collection.stored_functions {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    let Some(owner) = ctx.definitions.get(collection_id) else {
        return;
    };
    for name in &collection.stored_references {
        let Some(target) = registry.resolve(&owner.defining_scope_id, name.as_str()) else {
            continue;
        };
        let Some(def) = ctx.definitions.get(&target) else {
            continue;
        };
        match &def.detail {
            DefinitionDetail::Function(_) => {
                if !out.contains(&target) {
                    out.push(target.clone());
                }
            }
            DefinitionDetail::Variable(v) if v.function_collection.is_some() => {
                collect_stored(registry, ctx, &target, out, visited);
            }
            _ => {}
        }
    }
}
