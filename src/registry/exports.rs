//! Project-wide export surface and re-export chain walking.

use super::ModuleResolver;
use crate::definition::ExportEntry;
use crate::semantic::SemanticIndex;
use crate::types::{FilePath, SymbolId};
use indexmap::IndexMap;

/// Re-export hops are bounded so cyclic chains terminate as unresolved.
const MAX_EXPORT_DEPTH: usize = 64;

#[derive(Debug, Default)]
pub struct ExportRegistry {
    by_file: IndexMap<FilePath, Vec<ExportEntry>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_file(&mut self, index: &SemanticIndex) {
        self.by_file
            .insert(index.file_path.clone(), index.exports.clone());
    }

    pub fn remove_file(&mut self, file_path: &FilePath) {
        self.by_file.shift_remove(file_path);
    }

    pub fn for_file(&self, file_path: &FilePath) -> &[ExportEntry] {
        self.by_file
            .get(file_path)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve an exported name in `file`, following `export ... from` hops
    /// through the module resolver. Returns `None` on missing exports, an
    /// unresolvable hop, or when the walk exceeds the depth bound.
    pub fn resolve_export_chain(
        &self,
        file: &FilePath,
        name: &str,
        want_default: bool,
        resolve_path: &ModuleResolver,
    ) -> Option<SymbolId> {
        self.resolve_at_depth(file, name, want_default, resolve_path, 0)
    }

    fn resolve_at_depth(
        &self,
        file: &FilePath,
        name: &str,
        want_default: bool,
        resolve_path: &ModuleResolver,
        depth: usize,
    ) -> Option<SymbolId> {
        if depth >= MAX_EXPORT_DEPTH {
            tracing::debug!("export chain for '{name}' exceeded depth bound at {file}");
            return None;
        }
        let entries = self.by_file.get(file)?;
        for entry in entries {
            match entry {
                ExportEntry::Local {
                    name: exported,
                    symbol_id,
                    is_default,
                } => {
                    let hit = if want_default {
                        *is_default
                    } else {
                        exported.as_str() == name
                    };
                    if hit {
                        return Some(symbol_id.clone());
                    }
                }
                ExportEntry::Reexport {
                    exported,
                    original,
                    source,
                } => {
                    let hit = if want_default {
                        exported.as_str() == "default"
                    } else {
                        exported.as_str() == name
                    };
                    if hit {
                        let next = resolve_path(file, source)?;
                        return self.resolve_at_depth(
                            &next,
                            original.as_str(),
                            false,
                            resolve_path,
                            depth + 1,
                        );
                    }
                }
                ExportEntry::ReexportAll { .. } => {}
            }
        }
        // Star re-exports are the fallback after explicit entries.
        for entry in entries {
            if let ExportEntry::ReexportAll { source } = entry {
                if let Some(next) = resolve_path(file, source) {
                    if let Some(found) =
                        self.resolve_at_depth(&next, name, want_default, resolve_path, depth + 1)
                    {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}
