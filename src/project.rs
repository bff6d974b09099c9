//! Project facade.
//!
//! Owns every registry and orchestrates the pipeline: per-file lowering into
//! the registries, then `resolve_names` → `TypeRegistry` → call resolution in
//! that strict order. All state is instance-scoped; there is no module-global
//! state anywhere in the crate.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::parsing::{FileContext, Language};
use crate::reference::{CallReference, ReachabilityEntry};
use crate::registry::{
    DefinitionRegistry, ExportRegistry, ImportGraph, ModuleResolver, ReferenceRegistry,
    ScopeRegistry,
};
use crate::resolution::{RegistryContext, ResolutionRegistry, TypeRegistry};
use crate::semantic::{SemanticIndex, build_semantic_index};
use crate::types::{FilePath, ScopeId, SymbolId};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;

pub struct Project {
    settings: Settings,
    resolver: Box<ModuleResolver>,
    definitions: DefinitionRegistry,
    scopes: ScopeRegistry,
    references: ReferenceRegistry,
    exports: ExportRegistry,
    imports: ImportGraph,
    types: TypeRegistry,
    resolutions: ResolutionRegistry,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Project {
    /// A project with no module resolver: imports stay unresolved, everything
    /// file-local still works.
    pub fn new(settings: Settings) -> Self {
        Self::with_resolver(settings, Box::new(|_: &FilePath, _: &str| None))
    }

    /// A project with the external import-path resolver supplied by the
    /// embedder.
    pub fn with_resolver(settings: Settings, resolver: Box<ModuleResolver>) -> Self {
        Self {
            settings,
            resolver,
            definitions: DefinitionRegistry::new(),
            scopes: ScopeRegistry::new(),
            references: ReferenceRegistry::new(),
            exports: ExportRegistry::new(),
            imports: ImportGraph::new(),
            types: TypeRegistry::new(),
            resolutions: ResolutionRegistry::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // === indexing ===

    /// Index one file, detecting the language from its extension.
    pub fn index_source(&mut self, path: impl Into<FilePath>, source: &str) -> IndexResult<()> {
        let path = path.into();
        let language =
            Language::from_path(path.as_str()).ok_or_else(|| IndexError::UnsupportedFileType {
                extension: path
                    .as_str()
                    .rsplit('.')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            })?;
        self.index_source_as(path, language, source)
    }

    /// Index one file with an explicit language.
    pub fn index_source_as(
        &mut self,
        path: impl Into<FilePath>,
        language: Language,
        source: &str,
    ) -> IndexResult<()> {
        if !self.settings.language_enabled(language.id()) {
            return Err(IndexError::LanguageDisabled {
                language: language.id().to_string(),
            });
        }
        let path = path.into();
        let ctx = FileContext::for_source(path, language, source);
        let tree = language.parse(source)?;
        let index = build_semantic_index(&ctx, tree.as_ref(), source);
        self.update_file(index);
        Ok(())
    }

    /// Parse and lower many files in parallel (the per-file phase is
    /// embarrassingly parallel), then apply registry updates serially.
    pub fn index_sources_parallel(
        &mut self,
        sources: Vec<(FilePath, Language, String)>,
    ) -> IndexResult<()> {
        let indexes: Vec<SemanticIndex> = sources
            .into_par_iter()
            .map(|(path, language, source)| {
                let ctx = FileContext::for_source(path, language, &source);
                let tree = language.parse(&source).ok().flatten();
                build_semantic_index(&ctx, tree.as_ref(), &source)
            })
            .collect();
        for index in indexes {
            self.update_file(index);
        }
        Ok(())
    }

    /// Replace one file's contribution in every registry, atomically.
    pub fn update_file(&mut self, index: SemanticIndex) {
        tracing::debug!(
            "indexing {} ({} definitions, {} references)",
            index.file_path,
            index.definition_count(),
            index.references.len()
        );
        self.definitions.update_file(&index);
        self.scopes.update_file(&index);
        self.references.update_file(&index);
        self.exports.update_file(&index);
        self.imports.update_file(&index, &*self.resolver);
    }

    /// Remove a file from every registry. Idempotent; leaves no dangling
    /// scopes, definitions, or resolutions.
    pub fn remove_file(&mut self, path: &FilePath) {
        self.definitions.remove_file(path);
        self.scopes.remove_file(path);
        self.references.remove_file(path);
        self.exports.remove_file(path);
        self.imports.remove_file(path);
        self.resolutions.remove_file(path);
    }

    // === resolution ===

    /// Run both phases over every indexed file.
    pub fn resolve_all(&mut self) {
        let files: Vec<FilePath> = self.scopes.files().cloned().collect();
        self.resolve(&files);
    }

    /// Run both phases over a change set. Phase ordering is strict: name
    /// resolution, then the type registry (with the subtype index rebuilt in
    /// between), then call resolution.
    pub fn resolve(&mut self, files: &[FilePath]) {
        let ctx = RegistryContext {
            definitions: &self.definitions,
            scopes: &self.scopes,
            references: &self.references,
            exports: &self.exports,
            imports: &self.imports,
            resolver: &*self.resolver,
        };
        self.resolutions.resolve_names(files, &ctx);

        let resolutions = &self.resolutions;
        self.definitions
            .rebuild_subtypes(|scope, name| resolutions.resolve(scope, name));

        let ctx = RegistryContext {
            definitions: &self.definitions,
            scopes: &self.scopes,
            references: &self.references,
            exports: &self.exports,
            imports: &self.imports,
            resolver: &*self.resolver,
        };
        self.types.update_files(&ctx, &self.resolutions);

        let ctx = RegistryContext {
            definitions: &self.definitions,
            scopes: &self.scopes,
            references: &self.references,
            exports: &self.exports,
            imports: &self.imports,
            resolver: &*self.resolver,
        };
        self.resolutions.resolve_calls_for_files(files, &ctx, &self.types);
    }

    // === queries ===

    pub fn resolve_name(&self, scope_id: &ScopeId, name: &str) -> Option<SymbolId> {
        self.resolutions.resolve(scope_id, name)
    }

    pub fn calls_for_file(&self, file: &FilePath) -> &[CallReference] {
        self.resolutions.calls_for_file(file)
    }

    pub fn calls_by_caller_scope(&self, scope_id: &ScopeId) -> &[CallReference] {
        self.resolutions.get_calls_by_caller_scope(scope_id)
    }

    pub fn all_referenced_symbols(&self) -> &IndexSet<SymbolId> {
        self.resolutions.get_all_referenced_symbols()
    }

    pub fn indirect_reachability(&self) -> &IndexMap<FilePath, Vec<ReachabilityEntry>> {
        self.resolutions.get_indirect_reachability()
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    pub fn references(&self) -> &ReferenceRegistry {
        &self.references
    }

    pub fn exports(&self) -> &ExportRegistry {
        &self.exports
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn resolutions(&self) -> &ResolutionRegistry {
        &self.resolutions
    }
}
