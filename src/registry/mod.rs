//! Project-wide registries.
//!
//! Each registry mirrors the per-file results as a set-union over file
//! contributions. `update_file` replaces a file's contribution atomically;
//! `remove_file` is idempotent and leaves no dangling entries.

pub mod definitions;
pub mod exports;
pub mod imports;
pub mod references;
pub mod scopes;

pub use definitions::DefinitionRegistry;
pub use exports::ExportRegistry;
pub use imports::ImportGraph;
pub use references::ReferenceRegistry;
pub use scopes::ScopeRegistry;

use crate::types::FilePath;

/// The external import-path resolver: `(importer_file, specifier) → file?`.
/// Module resolution semantics live outside the core.
pub type ModuleResolver = dyn Fn(&FilePath, &str) -> Option<FilePath> + Send + Sync;
