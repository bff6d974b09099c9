//! symref: multi-language semantic code index and cross-reference resolver.
//!
//! Per file, a tree-sitter syntax tree lowers into a [`SemanticIndex`] of
//! scopes, definitions, and typed references. Project-wide, a two-phase
//! engine resolves every call and name reference to definition symbols:
//! lexical name resolution first, then type-aware call resolution with
//! polymorphic expansion, namespace-import and re-export chains, collection
//! dispatch, and callback-invocation synthesis.

pub mod config;
pub mod definition;
pub mod error;
pub mod logging;
pub mod parsing;
pub mod project;
pub mod reference;
pub mod registry;
pub mod resolution;
pub mod scope;
pub mod semantic;
pub mod types;

pub use config::Settings;
pub use definition::{
    CallbackContext, CollectionSource, Definition, DefinitionDetail, DefinitionFlags,
    DefinitionKind, ExportEntry, FunctionCollection, ImportKind, Initializer, Parameter, Signature,
};
pub use error::{IndexError, IndexResult};
pub use parsing::{FileContext, Language};
pub use project::Project;
pub use reference::{
    AccessType, CallReference, CallType, PropertyAccessKind, ReachabilityEntry,
    ReachabilityReason, Reference, ReferenceDetail, Resolution, ResolutionReason, SelfKeyword,
    TypeContext,
};
pub use registry::{
    DefinitionRegistry, ExportRegistry, ImportGraph, ModuleResolver, ReferenceRegistry,
    ScopeRegistry,
};
pub use resolution::{RegistryContext, ResolutionRegistry, TypeRegistry};
pub use scope::{Scope, ScopeKind, ScopeTree};
pub use semantic::{SemanticIndex, build_semantic_index, index_source};
pub use types::{FilePath, Location, ScopeId, SymbolId, SymbolName};
