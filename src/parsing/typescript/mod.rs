//! TypeScript lowering.
//!
//! The shared ECMAScript core carries the TypeScript-only capture rules
//! (interfaces, type aliases, enums, annotations); this front just selects
//! the TypeScript grammar.

use crate::parsing::ecma::EcmaLowering;
use crate::parsing::{FileContext, Language, LoweredFile, Lowering};
use tree_sitter::Tree;

pub struct TypeScriptLowering;

impl Lowering for TypeScriptLowering {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn lower(&self, ctx: &FileContext, tree: Option<&Tree>, source: &str) -> LoweredFile {
        EcmaLowering {
            language: Language::TypeScript,
        }
        .lower(ctx, tree, source)
    }
}
