//! Language detection and grammar wiring.

use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use tree_sitter::{Parser, Tree};

/// Supported programming languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
}

impl Language {
    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Rust => "rust",
        }
    }

    /// Detect language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Detect language from a file path.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?;
        Self::from_extension(ext)
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::Python => &["py", "pyi"],
            Language::Rust => &["rs"],
        }
    }

    /// The member name that marks a constructor in this language.
    pub fn constructor_name(&self) -> &'static str {
        match self {
            Language::JavaScript | Language::TypeScript => "constructor",
            Language::Python => "__init__",
            Language::Rust => "new",
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    /// Build a tree-sitter parser for this language.
    pub fn parser(&self) -> IndexResult<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|e| IndexError::GrammarLoad {
                language: self.id().to_string(),
                reason: e.to_string(),
            })?;
        Ok(parser)
    }

    /// Parse source text. `None` means tree-sitter gave up entirely; callers
    /// degrade to a one-scope file rather than erroring.
    pub fn parse(&self, source: &str) -> IndexResult<Option<Tree>> {
        let mut parser = self.parser()?;
        Ok(parser.parse(source, None))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_path("src/lib.rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("hs"), None);
    }

    #[test]
    fn constructor_names() {
        assert_eq!(Language::TypeScript.constructor_name(), "constructor");
        assert_eq!(Language::Python.constructor_name(), "__init__");
        assert_eq!(Language::Rust.constructor_name(), "new");
    }

    #[test]
    fn all_grammars_load() {
        for lang in [
            Language::JavaScript,
            Language::TypeScript,
            Language::Python,
            Language::Rust,
        ] {
            assert!(lang.parser().is_ok(), "{lang} grammar failed to load");
        }
    }

    #[test]
    fn parse_produces_tree() {
        let tree = Language::JavaScript
            .parse("const x = 1;\n")
            .unwrap()
            .expect("tree");
        assert_eq!(tree.root_node().kind(), "program");
    }
}
