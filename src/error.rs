//! Error types for the semantic index.
//!
//! Structured errors via thiserror with actionable messages. Note that
//! resolution failures are not errors: an unresolved reference surfaces as an
//! empty resolution set, never as an `Err`.

use crate::FilePath;
use thiserror::Error;

/// Main error type for indexing operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(
        "Unsupported file extension '{extension}'. Supported types: .rs, .py, .js, .jsx, .ts, .tsx"
    )]
    UnsupportedFileType { extension: String },

    #[error("Language '{language}' is disabled in the configuration")]
    LanguageDisabled { language: String },

    #[error("Failed to load the {language} grammar: {reason}")]
    GrammarLoad { language: String, reason: String },

    #[error("File '{path}' is not in the index. Did you index it first?")]
    FileNotIndexed { path: FilePath },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the crate.
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_actionable() {
        let err = IndexError::UnsupportedFileType {
            extension: "hs".into(),
        };
        assert!(err.to_string().contains("Supported types"));

        let err = IndexError::FileNotIndexed {
            path: FilePath::from("src/app.ts"),
        };
        assert!(err.to_string().contains("src/app.ts"));
    }
}
