//! Core identifier and location types.
//!
//! All identifiers are opaque string newtypes. `SymbolId` and `ScopeId` are
//! synthesized from the entity's kind, name, and source range, which makes them
//! stable across re-indexing runs of the same text.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Box<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl $name {
            pub fn new(value: impl Into<Box<str>>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value.into())
            }
        }
    };
}

opaque_string_id! {
    /// Path of a source file, as handed in by the caller. The core never
    /// touches the filesystem, so this is purely a key.
    FilePath
}

opaque_string_id! {
    /// Stable identifier of a lexical scope within one file.
    ScopeId
}

opaque_string_id! {
    /// Stable, location-derived identifier of a definition.
    ///
    /// Encoding: `kind:name:file:start_line:start_col:end_line:end_col`.
    SymbolId
}

opaque_string_id! {
    /// A plain source-level name (identifier text).
    SymbolName
}

impl SymbolId {
    /// Synthesize the canonical id for a definition.
    pub fn synthesize(kind: &str, name: &str, location: &Location) -> Self {
        Self::new(format!(
            "{kind}:{name}:{}:{}:{}:{}:{}",
            location.file_path,
            location.start_line,
            location.start_column,
            location.end_line,
            location.end_column
        ))
    }
}

impl ScopeId {
    /// Synthesize the canonical id for a scope.
    pub fn synthesize(kind: &str, location: &Location) -> Self {
        Self::new(format!(
            "{kind}:{}:{}:{}:{}:{}",
            location.file_path,
            location.start_line,
            location.start_column,
            location.end_line,
            location.end_column
        ))
    }
}

/// A half-open source region: 1-indexed lines and columns, end column exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: FilePath,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    pub fn new(
        file_path: impl Into<FilePath>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    fn start_key(&self) -> (u32, u32) {
        (self.start_line, self.start_column)
    }

    fn end_key(&self) -> (u32, u32) {
        (self.end_line, self.end_column)
    }

    /// Whether `other` lies entirely within this region (same file required).
    pub fn contains(&self, other: &Location) -> bool {
        self.file_path == other.file_path
            && self.start_key() <= other.start_key()
            && other.end_key() <= self.end_key()
    }

    /// Containment that excludes the identical range. Used when picking the
    /// defining scope of a construct that opened its own scope over the same
    /// range.
    pub fn strictly_contains(&self, other: &Location) -> bool {
        self.contains(other) && !self.same_range(other)
    }

    /// Whether a single position falls inside this region.
    pub fn contains_point(&self, line: u32, column: u32) -> bool {
        self.start_key() <= (line, column) && (line, column) < self.end_key()
    }

    pub fn same_range(&self, other: &Location) -> bool {
        self.start_key() == other.start_key() && self.end_key() == other.end_key()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.file_path, self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}
