//! Configuration for the semantic index.
//!
//! Layered configuration: built-in defaults, then an optional `symref.toml`,
//! then `SYMREF_` environment variables. Environment variables use double
//! underscores for nesting, e.g. `SYMREF_INDEXING__PARALLEL_THREADS=8`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{IndexError, IndexResult};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Indexing behavior.
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Per-language toggles, keyed by language id ("javascript", "python", ...).
    #[serde(default = "default_languages")]
    pub languages: HashMap<String, LanguageConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of worker threads for the parse/extract phase. 0 = rayon default.
    #[serde(default)]
    pub parallel_threads: usize,

    /// Emit extra diagnostics while lowering files.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extra file extensions mapped to this language.
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `resolution = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: 0,
            debug: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut map = HashMap::new();
    for id in ["javascript", "typescript", "python", "rust"] {
        map.insert(
            id.to_string(),
            LanguageConfig {
                enabled: true,
                extensions: Vec::new(),
            },
        );
    }
    map
}

impl Settings {
    /// Load settings from defaults, `symref.toml`, and `SYMREF_` env vars.
    pub fn load() -> IndexResult<Self> {
        Self::load_from("symref.toml")
    }

    /// Load with an explicit config file path (missing file is fine).
    pub fn load_from(path: &str) -> IndexResult<Self> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SYMREF_").split("__"))
            .extract()
            .map_err(|e| IndexError::Config {
                reason: e.to_string(),
            })
    }

    /// Whether a language id is enabled.
    pub fn language_enabled(&self, id: &str) -> bool {
        self.languages.get(id).map(|c| c.enabled).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_all_languages() {
        let settings = Settings::default();
        for id in ["javascript", "typescript", "python", "rust"] {
            assert!(settings.language_enabled(id), "{id} should default on");
        }
        // Unknown languages fall back to enabled so callers can extend.
        assert!(settings.language_enabled("go"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symref.toml");
        std::fs::write(
            &path,
            "[indexing]\nparallel_threads = 4\n\n[languages.python]\nenabled = false\n",
        )
        .unwrap();

        let settings = Settings::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.indexing.parallel_threads, 4);
        assert!(!settings.language_enabled("python"));
        assert!(settings.language_enabled("rust"));
    }
}
