//! Tunables for reading and compiling, loadable from a JSON file.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CompileOptions {
    /// Byte budget for a single compiled `pattern`/`patternProperties` regex.
    pub regex_size_limit: usize,
    /// Byte budget for the lazy DFA cache of each regex.
    pub regex_dfa_size_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            regex_size_limit: 10 * (1 << 20),
            regex_dfa_size_limit: 2 * (1 << 20),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ReaderOptions {
    /// `$schema` assumed for documents that do not declare one.
    pub default_schema_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub compile: CompileOptions,
    pub reader: ReaderOptions,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        crate::path_de::from_str_with_path(&source)
            .map_err(|message| ConfigError::Parse { path: display, message })
    }
}
