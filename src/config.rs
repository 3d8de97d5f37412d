//! Render options and TOML context files.

use crate::runtime::{value::Value, Context};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Deepest block nesting a render may reach before failing.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Contents of a context file: render options plus the globals seeded into
/// the root scope.
///
/// ```toml
/// [options]
/// max_depth = 64
///
/// [globals]
/// title = "Hello"
/// items = ["a", "b"]
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContextFile {
    pub options: RenderOptions,
    pub globals: toml::Table,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid context file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ContextFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.message().to_string(),
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn into_context(self) -> Context {
        let context = Context::with_options(self.options);
        for (name, value) in self.globals {
            context.set(&name, from_toml(value));
        }
        context
    }
}

/// Datetimes have no runtime counterpart and become their string form.
pub fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::array(items.into_iter().map(from_toml)),
        toml::Value::Table(table) => {
            Value::map(table.into_iter().map(|(key, value)| (key, from_toml(value))))
        }
    }
}
