//! Recipe documents
//!
//! A recipe is a list of processor invocations plus default input values:
//!
//! ```toml
//! Description = "Downloads the latest Foo"
//!
//! [Input]
//! NAME = "Foo"
//! IDENTIFIER = "com.example.download.Foo"
//!
//! [[Process]]
//! Processor = "FileCreator"
//! [Process.Arguments]
//! file_path = "%RECIPE_CACHE_DIR%/%NAME%.txt"
//! file_content = "hello"
//! ```
//!
//! JSON documents with the same keys are accepted too.

use super::environment::{Environment, IDENTIFIER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions recognized as recipes.
pub const RECIPE_EXTENSIONS: &[&str] = &["recipe", "toml", "json"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read recipe {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in recipe {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in recipe {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One processor invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Name used to resolve the implementation.
    #[serde(rename = "Processor")]
    pub processor: String,
    /// Literal values supplied at this call site only.
    #[serde(rename = "Arguments", default)]
    pub arguments: Environment,
}

impl Step {
    pub fn new(processor: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            arguments: Environment::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Environment) -> Self {
        self.arguments = arguments;
        self
    }
}

/// A loaded recipe. Immutable for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Input", default)]
    pub input: Environment,
    #[serde(rename = "Process", default)]
    pub process: Vec<Step>,
    /// Canonical path of the recipe file, if it came from one.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Recipe {
    /// Load a recipe file, choosing the format from its extension.
    ///
    /// `.json` is parsed as JSON; anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut recipe = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str::<Recipe>(&text).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            toml::from_str::<Recipe>(&text).map_err(|source| LoadError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        };

        let canonical = path.canonicalize().map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        recipe.path = Some(canonical);
        Ok(recipe)
    }

    /// The explicit `IDENTIFIER` input, if the recipe declares a non-empty one.
    pub fn explicit_identifier(&self) -> Option<&str> {
        self.input.get_str(IDENTIFIER).filter(|s| !s.is_empty())
    }

    /// Directory containing the recipe file.
    pub fn dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }
}
