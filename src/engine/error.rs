//! Recipe error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failure raised by a processor while it runs.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors that abort a recipe run.
#[derive(Error, Debug)]
pub enum RecipeError {
    #[error(
        "local recipe values for {identifier} found in {origin}, but is of type {found}, \
         when it should be a dictionary of variables and values"
    )]
    Configuration {
        identifier: String,
        origin: String,
        found: String,
    },

    #[error("recipe has no IDENTIFIER input and no RECIPE_PATH to derive one from")]
    MissingIdentifier,

    #[error("IDENTIFIER '{0}' must be a relative name without '.' or '..' components")]
    InvalidIdentifier(String),

    #[error("unknown processor '{0}'")]
    UnknownStepType(String),

    #[error("{step_type} requires missing argument {name}")]
    MissingRequiredInput { step_type: String, name: String },

    #[error("processor {step_type} failed: {source}")]
    StepExecutionFailure {
        step_type: String,
        #[source]
        source: StepError,
    },

    #[error("processor {step_type} did not set declared output variable {name}")]
    InternalContractViolation { step_type: String, name: String },

    #[error("could not create RECIPE_CACHE_DIR {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecipeError {
    /// The processor the error is attributed to, if any.
    pub fn step_type(&self) -> Option<&str> {
        match self {
            Self::UnknownStepType(step_type)
            | Self::MissingRequiredInput { step_type, .. }
            | Self::StepExecutionFailure { step_type, .. }
            | Self::InternalContractViolation { step_type, .. } => Some(step_type),
            _ => None,
        }
    }
}
