//! Recipe execution engine
//!
//! A recipe is an ordered list of processor invocations plus default input
//! values. Running one:
//! 1. composes the environment from the recipe `Input`, the user's
//!    `RecipeInputOverrides` and command-line `NAME=value` pairs
//! 2. verifies that every processor's required inputs will be present
//! 3. runs each processor in turn against the shared environment, recording
//!    what it read and wrote
//!
//! # Example Recipe
//!
//! ```toml
//! [Input]
//! IDENTIFIER = "com.example.hello"
//! NAME = "world"
//!
//! [[Process]]
//! Processor = "FileCreator"
//! [Process.Arguments]
//! file_path = "%RECIPE_CACHE_DIR%/hello.txt"
//! file_content = "hello %NAME%"
//!
//! [[Process]]
//! Processor = "StopProcessingIf"
//! [Process.Arguments]
//! predicate = 'NAME == "world"'
//! ```
//!
//! # Reserved Variables
//!
//! - `RECIPE_CACHE_DIR` - Per-recipe work directory, set by the engine
//! - `CACHE_DIR` - Base for `RECIPE_CACHE_DIR` (defaults to the user cache dir)
//! - `RECIPE_PATH`, `RECIPE_DIR` - Location of the recipe file
//! - `IDENTIFIER` - Keys the cache dir and local overrides
//! - `stop_processing_recipe` - Ends the run early, successfully, when true
//!
//! # Processors
//!
//! Built-ins are listed in [`steps::builtin`]. A `<Processor>.rhai` file next
//! to the recipe overrides or adds a processor, see [`steps::script`].

pub mod engine;
pub mod output;
pub mod steps;

pub use engine::{
    AutoPackager, Environment, ExecutionTrace, Recipe, RecipeError, RunFailure, RunOptions, RunReport, Step,
    StepError, TraceEntry,
};
pub use steps::{Processor, StepCatalog, StepDescriptor, StepEnv, StepRegistry, StepResolver};
