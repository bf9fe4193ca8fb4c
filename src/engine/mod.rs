//! Recipe engine
//!
//! A run goes through three stages:
//! 1. [`compose`] - merge recipe `Input`, local overrides and CLI overrides
//! 2. [`verify`] - check every required input is satisfiable, without running anything
//! 3. [`run`] - execute the steps in order, recording an [`ExecutionTrace`]
//!
//! [`AutoPackager`] ties the stages together with a [`StepRegistry`].

pub mod compose;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod recipe;
pub mod search;
pub mod trace;
pub mod verify;

pub use compose::{LocalOverrides, compose, recipe_identifier};
pub use environment::Environment;
pub use error::{RecipeError, StepError};
pub use executor::{RunFailure, RunOptions, RunReport, run};
pub use recipe::{Recipe, Step};
pub use trace::{ExecutionTrace, TraceEntry};
pub use verify::verify;

use crate::output;
use crate::steps::{StepRegistry, StepResolver};

/// Composes, verifies and runs recipes against a fixed set of processors.
pub struct AutoPackager {
    registry: StepRegistry,
    options: RunOptions,
    local_overrides: LocalOverrides,
}

impl AutoPackager {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            options: RunOptions::default(),
            local_overrides: LocalOverrides::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_local_overrides(mut self, overrides: LocalOverrides) -> Self {
        self.local_overrides = overrides;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Compose the environment `recipe` would run with.
    pub fn environment_for(
        &self,
        recipe: &Recipe,
        cli_overrides: &Environment,
    ) -> Result<Environment, RecipeError> {
        compose(recipe, Some(&self.local_overrides), cli_overrides)
    }

    /// Compose and verify without running anything.
    pub fn check(&self, recipe: &Recipe, cli_overrides: &Environment) -> Result<Environment, RecipeError> {
        let env = self.environment_for(recipe, cli_overrides)?;
        recipe_identifier(recipe, &env)?;
        let resolver = StepResolver::for_recipe(&self.registry, recipe, &env);
        verify(recipe, &env, &resolver)?;
        Ok(env)
    }

    /// Compose, verify, then run `recipe`.
    ///
    /// Verification failures return before any step runs, with an empty trace.
    pub fn process(&self, recipe: &Recipe, cli_overrides: &Environment) -> Result<RunReport, RunFailure> {
        let env = self
            .environment_for(recipe, cli_overrides)
            .map_err(|e| RunFailure::before_run(e, Environment::new()))?;

        if let Err(e) = recipe_identifier(recipe, &env) {
            return Err(RunFailure::before_run(e, env));
        }
        let resolver = StepResolver::for_recipe(&self.registry, recipe, &env);
        if let Err(e) = verify(recipe, &env, &resolver) {
            return Err(RunFailure::before_run(e, env));
        }

        let report = run(recipe, env, &resolver, &self.options)?;
        if report.stopped_early {
            output::skip("recipe stopped early");
        }
        Ok(report)
    }
}
