//! Sets the early-exit sentinel when a predicate holds.

use crate::engine::environment::{Environment, STOP_PROCESSING_RECIPE};
use crate::engine::error::StepError;
use crate::steps::{Processor, StepDescriptor, StepEnv};
use rhai::{Engine, Scope};

/// Evaluates `predicate` as a Rhai boolean expression.
///
/// Every environment variable whose name is a valid identifier is in scope,
/// so `predicate = 'version == "1.2"'` compares the `version` variable.
pub struct StopProcessingIf {
    descriptor: StepDescriptor,
}

impl StopProcessingIf {
    pub const NAME: &'static str = "StopProcessingIf";

    pub fn describe() -> StepDescriptor {
        StepDescriptor::new("Sets a variable to tell the engine to stop processing a recipe if a predicate is true.")
            .required("predicate", "Rhai expression evaluated against the environment.")
            .output(STOP_PROCESSING_RECIPE, "Boolean. Should we stop processing the recipe?")
    }

    pub fn new(_env: &Environment) -> Self {
        Self {
            descriptor: Self::describe(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Processor for StopProcessingIf {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    fn process(&mut self, env: &mut StepEnv<'_>) -> Result<(), StepError> {
        let predicate = env.require_str("predicate")?.to_owned();

        let mut scope = Scope::new();
        for (name, value) in env.merged() {
            if !is_identifier(&name) {
                continue;
            }
            let value = rhai::serde::to_dynamic(&value).map_err(|e| StepError::Script(e.to_string()))?;
            scope.push_dynamic(name, value);
        }

        let engine = Engine::new();
        let result = engine
            .eval_expression_with_scope::<bool>(&mut scope, &predicate)
            .map_err(|e| StepError::Script(format!("predicate '{predicate}' failed: {e}")))?;

        env.set(STOP_PROCESSING_RECIPE, result);
        Ok(())
    }
}
