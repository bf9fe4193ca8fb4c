//! Static recipe verification
//!
//! Walks the process list once, in order, tracking which variable names are
//! guaranteed to exist at each step. Only declared names are considered;
//! runtime values are never inspected.

use super::environment::Environment;
use super::error::RecipeError;
use super::recipe::Recipe;
use crate::steps::StepCatalog;
use std::collections::BTreeSet;

/// Check that every required input of every step is satisfiable.
///
/// A required input is satisfied by the recipe `Input`, the composed
/// environment, the step's own `Arguments`, or the declared outputs of a
/// strictly earlier step.
pub fn verify(recipe: &Recipe, env: &Environment, catalog: &dyn StepCatalog) -> Result<(), RecipeError> {
    let mut known: BTreeSet<String> = recipe
        .input
        .keys()
        .chain(env.keys())
        .map(str::to_owned)
        .collect();

    for step in &recipe.process {
        let descriptor = catalog
            .descriptor(&step.processor)
            .ok_or_else(|| RecipeError::UnknownStepType(step.processor.clone()))?;

        known.extend(step.arguments.keys().map(str::to_owned));

        if let Some(missing) = descriptor.required_inputs().find(|name| !known.contains(*name)) {
            return Err(RecipeError::MissingRequiredInput {
                step_type: step.processor.clone(),
                name: missing.to_owned(),
            });
        }

        known.extend(descriptor.outputs().map(str::to_owned));
    }

    Ok(())
}
