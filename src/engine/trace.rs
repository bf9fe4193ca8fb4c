//! Execution trace - the audit record of a run

use super::environment::Environment;
use serde::Serialize;

/// One entry of the trace.
///
/// Serializes as `{"Recipe input": {...}}` or
/// `{"Processor": ..., "Input": {...}, "Output": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TraceEntry {
    RecipeInput {
        #[serde(rename = "Recipe input")]
        recipe_input: Environment,
    },
    Step {
        #[serde(rename = "Processor")]
        processor: String,
        #[serde(rename = "Input")]
        input: Environment,
        #[serde(rename = "Output")]
        output: Environment,
    },
}

/// Ordered record of the initial environment and every completed step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_recipe_input(&mut self, env: &Environment) {
        self.entries.push(TraceEntry::RecipeInput {
            recipe_input: env.clone(),
        });
    }

    pub(crate) fn record_step(&mut self, processor: &str, input: Environment, output: Environment) {
        self.entries.push(TraceEntry::Step {
            processor: processor.to_owned(),
            input,
            output,
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// The snapshot of the environment taken before the first step.
    pub fn recipe_input(&self) -> Option<&Environment> {
        self.entries.iter().find_map(|e| match e {
            TraceEntry::RecipeInput { recipe_input } => Some(recipe_input),
            TraceEntry::Step { .. } => None,
        })
    }

    /// Names of the processors that completed, in order.
    pub fn processors(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                TraceEntry::Step { processor, .. } => Some(processor.as_str()),
                TraceEntry::RecipeInput { .. } => None,
            })
            .collect()
    }

    /// Number of completed steps, excluding the recipe input entry.
    pub fn step_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, TraceEntry::Step { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
