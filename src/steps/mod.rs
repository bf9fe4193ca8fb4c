//! Processors - the units of work a recipe strings together
//!
//! A processor declares which variables it reads ([`StepDescriptor::input_spec`])
//! and which it guarantees to set ([`StepDescriptor::output_spec`]). The engine
//! hands it a [`StepEnv`] with the call-site arguments injected and checks the
//! declared outputs afterwards.
//!
//! Implementations come from two places:
//! - [`StepRegistry`]: constructors registered at startup (the built-ins live in
//!   [`builtin`])
//! - [`script`]: `<Processor>.rhai` files colocated with the recipe, loaded per
//!   run by [`StepResolver`] and taking precedence over registered ones

pub mod builtin;
mod registry;
pub mod script;

pub use registry::{StepRegistry, StepResolver};

use crate::engine::environment::{self, Environment};
use crate::engine::error::StepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared flags of one input variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFlags {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// The declared contract of a processor, independent of any invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub input_spec: BTreeMap<String, InputFlags>,
    /// Output variable name to description.
    #[serde(default)]
    pub output_spec: BTreeMap<String, String>,
}

impl StepDescriptor {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.input_spec.insert(
            name.into(),
            InputFlags {
                required: true,
                description: description.into(),
            },
        );
        self
    }

    pub fn optional(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.input_spec.insert(
            name.into(),
            InputFlags {
                required: false,
                description: description.into(),
            },
        );
        self
    }

    pub fn output(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.output_spec.insert(name.into(), description.into());
        self
    }

    /// Names of the inputs that must be present before the step runs.
    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.input_spec
            .iter()
            .filter(|(_, flags)| flags.required)
            .map(|(name, _)| name.as_str())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.output_spec.keys().map(String::as_str)
    }
}

/// A processor instance, constructed for a single invocation.
pub trait Processor {
    fn descriptor(&self) -> &StepDescriptor;

    /// Run the step. Has exclusive access to the environment for the call.
    fn process(&mut self, env: &mut StepEnv<'_>) -> Result<(), StepError>;
}

/// Resolves processor names to descriptors and instances.
pub trait StepCatalog {
    fn descriptor(&self, processor: &str) -> Option<StepDescriptor>;

    fn instantiate(&self, processor: &str, env: &Environment) -> Option<Box<dyn Processor>>;
}

/// A processor's view of the run environment.
///
/// Injected call-site arguments overlay the environment while the step runs.
/// Reads see them first. The engine calls [`commit`] once the step succeeds,
/// so arguments outlive the step unless it replaced them with [`set`].
///
/// [`commit`]: StepEnv::commit
/// [`set`]: StepEnv::set
pub struct StepEnv<'a> {
    env: &'a mut Environment,
    injected: Environment,
}

impl<'a> StepEnv<'a> {
    pub fn new(env: &'a mut Environment) -> Self {
        Self {
            env,
            injected: Environment::new(),
        }
    }

    /// Overlay call-site arguments, expanding `%NAME%` references against the
    /// current view.
    pub fn inject(&mut self, arguments: &Environment) {
        let view = self.merged();
        for (key, value) in arguments.iter() {
            self.injected
                .insert(key, environment::substitute(value, &view));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.injected.get(key).or_else(|| self.env.get(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.injected.contains_key(key) || self.env.contains_key(key)
    }

    /// Look up a required string, failing the step if it is absent.
    pub fn require_str(&self, key: &str) -> Result<&str, StepError> {
        self.get_str(key)
            .ok_or_else(|| StepError::failed(format!("missing or non-string variable {key}")))
    }

    /// Persist a variable into the run environment.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.injected.remove(&key);
        self.env.insert(key, value);
    }

    /// Write the injected arguments the step did not [`set`](Self::set) into
    /// the run environment.
    pub fn commit(self) {
        self.env.extend(&self.injected);
    }

    /// The injected arguments, after substitution.
    pub fn injected(&self) -> &Environment {
        &self.injected
    }

    /// Flatten the view: environment with injected arguments on top.
    pub fn merged(&self) -> Environment {
        let mut merged = self.env.clone();
        merged.extend(&self.injected);
        merged
    }

    /// Copy out the present subset of `keys`, as seen through the view.
    pub fn snapshot<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Environment {
        keys.into_iter()
            .filter_map(|k| self.get(k).map(|v| (k.to_owned(), v.clone())))
            .collect()
    }
}
