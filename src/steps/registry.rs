//! Processor lookup
//!
//! [`StepRegistry`] is the name -> constructor table built at startup.
//! [`StepResolver`] fronts it for one run with the scripts found next to the
//! recipe.

use super::script::{ScriptDefinition, ScriptLoader};
use super::{Processor, StepCatalog, StepDescriptor, builtin};
use crate::engine::environment::{Environment, RECIPE_DIR};
use crate::engine::recipe::Recipe;
use crate::output;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

type Constructor = Box<dyn Fn(&Environment) -> Box<dyn Processor> + Send + Sync>;

struct Registration {
    descriptor: StepDescriptor,
    construct: Constructor,
}

/// Processors registered by name.
#[derive(Default)]
pub struct StepRegistry {
    steps: BTreeMap<String, Registration>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in processors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a processor under `name`, replacing any previous registration.
    pub fn register<F, P>(&mut self, name: impl Into<String>, descriptor: StepDescriptor, construct: F)
    where
        F: Fn(&Environment) -> P + Send + Sync + 'static,
        P: Processor + 'static,
    {
        self.steps.insert(
            name.into(),
            Registration {
                descriptor,
                construct: Box::new(move |env: &Environment| -> Box<dyn Processor> {
                    Box::new(construct(env))
                }),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }
}

impl StepCatalog for StepRegistry {
    fn descriptor(&self, processor: &str) -> Option<StepDescriptor> {
        self.steps.get(processor).map(|r| r.descriptor.clone())
    }

    fn instantiate(&self, processor: &str, env: &Environment) -> Option<Box<dyn Processor>> {
        self.steps.get(processor).map(|r| (r.construct)(env))
    }
}

/// Per-run lookup: colocated scripts first, then the registry.
pub struct StepResolver<'a> {
    registry: &'a StepRegistry,
    scripts: BTreeMap<String, Arc<ScriptDefinition>>,
    loader: ScriptLoader,
}

impl<'a> StepResolver<'a> {
    /// A resolver that only consults the registry.
    pub fn new(registry: &'a StepRegistry) -> Self {
        Self {
            registry,
            scripts: BTreeMap::new(),
            loader: ScriptLoader::new(),
        }
    }

    /// Load every `<Processor>.rhai` named by `recipe` from `RECIPE_DIR`.
    ///
    /// A script that fails to load is reported and skipped, so the registered
    /// processor of the same name (if any) is used instead.
    pub fn for_recipe(registry: &'a StepRegistry, recipe: &Recipe, env: &Environment) -> Self {
        let mut resolver = Self::new(registry);
        if let Some(dir) = env.get_str(RECIPE_DIR) {
            resolver.load_colocated(recipe, Path::new(dir));
        }
        resolver
    }

    fn load_colocated(&mut self, recipe: &Recipe, dir: &Path) {
        for step in &recipe.process {
            if self.scripts.contains_key(&step.processor) {
                continue;
            }
            let path = dir.join(format!("{}.rhai", step.processor));
            if !path.is_file() {
                continue;
            }
            match self.loader.load(&step.processor, &path) {
                Ok(def) => {
                    output::detail(&format!("using colocated processor {}", path.display()));
                    self.scripts.insert(step.processor.clone(), Arc::new(def));
                }
                Err(e) => {
                    output::warning(&format!(
                        "could not load {}: {}; falling back to registered {}",
                        path.display(),
                        e,
                        step.processor
                    ));
                }
            }
        }
    }

    /// Whether `name` resolves to a colocated script.
    pub fn is_colocated(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}

impl StepCatalog for StepResolver<'_> {
    fn descriptor(&self, processor: &str) -> Option<StepDescriptor> {
        match self.scripts.get(processor) {
            Some(def) => Some(def.descriptor().clone()),
            None => self.registry.descriptor(processor),
        }
    }

    fn instantiate(&self, processor: &str, env: &Environment) -> Option<Box<dyn Processor>> {
        match self.scripts.get(processor) {
            Some(def) => Some(Box::new(self.loader.instantiate(Arc::clone(def)))),
            None => self.registry.instantiate(processor, env),
        }
    }
}
