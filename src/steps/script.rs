//! Rhai processors colocated with a recipe
//!
//! A file `<Processor>.rhai` next to the recipe implements that processor:
//!
//! ```rhai
//! let description = "Greets someone";
//! let input_variables = #{
//!     name: #{ required: true, description: "Who to greet" },
//! };
//! let output_variables = #{
//!     greeting: #{ description: "The greeting" },
//! };
//!
//! fn process(env) {
//!     env.greeting = `hello ${env.name}`;
//!     env
//! }
//! ```
//!
//! `process` receives the environment (with injected arguments) as a map and
//! returns it. Changed or added keys are written back; dropped keys are not
//! removed. `throw` fails the step.

use super::{InputFlags, Processor, StepDescriptor, StepEnv};
use crate::engine::environment::Environment;
use crate::engine::error::StepError;
use crate::output;
use rhai::{AST, CallFnOptions, Dynamic, Engine, Scope};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROCESS_FN: &str = "process";

#[derive(Debug, Default, Deserialize)]
struct OutputDoc {
    #[serde(default)]
    description: String,
}

/// A compiled script and the contract it declares.
#[derive(Debug)]
pub struct ScriptDefinition {
    name: String,
    path: PathBuf,
    ast: AST,
    descriptor: StepDescriptor,
}

impl ScriptDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }
}

/// Compiles script processors with a shared Rhai engine.
#[derive(Clone)]
pub struct ScriptLoader {
    engine: Arc<Engine>,
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    /// Use a preconfigured engine, e.g. one with extra functions registered.
    pub fn with_engine(mut engine: Engine) -> Self {
        engine.register_fn("log", log_message);
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Compile `path` and read its declared variables.
    pub fn load(&self, name: &str, path: &Path) -> Result<ScriptDefinition, StepError> {
        let source = std::fs::read_to_string(path)?;
        let ast = self
            .engine
            .compile(&source)
            .map_err(|e| StepError::Script(format!("failed to compile {}: {}", path.display(), e)))?;

        if !ast.iter_functions().any(|f| f.name == PROCESS_FN) {
            return Err(StepError::Script(format!(
                "{} does not define fn {PROCESS_FN}(env)",
                path.display()
            )));
        }

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| StepError::Script(format!("failed to evaluate {}: {}", path.display(), e)))?;

        let descriptor = StepDescriptor {
            description: scope.get_value::<String>("description").unwrap_or_default(),
            input_spec: declared::<InputFlags>(&scope, "input_variables")?,
            output_spec: declared::<OutputDoc>(&scope, "output_variables")?
                .into_iter()
                .map(|(name, doc)| (name, doc.description))
                .collect(),
        };

        Ok(ScriptDefinition {
            name: name.to_owned(),
            path: path.to_path_buf(),
            ast,
            descriptor,
        })
    }

    pub fn instantiate(&self, def: Arc<ScriptDefinition>) -> ScriptProcessor {
        ScriptProcessor {
            engine: Arc::clone(&self.engine),
            def,
        }
    }
}

fn log_message(message: &str) {
    output::detail(message);
}

fn declared<T>(scope: &Scope, variable: &str) -> Result<BTreeMap<String, T>, StepError>
where
    T: for<'de> Deserialize<'de>,
{
    match scope.get_value::<Dynamic>(variable) {
        Some(value) => rhai::serde::from_dynamic(&value)
            .map_err(|e| StepError::Script(format!("invalid {variable}: {e}"))),
        None => Ok(BTreeMap::new()),
    }
}

/// One invocation of a script processor.
pub struct ScriptProcessor {
    engine: Arc<Engine>,
    def: Arc<ScriptDefinition>,
}

impl Processor for ScriptProcessor {
    fn descriptor(&self) -> &StepDescriptor {
        &self.def.descriptor
    }

    fn process(&mut self, env: &mut StepEnv<'_>) -> Result<(), StepError> {
        let view = env.merged();
        let input = rhai::serde::to_dynamic(&view).map_err(|e| StepError::Script(e.to_string()))?;

        // top-level statements already ran in ScriptLoader::load
        let options = CallFnOptions::new().eval_ast(false);
        let mut scope = Scope::new();
        let result = self
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut scope, &self.def.ast, PROCESS_FN, (input,))
            .map_err(|e| StepError::Script(format!("{}: {}", self.def.name, e)))?;

        if !result.is_map() {
            return Err(StepError::Script(format!(
                "{}: {PROCESS_FN}() must return the environment map, got {}",
                self.def.name,
                result.type_name()
            )));
        }

        let returned: Environment =
            rhai::serde::from_dynamic(&result).map_err(|e| StepError::Script(e.to_string()))?;
        for (key, value) in returned {
            if view.get(&key) != Some(&value) {
                env.set(key, value);
            }
        }
        Ok(())
    }
}
