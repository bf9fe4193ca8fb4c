//! Recipe executor
//!
//! Runs a verified recipe against its composed environment:
//! 1. Create `RECIPE_CACHE_DIR` (base cache dir joined with the identifier)
//! 2. Record the initial environment as the first trace entry
//! 3. For each step: instantiate, inject arguments, snapshot inputs, process,
//!    commit arguments, snapshot outputs, record
//! 4. Stop early, successfully, when `stop_processing_recipe` is truthy
//!
//! The first failing step ends the run. Nothing is retried or rolled back.

use super::compose::recipe_identifier;
use super::config::expand_home;
use super::environment::{CACHE_DIR, Environment, RECIPE_CACHE_DIR};
use super::error::RecipeError;
use super::recipe::Recipe;
use super::trace::ExecutionTrace;
use crate::output;
use crate::steps::{StepCatalog, StepEnv};
use std::path::PathBuf;
use thiserror::Error;

/// Application directory under the platform cache dir.
const APP_DIR: &str = "autopackager";

/// Options that apply to every run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Base cache directory, used when the environment has no `CACHE_DIR`.
    pub cache_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}

/// Platform default base cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".").join(".cache"))
        .join(APP_DIR)
        .join("Cache")
}

/// Result of a run that completed, fully or through the stop sentinel.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub environment: Environment,
    pub trace: ExecutionTrace,
    /// True when a step set `stop_processing_recipe`.
    pub stopped_early: bool,
}

/// A failed run, with everything that happened before the failure.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: RecipeError,
    pub trace: ExecutionTrace,
    pub environment: Environment,
}

impl RunFailure {
    /// A failure before any step ran.
    pub fn before_run(error: RecipeError, environment: Environment) -> Self {
        Self {
            error,
            trace: ExecutionTrace::new(),
            environment,
        }
    }
}

/// Run every step of `recipe` in order.
///
/// `env` should come from [`compose`](super::compose::compose) and the recipe
/// should already have passed [`verify`](super::verify::verify).
pub fn run(
    recipe: &Recipe,
    mut env: Environment,
    catalog: &dyn StepCatalog,
    options: &RunOptions,
) -> Result<RunReport, RunFailure> {
    let mut trace = ExecutionTrace::new();

    if let Err(error) = prepare_cache_dir(recipe, &mut env, options) {
        return Err(RunFailure {
            error,
            trace,
            environment: env,
        });
    }

    trace.record_recipe_input(&env);
    output::dump(3, "Environment", &env);

    match run_steps(recipe, &mut env, catalog, &mut trace) {
        Ok(stopped_early) => {
            output::dump(3, "Environment", &env);
            Ok(RunReport {
                environment: env,
                trace,
                stopped_early,
            })
        }
        Err(error) => Err(RunFailure {
            error,
            trace,
            environment: env,
        }),
    }
}

/// `CACHE_DIR` from the environment, then the configured dir, then the default.
fn cache_base(env: &Environment, options: &RunOptions) -> PathBuf {
    env.get_str(CACHE_DIR)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| options.cache_dir.clone())
        .map(|p| expand_home(&p))
        .unwrap_or_else(default_cache_dir)
}

fn prepare_cache_dir(
    recipe: &Recipe,
    env: &mut Environment,
    options: &RunOptions,
) -> Result<(), RecipeError> {
    let identifier = recipe_identifier(recipe, env)?;
    let cache_dir = cache_base(env, options).join(&identifier);

    if !cache_dir.is_dir() {
        std::fs::create_dir_all(&cache_dir).map_err(|source| RecipeError::Filesystem {
            path: cache_dir.clone(),
            source,
        })?;
    }

    env.insert(RECIPE_CACHE_DIR, cache_dir.to_string_lossy().into_owned());
    Ok(())
}

/// Returns whether the stop sentinel ended the run.
fn run_steps(
    recipe: &Recipe,
    env: &mut Environment,
    catalog: &dyn StepCatalog,
    trace: &mut ExecutionTrace,
) -> Result<bool, RecipeError> {
    for step in &recipe.process {
        output::sub_action(&step.processor);

        let mut processor = catalog
            .instantiate(&step.processor, env)
            .ok_or_else(|| RecipeError::UnknownStepType(step.processor.clone()))?;
        let descriptor = processor.descriptor().clone();

        let input = {
            let mut view = StepEnv::new(env);
            view.inject(&step.arguments);
            let input = view.snapshot(descriptor.input_spec.keys().map(String::as_str));
            output::dump(2, "Input", &input);

            processor
                .process(&mut view)
                .map_err(|source| RecipeError::StepExecutionFailure {
                    step_type: step.processor.clone(),
                    source,
                })?;
            view.commit();
            input
        };

        let mut outputs = Environment::new();
        for name in descriptor.outputs() {
            let value = env.get(name).ok_or_else(|| RecipeError::InternalContractViolation {
                step_type: step.processor.clone(),
                name: name.to_owned(),
            })?;
            outputs.insert(name, value.clone());
        }
        output::dump(2, "Output", &outputs);

        trace.record_step(&step.processor, input, outputs);

        if env.stop_requested() {
            output::skip(&format!("{} requested recipe stop", step.processor));
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::environment::STOP_PROCESSING_RECIPE;
    use crate::engine::error::StepError;
    use crate::engine::recipe::Step;
    use crate::engine::verify::verify;
    use crate::steps::{Processor, StepDescriptor, StepRegistry};
    use serde_json::json;
    use tempfile::TempDir;

    /// Sets each declared output to "<processor>:<name>" unless told otherwise.
    struct Scripted {
        descriptor: StepDescriptor,
        name: &'static str,
        fail: bool,
        skip_outputs: bool,
    }

    impl Processor for Scripted {
        fn descriptor(&self) -> &StepDescriptor {
            &self.descriptor
        }

        fn process(&mut self, env: &mut StepEnv<'_>) -> Result<(), StepError> {
            if self.fail {
                return Err(StepError::failed("boom"));
            }
            if !self.skip_outputs {
                let names: Vec<String> = self.descriptor.outputs().map(str::to_owned).collect();
                for name in names {
                    env.set(name.clone(), format!("{}:{}", self.name, name));
                }
            }
            Ok(())
        }
    }

    fn add(
        registry: &mut StepRegistry,
        name: &'static str,
        descriptor: StepDescriptor,
        fail: bool,
        skip_outputs: bool,
    ) {
        let d = descriptor.clone();
        registry.register(name, descriptor, move |_| Scripted {
            descriptor: d.clone(),
            name,
            fail,
            skip_outputs,
        });
    }

    fn registry() -> StepRegistry {
        let mut r = StepRegistry::with_builtins();
        add(&mut r, "Producer", StepDescriptor::new("").output("produced", ""), false, false);
        add(
            &mut r,
            "Consumer",
            StepDescriptor::new("").required("produced", "").output("consumed", ""),
            false,
            false,
        );
        add(&mut r, "Failing", StepDescriptor::new(""), true, false);
        add(&mut r, "Liar", StepDescriptor::new("").output("promised", ""), false, true);
        r
    }

    fn recipe(steps: &[&str]) -> Recipe {
        Recipe {
            input: Environment::from([("IDENTIFIER", "com.example.test")]),
            process: steps.iter().map(|s| Step::new(*s)).collect(),
            ..Default::default()
        }
    }

    fn options(dir: &TempDir) -> RunOptions {
        RunOptions::default().cache_dir(dir.path())
    }

    fn env_for(recipe: &Recipe) -> Environment {
        recipe.input.clone()
    }

    #[test]
    fn test_cache_dir_created_and_recorded() {
        let dir = TempDir::new().unwrap();
        let r = recipe(&[]);
        let report = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();

        let expected = dir.path().join("com.example.test");
        assert!(expected.is_dir());
        assert_eq!(
            report.environment.get_str(RECIPE_CACHE_DIR),
            Some(expected.to_string_lossy().as_ref())
        );
        let initial = report.trace.recipe_input().unwrap();
        assert!(initial.contains_key(RECIPE_CACHE_DIR));
    }

    #[test]
    fn test_cache_dir_env_override_wins() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let r = recipe(&[]);
        let mut env = env_for(&r);
        env.insert(CACHE_DIR, other.path().to_string_lossy().into_owned());

        run(&r, env, &registry(), &options(&dir)).unwrap();
        assert!(other.path().join("com.example.test").is_dir());
        assert!(!dir.path().join("com.example.test").exists());
    }

    #[test]
    fn test_escaping_identifier_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("a/b/cache");
        for identifier in ["../../escaped", "/abs"] {
            let r = Recipe {
                input: Environment::from([("IDENTIFIER", identifier)]),
                process: vec![Step::new("Producer")],
                ..Default::default()
            };
            let failure = run(&r, env_for(&r), &registry(), &RunOptions::default().cache_dir(&base))
                .unwrap_err();
            assert!(matches!(failure.error, RecipeError::InvalidIdentifier(_)));
            assert!(failure.trace.is_empty());
            assert!(!failure.environment.contains_key(RECIPE_CACHE_DIR));
        }
        assert!(!dir.path().join("a/escaped").exists());
        assert!(!base.exists());
    }

    #[test]
    fn test_cache_base_expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let env = Environment::from([(CACHE_DIR, "~/autopkg-cache")]);
        assert_eq!(cache_base(&env, &RunOptions::default()), home.join("autopkg-cache"));

        let options = RunOptions::default().cache_dir("~/configured");
        assert_eq!(cache_base(&Environment::new(), &options), home.join("configured"));
        assert_eq!(
            cache_base(&Environment::from([(CACHE_DIR, "")]), &RunOptions::default()),
            default_cache_dir()
        );
    }

    #[test]
    fn test_cache_dir_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let r = recipe(&["Producer"]);

        let failure = run(&r, env_for(&r), &registry(), &RunOptions::default().cache_dir(&blocker))
            .unwrap_err();
        assert!(matches!(failure.error, RecipeError::Filesystem { .. }));
        assert!(failure.trace.is_empty());
    }

    #[test]
    fn test_outputs_flow_to_later_steps() {
        let dir = TempDir::new().unwrap();
        let r = recipe(&["Producer", "Consumer"]);
        let report = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();

        assert!(!report.stopped_early);
        assert_eq!(report.trace.processors(), vec!["Producer", "Consumer"]);
        assert_eq!(report.environment.get_str("consumed"), Some("Consumer:consumed"));

        match &report.trace.entries()[2] {
            crate::engine::trace::TraceEntry::Step { input, output, .. } => {
                assert_eq!(input, &Environment::from([("produced", "Producer:produced")]));
                assert_eq!(output, &Environment::from([("consumed", "Consumer:consumed")]));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_fail_fast_keeps_partial_trace() {
        let dir = TempDir::new().unwrap();
        let r = recipe(&["Producer", "Failing", "Consumer"]);
        let failure = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap_err();

        match &failure.error {
            RecipeError::StepExecutionFailure { step_type, source } => {
                assert_eq!(step_type, "Failing");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        // recipe input + Producer
        assert_eq!(failure.trace.entries().len(), 2);
        assert_eq!(failure.trace.processors(), vec!["Producer"]);
        assert!(failure.environment.contains_key("produced"));
        assert!(!failure.environment.contains_key("consumed"));
    }

    #[test]
    fn test_missing_declared_output_is_contract_violation() {
        let dir = TempDir::new().unwrap();
        let r = recipe(&["Liar", "Producer"]);
        let failure = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap_err();

        assert!(matches!(
            &failure.error,
            RecipeError::InternalContractViolation { step_type, name }
                if step_type == "Liar" && name == "promised"
        ));
        assert_eq!(failure.trace.step_count(), 0);
    }

    #[test]
    fn test_stop_sentinel_ends_run_successfully() {
        let dir = TempDir::new().unwrap();
        let mut r = recipe(&["Producer", "StopProcessingIf", "Consumer"]);
        r.process[1].arguments = Environment::from([("predicate", "true")]);

        let report = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();
        assert!(report.stopped_early);
        assert_eq!(report.trace.processors(), vec!["Producer", "StopProcessingIf"]);
        assert_eq!(report.environment.get(STOP_PROCESSING_RECIPE), Some(&json!(true)));
        assert!(!report.environment.contains_key("consumed"));
    }

    #[test]
    fn test_unknown_processor_at_runtime() {
        let dir = TempDir::new().unwrap();
        let r = recipe(&["Producer", "Ghost"]);
        let failure = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap_err();
        assert!(matches!(failure.error, RecipeError::UnknownStepType(ref n) if n == "Ghost"));
        assert_eq!(failure.trace.step_count(), 1);
    }

    #[test]
    fn test_input_snapshot_sees_injected_arguments() {
        let dir = TempDir::new().unwrap();
        let mut r = recipe(&["Consumer"]);
        r.process[0].arguments = Environment::from([("produced", "%IDENTIFIER%-arg")]);

        let report = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();
        match &report.trace.entries()[1] {
            crate::engine::trace::TraceEntry::Step { input, .. } => {
                assert_eq!(input.get_str("produced"), Some("com.example.test-arg"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        // arguments stay in the environment once the step succeeds
        assert_eq!(report.environment.get_str("produced"), Some("com.example.test-arg"));
    }

    #[test]
    fn test_arguments_of_earlier_step_reach_later_steps() {
        let dir = TempDir::new().unwrap();
        let mut r = recipe(&["EndOfCheckPhase", "Consumer"]);
        r.process[0].arguments = Environment::from([("produced", "from-arguments")]);
        verify(&r, &env_for(&r), &registry()).unwrap();

        let report = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();
        assert_eq!(report.environment.get_str("produced"), Some("from-arguments"));
        assert_eq!(report.environment.get_str("consumed"), Some("Consumer:consumed"));
    }

    #[test]
    fn test_failed_step_arguments_not_persisted() {
        let dir = TempDir::new().unwrap();
        let mut r = recipe(&["Failing"]);
        r.process[0].arguments = Environment::from([("leftover", "x")]);

        let failure = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap_err();
        assert!(!failure.environment.contains_key("leftover"));
    }

    #[test]
    fn test_runs_are_deterministic() {
        let dir = TempDir::new().unwrap();
        let r = recipe(&["Producer", "Consumer"]);
        let first = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();
        let second = run(&r, env_for(&r), &registry(), &options(&dir)).unwrap();
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.environment, second.environment);
    }
}
