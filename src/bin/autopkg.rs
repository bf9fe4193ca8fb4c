//! autopkg - run recipes
//!
//! Usage:
//!   autopkg run <recipe>... [-k NAME=value]...   Run one or more recipes
//!   autopkg verify <recipe>... [-k NAME=value]   Check recipes without running
//!   autopkg info <recipe>                        Show inputs and processors
//!   autopkg list                                 List recipes in search dirs
//!   autopkg processors                           List built-in processors

use anyhow::{Context, Result, bail};
use autopackager::engine::config::Preferences;
use autopackager::engine::{recipe_identifier, search};
use autopackager::{AutoPackager, Environment, Recipe, RunOptions, StepCatalog, StepRegistry, StepResolver, output};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "autopkg")]
#[command(about = "Run recipes: compose inputs, verify processors, execute with an audit trail")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More output; repeat for input/output snapshots and full environments
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Preferences file to use instead of the XDG config files
    #[arg(long, global = true, env = "AUTOPKG_PREFS")]
    prefs: Option<PathBuf>,

    /// Additional directory to search for recipes
    #[arg(short = 'd', long = "search-dir", global = true)]
    search_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more recipes
    Run {
        /// Recipe names or paths
        #[arg(required = true)]
        recipes: Vec<String>,

        /// Input override, highest precedence (repeatable)
        #[arg(short = 'k', long = "key", value_parser = parse_key_val)]
        keys: Vec<(String, String)>,

        /// Base cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Write a JSON report of every run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compose and verify recipes without running them
    Verify {
        /// Recipe names or paths
        #[arg(required = true)]
        recipes: Vec<String>,

        /// Input override, highest precedence (repeatable)
        #[arg(short = 'k', long = "key", value_parser = parse_key_val)]
        keys: Vec<(String, String)>,
    },

    /// Show a recipe's identifier, inputs and processors
    Info {
        /// Recipe name or path
        recipe: String,
    },

    /// List recipes found in the search directories
    List,

    /// List built-in processors and their variables
    Processors,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn cli_overrides(keys: &[(String, String)]) -> Environment {
    keys.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    output::set_verbosity(if cli.quiet { 0 } else { cli.verbose.saturating_add(1) });

    let prefs = match &cli.prefs {
        Some(path) => Preferences::load_from(path)?,
        None => Preferences::load()?,
    };

    let mut search_dirs = cli.search_dirs.clone();
    search_dirs.extend(prefs.recipe_search_dirs.iter().cloned());

    match cli.command {
        Commands::Run {
            recipes,
            keys,
            cache_dir,
            report,
        } => {
            let options = RunOptions {
                cache_dir: cache_dir.or_else(|| prefs.cache_dir.clone()),
            };
            let packager = AutoPackager::new(StepRegistry::with_builtins())
                .with_options(options)
                .with_local_overrides(prefs.local_overrides.clone());
            run_recipes(&packager, &recipes, &search_dirs, &cli_overrides(&keys), report.as_deref())?;
        }

        Commands::Verify { recipes, keys } => {
            let packager = AutoPackager::new(StepRegistry::with_builtins())
                .with_local_overrides(prefs.local_overrides.clone());
            let overrides = cli_overrides(&keys);
            let mut failed = 0;
            for name in &recipes {
                let recipe = load_recipe(name, &search_dirs)?;
                match packager.check(&recipe, &overrides) {
                    Ok(_) => output::success(&format!("{name} OK")),
                    Err(e) => {
                        output::error(&format!("{name}: {e}"));
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} recipe(s) failed verification", recipes.len());
            }
        }

        Commands::Info { recipe } => {
            let packager = AutoPackager::new(StepRegistry::with_builtins())
                .with_local_overrides(prefs.local_overrides.clone());
            show_info(&packager, &load_recipe(&recipe, &search_dirs)?)?;
        }

        Commands::List => {
            let recipes = search::list_recipes(&search_dirs);
            if recipes.is_empty() {
                output::info("No recipes found");
            }
            for path in recipes {
                println!("{}", path.display());
            }
        }

        Commands::Processors => {
            let registry = StepRegistry::with_builtins();
            for name in registry.names() {
                let Some(descriptor) = registry.descriptor(name) else {
                    continue;
                };
                println!("{name}");
                if !descriptor.description.is_empty() {
                    println!("    {}", descriptor.description);
                }
                for (input, flags) in &descriptor.input_spec {
                    let req = if flags.required { "required" } else { "optional" };
                    println!("    in  {input} ({req})");
                }
                for output_name in descriptor.output_spec.keys() {
                    println!("    out {output_name}");
                }
            }
        }
    }

    Ok(())
}

fn load_recipe(name: &str, search_dirs: &[PathBuf]) -> Result<Recipe> {
    let path = search::find_recipe(name, search_dirs)
        .with_context(|| format!("No recipe found for '{name}'"))?;
    Ok(Recipe::load(&path)?)
}

fn run_recipes(
    packager: &AutoPackager,
    names: &[String],
    search_dirs: &[PathBuf],
    overrides: &Environment,
    report_path: Option<&Path>,
) -> Result<()> {
    let mut runs = Vec::new();
    let mut failures = Vec::new();
    let total = names.len();

    for (i, name) in names.iter().enumerate() {
        output::action_numbered(i + 1, total, &format!("Processing {name}"));

        let recipe = match load_recipe(name, search_dirs) {
            Ok(recipe) => recipe,
            Err(e) => {
                output::error(&format!("{e:#}"));
                failures.push(json!({"recipe": name, "message": format!("{e:#}")}));
                continue;
            }
        };

        match packager.process(&recipe, overrides) {
            Ok(report) => {
                output::success(&format!("{name} done ({} steps)", report.trace.step_count()));
                runs.push(json!({"recipe": name, "trace": report.trace}));
            }
            Err(failure) => {
                output::error(&format!("{name}: {}", failure.error));
                failures.push(json!({
                    "recipe": name,
                    "message": failure.error.to_string(),
                    "processor": failure.error.step_type(),
                }));
                runs.push(json!({"recipe": name, "trace": failure.trace}));
            }
        }
    }

    if let Some(path) = report_path {
        let report = json!({"runs": runs, "failures": failures});
        let text = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    if !failures.is_empty() {
        bail!("{} of {total} recipe(s) failed", failures.len());
    }
    Ok(())
}

fn show_info(packager: &AutoPackager, recipe: &Recipe) -> Result<()> {
    let env = packager.environment_for(recipe, &Environment::new())?;
    let identifier = recipe_identifier(recipe, &env)?;
    let resolver = StepResolver::for_recipe(packager.registry(), recipe, &env);

    if let Some(description) = &recipe.description {
        println!("Description: {description}");
    }
    println!("Identifier:  {identifier}");
    if let Some(path) = &recipe.path {
        println!("Path:        {}", path.display());
    }

    println!("Input:");
    for (key, value) in env.iter() {
        println!("    {key} = {value}");
    }

    println!("Process:");
    for step in &recipe.process {
        let origin = if resolver.is_colocated(&step.processor) {
            "script"
        } else if resolver.descriptor(&step.processor).is_some() {
            "built-in"
        } else {
            "unknown"
        };
        println!("    {} ({origin})", step.processor);
    }

    Ok(())
}
