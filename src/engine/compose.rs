//! Input composition
//!
//! Builds the working environment for a run from, lowest precedence first:
//! 1. the recipe's `Input` defaults
//! 2. the user's `RecipeInputOverrides` entry for the recipe identifier
//! 3. `NAME=value` pairs given on the command line

use super::environment::{self, Environment, RECIPE_DIR, RECIPE_PATH};
use super::error::RecipeError;
use super::recipe::Recipe;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Joiner used when synthesizing an identifier from a recipe path.
const IDENTIFIER_JOINER: &str = "-";

/// Per-recipe input overrides from the user's preferences, keyed by identifier.
///
/// Entries are kept as raw values; their shape is only checked when a recipe
/// with a matching identifier is composed.
#[derive(Debug, Clone, Default)]
pub struct LocalOverrides {
    origin: String,
    entries: BTreeMap<String, Value>,
}

impl LocalOverrides {
    /// `origin` names where the overrides came from, for error messages.
    pub fn new(origin: impl Into<String>, entries: BTreeMap<String, Value>) -> Self {
        Self {
            origin: origin.into(),
            entries,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.entries.get(identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the identifier of `recipe`.
///
/// Uses the explicit `IDENTIFIER` input when present. Otherwise the recipe
/// path (or `RECIPE_PATH` from `env`) with its extension stripped and path
/// separators replaced, so `/recipes/Foo.recipe` becomes `-recipes-Foo`.
pub fn recipe_identifier(recipe: &Recipe, env: &Environment) -> Result<String, RecipeError> {
    if let Some(identifier) = recipe.explicit_identifier() {
        if !is_contained(identifier) {
            return Err(RecipeError::InvalidIdentifier(identifier.to_owned()));
        }
        return Ok(identifier.to_owned());
    }

    let path = match &recipe.path {
        Some(path) => path.clone(),
        None => env
            .get_str(RECIPE_PATH)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(RecipeError::MissingIdentifier)?,
    };

    Ok(identifier_from_path(&path))
}

/// Whether joining `identifier` onto a directory stays below it.
fn is_contained(identifier: &str) -> bool {
    Path::new(identifier)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn identifier_from_path(path: &Path) -> String {
    let stem = path.with_extension("");
    stem.to_string_lossy()
        .split(['/', std::path::MAIN_SEPARATOR])
        .collect::<Vec<_>>()
        .join(IDENTIFIER_JOINER)
}

/// Compose the working environment for a run.
///
/// Never mutates the recipe. When the recipe came from a file, `RECIPE_PATH`
/// and `RECIPE_DIR` are seeded beneath every other source.
pub fn compose(
    recipe: &Recipe,
    local_overrides: Option<&LocalOverrides>,
    cli_overrides: &Environment,
) -> Result<Environment, RecipeError> {
    let mut env = Environment::new();

    if let Some(path) = &recipe.path {
        env.insert(RECIPE_PATH, path.to_string_lossy().into_owned());
        if let Some(dir) = recipe.dir() {
            env.insert(RECIPE_DIR, dir.to_string_lossy().into_owned());
        }
    }

    env.extend(&recipe.input);

    if let Some(overrides) = local_overrides.filter(|o| !o.is_empty()) {
        let identifier = recipe_identifier(recipe, &env)?;
        if let Some(entry) = overrides.get(&identifier) {
            let Value::Object(values) = entry else {
                return Err(RecipeError::Configuration {
                    identifier,
                    origin: overrides.origin().to_owned(),
                    found: environment::shape_name(entry).to_owned(),
                });
            };
            for (key, value) in values {
                env.insert(key.clone(), value.clone());
            }
        }
    }

    env.extend(cli_overrides);
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recipe_with_input(input: Environment) -> Recipe {
        Recipe {
            input,
            ..Default::default()
        }
    }

    fn overrides_for(identifier: &str, value: Value) -> LocalOverrides {
        LocalOverrides::new(
            "RecipeInputOverrides",
            BTreeMap::from([(identifier.to_owned(), value)]),
        )
    }

    #[test]
    fn test_cli_beats_local_beats_recipe() {
        let recipe = recipe_with_input(Environment::from([("IDENTIFIER", "X"), ("A", "1")]));
        let local = overrides_for("X", json!({"A": "2"}));

        let env = compose(&recipe, Some(&local), &Environment::from([("A", "3")])).unwrap();
        assert_eq!(env.get_str("A"), Some("3"));

        let env = compose(&recipe, Some(&local), &Environment::new()).unwrap();
        assert_eq!(env.get_str("A"), Some("2"));

        let env = compose(&recipe, None, &Environment::new()).unwrap();
        assert_eq!(env.get_str("A"), Some("1"));
    }

    #[test]
    fn test_overrides_for_other_identifiers_ignored() {
        let recipe = recipe_with_input(Environment::from([("IDENTIFIER", "X"), ("A", "1")]));
        let local = overrides_for("Y", json!({"A": "2"}));

        let env = compose(&recipe, Some(&local), &Environment::new()).unwrap();
        assert_eq!(env.get_str("A"), Some("1"));
    }

    #[test]
    fn test_malformed_override_entry() {
        let recipe = recipe_with_input(Environment::from([("IDENTIFIER", "X")]));
        let local = overrides_for("X", json!(["not", "a", "map"]));

        let err = compose(&recipe, Some(&local), &Environment::new()).unwrap_err();
        match err {
            RecipeError::Configuration {
                identifier,
                origin,
                found,
            } => {
                assert_eq!(identifier, "X");
                assert_eq!(origin, "RecipeInputOverrides");
                assert_eq!(found, "array");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compose_does_not_mutate_recipe() {
        let recipe = recipe_with_input(Environment::from([("IDENTIFIER", "X"), ("A", "1")]));
        let before = recipe.clone();
        compose(
            &recipe,
            Some(&overrides_for("X", json!({"A": "2"}))),
            &Environment::from([("B", "3")]),
        )
        .unwrap();
        assert_eq!(recipe, before);
    }

    #[test]
    fn test_identifier_synthesized_from_path() {
        let recipe = Recipe {
            path: Some(PathBuf::from("/recipes/vendor/Foo.recipe")),
            ..Default::default()
        };
        let id = recipe_identifier(&recipe, &Environment::new()).unwrap();
        assert_eq!(id, "-recipes-vendor-Foo");

        let other = Recipe {
            path: Some(PathBuf::from("/recipes/other/Foo.recipe")),
            ..Default::default()
        };
        assert_ne!(recipe_identifier(&other, &Environment::new()).unwrap(), id);
    }

    #[test]
    fn test_identifier_prefers_explicit_input() {
        let recipe = Recipe {
            input: Environment::from([("IDENTIFIER", "com.example.Foo")]),
            path: Some(PathBuf::from("/recipes/Foo.recipe")),
            ..Default::default()
        };
        assert_eq!(
            recipe_identifier(&recipe, &Environment::new()).unwrap(),
            "com.example.Foo"
        );
    }

    #[test]
    fn test_identifier_must_stay_below_cache_base() {
        for bad in ["../../escaped", "/abs", "a/../b", "./here"] {
            let recipe = recipe_with_input(Environment::from([("IDENTIFIER", bad)]));
            assert!(
                matches!(
                    recipe_identifier(&recipe, &Environment::new()),
                    Err(RecipeError::InvalidIdentifier(ref id)) if id == bad
                ),
                "{bad}"
            );
        }

        let nested = recipe_with_input(Environment::from([("IDENTIFIER", "vendor/com.example.Foo")]));
        assert_eq!(
            recipe_identifier(&nested, &Environment::new()).unwrap(),
            "vendor/com.example.Foo"
        );
    }

    #[test]
    fn test_identifier_falls_back_to_env_path() {
        let recipe = Recipe::default();
        let env = Environment::from([(RECIPE_PATH, "/r/Bar.json")]);
        assert_eq!(recipe_identifier(&recipe, &env).unwrap(), "-r-Bar");
        assert!(matches!(
            recipe_identifier(&recipe, &Environment::new()),
            Err(RecipeError::MissingIdentifier)
        ));
    }

    #[test]
    fn test_path_keys_seeded_and_overridable() {
        let recipe = Recipe {
            path: Some(PathBuf::from("/recipes/Foo.recipe")),
            ..Default::default()
        };
        let env = compose(&recipe, None, &Environment::new()).unwrap();
        assert_eq!(env.get_str(RECIPE_PATH), Some("/recipes/Foo.recipe"));
        assert_eq!(env.get_str(RECIPE_DIR), Some("/recipes"));

        let env = compose(&recipe, None, &Environment::from([(RECIPE_DIR, "/elsewhere")])).unwrap();
        assert_eq!(env.get_str(RECIPE_DIR), Some("/elsewhere"));
    }
}
