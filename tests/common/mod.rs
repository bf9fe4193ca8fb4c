//! Common test utilities for recipe integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use autopackager::engine::LocalOverrides;
use autopackager::{AutoPackager, Recipe, RunOptions, StepRegistry};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch area with a recipes dir and a cache dir.
pub struct TestEnv {
    pub dir: TempDir,
    pub recipes_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let recipes_dir = dir.path().join("recipes");
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(&recipes_dir).unwrap();
        Self {
            dir,
            recipes_dir,
            cache_dir,
        }
    }

    /// Write `content` to `recipes/<name>` and return the path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.recipes_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn load(&self, name: &str, content: &str) -> Recipe {
        Recipe::load(&self.write(name, content)).unwrap()
    }

    pub fn packager(&self) -> AutoPackager {
        self.packager_with(LocalOverrides::default())
    }

    pub fn packager_with(&self, overrides: LocalOverrides) -> AutoPackager {
        AutoPackager::new(StepRegistry::with_builtins())
            .with_options(RunOptions::default().cache_dir(&self.cache_dir))
            .with_local_overrides(overrides)
    }

    pub fn cache_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.cache_dir.join(rel)
    }
}
