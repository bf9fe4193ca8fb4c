//! Deletes files and directories.

use crate::engine::environment::Environment;
use crate::engine::error::StepError;
use crate::steps::{Processor, StepDescriptor, StepEnv};
use serde_json::Value;
use std::path::Path;

pub struct PathDeleter {
    descriptor: StepDescriptor,
}

impl PathDeleter {
    pub const NAME: &'static str = "PathDeleter";

    pub fn describe() -> StepDescriptor {
        StepDescriptor::new("Deletes file paths.")
            .required("path_list", "An array or list of pathnames to be deleted, even if that list contains a single item.")
    }

    pub fn new(_env: &Environment) -> Self {
        Self {
            descriptor: Self::describe(),
        }
    }
}

impl Processor for PathDeleter {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    fn process(&mut self, env: &mut StepEnv<'_>) -> Result<(), StepError> {
        let Some(Value::Array(items)) = env.get("path_list") else {
            return Err(StepError::failed("path_list must be an array of paths"));
        };

        for item in items {
            let path = item
                .as_str()
                .map(Path::new)
                .ok_or_else(|| StepError::failed(format!("path_list entry {item} is not a string")))?;

            let result = if path.is_dir() && !path.is_symlink() {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_file(path)
            };
            result.map_err(|e| {
                StepError::failed(format!("Could not remove {}: {}", path.display(), e))
            })?;
        }

        Ok(())
    }
}
