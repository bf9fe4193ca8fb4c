//! Creates a file with given contents.

use crate::engine::environment::Environment;
use crate::engine::error::StepError;
use crate::steps::{Processor, StepDescriptor, StepEnv};
use std::path::Path;

pub struct FileCreator {
    descriptor: StepDescriptor,
}

impl FileCreator {
    pub const NAME: &'static str = "FileCreator";

    pub fn describe() -> StepDescriptor {
        StepDescriptor::new("Create a file.")
            .required("file_path", "Path to a file to create.")
            .required("file_content", "Contents to put in file.")
            .optional("file_mode", "String. Numeric mode for file in octal format.")
    }

    pub fn new(_env: &Environment) -> Self {
        Self {
            descriptor: Self::describe(),
        }
    }
}

impl Processor for FileCreator {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    fn process(&mut self, env: &mut StepEnv<'_>) -> Result<(), StepError> {
        let path = Path::new(env.require_str("file_path")?);
        let content = env.require_str("file_content")?;

        std::fs::write(path, content).map_err(|e| {
            StepError::failed(format!("Can't create file at {}: {}", path.display(), e))
        })?;

        if let Some(mode) = env.get_str("file_mode") {
            set_mode(path, mode)?;
        }

        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: &str) -> Result<(), StepError> {
    use std::os::unix::fs::PermissionsExt;

    let bits = u32::from_str_radix(mode, 8)
        .map_err(|_| StepError::failed(format!("invalid file_mode '{mode}', expected octal")))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(bits)).map_err(|e| {
        StepError::failed(format!("Can't set mode of {} to {}: {}", path.display(), mode, e))
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: &str) -> Result<(), StepError> {
    Ok(())
}
