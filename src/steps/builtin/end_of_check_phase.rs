//! Marker separating the check phase of a recipe from the rest.

use crate::engine::environment::Environment;
use crate::engine::error::StepError;
use crate::steps::{Processor, StepDescriptor, StepEnv};

/// Does nothing; recipes use it as a phase boundary.
pub struct EndOfCheckPhase {
    descriptor: StepDescriptor,
}

impl EndOfCheckPhase {
    pub const NAME: &'static str = "EndOfCheckPhase";

    pub fn describe() -> StepDescriptor {
        StepDescriptor::new("Marks the end of the check phase. Has no effect on its own.")
    }

    pub fn new(_env: &Environment) -> Self {
        Self {
            descriptor: Self::describe(),
        }
    }
}

impl Processor for EndOfCheckPhase {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    fn process(&mut self, _env: &mut StepEnv<'_>) -> Result<(), StepError> {
        Ok(())
    }
}
