//! Processors that ship with the engine

mod end_of_check_phase;
mod file_creator;
mod path_deleter;
mod stop_processing_if;

pub use end_of_check_phase::EndOfCheckPhase;
pub use file_creator::FileCreator;
pub use path_deleter::PathDeleter;
pub use stop_processing_if::StopProcessingIf;

use super::StepRegistry;

/// Register every built-in processor.
pub fn register_all(registry: &mut StepRegistry) {
    registry.register(
        EndOfCheckPhase::NAME,
        EndOfCheckPhase::describe(),
        EndOfCheckPhase::new,
    );
    registry.register(FileCreator::NAME, FileCreator::describe(), FileCreator::new);
    registry.register(PathDeleter::NAME, PathDeleter::describe(), PathDeleter::new);
    registry.register(
        StopProcessingIf::NAME,
        StopProcessingIf::describe(),
        StopProcessingIf::new,
    );
}
