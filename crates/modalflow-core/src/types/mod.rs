//! Value types and the ProcessingTask aggregate

mod content;
mod modality;
mod prompt;
mod result;
mod task;

pub use content::InputContent;
pub use modality::ModalityType;
pub use prompt::ProcessingPrompt;
pub use result::ProcessingResult;
pub use task::{ProcessingStatus, ProcessingTask, ProcessingTaskId, TaskEvent};
