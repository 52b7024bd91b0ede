// Pipeline labeling: prompt construction, batch classification and reconciliation

pub mod classifier;
pub mod orchestrator;
pub mod prompt;

pub use classifier::{BatchClassifier, ClassifyError};
pub use orchestrator::{LabelingOrchestrator, LabelingOutput, LabelingReport};
