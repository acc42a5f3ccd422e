// Error taxonomy for training, inference and analysis

use thiserror::Error;

use crate::models::ModelSlot;
use crate::services::providers::ProviderError;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Schema violation at row {row}: {reason}")]
    SchemaViolation { row: usize, reason: String },
    #[error("Unknown model slot: {0} (expected logreg or lightgbm)")]
    UnknownSlot(String),
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(ModelSlot),
    #[error("Model artifact missing: {0}")]
    ArtifactMissing(String),
    #[error("Training set is empty")]
    EmptyTrainingSet,
    #[error("Empty vocabulary; documents contain no usable terms")]
    EmptyVocabulary,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("Explanation request failed: {0}")]
    ExplanationRequest(#[source] ProviderError),
}
