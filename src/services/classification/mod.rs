// Classification module
// Feature extraction, the two classifier slots, metrics and the training harness

pub mod bank;
pub mod boosted;
pub mod classifier_trait;
pub mod dataset;
pub mod feature_space;
pub mod harness;
pub mod logistic;
pub mod metrics;

pub use bank::ClassifierBank;
pub use classifier_trait::SpamModel;
pub use dataset::{load_csv, load_processed, preprocess, save_processed, validate_rows, ProcessedRow};
pub use feature_space::{FeatureSpace, FeatureVector};
pub use harness::{split, write_evaluation_report, TrainEvalHarness};
pub use metrics::evaluate_predictions;
