// SpamLens Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod errors;
pub mod classification;
pub mod translation;
pub mod report_parser;
pub mod analysis;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;
pub use errors::*;
pub use translation::{Translation, TranslationBridge};
pub use report_parser::parse_report;
pub use analysis::{AnalysisOrchestrator, DEFAULT_SLOT};

pub use classification::{
    load_csv,
    load_processed,
    preprocess,
    save_processed,
    split,
    validate_rows,
    write_evaluation_report,
    ClassifierBank,
    FeatureSpace,
    FeatureVector,
    ProcessedRow,
    SpamModel,
    TrainEvalHarness,
};
