// SpamLens Data Models
// Shared request/response and training types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::errors::ClassifierError;

/// Placeholder risk factor used when the explanation lists no bullets
pub const NO_RISK_FACTOR: &str = "未识别到明显风险因素";

/// Probability at or above which a message is labelled spam
pub const SPAM_THRESHOLD: f64 = 0.5;

// ============ Labels & Slots ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    /// Parse a raw dataset label ("ham" / "spam"), exact match only
    pub fn from_dataset(raw: &str) -> Option<Self> {
        match raw {
            "ham" => Some(Self::Ham),
            "spam" => Some(Self::Spam),
            _ => None,
        }
    }

    /// Threshold a class-1 probability; 0.5 counts as spam
    pub fn from_probability(probability: f64) -> Self {
        if probability >= SPAM_THRESHOLD {
            Self::Spam
        } else {
            Self::Ham
        }
    }

    pub fn encoded(self) -> u8 {
        match self {
            Self::Ham => 0,
            Self::Spam => 1,
        }
    }

    pub fn is_spam(self) -> bool {
        self == Self::Spam
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ham => "ham",
            Self::Spam => "spam",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelSlot {
    #[serde(rename = "logreg")]
    LogReg,
    #[serde(rename = "lightgbm")]
    LightGbm,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 2] = [ModelSlot::LogReg, ModelSlot::LightGbm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogReg => "logreg",
            Self::LightGbm => "lightgbm",
        }
    }

    /// Key used in the evaluation report file
    pub fn report_key(self) -> &'static str {
        match self {
            Self::LogReg => "logistic_regression",
            Self::LightGbm => "lightgbm",
        }
    }
}

impl FromStr for ModelSlot {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logreg" => Ok(Self::LogReg),
            "lightgbm" => Ok(Self::LightGbm),
            other => Err(ClassifierError::UnknownSlot(other.to_string())),
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Training Data ============

/// A raw dataset row before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRow {
    pub label: Option<String>,
    pub text: Option<String>,
}

/// A validated, normalized training row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

// ============ Inference ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub is_spam: bool,
    pub probability: f64,
    pub model_used: ModelSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub summary: String,
    pub risk_factors: Vec<String>,
    pub explanation: String,
    pub action_suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub prediction: PredictionResult,
    pub analysis: AnalysisReport,
    /// Set when the input needed translation but the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub logistic_regression: PredictionResult,
    pub lightgbm: PredictionResult,
    pub agreement: bool,
}

// ============ Evaluation ============

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub ham: ClassMetrics,
    pub spam: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub f1_score: f64,
    pub macro_f1: f64,
    /// None when the held-out labels contain a single class
    pub roc_auc: Option<f64>,
    pub classification_report: ClassificationReport,
    /// [[TN, FP], [FN, TP]]
    pub confusion_matrix: [[usize; 2]; 2],
}

impl EvaluationMetrics {
    pub fn meets_targets(&self) -> bool {
        self.accuracy >= 0.85 && self.macro_f1 >= 0.80 && self.roc_auc.is_some_and(|auc| auc >= 0.90)
    }
}

/// One model's entry in the evaluation report file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub accuracy: f64,
    pub f1_score: f64,
    pub macro_f1: f64,
    pub roc_auc: Option<f64>,
    pub confusion_matrix: [[usize; 2]; 2],
}

impl From<&EvaluationMetrics> for ReportEntry {
    fn from(m: &EvaluationMetrics) -> Self {
        Self {
            accuracy: m.accuracy,
            f1_score: m.f1_score,
            macro_f1: m.macro_f1,
            roc_auc: m.roc_auc,
            confusion_matrix: m.confusion_matrix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub logistic_regression: ReportEntry,
    pub lightgbm: ReportEntry,
}
