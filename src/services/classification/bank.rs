// Classifier Bank
// Owns both trained classifier slots, their feature spaces and the stored metrics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::models::{EvaluationMetrics, Label, LabeledExample, ModelSlot};
use crate::services::config_store::ClassifierConfig;
use crate::services::errors::ClassifierError;
use crate::services::text_processor::normalize;

use super::boosted::BoostedTrees;
use super::classifier_trait::SpamModel;
use super::feature_space::FeatureSpace;
use super::logistic::LogisticRegression;
use super::metrics::evaluate_predictions;

pub const LOGREG_ARTIFACT: &str = "logreg_model";
pub const LIGHTGBM_ARTIFACT: &str = "lightgbm_model";
pub const VECTORIZER_ARTIFACT: &str = "tfidf_vectorizer";
pub const METRICS_ARTIFACT: &str = "metrics";

const ARTIFACTS: [&str; 4] = [
    LOGREG_ARTIFACT,
    LIGHTGBM_ARTIFACT,
    VECTORIZER_ARTIFACT,
    METRICS_ARTIFACT,
];

fn artifact_file(name: &str) -> String {
    format!("{}.json", name)
}

/// Logistic regression together with the feature space fitted for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRegPipeline {
    pub features: FeatureSpace,
    pub classifier: LogisticRegression,
}

/// The two classifier slots. The logreg pipeline embeds its own feature space;
/// the boosted trees use the bank's standalone one. Both are fitted separately
/// on the same corpus and are never merged.
pub struct ClassifierBank {
    config: ClassifierConfig,
    logreg: Option<LogRegPipeline>,
    lightgbm: Option<BoostedTrees>,
    features: Option<FeatureSpace>,
    metrics: BTreeMap<ModelSlot, EvaluationMetrics>,
}

impl ClassifierBank {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            logreg: None,
            lightgbm: None,
            features: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn is_loaded(&self, slot: ModelSlot) -> bool {
        self.slot_parts(slot).is_ok()
    }

    /// Fit one slot on normalized training examples
    pub fn train(&mut self, slot: ModelSlot, examples: &[LabeledExample]) -> Result<(), ClassifierError> {
        if examples.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
        let labels: Vec<Label> = examples.iter().map(|e| e.label).collect();
        let features = FeatureSpace::fit(&texts, self.config.max_features, self.config.ngram_range)?;
        let x = features.transform(&texts);

        match slot {
            ModelSlot::LogReg => {
                let mut classifier = LogisticRegression::new(self.config.logreg_c, self.config.logreg_max_iter);
                classifier.fit(&x, &labels)?;
                self.logreg = Some(LogRegPipeline { features, classifier });
            }
            ModelSlot::LightGbm => {
                let mut classifier = BoostedTrees::new(self.config.gbdt_trees, self.config.gbdt_learning_rate);
                classifier.fit(&x, &labels)?;
                self.lightgbm = Some(classifier);
                self.features = Some(features);
            }
        }

        info!(
            "[BANK] trained slot={} rows={} vocabulary={}",
            slot,
            examples.len(),
            x.first().map(|v| v.dimension).unwrap_or(0)
        );
        Ok(())
    }

    fn slot_parts(&self, slot: ModelSlot) -> Result<(&FeatureSpace, &dyn SpamModel), ClassifierError> {
        match slot {
            ModelSlot::LogReg => self
                .logreg
                .as_ref()
                .map(|p| (&p.features, &p.classifier as &dyn SpamModel))
                .ok_or(ClassifierError::ModelNotLoaded(slot)),
            ModelSlot::LightGbm => match (&self.features, &self.lightgbm) {
                (Some(features), Some(model)) => Ok((features, model as &dyn SpamModel)),
                _ => Err(ClassifierError::ModelNotLoaded(slot)),
            },
        }
    }

    /// Classify raw text; returns the thresholded label and spam probability
    pub fn predict(&self, slot: ModelSlot, text: &str) -> Result<(Label, f64), ClassifierError> {
        let (features, model) = self.slot_parts(slot)?;
        let x = features.transform_one(&normalize(text));
        let probability = model
            .predict_proba(std::slice::from_ref(&x))?
            .first()
            .copied()
            .unwrap_or(0.0);
        Ok((Label::from_probability(probability), probability))
    }

    /// Same as `predict`, with the slot given by identifier
    pub fn predict_named(&self, slot: &str, text: &str) -> Result<(Label, f64), ClassifierError> {
        self.predict(slot.parse()?, text)
    }

    /// Score held-out examples; the trained model is left untouched
    pub fn evaluate(&self, slot: ModelSlot, examples: &[LabeledExample]) -> Result<EvaluationMetrics, ClassifierError> {
        let (features, model) = self.slot_parts(slot)?;
        let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
        let labels: Vec<Label> = examples.iter().map(|e| e.label).collect();
        let probabilities = model.predict_proba(&features.transform(&texts))?;
        Ok(evaluate_predictions(&labels, &probabilities))
    }

    pub fn record_metrics(&mut self, slot: ModelSlot, metrics: EvaluationMetrics) {
        self.metrics.insert(slot, metrics);
    }

    pub fn metrics(&self, slot: ModelSlot) -> Option<&EvaluationMetrics> {
        self.metrics.get(&slot)
    }

    /// Write all four artifacts. Everything is serialized before any file is
    /// touched; files are written under temporary names and renamed together.
    pub fn save(&self, dir: &Path) -> Result<(), ClassifierError> {
        let logreg = self
            .logreg
            .as_ref()
            .ok_or(ClassifierError::ModelNotLoaded(ModelSlot::LogReg))?;
        let (features, lightgbm) = match (&self.features, &self.lightgbm) {
            (Some(f), Some(m)) => (f, m),
            _ => return Err(ClassifierError::ModelNotLoaded(ModelSlot::LightGbm)),
        };

        let payloads = [
            (LOGREG_ARTIFACT, serde_json::to_vec(logreg)?),
            (LIGHTGBM_ARTIFACT, serde_json::to_vec(lightgbm)?),
            (VECTORIZER_ARTIFACT, serde_json::to_vec(features)?),
            (METRICS_ARTIFACT, serde_json::to_vec_pretty(&self.metrics)?),
        ];

        fs::create_dir_all(dir)?;
        let staging_suffix = format!(".{}.tmp", uuid::Uuid::new_v4());
        for (name, bytes) in &payloads {
            fs::write(dir.join(format!("{}{}", artifact_file(name), staging_suffix)), bytes)?;
        }
        for (name, _) in &payloads {
            let staged = dir.join(format!("{}{}", artifact_file(name), staging_suffix));
            fs::rename(staged, dir.join(artifact_file(name)))?;
        }

        info!("[BANK] saved artifacts to {}", dir.display());
        Ok(())
    }

    /// Load all four artifacts; fails before reading anything if one is absent
    pub fn load(dir: &Path, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        for name in ARTIFACTS {
            if !dir.join(artifact_file(name)).is_file() {
                return Err(ClassifierError::ArtifactMissing(name.to_string()));
            }
        }

        let read = |name: &str| fs::read(dir.join(artifact_file(name)));
        let logreg: LogRegPipeline = serde_json::from_slice(&read(LOGREG_ARTIFACT)?)?;
        let lightgbm: BoostedTrees = serde_json::from_slice(&read(LIGHTGBM_ARTIFACT)?)?;
        let features: FeatureSpace = serde_json::from_slice(&read(VECTORIZER_ARTIFACT)?)?;
        let metrics: BTreeMap<ModelSlot, EvaluationMetrics> =
            serde_json::from_slice(&read(METRICS_ARTIFACT)?)?;

        info!("[BANK] loaded artifacts from {}", dir.display());
        Ok(Self {
            config,
            logreg: Some(logreg),
            lightgbm: Some(lightgbm),
            features: Some(features),
            metrics,
        })
    }
}
