// Gradient Boosted Trees
// Log-likelihood GBDT over dense copies of the tf-idf rows

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Label, ModelSlot};
use crate::services::errors::ClassifierError;

use super::classifier_trait::{balanced_sample_weights, SpamModel};
use super::feature_space::FeatureVector;

/// Depth cap no tree over a text corpus reaches; trees grow until leaves are pure
pub const UNBOUNDED_DEPTH: u32 = 1024;

const LOSS: &str = "LogLikelyhood";
const TRAINING_OPTIMIZATION_LEVEL: u8 = 2;

#[derive(Serialize, Deserialize)]
pub struct BoostedTrees {
    iterations: usize,
    learning_rate: f32,
    max_depth: u32,
    feature_size: usize,
    model: Option<GBDT>,
}

impl BoostedTrees {
    pub fn new(iterations: usize, learning_rate: f32) -> Self {
        Self {
            iterations,
            learning_rate,
            max_depth: UNBOUNDED_DEPTH,
            feature_size: 0,
            model: None,
        }
    }

    fn to_test_data(&self, x: &[FeatureVector]) -> DataVec {
        x.iter()
            .map(|row| Data::new_test_data(dense_row(row, self.feature_size), None))
            .collect()
    }
}

fn dense_row(row: &FeatureVector, feature_size: usize) -> Vec<ValueType> {
    let mut dense = vec![0.0 as ValueType; feature_size];
    for &(idx, v) in &row.entries {
        if let Some(slot) = dense.get_mut(idx as usize) {
            *slot = v as ValueType;
        }
    }
    dense
}

impl SpamModel for BoostedTrees {
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<(), ClassifierError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        let feature_size = x[0].dimension;
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_shrinkage(self.learning_rate as ValueType);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.iterations);
        config.set_debug(false);
        config.set_training_optimization_level(TRAINING_OPTIMIZATION_LEVEL);
        config.set_loss(LOSS);

        let mut gbdt = GBDT::new(&config);

        // log-likelihood loss expects labels in {-1, 1}
        let weights = balanced_sample_weights(y);
        let mut train_x: DataVec = x
            .iter()
            .zip(y)
            .zip(&weights)
            .map(|((row, label), w)| {
                let target = if label.is_spam() { 1.0 } else { -1.0 };
                Data::new_training_data(dense_row(row, feature_size), *w as ValueType, target, None)
            })
            .collect();

        gbdt.fit(&mut train_x);
        debug!(
            "[GBDT] fitted features={} rows={} trees={}",
            feature_size,
            x.len(),
            self.iterations
        );

        self.feature_size = feature_size;
        self.model = Some(gbdt);
        Ok(())
    }

    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        let model = self
            .model
            .as_ref()
            .ok_or(ClassifierError::ModelNotLoaded(self.slot()))?;
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let predictions = model.predict(&self.to_test_data(x));
        Ok(predictions
            .into_iter()
            .map(|p| {
                let p = p as f64;
                if p.is_nan() {
                    0.5
                } else {
                    p.clamp(0.0, 1.0)
                }
            })
            .collect())
    }

    fn slot(&self) -> ModelSlot {
        ModelSlot::LightGbm
    }
}
