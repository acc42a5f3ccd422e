use crate::models::{Label, ModelSlot};
use crate::services::errors::ClassifierError;

use super::feature_space::FeatureVector;

/// Contract shared by both classifier slots. Implementations map feature
/// vectors to the probability of the spam class.
pub trait SpamModel: Send + Sync {
    /// Fit on vectors produced by one fitted feature space
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<(), ClassifierError>;

    /// Spam-class probabilities in [0, 1]
    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError>;

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<Label>, ClassifierError> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(Label::from_probability)
            .collect())
    }

    fn slot(&self) -> ModelSlot;
}

/// Class-balanced sample weights: n / (2 * n_class)
pub fn balanced_sample_weights(y: &[Label]) -> Vec<f64> {
    let n = y.len() as f64;
    let spam = y.iter().filter(|l| l.is_spam()).count() as f64;
    let ham = n - spam;
    y.iter()
        .map(|l| {
            let count = if l.is_spam() { spam } else { ham };
            n / (2.0 * count)
        })
        .collect()
}
