// Logistic Regression
// L2-regularized, class-balanced, trained by full-batch gradient descent

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Label, ModelSlot};
use crate::services::errors::ClassifierError;

use super::classifier_trait::{balanced_sample_weights, SpamModel};
use super::feature_space::FeatureVector;

const GRADIENT_TOLERANCE: f64 = 1e-6;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    c: f64,
    max_iter: usize,
    weights: Vec<f64>,
    bias: f64,
    fitted: bool,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize) -> Self {
        Self {
            c,
            max_iter,
            weights: Vec::new(),
            bias: 0.0,
            fitted: false,
        }
    }

    fn decision(&self, x: &FeatureVector) -> f64 {
        x.dot(&self.weights) + self.bias
    }
}

impl SpamModel for LogisticRegression {
    fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> Result<(), ClassifierError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        let n = x.len() as f64;
        let dim = x[0].dimension;
        let sample_weights = balanced_sample_weights(y);
        let max_weight = sample_weights.iter().cloned().fold(0.0, f64::max);
        // averaged objective: mean weighted log-loss + ||w||^2 / (2 C n)
        let reg = 1.0 / (self.c * n);
        // rows are unit-norm, plus the bias input
        let step = 1.0 / (0.5 * max_weight + reg);

        let mut weights = vec![0.0; dim];
        let mut bias = 0.0;
        let mut grad = vec![0.0; dim];
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_bias = 0.0;

            for ((row, label), sw) in x.iter().zip(y).zip(&sample_weights) {
                let p = sigmoid(row.dot(&weights) + bias);
                let target = if label.is_spam() { 1.0 } else { 0.0 };
                let err = sw * (p - target) / n;
                for &(idx, v) in &row.entries {
                    grad[idx as usize] += err * v as f64;
                }
                grad_bias += err;
            }

            let mut max_grad = grad_bias.abs();
            for (g, w) in grad.iter_mut().zip(&weights) {
                *g += reg * w;
                max_grad = max_grad.max(g.abs());
            }

            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= step * g;
            }
            bias -= step * grad_bias;

            if max_grad < GRADIENT_TOLERANCE {
                break;
            }
        }

        debug!("[LOGREG] fitted dim={} rows={} iterations={}", dim, x.len(), iterations);

        self.weights = weights;
        self.bias = bias;
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        if !self.fitted {
            return Err(ClassifierError::ModelNotLoaded(self.slot()));
        }
        Ok(x.iter().map(|row| sigmoid(self.decision(row))).collect())
    }

    fn slot(&self) -> ModelSlot {
        ModelSlot::LogReg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(dimension: usize, entries: &[(u32, f32)]) -> FeatureVector {
        FeatureVector {
            dimension,
            entries: entries.to_vec(),
        }
    }

    #[test]
    fn test_learns_separable_features() {
        let x = vec![
            vec_of(2, &[(0, 1.0)]),
            vec_of(2, &[(0, 1.0)]),
            vec_of(2, &[(1, 1.0)]),
            vec_of(2, &[(1, 1.0)]),
            vec_of(2, &[(1, 1.0)]),
        ];
        let y = vec![Label::Spam, Label::Spam, Label::Ham, Label::Ham, Label::Ham];
        let mut model = LogisticRegression::new(1.0, 1000);
        model.fit(&x, &y).unwrap();

        let probs = model.predict_proba(&[vec_of(2, &[(0, 1.0)]), vec_of(2, &[(1, 1.0)])]).unwrap();
        assert!(probs[0] > 0.5);
        assert!(probs[1] < 0.5);
    }

    #[test]
    fn test_zero_decision_is_spam() {
        let model = LogisticRegression {
            c: 1.0,
            max_iter: 1,
            weights: vec![0.0; 3],
            bias: 0.0,
            fitted: true,
        };
        let x = [vec_of(3, &[(1, 0.7)])];
        let probs = model.predict_proba(&x).unwrap();
        assert_eq!(probs[0], 0.5);
        assert_eq!(model.predict(&x).unwrap(), vec![Label::Spam]);
    }

    #[test]
    fn test_unfitted_model_reports_not_loaded() {
        let model = LogisticRegression::new(1.0, 10);
        assert!(matches!(
            model.predict_proba(&[vec_of(1, &[])]),
            Err(ClassifierError::ModelNotLoaded(ModelSlot::LogReg))
        ));
    }

    #[test]
    fn test_deterministic_fit() {
        let x = vec![vec_of(2, &[(0, 0.6), (1, 0.8)]), vec_of(2, &[(1, 1.0)])];
        let y = vec![Label::Spam, Label::Ham];
        let mut a = LogisticRegression::new(1.0, 200);
        let mut b = LogisticRegression::new(1.0, 200);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }
}
