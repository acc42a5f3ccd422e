// Train/Eval Harness
// Deterministic split, fitting and scoring of both classifier slots

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

use crate::models::{EvaluationReport, LabeledExample, ModelSlot, ReportEntry};
use crate::services::errors::ClassifierError;

use super::bank::ClassifierBank;

/// Shuffle with a fixed seed, then cut a tail of round(n * test_fraction) rows
/// as the test set. Returns (train, test).
pub fn split<T: Clone>(items: &[T], test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut shuffled = items.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let n = shuffled.len();
    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let test = shuffled.split_off(n - n_test.min(n));
    (shuffled, test)
}

pub struct TrainEvalHarness<'a> {
    bank: &'a mut ClassifierBank,
}

impl<'a> TrainEvalHarness<'a> {
    pub fn new(bank: &'a mut ClassifierBank) -> Self {
        Self { bank }
    }

    /// Split, train both slots, score them on the held-out rows and store the metrics
    pub fn run(&mut self, examples: &[LabeledExample]) -> Result<EvaluationReport, ClassifierError> {
        let config = self.bank.config().clone();
        let (train, test) = split(examples, config.test_fraction, config.seed);
        info!("[TRAIN] split rows train={} test={}", train.len(), test.len());

        for slot in ModelSlot::ALL {
            info!("[TRAIN] fitting {}", slot);
            self.bank.train(slot, &train)?;
        }

        for slot in ModelSlot::ALL {
            let metrics = self.bank.evaluate(slot, &test)?;
            info!(
                "[TRAIN] {} accuracy={:.4} f1={:.4} macro_f1={:.4} roc_auc={}",
                slot,
                metrics.accuracy,
                metrics.f1_score,
                metrics.macro_f1,
                metrics
                    .roc_auc
                    .map(|v| format!("{:.4}", v))
                    .unwrap_or_else(|| "n/a".to_string())
            );
            self.bank.record_metrics(slot, metrics);
        }

        self.report().ok_or(ClassifierError::ModelNotLoaded(ModelSlot::LogReg))
    }

    /// Report built from the bank's stored metrics, if both slots have them
    pub fn report(&self) -> Option<EvaluationReport> {
        Some(EvaluationReport {
            logistic_regression: ReportEntry::from(self.bank.metrics(ModelSlot::LogReg)?),
            lightgbm: ReportEntry::from(self.bank.metrics(ModelSlot::LightGbm)?),
        })
    }
}

pub fn write_evaluation_report(path: &Path, report: &EvaluationReport) -> Result<(), ClassifierError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    info!("[TRAIN] evaluation report written to {}", path.display());
    Ok(())
}
