// Evaluation metrics
// Accuracy, F1, macro-F1, ROC-AUC, per-class report and confusion matrix

use crate::models::{ClassMetrics, ClassificationReport, EvaluationMetrics, Label};

fn safe_div(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn class_metrics(tp: usize, fp: usize, fn_: usize, support: usize) -> ClassMetrics {
    let precision = safe_div(tp as f64, (tp + fp) as f64);
    let recall = safe_div(tp as f64, (tp + fn_) as f64);
    let f1_score = safe_div(2.0 * precision * recall, precision + recall);
    ClassMetrics {
        precision,
        recall,
        f1_score,
        support,
    }
}

/// Build the 2x2 confusion matrix [[TN, FP], [FN, TP]]
pub fn confusion_matrix(y_true: &[Label], y_pred: &[Label]) -> [[usize; 2]; 2] {
    let mut cm = [[0usize; 2]; 2];
    for (t, p) in y_true.iter().zip(y_pred) {
        cm[t.encoded() as usize][p.encoded() as usize] += 1;
    }
    cm
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
/// None when only one class is present.
pub fn roc_auc(y_true: &[Label], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|l| l.is_spam()).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie group
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(l, _)| l.is_spam())
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// Compute every held-out metric from true labels and spam probabilities
pub fn evaluate_predictions(y_true: &[Label], probabilities: &[f64]) -> EvaluationMetrics {
    let y_pred: Vec<Label> = probabilities.iter().map(|&p| Label::from_probability(p)).collect();
    let cm = confusion_matrix(y_true, &y_pred);
    let [[tn, fp], [fn_, tp]] = cm;
    let total = y_true.len();

    let ham = class_metrics(tn, fn_, fp, tn + fp);
    let spam = class_metrics(tp, fp, fn_, fn_ + tp);

    let macro_avg = ClassMetrics {
        precision: (ham.precision + spam.precision) / 2.0,
        recall: (ham.recall + spam.recall) / 2.0,
        f1_score: (ham.f1_score + spam.f1_score) / 2.0,
        support: total,
    };
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        safe_div(
            f(&ham) * ham.support as f64 + f(&spam) * spam.support as f64,
            total as f64,
        )
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1_score: weighted(|m| m.f1_score),
        support: total,
    };

    EvaluationMetrics {
        accuracy: safe_div((tn + tp) as f64, total as f64),
        f1_score: spam.f1_score,
        macro_f1: macro_avg.f1_score,
        roc_auc: roc_auc(y_true, probabilities),
        classification_report: ClassificationReport {
            ham,
            spam,
            macro_avg,
            weighted_avg,
        },
        confusion_matrix: cm,
    }
}
