// Feature Space
// Bounded-vocabulary TF-IDF over unigrams and bigrams

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use crate::services::errors::ClassifierError;

fn token_re() -> &'static Regex {
    // runs of two or more word characters
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"))
}

/// Sparse TF-IDF row; entries are sorted by feature index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub dimension: usize,
    pub entries: Vec<(u32, f32)>,
}

impl FeatureVector {
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|&(idx, v)| weights.get(idx as usize).map(|w| w * v as f64))
            .sum()
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.dimension];
        for &(idx, v) in &self.entries {
            dense[idx as usize] = v;
        }
        dense
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fitted vectorizer. Vocabulary and idf weights are fixed once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpace {
    max_features: usize,
    ngram_range: (usize, usize),
    vocabulary: BTreeMap<String, u32>,
    idf: Vec<f64>,
}

impl FeatureSpace {
    /// Learn vocabulary and idf weights from normalized documents
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        max_features: usize,
        ngram_range: (usize, usize),
    ) -> Result<Self, ClassifierError> {
        let ngram_range = (ngram_range.0.max(1), ngram_range.1.max(ngram_range.0.max(1)));
        let n_docs = documents.len();

        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = extract_terms(doc.as_ref(), ngram_range);
            let mut seen: HashSet<&str> = HashSet::new();
            for term in &terms {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }

        if term_freq.is_empty() {
            return Err(ClassifierError::EmptyVocabulary);
        }

        // keep the most frequent terms, ties by term order
        let mut ranked: Vec<(String, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0);
                ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, t)| (t, idx as u32))
            .collect();

        Ok(Self {
            max_features,
            ngram_range,
            vocabulary,
            idf,
        })
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Vec<FeatureVector> {
        documents.iter().map(|d| self.transform_one(d.as_ref())).collect()
    }

    /// L2-normalized tf-idf row; out-of-vocabulary terms are ignored
    pub fn transform_one(&self, document: &str) -> FeatureVector {
        let mut counts: BTreeMap<u32, f64> = BTreeMap::new();
        for term in extract_terms(document, self.ngram_range) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx as usize]))
            .collect();
        let norm = weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();

        let entries = weighted
            .into_iter()
            .map(|(idx, v)| (idx, if norm > 0.0 { (v / norm) as f32 } else { 0.0 }))
            .collect();

        FeatureVector {
            dimension: self.dimension(),
            entries,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, u32> {
        &self.vocabulary
    }
}

fn extract_terms(document: &str, ngram_range: (usize, usize)) -> Vec<String> {
    let tokens: Vec<&str> = token_re().find_iter(document).map(|m| m.as_str()).collect();
    let mut terms = Vec::new();
    for n in ngram_range.0..=ngram_range.1 {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_builds_unigrams_and_bigrams() {
        let docs = ["win a free prize", "free prize now"];
        let space = FeatureSpace::fit(&docs, 5000, (1, 2)).unwrap();
        let vocab = space.vocabulary();
        assert!(vocab.contains_key("free prize"));
        assert!(vocab.contains_key("win"));
        // single-character tokens are not terms
        assert!(!vocab.contains_key("a"));
        assert_eq!(space.dimension(), vocab.len());
    }

    #[test]
    fn test_vocabulary_is_capped_by_frequency() {
        let docs = ["alpha alpha alpha beta beta gamma"];
        let space = FeatureSpace::fit(&docs, 2, (1, 1)).unwrap();
        let terms: Vec<&String> = space.vocabulary().keys().collect();
        assert_eq!(terms, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_transform_is_l2_normalized_with_fixed_dimension() {
        let docs = ["cheap loans today", "meeting today at noon"];
        let space = FeatureSpace::fit(&docs, 5000, (1, 2)).unwrap();
        let v = space.transform_one("cheap cheap loans unknownword");
        assert_eq!(v.dimension, space.dimension());
        let norm: f32 = v.entries.iter().map(|(_, x)| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(v.entries.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let docs = ["shared rare", "shared other", "shared third"];
        let space = FeatureSpace::fit(&docs, 5000, (1, 1)).unwrap();
        let v = space.transform_one("shared rare");
        let idx_shared = space.vocabulary()["shared"];
        let idx_rare = space.vocabulary()["rare"];
        let get = |i: u32| v.entries.iter().find(|(k, _)| *k == i).map(|(_, x)| *x).unwrap();
        assert!(get(idx_rare) > get(idx_shared));
    }

    #[test]
    fn test_every_column_occurs_in_fitted_rows() {
        let docs = ["win cash now", "cash prize", "see you at lunch", "lunch at noon today"];
        let space = FeatureSpace::fit(&docs, 6, (1, 2)).unwrap();
        let mut seen = vec![false; space.dimension()];
        for row in space.transform(&docs) {
            for (idx, value) in row.entries {
                if value > 0.0 {
                    seen[idx as usize] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_empty_input_vector() {
        let space = FeatureSpace::fit(&["hello world"], 10, (1, 2)).unwrap();
        let v = space.transform_one("");
        assert!(v.is_empty());
        assert_eq!(v.to_dense().len(), space.dimension());
    }

    #[test]
    fn test_empty_vocabulary_is_error() {
        let docs = ["a b c", ""];
        assert!(matches!(
            FeatureSpace::fit(&docs, 10, (1, 2)),
            Err(ClassifierError::EmptyVocabulary)
        ));
    }
}
