// Dataset Loading
// CSV ingestion, schema validation, preprocessing and processed-data export

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::models::{DatasetRow, Label, LabeledExample};
use crate::services::errors::ClassifierError;
use crate::services::text_processor::normalize;

const LABEL_COLUMNS: [&str; 2] = ["label", "v1"];
const TEXT_COLUMNS: [&str; 2] = ["text", "v2"];

/// A validated row with its normalized text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRow {
    pub label: Label,
    pub text: String,
    pub cleaned_text: String,
}

impl ProcessedRow {
    pub fn to_example(&self) -> LabeledExample {
        LabeledExample::new(self.cleaned_text.clone(), self.label)
    }
}

fn find_column(headers: &csv::ByteRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = String::from_utf8_lossy(h);
        names.iter().any(|n| h.trim().eq_ignore_ascii_case(n))
    })
}

/// Read raw rows from a CSV with a `label,text` or `v1,v2` header.
/// Extra columns are ignored; invalid UTF-8 is replaced.
pub fn load_csv(path: &Path) -> Result<Vec<DatasetRow>, ClassifierError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.byte_headers()?.clone();
    let label_idx = find_column(&headers, &LABEL_COLUMNS).ok_or_else(|| ClassifierError::SchemaViolation {
        row: 0,
        reason: "missing label column (label or v1)".to_string(),
    })?;
    let text_idx = find_column(&headers, &TEXT_COLUMNS).ok_or_else(|| ClassifierError::SchemaViolation {
        row: 0,
        reason: "missing text column (text or v2)".to_string(),
    })?;

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).map(|b| String::from_utf8_lossy(b).into_owned());
        rows.push(DatasetRow {
            label: field(label_idx),
            text: field(text_idx),
        });
    }

    info!("[DATA] loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Reject the first row whose label is not ham/spam or whose text is empty
pub fn validate_rows(rows: &[DatasetRow]) -> Result<Vec<LabeledExample>, ClassifierError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| -> Result<LabeledExample, ClassifierError> {
            let row_no = i + 1;
            let raw_label = row.label.as_deref().unwrap_or("");
            let label = Label::from_dataset(raw_label).ok_or_else(|| ClassifierError::SchemaViolation {
                row: row_no,
                reason: format!("label must be ham or spam, got {:?}", raw_label),
            })?;
            let text = match row.text.as_deref() {
                Some(t) if !t.is_empty() => t,
                _ => {
                    return Err(ClassifierError::SchemaViolation {
                        row: row_no,
                        reason: "text is missing".to_string(),
                    })
                }
            };
            Ok(LabeledExample::new(text, label))
        })
        .collect()
}

/// Normalize every row and drop rows left empty
pub fn preprocess(examples: &[LabeledExample]) -> Vec<ProcessedRow> {
    let processed: Vec<ProcessedRow> = examples
        .iter()
        .map(|e| ProcessedRow {
            label: e.label,
            text: e.text.clone(),
            cleaned_text: normalize(&e.text),
        })
        .filter(|r| !r.cleaned_text.is_empty())
        .collect();

    info!(
        "[DATA] preprocessed {} rows, dropped {} empty after normalization",
        processed.len(),
        examples.len() - processed.len()
    );
    processed
}

pub fn save_processed(path: &Path, rows: &[ProcessedRow]) -> Result<(), ClassifierError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_processed(path: &Path) -> Result<Vec<ProcessedRow>, ClassifierError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: ProcessedRow = row?;
        rows.push(row);
    }
    Ok(rows)
}
