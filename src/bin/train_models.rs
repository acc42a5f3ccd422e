use anyhow::Context;
use spamlens_lib::models::{LabeledExample, ModelSlot};
use spamlens_lib::services::classification::{
    load_csv, preprocess, save_processed, validate_rows, write_evaluation_report, ClassifierBank,
    TrainEvalHarness,
};
use spamlens_lib::services::{ClassifierConfig, ConfigStore};
use std::path::PathBuf;
use tracing::info;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn load_classifier_config() -> ClassifierConfig {
    ConfigStore::open_default()
        .and_then(|store| store.load().ok())
        .map(|config| config.classifier)
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1].starts_with("--") {
        eprintln!(
            "Usage:\n  cargo run --bin train_models -- <spam.csv> [--model-dir <dir>] [--processed <csv_path>] [--report <json_path>]\n\nNotes:\n  - The CSV needs a label,text or v1,v2 header; labels must be ham or spam.\n  - Defaults come from the classifier section of the SpamLens config file."
        );
        return Ok(());
    }

    spamlens_lib::init_logging();

    let mut config = load_classifier_config();
    if let Some(dir) = parse_arg_value(&args, "--model-dir") {
        config.model_dir = Some(dir);
    }
    let model_dir = config.resolved_model_dir();
    let data_dir = model_dir
        .parent()
        .map(|p| p.join("data"))
        .unwrap_or_else(|| PathBuf::from("data"));
    let processed_path = parse_arg_value(&args, "--processed")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("processed_spam.csv"));
    let report_path = parse_arg_value(&args, "--report")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("evaluation_report.json"));

    let dataset = PathBuf::from(&args[1]);
    println!("1. Loading {}", dataset.display());
    let rows = load_csv(&dataset).with_context(|| format!("failed to read {}", dataset.display()))?;
    println!("   rows: {}", rows.len());

    println!("2. Validating");
    let validated = validate_rows(&rows)?;
    let spam = validated.iter().filter(|e| e.label.is_spam()).count();
    println!("   ham: {}  spam: {}", validated.len() - spam, spam);

    println!("3. Preprocessing");
    let processed = preprocess(&validated);
    println!("   kept: {}", processed.len());
    save_processed(&processed_path, &processed)?;
    println!("   processed data saved to {}", processed_path.display());

    println!("4. Training and evaluating");
    let examples: Vec<LabeledExample> = processed.iter().map(|r| r.to_example()).collect();
    let mut bank = ClassifierBank::new(config);
    let report = TrainEvalHarness::new(&mut bank).run(&examples)?;

    for slot in ModelSlot::ALL {
        if let Some(m) = bank.metrics(slot) {
            println!("\n   {}:", slot.report_key());
            println!("   - Accuracy: {:.4}", m.accuracy);
            println!("   - F1 Score: {:.4}", m.f1_score);
            println!("   - Macro F1: {:.4}", m.macro_f1);
            match m.roc_auc {
                Some(auc) => println!("   - ROC-AUC: {:.4}", auc),
                None => println!("   - ROC-AUC: n/a (single-class test set)"),
            }
            println!("   - Targets met: {}", if m.meets_targets() { "yes" } else { "no" });
        }
    }

    println!("\n5. Saving models to {}", model_dir.display());
    bank.save(&model_dir)?;

    println!("6. Writing evaluation report");
    write_evaluation_report(&report_path, &report)?;
    println!("   {}", report_path.display());

    info!("[TRAIN] pipeline finished");
    Ok(())
}
