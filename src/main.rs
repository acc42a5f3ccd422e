use anyhow::Context;
use spamlens_lib::models::ModelSlot;
use spamlens_lib::services::{
    AnalysisOrchestrator, ClassifierBank, ConfigStore, ProviderClient, DEFAULT_SLOT,
};
use std::sync::Arc;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if let Some(key) = parse_arg_value(&args, "--set-api-key") {
        let store = ConfigStore::open_default().context("no config directory on this platform")?;
        store
            .set_api_key("deepseek", &key)
            .map_err(anyhow::Error::msg)?;
        println!("API key saved to {}", store.config_path().display());
        return Ok(());
    }

    let Some(text) = parse_arg_value(&args, "--text") else {
        eprintln!(
            "Usage:\n  spamlens --text <message> [--model logreg|lightgbm] [--compare] [--model-dir <dir>]\n  spamlens --set-api-key <key>\n\nNotes:\n  - Models are produced by the train_models binary.\n  - DEEPSEEK_API_KEY (or a key saved in the config file) is required for translation and explanations."
        );
        return Ok(());
    };

    spamlens_lib::init_logging();

    let mut config = ConfigStore::open_default()
        .and_then(|store| store.load().ok())
        .map(|c| c.classifier)
        .unwrap_or_default();
    if let Some(dir) = parse_arg_value(&args, "--model-dir") {
        config.model_dir = Some(dir);
    }
    let model_dir = config.resolved_model_dir();
    let bank = ClassifierBank::load(&model_dir, config)
        .with_context(|| format!("no trained models in {}; run train_models first", model_dir.display()))?;

    let client = ProviderClient::from_env().context("LLM client not configured")?;
    let orchestrator = Arc::new(AnalysisOrchestrator::new(bank, Arc::new(client)));

    if has_flag(&args, "--compare") {
        let comparison = orchestrator.compare(&text).await?;
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    let slot = match parse_arg_value(&args, "--model") {
        Some(name) => name.parse::<ModelSlot>()?,
        None => DEFAULT_SLOT,
    };
    let outcome = orchestrator.analyze(&text, slot).await?;
    if let Some(failure) = &outcome.translation_failure {
        eprintln!("warning: translation failed, classified the original text ({})", failure);
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
