// Configuration Storage Service
// Handles config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::services::providers::{DEEPSEEK_DEFAULT_MODEL, DEEPSEEK_DEFAULT_URL};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub version: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

/// LLM endpoint settings; `DEEPSEEK_BASE_URL` overrides `base_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

/// Training and feature extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_gbdt_trees")]
    pub gbdt_trees: usize,
    #[serde(default = "default_learning_rate")]
    pub gbdt_learning_rate: f32,
    #[serde(default = "default_logreg_max_iter")]
    pub logreg_max_iter: usize,
    #[serde(default = "default_logreg_c")]
    pub logreg_c: f64,
    #[serde(default)]
    pub model_dir: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            ngram_range: default_ngram_range(),
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            gbdt_trees: default_gbdt_trees(),
            gbdt_learning_rate: default_learning_rate(),
            logreg_max_iter: default_logreg_max_iter(),
            logreg_c: default_logreg_c(),
            model_dir: None,
        }
    }
}

impl ClassifierConfig {
    /// Directory holding the four model artifacts
    pub fn resolved_model_dir(&self) -> PathBuf {
        if let Some(dir) = self.model_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .map(|p| p.join("spamlens").join("models"))
            .unwrap_or_else(|| PathBuf::from("models"))
    }
}

fn default_model() -> String { DEEPSEEK_DEFAULT_MODEL.to_string() }
fn default_base_url() -> String { DEEPSEEK_DEFAULT_URL.to_string() }
fn default_max_features() -> usize { 5000 }
fn default_ngram_range() -> (usize, usize) { (1, 2) }
fn default_seed() -> u64 { 42 }
fn default_test_fraction() -> f64 { 0.2 }
fn default_gbdt_trees() -> usize { 100 }
fn default_learning_rate() -> f32 { 0.1 }
fn default_logreg_max_iter() -> usize { 1000 }
fn default_logreg_c() -> f64 { 1.0 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("spamlens"))
    }

    /// Store at the default location, if the platform has one
    pub fn open_default() -> Option<Self> {
        Self::default_config_dir().map(Self::new)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.trim().to_string());
        self.save(&config)
    }
}
