//! Label vocabulary configuration.
//!
//! Vocabularies are loaded from the `configs/` directory (one JSON file each).
//! When the directory is absent, the built-in HVAC vocabulary is used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Labels recognized when no vocabulary is configured.
pub const DEFAULT_LABELS: [&str; 6] = ["SAD", "RAD", "EAD", "FAD", "FD", "VCD"];

/// A named set of component labels to look for on drawings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Closed label set. Order decides record order in reports.
    pub labels: Vec<String>,
}

impl VocabularyConfig {
    /// Uppercase every label and reject empty or duplicate entries.
    pub fn normalized(mut self) -> Result<Self> {
        if self.labels.is_empty() {
            anyhow::bail!("Vocabulary '{}' has no labels", self.name);
        }

        let mut seen = HashSet::new();
        for label in self.labels.iter_mut() {
            *label = label.trim().to_uppercase();
            if label.is_empty() {
                anyhow::bail!("Vocabulary '{}' contains an empty label", self.name);
            }
            if !seen.insert(label.clone()) {
                anyhow::bail!("Vocabulary '{}' repeats label '{}'", self.name, label);
            }
        }

        Ok(self)
    }
}

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub config_dir: String,
    pub default_ocr_provider: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            config_dir: env_or("CONFIG_DIR", "configs"),
            default_ocr_provider: env_or("DEFAULT_OCR_PROVIDER", "local"),
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// All loaded vocabularies, keyed by name.
#[derive(Debug)]
pub struct ConfigStore {
    configs: BTreeMap<String, VocabularyConfig>,
    default_config: String,
}

impl ConfigStore {
    /// Load every `*.json` vocabulary in `dir`.
    ///
    /// A missing directory falls back to the built-in vocabulary; a directory
    /// without any config is an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            warn!(
                "Config directory {:?} does not exist, using built-in vocabulary",
                dir
            );
            return Self::from_configs(vec![create_default_config()]);
        }

        let mut configs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {:?}", path))?;

                let config: VocabularyConfig = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse config: {:?}", path))?;

                info!(
                    "Loaded vocabulary: {} ({} labels) from {:?}",
                    config.name,
                    config.labels.len(),
                    path
                );
                configs.push(config);
            }
        }

        if configs.is_empty() {
            anyhow::bail!("No configs found in {:?}", dir);
        }

        Self::from_configs(configs)
    }

    /// Build a store from already-parsed vocabularies.
    pub fn from_configs(configs: Vec<VocabularyConfig>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for config in configs {
            let config = config.normalized()?;
            map.insert(config.name.clone(), config);
        }

        let default_config = if map.contains_key("default") {
            "default".to_string()
        } else {
            map.keys()
                .next()
                .cloned()
                .context("No configs provided")?
        };

        Ok(Self {
            configs: map,
            default_config,
        })
    }

    pub fn get(&self, name: &str) -> Option<&VocabularyConfig> {
        self.configs.get(name)
    }

    pub fn default_name(&self) -> &str {
        &self.default_config
    }

    /// Resolve an optional requested name, falling back to the default vocabulary.
    pub fn resolve(&self, name: Option<&str>) -> Option<&VocabularyConfig> {
        self.get(name.unwrap_or(&self.default_config))
    }

    pub fn list(&self) -> Vec<String> {
        self.configs.keys().cloned().collect()
    }
}

/// The HVAC damper/diffuser vocabulary.
pub fn create_default_config() -> VocabularyConfig {
    VocabularyConfig {
        name: "default".to_string(),
        description: "Supply/return/exhaust/fresh air diffusers and dampers".to_string(),
        labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
    }
}
