// ============================================================
// Layer 2 — Model Configuration
// ============================================================
// The configuration bag every model factory call receives:
//
//   name         — which model family ("enas")
//   folder_path  — where the architecture artifact lives
//   ...          — everything else is a base image-model option
//                  (normalization, expected class count, whether
//                  to load stored weights) and is flattened into
//                  the same JSON object
//
// Example model_config.json:
//   {
//     "name": "enas",
//     "folder_path": "data/enas",
//     "num_classes": 10,
//     "norm_mean": [0.4914, 0.4822, 0.4465],
//     "norm_std":  [0.2023, 0.1994, 0.2010],
//     "load_weights": true
//   }

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::ml::model::ImageModelOptions;

pub const CONFIG_FILE: &str = "model_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub folder_path: Option<String>,

    #[serde(flatten)]
    pub options: ImageModelOptions,
}

fn default_name() -> String {
    "enas".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name:        default_name(),
            folder_path: None,
            options:     ImageModelOptions::default(),
        }
    }
}

impl ModelConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))?;
        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }
}
