// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Produces a complete artifact folder, standing in for the NAS
// search that would normally hand us one:
//
//   Step 1: Sample an architecture     (Layer 3 - domain)
//   Step 2: Resolve + initialise it    (Layer 5 - ml)
//   Step 3: Write architecture/weights (Layer 6 - infra)
//   Step 4: Write model_config.json    (Layer 2 - config)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::model_config::{ModelConfig, CONFIG_FILE};
use crate::domain::architecture::ArchitectureDescriptor;
use crate::domain::sampler::{ArchitectureSampler, SamplerConfig};
use crate::infra::artifact::ArtifactStore;
use crate::ml::inferencer::export_artifact;
use crate::ml::model::ImageModelOptions;
use crate::ml::registry::OpRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub folder_path: String,
    pub sampler:     SamplerConfig,
    pub seed:        Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            folder_path: "data/enas".to_string(),
            sampler:     SamplerConfig::default(),
            seed:        None,
        }
    }
}

/// What was written, for the CLI to report.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub folder_path: String,
    pub num_layers:  usize,
    pub pool_layers: Vec<usize>,
    pub num_params:  usize,
}

pub struct GenerateUseCase {
    config:   GenerateConfig,
    registry: OpRegistry,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config, registry: OpRegistry::enas_macro() }
    }

    pub fn execute(&self) -> Result<GenerateReport> {
        let cfg = &self.config;

        // ── Step 1: Sample ────────────────────────────────────────────────────
        let descriptor = ArchitectureSampler::new(cfg.seed)
            .sample(&cfg.sampler)
            .context("Sampled architecture is invalid")?;
        tracing::info!(
            "Sampled {} layers, pooling at {:?}",
            descriptor.num_layers(),
            descriptor.pool_layer_indices()
        );

        // ── Steps 2 + 3: Resolve, initialise, write ───────────────────────────
        let store = ArtifactStore::create(&cfg.folder_path)
            .with_context(|| format!("Cannot create '{}'", cfg.folder_path))?;
        let num_params = export_artifact(&descriptor, &store, &self.registry)?;

        // ── Step 4: Config for `summary` / `predict` ──────────────────────────
        write_model_config(&descriptor, &store)?;

        Ok(GenerateReport {
            folder_path: cfg.folder_path.clone(),
            num_layers:  descriptor.num_layers(),
            pool_layers: descriptor.pool_layer_indices().to_vec(),
            num_params,
        })
    }
}

/// Write `model_config.json` next to the architecture, pointing back at
/// the folder and pinning the class count.
pub fn write_model_config(descriptor: &ArchitectureDescriptor, store: &ArtifactStore) -> Result<ModelConfig> {
    let model_config = ModelConfig {
        folder_path: Some(store.dir().display().to_string()),
        options: ImageModelOptions {
            num_classes: Some(descriptor.num_classes()),
            ..ImageModelOptions::default()
        },
        ..ModelConfig::default()
    };
    model_config.save(store.dir().join(CONFIG_FILE))?;
    Ok(model_config)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::loader::{create, ModelLoader};
    use crate::ml::model::ImageClassifier;
    use burn::backend::NdArray;
    use burn::prelude::*;

    type TestBackend = NdArray;

    fn sampled() -> ArchitectureDescriptor {
        let cfg = SamplerConfig { num_layers: 6, out_filters: 6, num_classes: 4, ..SamplerConfig::default() };
        ArchitectureSampler::new(Some(21)).sample(&cfg).unwrap()
    }

    #[test]
    fn test_written_folder_loads_stored_weights() {
        let tmp        = tempfile::tempdir().unwrap();
        let store      = ArtifactStore::create(tmp.path().join("enas")).unwrap();
        let registry   = OpRegistry::enas_macro();
        let device     = Default::default();
        let descriptor = sampled();

        let exported = ModelLoader::new(&registry)
            .export::<TestBackend>(&descriptor, &store, &device)
            .unwrap();
        write_model_config(&descriptor, &store).unwrap();

        let cfg = ModelConfig::load(store.dir().join(CONFIG_FILE)).unwrap();
        assert!(cfg.options.load_weights);
        assert_eq!(cfg.options.num_classes, Some(4));

        let model = create::<TestBackend>(&cfg, &registry, &device).unwrap();
        assert_eq!(model.num_params(), exported.num_params());
        exported
            .features
            .stem
            .conv
            .weight
            .val()
            .into_data()
            .assert_approx_eq(&model.network().features.stem.conv.weight.val().into_data(), 3);
        exported
            .dense
            .weight
            .val()
            .into_data()
            .assert_approx_eq(&model.network().dense.weight.val().into_data(), 3);

        // Same folder with loading switched off gets fresh parameters.
        let mut random_cfg = cfg.clone();
        random_cfg.options.load_weights = false;
        let random = create::<TestBackend>(&random_cfg, &registry, &device).unwrap();
        let stored: Vec<f32> = model.network().dense.weight.val().into_data().to_vec().unwrap();
        let fresh:  Vec<f32> = random.network().dense.weight.val().into_data().to_vec().unwrap();
        assert_ne!(stored, fresh);
    }

    #[test]
    fn test_written_config_points_at_folder() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(tmp.path()).unwrap();
        let cfg   = write_model_config(&sampled(), &store).unwrap();
        assert_eq!(cfg.folder_path, Some(tmp.path().display().to_string()));
        assert!(store.dir().join(CONFIG_FILE).is_file());
    }
}
