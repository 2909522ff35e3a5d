// ============================================================
// Layer 5 — Inferencer
// ============================================================
// The only place that picks a concrete burn backend. Everything
// above this file (application, CLI) stays backend-agnostic and
// works with plain Rust values.
use anyhow::{Context, Result};
use burn::{prelude::*, tensor::Distribution};

use crate::application::model_config::ModelConfig;
use crate::domain::architecture::ArchitectureDescriptor;
use crate::infra::artifact::ArtifactStore;
use crate::ml::loader::{create, ModelLoader};
use crate::ml::model::{EnasModel, ImageClassifier};
use crate::ml::registry::OpRegistry;

type InferBackend = burn::backend::Wgpu;

/// One prediction: class id and its softmax probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class:      i64,
    pub confidence: f32,
}

pub struct Inferencer {
    model:  EnasModel<InferBackend>,
    device: burn::backend::wgpu::WgpuDevice,
}

impl Inferencer {
    pub fn from_config(cfg: &ModelConfig, registry: &OpRegistry) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        let model = create::<InferBackend>(cfg, registry, &device)
            .with_context(|| format!("Cannot build model '{}'", cfg.name))?;
        Ok(Self { model, device })
    }

    pub fn summary(&self) -> String {
        self.model.summary()
    }

    /// Classify a batch of uniform-noise images of the given size.
    /// Exercises the full forward path without a dataset.
    pub fn predict_random(
        &self,
        batch_size: usize,
        height:     usize,
        width:      usize,
        seed:       u64,
    ) -> Result<Vec<Prediction>> {
        InferBackend::seed(seed);
        let channels = self.model.descriptor().in_channels();
        let images = Tensor::<InferBackend, 4>::random(
            [batch_size, channels, height, width],
            Distribution::Uniform(0.0, 1.0),
            &self.device,
        );

        let logits = self.model.try_forward(images)?;
        let probs  = burn::tensor::activation::softmax(logits, 1);

        let classes: Vec<i64> = probs
            .clone()
            .argmax(1)
            .flatten::<1>(0, 1)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("Reading predictions: {e:?}"))?;
        let confidences: Vec<f32> = probs
            .max_dim(1)
            .flatten::<1>(0, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Reading confidences: {e:?}"))?;

        tracing::debug!("Predicted {} images", classes.len());
        Ok(classes
            .into_iter()
            .zip(confidences)
            .map(|(class, confidence)| Prediction { class, confidence })
            .collect())
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }
}

/// Resolve, initialise and write a new artifact folder.
/// Returns the number of parameters of the written network.
pub fn export_artifact(
    descriptor: &ArchitectureDescriptor,
    store:      &ArtifactStore,
    registry:   &OpRegistry,
) -> Result<usize> {
    let device  = burn::backend::wgpu::WgpuDevice::default();
    let network = ModelLoader::new(registry)
        .export::<InferBackend>(descriptor, store, &device)
        .with_context(|| format!("Cannot export artifact to '{}'", store.dir().display()))?;
    Ok(network.num_params())
}
