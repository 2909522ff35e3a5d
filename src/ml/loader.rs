// ============================================================
// Layer 5 — Model Loader and Factory
// ============================================================
// Turns an artifact folder into a ready-to-use EnasModel:
//
//   folder ──ArtifactStore──▶ ArchitectureArtifact
//          ──extract──────▶ ArchitectureDescriptor
//          ──OpRegistry───▶ EnasNetwork (fresh parameters)
//          ──weights?─────▶ EnasNetwork (stored parameters)
//          ──options──────▶ EnasModel
//
// `create` is the factory entry point used by the rest of the
// toolkit: it checks the model name and forwards the base
// image-model options.

use std::path::PathBuf;

use burn::prelude::*;

use crate::application::model_config::ModelConfig;
use crate::domain::architecture::ArchitectureDescriptor;
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::traits::ArchitectureSource;
use crate::infra::artifact::ArtifactStore;
use crate::ml::model::{EnasModel, EnasNetwork, ImageModelOptions};
use crate::ml::registry::OpRegistry;

const AVAILABLE_MODELS: [&str; 1] = ["enas"];

pub fn available_models() -> &'static [&'static str] {
    &AVAILABLE_MODELS
}

/// Build a model from a configuration bag.
pub fn create<B: Backend>(
    config:   &ModelConfig,
    registry: &OpRegistry,
    device:   &B::Device,
) -> ModelResult<EnasModel<B>> {
    if !AVAILABLE_MODELS.contains(&config.name.as_str()) {
        return Err(ModelError::UnknownModel {
            name:      config.name.clone(),
            available: AVAILABLE_MODELS.to_vec(),
        });
    }
    let folder = config.folder_path.as_deref().ok_or_else(|| {
        ModelError::InvalidConfig(format!("'{}' needs a folder_path", config.name))
    })?;

    ModelLoader::new(registry).load_folder(folder, &config.name, &config.options, device)
}

pub struct ModelLoader<'r> {
    registry: &'r OpRegistry,
}

impl<'r> ModelLoader<'r> {
    pub fn new(registry: &'r OpRegistry) -> Self {
        Self { registry }
    }

    pub fn descriptor(&self, source: &impl ArchitectureSource) -> ModelResult<ArchitectureDescriptor> {
        let artifact = source.load_architecture()?;
        ArchitectureDescriptor::extract(&artifact)
    }

    /// Model with freshly initialised parameters.
    pub fn build<B: Backend>(
        &self,
        source:  &impl ArchitectureSource,
        name:    &str,
        options: &ImageModelOptions,
        device:  &B::Device,
    ) -> ModelResult<EnasModel<B>> {
        let descriptor = self.descriptor(source)?;
        let network    = EnasNetwork::init(&descriptor, self.registry, device)?;
        EnasModel::new(name, descriptor, network, options)
    }

    /// Model from an artifact folder, with stored weights when present
    /// and `options.load_weights` is set.
    pub fn load_folder<B: Backend>(
        &self,
        folder:  impl Into<PathBuf>,
        name:    &str,
        options: &ImageModelOptions,
        device:  &B::Device,
    ) -> ModelResult<EnasModel<B>> {
        let store      = ArtifactStore::new(folder);
        let descriptor = self.descriptor(&store)?;
        let mut network = EnasNetwork::init(&descriptor, self.registry, device)?;

        if options.load_weights {
            if store.has_weights() {
                network = store.load_weights(network, device)?;
            } else {
                tracing::warn!(
                    "No weights in '{}', using random initialisation",
                    store.dir().display()
                );
            }
        }

        tracing::info!(
            "Built '{}': {} layers, pooling at {:?}",
            name,
            descriptor.num_layers(),
            descriptor.pool_layer_indices()
        );
        EnasModel::new(name, descriptor, network, options)
    }

    /// Write the architecture and freshly initialised weights to `store`.
    /// Every operation is resolved before anything is written.
    pub fn export<B: Backend>(
        &self,
        descriptor: &ArchitectureDescriptor,
        store:      &ArtifactStore,
        device:     &B::Device,
    ) -> ModelResult<EnasNetwork<B>> {
        let network = EnasNetwork::init(descriptor, self.registry, device)?;
        store.save_architecture(descriptor)?;
        store.save_weights(&network)?;
        Ok(network)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::architecture::{ArchitectureArtifact, LayerSpec};
    use crate::domain::sampler::{ArchitectureSampler, SamplerConfig};
    use crate::ml::model::ImageClassifier;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn descriptor() -> ArchitectureDescriptor {
        let cfg = SamplerConfig {
            num_layers:  4,
            out_filters: 6,
            num_classes: 3,
            ..SamplerConfig::default()
        };
        ArchitectureSampler::new(Some(5)).sample(&cfg).unwrap()
    }

    fn config(folder: &std::path::Path) -> ModelConfig {
        ModelConfig {
            folder_path: Some(folder.display().to_string()),
            ..ModelConfig::default()
        }
    }

    // In-memory artifact, for checking extraction failures.
    struct Fixture(ArchitectureArtifact);

    impl ArchitectureSource for Fixture {
        fn load_architecture(&self) -> ModelResult<ArchitectureArtifact> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_create_from_exported_folder() {
        let tmp      = tempfile::tempdir().unwrap();
        let store    = ArtifactStore::create(tmp.path()).unwrap();
        let registry = OpRegistry::enas_macro();
        let device   = Default::default();
        let exported = ModelLoader::new(&registry)
            .export::<TestBackend>(&descriptor(), &store, &device)
            .unwrap();

        let model = create::<TestBackend>(&config(tmp.path()), &registry, &device).unwrap();
        assert_eq!(model.name(), "enas");
        assert_eq!(model.num_params(), exported.num_params());

        let x = Tensor::<TestBackend, 4>::random([2, 3, 8, 8], Distribution::Default, &device);
        assert_eq!(model.forward(x).dims(), [2, 3]);
        exported
            .dense
            .weight
            .val()
            .into_data()
            .assert_approx_eq(&model.network().dense.weight.val().into_data(), 3);
    }

    #[test]
    fn test_weights_from_a_narrower_architecture_are_rejected() {
        let tmp      = tempfile::tempdir().unwrap();
        let store    = ArtifactStore::create(tmp.path()).unwrap();
        let registry = OpRegistry::enas_macro();
        let device   = Default::default();
        ModelLoader::new(&registry)
            .export::<TestBackend>(&descriptor(), &store, &device)
            .unwrap();

        // Same sampled structure, wider layers.
        let cfg = SamplerConfig {
            num_layers:  4,
            out_filters: 8,
            num_classes: 3,
            ..SamplerConfig::default()
        };
        let wider = ArchitectureSampler::new(Some(5)).sample(&cfg).unwrap();
        store.save_architecture(&wider).unwrap();

        let result = create::<TestBackend>(&config(tmp.path()), &registry, &device);
        assert!(matches!(result, Err(ModelError::Deserialization { .. })));
    }

    #[test]
    fn test_unknown_model_name() {
        let registry = OpRegistry::enas_macro();
        let cfg = ModelConfig { name: "darts".to_string(), ..ModelConfig::default() };
        let err = create::<TestBackend>(&cfg, &registry, &Default::default()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownModel { .. }));
    }

    #[test]
    fn test_folder_path_required() {
        let registry = OpRegistry::enas_macro();
        let err = create::<TestBackend>(&ModelConfig::default(), &registry, &Default::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_artifact() {
        let tmp      = tempfile::tempdir().unwrap();
        let registry = OpRegistry::enas_macro();
        let err = create::<TestBackend>(&config(tmp.path()), &registry, &Default::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_architecture_without_weights_still_loads() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store.save_architecture(&descriptor()).unwrap();

        let registry = OpRegistry::enas_macro();
        let model = create::<TestBackend>(&config(tmp.path()), &registry, &Default::default());
        assert!(model.is_ok());
    }

    #[test]
    fn test_missing_pool_layers_builds_nothing() {
        let mut artifact = ArchitectureArtifact::from(&descriptor());
        artifact.pool_layers = None;

        let registry = OpRegistry::enas_macro();
        let result = ModelLoader::new(&registry).build::<TestBackend>(
            &Fixture(artifact),
            "enas",
            &ImageModelOptions::default(),
            &Default::default(),
        );
        assert!(matches!(result, Err(ModelError::MissingAttribute("pool_layers"))));
    }

    #[test]
    fn test_unknown_operation_in_artifact() {
        let mut artifact = ArchitectureArtifact::from(&descriptor());
        if let Some(layers) = artifact.layers.as_mut() {
            layers[0] = LayerSpec::new("zeroize", vec![]);
        }

        let registry = OpRegistry::enas_macro();
        let result = ModelLoader::new(&registry).build::<TestBackend>(
            &Fixture(artifact),
            "enas",
            &ImageModelOptions::default(),
            &Default::default(),
        );
        assert!(matches!(result, Err(ModelError::UnknownOperation(_))));
    }

    #[test]
    fn test_export_writes_nothing_for_unresolvable_ops() {
        let tmp      = tempfile::tempdir().unwrap();
        let store    = ArtifactStore::new(tmp.path());
        let registry = OpRegistry::empty();
        let result = ModelLoader::new(&registry).export::<TestBackend>(
            &descriptor(),
            &store,
            &Default::default(),
        );
        assert!(result.is_err());
        assert!(!store.architecture_path().exists());
    }
}
