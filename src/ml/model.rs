use burn::{
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::TensorData,
};
use serde::{Deserialize, Serialize};

use crate::domain::architecture::ArchitectureDescriptor;
use crate::domain::error::{ModelError, ModelResult};
use crate::ml::features::FeatureExtractor;
use crate::ml::registry::OpRegistry;

// ─── ImageClassifier ──────────────────────────────────────────────────────────
/// What callers of the factory get back, whatever the architecture.
pub trait ImageClassifier<B: Backend> {
    fn name(&self) -> &str;

    fn num_classes(&self) -> usize;

    /// Number of trainable scalars.
    fn num_params(&self) -> usize;

    /// images: [batch, channels, H, W] → logits: [batch, num_classes]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Most likely class per image: [batch]
    fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 1, Int> {
        // argmax(1) keeps the reduced dim: [batch, 1] → [batch]
        self.forward(images).argmax(1).flatten::<1>(0, 1)
    }
}

// ─── ImageModelOptions ────────────────────────────────────────────────────────
/// Options shared by all image models, whatever their architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageModelOptions {
    /// Expected class count (from the dataset). Checked against the
    /// classifier head of the loaded architecture.
    #[serde(default)]
    pub num_classes: Option<usize>,

    /// Per-channel normalization applied before the stem.
    #[serde(default)]
    pub norm_mean: Option<Vec<f32>>,

    #[serde(default)]
    pub norm_std: Option<Vec<f32>>,

    /// Load stored weights when the artifact folder has them.
    #[serde(default = "default_load_weights")]
    pub load_weights: bool,
}

fn default_load_weights() -> bool {
    true
}

impl Default for ImageModelOptions {
    fn default() -> Self {
        Self {
            num_classes:  None,
            norm_mean:    None,
            norm_std:     None,
            load_weights: true,
        }
    }
}

// ─── Normalizer ───────────────────────────────────────────────────────────────
/// (x - mean) / std per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    mean: Vec<f32>,
    std:  Vec<f32>,
}

impl Normalizer {
    pub fn new(mean: Vec<f32>, std: Vec<f32>, channels: usize) -> ModelResult<Self> {
        if mean.len() != channels || std.len() != channels {
            return Err(ModelError::InvalidConfig(format!(
                "normalization needs {} values per statistic, got mean={} std={}",
                channels,
                mean.len(),
                std.len()
            )));
        }
        if std.iter().any(|&s| s <= 0.0) {
            return Err(ModelError::InvalidConfig("norm_std must be positive".to_string()));
        }
        Ok(Self { mean, std })
    }

    pub fn apply<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let device   = x.device();
        let channels = self.mean.len();
        let mean = Tensor::<B, 1>::from_data(TensorData::new(self.mean.clone(), [channels]), &device)
            .reshape([1, channels, 1, 1]);
        let std = Tensor::<B, 1>::from_data(TensorData::new(self.std.clone(), [channels]), &device)
            .reshape([1, channels, 1, 1]);
        (x - mean) / std
    }
}

// ─── EnasNetwork ──────────────────────────────────────────────────────────────
/// Everything with parameters: searched features plus the
/// classifier head (global average pool → dropout → dense).
#[derive(Module, Debug)]
pub struct EnasNetwork<B: Backend> {
    pub features: FeatureExtractor<B>,
    pub pool:     AdaptiveAvgPool2d,
    pub dropout:  Dropout,
    pub dense:    Linear<B>,
}

impl<B: Backend> EnasNetwork<B> {
    pub fn init(
        descriptor: &ArchitectureDescriptor,
        registry:   &OpRegistry,
        device:     &B::Device,
    ) -> ModelResult<Self> {
        let features = FeatureExtractor::init(descriptor, registry, device)?;
        let pool     = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let dropout  = DropoutConfig::new(descriptor.dropout()).init();
        let dense    = LinearConfig::new(descriptor.out_filters(), descriptor.num_classes()).init(device);
        Ok(Self { features, pool, dropout, dense })
    }

    /// Feature map [batch, C, h, w] → logits [batch, num_classes]
    pub fn classify(&self, feature_map: Tensor<B, 4>) -> Tensor<B, 2> {
        let pooled = self.pool.forward(feature_map).flatten::<2>(1, 3);
        self.dense.forward(self.dropout.forward(pooled))
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        self.classify(self.features.forward(x))
    }
}

// ─── EnasModel ────────────────────────────────────────────────────────────────
/// A searched ENAS architecture presented as an ordinary image
/// classifier: name, architecture, optional input normalization
/// and the network itself.
#[derive(Debug)]
pub struct EnasModel<B: Backend> {
    name:       String,
    descriptor: ArchitectureDescriptor,
    normalizer: Option<Normalizer>,
    network:    EnasNetwork<B>,
}

impl<B: Backend> EnasModel<B> {
    pub fn new(
        name:       impl Into<String>,
        descriptor: ArchitectureDescriptor,
        network:    EnasNetwork<B>,
        options:    &ImageModelOptions,
    ) -> ModelResult<Self> {
        if let Some(expected) = options.num_classes {
            if expected != descriptor.num_classes() {
                return Err(ModelError::InvalidConfig(format!(
                    "dataset has {} classes but the architecture predicts {}",
                    expected,
                    descriptor.num_classes()
                )));
            }
        }

        let normalizer = match (&options.norm_mean, &options.norm_std) {
            (Some(mean), Some(std)) => {
                Some(Normalizer::new(mean.clone(), std.clone(), descriptor.in_channels())?)
            }
            (None, None) => None,
            _ => {
                return Err(ModelError::InvalidConfig(
                    "norm_mean and norm_std must be given together".to_string(),
                ))
            }
        };

        Ok(Self { name: name.into(), descriptor, normalizer, network })
    }

    pub fn descriptor(&self) -> &ArchitectureDescriptor {
        &self.descriptor
    }

    pub fn network(&self) -> &EnasNetwork<B> {
        &self.network
    }

    /// Swap in a network with the same architecture (e.g. loaded weights).
    pub fn with_network(self, network: EnasNetwork<B>) -> Self {
        Self { network, ..self }
    }

    pub fn into_network(self) -> EnasNetwork<B> {
        self.network
    }

    fn preprocess(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.normalizer {
            Some(normalizer) => normalizer.apply(x),
            None             => x,
        }
    }

    /// Final feature map before the classifier head.
    pub fn features(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.network.features.forward(self.preprocess(x))
    }

    /// Checks an input shape against the architecture: channel count,
    /// non-empty batch, and H/W divisible by 2^(pooling checkpoints).
    pub fn check_input(&self, dims: [usize; 4]) -> ModelResult<()> {
        let [batch, channels, height, width] = dims;
        let divisor = self.descriptor.spatial_divisor();
        let ok = batch > 0
            && channels == self.descriptor.in_channels()
            && height >= divisor
            && width >= divisor
            && height % divisor == 0
            && width % divisor == 0;
        if ok {
            return Ok(());
        }
        Err(ModelError::TensorShape {
            expected: format!(
                "[N, {}, H, W] with N > 0 and H, W multiples of {}",
                self.descriptor.in_channels(),
                divisor
            ),
            actual: dims.to_vec(),
        })
    }

    /// `forward` behind a shape check, so an incompatible input is an
    /// error instead of a panic inside the tensor engine.
    pub fn try_forward(&self, x: Tensor<B, 4>) -> ModelResult<Tensor<B, 2>> {
        self.check_input(x.dims())?;
        Ok(self.forward(x))
    }

    pub fn summary(&self) -> String {
        let d = &self.descriptor;
        let mut lines = vec![
            format!("model:       {}", self.name),
            format!("layers:      {}", d.num_layers()),
            format!("pooling at:  {:?}", d.pool_layer_indices()),
            format!("stem:        {} -> {} channels", d.in_channels(), d.out_filters()),
        ];
        for (layer_id, layer) in d.layers().iter().enumerate() {
            lines.push(format!("  layer {layer_id:>2}:  {:<12} skip {:?}", layer.op, layer.skip));
        }
        for (k, reduction) in d.pool_layers().iter().enumerate() {
            lines.push(format!(
                "  pool  {k:>2}:  {:<12} after layer {}",
                reduction.op,
                d.pool_layer_indices()[k]
            ));
        }
        lines.push(format!(
            "classifier:  dropout {:.2} -> dense {} -> {}",
            d.dropout(),
            d.out_filters(),
            d.num_classes()
        ));
        lines.push(format!("normalize:   {}", if self.normalizer.is_some() { "yes" } else { "no" }));
        lines.push(format!("parameters:  {}", self.num_params()));
        lines.join("\n")
    }
}

impl<B: Backend> ImageClassifier<B> for EnasModel<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.descriptor.num_classes()
    }

    fn num_params(&self) -> usize {
        self.network.num_params()
    }

    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.preprocess(images);
        self.network.forward(x)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sampler::{ArchitectureSampler, SamplerConfig};
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn small_descriptor() -> ArchitectureDescriptor {
        let cfg = SamplerConfig {
            num_layers:  6,
            in_channels: 3,
            out_filters: 8,
            num_classes: 5,
            dropout:     0.2,
        };
        ArchitectureSampler::new(Some(3)).sample(&cfg).unwrap()
    }

    fn model(options: &ImageModelOptions) -> ModelResult<EnasModel<TestBackend>> {
        let device     = Default::default();
        let descriptor = small_descriptor();
        let network    = EnasNetwork::init(&descriptor, &OpRegistry::enas_macro(), &device)?;
        EnasModel::new("enas", descriptor, network, options)
    }

    fn images(dims: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(dims, Distribution::Default, &Default::default())
    }

    #[test]
    fn test_logits_shape() {
        let m = model(&ImageModelOptions::default()).unwrap();
        assert_eq!(m.forward(images([3, 3, 8, 8])).dims(), [3, 5]);
        assert_eq!(m.predict(images([3, 3, 8, 8])).dims(), [3]);
        assert_eq!(m.name(), "enas");
        assert_eq!(m.num_classes(), 5);
        assert!(m.num_params() > 0);
    }

    #[test]
    fn test_feature_map_is_downsampled_per_checkpoint() {
        let m = model(&ImageModelOptions::default()).unwrap();
        // six layers → two checkpoints → 16 / 4
        assert_eq!(m.features(images([1, 3, 16, 16])).dims(), [1, 8, 4, 4]);
    }

    #[test]
    fn test_try_forward_rejects_bad_shapes() {
        let m = model(&ImageModelOptions::default()).unwrap();
        assert!(matches!(
            m.try_forward(images([1, 1, 8, 8])),
            Err(ModelError::TensorShape { .. })
        ));
        assert!(matches!(
            m.try_forward(images([1, 3, 6, 6])),
            Err(ModelError::TensorShape { .. })
        ));
        assert!(m.try_forward(images([1, 3, 4, 4])).is_ok());
    }

    #[test]
    fn test_forward_is_bit_identical() {
        let m = model(&ImageModelOptions::default()).unwrap();
        let x = images([2, 3, 8, 8]);
        m.forward(x.clone()).into_data().assert_eq(&m.forward(x).into_data(), true);
    }

    #[test]
    fn test_identity_normalization() {
        let plain = model(&ImageModelOptions::default()).unwrap();
        let options = ImageModelOptions {
            norm_mean: Some(vec![0.0; 3]),
            norm_std:  Some(vec![1.0; 3]),
            ..ImageModelOptions::default()
        };
        let normalized = model(&options).unwrap().with_network(plain.network().clone());
        let x = images([2, 3, 8, 8]);
        plain
            .forward(x.clone())
            .into_data()
            .assert_approx_eq(&normalized.forward(x).into_data(), 5);
    }

    #[test]
    fn test_options_are_checked() {
        let wrong_classes = ImageModelOptions { num_classes: Some(10), ..ImageModelOptions::default() };
        assert!(matches!(model(&wrong_classes), Err(ModelError::InvalidConfig(_))));

        let half_norm = ImageModelOptions { norm_mean: Some(vec![0.5; 3]), ..ImageModelOptions::default() };
        assert!(matches!(model(&half_norm), Err(ModelError::InvalidConfig(_))));

        let wrong_len = ImageModelOptions {
            norm_mean: Some(vec![0.5; 2]),
            norm_std:  Some(vec![0.5; 2]),
            ..ImageModelOptions::default()
        };
        assert!(matches!(model(&wrong_len), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_summary_lists_every_layer() {
        let m       = model(&ImageModelOptions::default()).unwrap();
        let summary = m.summary();
        assert!(summary.contains("model:       enas"));
        assert_eq!(summary.matches("  layer ").count(), 6);
        assert_eq!(summary.matches("  pool  ").count(), 2);
    }
}
