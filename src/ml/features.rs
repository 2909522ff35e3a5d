use burn::prelude::*;

use crate::domain::architecture::ArchitectureDescriptor;
use crate::domain::error::ModelResult;
use crate::ml::graph::LayerGraph;
use crate::ml::ops::{EnasLayer, ReductionOp, Stem};
use crate::ml::registry::OpRegistry;

/// The searched part of the network: stem, layers and pooling
/// checkpoints. Produces the final feature map; the classifier
/// head lives in `EnasNetwork`.
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    pub pool_layers_idx: Vec<usize>,
    pub stem:            Stem<B>,
    pub layers:          Vec<EnasLayer<B>>,
    pub pool_layers:     Vec<ReductionOp<B>>,
}

impl<B: Backend> FeatureExtractor<B> {
    /// Resolve every operation of the descriptor through `registry`.
    pub fn init(
        descriptor: &ArchitectureDescriptor,
        registry:   &OpRegistry,
        device:     &B::Device,
    ) -> ModelResult<Self> {
        let channels = descriptor.out_filters();
        let stem     = registry.build_stem(descriptor.stem(), device);

        let layers = descriptor
            .layers()
            .iter()
            .map(|spec| registry.build_layer(spec, channels, device))
            .collect::<ModelResult<Vec<_>>>()?;

        let pool_layers = descriptor
            .pool_layers()
            .iter()
            .map(|spec| registry.build_reduction(spec, channels, device))
            .collect::<ModelResult<Vec<_>>>()?;

        let extractor = Self {
            pool_layers_idx: descriptor.pool_layer_indices().to_vec(),
            stem,
            layers,
            pool_layers,
        };
        // `graph()` relies on the checkpoints fitting the layers.
        LayerGraph::new(
            &extractor.pool_layers_idx,
            &extractor.stem,
            &extractor.layers,
            &extractor.pool_layers,
        )?;
        Ok(extractor)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// A borrowed view of the layer graph for one forward pass.
    pub fn graph(&self) -> LayerGraph<'_, Stem<B>, EnasLayer<B>, ReductionOp<B>> {
        LayerGraph::from_parts(&self.pool_layers_idx, &self.stem, &self.layers, &self.pool_layers)
    }

    /// x: [batch, in_channels, H, W] → [batch, out_filters, H / 2^k, W / 2^k]
    /// where k is the number of pooling checkpoints.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.graph().forward(x)
    }

    pub fn forward_with_history(&self, x: Tensor<B, 4>) -> (Tensor<B, 4>, Vec<Tensor<B, 4>>) {
        self.graph().forward_with_history(x)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::architecture::{DenseSpec, LayerSpec, ReductionSpec, StemSpec};
    use crate::domain::error::ModelError;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn descriptor(pool_layer_indices: Vec<usize>) -> ArchitectureDescriptor {
        let layers = vec![
            LayerSpec::new("conv3x3", vec![]),
            LayerSpec::new("sepconv5x5", vec![0]),
            LayerSpec::new("maxpool3x3", vec![0, 1]),
            LayerSpec::new("avgpool3x3", vec![2]),
        ];
        let pool_layers = vec![ReductionSpec::default(); pool_layer_indices.len()];
        ArchitectureDescriptor::new(
            layers.len(),
            pool_layer_indices,
            StemSpec { in_channels: 3, out_filters: 8 },
            layers,
            pool_layers,
            0.0,
            DenseSpec { num_classes: 10 },
        )
        .unwrap()
    }

    #[test]
    fn test_feature_map_shape_follows_checkpoints() {
        let device    = Default::default();
        let extractor =
            FeatureExtractor::<TestBackend>::init(&descriptor(vec![0, 2]), &OpRegistry::enas_macro(), &device)
                .unwrap();
        let x = Tensor::<TestBackend, 4>::random([2, 3, 16, 16], Distribution::Default, &device);
        assert_eq!(extractor.forward(x).dims(), [2, 8, 4, 4]);
    }

    #[test]
    fn test_history_is_pooled_in_lockstep() {
        let device    = Default::default();
        let extractor =
            FeatureExtractor::<TestBackend>::init(&descriptor(vec![1]), &OpRegistry::enas_macro(), &device)
                .unwrap();
        let x = Tensor::<TestBackend, 4>::random([1, 3, 8, 8], Distribution::Default, &device);
        let (out, history) = extractor.forward_with_history(x);

        assert_eq!(history.len(), extractor.num_layers() + 1);
        for entry in &history {
            assert_eq!(entry.dims(), [1, 8, 4, 4]);
        }
        out.into_data().assert_eq(&history[history.len() - 1].clone().into_data(), true);
    }

    #[test]
    fn test_forward_is_deterministic() {
        let device    = Default::default();
        let extractor =
            FeatureExtractor::<TestBackend>::init(&descriptor(vec![0, 2]), &OpRegistry::enas_macro(), &device)
                .unwrap();
        let x = Tensor::<TestBackend, 4>::random([2, 3, 8, 8], Distribution::Default, &device);
        let a = extractor.forward(x.clone()).into_data();
        let b = extractor.forward(x).into_data();
        a.assert_eq(&b, true);
    }

    #[test]
    fn test_unresolvable_operation_builds_nothing() {
        let device = Default::default();
        let result = FeatureExtractor::<TestBackend>::init(&descriptor(vec![]), &OpRegistry::empty(), &device);
        assert!(matches!(result, Err(ModelError::UnknownOperation(_))));
    }
}
