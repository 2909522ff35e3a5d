// ============================================================
// Layer 5 — Operation Registry
// ============================================================
// An artifact names its operations by string ("sepconv5x5",
// "factorized_reduce", ...). The registry turns those names into
// burn modules.
//
// The registry is an ordinary value handed to the loader, so two
// loaders in the same process can resolve names differently and
// tests can register extra ops without touching anything global.

use std::collections::BTreeMap;

use burn::prelude::*;

use crate::domain::architecture::{LayerSpec, ReductionSpec, StemSpec};
use crate::domain::error::{ModelError, ModelResult};
use crate::ml::ops::{
    CandidateOp, ConvBranch, EnasLayer, PoolBranch, PoolKind, ReductionOp, Stem,
};

/// How to build a layer's candidate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOpFactory {
    Conv { kernel: usize, separable: bool },
    Pool { kind: PoolKind, kernel: usize },
}

/// How to build a pooling-checkpoint operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionFactory {
    Factorized,
    Pool(PoolKind),
}

#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    layers:     BTreeMap<String, LayerOpFactory>,
    reductions: BTreeMap<String, ReductionFactory>,
}

impl OpRegistry {
    /// A registry that resolves nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The ENAS macro search space.
    pub fn enas_macro() -> Self {
        let mut registry = Self::empty();
        registry
            .register_layer("conv3x3",    LayerOpFactory::Conv { kernel: 3, separable: false })
            .register_layer("sepconv3x3", LayerOpFactory::Conv { kernel: 3, separable: true })
            .register_layer("conv5x5",    LayerOpFactory::Conv { kernel: 5, separable: false })
            .register_layer("sepconv5x5", LayerOpFactory::Conv { kernel: 5, separable: true })
            .register_layer("avgpool3x3", LayerOpFactory::Pool { kind: PoolKind::Avg, kernel: 3 })
            .register_layer("maxpool3x3", LayerOpFactory::Pool { kind: PoolKind::Max, kernel: 3 })
            .register_reduction("factorized_reduce", ReductionFactory::Factorized)
            .register_reduction("maxpool2x2", ReductionFactory::Pool(PoolKind::Max))
            .register_reduction("avgpool2x2", ReductionFactory::Pool(PoolKind::Avg));
        registry
    }

    pub fn register_layer(&mut self, name: impl Into<String>, factory: LayerOpFactory) -> &mut Self {
        self.layers.insert(name.into(), factory);
        self
    }

    pub fn register_reduction(
        &mut self,
        name:    impl Into<String>,
        factory: ReductionFactory,
    ) -> &mut Self {
        self.reductions.insert(name.into(), factory);
        self
    }

    pub fn layer_op(&self, name: &str) -> ModelResult<LayerOpFactory> {
        self.layers
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownOperation(name.to_string()))
    }

    pub fn reduction_op(&self, name: &str) -> ModelResult<ReductionFactory> {
        self.reductions
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownOperation(name.to_string()))
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn reduction_names(&self) -> impl Iterator<Item = &str> {
        self.reductions.keys().map(String::as_str)
    }

    pub fn build_stem<B: Backend>(&self, spec: &StemSpec, device: &B::Device) -> Stem<B> {
        Stem::new(spec.in_channels, spec.out_filters, device)
    }

    pub fn build_layer<B: Backend>(
        &self,
        spec:     &LayerSpec,
        channels: usize,
        device:   &B::Device,
    ) -> ModelResult<EnasLayer<B>> {
        let op = match self.layer_op(&spec.op)? {
            LayerOpFactory::Conv { kernel, separable } => {
                check_kernel(&spec.op, kernel)?;
                CandidateOp::conv(ConvBranch::new(channels, kernel, separable, device))
            }
            LayerOpFactory::Pool { kind, kernel } => {
                check_kernel(&spec.op, kernel)?;
                CandidateOp::pool(PoolBranch::new(channels, kind, kernel, device))
            }
        };
        Ok(EnasLayer::new(op, spec.skip.clone(), channels, device))
    }

    pub fn build_reduction<B: Backend>(
        &self,
        spec:     &ReductionSpec,
        channels: usize,
        device:   &B::Device,
    ) -> ModelResult<ReductionOp<B>> {
        match self.reduction_op(&spec.op)? {
            ReductionFactory::Factorized => {
                if channels % 2 != 0 {
                    return Err(ModelError::InvalidArchitecture(format!(
                        "'{}' needs an even channel count, got {}",
                        spec.op, channels
                    )));
                }
                Ok(ReductionOp::factorized(channels, device))
            }
            ReductionFactory::Pool(kind) => Ok(ReductionOp::pool(kind)),
        }
    }
}

// Same padding only keeps the resolution for odd kernels.
fn check_kernel(name: &str, kernel: usize) -> ModelResult<()> {
    if kernel % 2 == 0 {
        return Err(ModelError::InvalidArchitecture(format!(
            "'{name}' uses an even kernel size {kernel}"
        )));
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sampler::ENAS_MACRO_OPS;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_macro_space_is_fully_registered() {
        let registry = OpRegistry::enas_macro();
        for name in ENAS_MACRO_OPS {
            assert!(registry.layer_op(name).is_ok(), "missing {name}");
        }
        assert!(registry.reduction_op("factorized_reduce").is_ok());
    }

    #[test]
    fn test_unknown_operation() {
        let registry = OpRegistry::enas_macro();
        let device   = Default::default();
        let spec     = LayerSpec::new("dilconv3x3", vec![]);
        let err = registry.build_layer::<TestBackend>(&spec, 4, &device).unwrap_err();
        assert!(matches!(err, ModelError::UnknownOperation(name) if name == "dilconv3x3"));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = OpRegistry::empty();
        registry.register_layer("conv7x7", LayerOpFactory::Conv { kernel: 7, separable: false });
        let device = Default::default();
        let spec   = LayerSpec::new("conv7x7", vec![]);
        assert!(registry.build_layer::<TestBackend>(&spec, 4, &device).is_ok());
        assert_eq!(registry.layer_names().collect::<Vec<_>>(), vec!["conv7x7"]);
    }

    #[test]
    fn test_even_kernel_rejected() {
        let mut registry = OpRegistry::empty();
        registry.register_layer("conv4x4", LayerOpFactory::Conv { kernel: 4, separable: false });
        let device = Default::default();
        let spec   = LayerSpec::new("conv4x4", vec![]);
        assert!(registry.build_layer::<TestBackend>(&spec, 4, &device).is_err());
    }

    #[test]
    fn test_factorized_reduce_needs_even_channels() {
        let registry = OpRegistry::enas_macro();
        let device   = Default::default();
        let spec     = ReductionSpec::default();
        assert!(registry.build_reduction::<TestBackend>(&spec, 5, &device).is_err());
        assert!(registry.build_reduction::<TestBackend>(&spec, 6, &device).is_ok());

        // Plain pooling has no such constraint.
        let pool = ReductionSpec { op: "maxpool2x2".to_string() };
        assert!(registry.build_reduction::<TestBackend>(&pool, 5, &device).is_ok());
    }
}
