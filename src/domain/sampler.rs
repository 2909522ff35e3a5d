// ============================================================
// Layer 3 — Architecture Sampler
// ============================================================
// Draws a random architecture from the ENAS "macro" search
// space. This is what a NAS search hands us at the end, minus
// the search: every layer picks one of six candidate ops and an
// arbitrary subset of earlier outputs as skip connections.
//
// Pooling checkpoints follow the macro-space convention:
//   pool_distance = num_layers / 3
//   checkpoints   = [pool_distance - 1, 2 * pool_distance - 1]
// so a 12-layer network reduces after layers 3 and 7.
// With fewer than three layers there is no checkpoint at all.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::architecture::{
    ArchitectureDescriptor, DenseSpec, LayerSpec, ReductionSpec, StemSpec,
};
use crate::domain::error::ModelResult;

/// The six candidate operations of the macro search space.
pub const ENAS_MACRO_OPS: [&str; 6] = [
    "conv3x3",
    "sepconv3x3",
    "conv5x5",
    "sepconv5x5",
    "avgpool3x3",
    "maxpool3x3",
];

/// Shape of the network to sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub num_layers:  usize,
    pub in_channels: usize,
    pub out_filters: usize,
    pub num_classes: usize,
    pub dropout:     f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_layers:  12,
            in_channels: 3,
            out_filters: 24,
            num_classes: 10,
            dropout:     0.0,
        }
    }
}

/// Pooling checkpoints of the macro search space.
pub fn macro_pool_indices(num_layers: usize) -> Vec<usize> {
    let pool_distance = num_layers / 3;
    if pool_distance == 0 {
        return Vec::new();
    }
    vec![pool_distance - 1, 2 * pool_distance - 1]
}

pub struct ArchitectureSampler {
    rng: StdRng,
}

impl ArchitectureSampler {
    /// A fixed seed gives a reproducible architecture.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn sample(&mut self, cfg: &SamplerConfig) -> ModelResult<ArchitectureDescriptor> {
        let layers: Vec<LayerSpec> = (0..cfg.num_layers)
            .map(|layer_id| {
                let op = ENAS_MACRO_OPS
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(ENAS_MACRO_OPS[0]);
                // Each earlier output joins the skip sum with probability 1/2.
                let skip = (0..layer_id).filter(|_| self.rng.gen_bool(0.5)).collect();
                LayerSpec::new(op, skip)
            })
            .collect();

        let pool_layer_indices = macro_pool_indices(cfg.num_layers);
        let pool_layers = vec![ReductionSpec::default(); pool_layer_indices.len()];

        tracing::debug!(
            "Sampled {} layers, pooling after {:?}",
            layers.len(),
            pool_layer_indices
        );

        ArchitectureDescriptor::new(
            cfg.num_layers,
            pool_layer_indices,
            StemSpec { in_channels: cfg.in_channels, out_filters: cfg.out_filters },
            layers,
            pool_layers,
            cfg.dropout,
            DenseSpec { num_classes: cfg.num_classes },
        )
    }
}
