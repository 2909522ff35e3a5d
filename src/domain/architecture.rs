// ============================================================
// Layer 3 — Architecture Artifact and Descriptor
// ============================================================
// A NAS search produces an *artifact*: a serialized description
// of the network it found. We read it in two steps:
//
//   1. ArchitectureArtifact — loose, every attribute optional.
//      This is exactly what serde decoded from disk, nothing
//      more. A missing key is a None, not a panic.
//
//   2. ArchitectureDescriptor — strict, every attribute present
//      and checked against the others. Built by `extract`,
//      which fails fast with MissingAttribute / InvalidArchitecture.
//
// Only the descriptor is handed to the ML layer, so nothing
// downstream ever has to ask "is this field there?".
//
// Artifact layout (enas_macro.json):
//
//   {
//     "num_layers": 4,
//     "pool_layers_idx": [0, 2],
//     "stem":   { "in_channels": 3, "out_filters": 24 },
//     "layers": [ { "op": "conv3x3", "skip": [] }, ... ],
//     "pool_layers": [ { "op": "factorized_reduce" }, ... ],
//     "dropout": 0.1,
//     "dense":  { "num_classes": 10 }
//   }

use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};

pub const DEFAULT_REDUCTION: &str = "factorized_reduce";

// ─── Operation specs ──────────────────────────────────────────────────────────

/// Input convolution: 3x3 conv (no bias) + batch norm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemSpec {
    pub in_channels: usize,
    pub out_filters: usize,
}

/// One searched layer: the chosen candidate operation and the
/// earlier history entries that are summed into its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub op: String,

    /// Indices into the history *excluding* its latest entry.
    /// For layer `i` every index must be `< i`.
    #[serde(default)]
    pub skip: Vec<usize>,
}

impl LayerSpec {
    pub fn new(op: impl Into<String>, skip: Vec<usize>) -> Self {
        Self { op: op.into(), skip }
    }
}

/// The transformation applied to the whole history at a pooling checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionSpec {
    #[serde(default = "default_reduction")]
    pub op: String,
}

impl Default for ReductionSpec {
    fn default() -> Self {
        Self { op: default_reduction() }
    }
}

fn default_reduction() -> String {
    DEFAULT_REDUCTION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSpec {
    pub num_classes: usize,
}

// ─── ArchitectureArtifact ─────────────────────────────────────────────────────
/// The artifact as decoded from disk. Every attribute is optional
/// so that a schema mismatch surfaces as a named MissingAttribute
/// error from `ArchitectureDescriptor::extract` instead of an
/// opaque serde message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_layers: Option<usize>,

    #[serde(default, alias = "pool_layer_indices", skip_serializing_if = "Option::is_none")]
    pub pool_layers_idx: Option<Vec<usize>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stem: Option<StemSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_layers: Option<Vec<ReductionSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropout: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dense: Option<DenseSpec>,
}

// ─── ArchitectureDescriptor ───────────────────────────────────────────────────
/// A validated architecture. Construct it with [`ArchitectureDescriptor::extract`]
/// (or [`ArchitectureDescriptor::new`], which runs the same checks).
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureDescriptor {
    num_layers:         usize,
    pool_layer_indices: Vec<usize>,
    stem:               StemSpec,
    layers:             Vec<LayerSpec>,
    pool_layers:        Vec<ReductionSpec>,
    dropout:            f64,
    dense:              DenseSpec,
}

impl ArchitectureDescriptor {
    /// Pull every required attribute out of the artifact and validate
    /// the combination. The artifact itself is left untouched.
    pub fn extract(artifact: &ArchitectureArtifact) -> ModelResult<Self> {
        let num_layers         = require(artifact.num_layers, "num_layers")?;
        let pool_layer_indices = require(artifact.pool_layers_idx.clone(), "pool_layers_idx")?;
        let stem               = require(artifact.stem.clone(), "stem")?;
        let layers             = require(artifact.layers.clone(), "layers")?;
        let pool_layers        = require(artifact.pool_layers.clone(), "pool_layers")?;
        let dropout            = require(artifact.dropout, "dropout")?;
        let dense              = require(artifact.dense.clone(), "dense")?;

        Self::new(num_layers, pool_layer_indices, stem, layers, pool_layers, dropout, dense)
    }

    pub fn new(
        num_layers:         usize,
        pool_layer_indices: Vec<usize>,
        stem:               StemSpec,
        layers:             Vec<LayerSpec>,
        pool_layers:        Vec<ReductionSpec>,
        dropout:            f64,
        dense:              DenseSpec,
    ) -> ModelResult<Self> {
        let descriptor = Self {
            num_layers, pool_layer_indices, stem, layers, pool_layers, dropout, dense,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> ModelResult<()> {
        if self.layers.len() != self.num_layers {
            return Err(invalid(format!(
                "num_layers is {} but {} layers are described",
                self.num_layers,
                self.layers.len()
            )));
        }

        if self.pool_layers.len() != self.pool_layer_indices.len() {
            return Err(invalid(format!(
                "{} pool layers for {} pooling checkpoints",
                self.pool_layers.len(),
                self.pool_layer_indices.len()
            )));
        }

        // Checkpoints are looked up by position, so a repeated or
        // out-of-order index would pick the wrong pooling layer.
        for pair in self.pool_layer_indices.windows(2) {
            if pair[0] >= pair[1] {
                return Err(invalid(format!(
                    "pool_layers_idx must be strictly increasing, got {:?}",
                    self.pool_layer_indices
                )));
            }
        }
        if let Some(&last) = self.pool_layer_indices.last() {
            if last >= self.num_layers {
                return Err(invalid(format!(
                    "pooling checkpoint {} is outside 0..{}",
                    last, self.num_layers
                )));
            }
        }

        for (layer_id, layer) in self.layers.iter().enumerate() {
            for pair in layer.skip.windows(2) {
                if pair[0] >= pair[1] {
                    return Err(invalid(format!(
                        "layer {layer_id}: skip indices must be strictly increasing, got {:?}",
                        layer.skip
                    )));
                }
            }
            if let Some(&last) = layer.skip.last() {
                if last >= layer_id {
                    return Err(invalid(format!(
                        "layer {layer_id}: skip index {last} does not refer to an earlier output"
                    )));
                }
            }
        }

        if self.stem.in_channels == 0 || self.stem.out_filters == 0 {
            return Err(invalid("stem channel counts must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(invalid(format!("dropout {} is outside [0, 1)", self.dropout)));
        }
        if self.dense.num_classes == 0 {
            return Err(invalid("dense.num_classes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn num_layers(&self) -> usize { self.num_layers }

    pub fn pool_layer_indices(&self) -> &[usize] { &self.pool_layer_indices }

    pub fn stem(&self) -> &StemSpec { &self.stem }

    pub fn layers(&self) -> &[LayerSpec] { &self.layers }

    pub fn pool_layers(&self) -> &[ReductionSpec] { &self.pool_layers }

    pub fn dropout(&self) -> f64 { self.dropout }

    pub fn in_channels(&self) -> usize { self.stem.in_channels }

    pub fn out_filters(&self) -> usize { self.stem.out_filters }

    pub fn num_classes(&self) -> usize { self.dense.num_classes }

    /// Every checkpoint halves the spatial resolution, so the input
    /// height and width must be divisible by this.
    pub fn spatial_divisor(&self) -> usize {
        1usize << self.pool_layer_indices.len()
    }
}

impl From<&ArchitectureDescriptor> for ArchitectureArtifact {
    fn from(d: &ArchitectureDescriptor) -> Self {
        ArchitectureArtifact {
            num_layers:      Some(d.num_layers),
            pool_layers_idx: Some(d.pool_layer_indices.clone()),
            stem:            Some(d.stem.clone()),
            layers:          Some(d.layers.clone()),
            pool_layers:     Some(d.pool_layers.clone()),
            dropout:         Some(d.dropout),
            dense:           Some(d.dense.clone()),
        }
    }
}

fn require<T>(value: Option<T>, name: &'static str) -> ModelResult<T> {
    value.ok_or(ModelError::MissingAttribute(name))
}

fn invalid(message: String) -> ModelError {
    ModelError::InvalidArchitecture(message)
}
