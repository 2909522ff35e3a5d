// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// Layers 1-3 never import burn; infra only touches its recorder.
//
// What's in this layer:
//
//   graph.rs      — The layer-graph forward algorithm
//                   Generic over the block types, so it runs on
//                   plain numbers in tests and on tensors here:
//                   • stem, then one entry per layer in a history
//                   • each layer reads the whole history (skips)
//                   • at a checkpoint every history entry is reduced
//
//   ops.rs        — Candidate operations as burn modules
//                   conv / separable conv / pooling branches,
//                   the skip-summing layer wrapper, and the
//                   spatial reductions (factorized, max, avg)
//
//   registry.rs   — Operation name → builder lookup
//
//   features.rs   — FeatureExtractor: owns the modules, runs graph.rs
//
//   model.rs      — Classifier head, normalisation, ImageClassifier
//
//   loader.rs     — The model factory: name + folder → EnasModel
//
//   inferencer.rs — Picks the concrete backend for the CLI
//
// Reference: Burn Book §3 (Building Blocks)
//            Pham et al. (2018) Efficient Neural Architecture Search

/// Backend-free forward algorithm over stem, layers and checkpoints
pub mod graph;

/// Candidate operations and reductions as burn modules
pub mod ops;

/// Lookup from architecture operation names to module builders
pub mod registry;

/// Owned feature extractor running the layer graph on tensors
pub mod features;

/// Image classifier built on the searched feature extractor
pub mod model;

/// Factory turning a ModelConfig into a ready model
pub mod loader;

/// Backend selection and random-batch prediction
pub mod inferencer;
