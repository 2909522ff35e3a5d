// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The forward pass of a searched network only needs three kinds
// of building block:
//
//   Transform     — one feature map in, one feature map out
//                   (the stem, every pooling checkpoint)
//   HistoryLayer  — the whole history in, one feature map out
//                   (searched layers with skip connections)
//   ArchitectureSource — anything that can hand over an
//                   architecture artifact (a folder on disk,
//                   an in-memory fixture in tests, ...)
//
// The traits are generic over the feature type `T`. Production
// code uses burn tensors; tests use plain numbers so the
// execution order can be checked by hand.

use crate::domain::architecture::ArchitectureArtifact;
use crate::domain::error::ModelResult;

/// A transformation of a single feature map.
pub trait Transform<T> {
    fn apply(&self, x: T) -> T;
}

/// A searched layer: reads every prior output, emits a new one.
///
/// `history[0]` is the stem output and `history.last()` is the
/// output of the previous layer.
pub trait HistoryLayer<T> {
    fn apply(&self, history: &[T]) -> T;
}

/// Any component that can produce an architecture artifact.
pub trait ArchitectureSource {
    fn load_architecture(&self) -> ModelResult<ArchitectureArtifact>;
}
