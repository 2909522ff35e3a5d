// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Disk I/O that the model layer should not know about:
//
//   artifact.rs — the artifact folder
//                 enas_macro.json holds the architecture,
//                 enas_macro.mpk    the weights, written with
//                 Burn's CompactRecorder.
//
// Reference: Rust Book §9 (Error Handling)
//            Burn Book §5 (Records)

/// Architecture and weight persistence for one artifact folder
pub mod artifact;
