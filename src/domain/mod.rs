// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain data and contracts. Nothing in here touches burn or the
// filesystem:
//
//   architecture.rs — artifact schema + validated descriptor
//   sampler.rs      — random architectures from the macro space
//   traits.rs       — Transform / HistoryLayer / ArchitectureSource
//   error.rs        — ModelError, the typed failure taxonomy

pub mod architecture;
pub mod error;
pub mod sampler;
pub mod traits;
