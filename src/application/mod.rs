// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code, no printing.
//
//   model_config.rs     — the configuration bag for the factory
//   generate_use_case.rs — sample + initialise + write an artifact
//   inspect_use_case.rs  — load an artifact, summarise or run it

pub mod model_config;

pub mod generate_use_case;

pub mod inspect_use_case;
