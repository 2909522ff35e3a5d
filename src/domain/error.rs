// ============================================================
// Layer 3 — Model Errors
// ============================================================
// Every failure the model layer can report, as one typed enum.
//
// The CLI and application layers work with anyhow::Result and
// attach context; the layers below them return ModelError so
// callers (and tests) can match on exactly what went wrong.
//
// All variants are fatal for the call that produced them.
// Nothing in this crate retries.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    /// The architecture artifact lacks a required attribute
    #[error("architecture artifact is missing attribute '{0}'")]
    MissingAttribute(&'static str),

    /// The attributes are present but describe an impossible network
    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),

    /// No artifact file at the expected location
    #[error("architecture artifact not found at '{}'", .0.display())]
    ArtifactNotFound(PathBuf),

    /// The artifact exists but cannot be decoded
    #[error("cannot deserialize '{}': {message}", path.display())]
    Deserialization { path: PathBuf, message: String },

    /// The artifact cannot be written
    #[error("cannot serialize '{}': {message}", path.display())]
    Serialization { path: PathBuf, message: String },

    /// An operation name that the registry cannot resolve
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// A model name outside `available_models()`
    #[error("unknown model '{name}', available: {available:?}")]
    UnknownModel { name: String, available: Vec<&'static str> },

    /// Image-model options that contradict the architecture
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Input tensor incompatible with the network
    #[error("tensor shape error: expected {expected}, got {actual:?}")]
    TensorShape { expected: String, actual: Vec<usize> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
