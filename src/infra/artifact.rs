// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Reads and writes the files that make up one searched model.
//
// Folder layout:
//   <folder_path>/
//     enas_macro.json     ← architecture (ArchitectureArtifact)
//     enas_macro.mpk      ← weights, optional
//
// The architecture is plain JSON so it can be produced by any
// search tool. Weights are written with burn's CompactRecorder:
//   - named MessagePack, half precision
//   - loading fails if any stored parameter shape differs from
//     the network built from the architecture file
//
// Every failure is reported as a ModelError naming the file:
//   - no architecture file      → ArtifactNotFound
//   - unreadable / corrupt file → Deserialization
//   - cannot write              → Serialization / Io

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    module::{ModuleVisitor, ParamId},
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::domain::architecture::{ArchitectureArtifact, ArchitectureDescriptor};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::traits::ArchitectureSource;
use crate::ml::model::EnasNetwork;

pub const ARCHITECTURE_FILE: &str = "enas_macro.json";
pub const WEIGHTS_FILE:      &str = "enas_macro";
const WEIGHTS_EXTENSION:     &str = "mpk";

/// One artifact folder on disk.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Points at `dir` without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Like `new`, creating the folder (and parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> ModelResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn architecture_path(&self) -> PathBuf {
        self.dir.join(ARCHITECTURE_FILE)
    }

    /// Path handed to the recorder; it appends the extension itself.
    fn weights_base(&self) -> PathBuf {
        self.dir.join(WEIGHTS_FILE)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.weights_base().with_extension(WEIGHTS_EXTENSION)
    }

    pub fn has_weights(&self) -> bool {
        self.weights_path().is_file()
    }

    /// Write the architecture as pretty JSON.
    pub fn save_architecture(&self, descriptor: &ArchitectureDescriptor) -> ModelResult<()> {
        let path     = self.architecture_path();
        let artifact = ArchitectureArtifact::from(descriptor);
        let json     = serde_json::to_string_pretty(&artifact).map_err(|e| {
            ModelError::Serialization { path: path.clone(), message: e.to_string() }
        })?;
        fs::write(&path, json)?;
        tracing::debug!("Saved architecture to '{}'", path.display());
        Ok(())
    }

    pub fn save_weights<B: Backend>(&self, network: &EnasNetwork<B>) -> ModelResult<()> {
        let path = self.weights_base();
        CompactRecorder::new()
            .record(network.clone().into_record(), path.clone())
            .map_err(|e| ModelError::Serialization { path: self.weights_path(), message: e.to_string() })?;
        tracing::debug!("Saved weights to '{}'", self.weights_path().display());
        Ok(())
    }

    /// Restore weights into a network built from the same architecture.
    pub fn load_weights<B: Backend>(
        &self,
        network: EnasNetwork<B>,
        device:  &B::Device,
    ) -> ModelResult<EnasNetwork<B>> {
        if !self.has_weights() {
            return Err(ModelError::ArtifactNotFound(self.weights_path()));
        }
        let record = CompactRecorder::new()
            .load(self.weights_base(), device)
            .map_err(|e| ModelError::Deserialization {
                path:    self.weights_path(),
                message: e.to_string(),
            })?;

        // load_record accepts any tensor shape, so compare against the
        // network the architecture file describes.
        let expected = param_shapes(&network);
        let loaded   = network.load_record(record);
        let actual   = param_shapes(&loaded);
        if let Some(message) = shape_mismatch(&expected, &actual) {
            return Err(ModelError::Deserialization { path: self.weights_path(), message });
        }

        tracing::info!("Loaded weights from '{}'", self.weights_path().display());
        Ok(loaded)
    }
}

// ─── Parameter shapes ─────────────────────────────────────────────────────────
/// Collects the dims of every tensor in a module, in visit order.
#[derive(Default)]
struct ParamShapes(Vec<Vec<usize>>);

impl<B: Backend> ModuleVisitor<B> for ParamShapes {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.0.push(tensor.dims().to_vec());
    }

    fn visit_int<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D, Int>) {
        self.0.push(tensor.dims().to_vec());
    }
}

fn param_shapes<B: Backend>(network: &EnasNetwork<B>) -> Vec<Vec<usize>> {
    let mut shapes = ParamShapes::default();
    network.visit(&mut shapes);
    shapes.0
}

fn shape_mismatch(expected: &[Vec<usize>], actual: &[Vec<usize>]) -> Option<String> {
    if expected.len() != actual.len() {
        return Some(format!(
            "weights hold {} tensors, the architecture needs {}",
            actual.len(),
            expected.len()
        ));
    }
    expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .map(|i| {
            format!(
                "tensor {} has shape {:?}, the architecture needs {:?}",
                i, actual[i], expected[i]
            )
        })
}

impl ArchitectureSource for ArtifactStore {
    fn load_architecture(&self) -> ModelResult<ArchitectureArtifact> {
        let path = self.architecture_path();
        if !path.is_file() {
            return Err(ModelError::ArtifactNotFound(path));
        }

        let json = fs::read_to_string(&path)?;
        let artifact = serde_json::from_str(&json).map_err(|e| ModelError::Deserialization {
            path:    path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("Read architecture from '{}'", path.display());
        Ok(artifact)
    }
}
