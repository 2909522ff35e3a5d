// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Loads a model through the factory and either describes it
// (`summary`) or runs it (`predict`). Construction does all the
// I/O; the calls after that only run the network.

use anyhow::Result;

use crate::application::model_config::ModelConfig;
use crate::ml::inferencer::{Inferencer, Prediction};
use crate::ml::registry::OpRegistry;

pub struct InspectUseCase {
    config:     ModelConfig,
    inferencer: Inferencer,
}

impl InspectUseCase {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let registry   = OpRegistry::enas_macro();
        let inferencer = Inferencer::from_config(&config, &registry)?;
        Ok(Self { config, inferencer })
    }

    pub fn summary(&self) -> String {
        let folder = self.config.folder_path.as_deref().unwrap_or("-");
        format!("folder:      {}\n{}", folder, self.inferencer.summary())
    }

    pub fn predict(
        &self,
        batch_size: usize,
        height:     usize,
        width:      usize,
        seed:       u64,
    ) -> Result<Vec<Prediction>> {
        let predictions = self.inferencer.predict_random(batch_size, height, width, seed)?;
        tracing::info!(
            "Classified {} images into {} classes",
            predictions.len(),
            self.inferencer.num_classes()
        );
        Ok(predictions)
    }
}
