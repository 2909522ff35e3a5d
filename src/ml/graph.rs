// ============================================================
// Layer 5 — Layer Graph Execution
// ============================================================
// The forward pass of a searched macro network:
//
//   history = [stem(x)]
//   for each layer i:
//       history.push(layer_i(history))       ← sees every earlier output
//       if i is a pooling checkpoint k:
//           history = history.map(pool_k)    ← downsample in lockstep
//   return history.last()
//
// Pooling rewrites the *whole* history, not just the newest
// entry, so a later skip connection to any earlier output still
// finds a feature map at the current resolution.
//
// LayerGraph only borrows the stem, layers and pooling layers.
// The parameters stay with the module that owns them
// (FeatureExtractor in production, plain structs in tests) and
// the history is a local Vec, so concurrent forward calls never
// share mutable state.

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::traits::{HistoryLayer, Transform};

#[derive(Debug)]
pub struct LayerGraph<'a, S, L, P> {
    pool_layer_indices: &'a [usize],
    stem:               &'a S,
    layers:             &'a [L],
    pool_layers:        &'a [P],
}

impl<'a, S, L, P> LayerGraph<'a, S, L, P> {
    /// Checks that every checkpoint has a pooling layer, that the
    /// checkpoints are strictly increasing and that each one names
    /// an existing layer.
    pub fn new(
        pool_layer_indices: &'a [usize],
        stem:               &'a S,
        layers:             &'a [L],
        pool_layers:        &'a [P],
    ) -> ModelResult<Self> {
        if pool_layers.len() != pool_layer_indices.len() {
            return Err(ModelError::InvalidArchitecture(format!(
                "{} pool layers for {} pooling checkpoints",
                pool_layers.len(),
                pool_layer_indices.len()
            )));
        }
        let increasing = pool_layer_indices.windows(2).all(|w| w[0] < w[1]);
        let in_range   = pool_layer_indices.iter().all(|&i| i < layers.len());
        if !increasing || !in_range {
            return Err(ModelError::InvalidArchitecture(format!(
                "pooling checkpoints {:?} are not strictly increasing within 0..{}",
                pool_layer_indices,
                layers.len()
            )));
        }
        Ok(Self::from_parts(pool_layer_indices, stem, layers, pool_layers))
    }

    /// For callers that already validated the parts at construction time.
    pub(crate) fn from_parts(
        pool_layer_indices: &'a [usize],
        stem:               &'a S,
        layers:             &'a [L],
        pool_layers:        &'a [P],
    ) -> Self {
        Self { pool_layer_indices, stem, layers, pool_layers }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Position of `layer_id` among the checkpoints, if it is one.
    fn checkpoint(&self, layer_id: usize) -> Option<usize> {
        self.pool_layer_indices.binary_search(&layer_id).ok()
    }

    pub fn forward<T>(&self, x: T) -> T
    where
        T: Clone,
        S: Transform<T>,
        L: HistoryLayer<T>,
        P: Transform<T>,
    {
        self.forward_with_history(x).0
    }

    /// Same as `forward`, also returning the final history.
    pub fn forward_with_history<T>(&self, x: T) -> (T, Vec<T>)
    where
        T: Clone,
        S: Transform<T>,
        L: HistoryLayer<T>,
        P: Transform<T>,
    {
        let mut cur     = self.stem.apply(x);
        let mut history = vec![cur.clone()];

        for (layer_id, layer) in self.layers.iter().enumerate() {
            cur = layer.apply(&history);
            history.push(cur.clone());

            if let Some(k) = self.checkpoint(layer_id) {
                let pool = &self.pool_layers[k];
                // Pool into a fresh Vec, then swap it in.
                let pooled: Vec<T> = history.into_iter().map(|h| pool.apply(h)).collect();
                history = pooled;
                if let Some(last) = history.last() {
                    cur = last.clone();
                }
            }
        }

        (cur, history)
    }
}
