use candle_core::{Device, Tensor};
use pylate_rs::ColBERT;

use crate::error::Result;

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// Manages a ColBERT model lifecycle, supporting lazy loading on first use.
///
/// Both the embedded vector store and the ColBERT ranker own one of these;
/// each is configured with its own model id so the two concerns can run
/// different checkpoints.
pub struct ModelManager {
    model: Option<ColBERT>,
    model_id: String,
}

impl ModelManager {
    /// Creates a `ModelManager` for the given model id (a HuggingFace repo
    /// id or a local path). The model is not loaded until the first call to
    /// `encode_documents` or `encode_query`.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model: None,
            model_id: model_id.into(),
        }
    }

    /// Returns the model id that will be (or has been) loaded.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns `true` if the model has already been loaded into memory.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&mut self) -> Result<&mut ColBERT> {
        if self.model.is_none() {
            let device = default_device();
            let colbert: ColBERT = ColBERT::from(&self.model_id)
                .with_device(device)
                .try_into()?;
            self.model = Some(colbert);
        }

        Ok(self.model.as_mut().unwrap())
    }

    /// Encodes document texts into per-token embeddings.
    ///
    /// Returns a 3D tensor of shape `[B, T, D]` where B is the batch size,
    /// T the (padded) token count, and D the embedding dimension.
    pub fn encode_documents(&mut self, texts: &[String]) -> Result<Tensor> {
        let model = self.ensure_loaded()?;
        Ok(model.encode(texts, false)?)
    }

    /// Encodes a query string into per-token embeddings.
    ///
    /// Returns a 2D tensor of shape `[Q, D]` where Q is the number of query
    /// tokens and D is the embedding dimension.
    pub fn encode_query(&mut self, query: &str) -> Result<Tensor> {
        let model = self.ensure_loaded()?;
        let embeddings = model.encode(&[query.to_string()], true)?;
        // Squeeze the batch dimension: [1, Q, D] -> [Q, D]
        Ok(embeddings.squeeze(0)?)
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("model_id", &self.model_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_loaded_until_first_encode() {
        let manager = ModelManager::new("custom/model");
        assert_eq!(manager.model_id(), "custom/model");
        assert!(!manager.is_loaded());
    }
}
