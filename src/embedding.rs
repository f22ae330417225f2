use candle_core::Tensor;

use crate::{
    error::{Error, Result},
    model_manager::ModelManager,
};

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for identical input, since index
/// rebuilds rely on unchanged records reproducing their vectors.
pub trait Embedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

impl Embedder for ModelManager {
    /// Mean-pools ColBERT token embeddings into one unit-length vector.
    ///
    /// Texts are encoded one at a time: padding inside a batch would shift
    /// the pooled vector of shorter texts.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let tokens = self.encode(&[text.to_string()])?;
        let pooled = tokens
            .mean(1)
            .and_then(|t| t.squeeze(0))
            .map_err(map_candle_err)?;
        let mut vector = tensor_to_flat_f32(&pooled)?;
        normalize(&mut vector);
        Ok(vector)
    }
}

/// Scale `vector` to unit length. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

fn tensor_to_flat_f32(tensor: &Tensor) -> Result<Vec<f32>> {
    tensor
        .flatten_all()
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(map_candle_err)
}

fn map_candle_err(e: candle_core::Error) -> Error {
    Error::Collaborator(format!("tensor computation error: {e}"))
}
