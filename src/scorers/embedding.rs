//! Embedding-cosine similarity scoring.
//!
//! Both point lists are batch-encoded (one `encode` call per list, never one
//! per pair) with a shared sentence-embedding model behind the
//! [`TextEmbedder`] trait, then every pair is scored by cosine similarity
//! mapped into `[0, 1]`.
//!
//! The embedder is injected at construction and expected to be loaded once
//! per process; the scorer itself holds no model state beyond the shared
//! handle, so tests substitute a stub embedder.
//!
//! The real model (`all-MiniLM-L6-v2` over ONNX Runtime) lives behind the
//! `onnx` feature.

use std::sync::Arc;

use crate::matrix::SimilarityMatrix;
use crate::scorers::SimilarityScorer;
use crate::{Error, Result};

#[cfg(feature = "onnx")]
use {
    hf_hub::api::sync::Api,
    ndarray::Array2,
    ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor},
    std::sync::Mutex,
    tokenizers::Tokenizer,
};

/// Default sentence-embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// A sentence-embedding backend: the process-wide external collaborator.
///
/// Implementations encode a batch of texts into fixed-length vectors. One
/// instance is constructed by the caller and shared (by `Arc`) across all
/// dataset items.
pub trait TextEmbedder: Send + Sync {
    /// Encode all `texts` into fixed-length vectors, one per input, in order.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identifier for logs and reports.
    fn id(&self) -> &str;
}

/// Cosine similarity of two vectors, mapped into `[0, 1]`.
///
/// Raw cosine lives in `[-1, 1]`; negative values indicate no meaningful
/// similarity for this use and clamp to 0.0. A zero-norm vector scores 0.0.
#[must_use]
pub fn cosine_unit_interval(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Pairwise cosine scorer over an injected embedding backend.
pub struct EmbeddingScorer {
    embedder: Arc<dyn TextEmbedder>,
}

impl EmbeddingScorer {
    /// Create a scorer sharing the given embedder.
    #[must_use]
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }
}

impl SimilarityScorer for EmbeddingScorer {
    fn score_matrix(
        &self,
        reference: &[String],
        hypothesis: &[String],
    ) -> Result<SimilarityMatrix> {
        if reference.is_empty() || hypothesis.is_empty() {
            return Ok(SimilarityMatrix::zeros(reference.len(), hypothesis.len()));
        }

        let ref_vectors = self.embedder.encode(reference)?;
        let hyp_vectors = self.embedder.encode(hypothesis)?;
        if ref_vectors.len() != reference.len() || hyp_vectors.len() != hypothesis.len() {
            return Err(Error::inference(format!(
                "embedder {} returned {}+{} vectors for {}+{} texts",
                self.embedder.id(),
                ref_vectors.len(),
                hyp_vectors.len(),
                reference.len(),
                hypothesis.len(),
            )));
        }

        Ok(SimilarityMatrix::from_fn(
            reference.len(),
            hypothesis.len(),
            |i, j| cosine_unit_interval(&ref_vectors[i], &hyp_vectors[j]),
        ))
    }

    fn name(&self) -> &'static str {
        "embedding"
    }
}

/// MiniLM sentence embedder over ONNX Runtime.
///
/// Downloads the model and tokenizer from HuggingFace on first use, then
/// runs mean-pooled inference locally. Construct once per process.
#[cfg(feature = "onnx")]
pub struct MiniLmEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
}

#[cfg(feature = "onnx")]
impl MiniLmEmbedder {
    /// Load the default model (`all-MiniLM-L6-v2`).
    pub fn default_model() -> Result<Self> {
        Self::new(DEFAULT_EMBEDDING_MODEL)
    }

    /// Load an embedding model by HuggingFace identifier.
    pub fn new(model_name: &str) -> Result<Self> {
        let api = Api::new().map_err(|e| {
            Error::retrieval(format!("Failed to initialize HuggingFace API: {}", e))
        })?;

        let model_path = api
            .model(model_name.to_string())
            .get("model.onnx")
            .or_else(|_| api.model(model_name.to_string()).get("onnx/model.onnx"))
            .map_err(|e| Error::retrieval(format!("Failed to download model.onnx: {}", e)))?;

        let tokenizer_path = api
            .model(model_name.to_string())
            .get("tokenizer.json")
            .map_err(|e| Error::retrieval(format!("Failed to download tokenizer.json: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::retrieval(format!("Failed to load tokenizer: {}", e)))?;

        let session = Session::builder()
            .map_err(|e| Error::retrieval(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::retrieval(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::retrieval(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::retrieval(format!("Failed to load ONNX model: {}", e)))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_name: model_name.to_string(),
        })
    }
}

#[cfg(feature = "onnx")]
impl TextEmbedder for MiniLmEmbedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| Error::parse(format!("Failed to tokenize input: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = texts.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(1)
            .max(1);

        // Pad every sequence to the batch maximum.
        let mut input_ids = vec![0i64; batch * max_len];
        let mut attention_mask = vec![0i64; batch * max_len];
        for (row, encoding) in encodings.iter().enumerate() {
            for (col, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[row * max_len + col] = i64::from(id);
                attention_mask[row * max_len + col] = 1;
            }
        }
        let token_type_ids = vec![0i64; batch * max_len];

        let input_ids_array: Array2<i64> = Array2::from_shape_vec((batch, max_len), input_ids)
            .map_err(|e| Error::inference(format!("Failed to create input_ids array: {}", e)))?;
        let attention_mask_array: Array2<i64> =
            Array2::from_shape_vec((batch, max_len), attention_mask.clone()).map_err(|e| {
                Error::inference(format!("Failed to create attention_mask array: {}", e))
            })?;
        let token_type_ids_array: Array2<i64> =
            Array2::from_shape_vec((batch, max_len), token_type_ids).map_err(|e| {
                Error::inference(format!("Failed to create token_type_ids array: {}", e))
            })?;

        let input_ids_tensor = Tensor::from_array(input_ids_array)
            .map_err(|e| Error::inference(format!("Failed to create input_ids tensor: {}", e)))?;
        let attention_mask_tensor = Tensor::from_array(attention_mask_array).map_err(|e| {
            Error::inference(format!("Failed to create attention_mask tensor: {}", e))
        })?;
        let token_type_ids_tensor = Tensor::from_array(token_type_ids_array).map_err(|e| {
            Error::inference(format!("Failed to create token_type_ids tensor: {}", e))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| Error::inference(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor.into_dyn(),
                "attention_mask" => attention_mask_tensor.into_dyn(),
                "token_type_ids" => token_type_ids_tensor.into_dyn(),
            ])
            .map_err(|e| Error::inference(format!("ONNX inference failed: {}", e)))?;

        let hidden = outputs.get("last_hidden_state").ok_or_else(|| {
            Error::inference("ONNX model output does not contain 'last_hidden_state'".to_string())
        })?;

        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::inference(format!("Failed to extract output tensor: {}", e)))?;
        if shape.len() != 3 {
            return Err(Error::inference(format!(
                "Unexpected output shape: {:?}",
                shape
            )));
        }
        let seq_len = shape[1] as usize;
        let hidden_dim = shape[2] as usize;

        // Mean pooling over unmasked token positions.
        let mut vectors = Vec::with_capacity(batch);
        for row in 0..batch {
            let mut pooled = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;
            for col in 0..seq_len.min(max_len) {
                if attention_mask[row * max_len + col] == 0 {
                    continue;
                }
                count += 1.0;
                let base = (row * seq_len + col) * hidden_dim;
                for (d, value) in pooled.iter_mut().enumerate() {
                    *value += data[base + d];
                }
            }
            if count > 0.0 {
                for value in &mut pooled {
                    *value /= count;
                }
            }
            vectors.push(pooled);
        }

        Ok(vectors)
    }

    fn id(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds each text as a fixed vector looked up by exact content.
    struct StubEmbedder {
        vectors: Vec<(&'static str, Vec<f32>)>,
        calls: AtomicUsize,
    }

    impl StubEmbedder {
        fn new(vectors: Vec<(&'static str, Vec<f32>)>) -> Self {
            Self {
                vectors,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextEmbedder for StubEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    self.vectors
                        .iter()
                        .find(|(k, _)| k == t)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| vec![0.0, 0.0])
                })
                .collect())
        }

        fn id(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn test_cosine_parallel_orthogonal_opposite() {
        assert!((cosine_unit_interval(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_unit_interval(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        // Negative cosine clamps to zero.
        assert_eq!(cosine_unit_interval(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_unit_interval(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_scorer_batches_once_per_list() {
        let embedder = Arc::new(StubEmbedder::new(vec![
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("c", vec![1.0, 1.0]),
        ]));
        let scorer = EmbeddingScorer::new(embedder.clone());
        let gt = vec!["a".to_string(), "b".to_string()];
        let gen = vec!["c".to_string()];
        let matrix = scorer.score_matrix(&gt, &gen).unwrap();

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 1);
        // One encode call per list, never one per pair.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        let expected = 1.0 / 2.0f64.sqrt();
        assert!((matrix.get(0, 0) - expected).abs() < 1e-9);
        assert!((matrix.get(1, 0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_lists_skip_encoding() {
        let embedder = Arc::new(StubEmbedder::new(vec![]));
        let scorer = EmbeddingScorer::new(embedder.clone());
        let matrix = scorer.score_matrix(&["a".to_string()], &[]).unwrap();
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.cols(), 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
