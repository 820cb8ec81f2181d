//! Local embedding model using candle + sentence-transformers.

use crate::error::{RagError, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

/// Text embedding backend. The dense index and the engine depend on this
/// seam, not on a concrete model, so tests can run on a deterministic fake.
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimension.
    fn dimension(&self) -> usize;
}

/// BERT sentence-embedding model (mean pooling + L2 normalization).
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    normalize: bool,
}

impl BertEmbedder {
    /// Load a sentence-transformers compatible model from the Hugging Face
    /// Hub by id, e.g. `NeuML/pubmedbert-base-embeddings`.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu; // CPU for portability

        let api = Api::new().map_err(|e| RagError::Embedding(format!("HF Hub API: {}", e)))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| RagError::Embedding(format!("config.json: {}", e)))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| RagError::Embedding(format!("tokenizer.json: {}", e)))?;
        let weights_path = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(|e| RagError::Embedding(format!("model weights: {}", e)))?;

        let config_text = std::fs::read_to_string(&config_path)
            .map_err(|e| RagError::io(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&config_text)
            .map_err(|e| RagError::Embedding(format!("parse config: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| RagError::Embedding(format!("load tokenizer: {}", e)))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| RagError::Embedding(format!("load weights: {}", e)))?
        };

        let dimension = config.hidden_size;
        let model = BertModel::load(vb, &config)
            .map_err(|e| RagError::Embedding(format!("load BERT model: {}", e)))?;

        tracing::info!(model_id, dimension, "embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            normalize: true,
        })
    }

    fn forward_batch(&self, texts: &[&str]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::new();
        let mut attention_mask_vec = Vec::new();
        let mut token_type_ids_vec = Vec::new();

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            let mut padded_ids = ids.to_vec();
            let mut padded_mask = mask.to_vec();
            let mut padded_types = vec![0u32; ids.len()];

            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);
            padded_types.resize(max_len, 0);

            input_ids_vec.extend(padded_ids);
            attention_mask_vec.extend(padded_mask);
            token_type_ids_vec.extend(padded_types);
        }

        let batch_size = texts.len();

        let input_ids = Tensor::from_vec(input_ids_vec, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_vec, (batch_size, max_len), &self.device)?;
        let token_type_ids =
            Tensor::from_vec(token_type_ids_vec, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over the sequence dimension, masked by attention
        let attention_mask_expanded = attention_mask
            .unsqueeze(2)?
            .to_dtype(output.dtype())?
            .broadcast_as(output.shape())?;

        let sum_embeddings = (output * &attention_mask_expanded)?.sum(1)?;
        let sum_mask = attention_mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean_embeddings = (sum_embeddings / sum_mask)?;

        let final_embeddings = if self.normalize {
            let norms = mean_embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
            let shape = mean_embeddings.shape().clone();
            (mean_embeddings / norms.broadcast_as(&shape)?)?
        } else {
            mean_embeddings
        };

        let embeddings_vec: Vec<f32> = final_embeddings
            .to_vec2::<f32>()?
            .into_iter()
            .flatten()
            .collect();

        let embedding_dim = final_embeddings.dim(1)?;
        Ok(embeddings_vec
            .chunks(embedding_dim)
            .map(|c| c.to_vec())
            .collect())
    }
}

impl Embedder for BertEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text])?;
        Ok(embeddings.remove(0))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.forward_batch(texts)
            .map_err(|e| RagError::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
