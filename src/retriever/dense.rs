//! Dense passage index (embedding similarity).

use crate::chunker::Passage;
use crate::embeddings::{Embedder, cosine_similarity};
use crate::error::Result;

/// Embeddings are generated in batches of this size during the build.
const EMBED_BATCH_SIZE: usize = 32;

/// Embedding-vector index over a passage corpus. Entry order matches the
/// corpus, so `entries[i]` embeds the passage with ordinal `i`.
pub struct DenseIndex {
    embeddings: Vec<Vec<f32>>,
}

impl DenseIndex {
    /// Embed every passage and build the index.
    pub fn build(passages: &[Passage], embedder: &dyn Embedder) -> Result<Self> {
        let mut embeddings = Vec::with_capacity(passages.len());

        for batch in passages.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|p| p.content.as_str()).collect();
            embeddings.extend(embedder.embed_batch(&texts)?);
        }

        tracing::debug!(passages = passages.len(), "dense index built");

        Ok(Self { embeddings })
    }

    /// Top-k passage ordinals by cosine similarity to the query, best first.
    pub fn search(&self, query: &str, embedder: &dyn Embedder, k: usize) -> Result<Vec<usize>> {
        if k == 0 || self.embeddings.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = embedder.embed(query)?;

        let mut scored: Vec<(f32, usize)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(ordinal, embedding)| (cosine_similarity(&query_embedding, embedding), ordinal))
            .collect();

        // Equal scores fall back to corpus order so results are stable.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, ordinal)| ordinal).collect())
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}
