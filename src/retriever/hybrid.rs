//! Hybrid retrieval: weighted reciprocal-rank fusion of the lexical and
//! dense indices.

use crate::chunker::Passage;
use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::retriever::{DenseIndex, LexicalIndex};
use std::collections::HashMap;

/// Standard RRF rank constant.
const RRF_K: f64 = 60.0;

/// A lexical and a dense index built over the same ordered passage corpus.
/// Always constructed together and replaced together, so a retriever can
/// never see members built from two different documents.
pub struct IndexPair {
    passages: Vec<Passage>,
    lexical: LexicalIndex,
    dense: DenseIndex,
}

impl IndexPair {
    /// Build both indices over the passage corpus.
    pub fn build(passages: Vec<Passage>, embedder: &dyn Embedder) -> Result<Self> {
        let lexical = LexicalIndex::build(&passages)?;
        let dense = DenseIndex::build(&passages, embedder)?;

        Ok(Self {
            passages,
            lexical,
            dense,
        })
    }

    /// Number of passages in the corpus.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Check if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Retrieve the top-k passages for a query.
    ///
    /// Queries the lexical index for its top `k_lexical` matches and the
    /// dense index for its top `k_dense` matches, then fuses the two ranked
    /// lists with weighted reciprocal-rank fusion:
    ///
    /// `score(p) = Σ_source weight_source / (60 + rank_source(p))`
    ///
    /// Fusion is rank-level and fully deterministic; ties break by corpus
    /// order. If one source returns nothing the result degrades to the
    /// other source's ranking.
    pub fn retrieve(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
        config: &RetrievalConfig,
    ) -> Result<Vec<Passage>> {
        let lexical_ranked = self.lexical.search(query, config.k_lexical)?;
        let dense_ranked = self.dense.search(query, embedder, config.k_dense)?;

        let mut scores: HashMap<usize, f64> = HashMap::new();

        for (rank, &ordinal) in lexical_ranked.iter().enumerate() {
            *scores.entry(ordinal).or_insert(0.0) +=
                config.lexical_weight / (RRF_K + (rank + 1) as f64);
        }
        for (rank, &ordinal) in dense_ranked.iter().enumerate() {
            *scores.entry(ordinal).or_insert(0.0) +=
                config.dense_weight / (RRF_K + (rank + 1) as f64);
        }

        let mut fused: Vec<(usize, f64)> = scores.into_iter().collect();
        fused.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        fused.truncate(k);

        Ok(fused
            .into_iter()
            .map(|(ordinal, _)| self.passages[ordinal].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    /// Deterministic embedder: a passage's vector is 1.0 on the axis of
    /// each marker word it contains.
    struct KeywordEmbedder;

    const MARKERS: [&str; 4] = ["metformin", "egfr", "lifestyle", "retinopathy"];

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(MARKERS
                .iter()
                .map(|m| if lower.contains(m) { 1.0 } else { 0.0 })
                .collect())
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            MARKERS.len()
        }
    }

    fn passage(ordinal: usize, page: i64, content: &str) -> Passage {
        Passage {
            content: content.to_string(),
            page,
            ordinal,
        }
    }

    fn sample_pair() -> IndexPair {
        IndexPair::build(
            vec![
                passage(0, 45, "Quarterly lifestyle sessions are offered to all groups"),
                passage(1, 46, "Metformin is permanently discontinued if eGFR < 30"),
                passage(2, 47, "Metformin dose halves when eGFR is between 30 and 45"),
                passage(3, 48, "Retinopathy is graded by ETDRS photography"),
            ],
            &KeywordEmbedder,
        )
        .unwrap()
    }

    #[test]
    fn test_retrieve_bounded_by_k() {
        let pair = sample_pair();
        for k in 1..=4 {
            let results = pair
                .retrieve("metformin egfr", k, &KeywordEmbedder, &RetrievalConfig::default())
                .unwrap();
            assert!(results.len() <= k);
        }
    }

    #[test]
    fn test_retrieve_favors_passages_ranked_by_both_sources() {
        let pair = sample_pair();
        let results = pair
            .retrieve("metformin egfr", 4, &KeywordEmbedder, &RetrievalConfig::default())
            .unwrap();

        // Both metformin passages rank in both sources; they must lead.
        let top_pages: Vec<i64> = results.iter().take(2).map(|p| p.page).collect();
        assert!(top_pages.contains(&46));
        assert!(top_pages.contains(&47));
    }

    #[test]
    fn test_retrieve_is_deterministic() {
        let pair = sample_pair();
        let config = RetrievalConfig::default();
        let first = pair
            .retrieve("metformin", 4, &KeywordEmbedder, &config)
            .unwrap();
        let second = pair
            .retrieve("metformin", 4, &KeywordEmbedder, &config)
            .unwrap();

        let pages = |r: &[Passage]| r.iter().map(|p| p.ordinal).collect::<Vec<_>>();
        assert_eq!(pages(&first), pages(&second));
    }

    #[test]
    fn test_degrades_to_single_source() {
        let pair = sample_pair();
        // "ETDRS" matches lexically but embeds to the zero vector's
        // retinopathy axis only via the word "retinopathy", which the query
        // lacks; the dense side still returns rankings (all-zero query vector
        // scores 0 everywhere), so fusion must not fail either way.
        let results = pair
            .retrieve("ETDRS", 4, &KeywordEmbedder, &RetrievalConfig::default())
            .unwrap();
        assert!(results.iter().any(|p| p.page == 48));
    }

    #[test]
    fn test_empty_query_degrades_to_dense_only() {
        let pair = sample_pair();
        // The lexical side returns nothing for an empty query.
        let results = pair
            .retrieve("", 3, &KeywordEmbedder, &RetrievalConfig::default())
            .unwrap();
        assert!(results.len() <= 3);
    }

    #[test]
    fn test_keyword_embedder_is_sane() {
        // Guard the test fixture itself: identical marker sets embed
        // identically, disjoint sets are orthogonal.
        let e = KeywordEmbedder;
        let a = e.embed("metformin stopped").unwrap();
        let b = e.embed("metformin continued").unwrap();
        let c = e.embed("lifestyle sessions").unwrap();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);
    }
}
