//! The owning context for all shared pipeline state.
//!
//! One `RagEngine` holds the active index pair, the token counters, and the
//! model clients. It is constructed once at process start and passed
//! explicitly into everything that needs it; there is no ambient global
//! state.

use crate::chunker::{Passage, chunk_document};
use crate::config::Config;
use crate::document::Document;
use crate::embeddings::{BertEmbedder, Embedder};
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;
use crate::eval::judge::TriadJudge;
use crate::llm::{GenerationService, LlmClient};
use crate::retriever::IndexPair;
use crate::tokens::{HeuristicTokenCounter, TokenCounter, TokenStats};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared pipeline context: index pair, token stats, clients.
pub struct RagEngine {
    config: Config,
    generator: AnswerGenerator,
    judge: TriadJudge,
    embedder: Arc<dyn Embedder>,
    token_counter: Arc<dyn TokenCounter>,
    /// The active index pair. Readers take the read lock; an upload swaps
    /// the whole pair under the write lock, so a half-updated pair is never
    /// observable.
    index_pair: RwLock<Option<IndexPair>>,
    /// Serializes rebuilds: at most one in flight.
    rebuild_gate: Mutex<()>,
    token_stats: TokenStats,
}

impl RagEngine {
    /// Assemble an engine from its parts. Used directly by tests with
    /// deterministic fakes; production code goes through [`from_config`].
    ///
    /// [`from_config`]: RagEngine::from_config
    pub fn new(
        config: Config,
        generation: Arc<dyn GenerationService>,
        judging: Arc<dyn GenerationService>,
        embedder: Arc<dyn Embedder>,
        token_counter: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            config,
            generator: AnswerGenerator::new(generation),
            judge: TriadJudge::new(judging),
            embedder,
            token_counter,
            index_pair: RwLock::new(None),
            rebuild_gate: Mutex::new(()),
            token_stats: TokenStats::new(),
        }
    }

    /// Build the production engine: HTTP clients for generation and
    /// judging, the configured embedding model, heuristic token counting.
    /// Loads the embedding model, so this blocks for the duration of the
    /// download/mmap on first use.
    pub fn from_config(config: Config) -> Result<Self> {
        let generation: Arc<dyn GenerationService> =
            Arc::new(LlmClient::new(config.llm.clone()));
        let judging: Arc<dyn GenerationService> =
            Arc::new(LlmClient::new(config.judge_config().clone()));
        let embedder: Arc<dyn Embedder> =
            Arc::new(BertEmbedder::load(&config.retrieval.embedding_model)?);

        Ok(Self::new(
            config,
            generation,
            judging,
            embedder,
            Arc::new(HeuristicTokenCounter),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    pub fn judge(&self) -> &TriadJudge {
        &self.judge
    }

    pub fn token_counter(&self) -> &dyn TokenCounter {
        self.token_counter.as_ref()
    }

    pub fn token_stats(&self) -> &TokenStats {
        &self.token_stats
    }

    /// Whether an index pair is active.
    pub async fn is_indexed(&self) -> bool {
        self.index_pair.read().await.is_some()
    }

    /// Chunk and index a document, atomically replacing the previously
    /// active index pair. On [`RagError::EmptyDocument`] the prior pair is
    /// left untouched. Returns a status string for the upload surface.
    pub async fn index_document(&self, document: &Document) -> Result<String> {
        let _rebuild = self.rebuild_gate.lock().await;

        let passages = chunk_document(document, &self.config.retrieval)?;
        let passage_count = passages.len();
        let page_count = document.page_count();

        tracing::info!(passages = passage_count, pages = page_count, "building index pair");
        let pair = IndexPair::build(passages, self.embedder.as_ref())?;

        *self.index_pair.write().await = Some(pair);

        Ok(format!(
            "Hybrid indexing successful: {} passages from {} pages.",
            passage_count, page_count
        ))
    }

    /// Retrieve the top-k passages for a query through the hybrid
    /// retriever. Fails with the retriever's not-ready condition when no
    /// document has been indexed.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let guard = self.index_pair.read().await;
        let pair = guard.as_ref().ok_or_else(RagError::retriever_not_ready)?;
        pair.retrieve(query, k, self.embedder.as_ref(), &self.config.retrieval)
    }

    /// Answer a live question: retrieve, generate, account tokens.
    /// Returns the answer and a display-cleaned context string.
    pub async fn ask(&self, question: &str) -> Result<(String, String)> {
        let k = self.config.retrieval.fusion_k();
        let retrieved = self.retrieve(question, k).await?;
        let context = join_context(&retrieved);

        let answer = self.generator.generate(&context, question).await?;

        let input_tokens = self
            .token_counter
            .count_tokens(&format!("{}{}", context, question));
        let output_tokens = self.token_counter.count_tokens(&answer);
        self.token_stats.record_query(input_tokens, output_tokens);

        Ok((answer, clean_display_context(&context)))
    }
}

/// Concatenate ranked passages into the generation context.
pub fn join_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Flatten intra-passage line breaks for display while keeping passage
/// separation.
fn clean_display_context(context: &str) -> String {
    context
        .replace("\n\n", " [PARAGRAPH] ")
        .replace('\n', " ")
        .replace(" [PARAGRAPH] ", "\n\n")
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_retrieve_before_indexing_is_not_ready() {
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        let err = engine.retrieve("metformin", 3).await.unwrap_err();
        assert!(matches!(err, RagError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_index_then_retrieve_hits_expected_pages() {
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        let status = engine.index_document(&protocol_document()).await.unwrap();
        assert!(status.contains("successful"));

        let results = engine
            .retrieve("When is metformin permanently discontinued due to kidney function?", 3)
            .await
            .unwrap();
        assert!(results.len() <= 3);
        assert_eq!(crate::eval::metrics::recall_at_k(&results, &[46, 47]), 1);
    }

    #[tokio::test]
    async fn test_empty_document_keeps_prior_index() {
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        let blank = Document::from_pages("blank", vec!["  ".into()]);
        let err = engine.index_document(&blank).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument));

        // Prior pair still answers queries.
        assert!(engine.is_indexed().await);
        assert!(!engine.retrieve("metformin", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reindexing_replaces_the_pair() {
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        let replacement = Document::from_pages(
            "other",
            vec!["".into(), "Lifestyle sessions are quarterly.".into()],
        );
        engine.index_document(&replacement).await.unwrap();

        let results = engine.retrieve("lifestyle sessions", 3).await.unwrap();
        assert!(results.iter().all(|p| p.page == 1));
    }

    #[tokio::test]
    async fn test_identical_queries_return_identical_results() {
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        let first = engine.retrieve("metformin egfr", 6).await.unwrap();
        let second = engine.retrieve("metformin egfr", 6).await.unwrap();

        let ordinals = |r: &[Passage]| r.iter().map(|p| p.ordinal).collect::<Vec<_>>();
        assert_eq!(ordinals(&first), ordinals(&second));
    }

    #[tokio::test]
    async fn test_ask_records_token_stats() {
        let engine = engine_with(Arc::new(ScriptedService::passing(
            "Permanently discontinued if eGFR < 30.",
        )));
        engine.index_document(&protocol_document()).await.unwrap();

        let (answer, context) = engine.ask("When is metformin stopped?").await.unwrap();
        assert!(answer.contains("eGFR"));
        assert!(!context.is_empty());

        let stats = engine.token_stats().snapshot();
        assert_eq!(stats.num_queries, 1);
        assert!(stats.input_tokens > 0);
        assert!(stats.output_tokens > 0);
    }

    #[test]
    fn test_join_context_double_newline() {
        let passages = vec![
            Passage {
                content: "first".into(),
                page: 1,
                ordinal: 0,
            },
            Passage {
                content: "second".into(),
                page: 2,
                ordinal: 1,
            },
        ];
        assert_eq!(join_context(&passages), "first\n\nsecond");
    }

    #[test]
    fn test_clean_display_context_flattens_inner_newlines() {
        let cleaned = clean_display_context("line one\nline two\n\nnext passage");
        assert_eq!(cleaned, "line one line two\n\nnext passage");
    }
}
