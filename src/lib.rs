//! Clinical RAG - protocol question answering with a self-scoring benchmark.
//!
//! Answers clinical questions against an uploaded protocol document using
//! retrieval-augmented generation, and ships a benchmark harness that
//! scores its own retrieval and generation quality against a hand-annotated
//! gold dataset.
//!
//! # Overview
//!
//! The pipeline:
//! 1. Page text is chunked into overlapping passages tagged with their
//!    source page.
//! 2. A lexical (BM25) and a dense (embedding) index are built over the
//!    same passage set and replaced atomically on every upload.
//! 3. Queries fan out to both indices; results are fused with weighted
//!    reciprocal-rank fusion.
//! 4. Retrieved passages ground a generation prompt with a mandatory
//!    fallback phrase when the context is insufficient.
//! 5. The benchmark scores each gold query positionally (recall/precision
//!    by page), textually (ROUGE-L), and with an LLM judge (faithfulness /
//!    relevancy / context precision), then persists an audit log and a
//!    machine-parseable summary.
//!
//! # Quick Start
//!
//! ```no_run
//! use clinical_rag::{Config, Document, RagEngine};
//! use clinical_rag::eval::{Benchmark, BenchmarkConfig, create_sample_dataset};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let engine = RagEngine::from_config(config)?;
//!
//!     // Index a protocol
//!     let document = Document::from_text_file("protocol.txt".as_ref(), "\u{c}")?;
//!     let status = engine.index_document(&document).await?;
//!     println!("{}", status);
//!
//!     // Ask a question
//!     let (answer, context) = engine.ask("When is metformin stopped?").await?;
//!     println!("{}\n---\n{}", answer, context);
//!
//!     // Run the benchmark
//!     let benchmark = Benchmark::new(BenchmarkConfig::default());
//!     let report = benchmark.run(&engine, &create_sample_dataset()).await?;
//!     println!("{}", report.summary_text);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Document / chunker**: per-page text from the extraction collaborator,
//!   split into bounded overlapping passages
//! - **retriever**: lexical + dense index pair with weighted rank fusion
//! - **generator**: context-grounded answer generation
//! - **eval**: gold dataset, triad judge, per-query evaluator, benchmark
//!   aggregator
//! - **RagEngine**: the owning context for all shared state

pub mod chunker;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod eval;
pub mod generator;
pub mod llm;
pub mod retriever;
pub mod tokens;

// Re-export commonly used types
pub use chunker::{Passage, chunk_document};
pub use config::Config;
pub use document::Document;
pub use engine::RagEngine;
pub use error::{RagError, Result};
pub use generator::AnswerGenerator;
pub use llm::{FALLBACK_PHRASE, LlmClient};
pub use retriever::IndexPair;
pub use tokens::{TokenCounter, TokenStats};
