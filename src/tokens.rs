//! Token counting and process-wide token accounting.

use crate::error::{RagError, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

/// Counts tokens for efficiency accounting. Never used for generation
/// control.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Word-count heuristic (words / 0.75), good enough when no tokenizer file
/// is available.
#[derive(Debug, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f64 / 0.75) as usize
    }
}

/// Exact counting through a Hugging Face tokenizer file.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    /// Load from a `tokenizer.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| RagError::Config(format!("load tokenizer: {}", e)))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer
            .encode(text, false)
            .map(|encoding| encoding.get_ids().len())
            .unwrap_or(0)
    }
}

/// A snapshot of the running counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenStatsSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub num_queries: u64,
}

impl TokenStatsSnapshot {
    /// Per-query input-token average, 0 when no queries ran.
    pub fn avg_input_tokens(&self) -> u64 {
        if self.num_queries == 0 {
            0
        } else {
            self.input_tokens / self.num_queries
        }
    }

    /// Per-query output-token average, 0 when no queries ran.
    pub fn avg_output_tokens(&self) -> u64 {
        if self.num_queries == 0 {
            0
        } else {
            self.output_tokens / self.num_queries
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    input_tokens: u64,
    output_tokens: u64,
    num_queries: u64,
}

/// Process-wide running token counters. Reset at engine construction,
/// incremented once per generation call. The three fields advance together
/// under one lock so concurrent evaluators could never observe or produce a
/// torn update.
#[derive(Debug, Default)]
pub struct TokenStats {
    counters: Mutex<Counters>,
}

impl TokenStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query's token usage as a single atomic update.
    pub fn record_query(&self, input_tokens: usize, output_tokens: usize) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.input_tokens += input_tokens as u64;
        counters.output_tokens += output_tokens as u64;
        counters.num_queries += 1;
    }

    /// Read the current totals.
    pub fn snapshot(&self) -> TokenStatsSnapshot {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        TokenStatsSnapshot {
            input_tokens: counters.input_tokens,
            output_tokens: counters.output_tokens,
            num_queries: counters.num_queries,
        }
    }

    /// Zero all counters.
    pub fn reset(&self) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters = Counters::default();
    }
}
