//! Benchmark runner: drives the per-query evaluator over the gold set,
//! aggregates, and persists the reports.

use crate::engine::RagEngine;
use crate::error::{RagError, Result};
use crate::eval::dataset::GoldDataset;
use crate::eval::evaluator::{QueryMetrics, evaluate_single_query};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Plain-text audit log, overwritten each run.
    pub log_path: PathBuf,
    /// Structured summary artifact, overwritten each run.
    pub summary_path: PathBuf,
    /// Maximum records to evaluate (for quick testing).
    pub max_records: Option<usize>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("evaluation_logs.txt"),
            summary_path: PathBuf::from("evaluation_summary.json"),
            max_records: None,
        }
    }
}

/// Triad averages section of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriadSummary {
    #[serde(rename = "Faithfulness")]
    pub faithfulness: f64,
    #[serde(rename = "Answer Relevancy")]
    pub answer_relevancy: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
}

/// Latency/throughput section of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub avg_retrieval_latency_sec: f64,
    pub avg_generation_latency_sec: f64,
    pub throughput_qps: f64,
}

/// Token accounting section of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficiencySummary {
    pub avg_input_tokens: u64,
    pub avg_output_tokens: u64,
}

/// The aggregate report. Field names are a stable machine-parseable
/// contract; the `@6` in the retrieval keys reflects the default 3+3
/// fusion budget and stays fixed even when k is reconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub num_queries: usize,
    #[serde(rename = "ContextRecall@6")]
    pub context_recall: f64,
    #[serde(rename = "ContextPrecision@6")]
    pub context_precision: f64,
    #[serde(rename = "Answer_Similarity_ROUGE-L")]
    pub answer_similarity_rouge_l: f64,
    #[serde(rename = "RAG_Triad")]
    pub rag_triad: TriadSummary,
    #[serde(rename = "Performance")]
    pub performance: PerformanceSummary,
    #[serde(rename = "Efficiency")]
    pub efficiency: EfficiencySummary,
}

/// Everything a caller (CLI or serving layer) needs to present a run.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    /// Short per-query log lines, in dataset order.
    pub per_query_logs: Vec<String>,
    /// The aggregate summary.
    pub summary: BenchmarkSummary,
    /// Markdown rendering of the summary for an external UI layer.
    pub summary_text: String,
    /// Queries dropped after an unrecoverable per-query error.
    pub skipped_queries: usize,
}

/// Running per-field sums over evaluated queries.
#[derive(Debug, Default)]
struct RunningTotals {
    recall: f64,
    precision: f64,
    rouge: f64,
    faithfulness: f64,
    relevancy: f64,
    context_precision: f64,
    retrieval_latency: f64,
    generation_latency: f64,
}

impl RunningTotals {
    fn accumulate(&mut self, metrics: &QueryMetrics) {
        self.recall += metrics.recall_at_k as f64;
        self.precision += metrics.precision_at_k;
        self.rouge += metrics.rouge_l;
        self.faithfulness += metrics.triad.faithfulness as f64;
        self.relevancy += metrics.triad.relevancy as f64;
        self.context_precision += metrics.triad.precision as f64;
        self.retrieval_latency += metrics.retrieval_latency;
        self.generation_latency += metrics.generation_latency;
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

/// Benchmark runner.
pub struct Benchmark {
    config: BenchmarkConfig,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Run the full benchmark: every gold record, in dataset order,
    /// strictly sequentially. A query that fails is logged with its
    /// identifier and skipped; it contributes to no sum. Persists the
    /// audit log and summary artifacts, then returns the report.
    pub async fn run(&self, engine: &RagEngine, dataset: &GoldDataset) -> Result<BenchmarkReport> {
        let records: Vec<_> = match self.config.max_records {
            Some(max) => dataset.records.iter().take(max).collect(),
            None => dataset.records.iter().collect(),
        };

        tracing::info!(dataset = %dataset.name, queries = records.len(), "starting benchmark");

        let mut totals = RunningTotals::default();
        let mut per_query_logs = Vec::new();
        let mut file_entries = Vec::new();
        let mut evaluated = 0usize;
        let mut skipped = 0usize;

        for (i, record) in records.iter().enumerate() {
            let qn = i + 1;
            tracing::info!(query = qn, question = %record.question, "evaluating");

            let metrics = match evaluate_single_query(engine, record).await {
                Ok(metrics) => metrics,
                Err(e) => {
                    tracing::error!(query = qn, error = %e, "query failed, skipping");
                    skipped += 1;
                    per_query_logs.push(format!(
                        "Q{}: {}\nVerdict: SKIPPED ({})\n{}",
                        qn,
                        record.question,
                        e,
                        "-".repeat(30)
                    ));
                    continue;
                }
            };

            evaluated += 1;
            totals.accumulate(&metrics);

            let verdict = if metrics.passed() { "✅" } else { "❌" };
            per_query_logs.push(format!(
                "Q{}: {}\nVerdict: {}\nF: {} | R: {} | P: {}\n{}",
                qn,
                record.question,
                verdict,
                metrics.triad.faithfulness,
                metrics.triad.relevancy,
                metrics.triad.precision,
                "-".repeat(30)
            ));

            let mut entry = format!(
                "q{}) {}\nanswer: {}\ncontext: {}\n",
                qn, record.question, metrics.generated_answer, metrics.context
            );
            for (metric, diagnosis) in &metrics.diagnoses {
                entry.push_str(&format!("{} diagnosis: {}\n", metric.name(), diagnosis));
            }
            entry.push_str(&"=".repeat(50));
            entry.push('\n');
            file_entries.push(entry);
        }

        let summary = self.summarize(engine, &totals, evaluated);
        let summary_text = render_summary_markdown(&summary, skipped);

        self.persist(&file_entries, &summary)?;

        tracing::info!(
            evaluated,
            skipped,
            triad_faithfulness = summary.rag_triad.faithfulness,
            "benchmark complete"
        );

        Ok(BenchmarkReport {
            per_query_logs,
            summary,
            summary_text,
            skipped_queries: skipped,
        })
    }

    fn summarize(
        &self,
        engine: &RagEngine,
        totals: &RunningTotals,
        evaluated: usize,
    ) -> BenchmarkSummary {
        let n = evaluated as f64;
        let avg = |total: f64| if evaluated == 0 { 0.0 } else { total / n };

        let total_time = totals.retrieval_latency + totals.generation_latency;
        let throughput = if total_time > 0.0 { n / total_time } else { 0.0 };

        let token_snapshot = engine.token_stats().snapshot();

        BenchmarkSummary {
            num_queries: evaluated,
            context_recall: round4(avg(totals.recall)),
            context_precision: round4(avg(totals.precision)),
            answer_similarity_rouge_l: round4(avg(totals.rouge)),
            rag_triad: TriadSummary {
                faithfulness: round4(avg(totals.faithfulness)),
                answer_relevancy: round4(avg(totals.relevancy)),
                precision: round4(avg(totals.context_precision)),
            },
            performance: PerformanceSummary {
                avg_retrieval_latency_sec: round4(avg(totals.retrieval_latency)),
                avg_generation_latency_sec: round4(avg(totals.generation_latency)),
                throughput_qps: round3(throughput),
            },
            efficiency: EfficiencySummary {
                avg_input_tokens: token_snapshot.avg_input_tokens(),
                avg_output_tokens: token_snapshot.avg_output_tokens(),
            },
        }
    }

    fn persist(&self, file_entries: &[String], summary: &BenchmarkSummary) -> Result<()> {
        let mut log_content = String::from("--- CLINICAL RAG EVALUATION LOG ---\n");
        log_content.push_str(&file_entries.join("\n"));
        std::fs::write(&self.config.log_path, log_content)
            .map_err(|e| RagError::io(&self.config.log_path, e))?;

        let summary_json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&self.config.summary_path, summary_json)
            .map_err(|e| RagError::io(&self.config.summary_path, e))?;

        Ok(())
    }
}

/// Markdown rendering of the summary for presentation by an external UI.
fn render_summary_markdown(summary: &BenchmarkSummary, skipped: usize) -> String {
    let rag = &summary.rag_triad;
    let perf = &summary.performance;
    let eff = &summary.efficiency;

    let mut text = format!(
        "## Executive RAG Evaluation Summary\n\
         \n\
         ### Dataset\n\
         - **Evaluation Queries**: **{}**\n",
        summary.num_queries
    );

    if skipped > 0 {
        text.push_str(&format!("- **Skipped Queries**: **{}**\n", skipped));
    }

    text.push_str(&format!(
        "\n### Retrieval Quality (Hybrid BM25 + Dense)\n\
         - **Context Recall@6**: **{:.1}%**\n\
         - **Context Precision@6**: **{:.1}%**\n\
         - **Answer Similarity (ROUGE-L)**: **{:.3}**\n\
         \n\
         ### RAG Triad (LLM-as-Judge)\n\
         - **Faithfulness**: **{:.1}%**\n\
         - **Answer Relevancy**: **{:.1}%**\n\
         - **Context Precision**: **{:.1}%**\n\
         \n\
         ### Performance\n\
         - **Avg Retrieval Latency**: `{} sec`\n\
         - **Avg Generation Latency**: `{} sec`\n\
         - **Throughput**: `{} QPS`\n\
         \n\
         ### Efficiency\n\
         - **Avg Input Tokens**: `{}`\n\
         - **Avg Output Tokens**: `{}`\n",
        summary.context_recall * 100.0,
        summary.context_precision * 100.0,
        summary.answer_similarity_rouge_l,
        rag.faithfulness * 100.0,
        rag.answer_relevancy * 100.0,
        rag.precision * 100.0,
        perf.avg_retrieval_latency_sec,
        perf.avg_generation_latency_sec,
        perf.throughput_qps,
        eff.avg_input_tokens,
        eff.avg_output_tokens,
    ));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{
        BrokenService, ScriptedService, engine_with, protocol_document,
    };
    use crate::eval::dataset::{GoldDataset, create_sample_dataset};
    use std::sync::Arc;

    fn bench_in(dir: &tempfile::TempDir) -> Benchmark {
        Benchmark::new(BenchmarkConfig {
            log_path: dir.path().join("evaluation_logs.txt"),
            summary_path: dir.path().join("evaluation_summary.json"),
            max_records: None,
        })
    }

    #[tokio::test]
    async fn test_full_run_aggregates_and_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = engine_with(Arc::new(ScriptedService::passing(
            "Permanently discontinued if eGFR < 30 mL/min/1.73 m2.",
        )));
        engine.index_document(&protocol_document()).await.unwrap();

        let dataset = create_sample_dataset();
        let report = bench_in(&dir).run(&engine, &dataset).await.unwrap();

        assert_eq!(report.summary.num_queries, 3);
        assert_eq!(report.skipped_queries, 0);
        assert_eq!(report.per_query_logs.len(), 3);
        assert!(report.per_query_logs[0].starts_with("Q1:"));
        assert!((0.0..=1.0).contains(&report.summary.context_recall));
        assert_eq!(report.summary.rag_triad.faithfulness, 1.0);

        // Audit log persisted with one detail entry per query
        let log = std::fs::read_to_string(dir.path().join("evaluation_logs.txt")).unwrap();
        assert!(log.starts_with("--- CLINICAL RAG EVALUATION LOG ---"));
        assert!(log.contains("q1)"));
        assert!(log.contains("q3)"));
        assert!(log.contains("answer:"));
        assert!(log.contains("context:"));
    }

    #[tokio::test]
    async fn test_summary_json_has_stable_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        bench_in(&dir)
            .run(&engine, &create_sample_dataset())
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("evaluation_summary.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(json.get("num_queries").is_some());
        assert!(json.get("ContextRecall@6").is_some());
        assert!(json.get("ContextPrecision@6").is_some());
        assert!(json.get("Answer_Similarity_ROUGE-L").is_some());
        assert!(json["RAG_Triad"].get("Faithfulness").is_some());
        assert!(json["RAG_Triad"].get("Answer Relevancy").is_some());
        assert!(json["RAG_Triad"].get("Precision").is_some());
        assert!(json["Performance"].get("avg_retrieval_latency_sec").is_some());
        assert!(json["Performance"].get("avg_generation_latency_sec").is_some());
        assert!(json["Performance"].get("throughput_qps").is_some());
        assert!(json["Efficiency"].get("avg_input_tokens").is_some());
        assert!(json["Efficiency"].get("avg_output_tokens").is_some());
    }

    #[tokio::test]
    async fn test_empty_gold_set_is_well_defined() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        let empty = GoldDataset::new("empty");
        let report = bench_in(&dir).run(&engine, &empty).await.unwrap();

        assert_eq!(report.summary.num_queries, 0);
        assert_eq!(report.summary.performance.throughput_qps, 0.0);
        assert_eq!(report.summary.efficiency.avg_input_tokens, 0);
        assert_eq!(report.summary.context_recall, 0.0);
    }

    #[tokio::test]
    async fn test_failed_queries_are_skipped_not_zero_filled() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = engine_with(Arc::new(BrokenService));
        engine.index_document(&protocol_document()).await.unwrap();

        let dataset = create_sample_dataset();
        let report = bench_in(&dir).run(&engine, &dataset).await.unwrap();

        assert_eq!(report.skipped_queries, 3);
        assert_eq!(report.summary.num_queries, 0);
        // Skips are visible in the short log, but corrupt no averages.
        assert!(report.per_query_logs[0].contains("SKIPPED"));
        assert_eq!(report.summary.answer_similarity_rouge_l, 0.0);
    }

    #[tokio::test]
    async fn test_max_records_limits_the_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        let benchmark = Benchmark::new(BenchmarkConfig {
            log_path: dir.path().join("logs.txt"),
            summary_path: dir.path().join("summary.json"),
            max_records: Some(1),
        });

        let report = benchmark
            .run(&engine, &create_sample_dataset())
            .await
            .unwrap();
        assert_eq!(report.summary.num_queries, 1);
    }

    #[tokio::test]
    async fn test_summary_text_renders_sections() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = engine_with(Arc::new(ScriptedService::passing("answer")));
        engine.index_document(&protocol_document()).await.unwrap();

        let report = bench_in(&dir)
            .run(&engine, &create_sample_dataset())
            .await
            .unwrap();

        assert!(report.summary_text.contains("Executive RAG Evaluation Summary"));
        assert!(report.summary_text.contains("Context Recall@6"));
        assert!(report.summary_text.contains("Throughput"));
    }

    #[test]
    fn test_benchmark_config_default_paths() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.log_path, PathBuf::from("evaluation_logs.txt"));
        assert_eq!(config.summary_path, PathBuf::from("evaluation_summary.json"));
        assert!(config.max_records.is_none());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round3(12.3456), 12.346);
    }
}
