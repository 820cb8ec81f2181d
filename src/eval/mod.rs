//! Benchmark harness: gold dataset, per-query evaluation, triad judging,
//! aggregation, and report persistence.

pub mod benchmark;
pub mod dataset;
pub mod evaluator;
pub mod judge;
pub mod metrics;

pub use benchmark::{Benchmark, BenchmarkConfig, BenchmarkReport, BenchmarkSummary};
pub use dataset::{GoldDataset, GoldRecord, create_sample_dataset};
pub use evaluator::{QueryMetrics, evaluate_single_query};
pub use judge::{JudgeMetric, TriadJudge, TriadScores};
