//! Per-query evaluation: retrieval metrics, generation quality, triad
//! judgment, token accounting.

use crate::engine::{RagEngine, join_context};
use crate::error::Result;
use crate::eval::dataset::GoldRecord;
use crate::eval::judge::{JudgeMetric, TriadScores};
use crate::eval::metrics::{clean_expected_answer, precision_at_k, recall_at_k, rouge_l_fmeasure};
use std::time::Instant;

/// Everything measured for one gold query. Consumed by the benchmark
/// aggregator, then discarded; only the aggregate and the raw log persist.
#[derive(Debug, Clone)]
pub struct QueryMetrics {
    /// 1 when any retrieved passage hit an expected page.
    pub recall_at_k: u8,
    /// Fraction of retrieved passages on expected pages.
    pub precision_at_k: f64,
    /// ROUGE-L F-measure against the cleaned expected answer.
    pub rouge_l: f64,
    /// The three binary triad judgments.
    pub triad: TriadScores,
    /// Mean of the triad judgments.
    pub triad_score: f64,
    /// Wall-clock retrieval time in seconds.
    pub retrieval_latency: f64,
    /// Wall-clock generation time in seconds.
    pub generation_latency: f64,
    /// Raw generated answer, kept for the audit log.
    pub generated_answer: String,
    /// Context string handed to the generator, kept for the audit log.
    pub context: String,
    /// Reasoner diagnoses for failed metrics. Audit-log only; excluded
    /// from every aggregate.
    pub diagnoses: Vec<(JudgeMetric, String)>,
}

impl QueryMetrics {
    /// PASS only when all three triad judgments are 1.
    pub fn passed(&self) -> bool {
        self.triad.passed()
    }
}

/// Evaluate one gold record end to end.
///
/// Every step runs exactly once; a retrieval, generation, or scoring
/// failure propagates and no partial metrics are produced. The reasoner
/// pass is the one exception: it only enriches the audit log, so its
/// failure is logged and swallowed.
pub async fn evaluate_single_query(
    engine: &RagEngine,
    record: &GoldRecord,
) -> Result<QueryMetrics> {
    let k = engine.config().retrieval.fusion_k();

    // Retrieval
    let retrieval_start = Instant::now();
    let retrieved = engine.retrieve(&record.question, k).await?;
    let retrieval_latency = retrieval_start.elapsed().as_secs_f64();

    let recall = recall_at_k(&retrieved, &record.source_pages);
    let precision = precision_at_k(&retrieved, &record.source_pages);

    // Generation
    let context = join_context(&retrieved);
    let generation_start = Instant::now();
    let generated_answer = engine.generator().generate(&context, &record.question).await?;
    let generation_latency = generation_start.elapsed().as_secs_f64();

    // Token accounting: one atomic update per query
    let input_tokens = engine
        .token_counter()
        .count_tokens(&format!("{}{}", context, record.question));
    let output_tokens = engine.token_counter().count_tokens(&generated_answer);
    engine.token_stats().record_query(input_tokens, output_tokens);

    // Textual similarity against the cleaned annotation
    let clean_expected = clean_expected_answer(&record.expected);
    let rouge_l = rouge_l_fmeasure(&generated_answer, &clean_expected);

    // Triad judgments
    let judge = engine.judge();
    let faithfulness = judge
        .score(JudgeMetric::Faithfulness, &generated_answer, &context)
        .await?;
    let relevancy = judge
        .score(JudgeMetric::Relevancy, &generated_answer, &record.question)
        .await?;
    let context_precision = judge
        .score(JudgeMetric::Precision, &context, &clean_expected)
        .await?;

    let triad = TriadScores {
        faithfulness,
        relevancy,
        precision: context_precision,
    };

    // Reasoner pass, only for failed metrics
    let mut diagnoses = Vec::new();
    let failed: [(JudgeMetric, u8, &str, &str); 3] = [
        (JudgeMetric::Faithfulness, faithfulness, generated_answer.as_str(), context.as_str()),
        (JudgeMetric::Relevancy, relevancy, generated_answer.as_str(), record.question.as_str()),
        (JudgeMetric::Precision, context_precision, context.as_str(), clean_expected.as_str()),
    ];
    for (metric, score, input_a, input_b) in failed {
        if score == 0 {
            match judge.explain(metric, input_a, input_b).await {
                Ok(diagnosis) => diagnoses.push((metric, diagnosis)),
                Err(e) => {
                    tracing::warn!(metric = metric.name(), error = %e, "reasoner pass failed");
                }
            }
        }
    }

    Ok(QueryMetrics {
        recall_at_k: recall,
        precision_at_k: precision,
        rouge_l,
        triad_score: triad.triad_score(),
        triad,
        retrieval_latency,
        generation_latency,
        generated_answer,
        context,
        diagnoses,
    })
}
