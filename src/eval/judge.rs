//! LLM-as-judge triad scoring.
//!
//! Two passes over the same generation service: a binary scorer whose
//! output is capped to a single token, and a free-text reasoner invoked
//! only when the binary pass fails. The reasoner never feeds any numeric
//! aggregate.

use crate::error::Result;
use crate::llm::GenerationService;
use serde::Serialize;
use std::sync::Arc;

/// The three judged quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JudgeMetric {
    /// Is the answer supported only by the retrieved context?
    Faithfulness,
    /// Does the answer address the question?
    Relevancy,
    /// Does the context contain the gold answer's exact information?
    Precision,
}

impl JudgeMetric {
    pub fn name(&self) -> &'static str {
        match self {
            JudgeMetric::Faithfulness => "faithfulness",
            JudgeMetric::Relevancy => "relevancy",
            JudgeMetric::Precision => "precision",
        }
    }

    fn binary_question(&self) -> &'static str {
        match self {
            JudgeMetric::Faithfulness => {
                "Is this ACTUAL ANSWER supported ONLY by the CONTEXT? Answer 1 for Yes, 0 for No."
            }
            JudgeMetric::Relevancy => {
                "Does this ACTUAL ANSWER directly address the QUESTION? Answer 1 for Yes, 0 for No."
            }
            JudgeMetric::Precision => {
                "Does the CONTEXT contain the exact information in the GOLD STANDARD? Answer 1 for Yes, 0 for No."
            }
        }
    }

    fn reason_question(&self) -> &'static str {
        match self {
            JudgeMetric::Faithfulness => {
                "Point out the specific sentence in the answer that is NOT in the protocol context."
            }
            JudgeMetric::Relevancy => {
                "Explain why the answer fails to address the user's specific clinical question."
            }
            JudgeMetric::Precision => {
                "Identify the specific clinical fact from the Gold Standard that is missing in the retrieved context."
            }
        }
    }
}

/// System instruction framing the judge as an auditor.
const JUDGE_SYSTEM: &str = "You are a Medical Auditor. Verify the following.";

/// The three binary judgments for one query.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TriadScores {
    pub faithfulness: u8,
    pub relevancy: u8,
    pub precision: u8,
}

impl TriadScores {
    /// Mean of the three binary judgments: one of {0, 1/3, 2/3, 1}.
    pub fn triad_score(&self) -> f64 {
        (self.faithfulness + self.relevancy + self.precision) as f64 / 3.0
    }

    /// PASS only when every judgment is 1.
    pub fn passed(&self) -> bool {
        self.faithfulness == 1 && self.relevancy == 1 && self.precision == 1
    }
}

/// Binary judge plus failure-triggered reasoner.
#[derive(Clone)]
pub struct TriadJudge {
    service: Arc<dyn GenerationService>,
}

impl TriadJudge {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Pass 1: single-token binary judgment.
    ///
    /// The result is 1 exactly when the raw output contains the character
    /// '1'. This substring test is the compatibility contract for the
    /// benchmark's aggregate semantics; it must not be tightened, and it
    /// never fails to produce a value.
    pub async fn score(&self, metric: JudgeMetric, input_a: &str, input_b: &str) -> Result<u8> {
        let prompt = format!(
            "{}\nA: {}\nB: {}\nOutput ONLY '1' or '0'.",
            metric.binary_question(),
            input_a,
            input_b
        );
        let response = self
            .service
            .complete_capped(Some(JUDGE_SYSTEM), &prompt, 1)
            .await?;

        Ok(parse_binary(&response))
    }

    /// Pass 2: targeted free-text diagnosis for a failed metric. Audit-log
    /// enrichment only.
    pub async fn explain(
        &self,
        metric: JudgeMetric,
        input_a: &str,
        input_b: &str,
    ) -> Result<String> {
        let prompt = format!(
            "{}\nInput A: {}\nInput B: {}",
            metric.reason_question(),
            input_a,
            input_b
        );
        let response = self.service.complete(Some(JUDGE_SYSTEM), &prompt).await?;
        Ok(response.trim().to_string())
    }
}

/// The substring contract: 1 iff the response contains '1', else 0.
fn parse_binary(response: &str) -> u8 {
    if response.contains('1') { 1 } else { 0 }
}
