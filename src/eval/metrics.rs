//! Positional and textual retrieval/generation metrics.

use crate::chunker::Passage;

/// Recall@k: 1 when any retrieved passage's page is in the expected set,
/// else 0.
pub fn recall_at_k(retrieved: &[Passage], expected_pages: &[i64]) -> u8 {
    if retrieved
        .iter()
        .any(|p| expected_pages.contains(&p.page))
    {
        1
    } else {
        0
    }
}

/// Precision@k: fraction of retrieved passages whose page is in the
/// expected set, over the number actually retrieved (not over k), and 0
/// when nothing was retrieved.
pub fn precision_at_k(retrieved: &[Passage], expected_pages: &[i64]) -> f64 {
    if retrieved.is_empty() {
        return 0.0;
    }

    let hits = retrieved
        .iter()
        .filter(|p| expected_pages.contains(&p.page))
        .count();

    hits as f64 / retrieved.len() as f64
}

/// Strip backslash-escape artifacts the annotation tooling leaves in
/// expected answers, for fair textual comparison.
pub fn clean_expected_answer(expected: &str) -> String {
    expected.replace('\\', "").trim().to_string()
}

/// ROUGE-L F-measure between a generated answer and the reference, on
/// lowercased whitespace tokens via longest common subsequence.
pub fn rouge_l_fmeasure(generated: &str, reference: &str) -> f64 {
    let gen_tokens = tokenize(generated);
    let ref_tokens = tokenize(reference);

    if gen_tokens.is_empty() && ref_tokens.is_empty() {
        return 1.0;
    }
    if gen_tokens.is_empty() || ref_tokens.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(&gen_tokens, &ref_tokens);
    let precision = lcs as f64 / gen_tokens.len() as f64;
    let recall = lcs as f64 / ref_tokens.len() as f64;

    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Longest common subsequence length with a 1D rolling DP row.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    let n = b.len();
    let mut dp = vec![0usize; n + 1];

    for item in a {
        let mut prev = 0;
        for (j, other) in b.iter().enumerate() {
            let temp = dp[j + 1];
            if item == other {
                dp[j + 1] = prev + 1;
            } else {
                dp[j + 1] = dp[j + 1].max(dp[j]);
            }
            prev = temp;
        }
    }

    dp[n]
}
