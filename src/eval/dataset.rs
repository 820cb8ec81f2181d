//! Gold dataset loading for the benchmark.
//!
//! The gold set is hand-annotated question/expected-answer/expected-page
//! records for the protocol under evaluation. Loaded once per run,
//! read-only afterwards.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One annotated benchmark question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldRecord {
    /// The clinical question.
    pub question: String,
    /// Annotated reference answer. May contain backslash-escape artifacts
    /// from the annotation tooling; cleaned before textual comparison.
    pub expected: String,
    /// Protocol pages that contain the evidence.
    #[serde(alias = "source_page")]
    pub source_pages: Vec<i64>,
}

/// A collection of gold records, evaluated in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldDataset {
    /// Dataset name.
    pub name: String,
    /// Records in evaluation order.
    pub records: Vec<GoldRecord>,
}

impl GoldDataset {
    /// Create a new empty dataset.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get a subset of records (for quick testing).
    pub fn take(&self, n: usize) -> Self {
        Self {
            name: self.name.clone(),
            records: self.records.iter().take(n).cloned().collect(),
        }
    }

    /// Load from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| RagError::Dataset(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Save to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| RagError::io(path, e))?;
        Ok(())
    }
}

/// Built-in sample from the diabetes-prevention protocol annotations, for
/// quick runs and tests.
pub fn create_sample_dataset() -> GoldDataset {
    let mut dataset = GoldDataset::new("dpp-protocol-sample");

    dataset.records.push(GoldRecord {
        question: "When is metformin permanently discontinued due to kidney function?"
            .to_string(),
        expected: "Metformin is permanently discontinued if eGFR < 30 mL/min/1.73 m2."
            .to_string(),
        source_pages: vec![46, 47],
    });

    dataset.records.push(GoldRecord {
        question: "What was the primary outcome for the original Diabetes Prevention Program (DPP)?"
            .to_string(),
        expected: "The development of diabetes, defined by 1997 ADA criteria".to_string(),
        source_pages: vec![13, 63],
    });

    dataset.records.push(GoldRecord {
        question: "What is the diagnostic threshold for diabetic retinopathy in DPPOS Phase 3?"
            .to_string(),
        expected: "Mild diabetic retinopathy, specifically an ETDRS grade of 35 or greater, or adjudicated treatment for retinopathy."
            .to_string(),
        source_pages: vec![31],
    });

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_dataset() {
        let dataset = create_sample_dataset();
        assert_eq!(dataset.len(), 3);
        assert!(!dataset.is_empty());

        for record in &dataset.records {
            assert!(!record.question.is_empty());
            assert!(!record.expected.is_empty());
            assert!(!record.source_pages.is_empty());
        }
    }

    #[test]
    fn test_take_subset() {
        let dataset = create_sample_dataset();
        let subset = dataset.take(1);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.records[0].question, dataset.records[0].question);
    }

    #[test]
    fn test_load_json_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gold.json");

        let original = create_sample_dataset();
        original.save_json(&path).unwrap();

        let loaded = GoldDataset::load_json(&path).unwrap();
        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.records[0].source_pages, vec![46, 47]);
    }

    #[test]
    fn test_load_json_accepts_source_page_alias() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gold.json");
        fs::write(
            &path,
            r#"{"name":"x","records":[{"question":"q","expected":"a","source_page":[5]}]}"#,
        )
        .unwrap();

        let loaded = GoldDataset::load_json(&path).unwrap();
        assert_eq!(loaded.records[0].source_pages, vec![5]);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = GoldDataset::load_json(Path::new("/nonexistent/gold.json"));
        assert!(result.is_err());
    }
}
