//! Document representation for the RAG pipeline.
//!
//! A document is the per-page plain text handed over by the PDF extraction
//! collaborator: UTF-8, possibly empty for blank pages, ordered by physical
//! page sequence.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single page of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 0-based physical page index.
    pub physical_index: usize,
    /// Text content of the page. May be empty for blank pages.
    pub content: String,
}

impl Page {
    /// Create a new page.
    pub fn new(physical_index: usize, content: String) -> Self {
        Self {
            physical_index,
            content,
        }
    }
}

/// A document consisting of ordered pages of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document name/title.
    pub name: String,
    /// Original file path (if loaded from file).
    pub path: Option<PathBuf>,
    /// Pages in physical order.
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a document from per-page texts in physical order.
    pub fn from_pages(name: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, content)| Page::new(i, content))
                .collect(),
        }
    }

    /// Load a text file, splitting pages on a delimiter (form feed by default
    /// in the CLI). Blank pages are kept so physical indices stay aligned
    /// with the source.
    pub fn from_text_file(path: &Path, delimiter: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        let pages: Vec<String> = content.split(delimiter).map(|s| s.to_string()).collect();

        Ok(Self {
            path: Some(path.to_path_buf()),
            ..Self::from_pages(name, pages)
        })
    }

    /// Get total number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when every page is blank.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.content.trim().is_empty())
    }
}
