//! Lexical passage index (BM25 via tantivy, held in RAM).

use crate::chunker::Passage;
use crate::error::{RagError, Result};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{INDEXED, STORED, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, doc};

/// BM25 index over a passage corpus. Built in RAM and rebuilt wholesale on
/// every document upload; nothing is persisted.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    content_field: tantivy::schema::Field,
    ordinal_field: tantivy::schema::Field,
}

impl LexicalIndex {
    /// Build the index from the ordered passage corpus.
    pub fn build(passages: &[Passage]) -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let ordinal_field = schema_builder.add_u64_field("ordinal", INDEXED | STORED);
        let content_field = schema_builder.add_text_field("content", TEXT);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);

        let mut writer: tantivy::IndexWriter = index.writer(50_000_000)?;
        for passage in passages {
            writer.add_document(doc!(
                ordinal_field => passage.ordinal as u64,
                content_field => passage.content.clone(),
            ))?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        // Make the committed segment visible before the first query.
        reader.reload()?;

        tracing::debug!(passages = passages.len(), "lexical index built");

        Ok(Self {
            index,
            reader,
            content_field,
            ordinal_field,
        })
    }

    /// Top-k passage ordinals for a query, best first. Queries are parsed
    /// leniently: clinical text is full of characters the query grammar
    /// would otherwise reject (slashes, parentheses, units).
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<usize>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let (parsed, _errors) = parser.parse_query_lenient(query);

        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(k))?;

        let mut ranked: Vec<(f32, usize)> = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let stored: TantivyDocument = searcher.doc(address)?;
            let ordinal = stored
                .get_first(self.ordinal_field)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| RagError::Index("ordinal missing from stored doc".to_string()))?;
            ranked.push((score, ordinal as usize));
        }

        // Equal scores fall back to corpus order so results are stable.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(ranked.into_iter().map(|(_, ordinal)| ordinal).collect())
    }
}
