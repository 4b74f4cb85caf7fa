//! Per-source reconstruction of documents from flat chunk records.

use std::collections::HashMap;

use ragline_memory::{DocumentSet, Metadata};
use serde::Serialize;
use serde_json::Value;

const EXCLUDED_KEYS: [&str; 2] = ["chunk_id", "source_file"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceChunk {
    pub content: String,
    pub chunk_id: Option<u64>,
    pub id: String,
}

/// All stored chunks that came from one original document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceGroup {
    pub source: String,
    pub chunks: Vec<SourceChunk>,
    pub metadata: Metadata,
    pub total_chunks: usize,
}

/// Group a full scan by source label, in first-seen order.
///
/// The label is taken from `source_file`, then `source`, then
/// `Document {n}` with the chunk's 1-based scan position, and is reduced to
/// its bare file name. Chunks are ordered by `chunk_id`; those without one
/// follow in scan order.
#[must_use]
pub fn group_by_source(set: &DocumentSet) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let empty = Metadata::new();
    for (position, (id, content)) in set.ids.iter().zip(&set.documents).enumerate() {
        let metadata = set.metadatas.get(position).unwrap_or(&empty);
        let source = file_name(&source_label(metadata, position + 1)).to_owned();

        let slot = *index.entry(source.clone()).or_insert_with(|| {
            groups.push(SourceGroup {
                source,
                chunks: Vec::new(),
                metadata: Metadata::new(),
                total_chunks: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];

        for (key, value) in metadata {
            if !EXCLUDED_KEYS.contains(&key.as_str()) && is_truthy(value) {
                group.metadata.insert(key.clone(), value.clone());
            }
        }
        group.chunks.push(SourceChunk {
            content: content.clone(),
            chunk_id: metadata.get("chunk_id").and_then(Value::as_u64),
            id: id.clone(),
        });
    }

    for group in &mut groups {
        group.chunks.sort_by_key(|c| c.chunk_id.unwrap_or(u64::MAX));
        group.total_chunks = group.chunks.len();
    }

    groups
}

fn source_label(metadata: &Metadata, position: usize) -> String {
    ["source_file", "source"]
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find(|v| is_truthy(v))
        .map_or_else(
            || format!("Document {position}"),
            |v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        )
}

fn file_name(label: &str) -> &str {
    match label.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name,
        _ => label,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
