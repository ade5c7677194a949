//! Result payloads and vector encoding for the index

use serde::{Deserialize, Serialize};

/// Metadata stored with each chunk in the content collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub course_title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<i64>,

    pub chunk_index: i64,
}

/// Results of a content search.
///
/// `documents`, `metadata`, and `distances` are parallel sequences. When
/// `error` is set the other fields are empty and must not be interpreted;
/// an empty result with no error means "nothing matched", which is a valid
/// outcome distinct from failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkPayload>,
    pub distances: Vec<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResults {
    /// A result carrying only an error message
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when the search ran and matched nothing
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.documents.is_empty()
    }
}

/// Encode an embedding as little-endian bytes for BLOB storage
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

/// Decode a BLOB back into an embedding
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity between two vectors; 0.0 when either is empty or zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
