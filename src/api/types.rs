use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::index::{DocId, Weight};
use crate::query::SearchHit;

/// Request to feed one document into the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedDocumentRequest {
    pub doc_id: DocId,
    /// space name -> feature key -> weight
    pub features: HashMap<String, HashMap<String, Weight>>,
    /// Seconds until the document's postings expire; the configured
    /// default applies when absent
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Response after a document was accepted by the update pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedDocumentResponse {
    pub doc_id: DocId,
    /// Number of per-term events the document resolved to
    pub events: usize,
}

/// Ranked query request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryApiRequest {
    /// space name -> feature key -> weight
    pub features: HashMap<String, HashMap<String, Weight>>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Documents to exclude from the result
    #[serde(default)]
    pub exclude_docs: Vec<DocId>,
}

fn default_top_k() -> usize {
    10
}

/// Ranked query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub hits: Vec<SearchHit>,
    pub took_ms: u64,
}

/// Response after a forced snapshot dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub bytes_written: u64,
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub postings: usize,
    pub terms: usize,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
