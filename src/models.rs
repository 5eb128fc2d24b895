//! Wire types exchanged with the answering backend.
//!
//! Every type here mirrors a JSON shape returned (or accepted) by the
//! backend's HTTP API. Records are immutable once decoded: views own them
//! and only keep view state (active tab, selection) next to them.

use serde::{Deserialize, Serialize};

/// A reference to a source document backing part of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    #[serde(default)]
    pub fragment: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// One code example in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub language: String,
    pub code: String,
}

/// The backend's structured answer to a question.
///
/// `id` is `null` when the backend could not ground an answer in any
/// indexed document; such records are displayed but cannot be reopened
/// from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    /// Present on records fetched through `/history/{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Summary projection of a [`QaRecord`] as listed by `GET /history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub question: String,
    pub created_at: String,
}

/// Body of a successful `POST /ingest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    #[serde(default)]
    pub doc_ids: Vec<String>,
    #[serde(default)]
    pub chunks_indexed: u64,
}

/// An ingested document as listed by `GET /docs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request body for `POST /qa`.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest<'a> {
    pub question: &'a str,
}

/// A local file prepared for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}
