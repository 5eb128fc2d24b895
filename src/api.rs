//! HTTP access to the answering backend.
//!
//! [`Backend`] is the seam between the session's views and the network.
//! [`HttpBackend`] is the production implementation over `reqwest`; tests
//! substitute in-memory implementations to control response order.
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `POST` | `/ingest` | upload (multipart, repeated `files` field) |
//! | `POST` | `/qa` | ask (`{"question": ...}`) |
//! | `GET` | `/history` | history list |
//! | `GET` | `/history/{id}` | history detail |
//! | `GET` | `/docs` | document catalogue |
//! | `DELETE` | `/docs/{id}` | document catalogue |
//! | `GET` | `/health` | `dqa health` |
//!
//! Only a 2xx status counts as success. Anything else becomes
//! [`ClientError::Status`] carrying the backend's `detail` message when the
//! body has one. Requests are never retried.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::{BackendConfig, Config};
use crate::error::{ClientError, ClientResult};
use crate::models::{DocInfo, HistoryEntry, IngestSummary, QaRecord, QuestionRequest, UploadFile};

/// Multipart field name shared by every uploaded file.
pub const INGEST_FIELD: &str = "files";

/// Operations the backend exposes to the client.
///
/// Each call issues exactly one request. Implementations must not retry,
/// cache, or reorder calls; the session relies on one call per trigger.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload a batch of files for indexing.
    async fn ingest(&self, files: Vec<UploadFile>) -> ClientResult<IngestSummary>;

    /// Ask a question and receive the structured answer.
    async fn ask(&self, question: &str) -> ClientResult<QaRecord>;

    /// List past questions, in backend order.
    async fn list_history(&self) -> ClientResult<Vec<HistoryEntry>>;

    /// Fetch one past answer by id.
    async fn get_history(&self, id: &str) -> ClientResult<QaRecord>;

    async fn list_docs(&self) -> ClientResult<Vec<DocInfo>>;

    async fn delete_doc(&self, id: &str) -> ClientResult<()>;

    /// Returns the backend's reported status string (normally `"ok"`).
    async fn health(&self) -> ClientResult<String>;
}

/// [`Backend`] implementation speaking HTTP/JSON to a configured base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    /// Build a client for the given backend settings.
    ///
    /// The base URL comes from configuration only; this constructor never
    /// reads the environment.
    pub fn new(config: &BackendConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("dqa/{}", env!("CARGO_PKG_VERSION")));

        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    /// The base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an endpoint below the base URL. Each segment is
    /// percent-encoded on its own, so ids can never escape their segment.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        decode(check_status(resp).await?).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn ingest(&self, files: Vec<UploadFile>) -> ClientResult<IngestSummary> {
        let url = self.endpoint(&["ingest"])?;
        tracing::debug!(%url, files = files.len(), "POST multipart");

        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(file.content_type)?;
            form = form.part(INGEST_FIELD, part);
        }

        let resp = self.client.post(url).multipart(form).send().await?;
        let resp = check_status(resp).await?;

        // The summary is informational; a 2xx with an unexpected body is
        // still a successful ingest.
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    async fn ask(&self, question: &str) -> ClientResult<QaRecord> {
        let url = self.endpoint(&["qa"])?;
        tracing::debug!(%url, "POST json");
        let resp = self
            .client
            .post(url)
            .json(&QuestionRequest { question })
            .send()
            .await?;
        decode(check_status(resp).await?).await
    }

    async fn list_history(&self) -> ClientResult<Vec<HistoryEntry>> {
        self.get_json(&["history"]).await
    }

    async fn get_history(&self, id: &str) -> ClientResult<QaRecord> {
        self.get_json(&["history", id]).await
    }

    async fn list_docs(&self) -> ClientResult<Vec<DocInfo>> {
        self.get_json(&["docs"]).await
    }

    async fn delete_doc(&self, id: &str) -> ClientResult<()> {
        let url = self.endpoint(&["docs", id])?;
        tracing::debug!(%url, "DELETE");
        let resp = self.client.delete(url).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn health(&self) -> ClientResult<String> {
        let body: serde_json::Value = self.get_json(&["health"]).await?;
        Ok(body
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string())
    }
}

async fn check_status(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), "backend returned failure status");
    Err(ClientError::Status {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI reports `{"detail": "..."}` for handled errors and
/// `{"detail": [...]}` for validation errors; anything else is shown as
/// trimmed text.
fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            Some(other) => return Some(other.to_string()),
            None => {}
        }
    }
    const MAX: usize = 200;
    if trimmed.chars().count() > MAX {
        let cut: String = trimmed.chars().take(MAX).collect();
        Some(format!("{}...", cut))
    } else {
        Some(trimmed.to_string())
    }
}

/// CLI entry point for `dqa health`.
pub async fn run_health(config: &Config) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    match backend.health().await {
        Ok(status) => {
            println!("{} {}", backend.base_url(), status);
            Ok(())
        }
        Err(e) => {
            eprintln!("Health check failed: {}", e);
            if let Some(detail) = e.detail() {
                eprintln!("  {}", detail);
            }
            std::process::exit(1);
        }
    }
}
