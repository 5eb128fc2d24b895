//! In-process mock of the answering backend.
//!
//! Serves the same routes as the real service from canned responses and
//! records every request, so tests can assert on exactly what the client
//! sent.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// One uploaded multipart part.
#[derive(Debug, Clone)]
pub struct Part {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct Recorded {
    /// `"METHOD /path"` in arrival order.
    pub requests: Vec<String>,
    /// Parts of each `/ingest` request.
    pub ingests: Vec<Vec<Part>>,
    /// JSON bodies posted to `/qa`.
    pub questions: Vec<Value>,
}

impl Recorded {
    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == request).count()
    }
}

#[derive(Clone)]
pub struct MockConfig {
    pub ingest_status: u16,
    pub qa_status: u16,
    pub qa: Value,
    pub history_status: u16,
    pub history: Value,
    pub details: HashMap<String, Value>,
    pub docs: Value,
}

impl Default for MockConfig {
    fn default() -> Self {
        let mut details = HashMap::new();
        details.insert("q1".to_string(), invoice_qa());
        details.insert(
            "q0".to_string(),
            json!({
                "id": "q0",
                "question": "How do I list customers?",
                "answer": "Use GET /customers",
                "citations": [{"doc_id": "d1", "fragment": "/customers", "score": 0.82}],
                "snippets": [
                    {"language": "curl", "code": "curl https://api.example.com/customers"},
                    {"language": "python", "code": "requests.get(url)"}
                ],
                "created_at": "2024-05-01T09:00:00"
            }),
        );
        Self {
            ingest_status: 200,
            qa_status: 200,
            qa: invoice_qa(),
            history_status: 200,
            history: json!([
                {"id": "q1", "question": "How do I create an invoice?", "created_at": "2024-05-02T10:00:00"},
                {"id": "q0", "question": "How do I list customers?", "created_at": "2024-05-01T09:00:00"}
            ]),
            details,
            docs: json!([
                {"id": "d1", "name": "openapi.json", "type": "openapi", "created_at": "2024-05-01 08:00:00+00:00"},
                {"id": "d2", "name": "billing.json", "type": "openapi", "created_at": "2024-05-01 08:05:00+00:00"}
            ]),
        }
    }
}

pub fn invoice_qa() -> Value {
    json!({
        "id": "q1",
        "question": "How do I create an invoice?",
        "answer": "Use POST /invoices",
        "citations": [{"doc_id": "d1", "fragment": "see sec 3"}],
        "snippets": [{"language": "curl", "code": "curl -X POST ..."}]
    })
}

#[derive(Clone)]
struct MockState {
    config: Arc<MockConfig>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockState {
    fn log(&self, request: String) {
        self.recorded.lock().unwrap().requests.push(request);
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub recorded: Arc<Mutex<Recorded>>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn(config: MockConfig) -> MockBackend {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let state = MockState {
        config: Arc::new(config),
        recorded: recorded.clone(),
    };

    let app = Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/qa", post(handle_qa))
        .route("/history", get(handle_history))
        .route("/history/{id}", get(handle_history_item))
        .route("/docs", get(handle_docs))
        .route("/docs/{id}", delete(handle_delete_doc))
        .route("/health", get(handle_health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockBackend {
        base_url: format!("http://{}", addr),
        recorded,
        handle,
    }
}

fn reply(status: u16, body: Value) -> Response {
    (StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
}

async fn handle_ingest(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    state.log("POST /ingest".to_string());

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let body = String::from_utf8_lossy(&field.bytes().await.unwrap()).to_string();
        parts.push(Part {
            field: field_name,
            file_name,
            content_type,
            body,
        });
    }
    let count = parts.len();
    state.recorded.lock().unwrap().ingests.push(parts);

    let status = state.config.ingest_status;
    if (200..300).contains(&status) {
        let ids: Vec<String> = (0..count).map(|i| format!("doc{}", i + 1)).collect();
        reply(status, json!({"doc_ids": ids, "chunks_indexed": count * 3}))
    } else {
        reply(status, json!({"detail": "Only JSON is supported. Invalid file: notes.txt"}))
    }
}

async fn handle_qa(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.log("POST /qa".to_string());
    state.recorded.lock().unwrap().questions.push(body);
    reply(state.config.qa_status, state.config.qa.clone())
}

async fn handle_history(State(state): State<MockState>) -> Response {
    state.log("GET /history".to_string());
    reply(state.config.history_status, state.config.history.clone())
}

async fn handle_history_item(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    state.log(format!("GET /history/{}", id));
    match state.config.details.get(&id) {
        Some(qa) => reply(200, qa.clone()),
        None => reply(404, json!({"detail": "not found"})),
    }
}

async fn handle_docs(State(state): State<MockState>) -> Response {
    state.log("GET /docs".to_string());
    reply(200, state.config.docs.clone())
}

async fn handle_delete_doc(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    state.log(format!("DELETE /docs/{}", id));
    if id == "missing" {
        return reply(404, json!({"detail": "not found"}));
    }
    reply(200, json!({"status": "deleted", "id": id}))
}

async fn handle_health(State(state): State<MockState>) -> Response {
    state.log("GET /health".to_string());
    reply(200, json!({"status": "ok"}))
}
