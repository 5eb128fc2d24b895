//! Session protocol tests with a backend whose responses the test releases
//! by hand, so completion order can differ from submission order.

use async_trait::async_trait;
use doc_answerer::api::Backend;
use doc_answerer::error::{ClientError, ClientResult};
use doc_answerer::models::{DocInfo, HistoryEntry, IngestSummary, QaRecord, UploadFile};
use doc_answerer::progress::{SessionEvent, SessionObserver, View};
use doc_answerer::session::{ClientSession, Trigger};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::oneshot;

type Reply = Result<Value, u16>;

/// Backend that parks every call until the test resolves it, unless an
/// automatic reply is registered for that call name.
#[derive(Default)]
struct GatedBackend {
    calls: Mutex<Vec<String>>,
    uploads: Mutex<Vec<Vec<String>>>,
    pending: Mutex<Vec<(String, oneshot::Sender<Reply>)>>,
    auto: Mutex<HashMap<String, Reply>>,
}

impl GatedBackend {
    fn auto_reply(&self, name: &str, reply: Reply) {
        self.auto.lock().unwrap().insert(name.to_string(), reply);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    async fn wait_pending(&self, n: usize) {
        loop {
            let parked = self.pending.lock().unwrap().len();
            if parked >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Release the oldest parked call named `name`.
    fn resolve(&self, name: &str, reply: Reply) {
        let mut pending = self.pending.lock().unwrap();
        let i = pending
            .iter()
            .position(|(n, _)| n == name)
            .unwrap_or_else(|| panic!("no pending call {}", name));
        let (_, tx) = pending.remove(i);
        let _ = tx.send(reply);
    }

    async fn call<T: DeserializeOwned>(&self, name: String) -> ClientResult<T> {
        self.calls.lock().unwrap().push(name.clone());
        let auto = self.auto.lock().unwrap().get(&name).cloned();
        let reply = match auto {
            Some(reply) => reply,
            None => {
                let (tx, rx) = oneshot::channel();
                self.pending.lock().unwrap().push((name, tx));
                rx.await.expect("test dropped a pending call")
            }
        };
        match reply {
            Ok(v) => Ok(serde_json::from_value(v)?),
            Err(status) => Err(ClientError::Status {
                status,
                detail: None,
            }),
        }
    }
}

#[async_trait]
impl Backend for GatedBackend {
    async fn ingest(&self, files: Vec<UploadFile>) -> ClientResult<IngestSummary> {
        self.uploads
            .lock()
            .unwrap()
            .push(files.into_iter().map(|f| f.file_name).collect());
        self.call("ingest".to_string()).await
    }

    async fn ask(&self, question: &str) -> ClientResult<QaRecord> {
        let _ = question;
        self.call("ask".to_string()).await
    }

    async fn list_history(&self) -> ClientResult<Vec<HistoryEntry>> {
        self.call("history".to_string()).await
    }

    async fn get_history(&self, id: &str) -> ClientResult<QaRecord> {
        self.call(format!("history/{}", id)).await
    }

    async fn list_docs(&self) -> ClientResult<Vec<DocInfo>> {
        self.call("docs".to_string()).await
    }

    async fn delete_doc(&self, id: &str) -> ClientResult<()> {
        let _: Value = self.call(format!("delete/{}", id)).await?;
        Ok(())
    }

    async fn health(&self) -> ClientResult<String> {
        self.call("health".to_string()).await
    }
}

#[derive(Clone, Default)]
struct RecordingObserver {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn report(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn qa(id: &str, answer: &str) -> Value {
    json!({
        "id": id,
        "question": format!("question {}", id),
        "answer": answer,
        "citations": [{"doc_id": "d1"}],
        "snippets": [
            {"language": "curl", "code": format!("curl {}", id)},
            {"language": "python", "code": format!("python {}", id)}
        ]
    })
}

fn history_list() -> Value {
    json!([
        {"id": "b", "question": "question b", "created_at": "2024-05-02T00:00:00"},
        {"id": "a", "question": "question a", "created_at": "2024-05-01T00:00:00"}
    ])
}

fn setup() -> (Arc<GatedBackend>, RecordingObserver, ClientSession) {
    let backend = Arc::new(GatedBackend::default());
    let observer = RecordingObserver::default();
    let session = ClientSession::new(
        backend.clone(),
        Box::new(observer.clone()),
        "How do I create an invoice?",
    );
    (backend, observer, session)
}

fn json_files(tmp: &TempDir, names: &[&str]) -> Vec<std::path::PathBuf> {
    names
        .iter()
        .map(|n| {
            let p = tmp.path().join(n);
            std::fs::write(&p, "{}").unwrap();
            p
        })
        .collect()
}

#[tokio::test]
async fn later_history_selection_wins_even_if_resolved_first() {
    let (backend, observer, session) = setup();

    let (first, second, _) = tokio::join!(
        session.select_history("a"),
        session.select_history("b"),
        async {
            backend.wait_pending(2).await;
            backend.resolve("history/b", Ok(qa("b", "answer b")));
            tokio::task::yield_now().await;
            backend.resolve("history/a", Ok(qa("a", "answer a")));
        }
    );

    assert_eq!(first, Trigger::Stale);
    assert_eq!(second, Trigger::Applied { ok: true });
    let shown = session.with_history(|h| h.panel().unwrap().qa().answer.clone());
    assert_eq!(shown, "answer b");
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, SessionEvent::StaleDiscarded { view: View::HistoryDetail, .. })));
}

#[tokio::test]
async fn older_selection_resolving_last_does_not_overwrite() {
    let (backend, _observer, session) = setup();

    let (first, second, _) = tokio::join!(
        session.select_history("a"),
        session.select_history("b"),
        async {
            backend.wait_pending(2).await;
            backend.resolve("history/a", Err(500));
            tokio::task::yield_now().await;
            backend.resolve("history/b", Ok(qa("b", "answer b")));
        }
    );

    assert_eq!(first, Trigger::Stale);
    assert!(second.is_ok());
    assert!(session.failure(View::HistoryDetail).is_none());
}

#[tokio::test]
async fn ask_refuses_second_trigger_while_loading() {
    let (backend, _observer, session) = setup();

    let (first, second) = tokio::join!(session.ask("first question"), async {
        backend.wait_pending(1).await;
        let second = session.ask("second question").await;
        backend.resolve("ask", Ok(qa("q1", "first answer")));
        second
    });

    assert_eq!(first, Trigger::Applied { ok: true });
    assert_eq!(second, Trigger::Busy);
    assert_eq!(backend.count("ask"), 1);
}

#[tokio::test]
async fn failed_ask_keeps_the_previous_answer() {
    let (backend, _observer, session) = setup();

    backend.auto_reply("ask", Ok(qa("q1", "first answer")));
    assert!(session.ask("How do I create an invoice?").await.is_ok());
    session.with_ask(|v| v.panel_mut().unwrap().select(1));

    backend.auto_reply("ask", Err(502));
    assert_eq!(
        session.ask("How do I void an invoice?").await,
        Trigger::Applied { ok: false }
    );

    let (answer, code) = session.with_ask(|v| {
        let panel = v.panel().unwrap();
        (panel.qa().answer.clone(), panel.active_code().to_string())
    });
    assert_eq!(answer, "first answer");
    assert_eq!(code, "python q1");
    assert_eq!(session.failure(View::Ask).as_deref(), Some("Ask failed: 502"));
}

#[tokio::test]
async fn new_answer_resets_the_active_tab() {
    let (backend, _observer, session) = setup();

    backend.auto_reply("ask", Ok(qa("q1", "one")));
    session.ask("one").await;
    session.with_ask(|v| v.panel_mut().unwrap().select_language("python"));

    backend.auto_reply("ask", Ok(qa("q2", "two")));
    session.ask("two").await;
    let (index, code) = session.with_ask(|v| {
        let p = v.panel().unwrap();
        (p.active_index(), p.active_code().to_string())
    });
    assert_eq!(index, Some(0));
    assert_eq!(code, "curl q2");
}

#[tokio::test]
async fn ask_current_uses_the_input_text() {
    let (backend, _observer, session) = setup();
    backend.auto_reply("ask", Ok(qa("q1", "one")));

    assert!(session.ask_current().await.is_ok());
    assert_eq!(
        session.with_ask(|v| v.question.clone()),
        "How do I create an invoice?"
    );

    session.with_ask(|v| v.question = "  ".to_string());
    assert_eq!(session.ask_current().await, Trigger::Skipped);
    assert_eq!(backend.count("ask"), 1);
}

#[tokio::test]
async fn ingest_signals_completion_once_on_success() {
    let (backend, observer, session) = setup();
    backend.auto_reply("ingest", Ok(json!({"doc_ids": ["d1", "d2"], "chunks_indexed": 5})));
    backend.auto_reply("history", Ok(history_list()));
    let tmp = TempDir::new().unwrap();
    let files = json_files(&tmp, &["a.json", "b.json"]);

    assert!(session.ingest(&files).await.is_ok());

    assert_eq!(backend.count("ingest"), 1);
    assert_eq!(
        backend.uploads.lock().unwrap()[0],
        vec!["a.json".to_string(), "b.json".to_string()]
    );
    let events = observer.events();
    let done: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::IngestDone { .. }))
        .collect();
    assert_eq!(done, vec![&SessionEvent::IngestDone { files: 2, ok: true }]);
    assert!(events.contains(&SessionEvent::HistoryRemounted { key: 1 }));
    assert_eq!(backend.count("history"), 1);
}

#[tokio::test]
async fn ingest_signals_completion_once_on_failure() {
    let (backend, observer, session) = setup();
    backend.auto_reply("ingest", Err(500));
    backend.auto_reply("history", Ok(history_list()));
    let tmp = TempDir::new().unwrap();
    let files = json_files(&tmp, &["a.json"]);

    assert_eq!(session.ingest(&files).await, Trigger::Applied { ok: false });
    assert_eq!(
        session.failure(View::Upload).as_deref(),
        Some("Ingest failed: 500")
    );

    let done = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::IngestDone { .. }))
        .count();
    assert_eq!(done, 1);
    assert_eq!(backend.count("history"), 1);
}

#[tokio::test]
async fn unreadable_file_fails_without_a_request_but_still_completes() {
    let (backend, observer, session) = setup();
    backend.auto_reply("history", Ok(history_list()));
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("vanished.json");

    assert_eq!(
        session.ingest(&[missing]).await,
        Trigger::Applied { ok: false }
    );
    assert_eq!(backend.count("ingest"), 0);
    assert!(session
        .failure(View::Upload)
        .unwrap()
        .contains("vanished.json"));
    assert!(observer
        .events()
        .contains(&SessionEvent::IngestDone { files: 1, ok: false }));
    assert_eq!(session.history_key(), 1);
}

#[tokio::test]
async fn empty_file_set_issues_nothing() {
    let (backend, observer, session) = setup();
    assert_eq!(session.ingest(&[]).await, Trigger::Skipped);
    assert!(backend.calls().is_empty());
    assert!(observer.events().is_empty());
    assert_eq!(session.history_key(), 0);
}

#[tokio::test]
async fn upload_refuses_second_trigger_while_loading() {
    let (backend, _observer, session) = setup();
    backend.auto_reply("history", Ok(history_list()));
    let tmp = TempDir::new().unwrap();
    let files = json_files(&tmp, &["a.json"]);

    let (first, second) = tokio::join!(session.ingest(&files), async {
        backend.wait_pending(1).await;
        let second = session.ingest(&files).await;
        backend.resolve("ingest", Ok(json!({})));
        second
    });

    assert!(first.is_ok());
    assert_eq!(second, Trigger::Busy);
    assert_eq!(backend.count("ingest"), 1);
}

#[tokio::test]
async fn remount_discards_detail_and_in_flight_selection() {
    let (backend, _observer, session) = setup();
    backend.auto_reply("history", Ok(history_list()));
    backend.auto_reply("history/a", Ok(qa("a", "answer a")));

    session.show_history().await;
    session.select_history("a").await;
    assert!(session.with_history(|h| h.panel().is_some()));

    let (selection, remount) = tokio::join!(session.select_history("b"), async {
        backend.wait_pending(1).await;
        let remount = session.remount_history().await;
        backend.resolve("history/b", Ok(qa("b", "answer b")));
        remount
    });

    assert_eq!(selection, Trigger::Stale);
    assert!(remount.is_ok());
    assert_eq!(session.history_key(), 1);
    session.with_history(|h| {
        assert_eq!(h.key, 1);
        assert!(h.panel().is_none());
        assert!(h.selected.is_none());
        assert_eq!(h.entries().len(), 2);
    });
    assert_eq!(backend.count("history"), 2);
}

#[tokio::test]
async fn delete_removes_entry_from_loaded_catalogue() {
    let (backend, _observer, session) = setup();
    backend.auto_reply(
        "docs",
        Ok(json!([
            {"id": "d1", "name": "a.json", "type": "openapi"},
            {"id": "d2", "name": "b.json", "type": "openapi"}
        ])),
    );
    backend.auto_reply("delete/d2", Ok(json!({"status": "deleted", "id": "d2"})));

    session.load_docs().await;
    assert!(session.delete_doc("d2").await.is_ok());
    assert_eq!(session.with_docs(|d| d.docs().len()), 1);
    assert_eq!(session.delete_doc("  ").await, Trigger::Skipped);
}

#[tokio::test]
async fn dismiss_all_clears_every_failure() {
    let (backend, _observer, session) = setup();
    backend.auto_reply("ask", Err(500));
    backend.auto_reply("history", Err(503));

    session.ask("q").await;
    session.show_history().await;
    assert!(session.failure(View::Ask).is_some());
    assert!(session.failure(View::HistoryList).is_some());

    session.dismiss_all();
    assert!(session.failure(View::Ask).is_none());
    assert!(session.failure(View::HistoryList).is_none());
}
