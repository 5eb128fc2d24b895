//! Session progress reporting.
//!
//! The session reports request lifecycle events (started, finished, stale
//! responses dropped) plus the two cross-view signals: ingestion done and
//! history remounted. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// The view a request belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum View {
    Upload,
    Ask,
    HistoryList,
    HistoryDetail,
    DocsList,
    DocsDelete,
}

impl View {
    /// Short machine-friendly name.
    pub fn name(&self) -> &'static str {
        match self {
            View::Upload => "ingest",
            View::Ask => "ask",
            View::HistoryList => "history",
            View::HistoryDetail => "history_item",
            View::DocsList => "docs",
            View::DocsDelete => "docs_delete",
        }
    }

    /// Operation label used in the failure line: `"<label> failed: ..."`.
    pub fn operation(&self) -> &'static str {
        match self {
            View::Upload => "Ingest",
            View::Ask => "Ask",
            View::HistoryList => "History",
            View::HistoryDetail => "History item",
            View::DocsList => "Docs",
            View::DocsDelete => "Delete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    RequestStarted { view: View, seq: u64 },
    RequestFinished { view: View, seq: u64, ok: bool },
    /// A response arrived for a request that a newer one superseded.
    StaleDiscarded { view: View, seq: u64 },
    /// An ingestion submission completed, successfully or not.
    IngestDone { files: usize, ok: bool },
    /// The history view was replaced and will refetch.
    HistoryRemounted { key: u64 },
}

/// Receives session events. Implementations write to stderr (human or JSON).
pub trait SessionObserver: Send + Sync {
    fn report(&self, event: SessionEvent);
}

/// Human-friendly progress on stderr: `ask  loading  #12`.
pub struct StderrProgress;

impl SessionObserver for StderrProgress {
    fn report(&self, event: SessionEvent) {
        let line = match &event {
            SessionEvent::RequestStarted { view, seq } => {
                format!("{}  loading  #{}\n", view.name(), seq)
            }
            SessionEvent::RequestFinished { view, seq, ok } => {
                let outcome = if *ok { "done" } else { "failed" };
                format!("{}  {}  #{}\n", view.name(), outcome, seq)
            }
            SessionEvent::StaleDiscarded { view, seq } => {
                format!("{}  stale response #{} dropped\n", view.name(), seq)
            }
            SessionEvent::IngestDone { files, ok } => {
                let outcome = if *ok { "ok" } else { "failed" };
                format!("ingest  {} {}  {}\n", files, plural(*files, "file"), outcome)
            }
            SessionEvent::HistoryRemounted { key } => {
                format!("history  refreshing (v{})\n", key)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SessionObserver for JsonProgress {
    fn report(&self, event: SessionEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &SessionEvent) -> serde_json::Value {
    match event {
        SessionEvent::RequestStarted { view, seq } => serde_json::json!({
            "event": "request",
            "view": view.name(),
            "phase": "loading",
            "seq": seq
        }),
        SessionEvent::RequestFinished { view, seq, ok } => serde_json::json!({
            "event": "request",
            "view": view.name(),
            "phase": if *ok { "success" } else { "failure" },
            "seq": seq
        }),
        SessionEvent::StaleDiscarded { view, seq } => serde_json::json!({
            "event": "request",
            "view": view.name(),
            "phase": "stale",
            "seq": seq
        }),
        SessionEvent::IngestDone { files, ok } => serde_json::json!({
            "event": "ingest_done",
            "files": files,
            "ok": ok
        }),
        SessionEvent::HistoryRemounted { key } => serde_json::json!({
            "event": "history_remounted",
            "key": key
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SessionObserver for NoProgress {
    fn report(&self, _event: SessionEvent) {}
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse the `--progress` flag value.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "auto" => Ok(Self::default_for_tty()),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            "off" => Ok(ProgressMode::Off),
            other => Err(format!(
                "unknown progress mode '{}': use auto, human, json, or off",
                other
            )),
        }
    }

    pub fn observer(&self) -> Box<dyn SessionObserver> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
