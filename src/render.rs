//! Plain-text rendering of views.
//!
//! Every renderer returns a `String` so the CLI, the shell, and tests share
//! one presentation. Failures of every request type go through
//! [`failure_line`].

use chrono::{DateTime, NaiveDateTime};

use crate::error::ClientError;
use crate::models::{Citation, DocInfo, HistoryEntry, IngestSummary};
use crate::progress::View;
use crate::snippets::QaPanel;

/// The single failure rule: `"<Operation> failed: <error>"`, followed by
/// the backend's detail message on its own line when there is one.
pub fn failure_line(view: View, err: &ClientError) -> String {
    let mut line = format!("{} failed: {}", view.operation(), err);
    if let Some(detail) = err.detail() {
        line.push_str("\n  ");
        line.push_str(detail);
    }
    line
}

/// Label shown on a trigger while its request is in flight.
pub fn loading_label(view: View) -> &'static str {
    match view {
        View::Upload => "Ingesting…",
        View::Ask => "Thinking…",
        View::DocsDelete => "Deleting…",
        View::HistoryList | View::HistoryDetail | View::DocsList => "Loading…",
    }
}

pub fn citation_line(c: &Citation) -> String {
    match c.fragment.as_deref().filter(|f| !f.is_empty()) {
        Some(fragment) => format!("Doc {} — {}", c.doc_id, fragment),
        None => format!("Doc {}", c.doc_id),
    }
}

/// Answer, citations, and the snippet tabs with the active code below.
pub fn render_qa(panel: &QaPanel) -> String {
    let qa = panel.qa();
    let mut out = String::new();

    out.push_str("Answer\n");
    out.push_str(qa.answer.trim_end());
    out.push_str("\n\nCitations\n");
    if qa.citations.is_empty() {
        out.push_str("  (none)\n");
    }
    for c in &qa.citations {
        out.push_str("  - ");
        out.push_str(&citation_line(c));
        out.push('\n');
    }

    out.push_str("\nCode\n");
    if panel.active_index().is_none() {
        out.push_str("  (no snippets)\n");
        return out;
    }
    let tabs: Vec<String> = panel
        .tabs()
        .map(|t| {
            if t.active {
                format!("[{}]", t.language)
            } else {
                format!(" {} ", t.language)
            }
        })
        .collect();
    out.push_str(&tabs.join(" "));
    out.push_str("\n\n");
    out.push_str(panel.active_code().trim_end());
    out.push('\n');
    out
}

/// Numbered list in backend order; `#n` is accepted by `open`.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history.\n".to_string();
    }
    let mut out = String::new();
    for (i, e) in entries.iter().enumerate() {
        out.push_str(&format!(
            "#{:<3} {:<16}  {}  ({})\n",
            i + 1,
            format_timestamp(&e.created_at),
            e.question,
            e.id
        ));
    }
    out
}

pub fn render_docs(docs: &[DocInfo]) -> String {
    if docs.is_empty() {
        return "No documents.\n".to_string();
    }
    let mut out = format!("{:<26} {:<9} {:<16}  NAME\n", "ID", "TYPE", "CREATED");
    for d in docs {
        out.push_str(&format!(
            "{:<26} {:<9} {:<16}  {}\n",
            d.id,
            d.doc_type.as_deref().unwrap_or("-"),
            d.created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
            d.name.as_deref().unwrap_or("(unnamed)")
        ));
    }
    out
}

pub fn render_ingest(files: usize, summary: &IngestSummary) -> String {
    let mut out = format!(
        "ingested {} file{}: {} document{}, {} chunk{} indexed\n",
        files,
        if files == 1 { "" } else { "s" },
        summary.doc_ids.len(),
        if summary.doc_ids.len() == 1 { "" } else { "s" },
        summary.chunks_indexed,
        if summary.chunks_indexed == 1 { "" } else { "s" },
    );
    for id in &summary.doc_ids {
        out.push_str(&format!("  {}\n", id));
    }
    out
}

/// Shorten backend timestamps to `YYYY-MM-DD HH:MM`. The backend sends
/// ISO 8601 with or without an offset; anything else is shown verbatim.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}
