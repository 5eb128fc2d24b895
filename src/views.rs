//! Per-view state owned by a [`ClientSession`](crate::session::ClientSession).
//!
//! Views hold no network code. Each one wraps the [`RequestSlot`]s for the
//! requests it can trigger plus whatever local state it displays.

use crate::models::{DocInfo, HistoryEntry, IngestSummary};
use crate::request::RequestSlot;
use crate::snippets::QaPanel;

/// Document upload form.
#[derive(Debug, Default)]
pub struct UploadView {
    pub slot: RequestSlot<IngestSummary>,
    /// Number of files in the most recent submission.
    pub last_batch: usize,
}

/// Question form with the latest answer shown inline.
#[derive(Debug)]
pub struct AskView {
    /// Current text of the question input.
    pub question: String,
    pub slot: RequestSlot<QaPanel>,
}

impl AskView {
    pub fn new(initial_question: impl Into<String>) -> Self {
        Self {
            question: initial_question.into(),
            slot: RequestSlot::new(),
        }
    }

    pub fn panel(&self) -> Option<&QaPanel> {
        self.slot.value()
    }

    pub fn panel_mut(&mut self) -> Option<&mut QaPanel> {
        self.slot.value_mut()
    }
}

/// History list with one lazily fetched detail record.
///
/// A new `HistoryView` is created on every remount; `key` is the version
/// it was mounted under.
#[derive(Debug)]
pub struct HistoryView {
    pub key: u64,
    pub list: RequestSlot<Vec<HistoryEntry>>,
    pub detail: RequestSlot<QaPanel>,
    /// Id of the most recently selected entry.
    pub selected: Option<String>,
}

impl HistoryView {
    pub fn new(key: u64) -> Self {
        Self {
            key,
            list: RequestSlot::new(),
            detail: RequestSlot::new(),
            selected: None,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.list.value().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether showing the view should trigger the list fetch: never
    /// fetched yet, or the last attempt failed.
    pub fn needs_fetch(&self) -> bool {
        if self.list.is_loading() {
            return false;
        }
        !self.list.has_settled() || self.list.error().is_some()
    }

    /// Resolve a `#n` position (1-based) or a literal id.
    pub fn resolve_id(&self, reference: &str) -> Option<String> {
        if let Some(pos) = reference.strip_prefix('#') {
            let n: usize = pos.parse().ok()?;
            return self
                .entries()
                .get(n.checked_sub(1)?)
                .map(|e| e.id.clone());
        }
        if reference.is_empty() {
            None
        } else {
            Some(reference.to_string())
        }
    }

    pub fn panel(&self) -> Option<&QaPanel> {
        self.detail.value()
    }

    pub fn panel_mut(&mut self) -> Option<&mut QaPanel> {
        self.detail.value_mut()
    }
}

/// Ingested document catalogue.
#[derive(Debug, Default)]
pub struct DocsView {
    pub list: RequestSlot<Vec<DocInfo>>,
    /// Id of the last deleted document.
    pub delete: RequestSlot<String>,
}

impl DocsView {
    pub fn docs(&self) -> &[DocInfo] {
        self.list.value().map(Vec::as_slice).unwrap_or(&[])
    }
}
