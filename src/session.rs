//! The client session: every view plus the protocol that drives them.
//!
//! [`ClientSession`] owns one instance of each view and a [`Backend`].
//! Operations follow the same pattern:
//!
//! 1. Check the local guard (non-empty input) and take a [`Ticket`] from
//!    the view's slot. Ask, upload and delete refuse while loading; history
//!    selection supersedes the outstanding one instead.
//! 2. Await the backend call with no view lock held, so other views stay
//!    usable while one request is in flight.
//! 3. Hand the result back to the slot, which drops it if a newer request
//!    was issued in the meantime.
//!
//! Ingestion additionally signals completion on every outcome, which
//! remounts the history view and refetches its list.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::{Backend, HttpBackend};
use crate::config::Config;
use crate::error::ClientError;
use crate::models::UploadFile;
use crate::progress::{SessionEvent, SessionObserver, View};
use crate::request::{RequestSlot, Settled, Ticket};
use crate::selection::read_upload;
use crate::snippets::QaPanel;
use crate::views::{AskView, DocsView, HistoryView, UploadView};

/// Result of pulling a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Nothing to send (empty input, or already loaded); no request issued.
    Skipped,
    /// The view already has a request in flight; no request issued.
    Busy,
    /// The response was applied to the view.
    Applied { ok: bool },
    /// The response arrived after a newer request and was dropped.
    Stale,
}

impl Trigger {
    pub fn is_ok(&self) -> bool {
        matches!(self, Trigger::Applied { ok: true })
    }
}

pub struct ClientSession {
    backend: Arc<dyn Backend>,
    observer: Box<dyn SessionObserver>,
    upload: Mutex<UploadView>,
    ask: Mutex<AskView>,
    history: Mutex<HistoryView>,
    docs: Mutex<DocsView>,
    history_key: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ClientSession {
    pub fn new(
        backend: Arc<dyn Backend>,
        observer: Box<dyn SessionObserver>,
        initial_question: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            observer,
            upload: Mutex::new(UploadView::default()),
            ask: Mutex::new(AskView::new(initial_question)),
            history: Mutex::new(HistoryView::new(0)),
            docs: Mutex::new(DocsView::default()),
            history_key: AtomicU64::new(0),
        }
    }

    /// Session over HTTP using the backend settings in `config`.
    pub fn from_config(config: &Config, observer: Box<dyn SessionObserver>) -> Result<Self> {
        let backend = HttpBackend::new(&config.backend)?;
        Ok(Self::new(
            Arc::new(backend),
            observer,
            config.ask.default_question.clone(),
        ))
    }

    // ── view access ────────────────────────────────────────────────────

    pub fn with_upload<R>(&self, f: impl FnOnce(&mut UploadView) -> R) -> R {
        f(&mut lock(&self.upload))
    }

    pub fn with_ask<R>(&self, f: impl FnOnce(&mut AskView) -> R) -> R {
        f(&mut lock(&self.ask))
    }

    pub fn with_history<R>(&self, f: impl FnOnce(&mut HistoryView) -> R) -> R {
        f(&mut lock(&self.history))
    }

    pub fn with_docs<R>(&self, f: impl FnOnce(&mut DocsView) -> R) -> R {
        f(&mut lock(&self.docs))
    }

    /// Version key the current history view was mounted under.
    pub fn history_key(&self) -> u64 {
        self.history_key.load(Ordering::SeqCst)
    }

    // ── ingestion ──────────────────────────────────────────────────────

    /// Upload `files` as one multipart request.
    ///
    /// An empty list issues nothing. Otherwise, whatever the outcome
    /// (including unreadable local files), completion is signalled and the
    /// history view is remounted.
    pub async fn ingest(&self, files: &[PathBuf]) -> Trigger {
        if files.is_empty() {
            return Trigger::Skipped;
        }
        let begun = {
            let mut upload = lock(&self.upload);
            let begun = upload.slot.begin();
            if begun.is_ok() {
                upload.last_batch = files.len();
            }
            begun
        };
        let Ok(ticket) = begun else {
            return Trigger::Busy;
        };
        self.started(View::Upload, ticket);

        let outcome = match self.read_all(files).await {
            Ok(uploads) => self.backend.ingest(uploads).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "ingest failed");
        }
        let ok = outcome.is_ok();
        let settled = lock(&self.upload).slot.settle(ticket, outcome);
        let trigger = self.finished(View::Upload, ticket, settled, ok);

        self.observer.report(SessionEvent::IngestDone {
            files: files.len(),
            ok,
        });
        self.remount_history().await;
        trigger
    }

    async fn read_all(&self, files: &[PathBuf]) -> Result<Vec<UploadFile>, ClientError> {
        let mut uploads = Vec::with_capacity(files.len());
        for path in files {
            uploads.push(read_upload(path).await?);
        }
        Ok(uploads)
    }

    // ── asking ─────────────────────────────────────────────────────────

    /// Ask the question currently held in the ask view.
    pub async fn ask_current(&self) -> Trigger {
        let question = lock(&self.ask).question.clone();
        self.ask(&question).await
    }

    /// Ask `question`. Blank questions issue nothing. A failure keeps the
    /// previously displayed answer.
    pub async fn ask(&self, question: &str) -> Trigger {
        if question.trim().is_empty() {
            return Trigger::Skipped;
        }
        let begun = {
            let mut ask = lock(&self.ask);
            let begun = ask.slot.begin();
            if begun.is_ok() {
                ask.question = question.to_string();
            }
            begun
        };
        let Ok(ticket) = begun else {
            return Trigger::Busy;
        };
        self.started(View::Ask, ticket);

        let outcome = self.backend.ask(question).await.map(QaPanel::new);
        let ok = outcome.is_ok();
        let settled = lock(&self.ask).slot.settle(ticket, outcome);
        self.finished(View::Ask, ticket, settled, ok)
    }

    // ── history ────────────────────────────────────────────────────────

    /// Display the history view: fetch the list the first time (or after a
    /// failed attempt), otherwise do nothing.
    pub async fn show_history(&self) -> Trigger {
        let begun = {
            let mut history = lock(&self.history);
            if history.needs_fetch() {
                history.list.begin().ok()
            } else {
                None
            }
        };
        let Some(ticket) = begun else {
            return Trigger::Skipped;
        };
        self.started(View::HistoryList, ticket);

        let outcome = self.backend.list_history().await;
        let ok = outcome.is_ok();
        let settled = lock(&self.history).list.settle(ticket, outcome);
        self.finished(View::HistoryList, ticket, settled, ok)
    }

    /// Fetch the full record for `id` and show it as the detail. Every
    /// call issues a fresh request; a newer selection wins.
    pub async fn select_history(&self, id: &str) -> Trigger {
        if id.trim().is_empty() {
            return Trigger::Skipped;
        }
        let ticket = {
            let mut history = lock(&self.history);
            history.selected = Some(id.to_string());
            history.detail.supersede()
        };
        self.started(View::HistoryDetail, ticket);

        let outcome = self.backend.get_history(id).await.map(QaPanel::new);
        let ok = outcome.is_ok();
        let settled = lock(&self.history).detail.settle(ticket, outcome);
        self.finished(View::HistoryDetail, ticket, settled, ok)
    }

    /// Replace the history view under a new version key and refetch.
    /// Any selected detail is discarded and in-flight history responses
    /// become stale.
    pub async fn remount_history(&self) -> Trigger {
        let key = self.history_key.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.history) = HistoryView::new(key);
        self.observer.report(SessionEvent::HistoryRemounted { key });
        tracing::debug!(key, "history remounted");
        self.show_history().await
    }

    // ── documents ──────────────────────────────────────────────────────

    pub async fn load_docs(&self) -> Trigger {
        let begun = lock(&self.docs).list.begin();
        let Ok(ticket) = begun else {
            return Trigger::Busy;
        };
        self.started(View::DocsList, ticket);

        let outcome = self.backend.list_docs().await;
        let ok = outcome.is_ok();
        let settled = lock(&self.docs).list.settle(ticket, outcome);
        self.finished(View::DocsList, ticket, settled, ok)
    }

    /// Delete a document; on success it also disappears from the loaded
    /// catalogue.
    pub async fn delete_doc(&self, id: &str) -> Trigger {
        if id.trim().is_empty() {
            return Trigger::Skipped;
        }
        let begun = lock(&self.docs).delete.begin();
        let Ok(ticket) = begun else {
            return Trigger::Busy;
        };
        self.started(View::DocsDelete, ticket);

        let outcome = self.backend.delete_doc(id).await.map(|_| id.to_string());
        let ok = outcome.is_ok();
        let settled = {
            let mut docs = lock(&self.docs);
            let settled = docs.delete.settle(ticket, outcome);
            if ok && settled == Settled::Applied {
                if let Some(list) = docs.list.value_mut() {
                    list.retain(|d| d.id != id);
                }
            }
            settled
        };
        self.finished(View::DocsDelete, ticket, settled, ok)
    }

    // ── failures ───────────────────────────────────────────────────────

    /// Clear the failure indicator of one view.
    pub fn dismiss(&self, view: View) {
        match view {
            View::Upload => lock(&self.upload).slot.dismiss(),
            View::Ask => lock(&self.ask).slot.dismiss(),
            View::HistoryList => lock(&self.history).list.dismiss(),
            View::HistoryDetail => lock(&self.history).detail.dismiss(),
            View::DocsList => lock(&self.docs).list.dismiss(),
            View::DocsDelete => lock(&self.docs).delete.dismiss(),
        }
    }

    /// Clear every failure indicator.
    pub fn dismiss_all(&self) {
        for view in [
            View::Upload,
            View::Ask,
            View::HistoryList,
            View::HistoryDetail,
            View::DocsList,
            View::DocsDelete,
        ] {
            self.dismiss(view);
        }
    }

    /// Render the failure line for `view`, if it is in the failure state.
    pub fn failure(&self, view: View) -> Option<String> {
        fn line<T>(view: View, slot: &RequestSlot<T>) -> Option<String> {
            slot.error().map(|e| crate::render::failure_line(view, e))
        }
        match view {
            View::Upload => line(view, &lock(&self.upload).slot),
            View::Ask => line(view, &lock(&self.ask).slot),
            View::HistoryList => line(view, &lock(&self.history).list),
            View::HistoryDetail => line(view, &lock(&self.history).detail),
            View::DocsList => line(view, &lock(&self.docs).list),
            View::DocsDelete => line(view, &lock(&self.docs).delete),
        }
    }

    fn started(&self, view: View, ticket: Ticket) {
        tracing::debug!(view = view.name(), seq = ticket.seq(), "request started");
        self.observer.report(SessionEvent::RequestStarted {
            view,
            seq: ticket.seq(),
        });
    }

    fn finished(&self, view: View, ticket: Ticket, settled: Settled, ok: bool) -> Trigger {
        let seq = ticket.seq();
        match settled {
            Settled::Applied => {
                tracing::debug!(view = view.name(), seq, ok, "request finished");
                self.observer
                    .report(SessionEvent::RequestFinished { view, seq, ok });
                Trigger::Applied { ok }
            }
            Settled::Stale => {
                tracing::debug!(view = view.name(), seq, "stale response dropped");
                self.observer
                    .report(SessionEvent::StaleDiscarded { view, seq });
                Trigger::Stale
            }
        }
    }
}
