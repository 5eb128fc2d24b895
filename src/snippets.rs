//! Snippet viewer: one tab per code snippet of a QA record.
//!
//! [`QaPanel`] pairs an immutable [`QaRecord`] with the only mutable piece
//! of view state it needs, the active tab index. Switching tabs never
//! touches the record and never issues a request.

use std::io;

use crate::clipboard::Clipboard;
use crate::models::{QaRecord, Snippet};

#[derive(Debug, Clone, PartialEq)]
pub struct QaPanel {
    qa: QaRecord,
    active: usize,
}

/// One tab as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tab<'a> {
    pub index: usize,
    pub language: &'a str,
    pub active: bool,
}

impl QaPanel {
    /// The first snippet starts active.
    pub fn new(qa: QaRecord) -> Self {
        Self { qa, active: 0 }
    }

    pub fn qa(&self) -> &QaRecord {
        &self.qa
    }

    /// Index of the active tab, or `None` when there are no snippets.
    pub fn active_index(&self) -> Option<usize> {
        if self.qa.snippets.is_empty() {
            None
        } else {
            Some(self.active)
        }
    }

    pub fn tabs(&self) -> impl Iterator<Item = Tab<'_>> {
        self.qa.snippets.iter().enumerate().map(|(i, s)| Tab {
            index: i,
            language: &s.language,
            active: i == self.active,
        })
    }

    /// Activate a tab by index, clamped to the last snippet.
    pub fn select(&mut self, index: usize) {
        self.active = index.min(self.qa.snippets.len().saturating_sub(1));
    }

    /// Activate the first tab whose language matches (case-insensitive).
    /// Returns false and leaves the active tab alone when none matches.
    pub fn select_language(&mut self, language: &str) -> bool {
        match self
            .qa
            .snippets
            .iter()
            .position(|s| s.language.eq_ignore_ascii_case(language))
        {
            Some(i) => {
                self.active = i;
                true
            }
            None => false,
        }
    }

    pub fn active_snippet(&self) -> Option<&Snippet> {
        self.qa.snippets.get(self.active)
    }

    /// Code of the active snippet, empty when there are no snippets.
    pub fn active_code(&self) -> &str {
        self.active_snippet().map(|s| s.code.as_str()).unwrap_or("")
    }

    /// Copy the active snippet's code. With no snippets the empty string
    /// is copied.
    pub fn copy_active(&self, clipboard: &dyn Clipboard) -> io::Result<()> {
        clipboard.write_text(self.active_code())
    }
}
