//! Shared request state for every view.
//!
//! Each user-triggered request lives in a [`RequestSlot`]:
//!
//! ```text
//!   Idle ──begin──▶ Loading ──settle(Ok)──▶ Success ─┐
//!    ▲                 │                              │
//!    │                 └──settle(Err)──▶ Failure ─────┤
//!    └──────────────── dismiss / begin again ◀────────┘
//! ```
//!
//! Requests are tagged with a [`Ticket`] drawn from one process-wide
//! counter. A slot only accepts the resolution of the ticket it issued
//! last; anything older is reported as [`Settled::Stale`] and dropped.
//! Because the counter is global, a ticket issued by a slot that has since
//! been replaced (a remounted view) can never match the new slot either.
//!
//! The slot keeps the most recent successful value separately from the
//! state, so a failure does not erase what was displayed before it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ClientError;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    fn next() -> Self {
        Ticket(NEXT_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    pub fn seq(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success,
    Failure(ClientError),
}

/// Returned by [`RequestSlot::begin`] while a request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy;

/// What happened to a resolution handed to [`RequestSlot::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The slot now shows this outcome.
    Applied,
    /// A newer request was issued; the outcome was dropped.
    Stale,
}

#[derive(Debug)]
pub struct RequestSlot<T> {
    state: RequestState,
    latest: Option<Ticket>,
    value: Option<T>,
}

impl<T> Default for RequestSlot<T> {
    fn default() -> Self {
        Self {
            state: RequestState::Idle,
            latest: None,
            value: None,
        }
    }
}

impl<T> RequestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request unless one is already outstanding.
    pub fn begin(&mut self) -> Result<Ticket, Busy> {
        if self.is_loading() {
            return Err(Busy);
        }
        Ok(self.supersede())
    }

    /// Start a request, making any outstanding one stale.
    pub fn supersede(&mut self) -> Ticket {
        let ticket = Ticket::next();
        self.latest = Some(ticket);
        self.state = RequestState::Loading;
        ticket
    }

    /// Apply a resolution if `ticket` is still the latest one issued.
    ///
    /// On success the value replaces the previous one; on failure the
    /// previous value is kept.
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<T, ClientError>) -> Settled {
        if self.latest != Some(ticket) {
            return Settled::Stale;
        }
        match outcome {
            Ok(value) => {
                self.value = Some(value);
                self.state = RequestState::Success;
            }
            Err(err) => {
                self.state = RequestState::Failure(err);
            }
        }
        Settled::Applied
    }

    /// Clear a failure (or success) indicator; the value stays.
    /// Has no effect while loading.
    pub fn dismiss(&mut self) {
        if !self.is_loading() {
            self.state = RequestState::Idle;
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, RequestState::Loading)
    }

    pub fn error(&self) -> Option<&ClientError> {
        match &self.state {
            RequestState::Failure(err) => Some(err),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    /// True once any request issued by this slot has been applied.
    pub fn has_settled(&self) -> bool {
        self.latest.is_some() && !self.is_loading()
    }
}
