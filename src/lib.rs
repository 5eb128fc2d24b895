//! # Doc Answerer
//!
//! Client for the API Doc Answerer + Snippet Generator backend.
//!
//! The backend indexes uploaded API documents and answers questions about
//! them with citations and code snippets. This crate holds the client side:
//! a [`session::ClientSession`] owning one state machine per view (upload,
//! ask, history, documents), the HTTP [`api`] behind it, and the `dqa` CLI
//! that renders those views as text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────────────┐   ┌─────────────┐
//! │   CLI    │──▶│       ClientSession        │──▶│   Backend   │
//! │  (dqa)   │   │ upload/ask/history/docs    │   │ HTTP / JSON │
//! └──────────┘   │ one RequestSlot per request│   └─────────────┘
//!                └─────────────┬──────────────┘
//!                              ▼
//!                     SessionObserver (stderr)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dqa ingest sample_docs/openapi.json
//! dqa ask "How do I create an invoice?" --lang python
//! dqa history list
//! dqa shell
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and the `DQA_API_BASE` override |
//! | [`models`] | Wire types |
//! | [`error`] | Request error type |
//! | [`api`] | `Backend` trait and HTTP implementation |
//! | [`request`] | Request slots, tickets, stale-response handling |
//! | [`snippets`] | Snippet tabs for one answer |
//! | [`clipboard`] | Clipboard targets |
//! | [`views`] | Per-view state |
//! | [`session`] | The client session protocol |
//! | [`selection`] | Expanding paths into upload files |
//! | [`render`] | Text rendering |
//! | [`progress`] | Session event reporting |
//! | [`commands`] | One-shot CLI commands |
//! | [`shell`] | Interactive shell |

pub mod api;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod render;
pub mod request;
pub mod selection;
pub mod session;
pub mod shell;
pub mod snippets;
pub mod views;
