//! One-shot CLI entry points.
//!
//! Each `run_*` function builds a session, pulls one trigger, and prints
//! the resulting view to stdout. Failures print the unified failure line
//! to stderr and exit with status 1.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::clipboard::{Clipboard, Osc52Clipboard};
use crate::config::Config;
use crate::progress::{SessionObserver, View};
use crate::render;
use crate::selection::collect_files;
use crate::session::{ClientSession, Trigger};
use crate::snippets::QaPanel;

/// Tab and clipboard options shared by `ask` and `history show`.
#[derive(Debug, Clone, Default)]
pub struct PanelOptions {
    pub lang: Option<String>,
    pub copy: bool,
}

/// `dqa ingest <PATH>...`
pub async fn run_ingest(
    config: &Config,
    paths: &[PathBuf],
    observer: Box<dyn SessionObserver>,
) -> Result<()> {
    let files = collect_files(paths, &config.ingest)?;
    if files.is_empty() {
        println!("No files matched.");
        return Ok(());
    }

    let session = ClientSession::from_config(config, observer)?;
    session.ingest(&files).await;
    exit_on_failure(&session, View::Upload);

    let out = session.with_upload(|v| {
        v.slot
            .value()
            .map(|summary| render::render_ingest(v.last_batch, summary))
    });
    if let Some(out) = out {
        print!("{}", out);
    }

    // The refreshed history is informational here; its failure does not
    // fail the ingest.
    let listed = session.with_history(|h| h.list.value().map(|l| l.len()));
    match listed {
        Some(n) => println!("history: {} entr{}", n, if n == 1 { "y" } else { "ies" }),
        None => {
            if let Some(line) = session.failure(View::HistoryList) {
                eprintln!("{}", line);
            }
        }
    }
    Ok(())
}

/// `dqa ask [QUESTION]`
pub async fn run_ask(
    config: &Config,
    question: Option<String>,
    options: &PanelOptions,
    observer: Box<dyn SessionObserver>,
) -> Result<()> {
    let question = question.unwrap_or_else(|| config.ask.default_question.clone());
    let session = ClientSession::from_config(config, observer)?;

    if session.ask(&question).await == Trigger::Skipped {
        println!("Nothing to ask.");
        return Ok(());
    }
    exit_on_failure(&session, View::Ask);

    session.with_ask(|v| match v.panel_mut() {
        Some(panel) => show_panel(panel, options),
        None => Ok(()),
    })
}

/// `dqa history list`
pub async fn run_history_list(config: &Config, observer: Box<dyn SessionObserver>) -> Result<()> {
    let session = ClientSession::from_config(config, observer)?;
    session.show_history().await;
    exit_on_failure(&session, View::HistoryList);

    print!("{}", session.with_history(|h| render::render_history(h.entries())));
    Ok(())
}

/// `dqa history show <ID>`
pub async fn run_history_show(
    config: &Config,
    id: &str,
    options: &PanelOptions,
    observer: Box<dyn SessionObserver>,
) -> Result<()> {
    let session = ClientSession::from_config(config, observer)?;
    if session.select_history(id).await == Trigger::Skipped {
        usage_error("dqa history show <ID>");
    }
    exit_on_failure(&session, View::HistoryDetail);

    session.with_history(|h| {
        if let Some(created) = h.panel().and_then(|p| p.qa().created_at.clone()) {
            println!("Asked {}", render::format_timestamp(&created));
        }
        if let Some(q) = h.panel().map(|p| p.qa().question.clone()) {
            println!("Q: {}\n", q);
        }
        match h.panel_mut() {
            Some(panel) => show_panel(panel, options),
            None => Ok(()),
        }
    })
}

/// `dqa docs list`
pub async fn run_docs_list(config: &Config, observer: Box<dyn SessionObserver>) -> Result<()> {
    let session = ClientSession::from_config(config, observer)?;
    session.load_docs().await;
    exit_on_failure(&session, View::DocsList);

    print!("{}", session.with_docs(|d| render::render_docs(d.docs())));
    Ok(())
}

/// `dqa docs delete <ID>`
pub async fn run_docs_delete(
    config: &Config,
    id: &str,
    observer: Box<dyn SessionObserver>,
) -> Result<()> {
    let session = ClientSession::from_config(config, observer)?;
    if session.delete_doc(id).await == Trigger::Skipped {
        usage_error("dqa docs delete <ID>");
    }
    exit_on_failure(&session, View::DocsDelete);

    println!("deleted {}", id);
    Ok(())
}

/// Apply `--lang`, print the panel, then apply `--copy`.
pub fn show_panel(panel: &mut QaPanel, options: &PanelOptions) -> Result<()> {
    if let Some(lang) = &options.lang {
        if !panel.select_language(lang) {
            eprintln!("no {} snippet; showing the first tab", lang);
        }
    }
    print!("{}", render::render_qa(panel));

    if options.copy {
        let clipboard: &dyn Clipboard = &Osc52Clipboard;
        panel.copy_active(clipboard).context("copy failed")?;
        eprintln!("copied {} bytes", panel.active_code().len());
    }
    Ok(())
}

/// A blank id never reaches the backend.
fn usage_error(usage: &str) -> ! {
    eprintln!("usage: {} (the id must not be blank)", usage);
    std::process::exit(1);
}

fn exit_on_failure(session: &ClientSession, view: View) {
    if let Some(line) = session.failure(view) {
        eprintln!("{}", line);
        std::process::exit(1);
    }
}
