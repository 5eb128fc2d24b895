//! Interactive shell (`dqa shell`).
//!
//! One [`ClientSession`] lives for the whole shell. Each network command
//! runs as its own task so the prompt stays usable while requests are in
//! flight; results are printed when they land. Triggers that are already
//! loading report busy instead of sending a second request.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;

use crate::clipboard::{Clipboard, Osc52Clipboard};
use crate::config::Config;
use crate::progress::{SessionObserver, View};
use crate::render;
use crate::selection::collect_files;
use crate::session::{ClientSession, Trigger};
use crate::snippets::QaPanel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ingest(Vec<PathBuf>),
    /// `None` re-asks the question already in the input.
    Ask(Option<String>),
    History,
    Open(String),
    Tab(String),
    Copy,
    Show,
    Dismiss,
    Docs,
    Remove(String),
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  ingest <path>...     upload files or directories
  ask [question]       ask a question (repeats the last one when empty)
  history              show past questions
  open <id|#n>         show a past answer
  tab <lang|n>         switch the snippet tab of the shown answer
  copy                 copy the active snippet to the clipboard
  show                 print the shown answer again
  dismiss              clear error messages
  docs                 list ingested documents
  rm <id>              delete a document
  help                 this text
  quit                 leave the shell
";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let required = |what: &str| {
        if rest.is_empty() {
            Err(format!("usage: {} {}", word, what))
        } else {
            Ok(rest.to_string())
        }
    };

    match word {
        "ingest" | "upload" => {
            let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err("usage: ingest <path>...".to_string());
            }
            Ok(Command::Ingest(paths))
        }
        "ask" => Ok(Command::Ask(if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        })),
        "history" | "h" => Ok(Command::History),
        "open" => required("<id|#n>").map(Command::Open),
        "tab" => required("<lang|n>").map(Command::Tab),
        "copy" => Ok(Command::Copy),
        "show" => Ok(Command::Show),
        "dismiss" => Ok(Command::Dismiss),
        "docs" => Ok(Command::Docs),
        "rm" => required("<id>").map(Command::Remove),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{}', try help", other)),
    }
}

/// Which answer `tab`, `copy` and `show` act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    None,
    Ask,
    History,
}

#[derive(Debug)]
enum Job {
    Ingest,
    Ask,
    History,
    Open,
    Docs,
    Remove(String),
}

pub async fn run_shell(config: &Config, observer: Box<dyn SessionObserver>) -> Result<()> {
    let session = Arc::new(ClientSession::from_config(config, observer)?);
    let clipboard = Osc52Clipboard;
    let mut focus = Focus::None;
    let mut jobs: JoinSet<(Job, Trigger)> = JoinSet::new();

    println!("dqa shell, backend {} (type help)", config.backend.base_url);
    spawn_job(&mut jobs, &session, Job::History, |s| async move {
        s.show_history().await
    });
    prompt().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut drain = false;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    drain = true;
                    break;
                };
                if line.trim().is_empty() {
                    prompt().await;
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(cmd) => dispatch(cmd, config, &session, &clipboard, &mut focus, &mut jobs),
                    Err(msg) => eprintln!("{}", msg),
                }
                prompt().await;
            }
            Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                finish(joined, &session, &mut focus);
                prompt().await;
            }
        }
    }

    // End of input lets outstanding requests land; `quit` abandons them.
    if drain {
        while let Some(joined) = jobs.join_next().await {
            finish(joined, &session, &mut focus);
        }
    }
    jobs.shutdown().await;
    Ok(())
}

fn dispatch(
    cmd: Command,
    config: &Config,
    session: &Arc<ClientSession>,
    clipboard: &dyn Clipboard,
    focus: &mut Focus,
    jobs: &mut JoinSet<(Job, Trigger)>,
) {
    match cmd {
        Command::Ingest(paths) => {
            let ingest = config.ingest.clone();
            spawn_job(jobs, session, Job::Ingest, move |s| async move {
                let selected =
                    tokio::task::spawn_blocking(move || collect_files(&paths, &ingest)).await;
                match selected {
                    Ok(Ok(files)) if files.is_empty() => {
                        println!("No files matched.");
                        Trigger::Skipped
                    }
                    Ok(Ok(files)) => {
                        println!("uploading {} file(s)", files.len());
                        s.ingest(&files).await
                    }
                    Ok(Err(e)) => {
                        eprintln!("{:#}", e);
                        Trigger::Skipped
                    }
                    Err(e) => {
                        eprintln!("file selection failed: {}", e);
                        Trigger::Skipped
                    }
                }
            });
        }
        Command::Ask(question) => {
            spawn_job(jobs, session, Job::Ask, move |s| async move {
                match question {
                    Some(q) => s.ask(&q).await,
                    None => s.ask_current().await,
                }
            });
        }
        Command::History => {
            print!("{}", session.with_history(|h| render::render_history(h.entries())));
            if let Some(line) = session.failure(View::HistoryList) {
                eprintln!("{}", line);
            }
            spawn_job(jobs, session, Job::History, |s| async move {
                s.show_history().await
            });
        }
        Command::Open(reference) => match session.with_history(|h| h.resolve_id(&reference)) {
            Some(id) => spawn_job(jobs, session, Job::Open, move |s| async move {
                s.select_history(&id).await
            }),
            None => eprintln!("no history entry {}", reference),
        },
        Command::Tab(which) => {
            let changed = with_focused(session, *focus, |panel| {
                let ok = match which.parse::<usize>() {
                    Ok(n) if n >= 1 => {
                        panel.select(n - 1);
                        true
                    }
                    _ => panel.select_language(&which),
                };
                if ok {
                    print!("{}", render::render_qa(panel));
                }
                ok
            });
            match changed {
                Some(true) => {}
                Some(false) => eprintln!("no {} tab", which),
                None => eprintln!("no answer shown"),
            }
        }
        Command::Copy => {
            let copied = with_focused(session, *focus, |panel| {
                panel
                    .copy_active(clipboard)
                    .map(|_| panel.active_code().len())
            });
            match copied {
                Some(Ok(n)) => println!("copied {} bytes", n),
                Some(Err(e)) => eprintln!("copy failed: {}", e),
                None => eprintln!("no answer shown"),
            }
        }
        Command::Show => {
            if with_focused(session, *focus, |panel| print!("{}", render::render_qa(panel)))
                .is_none()
            {
                eprintln!("no answer shown");
            }
        }
        Command::Dismiss => session.dismiss_all(),
        Command::Docs => spawn_job(jobs, session, Job::Docs, |s| async move {
            s.load_docs().await
        }),
        Command::Remove(id) => {
            let job_id = id.clone();
            spawn_job(jobs, session, Job::Remove(job_id), move |s| async move {
                s.delete_doc(&id).await
            });
        }
        Command::Help => print!("{}", HELP),
        Command::Quit => {}
    }
}

fn spawn_job<F, Fut>(
    jobs: &mut JoinSet<(Job, Trigger)>,
    session: &Arc<ClientSession>,
    job: Job,
    f: F,
) where
    F: FnOnce(Arc<ClientSession>) -> Fut,
    Fut: std::future::Future<Output = Trigger> + Send + 'static,
{
    let fut = f(Arc::clone(session));
    jobs.spawn(async move { (job, fut.await) });
}

fn with_focused<R>(
    session: &ClientSession,
    focus: Focus,
    f: impl FnOnce(&mut QaPanel) -> R,
) -> Option<R> {
    match focus {
        Focus::None => None,
        Focus::Ask => session.with_ask(|v| v.panel_mut().map(f)),
        Focus::History => session.with_history(|h| h.panel_mut().map(f)),
    }
}

fn finish(
    joined: Result<(Job, Trigger), tokio::task::JoinError>,
    session: &ClientSession,
    focus: &mut Focus,
) {
    match joined {
        Ok((job, trigger)) => report(job, trigger, session, focus),
        Err(e) => eprintln!("request task failed: {}", e),
    }
}

/// Focus once `job` settles with `trigger`. Any ingest that reached the
/// backend remounts history, so a history focus does not survive it.
fn next_focus(job: &Job, trigger: Trigger, focus: Focus) -> Focus {
    match (job, trigger) {
        (Job::Ingest, Trigger::Applied { .. }) if focus == Focus::History => Focus::None,
        (Job::Ask, Trigger::Applied { ok: true }) => Focus::Ask,
        (Job::Open, Trigger::Applied { ok: true }) => Focus::History,
        _ => focus,
    }
}

/// Print the outcome of a finished request.
fn report(job: Job, trigger: Trigger, session: &ClientSession, focus: &mut Focus) {
    *focus = next_focus(&job, trigger, *focus);

    let view = match job {
        Job::Ingest => View::Upload,
        Job::Ask => View::Ask,
        Job::History => View::HistoryList,
        Job::Open => View::HistoryDetail,
        Job::Docs => View::DocsList,
        Job::Remove(_) => View::DocsDelete,
    };

    match trigger {
        Trigger::Busy => {
            println!("{} is still running", render::loading_label(view));
            return;
        }
        Trigger::Stale => return,
        Trigger::Skipped => {
            // Ingest prints its own reason before skipping.
            if view == View::Ask {
                println!("Nothing to ask.");
            }
            return;
        }
        Trigger::Applied { ok: false } => {
            if let Some(line) = session.failure(view) {
                eprintln!("{}", line);
            }
            return;
        }
        Trigger::Applied { ok: true } => {}
    }

    match job {
        Job::Ingest => {
            let out = session.with_upload(|v| {
                v.slot
                    .value()
                    .map(|s| render::render_ingest(v.last_batch, s))
            });
            print!("{}", out.unwrap_or_default());
            print!("{}", session.with_history(|h| render::render_history(h.entries())));
        }
        Job::Ask => {
            session.with_ask(|v| {
                if let Some(panel) = v.panel() {
                    print!("{}", render::render_qa(panel));
                }
            });
        }
        Job::History => {
            print!("{}", session.with_history(|h| render::render_history(h.entries())));
        }
        Job::Open => {
            session.with_history(|h| {
                if let Some(panel) = h.panel() {
                    println!("Q: {}\n", panel.qa().question);
                    print!("{}", render::render_qa(panel));
                }
            });
        }
        Job::Docs => print!("{}", session.with_docs(|d| render::render_docs(d.docs()))),
        Job::Remove(id) => println!("deleted {}", id),
    }
}

async fn prompt() {
    let mut out = tokio::io::stdout();
    let _ = out.write_all(b"dqa> ").await;
    let _ = out.flush().await;
}
