//! Operator console: drives the registry from line-oriented input.

use crate::peers::PeerStore;
use crate::shutdown::{next_or_shutdown, Wake};
use crate::sweeper::cutoff_before;
use crate::types::GenericBoxedStream;

use async_stream::stream;
use chrono::Utc;
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Upsert { id: String, content: String },
    Touch { id: String },
    Remove { id: String },
    Get { id: String },
    List,
    Prune { max_age: Duration },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'{command}' requires {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("invalid age '{0}', expected whole seconds")]
    InvalidAge(String),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

const LINE_BUFFER: usize = 64;

/// Parse one input line. Blank lines yield `Ok(None)`.
///
/// Upsert content is taken verbatim: everything after the single separator
/// that follows the id, up to the line terminator.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.trim_end_matches(['\n', '\r']).trim_start();
    if line.trim_end().is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };

    let command = match verb {
        "upsert" => {
            let (id, content) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            ConsoleCommand::Upsert {
                id: required(id, "upsert", "a peer id")?,
                content: content.to_string(),
            }
        }
        "touch" => ConsoleCommand::Touch {
            id: single(rest, "touch", "a peer id")?,
        },
        "remove" => ConsoleCommand::Remove {
            id: single(rest, "remove", "a peer id")?,
        },
        "get" => ConsoleCommand::Get {
            id: single(rest, "get", "a peer id")?,
        },
        "list" => {
            no_arguments(rest)?;
            ConsoleCommand::List
        }
        "prune" => {
            let secs = single(rest, "prune", "a max age in seconds")?;
            let secs = secs
                .parse::<u64>()
                .map_err(|_| ConsoleError::InvalidAge(secs.clone()))?;
            ConsoleCommand::Prune {
                max_age: Duration::from_secs(secs),
            }
        }
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

fn required(arg: &str, command: &'static str, argument: &'static str) -> Result<String, ConsoleError> {
    if arg.is_empty() {
        Err(ConsoleError::MissingArgument { command, argument })
    } else {
        Ok(arg.to_string())
    }
}

fn single(rest: &str, command: &'static str, argument: &'static str) -> Result<String, ConsoleError> {
    let mut parts = rest.split_whitespace();
    let arg = required(parts.next().unwrap_or(""), command, argument)?;
    no_arguments(&parts.collect::<Vec<_>>().join(" "))?;
    Ok(arg)
}

fn no_arguments(rest: &str) -> Result<(), ConsoleError> {
    match rest.split_whitespace().next() {
        Some(extra) => Err(ConsoleError::UnexpectedArgument(extra.to_string())),
        None => Ok(()),
    }
}

/// Apply a command to the store and render the response line.
pub fn apply(store: &PeerStore, command: ConsoleCommand) -> String {
    match command {
        ConsoleCommand::Upsert { id, content } => {
            debug!(peer = %id, "upsert");
            store.upsert(id, content);
            "ok".to_string()
        }
        ConsoleCommand::Touch { id } => {
            if store.touch(&id) {
                "ok".to_string()
            } else {
                format!("unknown peer {}", id)
            }
        }
        ConsoleCommand::Remove { id } => match store.remove(&id) {
            Some(_) => "ok".to_string(),
            None => format!("unknown peer {}", id),
        },
        ConsoleCommand::Get { id } => match store.get(&id) {
            Some(record) => to_json(&record),
            None => format!("unknown peer {}", id),
        },
        ConsoleCommand::List => to_json(&store.snapshot()),
        ConsoleCommand::Prune { max_age } => {
            let dropped = store.prune_older_than(cutoff_before(Utc::now(), max_age));
            info!(dropped_count = dropped.len(), "console prune");
            to_json(&dropped)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("error: {}", e))
}

/// Handle one raw input line, returning the response to print, if any.
pub fn handle_line(store: &PeerStore, line: &str) -> Option<String> {
    match parse_line(line) {
        Ok(Some(command)) => Some(apply(store, command)),
        Ok(None) => None,
        Err(e) => Some(format!("error: {}", e)),
    }
}

/// Read lines from a blocking reader on a dedicated thread.
///
/// The thread is detached: a read that never returns does not keep the
/// runtime (or the process) alive once the console loop has stopped.
pub fn blocking_lines<R>(reader: R) -> io::Result<GenericBoxedStream<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;

    Ok(Box::pin(stream! {
        while let Some(line) = rx.recv().await {
            yield line;
        }
    }))
}

/// Serve commands from `lines`, writing responses to `writer`, until input
/// ends or `shutdown` is cancelled.
pub async fn run_console<W>(
    store: PeerStore,
    mut lines: GenericBoxedStream<io::Result<String>>,
    mut writer: W,
    shutdown: CancellationToken,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match next_or_shutdown(lines.as_mut(), &shutdown).await {
            Wake::Item(Ok(line)) => {
                if let Some(response) = handle_line(&store, &line) {
                    writer.write_all(response.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
            }
            Wake::Item(Err(e)) => {
                error!("Console input error: {}", e);
                return Err(e);
            }
            Wake::Ended => {
                info!("Console input closed");
                break;
            }
            Wake::Shutdown => {
                info!("Console: shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

pub async fn run_stdio_console(store: PeerStore, shutdown: CancellationToken) -> io::Result<()> {
    let lines = blocking_lines(io::BufReader::new(io::stdin()))?;
    run_console(store, lines, tokio::io::stdout(), shutdown).await
}
