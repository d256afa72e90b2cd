use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::process::ClaudeProcess;
use crate::types::{Message, QueryOptions};
use crate::{ClaudeAgentError, Result};

/// How long to keep forwarding already-buffered output after the child has
/// been killed on cancellation.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

// ─── QueryStream ──────────────────────────────────────────────────────────

/// An async stream of [`Message`]s from a Claude subprocess.
///
/// Backed by a Tokio mpsc channel. A background task owns [`ClaudeProcess`]
/// and forwards messages until it receives a terminal `Result` message, the
/// process exits, or the cancellation token fires. Dropping `QueryStream`
/// closes the receiver, which causes the background task to exit on the next
/// send attempt.
///
/// On cancellation the child is killed, anything it already wrote is still
/// forwarded, and the stream ends with [`ClaudeAgentError::Cancelled`].
pub struct QueryStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl QueryStream {
    pub(crate) fn new(prompt: String, opts: QueryOptions, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let spawned = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ClaudeAgentError::Cancelled),
                p = ClaudeProcess::spawn(&prompt, &opts) => p,
            };
            let mut process = match spawned {
                Ok(p) => p,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };

            let mut got_result = false;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        process.kill().await;
                        drain(&mut process, &tx).await;
                        let _ = tx.send(Err(ClaudeAgentError::Cancelled)).await;
                        return;
                    }
                    next = process.next_message() => next,
                };
                match next {
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                    Ok(None) => break, // EOF: process exited
                    Ok(Some(msg)) => {
                        let is_terminal = matches!(msg, Message::Result(_));
                        if is_terminal {
                            got_result = true;
                        }
                        if tx.send(Ok(msg)).await.is_err() {
                            break; // Receiver dropped
                        }
                        if is_terminal {
                            break;
                        }
                    }
                }
            }

            // Exited without a Result message: surface a non-zero exit code
            // together with whatever stderr was captured.
            if !got_result {
                if let Some(exit_err) = process.wait_exit_error().await {
                    let _ = tx.send(Err(exit_err)).await;
                }
            }

            process.kill().await;
        });

        QueryStream { rx }
    }

    /// Wrap a raw mpsc receiver as a `QueryStream`.
    ///
    /// Lets alternative producers (scripted runtimes, replayed transcripts)
    /// feed the same consumer code as a live subprocess.
    pub fn from_channel(rx: mpsc::Receiver<Result<Message>>) -> Self {
        Self { rx }
    }
}

/// Forward lines the killed child already wrote, bounded by [`DRAIN_GRACE`].
async fn drain(process: &mut ClaudeProcess, tx: &mpsc::Sender<Result<Message>>) {
    let forward = async {
        while let Ok(Some(msg)) = process.next_message().await {
            if tx.send(Ok(msg)).await.is_err() {
                break;
            }
        }
    };
    if tokio::time::timeout(DRAIN_GRACE, forward).await.is_err() {
        tracing::debug!("stopped draining cancelled claude process after grace period");
    }
}

impl Stream for QueryStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
