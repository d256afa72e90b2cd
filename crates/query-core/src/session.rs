use std::time::Duration;

use claude_agent::{ClaudeAgentError, ContentBlock, Message, QueryStream, ResultSubtype};
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CallConfig;

/// Messages received during one call, in arrival order.
pub type MessageLog = Vec<Message>;

// ---------------------------------------------------------------------------
// AgentRuntime
// ---------------------------------------------------------------------------

/// Producer of the agent's message stream for one call.
///
/// Implementations must end the stream promptly once `cancel` fires; the
/// controller keeps consuming until they do.
pub trait AgentRuntime {
    fn open(&self, config: &CallConfig, cancel: CancellationToken) -> QueryStream;
}

/// Runs the `claude` CLI as a subprocess.
#[derive(Debug, Clone, Default)]
pub struct ClaudeCli {
    executable: Option<String>,
}

impl ClaudeCli {
    pub fn new(executable: Option<String>) -> Self {
        Self { executable }
    }
}

impl AgentRuntime for ClaudeCli {
    fn open(&self, config: &CallConfig, cancel: CancellationToken) -> QueryStream {
        let opts = config.to_query_options(self.executable.as_deref());
        claude_agent::query(config.prompt.clone(), opts, cancel)
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SessionOutcome {
    pub log: MessageLog,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum FailureKind {
    /// The deadline fired before the stream closed.
    #[error("operation aborted after {timeout_secs}s timeout")]
    Timeout { timeout_secs: u64 },

    #[error(transparent)]
    Execution(ClaudeAgentError),
}

/// A session that ended in failure. The partial log is kept for recovery.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub log: MessageLog,
    pub elapsed: Duration,
}

impl SessionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FailureKind::Timeout { .. })
    }
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Cancels a token once `after` has elapsed, unless dropped first.
pub(crate) struct Deadline {
    timer: JoinHandle<()>,
}

impl Deadline {
    pub(crate) fn arm(token: CancellationToken, after: Duration) -> Self {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if !token.is_cancelled() {
                tracing::warn!(timeout_secs = after.as_secs(), "deadline reached, cancelling query");
            }
            token.cancel();
        });
        Self { timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

// ---------------------------------------------------------------------------
// run_session
// ---------------------------------------------------------------------------

/// Drive one call to completion under `config.timeout()`.
///
/// Every message is appended to the log before it is looked at. The deadline
/// is disarmed on every exit path. A stream that ends with
/// [`ClaudeAgentError::Cancelled`] is a [`FailureKind::Timeout`]; so is a
/// clean close after the deadline with no `result` message. Any other error
/// is an execution failure, even one that arrives after the deadline.
pub async fn run_session<R>(
    runtime: &R,
    config: &CallConfig,
) -> Result<SessionOutcome, SessionFailure>
where
    R: AgentRuntime + ?Sized,
{
    let cancel = CancellationToken::new();
    let deadline = Deadline::arm(cancel.clone(), config.timeout());
    let started = Instant::now();

    tracing::info!(
        model = config.model.as_str(),
        max_turns = config.max_turns,
        timeout_secs = config.timeout_secs,
        "starting query session"
    );

    let mut stream = runtime.open(config, cancel.clone());
    let mut log = MessageLog::new();
    let mut stream_error = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(msg) => {
                log.push(msg);
                if config.debug {
                    if let Some(msg) = log.last() {
                        trace_message(log.len() - 1, msg);
                    }
                }
            }
            Err(e) => {
                stream_error = Some(e);
                break;
            }
        }
    }

    drop(deadline);
    let elapsed = started.elapsed();
    let timed_out = cancel.is_cancelled();

    if config.debug {
        let kinds: Vec<&str> = log.iter().map(Message::kind).collect();
        tracing::debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            message_count = log.len(),
            ?kinds,
            "query stream finished"
        );
    }

    let kind = match stream_error {
        Some(e) if e.is_cancelled() => FailureKind::Timeout {
            timeout_secs: config.timeout_secs,
        },
        Some(e) => FailureKind::Execution(e),
        None if timed_out && !log.iter().any(|m| m.as_result().is_some()) => {
            FailureKind::Timeout {
                timeout_secs: config.timeout_secs,
            }
        }
        None => return Ok(SessionOutcome { log, elapsed }),
    };

    tracing::warn!(error = %kind, message_count = log.len(), "query session failed");
    Err(SessionFailure { kind, log, elapsed })
}

/// Per-message debug trace. Inspects block kinds only; no classification.
fn trace_message(index: usize, msg: &Message) {
    match msg {
        Message::System(_) => match msg.as_init() {
            Some(init) => tracing::debug!(
                index,
                model = %init.model,
                tool_count = init.tools.len(),
                "system init"
            ),
            None => tracing::debug!(index, "system message"),
        },
        Message::Assistant(a) => {
            let kinds: Vec<&str> = a
                .message
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { .. } => "text",
                    ContentBlock::ToolUse { .. } => "tool_use",
                    ContentBlock::Thinking { .. } => "thinking",
                    ContentBlock::Other(_) => "other",
                })
                .collect();
            tracing::debug!(index, content = ?kinds, "assistant message");
            match a.message.content.first() {
                Some(ContentBlock::Text { text }) => {
                    tracing::debug!(index, text = %preview(text, 100), "assistant response")
                }
                Some(ContentBlock::ToolUse { name, .. }) => {
                    tracing::debug!(index, tool = %name, "tool use")
                }
                _ => {}
            }
        }
        Message::User(u) => {
            tracing::debug!(index, has_tool_result = u.has_tool_result(), "user message")
        }
        Message::Result(r) => {
            tracing::debug!(
                index,
                subtype = r.subtype.as_str(),
                has_result = r.result_text().is_some(),
                has_error = r.error_text().is_some(),
                duration_ms = r.duration_ms,
                total_cost_usd = r.total_cost_usd,
                "result message"
            );
            if r.subtype == ResultSubtype::ErrorDuringExecution {
                tracing::error!(
                    error = r.error_text().unwrap_or("none"),
                    "claude reported an error during execution"
                );
            }
        }
        other => tracing::debug!(index, kind = other.kind(), "other message"),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
