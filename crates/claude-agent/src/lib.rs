//! `claude-agent`: native Rust driver for the Claude CLI subprocess.
//!
//! This crate implements the `--output-format stream-json` protocol so the
//! `claude-query` engine can call Claude without a Node.js runtime.
//!
//! # Architecture
//!
//! ```text
//! QueryOptions + CancellationToken
//!     │
//!     ▼
//! ClaudeProcess   ← spawns `claude --output-format stream-json …`
//!     │              reads JSONL from stdout
//!     ▼
//! QueryStream     ← implements futures::Stream<Item = Result<Message>>
//!     │              background task + mpsc channel, kills child on cancel
//!     ▼
//! Message enum    ← closed set of typed variants
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use claude_agent::{query, Message, QueryOptions};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! let opts = QueryOptions {
//!     model: Some("sonnet".into()),
//!     max_turns: Some(10),
//!     ..Default::default()
//! };
//!
//! let mut stream = query("Write a hello-world Rust function.", opts, CancellationToken::new());
//! while let Some(msg) = stream.next().await {
//!     if let Message::Result(r) = msg? {
//!         println!("{}", r.result_text().unwrap_or(""));
//!     }
//! }
//! ```

pub mod error;
pub mod types;

pub(crate) mod process;
pub mod stream;

#[cfg(test)]
mod tests;

pub use error::ClaudeAgentError;
pub use stream::QueryStream;
pub use types::{
    AssistantContent, AssistantMessage, ContentBlock, McpServerConfig, McpServerStatus, Message,
    PermissionMode, QueryOptions, ResultMessage, ResultSubtype, ResultUsage, SystemInit,
    SystemMessage, SystemPayload, TokenUsage, UserContent, UserContentBlock, UserContentBody,
    UserMessage,
};

use tokio_util::sync::CancellationToken;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClaudeAgentError>;

/// Drive a single agentic query against the Claude CLI.
///
/// Returns a [`QueryStream`] that yields [`Message`] values as they arrive
/// from the subprocess. The stream terminates after the first
/// [`Message::Result`], on process exit, or with
/// [`ClaudeAgentError::Cancelled`] once `cancel` fires.
pub fn query(
    prompt: impl Into<String>,
    opts: QueryOptions,
    cancel: CancellationToken,
) -> QueryStream {
    QueryStream::new(prompt.into(), opts, cancel)
}
