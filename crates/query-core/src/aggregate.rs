use claude_agent::{McpServerStatus, Message, ResultMessage, ResultSubtype, ResultUsage};
use serde::Serialize;

use crate::batch::ErrorRecord;
use crate::params::OutputFormat;
use crate::session::SessionFailure;

const PARTIAL_PREFIX: &str = "[PARTIAL - Max turns reached]\n\n";
const PARTIAL_SUFFIX: &str =
    "\n\n[Note: Task incomplete. Increase maxTurns parameter to complete.]";
const MAX_TURNS_NO_TEXT: &str =
    "Error: Maximum conversation turns reached. Consider increasing maxTurns parameter.";

const FAILED_PREFIX: &str = "[ERROR - Execution failed]\n\n";
const FAILED_SUFFIX: &str =
    "\n\n[Note: An error occurred during execution. Check logs for details.]";
const FAILED_NO_TEXT: &str = "Error: Execution failed. Check debug logs for details.";
const FAILED_NO_OUTPUT: &str = "Error: Execution failed. No output available.";

const NO_RESULT: &str = "No response generated - check debug logs for details";
const NO_RESPONSE: &str = "No response generated";

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// One emitted item. Serialized without a tag; each shape is distinguished
/// by its own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Text(TextOutput),
    Messages(MessagesOutput),
    Structured(StructuredOutput),
    Error(ErrorRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextOutput {
    pub result: String,
    pub success: bool,
    pub duration_ms: u64,
    pub total_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesOutput {
    pub messages: Vec<Message>,
    pub message_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredOutput {
    pub messages: Vec<Message>,
    pub summary: Summary,
    pub result: Option<String>,
    pub metrics: Option<Metrics>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub user_message_count: usize,
    pub assistant_message_count: usize,
    /// Assistant messages whose first block is a tool invocation.
    pub tool_use_count: usize,
    pub has_result: bool,
    pub tools_available: Vec<String>,
    pub mcp_servers_loaded: Vec<McpServerStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub duration_ms: u64,
    pub num_turns: u32,
    pub total_cost_usd: f64,
    pub usage: ResultUsage,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Terminal outcome of one run, as read from its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The run stopped early but left assistant text behind.
    Partial,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Partial => "partial",
            Outcome::Failed => "failed",
        }
    }
}

/// Classify a finished log. Used for tracing; output shapes only carry the
/// boolean `success`.
pub fn classify(log: &[Message]) -> Outcome {
    match last_result(log) {
        Some(r) if r.is_success() => Outcome::Success,
        Some(r)
            if matches!(
                r.subtype,
                ResultSubtype::ErrorMaxTurns | ResultSubtype::ErrorDuringExecution
            ) && last_assistant_text(log).is_some() =>
        {
            Outcome::Partial
        }
        _ => Outcome::Failed,
    }
}

fn last_result(log: &[Message]) -> Option<&ResultMessage> {
    log.iter().rev().find_map(Message::as_result)
}

/// Text of the last assistant message that has a `text` block. An empty
/// block counts as no text; earlier messages are not consulted.
fn last_assistant_text(log: &[Message]) -> Option<&str> {
    log.iter()
        .rev()
        .filter_map(Message::as_assistant)
        .find(|a| a.first_text_block().is_some())
        .and_then(|a| a.text())
}

/// Text of the very last assistant message, whatever its blocks.
fn final_assistant_text(log: &[Message]) -> Option<&str> {
    log.iter()
        .rev()
        .find_map(Message::as_assistant)
        .and_then(|a| a.text())
}

fn wrap(prefix: &str, text: &str, suffix: &str) -> String {
    format!("{prefix}{text}{suffix}")
}

/// The text a `text` record reports for `log`.
///
/// The error field is checked before the subtype branches, so a max-turns
/// result that carries an `error` reports that error verbatim.
fn final_text(log: &[Message]) -> String {
    let Some(result) = last_result(log) else {
        return final_assistant_text(log).unwrap_or(NO_RESULT).to_owned();
    };

    if let Some(text) = result.result_text() {
        return text.to_owned();
    }
    if let Some(error) = result.error_text() {
        return format!("Error: {error}");
    }

    match result.subtype {
        ResultSubtype::ErrorMaxTurns => match last_assistant_text(log) {
            Some(text) => wrap(PARTIAL_PREFIX, text, PARTIAL_SUFFIX),
            None => MAX_TURNS_NO_TEXT.to_owned(),
        },
        ResultSubtype::ErrorDuringExecution => match last_assistant_text(log) {
            Some(text) => wrap(FAILED_PREFIX, text, FAILED_SUFFIX),
            None if log.iter().any(|m| m.as_assistant().is_some()) => FAILED_NO_TEXT.to_owned(),
            None => FAILED_NO_OUTPUT.to_owned(),
        },
        _ => NO_RESPONSE.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

/// Reduce a message log into the record for `format`. Pure; the log is only
/// read.
pub fn aggregate(log: &[Message], format: OutputFormat) -> OutputRecord {
    match format {
        OutputFormat::Text => OutputRecord::Text(text_output(log)),
        OutputFormat::Messages => OutputRecord::Messages(MessagesOutput {
            messages: log.to_vec(),
            message_count: log.len(),
        }),
        OutputFormat::Structured => OutputRecord::Structured(structured_output(log)),
    }
}

fn text_output(log: &[Message]) -> TextOutput {
    let result = last_result(log);
    TextOutput {
        result: final_text(log),
        success: result.is_some_and(ResultMessage::is_success),
        duration_ms: result.map_or(0, |r| r.duration_ms),
        total_cost_usd: result.map_or(0.0, |r| r.total_cost_usd),
    }
}

fn structured_output(log: &[Message]) -> StructuredOutput {
    let assistants: Vec<_> = log.iter().filter_map(Message::as_assistant).collect();
    let init = log.iter().find_map(Message::as_init);
    let result = last_result(log);

    StructuredOutput {
        messages: log.to_vec(),
        summary: Summary {
            user_message_count: log
                .iter()
                .filter(|m| matches!(m, Message::User(_)))
                .count(),
            assistant_message_count: assistants.len(),
            tool_use_count: assistants.iter().filter(|a| a.starts_with_tool_use()).count(),
            has_result: result.is_some(),
            tools_available: init.map(|i| i.tools.clone()).unwrap_or_default(),
            mcp_servers_loaded: init.map(|i| i.mcp_servers.clone()).unwrap_or_default(),
        },
        result: result
            .and_then(|r| r.result_text().or_else(|| r.error_text()))
            .map(str::to_owned),
        metrics: result.map(|r| Metrics {
            duration_ms: r.duration_ms,
            num_turns: r.num_turns,
            total_cost_usd: r.total_cost_usd,
            usage: r.usage.clone(),
        }),
        success: result.is_some_and(ResultMessage::is_success),
    }
}

/// In-place record for a `text` item whose stream failed.
pub fn recover_stream_failure(failure: &SessionFailure) -> TextOutput {
    TextOutput {
        result: format!("Error during execution: {failure}"),
        success: false,
        duration_ms: failure.elapsed.as_millis() as u64,
        total_cost_usd: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
