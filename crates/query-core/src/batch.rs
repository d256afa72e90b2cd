use serde::Serialize;
use thiserror::Error;
use tracing::Instrument;

use crate::aggregate::{aggregate, classify, recover_stream_failure, OutputRecord};
use crate::config::CallConfig;
use crate::error::QueryError;
use crate::interpolate::Environment;
use crate::params::{OutputFormat, QueryParams};
use crate::session::{run_session, AgentRuntime, FailureKind, SessionFailure};

// ---------------------------------------------------------------------------
// Error records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Timeout,
    ExecutionError,
}

/// Emitted in place of an output record when continue-on-failure is on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub error: String,
    pub error_type: ErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub item_index: usize,
}

/// Why one item failed.
#[derive(Debug, Error)]
pub enum ItemFailure {
    #[error(transparent)]
    Validation(#[from] QueryError),

    #[error(transparent)]
    Session(#[from] SessionFailure),
}

impl ItemFailure {
    pub fn error_type(&self) -> ErrorType {
        match self {
            ItemFailure::Session(f) if f.is_timeout() => ErrorType::Timeout,
            _ => ErrorType::ExecutionError,
        }
    }

    /// Message shown when the failure aborts the batch.
    pub fn user_message(&self) -> String {
        match self {
            ItemFailure::Session(SessionFailure {
                kind: FailureKind::Timeout { timeout_secs },
                ..
            }) => format!(
                "Operation timed out after {timeout_secs} seconds. \
                 Consider increasing the timeout in Additional Options."
            ),
            other => format!("Claude Code execution failed: {other}"),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ItemFailure::Validation(_) => None,
            ItemFailure::Session(f) => Some(format!(
                "{} after {} ms with {} message(s) received",
                f.kind,
                f.elapsed.as_millis(),
                f.log.len()
            )),
        }
    }

    pub fn into_record(self, item_index: usize) -> ErrorRecord {
        ErrorRecord {
            error: self.to_string(),
            error_type: self.error_type(),
            error_details: self.details(),
            item_index,
        }
    }
}

/// A fatal failure that stopped the batch.
#[derive(Debug, Error)]
#[error("item {item_index}: {message}")]
pub struct BatchError {
    pub item_index: usize,
    /// User-facing message with remediation hint.
    pub message: String,
    /// The underlying cause, unadorned.
    pub description: String,
}

impl BatchError {
    fn new(item_index: usize, failure: &ItemFailure) -> Self {
        Self {
            item_index,
            message: failure.user_message(),
            description: failure.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs items one at a time, in order, against one agent runtime.
pub struct Engine<R> {
    runtime: R,
    env: Environment,
    continue_on_fail: bool,
}

impl<R: AgentRuntime> Engine<R> {
    pub fn new(runtime: R, env: Environment) -> Self {
        Self {
            runtime,
            env,
            continue_on_fail: false,
        }
    }

    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }

    /// Process every item. Returns one record per item, or the first fatal
    /// failure when continue-on-failure is off.
    pub async fn run(&self, items: &[QueryParams]) -> Result<Vec<OutputRecord>, BatchError> {
        let mut records = Vec::with_capacity(items.len());

        for (index, params) in items.iter().enumerate() {
            let outcome = self
                .run_item(params)
                .instrument(tracing::info_span!("item", index))
                .await;

            match outcome {
                Ok(record) => records.push(record),
                Err(failure) if self.continue_on_fail => {
                    tracing::warn!(error = %failure, "item failed, continuing");
                    records.push(OutputRecord::Error(failure.into_record(index)));
                }
                Err(failure) => {
                    tracing::error!(error = %failure, "item failed, aborting batch");
                    return Err(BatchError::new(index, &failure));
                }
            }
        }

        Ok(records)
    }

    /// Resolve, run and aggregate one item.
    ///
    /// With `text` output a failed stream still yields a record; other
    /// formats surface the failure.
    pub async fn run_item(&self, params: &QueryParams) -> Result<OutputRecord, ItemFailure> {
        let config = CallConfig::resolve(params, &self.env)?;

        match run_session(&self.runtime, &config).await {
            Ok(outcome) => {
                tracing::info!(
                    outcome = classify(&outcome.log).as_str(),
                    messages = outcome.log.len(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "query finished"
                );
                Ok(aggregate(&outcome.log, config.output_format))
            }
            Err(failure) if config.output_format == OutputFormat::Text => {
                Ok(OutputRecord::Text(recover_stream_failure(&failure)))
            }
            Err(failure) => Err(failure.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ScriptedRuntime, Step};
    use claude_agent::ResultSubtype;

    fn item(prompt: &str, format: OutputFormat) -> QueryParams {
        QueryParams {
            prompt: prompt.into(),
            output_format: format,
            ..Default::default()
        }
    }

    fn engine(scripts: Vec<Vec<Step>>) -> Engine<ScriptedRuntime> {
        Engine::new(ScriptedRuntime::new(scripts), Environment::new())
    }

    fn ok_script(text: &str) -> Vec<Step> {
        vec![
            Step::Send(testing::init(&["Read"])),
            Step::Send(testing::assistant_text(text)),
            Step::Send(testing::success(text, 10, 0.01)),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn items_run_in_order() {
        let engine = engine(vec![ok_script("one"), ok_script("two")]);
        let records = engine
            .run(&[item("a", OutputFormat::Text), item("b", OutputFormat::Text)])
            .await
            .unwrap();

        let texts: Vec<_> = records
            .iter()
            .map(|r| match r {
                OutputRecord::Text(t) => t.result.as_str(),
                other => panic!("unexpected record {other:?}"),
            })
            .collect();
        assert_eq!(texts, ["one", "two"]);

        let prompts: Vec<_> = engine
            .runtime
            .opened
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.prompt.clone())
            .collect();
        assert_eq!(prompts, ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_aborts_with_item_index() {
        let engine = engine(vec![ok_script("one")]);
        let err = engine
            .run(&[item("a", OutputFormat::Text), item("  ", OutputFormat::Text)])
            .await
            .unwrap_err();

        assert_eq!(err.item_index, 1);
        assert_eq!(
            err.message,
            "Claude Code execution failed: Prompt is required and cannot be empty"
        );
        assert_eq!(err.description, "Prompt is required and cannot be empty");
        assert!(err.to_string().starts_with("item 1: "));
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_is_not_recovered_in_text_mode() {
        let engine = engine(vec![]);
        let failure = engine.run_item(&item("", OutputFormat::Text)).await.unwrap_err();
        assert!(matches!(failure, ItemFailure::Validation(_)));
        assert!(engine.runtime.opened.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn continue_on_fail_records_errors_and_keeps_going() {
        let engine = engine(vec![ok_script("two")]).continue_on_fail(true);
        let records = engine
            .run(&[item("", OutputFormat::Structured), item("b", OutputFormat::Text)])
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            OutputRecord::Error(ErrorRecord {
                error: "Prompt is required and cannot be empty".into(),
                error_type: ErrorType::ExecutionError,
                error_details: None,
                item_index: 0,
            })
        );
        assert!(matches!(&records[1], OutputRecord::Text(t) if t.success));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_in_structured_mode_aborts_with_hint() {
        let engine = engine(vec![vec![
            Step::Send(testing::assistant_text("working")),
            Step::AbortOnCancel,
        ]]);
        let mut params = item("slow", OutputFormat::Structured);
        params.timeout = 7;

        let err = engine.run(&[params]).await.unwrap_err();
        assert_eq!(err.item_index, 0);
        assert_eq!(
            err.message,
            "Operation timed out after 7 seconds. Consider increasing the timeout in Additional Options."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_with_continue_on_fail_is_typed() {
        let engine = engine(vec![vec![Step::AbortOnCancel]]).continue_on_fail(true);
        let mut params = item("slow", OutputFormat::Messages);
        params.timeout = 2;

        let records = engine.run(&[params]).await.unwrap();
        match &records[0] {
            OutputRecord::Error(record) => {
                assert_eq!(record.error_type, ErrorType::Timeout);
                assert_eq!(record.error, "operation aborted after 2s timeout");
                assert!(record.error_details.is_some());
                assert_eq!(record.item_index, 0);
            }
            other => panic!("expected error record, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn execution_failure_message_embeds_cause() {
        let engine = engine(vec![vec![Step::Fail("exit status 2".into())]]);
        let err = engine
            .run(&[item("x", OutputFormat::Messages)])
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "Claude Code execution failed: Process error: exit status 2"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stream_failure_in_text_mode_is_recovered_in_place() {
        let engine = engine(vec![vec![
            Step::Send(testing::assistant_text("halfway")),
            Step::Fail("exit status 1".into()),
        ]]);
        let records = engine.run(&[item("x", OutputFormat::Text)]).await.unwrap();
        match &records[0] {
            OutputRecord::Text(t) => {
                assert_eq!(t.result, "Error during execution: Process error: exit status 1");
                assert!(!t.success);
                assert_eq!(t.total_cost_usd, 0.0);
            }
            other => panic!("expected text record, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn partial_result_is_not_an_error() {
        let engine = engine(vec![vec![
            Step::Send(testing::assistant_text("partial answer")),
            Step::Send(testing::terminal(ResultSubtype::ErrorMaxTurns)),
        ]]);
        let records = engine.run(&[item("x", OutputFormat::Text)]).await.unwrap();
        match &records[0] {
            OutputRecord::Text(t) => {
                assert!(t.result.starts_with("[PARTIAL - Max turns reached]"));
                assert!(!t.success);
            }
            other => panic!("expected text record, got {other:?}"),
        }
    }

    #[test]
    fn error_record_serializes_camel_case_and_omits_missing_details() {
        let record = ErrorRecord {
            error: "boom".into(),
            error_type: ErrorType::ExecutionError,
            error_details: None,
            item_index: 3,
        };
        let value = serde_json::to_value(OutputRecord::Error(record)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": "boom", "errorType": "execution_error", "itemIndex": 3})
        );
    }
}
