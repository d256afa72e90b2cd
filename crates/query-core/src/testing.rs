//! Fixtures shared by the unit tests: message builders and a scripted
//! runtime that stands in for the `claude` subprocess.

use std::collections::VecDeque;
use std::sync::Mutex;

use claude_agent::{
    AssistantContent, AssistantMessage, ClaudeAgentError, ContentBlock, McpServerStatus, Message,
    QueryStream, ResultMessage, ResultSubtype, ResultUsage, SystemInit, SystemMessage,
    SystemPayload, UserContent, UserContentBody, UserMessage,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::CallConfig;
use crate::interpolate::Environment;
use crate::params::QueryParams;
use crate::session::AgentRuntime;

pub(crate) fn config(prompt: &str) -> CallConfig {
    let params = QueryParams {
        prompt: prompt.into(),
        ..Default::default()
    };
    CallConfig::resolve(&params, &Environment::new()).unwrap()
}

pub(crate) fn init(tools: &[&str]) -> Message {
    Message::System(SystemMessage {
        session_id: "s1".into(),
        payload: SystemPayload::Init(SystemInit {
            model: "claude-sonnet-4-6".into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            mcp_servers: vec![McpServerStatus {
                name: "fs".into(),
                status: "connected".into(),
            }],
            ..Default::default()
        }),
    })
}

pub(crate) fn assistant(content: Vec<ContentBlock>) -> Message {
    Message::Assistant(AssistantMessage {
        message: AssistantContent {
            content,
            ..Default::default()
        },
        parent_tool_use_id: None,
        error: None,
        session_id: "s1".into(),
        uuid: None,
    })
}

pub(crate) fn assistant_text(text: &str) -> Message {
    assistant(vec![ContentBlock::Text { text: text.into() }])
}

pub(crate) fn tool_use(name: &str) -> Message {
    assistant(vec![ContentBlock::ToolUse {
        id: "tu_1".into(),
        name: name.into(),
        input: serde_json::json!({}),
    }])
}

pub(crate) fn user(text: &str) -> Message {
    Message::User(UserMessage {
        message: UserContent {
            role: "user".into(),
            content: UserContentBody::Text(text.into()),
        },
        parent_tool_use_id: None,
        session_id: "s1".into(),
        uuid: None,
    })
}

pub(crate) fn result(subtype: ResultSubtype) -> ResultMessage {
    ResultMessage {
        subtype,
        session_id: "s1".into(),
        result: None,
        error: None,
        errors: vec![],
        duration_ms: 0,
        duration_api_ms: 0,
        is_error: false,
        num_turns: 1,
        stop_reason: None,
        total_cost_usd: 0.0,
        usage: ResultUsage::default(),
        uuid: None,
    }
}

pub(crate) fn success(text: &str, duration_ms: u64, cost: f64) -> Message {
    Message::Result(ResultMessage {
        result: Some(text.into()),
        duration_ms,
        total_cost_usd: cost,
        ..result(ResultSubtype::Success)
    })
}

pub(crate) fn terminal(subtype: ResultSubtype) -> Message {
    Message::Result(ResultMessage {
        is_error: true,
        ..result(subtype)
    })
}

// ---------------------------------------------------------------------------
// ScriptedRuntime
// ---------------------------------------------------------------------------

pub(crate) enum Step {
    Send(Message),
    Fail(String),
    /// Pause until the token fires, then continue with the next step.
    WaitForCancel,
    /// Pause until the token fires, then end with `Cancelled`.
    AbortOnCancel,
}

/// Plays back one script per `open` call, in order, and records the
/// configurations it was opened with.
pub(crate) struct ScriptedRuntime {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    pub(crate) opened: Mutex<Vec<CallConfig>>,
}

impl ScriptedRuntime {
    pub(crate) fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn single(steps: Vec<Step>) -> Self {
        Self::new(vec![steps])
    }
}

impl AgentRuntime for ScriptedRuntime {
    fn open(&self, config: &CallConfig, cancel: CancellationToken) -> QueryStream {
        self.opened.lock().unwrap().push(config.clone());
        let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            for step in steps {
                match step {
                    Step::Send(msg) => {
                        if tx.send(Ok(msg)).await.is_err() {
                            return;
                        }
                    }
                    Step::Fail(reason) => {
                        let _ = tx.send(Err(ClaudeAgentError::Process(reason))).await;
                        return;
                    }
                    Step::WaitForCancel => cancel.cancelled().await,
                    Step::AbortOnCancel => {
                        cancel.cancelled().await;
                        let _ = tx.send(Err(ClaudeAgentError::Cancelled)).await;
                        return;
                    }
                }
            }
        });

        QueryStream::from_channel(rx)
    }
}
