use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ─── Outer Message enum ───────────────────────────────────────────────────

/// Every message emitted by `claude --output-format stream-json`.
/// Discriminated by the JSON `"type"` field.
///
/// Fields are deliberately lenient (`#[serde(default)]`) so that older and
/// newer CLI builds, which add and drop fields freely, still parse.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    Assistant(AssistantMessage),
    User(UserMessage),
    Result(ResultMessage),
    /// `stream_event`: partial assistant message chunks (--include-partial-messages)
    StreamEvent(StreamEventMessage),
    /// `tool_progress`: progress updates during tool execution
    ToolProgress(ToolProgressMessage),
    /// `tool_use_summary`: summary after tool calls complete
    ToolUseSummary(ToolUseSummaryMessage),
    /// `auth_status`: authentication status during session init
    AuthStatus(AuthStatusMessage),
}

impl Message {
    /// The wire name of this message's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::System(_) => "system",
            Message::Assistant(_) => "assistant",
            Message::User(_) => "user",
            Message::Result(_) => "result",
            Message::StreamEvent(_) => "stream_event",
            Message::ToolProgress(_) => "tool_progress",
            Message::ToolUseSummary(_) => "tool_use_summary",
            Message::AuthStatus(_) => "auth_status",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Message::System(m) => &m.session_id,
            Message::Assistant(m) => &m.session_id,
            Message::User(m) => &m.session_id,
            Message::Result(m) => &m.session_id,
            Message::StreamEvent(m) => &m.session_id,
            Message::ToolProgress(m) => &m.session_id,
            Message::ToolUseSummary(m) => &m.session_id,
            Message::AuthStatus(m) => &m.session_id,
        }
    }

    /// Returns `Some(&ResultMessage)` if this is the terminal result message.
    pub fn as_result(&self) -> Option<&ResultMessage> {
        if let Message::Result(r) = self {
            Some(r)
        } else {
            None
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        if let Message::Assistant(a) = self {
            Some(a)
        } else {
            None
        }
    }

    /// Returns the `system/init` payload, if this is one.
    pub fn as_init(&self) -> Option<&SystemInit> {
        match self {
            Message::System(SystemMessage {
                payload: SystemPayload::Init(init),
                ..
            }) => Some(init),
            _ => None,
        }
    }
}

// ─── System messages ──────────────────────────────────────────────────────

/// `type = "system"`: further distinguished by `subtype`.
///
/// Uses `#[serde(flatten)]` to allow the inner `SystemPayload` enum
/// (tagged by `subtype`) to consume remaining fields after `session_id`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemMessage {
    #[serde(default)]
    pub session_id: String,
    #[serde(flatten)]
    pub payload: SystemPayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum SystemPayload {
    /// First message: contains model, tools, MCP servers, permission mode
    Init(SystemInit),
    /// Status update during session
    Status(SystemStatus),
    /// Compact context boundary (auto/manual compaction)
    CompactBoundary(CompactBoundaryPayload),
    /// Any other subtype (e.g. `hook_response`), kept as sent, `subtype`
    /// included.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SystemInit {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServerStatus>,
    /// Permission mode: CLI sends camelCase (`permissionMode`)
    #[serde(
        default,
        alias = "permissionMode",
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_code_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// One entry of the MCP server inventory advertised by `system/init`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct McpServerStatus {
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompactBoundaryPayload {
    pub compact_metadata: CompactMetadata,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompactMetadata {
    pub trigger: String,
    pub pre_tokens: u64,
}

// ─── Assistant messages ───────────────────────────────────────────────────

/// `type = "assistant"`: the model's response, including content blocks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub message: AssistantContent,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl AssistantMessage {
    /// The first `text` block, empty or not.
    pub fn first_text_block(&self) -> Option<&str> {
        self.message.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Text of the first `text` block, unless that block is empty.
    pub fn text(&self) -> Option<&str> {
        self.first_text_block().filter(|t| !t.is_empty())
    }

    /// Whether the first content block is a tool invocation.
    pub fn starts_with_tool_use(&self) -> bool {
        matches!(
            self.message.content.first(),
            Some(ContentBlock::ToolUse { .. })
        )
    }
}

/// The `BetaMessage` shape from Anthropic SDK, as it appears in stream-json.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AssistantContent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Content blocks within an assistant message.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        /// Tool inputs are schema-polymorphic (varies per tool), so Value is correct here.
        #[serde(default)]
        input: serde_json::Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    /// Block kinds this crate does not model (e.g. `redacted_thinking`),
    /// kept as sent.
    #[serde(untagged)]
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

// ─── User messages ────────────────────────────────────────────────────────

/// `type = "user"`: the prompt echo or tool results fed back to the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserMessage {
    pub message: UserContent,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl UserMessage {
    pub fn has_tool_result(&self) -> bool {
        match &self.message.content {
            UserContentBody::Blocks(blocks) => blocks
                .iter()
                .any(|b| matches!(b, UserContentBlock::ToolResult { .. })),
            UserContentBody::Text(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserContent {
    #[serde(default)]
    pub role: String,
    pub content: UserContentBody,
}

/// User content is either a bare string or a list of blocks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UserContentBody {
    Text(String),
    Blocks(Vec<UserContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentBlock {
    Text {
        text: String,
    },
    ToolResult {
        tool_use_id: String,
        /// A string or a list of content parts, depending on the tool.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    #[serde(untagged)]
    Other(serde_json::Value),
}

// ─── Result messages ──────────────────────────────────────────────────────

/// `type = "result"`: the terminal message in every query stream.
///
/// `subtype` distinguishes success from the various error conditions. Any
/// subtype may carry `result` or `error`; neither is guaranteed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResultMessage {
    pub subtype: ResultSubtype,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub duration_api_ms: u64,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default)]
    pub usage: ResultUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl ResultMessage {
    pub fn is_success(&self) -> bool {
        self.subtype == ResultSubtype::Success
    }

    /// The final result text, when present and non-empty.
    pub fn result_text(&self) -> Option<&str> {
        self.result.as_deref().filter(|s| !s.is_empty())
    }

    /// The `error` field, when present and non-empty.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref().filter(|s| !s.is_empty())
    }
}

/// Terminal classification tag on a result message.
///
/// Unknown subtypes are preserved verbatim in [`ResultSubtype::Other`] so a
/// re-serialized log matches what the CLI sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ResultSubtype {
    Success,
    ErrorMaxTurns,
    ErrorDuringExecution,
    ErrorMaxBudgetUsd,
    Other(String),
}

impl ResultSubtype {
    pub fn as_str(&self) -> &str {
        match self {
            ResultSubtype::Success => "success",
            ResultSubtype::ErrorMaxTurns => "error_max_turns",
            ResultSubtype::ErrorDuringExecution => "error_during_execution",
            ResultSubtype::ErrorMaxBudgetUsd => "error_max_budget_usd",
            ResultSubtype::Other(s) => s,
        }
    }
}

impl From<String> for ResultSubtype {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => ResultSubtype::Success,
            "error_max_turns" => ResultSubtype::ErrorMaxTurns,
            "error_during_execution" => ResultSubtype::ErrorDuringExecution,
            "error_max_budget_usd" => ResultSubtype::ErrorMaxBudgetUsd,
            _ => ResultSubtype::Other(s),
        }
    }
}

impl From<ResultSubtype> for String {
    fn from(subtype: ResultSubtype) -> Self {
        subtype.as_str().to_owned()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

// ─── Ancillary message types ──────────────────────────────────────────────

/// `type = "stream_event"`: partial chunks (only with --include-partial-messages).
/// We don't process partial chunks, but we must not fail to parse them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamEventMessage {
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    #[serde(default)]
    pub session_id: String,
}

/// `type = "tool_progress"`: emitted periodically while a tool is running.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolProgressMessage {
    pub tool_use_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub elapsed_time_seconds: f64,
    #[serde(default)]
    pub session_id: String,
}

/// `type = "tool_use_summary"`: emitted after a batch of tool calls.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolUseSummaryMessage {
    pub summary: String,
    #[serde(default)]
    pub preceding_tool_use_ids: Vec<String>,
    #[serde(default)]
    pub session_id: String,
}

/// `type = "auth_status"`: authentication status (SSO flows, API key issues).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuthStatusMessage {
    #[serde(rename = "isAuthenticating", default)]
    pub is_authenticating: bool,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub session_id: String,
}

// ─── QueryOptions ─────────────────────────────────────────────────────────

/// Options for driving a Claude subprocess query.
///
/// Every field maps onto one `claude` CLI flag or environment variable; see
/// `process::build_command`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Claude model alias or name (e.g. `"sonnet"`)
    pub model: Option<String>,
    /// Model to fall back to when the primary one is overloaded
    pub fallback_model: Option<String>,
    /// Maximum number of agentic turns before stopping with `error_max_turns`
    pub max_turns: Option<u32>,
    /// Extended-thinking token budget (`MAX_THINKING_TOKENS`)
    pub max_thinking_tokens: Option<u32>,
    /// Tool names that are auto-approved without user prompting
    pub allowed_tools: Vec<String>,
    /// Tool names that are explicitly disallowed
    pub disallowed_tools: Vec<String>,
    /// Permission mode for tool execution
    pub permission_mode: PermissionMode,
    /// Override system prompt
    pub system_prompt: Option<String>,
    /// Continue the most recent conversation
    pub continue_conversation: bool,
    /// MCP servers to register for this session
    pub mcp_servers: Vec<McpServerConfig>,
    /// Working directory for the subprocess (default: current dir)
    pub cwd: Option<PathBuf>,
    /// Additional environment variables for the subprocess
    pub env: BTreeMap<String, String>,
    /// Custom path to the `claude` binary (default: `"claude"`)
    pub path_to_executable: Option<String>,
}

/// Permission mode: controls how tool executions are authorized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Standard: prompts for dangerous operations
    #[default]
    Default,
    /// Auto-accept file edit operations
    AcceptEdits,
    /// Bypass all permission checks
    BypassPermissions,
    /// Planning mode: no actual tool execution
    Plan,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}

/// MCP server configuration for stdio transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerConfig {
    /// Logical name for this server (used in tool names as `mcp__<name>__<tool>`)
    pub name: String,
    /// Executable to spawn
    pub command: String,
    /// Arguments for the executable
    pub args: Vec<String>,
    /// Additional environment variables for the server process
    pub env: BTreeMap<String, String>,
}
