use claude_agent::PermissionMode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::QueryError;
use crate::tokenize::tokenize;

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Start a new conversation.
    #[default]
    Query,
    /// Continue the most recent conversation in the working directory.
    Continue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Model {
    #[default]
    Sonnet,
    Opus,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Sonnet => "sonnet",
            Model::Opus => "opus",
        }
    }
}

impl FromStr for Model {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sonnet" => Ok(Model::Sonnet),
            "opus" => Ok(Model::Opus),
            other => Err(QueryError::Validation(format!(
                "unknown model '{other}': expected sonnet or opus"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// Messages plus summary, result and metrics.
    #[default]
    Structured,
    /// The raw message log.
    Messages,
    /// Only the final result text.
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Structured => "structured",
            OutputFormat::Messages => "messages",
            OutputFormat::Text => "text",
        }
    }
}

// ---------------------------------------------------------------------------
// ToolGrant
// ---------------------------------------------------------------------------

/// Which tools of an MCP server are auto-approved.
///
/// Accepts `"*"`, a comma or space separated string, or a list of names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawGrant", into = "RawGrant")]
pub enum ToolGrant {
    #[default]
    All,
    Tools(Vec<String>),
}

impl ToolGrant {
    /// Allow-list entries this grant contributes for `server`.
    pub fn tool_names(&self, server: &str) -> Vec<String> {
        match self {
            ToolGrant::All => vec![format!("mcp__{server}")],
            ToolGrant::Tools(tools) => tools
                .iter()
                .map(|t| format!("mcp__{server}__{t}"))
                .collect(),
        }
    }

    fn from_names(names: Vec<String>) -> Self {
        if names.iter().any(|n| n == "*") {
            ToolGrant::All
        } else {
            ToolGrant::Tools(names)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawGrant {
    One(String),
    Many(Vec<String>),
}

impl From<RawGrant> for ToolGrant {
    fn from(raw: RawGrant) -> Self {
        match raw {
            RawGrant::One(s) => ToolGrant::from_names(tokenize(s.trim())),
            RawGrant::Many(names) => ToolGrant::from_names(
                names
                    .into_iter()
                    .map(|n| n.trim().to_owned())
                    .filter(|n| !n.is_empty())
                    .collect(),
            ),
        }
    }
}

impl From<ToolGrant> for RawGrant {
    fn from(grant: ToolGrant) -> Self {
        match grant {
            ToolGrant::All => RawGrant::One("*".into()),
            ToolGrant::Tools(tools) => RawGrant::Many(tools),
        }
    }
}

// ---------------------------------------------------------------------------
// QueryParams
// ---------------------------------------------------------------------------

fn default_max_turns() -> u32 {
    25
}

fn default_timeout() -> u64 {
    300
}

fn default_allowed_tools() -> Vec<String> {
    ["WebFetch", "TodoWrite", "WebSearch", "exit_plan_mode", "Task"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Raw per-item parameters as supplied by the host layer.
///
/// Field names follow the host's camelCase schema. Nothing here is
/// validated; [`crate::config::CallConfig::resolve`] does that once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(default)]
    pub operation: Operation,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: Model,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Seconds before the call is cancelled.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default, alias = "workingDirectory")]
    pub project_path: String,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub disallowed_tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<RawMcpServer>,
    #[serde(default)]
    pub additional_options: AdditionalOptions,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            operation: Operation::default(),
            prompt: String::new(),
            model: Model::default(),
            max_turns: default_max_turns(),
            timeout: default_timeout(),
            project_path: String::new(),
            output_format: OutputFormat::default(),
            allowed_tools: default_allowed_tools(),
            disallowed_tools: Vec::new(),
            mcp_servers: Vec::new(),
            additional_options: AdditionalOptions::default(),
        }
    }
}

/// One MCP server row as entered by the user. `args` and `env` are free
/// text; name and command may be missing, in which case the row is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMcpServer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: String,
    /// `KEY=value` per line.
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub allowed_mcp_tools: ToolGrant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalOptions {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub permission_mode: Option<PermissionMode>,
    /// Legacy boolean form of `permission_mode`.
    #[serde(default)]
    pub require_permissions: Option<bool>,
    #[serde(default)]
    pub debug: bool,
    /// `sonnet`, `opus`, or empty for none.
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub max_thinking_tokens: Option<u32>,
}
