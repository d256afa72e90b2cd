use claude_agent::{McpServerConfig, PermissionMode, QueryOptions};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{QueryError, Result};
use crate::interpolate::{interpolate, Environment};
use crate::params::{Model, Operation, OutputFormat, QueryParams, RawMcpServer, ToolGrant};
use crate::tokenize::tokenize;

// ---------------------------------------------------------------------------
// McpServerDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerDefinition {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub tool_grant: ToolGrant,
}

impl McpServerDefinition {
    /// Parse one raw row. Rows without a name or command yield `None`.
    pub fn from_raw(raw: &RawMcpServer, env: &Environment) -> Option<Self> {
        let name = raw.name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let command = raw
            .command
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        Some(Self {
            name: name.to_owned(),
            command: command.to_owned(),
            args: tokenize(raw.args.trim()),
            env: parse_env_block(&raw.env, env),
            tool_grant: raw.allowed_mcp_tools.clone(),
        })
    }

    fn to_agent_config(&self) -> McpServerConfig {
        McpServerConfig {
            name: self.name.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
        }
    }
}

/// Parse `KEY=value` lines. The first `=` splits key from value; lines
/// without one are ignored. Values are interpolated against `env`.
fn parse_env_block(block: &str, env: &Environment) -> BTreeMap<String, String> {
    block
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter_map(|(key, value)| {
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_owned(), interpolate(value.trim(), env)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CallConfig
// ---------------------------------------------------------------------------

/// The effective, validated configuration for one call.
///
/// Built once by [`CallConfig::resolve`] and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CallConfig {
    pub prompt: String,
    pub model: Model,
    pub fallback_model: Option<Model>,
    pub max_turns: u32,
    pub max_thinking_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub working_directory: Option<PathBuf>,
    pub permission_mode: PermissionMode,
    pub system_prompt: Option<String>,
    pub continue_conversation: bool,
    /// Built-in and MCP grants, with every disallowed name removed.
    pub allowed_tools: BTreeSet<String>,
    pub disallowed_tools: BTreeSet<String>,
    pub mcp_servers: BTreeMap<String, McpServerDefinition>,
    pub output_format: OutputFormat,
    pub debug: bool,
}

impl CallConfig {
    /// Validate `params` and merge them into a `CallConfig`.
    ///
    /// MCP `env` values are interpolated against `env`.
    pub fn resolve(params: &QueryParams, env: &Environment) -> Result<Self> {
        let prompt = params.prompt.trim();
        if prompt.is_empty() {
            return Err(QueryError::Validation(
                "Prompt is required and cannot be empty".into(),
            ));
        }
        if params.max_turns == 0 {
            return Err(QueryError::Validation(
                "maxTurns must be at least 1".into(),
            ));
        }
        if params.timeout == 0 {
            return Err(QueryError::Validation(
                "timeout must be at least 1 second".into(),
            ));
        }

        let opts = &params.additional_options;
        let debug = opts.debug;

        let mut mcp_servers = BTreeMap::new();
        for (index, raw) in params.mcp_servers.iter().enumerate() {
            match McpServerDefinition::from_raw(raw, env) {
                Some(def) => {
                    if mcp_servers.insert(def.name.clone(), def).is_some() && debug {
                        tracing::debug!(index, "duplicate MCP server name, later entry wins");
                    }
                }
                None if debug => {
                    tracing::debug!(index, "skipping MCP server entry without name or command");
                }
                None => {}
            }
        }

        let disallowed_tools: BTreeSet<String> = params
            .disallowed_tools
            .iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();

        let allowed_tools: BTreeSet<String> = params
            .allowed_tools
            .iter()
            .map(|t| t.trim().to_owned())
            .chain(
                mcp_servers
                    .values()
                    .flat_map(|def| def.tool_grant.tool_names(&def.name)),
            )
            .filter(|t| !t.is_empty() && !disallowed_tools.contains(t))
            .collect();

        let permission_mode = match (opts.permission_mode, opts.require_permissions) {
            (Some(mode), _) => mode,
            (None, Some(true)) => PermissionMode::Default,
            (None, Some(false)) | (None, None) => PermissionMode::BypassPermissions,
        };

        let fallback_model = match opts.fallback_model.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(name.parse::<Model>()?),
        };

        let config = Self {
            prompt: prompt.to_owned(),
            model: params.model,
            fallback_model,
            max_turns: params.max_turns,
            max_thinking_tokens: opts.max_thinking_tokens.filter(|&n| n > 0),
            timeout_secs: params.timeout,
            working_directory: non_blank(&params.project_path).map(PathBuf::from),
            permission_mode,
            system_prompt: opts.system_prompt.as_deref().and_then(non_blank).map(str::to_owned),
            continue_conversation: params.operation == Operation::Continue,
            allowed_tools,
            disallowed_tools,
            mcp_servers,
            output_format: params.output_format,
            debug,
        };

        if debug {
            tracing::debug!(
                model = config.model.as_str(),
                max_turns = config.max_turns,
                timeout_secs = config.timeout_secs,
                cwd = ?config.working_directory,
                allowed_tools = ?config.allowed_tools,
                disallowed_tools = ?config.disallowed_tools,
                mcp_servers = config.mcp_servers.len(),
                fallback_model = config.fallback_model.map_or("none", |m| m.as_str()),
                "resolved call configuration"
            );
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Translate into the process driver's option set.
    pub fn to_query_options(&self, path_to_executable: Option<&str>) -> QueryOptions {
        QueryOptions {
            model: Some(self.model.as_str().to_owned()),
            fallback_model: self.fallback_model.map(|m| m.as_str().to_owned()),
            max_turns: Some(self.max_turns),
            max_thinking_tokens: self.max_thinking_tokens,
            allowed_tools: self.allowed_tools.iter().cloned().collect(),
            disallowed_tools: self.disallowed_tools.iter().cloned().collect(),
            permission_mode: self.permission_mode,
            system_prompt: self.system_prompt.clone(),
            continue_conversation: self.continue_conversation,
            mcp_servers: self
                .mcp_servers
                .values()
                .map(McpServerDefinition::to_agent_config)
                .collect(),
            cwd: self.working_directory.clone(),
            env: BTreeMap::new(),
            path_to_executable: path_to_executable.map(str::to_owned),
        }
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
