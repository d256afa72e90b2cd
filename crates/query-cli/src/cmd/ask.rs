use anyhow::Result;
use clap::ValueEnum;
use query_core::params::AdditionalOptions;
use query_core::{Model, Operation, OutputFormat, PermissionMode, QueryParams};
use std::path::PathBuf;

use super::{execute, Globals};

#[derive(clap::Args)]
pub struct AskArgs {
    /// Prompt to send to Claude
    prompt: String,

    /// Model to use (sonnet or opus)
    #[arg(long, default_value = "sonnet")]
    model: Model,

    /// Model to switch to when the primary one is overloaded
    #[arg(long)]
    fallback_model: Option<String>,

    /// Maximum conversation turns
    #[arg(long, default_value_t = 25)]
    max_turns: u32,

    /// Seconds before the query is cancelled
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Working directory for Claude
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Shape of the emitted record
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Auto-approved tool (repeatable or comma separated; replaces the default list)
    #[arg(long = "allow", value_name = "TOOL", value_delimiter = ',')]
    allowed_tools: Vec<String>,

    /// Blocked tool (repeatable or comma separated)
    #[arg(long = "deny", value_name = "TOOL", value_delimiter = ',')]
    disallowed_tools: Vec<String>,

    /// Continue the most recent conversation in the working directory
    #[arg(long = "continue")]
    continue_conversation: bool,

    /// Override the system prompt
    #[arg(long)]
    system_prompt: Option<String>,

    /// Tool permission policy (default: bypassPermissions)
    #[arg(long, value_enum)]
    permission_mode: Option<PermissionArg>,

    /// Extended-thinking token budget
    #[arg(long)]
    max_thinking_tokens: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Structured,
    Messages,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Structured => OutputFormat::Structured,
            FormatArg::Messages => OutputFormat::Messages,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PermissionArg {
    #[value(name = "default")]
    Default,
    #[value(name = "acceptEdits")]
    AcceptEdits,
    #[value(name = "bypassPermissions")]
    BypassPermissions,
    #[value(name = "plan")]
    Plan,
}

impl From<PermissionArg> for PermissionMode {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Default => PermissionMode::Default,
            PermissionArg::AcceptEdits => PermissionMode::AcceptEdits,
            PermissionArg::BypassPermissions => PermissionMode::BypassPermissions,
            PermissionArg::Plan => PermissionMode::Plan,
        }
    }
}

impl AskArgs {
    fn into_params(self, debug: bool) -> QueryParams {
        let defaults = QueryParams::default();
        QueryParams {
            operation: if self.continue_conversation {
                Operation::Continue
            } else {
                Operation::Query
            },
            prompt: self.prompt,
            model: self.model,
            max_turns: self.max_turns,
            timeout: self.timeout,
            project_path: self
                .cwd
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            output_format: self.format.into(),
            allowed_tools: if self.allowed_tools.is_empty() {
                defaults.allowed_tools
            } else {
                self.allowed_tools
            },
            disallowed_tools: self.disallowed_tools,
            mcp_servers: Vec::new(),
            additional_options: AdditionalOptions {
                system_prompt: self.system_prompt,
                permission_mode: self.permission_mode.map(Into::into),
                require_permissions: None,
                debug,
                fallback_model: self.fallback_model,
                max_thinking_tokens: self.max_thinking_tokens,
            },
        }
    }
}

pub fn run(globals: &Globals, args: AskArgs) -> Result<()> {
    let params = args.into_params(globals.verbose);
    execute(globals, &[params], globals.continue_on_fail)
}
