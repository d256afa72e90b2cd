use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::types::{McpServerConfig, Message, PermissionMode, QueryOptions};
use crate::{ClaudeAgentError, Result};

// ─── ClaudeProcess ────────────────────────────────────────────────────────

/// A running `claude --output-format stream-json --input-format stream-json`
/// subprocess using bidirectional streaming.
///
/// The prompt is sent as a JSON message on stdin, and responses are read as
/// JSONL from stdout. Stderr is captured in a background task and surfaced
/// on process exit errors.
pub(crate) struct ClaudeProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    /// Stderr output collected by a background reader task.
    stderr_buf: Arc<Mutex<String>>,
    stderr_task: Option<JoinHandle<()>>,
}

/// How long to wait for the stderr reader to reach EOF once the child exited.
const STDERR_FLUSH: Duration = Duration::from_millis(500);

impl ClaudeProcess {
    /// Spawn the `claude` binary with the given prompt and options.
    ///
    /// The prompt is sent as a user message on stdin. After sending, stdin is
    /// closed for single-turn operation.
    ///
    /// `CLAUDECODE` is removed from the environment so this works both from a
    /// terminal and from inside a running Claude session.
    pub(crate) async fn spawn(prompt: &str, opts: &QueryOptions) -> Result<Self> {
        let mut cmd = build_command(opts);
        cmd.env_remove("CLAUDECODE");

        let mut process = Self::from_command(cmd)?;

        let user_msg = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            }
        });
        process.send_message(&user_msg).await?;
        process.close_stdin();

        Ok(process)
    }

    /// Spawn an arbitrary command as a mock Claude process.
    /// Used in unit tests to inject a command that emits fixed JSON lines.
    #[cfg(test)]
    pub(crate) fn spawn_command(cmd: Command) -> Result<Self> {
        Self::from_command(cmd)
    }

    fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            let program = cmd.as_std().get_program().to_string_lossy().into_owned();
            ClaudeAgentError::Process(format!("failed to spawn '{program}': {e}"))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClaudeAgentError::Process("stdout not captured".into()))?;

        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        let stderr_task = child.stderr.take().map(|stderr| {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            })
        });

        let lines = BufReader::new(stdout).lines();
        Ok(Self {
            child,
            lines,
            stdin,
            stderr_buf,
            stderr_task,
        })
    }

    /// Write a JSON message to the subprocess stdin.
    pub(crate) async fn send_message(&mut self, msg: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClaudeAgentError::Process("stdin already closed".into()))?;

        let mut buf = serde_json::to_vec(msg).map_err(|e| {
            ClaudeAgentError::Process(format!("failed to serialize stdin message: {e}"))
        })?;
        buf.push(b'\n');

        stdin.write_all(&buf).await?;
        stdin.flush().await?;

        Ok(())
    }

    /// Close stdin, signalling no more input (single-turn mode).
    pub(crate) fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Read the next non-empty JSONL line from stdout and deserialize it.
    ///
    /// Unknown message types (e.g. `rate_limit_event`) are skipped. Returns
    /// `Ok(None)` on EOF.
    ///
    /// Cancel-safe: the only state held across awaits is the line buffer.
    pub(crate) async fn next_message(&mut self) -> Result<Option<Message>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(trimmed) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    if is_unknown_message_type(trimmed) {
                        tracing::debug!(line = %trimmed, "skipping unrecognised stream-json message");
                        continue;
                    }
                    return Err(ClaudeAgentError::Parse {
                        line: trimmed.to_owned(),
                        source: e,
                    });
                }
            }
        }
    }

    /// Wait for the child to exit and return an error if the exit code is
    /// non-zero or the process was killed by a signal. Captured stderr is
    /// included in the message.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<ClaudeAgentError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(ClaudeAgentError::Io(e)),
        };

        if status.success() {
            return None;
        }

        if let Some(task) = self.stderr_task.take() {
            let _ = tokio::time::timeout(STDERR_FLUSH, task).await;
        }

        let stderr = self
            .stderr_buf
            .lock()
            .ok()
            .map(|b| b.clone())
            .unwrap_or_default();

        let head = match status.code() {
            Some(code) => format!("Claude Code process exited with code {code}"),
            None => "Claude Code process terminated by signal".to_string(),
        };
        let msg = if stderr.is_empty() {
            head
        } else {
            format!("{head}\nstderr: {stderr}")
        };

        Some(ClaudeAgentError::Process(msg))
    }

    /// Kill the subprocess (best-effort; errors are silently ignored).
    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// A line that is valid JSON with a `"type"` field we failed to parse is an
/// unknown message kind and can be skipped; anything else is a parse error.
fn is_unknown_message_type(line: &str) -> bool {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(line) else {
        return false;
    };
    match v.get("type").and_then(|t| t.as_str()) {
        Some(kind) => !matches!(
            kind,
            "system"
                | "assistant"
                | "user"
                | "result"
                | "stream_event"
                | "tool_progress"
                | "tool_use_summary"
                | "auth_status"
        ),
        None => false,
    }
}

// ─── Command builder ──────────────────────────────────────────────────────

pub(crate) fn build_command(opts: &QueryOptions) -> Command {
    let exe = opts.path_to_executable.as_deref().unwrap_or("claude");
    let mut cmd = Command::new(exe);

    cmd.arg("--output-format")
        .arg("stream-json")
        .arg("--verbose")
        .arg("--input-format")
        .arg("stream-json");

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(fallback) = &opts.fallback_model {
        cmd.arg("--fallback-model").arg(fallback);
    }

    if let Some(max_turns) = opts.max_turns {
        cmd.arg("--max-turns").arg(max_turns.to_string());
    }

    if !opts.allowed_tools.is_empty() {
        cmd.arg("--allowed-tools").args(&opts.allowed_tools);
    }

    if !opts.disallowed_tools.is_empty() {
        cmd.arg("--disallowed-tools").args(&opts.disallowed_tools);
    }

    if opts.permission_mode != PermissionMode::Default {
        cmd.arg("--permission-mode")
            .arg(opts.permission_mode.as_str());
    }

    if let Some(sp) = &opts.system_prompt {
        cmd.arg("--system-prompt").arg(sp);
    }

    if opts.continue_conversation {
        cmd.arg("--continue");
    }

    if !opts.mcp_servers.is_empty() {
        cmd.arg("--mcp-config")
            .arg(build_mcp_config_json(&opts.mcp_servers));
    }

    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    for (k, v) in &opts.env {
        cmd.env(k, v);
    }

    if let Some(tokens) = opts.max_thinking_tokens {
        cmd.env("MAX_THINKING_TOKENS", tokens.to_string());
    }

    cmd
}

/// Serialise `McpServerConfig` entries into the JSON string expected by
/// `claude --mcp-config '...'`.
///
/// Format: `{"mcpServers":{"<name>":{"type":"stdio","command":"...","args":[...],"env":{...}}}}`
fn build_mcp_config_json(servers: &[McpServerConfig]) -> String {
    let mut mcp_servers = serde_json::Map::new();

    for srv in servers {
        let mut cfg = serde_json::Map::new();
        cfg.insert("type".into(), "stdio".into());
        cfg.insert("command".into(), srv.command.clone().into());

        if !srv.args.is_empty() {
            cfg.insert("args".into(), serde_json::json!(srv.args));
        }

        if !srv.env.is_empty() {
            cfg.insert("env".into(), serde_json::json!(srv.env));
        }

        mcp_servers.insert(srv.name.clone(), serde_json::Value::Object(cfg));
    }

    serde_json::json!({ "mcpServers": mcp_servers }).to_string()
}

// ─── Tests ────────────────────────────────────────────────────────────────
