//! Minimal MCP server over stdio.
//!
//! Speaks JSON-RPC 2.0 with either newline-delimited JSON or
//! Content-Length framing, auto-detected once per process from the first
//! bytes the client sends. stdout carries only protocol frames; all logging
//! goes to stderr.

use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::auth::Auth;
use crate::client::EeClient;
use crate::config::Config;
use crate::tools::{TOOL_NAME, manage_content, tool_definition};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    NewlineJson,
    ContentLength,
}

pub struct McpServer {
    client: EeClient,
}

impl McpServer {
    pub fn new(config: Config) -> Self {
        let auth = Auth::new(config.shortkey);
        let client = EeClient::new(
            config.api_url,
            auth,
            Duration::from_secs(config.timeout_secs),
        );
        Self { client }
    }

    /// Handle one JSON-RPC message. Returns `None` for notifications, which
    /// must not be answered.
    pub fn handle_request(&self, request: &Value) -> Option<Value> {
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if method.starts_with("notifications/") {
            return None;
        }
        let id = request.get("id").cloned()?;
        let params = request.get("params");

        let response = match method {
            "initialize" => ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": "ee-mcp",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => ok(id, json!({})),
            "tools/list" => ok(id, json!({ "tools": [tool_definition()] })),
            "tools/call" => self.handle_tool_call(id, params),
            other => rpc_error(id, -32601, format!("Method not found: {other}")),
        };
        Some(response)
    }

    fn handle_tool_call(&self, id: Value, params: Option<&Value>) -> Value {
        let params = params.cloned().unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name != TOOL_NAME {
            return rpc_error(id, -32602, format!("Unknown tool: {name}"));
        }

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let action = arguments
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let tool_params = arguments
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let text = if action.is_empty() {
            "Missing required parameter: action".to_string()
        } else {
            manage_content(&self.client, action, &tool_params)
        };

        ok(id, json!({ "content": [{ "type": "text", "text": text }] }))
    }

    /// Blocking serve loop over stdin/stdout. Returns when the client closes
    /// its end.
    pub fn run_stdio(&self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut reader = BufReader::new(stdin.lock());
        let mut stdout = std::io::stdout().lock();
        let mut framing: Option<Framing> = None;

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).context("read stdin")? == 0 {
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }

            let mode = *framing.get_or_insert_with(|| detect_framing(&line));
            let payload = match mode {
                Framing::NewlineJson => line,
                Framing::ContentLength => {
                    match read_content_length_body(&mut reader, &line)? {
                        Some(body) => body,
                        None => return Ok(()),
                    }
                }
            };

            let reply = match serde_json::from_str::<Value>(&payload) {
                Ok(request) => self.handle_request(&request),
                Err(e) => {
                    tracing::warn!("unparseable frame: {e}");
                    Some(rpc_error(Value::Null, -32700, format!("Parse error: {e}")))
                }
            };

            if let Some(reply) = reply {
                write_frame(&mut stdout, mode, &reply)?;
            }
        }
    }
}

fn ok(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// A first line starting with `{` is newline-delimited JSON; anything
/// header-shaped means Content-Length framing.
fn detect_framing(first_line: &str) -> Framing {
    if first_line.trim_start().starts_with('{') {
        Framing::NewlineJson
    } else {
        Framing::ContentLength
    }
}

fn parse_content_length(line: &str) -> Option<usize> {
    let (key, value) = line.trim().split_once(':')?;
    if !key.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Consume header lines up to the blank separator, then read the body.
/// `first_line` is the header line already pulled off the reader.
fn read_content_length_body(
    reader: &mut impl BufRead,
    first_line: &str,
) -> Result<Option<String>> {
    const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

    let mut length = parse_content_length(first_line);
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).context("read header")? == 0 {
            // EOF mid-frame: treat as connection close.
            return Ok(None);
        }
        if header.trim().is_empty() {
            break;
        }
        if length.is_none() {
            length = parse_content_length(&header);
        }
    }

    let length = length.context("missing Content-Length header")?;
    anyhow::ensure!(length <= MAX_BODY_BYTES, "frame exceeds {MAX_BODY_BYTES} bytes");

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).context("read frame body")?;
    String::from_utf8(body).context("frame body is not UTF-8").map(Some)
}

fn write_frame(out: &mut impl Write, mode: Framing, reply: &Value) -> Result<()> {
    let body = serde_json::to_string(reply).context("serialize response")?;
    match mode {
        Framing::NewlineJson => writeln!(out, "{body}").context("write response")?,
        Framing::ContentLength => {
            write!(out, "Content-Length: {}\r\n\r\n{body}", body.len())
                .context("write response")?;
        }
    }
    out.flush().context("flush stdout")
}
