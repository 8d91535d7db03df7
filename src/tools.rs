//! The `manage_content` tool: action dispatch and parameter validation.
//!
//! Everything here runs before any network traffic. Validation failures and
//! API failures alike leave this module as plain strings; no structured
//! error crosses the tool boundary.

use serde_json::{Map, Value, json};

use crate::client::EeClient;
use crate::response::{ActionResult, EeError, ErrorKind};

pub const TOOL_NAME: &str = "manage_content";

const AVAILABLE_ACTIONS: &[&str] = &[
    "search_entries",
    "get_entry",
    "create_entry",
    "update_entry",
    "search_categories",
    "get_category",
    "search_channels",
    "get_channel",
];

const CREATE_ENTRY_REQUIRED: &[&str] = &["site_id", "channel_name", "title", "status"];

/// Tool definition advertised via `tools/list`.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Interact with ExpressionEngine content. Actions: search_entries, get_entry, create_entry, update_entry, search_categories, get_category, search_channels, get_channel. Entry params include site_id, channel_name, title, status, summary, body.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "The action to perform",
                    "enum": AVAILABLE_ACTIONS,
                },
                "params": {
                    "type": "object",
                    "description": "Parameters for the action",
                    "additionalProperties": true,
                },
            },
            "required": ["action"],
        },
    })
}

/// Single caller-facing entry point: serialized JSON on success, a
/// human-readable error string on failure.
pub fn manage_content(client: &EeClient, action: &str, params: &Map<String, Value>) -> String {
    tracing::info!(action, "manage_content");
    match run_action(client, action, params) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(
                action,
                kind = err.kind.as_str(),
                "action failed: {}",
                err.message
            );
            match err.kind {
                // Validation never reached the network; surface it bare.
                ErrorKind::MissingParameter | ErrorKind::InvalidAction => err.message,
                _ => format!("Error: {}", err.message),
            }
        }
    }
}

fn run_action(
    client: &EeClient,
    action: &str,
    params: &Map<String, Value>,
) -> Result<String, EeError> {
    let result = match action {
        "search_entries" => client.search_entries(params)?,
        "get_entry" => {
            let entry_id = require(params, "entry_id")?;
            client.get_entry(&entry_id, &site_id_or_default(params))?
        }
        "create_entry" => {
            let missing: Vec<&str> = CREATE_ENTRY_REQUIRED
                .iter()
                .filter(|field| !is_present(params, field))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(EeError::new(
                    ErrorKind::MissingParameter,
                    format!("Missing required parameters: {}", missing.join(", ")),
                ));
            }
            client.create_entry(params)?
        }
        "update_entry" => {
            let entry_id = require(params, "entry_id")?;
            // entry_id rides along in the data set; the rest passes through.
            let mut update = params.clone();
            update.remove("entry_id");
            client.update_entry(&entry_id, &update)?
        }
        "search_categories" => client.search_categories(params)?,
        "get_category" => {
            let category_id = require(params, "category_id")?;
            client.get_category(&category_id, &site_id_or_default(params))?
        }
        "search_channels" => client.search_channels(params)?,
        "get_channel" => {
            let channel_id = require(params, "channel_id")?;
            client.get_channel(&channel_id, &site_id_or_default(params))?
        }
        other => {
            return Err(EeError::new(
                ErrorKind::InvalidAction,
                format!(
                    "Invalid action: {other}. Available actions: {}",
                    AVAILABLE_ACTIONS.join(", ")
                ),
            ));
        }
    };
    render(result)
}

fn render(result: ActionResult) -> Result<String, EeError> {
    serde_json::to_string_pretty(&result.into_value()).map_err(|e| {
        EeError::new(
            ErrorKind::InvalidFormat,
            format!("Failed to serialize response: {e}"),
        )
    })
}

/// Present means a non-null, non-empty-string value. Missing identifiers are
/// rejected here, before any request is built.
fn is_present(params: &Map<String, Value>, key: &str) -> bool {
    match params.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn require(params: &Map<String, Value>, key: &str) -> Result<Value, EeError> {
    if !is_present(params, key) {
        return Err(EeError::new(
            ErrorKind::MissingParameter,
            format!("Missing required parameter: {key}"),
        ));
    }
    Ok(params[key].clone())
}

fn site_id_or_default(params: &Map<String, Value>) -> Value {
    params.get("site_id").cloned().unwrap_or(json!(1))
}
