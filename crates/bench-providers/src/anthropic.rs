//! Anthropic messages adapter. Tool results accumulate as `tool_result`
//! blocks and are flushed as one user message before the next turn.

use bench_core::{ModelTurn, ProviderAdapter, ToolCall, ToolDecl, TransportError};
use serde_json::{json, Value};

use crate::{http_client, require_env};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u64 = 4096;

pub struct AnthropicAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    system: String,
    messages: Vec<Value>,
    pending_results: Vec<Value>,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: "https://api.anthropic.com".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system: String::new(),
            messages: Vec::new(),
            pending_results: Vec::new(),
        }
    }

    pub fn from_env(model: &str) -> anyhow::Result<Self> {
        Ok(Self::new(require_env("ANTHROPIC_API_KEY")?, model))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub fn build_tools(tools: &[ToolDecl]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters_schema(),
                })
            })
            .collect(),
    )
}

pub fn build_request(model: &str, system: &str, messages: &[Value], tools: &[ToolDecl]) -> Value {
    json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "system": system,
        "tools": build_tools(tools),
        "messages": messages,
    })
}

/// Split a messages-API response into the assistant content blocks and the
/// parsed turn.
pub fn parse_response(body: &Value) -> Result<(Value, ModelTurn), TransportError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| TransportError("response missing content blocks".to_string()))?;

    let mut text = String::new();
    let mut calls = Vec::new();
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(chunk) = block.get("text").and_then(Value::as_str) {
                    text.push_str(chunk);
                }
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let args = block
                    .get("input")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                calls.push(ToolCall { id, name, args });
            }
            _ => {}
        }
    }

    let assistant = json!({ "role": "assistant", "content": blocks });
    let turn = if calls.is_empty() {
        ModelTurn::Commentary(text)
    } else {
        ModelTurn::ToolCalls {
            commentary: if text.is_empty() { None } else { Some(text) },
            calls,
        }
    };
    Ok((assistant, turn))
}

impl ProviderAdapter for AnthropicAdapter {
    fn begin(&mut self, system_prompt: &str, user_prompt: &str) {
        self.system = system_prompt.to_string();
        self.messages = vec![json!({ "role": "user", "content": user_prompt })];
        self.pending_results.clear();
    }

    fn next_turn(&mut self, tools: &[ToolDecl]) -> Result<ModelTurn, TransportError> {
        if !self.pending_results.is_empty() {
            let results = std::mem::take(&mut self.pending_results);
            self.messages.push(json!({ "role": "user", "content": results }));
        }
        let request = build_request(&self.model, &self.system, &self.messages, tools);
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .map_err(|e| TransportError(format!("API call error: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| TransportError(format!("API response decode error: {e}")))?;
        if !status.is_success() {
            return Err(TransportError(format!(
                "API call error: status {status}: {body}"
            )));
        }
        let (assistant_message, turn) = parse_response(&body)?;
        self.messages.push(assistant_message);
        Ok(turn)
    }

    fn push_tool_result(&mut self, call: &ToolCall, result: &Value) {
        self.pending_results.push(json!({
            "type": "tool_result",
            "tool_use_id": call.id,
            "content": result.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tools() -> Vec<ToolDecl> {
        vec![ToolDecl {
            name: "mcp_list_servers".to_string(),
            description: "List servers".to_string(),
            params: vec![],
        }]
    }

    #[test]
    fn request_uses_input_schema_shape() {
        let request = build_request("claude-sonnet-4-5-20250929", "sys", &[], &sample_tools());
        assert_eq!(request["max_tokens"], 4096);
        assert_eq!(request["tools"][0]["name"], "mcp_list_servers");
        assert_eq!(request["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn mixed_blocks_parse_into_tool_calls_with_commentary() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Mounting now." },
                { "type": "tool_use", "id": "tu_1", "name": "mcp_mount",
                  "input": { "server_id": "gitlab_server" } }
            ],
            "stop_reason": "tool_use"
        });
        let (assistant, turn) = parse_response(&body).expect("parse");
        assert_eq!(assistant["role"], "assistant");
        match turn {
            ModelTurn::ToolCalls { commentary, calls } => {
                assert_eq!(commentary.as_deref(), Some("Mounting now."));
                assert_eq!(calls[0].args["server_id"], "gitlab_server");
            }
            ModelTurn::Commentary(text) => panic!("expected tool call, got: {text}"),
        }
    }

    #[test]
    fn pending_results_flush_as_one_user_message() {
        let mut adapter = AnthropicAdapter::new("k", "m");
        adapter.begin("sys", "task");
        let call = ToolCall {
            id: "tu_9".to_string(),
            name: "mcp_unmount".to_string(),
            args: Default::default(),
        };
        adapter.push_tool_result(&call, &json!({"status": "unmounted"}));
        assert_eq!(adapter.pending_results.len(), 1);
        assert_eq!(adapter.pending_results[0]["tool_use_id"], "tu_9");
    }
}
