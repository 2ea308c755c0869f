//! Gemini generateContent adapter. Function responses accumulate as parts
//! and are flushed as one user turn; Gemini assigns no call ids, so the
//! adapter synthesizes them.

use bench_core::{ModelTurn, ProviderAdapter, ToolCall, ToolDecl, TransportError};
use serde_json::{json, Value};

use crate::{http_client, require_env};

pub struct GeminiAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    system: String,
    contents: Vec<Value>,
    pending_responses: Vec<Value>,
    next_call_id: u64,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system: String::new(),
            contents: Vec::new(),
            pending_responses: Vec::new(),
            next_call_id: 0,
        }
    }

    pub fn from_env(model: &str) -> anyhow::Result<Self> {
        Ok(Self::new(require_env("GOOGLE_API_KEY")?, model))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub fn build_tools(tools: &[ToolDecl]) -> Value {
    json!([{
        "function_declarations": tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect::<Vec<Value>>()
    }])
}

pub fn build_request(system: &str, contents: &[Value], tools: &[ToolDecl]) -> Value {
    json!({
        "system_instruction": { "parts": [{ "text": system }] },
        "contents": contents,
        "tools": build_tools(tools),
    })
}

/// Split a generateContent response into the model content (to append to
/// the conversation) and the raw (name, args) function calls plus text.
#[allow(clippy::type_complexity)]
pub fn parse_response(
    body: &Value,
) -> Result<(Value, String, Vec<(String, Value)>), TransportError> {
    let content = body
        .pointer("/candidates/0/content")
        .ok_or_else(|| TransportError("response missing candidates[0].content".to_string()))?
        .clone();
    let mut text = String::new();
    let mut calls = Vec::new();
    if let Some(parts) = content.get("parts").and_then(Value::as_array) {
        for part in parts {
            if let Some(chunk) = part.get("text").and_then(Value::as_str) {
                text.push_str(chunk);
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let args = fc.get("args").cloned().unwrap_or_else(|| json!({}));
                calls.push((name, args));
            }
        }
    }
    Ok((content, text, calls))
}

impl ProviderAdapter for GeminiAdapter {
    fn begin(&mut self, system_prompt: &str, user_prompt: &str) {
        self.system = system_prompt.to_string();
        self.contents = vec![json!({ "role": "user", "parts": [{ "text": user_prompt }] })];
        self.pending_responses.clear();
        self.next_call_id = 0;
    }

    fn next_turn(&mut self, tools: &[ToolDecl]) -> Result<ModelTurn, TransportError> {
        if !self.pending_responses.is_empty() {
            let parts = std::mem::take(&mut self.pending_responses);
            self.contents.push(json!({ "role": "user", "parts": parts }));
        }
        let request = build_request(&self.system, &self.contents, tools);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(url)
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
        let (content, text, raw_calls) = parse_response(&body)?;
        self.contents.push(content);

        if raw_calls.is_empty() {
            return Ok(ModelTurn::Commentary(text));
        }
        let calls = raw_calls
            .into_iter()
            .map(|(name, args)| {
                self.next_call_id += 1;
                ToolCall {
                    id: format!("call_{}", self.next_call_id),
                    name,
                    args: args.as_object().cloned().unwrap_or_default(),
                }
            })
            .collect();
        Ok(ModelTurn::ToolCalls {
            commentary: if text.is_empty() { None } else { Some(text) },
            calls,
        })
    }

    fn push_tool_result(&mut self, call: &ToolCall, result: &Value) {
        self.pending_responses.push(json!({
            "functionResponse": {
                "name": call.name,
                "response": { "result": result },
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wraps_declarations_in_one_tool() {
        let tools = vec![ToolDecl {
            name: "mcp_unmount".to_string(),
            description: "Unmount".to_string(),
            params: vec![],
        }];
        let request = build_request("sys", &[], &tools);
        assert_eq!(
            request["tools"][0]["function_declarations"][0]["name"],
            "mcp_unmount"
        );
        assert_eq!(request["system_instruction"]["parts"][0]["text"], "sys");
    }

    #[test]
    fn function_calls_and_text_both_surface() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Trying the alternative." },
                        { "functionCall": { "name": "mcp_mount", "args": { "server_id": "mapbox_server" } } }
                    ]
                }
            }]
        });
        let (content, text, calls) = parse_response(&body).expect("parse");
        assert_eq!(content["role"], "model");
        assert_eq!(text, "Trying the alternative.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "mcp_mount");
        assert_eq!(calls[0].1["server_id"], "mapbox_server");
    }

    #[test]
    fn tool_results_queue_as_function_responses() {
        let mut adapter = GeminiAdapter::new("k", "gemini-2.5-pro");
        adapter.begin("sys", "task");
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "mcp_list_servers".to_string(),
            args: Default::default(),
        };
        adapter.push_tool_result(&call, &json!({"available_servers": []}));
        assert_eq!(adapter.pending_responses.len(), 1);
        assert_eq!(
            adapter.pending_responses[0]["functionResponse"]["name"],
            "mcp_list_servers"
        );
    }
}
