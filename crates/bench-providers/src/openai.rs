//! OpenAI chat-completions adapter. Tool results are fed back as
//! `role: "tool"` messages keyed by the call id.

use bench_core::{ArgMap, ModelTurn, ProviderAdapter, ToolCall, ToolDecl, TransportError};
use serde_json::{json, Value};

use crate::{http_client, require_env};

pub struct OpenAiAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    messages: Vec<Value>,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            messages: Vec::new(),
        }
    }

    pub fn from_env(model: &str) -> anyhow::Result<Self> {
        Ok(Self::new(require_env("OPENAI_API_KEY")?, model))
    }

    /// Point the adapter at a different endpoint (tests use a local fake).
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
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters_schema(),
                    }
                })
            })
            .collect(),
    )
}

pub fn build_request(model: &str, messages: &[Value], tools: &[ToolDecl]) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "tools": build_tools(tools),
        "tool_choice": "auto",
    })
}

/// Split a chat-completions response into the raw assistant message (to be
/// appended to the conversation) and the parsed turn.
pub fn parse_response(body: &Value) -> Result<(Value, ModelTurn), TransportError> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| TransportError("response missing choices[0].message".to_string()))?
        .clone();
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    let calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|raw_calls| {
            raw_calls
                .iter()
                .filter_map(|call| {
                    let id = call.get("id")?.as_str()?.to_string();
                    let name = call.pointer("/function/name")?.as_str()?.to_string();
                    let args: ArgMap = call
                        .pointer("/function/arguments")
                        .and_then(Value::as_str)
                        .and_then(|raw| serde_json::from_str(raw).ok())
                        .unwrap_or_default();
                    Some(ToolCall { id, name, args })
                })
                .collect()
        })
        .unwrap_or_default();

    let turn = if calls.is_empty() {
        ModelTurn::Commentary(content.unwrap_or_default())
    } else {
        ModelTurn::ToolCalls {
            commentary: content,
            calls,
        }
    };
    Ok((message, turn))
}

impl ProviderAdapter for OpenAiAdapter {
    fn begin(&mut self, system_prompt: &str, user_prompt: &str) {
        self.messages = vec![
            json!({ "role": "system", "content": system_prompt }),
            json!({ "role": "user", "content": user_prompt }),
        ];
    }

    fn next_turn(&mut self, tools: &[ToolDecl]) -> Result<ModelTurn, TransportError> {
        let request = build_request(&self.model, &self.messages, tools);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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
        self.messages.push(json!({
            "role": "tool",
            "tool_call_id": call.id,
            "content": result.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::{ParamDecl, ParamKind};

    fn sample_tools() -> Vec<ToolDecl> {
        vec![ToolDecl {
            name: "mcp_mount".to_string(),
            description: "Mount a server".to_string(),
            params: vec![ParamDecl::required("server_id", ParamKind::String)],
        }]
    }

    #[test]
    fn request_carries_tools_and_choice() {
        let messages = vec![json!({"role": "user", "content": "go"})];
        let request = build_request("gpt-5.2", &messages, &sample_tools());
        assert_eq!(request["tool_choice"], "auto");
        assert_eq!(request["tools"][0]["function"]["name"], "mcp_mount");
        assert_eq!(
            request["tools"][0]["function"]["parameters"]["required"],
            json!(["server_id"])
        );
    }

    #[test]
    fn tool_call_responses_parse_arguments_json() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "mcp_mount",
                            "arguments": "{\"server_id\": \"github_server\"}"
                        }
                    }]
                }
            }]
        });
        let (_, turn) = parse_response(&body).expect("parse");
        match turn {
            ModelTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "mcp_mount");
                assert_eq!(calls[0].args["server_id"], "github_server");
            }
            ModelTurn::Commentary(text) => panic!("expected tool calls, got text: {text}"),
        }
    }

    #[test]
    fn text_responses_parse_as_commentary() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "All done." } }]
        });
        let (_, turn) = parse_response(&body).expect("parse");
        match turn {
            ModelTurn::Commentary(text) => assert_eq!(text, "All done."),
            ModelTurn::ToolCalls { .. } => panic!("expected commentary"),
        }
    }

    #[test]
    fn adapter_round_trips_against_local_endpoint() {
        use std::thread;
        use tiny_http::{Response, Server};

        let server = Server::http("127.0.0.1:0").expect("bind local server");
        let port = server.server_addr().to_ip().expect("ip addr").port();
        let handle = thread::spawn(move || {
            let request = server.recv().expect("one request");
            let body = json!({
                "choices": [{ "message": { "role": "assistant", "content": "hello from fake" } }]
            });
            let response = Response::from_string(body.to_string()).with_status_code(200);
            request.respond(response).expect("respond");
        });

        let mut adapter =
            OpenAiAdapter::new("test-key", "gpt-5.2").with_base_url(format!("http://127.0.0.1:{port}"));
        adapter.begin("system", "user task");
        let turn = adapter.next_turn(&sample_tools()).expect("turn");
        match turn {
            ModelTurn::Commentary(text) => assert_eq!(text, "hello from fake"),
            ModelTurn::ToolCalls { .. } => panic!("expected commentary"),
        }
        handle.join().expect("server thread");
    }
}
