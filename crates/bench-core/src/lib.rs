//! Shared leaf types for the fallback benchmark: tool-call shapes, the
//! provider-adapter seam, and the result-shape conventions every layer
//! agrees on (`{"error": ...}` on failure, anything else on success).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Argument object attached to a tool call.
pub type ArgMap = Map<String, Value>;

/// One tool invocation as reported by a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back with the tool result.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: ArgMap,
}

/// What the model produced on one turn of the conversation.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    /// One or more tool calls, possibly preceded by free text.
    ToolCalls {
        commentary: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Free text with no tool calls.
    Commentary(String),
}

/// Provider transport failure (network/auth/model error). Terminates the
/// run immediately with this message; never retried.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Parameter types the tool surface can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    pub fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ParamKind,
    /// Required when the backend declares no default for it.
    pub required: bool,
}

impl ParamDecl {
    pub fn required(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// A tool as surfaced to the provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDecl {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamDecl>,
}

impl ToolDecl {
    /// JSON Schema object for the tool's parameters, in the shape every
    /// provider wire format derives from.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({ "type": param.kind.json_type() }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The seam between the run controller and a model provider. One adapter
/// instance owns one conversation: `begin` seeds it, `next_turn` requests a
/// model turn against the current tool surface, `push_tool_result` feeds a
/// tool outcome back before the next turn.
pub trait ProviderAdapter {
    fn begin(&mut self, system_prompt: &str, user_prompt: &str);
    fn next_turn(&mut self, tools: &[ToolDecl]) -> Result<ModelTurn, TransportError>;
    fn push_tool_result(&mut self, call: &ToolCall, result: &Value);
}

/// True when a tool result is the failure shape `{"error": ...}`.
pub fn is_error_result(result: &Value) -> bool {
    result
        .as_object()
        .map(|obj| obj.contains_key("error"))
        .unwrap_or(false)
}

/// True when the error payload is the structured vague-error shape
/// (`error` is an object carrying a `code`).
pub fn is_injected_error_shape(result: &Value) -> bool {
    result
        .get("error")
        .and_then(Value::as_object)
        .map(|err| err.contains_key("code"))
        .unwrap_or(false)
}

/// True when the error payload should count toward `hit_error`: the
/// structured vague shape, or the explicit `SERVICE_SHUTDOWN` convention.
pub fn error_counts_as_hit(result: &Value) -> bool {
    match result.get("error") {
        Some(Value::Object(err)) => {
            err.contains_key("code") || err.get("type") == Some(&Value::String("SERVICE_SHUTDOWN".into()))
        }
        _ => false,
    }
}

/// True when the error payload is a stale-handle report from a backend.
pub fn error_mentions_stale(result: &Value) -> bool {
    result
        .get("error")
        .and_then(Value::as_str)
        .map(|msg| msg.to_ascii_lowercase().contains("stale"))
        .unwrap_or(false)
}

/// A "successful" value that cannot back a task completion: null, false,
/// zero, empty string, empty array, empty object.
pub fn is_non_actionable(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

const BRAND_TOKENS: &[&str] = &[
    "GitHub",
    "GitLab",
    "Slack",
    "Discord",
    "UberEats",
    "DoorDash",
    "Google Maps",
    "Mapbox",
    "Brave",
    "Exa",
];

/// Replace literal service names in a tool description with the word
/// "service" and collapse whitespace. The agent must reason from behavior,
/// not pattern-match brands.
pub fn sanitize_service_names(doc: &str) -> String {
    let mut clean = doc.to_string();
    for token in BRAND_TOKENS {
        clean = clean.replace(token, "service");
    }
    clean.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Deterministic index into a fixed catalog, spread by digesting the seed.
/// Keeps error selection reproducible across replays of the same run.
pub fn stable_choice_index(seed: &str, len: usize) -> usize {
    assert!(len > 0, "catalog must be non-empty");
    let digest = Sha256::digest(seed.as_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(word) % len as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_result_shapes_are_classified() {
        let plain = json!({"error": "Channel 'x' not found"});
        assert!(is_error_result(&plain));
        assert!(!is_injected_error_shape(&plain));
        assert!(!error_counts_as_hit(&plain));

        let vague = json!({"error": {"code": "E_RATE_LIMITED", "message": "Too many requests.", "retry_after": "60s"}});
        assert!(is_error_result(&vague));
        assert!(is_injected_error_shape(&vague));
        assert!(error_counts_as_hit(&vague));

        let shutdown = json!({"error": {"type": "SERVICE_SHUTDOWN"}});
        assert!(error_counts_as_hit(&shutdown));

        let ok = json!({"order_id": 1003});
        assert!(!is_error_result(&ok));
    }

    #[test]
    fn stale_errors_are_recognized() {
        let stale = json!({"error": "Restaurant handle is stale. Re-run restaurant search before placing order."});
        assert!(error_mentions_stale(&stale));
        assert!(!error_mentions_stale(&json!({"error": "Order not found"})));
        assert!(!error_mentions_stale(&json!({"ok": true})));
    }

    #[test]
    fn non_actionable_values() {
        for value in [
            Value::Null,
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!([]),
            json!({}),
        ] {
            assert!(is_non_actionable(&value), "{value} should be non-actionable");
        }
        for value in [json!(true), json!(42), json!("ts_1"), json!([1]), json!({"a": 1})] {
            assert!(!is_non_actionable(&value), "{value} should be actionable");
        }
    }

    #[test]
    fn sanitizer_strips_brands_and_collapses_whitespace() {
        let doc = "Search for GitHub repositories.\n\n  Returns GitLab-style   results.";
        let clean = sanitize_service_names(doc);
        assert_eq!(
            clean,
            "Search for service repositories. Returns service-style results."
        );
    }

    #[test]
    fn stable_choice_index_is_deterministic_and_bounded() {
        let a = stable_choice_index("gh_ticket_submit:1", 10);
        let b = stable_choice_index("gh_ticket_submit:1", 10);
        assert_eq!(a, b);
        assert!(a < 10);
        // Different seeds spread over the catalog.
        let picks: std::collections::BTreeSet<usize> = (0..40)
            .map(|i| stable_choice_index(&format!("tool:{i}"), 10))
            .collect();
        assert!(picks.len() > 3, "expected spread, got {picks:?}");
    }

    #[test]
    fn tool_decl_parameter_schema_shape() {
        let decl = ToolDecl {
            name: "order_commit".to_string(),
            description: "Submit an order".to_string(),
            params: vec![
                ParamDecl::required("restaurant_id", ParamKind::Integer),
                ParamDecl::required("items", ParamKind::Array),
                ParamDecl::optional("notes", ParamKind::String),
            ],
        };
        let schema = decl.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["restaurant_id"]["type"], "integer");
        assert_eq!(schema["required"], json!(["restaurant_id", "items"]));
    }
}
