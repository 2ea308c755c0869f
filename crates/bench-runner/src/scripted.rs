//! In-process provider that replays a fixed list of turns. Used by the
//! test suite and by dry runs; no network involved.

use bench_core::{ArgMap, ModelTurn, ProviderAdapter, ToolCall, ToolDecl, TransportError};
use serde_json::Value;
use std::collections::VecDeque;

pub enum ScriptedTurn {
    Calls(Vec<(String, Value)>),
    Text(String),
    /// Simulate a provider transport failure.
    Fail(String),
}

/// Convenience constructor for a tool-call turn.
pub fn calls(entries: &[(&str, Value)]) -> ScriptedTurn {
    ScriptedTurn::Calls(
        entries
            .iter()
            .map(|(name, args)| (name.to_string(), args.clone()))
            .collect(),
    )
}

pub fn text(content: &str) -> ScriptedTurn {
    ScriptedTurn::Text(content.to_string())
}

#[derive(Default)]
pub struct ScriptedProvider {
    turns: VecDeque<ScriptedTurn>,
    next_call_id: u64,
    /// Every tool result fed back, in order, for assertions.
    pub tool_results: Vec<(String, Value)>,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: turns.into(),
            ..Self::default()
        }
    }
}

impl ProviderAdapter for ScriptedProvider {
    fn begin(&mut self, system_prompt: &str, user_prompt: &str) {
        self.system_prompt = system_prompt.to_string();
        self.user_prompt = user_prompt.to_string();
    }

    fn next_turn(&mut self, _tools: &[ToolDecl]) -> Result<ModelTurn, TransportError> {
        match self.turns.pop_front() {
            Some(ScriptedTurn::Calls(entries)) => {
                let calls = entries
                    .into_iter()
                    .map(|(name, args)| {
                        self.next_call_id += 1;
                        ToolCall {
                            id: format!("call_{}", self.next_call_id),
                            name,
                            args: args.as_object().cloned().unwrap_or_else(ArgMap::new),
                        }
                    })
                    .collect();
                Ok(ModelTurn::ToolCalls {
                    commentary: None,
                    calls,
                })
            }
            Some(ScriptedTurn::Text(content)) => Ok(ModelTurn::Commentary(content)),
            Some(ScriptedTurn::Fail(message)) => Err(TransportError(message)),
            // An exhausted script keeps repeating itself; the controller's
            // repetition guard terminates the run.
            None => Ok(ModelTurn::Commentary("(script exhausted)".to_string())),
        }
    }

    fn push_tool_result(&mut self, call: &ToolCall, result: &Value) {
        self.tool_results.push((call.name.clone(), result.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn script_replays_then_repeats_exhaustion_marker() {
        let mut provider = ScriptedProvider::new(vec![
            calls(&[("mcp_list_servers", json!({}))]),
            text("thinking"),
        ]);
        provider.begin("sys", "task");
        assert!(matches!(
            provider.next_turn(&[]).expect("calls"),
            ModelTurn::ToolCalls { .. }
        ));
        assert!(matches!(
            provider.next_turn(&[]).expect("text"),
            ModelTurn::Commentary(t) if t == "thinking"
        ));
        for _ in 0..2 {
            assert!(matches!(
                provider.next_turn(&[]).expect("exhausted"),
                ModelTurn::Commentary(t) if t == "(script exhausted)"
            ));
        }
    }
}
