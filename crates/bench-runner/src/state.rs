//! Per-run state. One `RunState` is exclusively owned by one run
//! controller; the trace is append-only and is the single source of truth
//! for every continuity decision.

use bench_core::{is_error_result, ArgMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Exposed name the model called.
    pub tool: String,
    /// Real backend tool name it resolved to (same as `tool` for the
    /// mount-layer tools).
    pub resolved_tool: String,
    pub args: ArgMap,
    pub result: Value,
}

impl TraceEntry {
    pub fn succeeded(&self) -> bool {
        !is_error_result(&self.result)
    }
}

/// Policy knobs for one run. One parameterized set replaces the source's
/// duplicated easy/hard controllers.
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub max_turns: usize,
    /// Consecutive identical text turns before the run is called stuck.
    pub max_repeats: usize,
    pub max_retries_per_failing_tool: u32,
    pub max_injected_errors: u32,
    pub max_decoy_calls: u32,
    pub max_decoy_cost_usd: f64,
    pub max_mount_misses: u32,
    pub max_commentary_after_error_turns: u32,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_repeats: 2,
            max_retries_per_failing_tool: 2,
            max_injected_errors: 6,
            max_decoy_calls: 2,
            max_decoy_cost_usd: 2.5,
            max_mount_misses: 3,
            max_commentary_after_error_turns: 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunState {
    pub trace: Vec<TraceEntry>,
    pub mounted_server_id: Option<String>,
    pub first_failure_recorded: bool,
    pub failed_prefix: Option<String>,
    pub failing_tool_attempts: BTreeMap<String, u32>,
    pub injected_error_count: u32,
    pub requires_fresh_resolution: bool,
    pub decoy_calls: u32,
    pub decoy_cost_usd: f64,
    pub mount_miss_count: u32,
    pub commentary_after_error_turns: u32,
    pub recent_texts: Vec<String>,
    pub disqualified: bool,
    pub disqualify_reason: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub hit_error: bool,
    pub switched_service: bool,
}

impl RunState {
    /// Terminal policy failure. Once set, the run can never score success.
    pub fn disqualify(&mut self, reason: &str) {
        if !self.disqualified {
            self.disqualified = true;
            self.disqualify_reason = Some(reason.to_string());
        }
    }

    pub fn has_successful_call(&self, resolved_tool: &str) -> bool {
        self.trace
            .iter()
            .any(|entry| entry.resolved_tool == resolved_tool && entry.succeeded())
    }

    /// Most recent successful call of a tool; continuity checks only ever
    /// consult the latest discovery result.
    pub fn last_successful_call(&self, resolved_tool: &str) -> Option<&TraceEntry> {
        self.trace
            .iter()
            .rev()
            .find(|entry| entry.resolved_tool == resolved_tool && entry.succeeded())
    }
}

/// Final verdict of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub hit_error: bool,
    pub switched_service: bool,
    pub failure_reason: Option<String>,
    pub trace: Vec<TraceEntry>,
    pub conversation: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(resolved: &str, result: Value) -> TraceEntry {
        TraceEntry {
            tool: resolved.to_string(),
            resolved_tool: resolved.to_string(),
            args: ArgMap::new(),
            result,
        }
    }

    #[test]
    fn last_successful_call_skips_failures() {
        let mut state = RunState::default();
        state.trace.push(entry("gh_project_lookup", json!({"total_count": 1, "items": [{"full_name": "a/b"}]})));
        state.trace.push(entry("gh_project_lookup", json!({"error": "boom"})));
        let last = state.last_successful_call("gh_project_lookup").expect("one success");
        assert_eq!(last.result["total_count"], 1);
        assert!(state.has_successful_call("gh_project_lookup"));
        assert!(!state.has_successful_call("gl_namespace_query"));
    }

    #[test]
    fn disqualification_is_sticky() {
        let mut state = RunState::default();
        state.disqualify("Retry spam detected on failing tool");
        state.disqualify("some later reason");
        assert!(state.disqualified);
        assert_eq!(
            state.disqualify_reason.as_deref(),
            Some("Retry spam detected on failing tool")
        );
    }
}
