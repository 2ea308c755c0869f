//! Acceptance gate for success-indicating calls: non-actionable values,
//! outstanding stale-resolution state, workflow prerequisites, and
//! argument continuity against the most recent discovery results. A call
//! that clears every check AND follows an injected error scores the run.

use bench_core::{is_non_actionable, ArgMap};
use bench_registry::{entity_rules_for, ArgSelector, ScenarioSpec};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::state::RunState;

/// Canonical comparison key for an identifier-ish JSON value: integers and
/// their string spellings compare equal, everything else by exact string.
fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                Some(int.to_string())
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// Every prerequisite group needs at least one prior successful call.
pub fn prerequisites_satisfied(
    scenario: &ScenarioSpec,
    resolved_tool: &str,
    state: &RunState,
) -> bool {
    let Some((_, groups)) = scenario
        .prerequisites
        .iter()
        .find(|(tool, _)| *tool == resolved_tool)
    else {
        return true;
    };
    groups.iter().all(|group| {
        group
            .iter()
            .any(|candidate| state.has_successful_call(candidate))
    })
}

/// Entity-reference continuity: arguments naming previously-discovered
/// entities must match the MOST RECENT successful discovery result for
/// that entity type. Rules without a prior discovery call, or whose latest
/// result yields no identifiers, do not bind.
pub fn argument_continuity_ok(resolved_tool: &str, args: &ArgMap, state: &RunState) -> bool {
    for rule in entity_rules_for(resolved_tool) {
        let Some(discovery) = state.last_successful_call(rule.discovery_tool) else {
            continue;
        };
        let valid: BTreeSet<String> = discovery
            .result
            .get(rule.collection)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .flat_map(|item| {
                        rule.keys
                            .iter()
                            .filter_map(|key| item.get(*key).and_then(value_key))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if valid.is_empty() {
            continue;
        }

        match rule.selector {
            ArgSelector::Scalar(field) => {
                match args.get(field).and_then(value_key) {
                    Some(reference) if valid.contains(&reference) => {}
                    _ => return false,
                }
            }
            ArgSelector::Each { field, key } => {
                let Some(items) = args.get(field).and_then(Value::as_array) else {
                    return false;
                };
                for item in items {
                    let reference = match key {
                        Some(inner) => item.get(inner).and_then(value_key),
                        None => value_key(item),
                    };
                    match reference {
                        Some(reference) if valid.contains(&reference) => {}
                        _ => return false,
                    }
                }
            }
            ArgSelector::OwnerRepo => {
                let owner = args.get("owner").and_then(Value::as_str);
                let repo = args.get("repo").and_then(Value::as_str);
                if let (Some(owner), Some(repo)) = (owner, repo) {
                    if !valid.contains(&format!("{owner}/{repo}")) {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Outcome of evaluating one success-indicating call.
pub enum SuccessCheck {
    /// Not a success indicator for this scenario; nothing to do.
    NotTerminal,
    /// A success indicator that failed a gate, with the failure reason.
    Rejected(String),
    /// All gates passed after an injected error: the run is scored.
    Scored,
    /// All gates passed but no fault was ever injected; per policy the run
    /// is NOT credited (the benchmark measures recovery, not first-try
    /// completion).
    NotCredited,
}

/// Evaluate a successful tool result against the scenario's success
/// criteria and the acceptance gates, updating verdict fields on `state`.
pub fn evaluate_success(
    scenario: &ScenarioSpec,
    resolved_tool: &str,
    args: &ArgMap,
    result: &Value,
    state: &mut RunState,
) -> SuccessCheck {
    let Some((_, required_key)) = scenario
        .success_criteria
        .iter()
        .find(|(tool, _)| *tool == resolved_tool)
    else {
        return SuccessCheck::NotTerminal;
    };
    let Some(value) = result.get(*required_key) else {
        return SuccessCheck::NotTerminal;
    };

    if is_non_actionable(value) {
        let reason = format!(
            "Final tool '{resolved_tool}' returned non-actionable '{required_key}' value"
        );
        state.success = false;
        state.failure_reason = Some(reason.clone());
        return SuccessCheck::Rejected(reason);
    }
    if state.disqualified {
        let reason = state
            .disqualify_reason
            .clone()
            .unwrap_or_else(|| "Run disqualified by hardening checks".to_string());
        state.success = false;
        state.failure_reason = Some(reason.clone());
        return SuccessCheck::Rejected(reason);
    }
    if state.requires_fresh_resolution {
        let reason =
            "Success action used stale context; refresh discovery data first".to_string();
        state.success = false;
        state.failure_reason = Some(reason.clone());
        return SuccessCheck::Rejected(reason);
    }
    if !prerequisites_satisfied(scenario, resolved_tool, state) {
        let reason = format!("Missing required workflow steps before '{resolved_tool}'");
        state.success = false;
        state.failure_reason = Some(reason.clone());
        return SuccessCheck::Rejected(reason);
    }
    if !argument_continuity_ok(resolved_tool, args, state) {
        let reason = format!("Argument continuity check failed for '{resolved_tool}'");
        state.success = false;
        state.failure_reason = Some(reason.clone());
        return SuccessCheck::Rejected(reason);
    }

    if state.hit_error {
        state.success = true;
        state.switched_service = true;
        state.failure_reason = None;
        SuccessCheck::Scored
    } else {
        SuccessCheck::NotCredited
    }
}
