//! Fault injection. The first call to any member of the category's fault
//! group fails for the rest of the run, and takes its whole backend prefix
//! down with it; the sibling backend's members pass through afterwards.

use bench_registry::{fault_group, tool_prefix, vague_error_payload, Category};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::state::{RunLimits, RunState};

pub struct FaultInjector {
    fail_tools: BTreeSet<&'static str>,
}

impl FaultInjector {
    pub fn for_category(category: Category) -> Self {
        Self {
            fail_tools: fault_group(category).iter().copied().collect(),
        }
    }

    pub fn is_failable(&self, real_name: &str) -> bool {
        self.fail_tools.contains(real_name)
    }

    /// Must this call fail? True for every member of the already-failed
    /// prefix, and for the first fault-group call of the run.
    pub fn should_fail(&self, real_name: &str, state: &RunState) -> bool {
        if !self.is_failable(real_name) {
            return false;
        }
        if let Some(failed) = &state.failed_prefix {
            if tool_prefix(real_name) == failed {
                return true;
            }
        }
        !state.first_failure_recorded
    }

    /// Record one injected failure and synthesize its error payload.
    /// Applies the retry ceiling (per tool) and the run-wide injected-error
    /// ceiling; crossing either disqualifies the run.
    pub fn record_failure(
        &self,
        real_name: &str,
        exposed_name: &str,
        state: &mut RunState,
        limits: &RunLimits,
    ) -> Value {
        if !state.first_failure_recorded {
            state.first_failure_recorded = true;
            state.failed_prefix = Some(tool_prefix(real_name).to_string());
        }
        let attempts = state
            .failing_tool_attempts
            .entry(real_name.to_string())
            .or_insert(0);
        *attempts += 1;
        let attempts = *attempts;
        state.injected_error_count += 1;
        state.requires_fresh_resolution = true;

        let mut payload = vague_error_payload(&format!("{real_name}:{attempts}"));
        if attempts > limits.max_retries_per_failing_tool {
            payload = json!({
                "error": {
                    "code": "E_RETRY_LIMIT_EXCEEDED",
                    "message": format!(
                        "Retry limit exceeded for '{exposed_name}'. \
                         Switch server/tool instead of retrying the same failing call."
                    ),
                    "retry_after": null,
                }
            });
            state.disqualify("Retry spam detected on failing tool");
        }
        if state.injected_error_count > limits.max_injected_errors {
            state.disqualify("Excessive injected-error retries without strategic pivot");
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::is_injected_error_shape;

    #[test]
    fn first_group_member_fails_and_kills_its_prefix() {
        let injector = FaultInjector::for_category(Category::CodeHosting);
        let mut state = RunState::default();
        let limits = RunLimits::default();

        assert!(injector.should_fail("gh_project_lookup", &state));
        let payload = injector.record_failure("gh_project_lookup", "workspace_search", &mut state, &limits);
        assert!(is_injected_error_shape(&payload));
        assert_eq!(state.failed_prefix.as_deref(), Some("gh"));

        // Sibling capability on the same dead backend still fails.
        assert!(injector.should_fail("gh_ticket_submit", &state));
        // The competing backend passes through once the failure is recorded.
        assert!(!injector.should_fail("gl_namespace_query", &state));
        // Non-failable tools are never intercepted.
        assert!(!injector.should_fail("gh_refs_enumerate", &state));
    }

    #[test]
    fn retry_ceiling_rewrites_error_and_disqualifies() {
        let injector = FaultInjector::for_category(Category::FoodDelivery);
        let mut state = RunState::default();
        let limits = RunLimits::default();

        for _ in 0..2 {
            let payload =
                injector.record_failure("ue_transaction_submit", "order_commit", &mut state, &limits);
            assert_ne!(payload["error"]["code"], "E_RETRY_LIMIT_EXCEEDED");
        }
        assert!(!state.disqualified);

        let third =
            injector.record_failure("ue_transaction_submit", "order_commit", &mut state, &limits);
        assert_eq!(third["error"]["code"], "E_RETRY_LIMIT_EXCEEDED");
        assert!(state.disqualified);
        assert_eq!(
            state.disqualify_reason.as_deref(),
            Some("Retry spam detected on failing tool")
        );
    }

    #[test]
    fn run_wide_injected_error_ceiling_disqualifies() {
        let injector = FaultInjector::for_category(Category::CodeHosting);
        let mut state = RunState::default();
        let limits = RunLimits::default();

        // Spread across tools so no per-tool ceiling trips first: two
        // attempts each on three failed-prefix tools, then a seventh on a
        // fourth tool crosses the run-wide ceiling.
        for tool in ["gh_project_lookup", "gh_ticket_submit", "gh_changeset_propose"] {
            for _ in 0..2 {
                injector.record_failure(tool, tool, &mut state, &limits);
            }
        }
        assert_eq!(state.injected_error_count, 6);
        assert!(!state.disqualified);
        injector.record_failure("gh_repo_duplicate", "workspace_clone", &mut state, &limits);
        assert!(state.disqualified);
        assert_eq!(
            state.disqualify_reason.as_deref(),
            Some("Excessive injected-error retries without strategic pivot")
        );
    }

    #[test]
    fn stale_resolution_pends_after_any_injection() {
        let injector = FaultInjector::for_category(Category::WebSearch);
        let mut state = RunState::default();
        injector.record_failure("brv_index_query", "knowledge_search", &mut state, &RunLimits::default());
        assert!(state.requires_fresh_resolution);
        // hit_error is derived from the result payload by the controller.
        assert!(!state.hit_error);
    }
}
