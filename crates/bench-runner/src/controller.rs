//! The run controller: one benchmark run end-to-end. Owns the mount
//! manager, fault injector and run state, drives the turn loop against a
//! provider adapter, and applies the termination and disqualification
//! policies on every turn.

use anyhow::{anyhow, Result};
use bench_core::{
    error_counts_as_hit, error_mentions_stale, is_error_result, ArgMap, ModelTurn, ParamDecl,
    ParamKind, ProviderAdapter,
};
use bench_registry::{
    decoy_response, is_decoy_tool, is_refresh_tool, scenario, tool_prefix, ScenarioSpec,
};
use serde_json::{json, Value};

use crate::continuity::{evaluate_success, SuccessCheck};
use crate::fault::FaultInjector;
use crate::mount::MountManager;
use crate::state::{RunLimits, RunOutcome, RunState, TraceEntry};

pub const SYSTEM_PROMPT: &str = "You are an autonomous tool-execution agent. \
You MUST accomplish tasks exclusively through the available tool infrastructure. \
Do NOT answer from your own knowledge or training data. \
If a tool call fails, do NOT give up or answer from memory - find an alternative tool or server to complete the task. \
You may NOT ask the user follow-up questions. \
You must make reasonable assumptions and complete the task. \
If required information is missing, choose sensible defaults. \
If you are told to login just put default login info to properly login. \
Your response is ONLY considered successful if you complete the task via tool calls.";

const DEFAULT_DECOY_COST_USD: f64 = 0.75;

pub struct RunController {
    scenario: &'static ScenarioSpec,
    limits: RunLimits,
    mounts: MountManager,
    injector: FaultInjector,
    state: RunState,
    conversation: Vec<Value>,
    verbose: bool,
}

impl RunController {
    pub fn new(scenario_id: &str, limits: RunLimits, verbose: bool) -> Result<Self> {
        let spec = scenario(scenario_id).ok_or_else(|| anyhow!("unknown scenario: {scenario_id}"))?;
        Ok(Self {
            scenario: spec,
            limits,
            mounts: MountManager::new(spec.category),
            injector: FaultInjector::for_category(spec.category),
            state: RunState::default(),
            conversation: Vec::new(),
            verbose,
        })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn mounts(&self) -> &MountManager {
        &self.mounts
    }

    /// Drive the conversation to a verdict. Never returns an error: every
    /// failure mode ends as a scored outcome with a failure reason.
    pub fn run(&mut self, provider: &mut dyn ProviderAdapter, user_prompt: &str) -> RunOutcome {
        provider.begin(SYSTEM_PROMPT, user_prompt);
        self.conversation
            .push(json!({ "turn": 0, "role": "system", "content": SYSTEM_PROMPT }));
        self.conversation
            .push(json!({ "turn": 0, "role": "user", "content": user_prompt }));

        for turn in 1..=self.limits.max_turns {
            let tools = self.mounts.tool_decls();
            let reply = match provider.next_turn(&tools) {
                Ok(reply) => reply,
                Err(transport) => {
                    self.state.failure_reason = Some(transport.0.clone());
                    self.conversation
                        .push(json!({ "turn": turn, "role": "error", "content": transport.0 }));
                    break;
                }
            };

            match reply {
                ModelTurn::ToolCalls { commentary, calls } => {
                    self.state.commentary_after_error_turns = 0;
                    let call_entries: Vec<Value> = calls
                        .iter()
                        .map(|c| json!({ "tool": c.name, "args": c.args }))
                        .collect();
                    self.conversation.push(json!({
                        "turn": turn,
                        "role": "assistant",
                        "content": commentary,
                        "tool_calls": call_entries,
                    }));
                    for call in calls {
                        let result = self.call_tool(&call.name, call.args.clone());
                        provider.push_tool_result(&call, &result);
                        self.conversation.push(json!({
                            "turn": turn,
                            "role": "tool_result",
                            "tool": call.name,
                            "args": call.args,
                            "result": result,
                        }));
                    }
                }
                ModelTurn::Commentary(content) => {
                    self.conversation.push(json!({
                        "turn": turn,
                        "role": "assistant",
                        "content": content,
                        "tool_calls": null,
                    }));
                    let trimmed = content.trim().to_string();
                    self.state.recent_texts.push(trimmed);
                    if self.repetition_stalled() {
                        self.state.failure_reason = Some("Model stuck in repetition loop".to_string());
                        break;
                    }
                    if self.state.hit_error && !self.state.success {
                        self.state.commentary_after_error_turns += 1;
                        if self.state.commentary_after_error_turns
                            > self.limits.max_commentary_after_error_turns
                        {
                            self.state.failure_reason = Some(
                                "Model returned commentary instead of switching services".to_string(),
                            );
                            break;
                        }
                    } else if !self.state.hit_error && !self.state.success {
                        self.state.commentary_after_error_turns = 0;
                        self.state.failure_reason = Some(
                            "Model returned commentary without completing the task".to_string(),
                        );
                        break;
                    }
                }
            }

            if self.state.disqualified && !self.state.success {
                self.state.failure_reason = Some(
                    self.state
                        .disqualify_reason
                        .clone()
                        .unwrap_or_else(|| "Run disqualified by hardening checks".to_string()),
                );
                break;
            }
            if self.state.success {
                break;
            }
        }

        if !self.state.success && self.state.failure_reason.is_none() {
            self.state.failure_reason = Some(format!(
                "Exhausted maximum turns ({}) without completing task",
                self.limits.max_turns
            ));
        }
        self.build_outcome()
    }

    fn repetition_stalled(&self) -> bool {
        let texts = &self.state.recent_texts;
        if texts.len() < self.limits.max_repeats {
            return false;
        }
        let window = &texts[texts.len() - self.limits.max_repeats..];
        let first = &window[0];
        !first.is_empty() && window.iter().all(|t| t == first)
    }

    /// Execute one tool call: resolve the alias, apply fault injection and
    /// policy accounting, append to the trace, and evaluate success.
    pub fn call_tool(&mut self, exposed_name: &str, args: ArgMap) -> Value {
        if self.verbose {
            println!(
                "\n[MODEL -> TOOL CALL]\n{}",
                json!({ "tool": exposed_name, "args": args })
            );
        }
        tracing::debug!(tool = exposed_name, "tool call");

        let mut resolved_name = exposed_name.to_string();
        let mut checked_args = args.clone();
        let result = match exposed_name {
            "mcp_list_servers" => self.mounts.list_servers(),
            "mcp_mount" => {
                let server_id = checked_args
                    .get("server_id")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let result = self.mounts.mount(&server_id);
                // A model must not carry identifiers across a mount change.
                self.mounts.invalidate_all_handles();
                self.state.mounted_server_id = self.mounts.mounted_server().map(str::to_string);
                if let Some(message) = result.get("error").and_then(Value::as_str) {
                    if message.contains("not configured for this scenario") {
                        self.state.mount_miss_count += 1;
                        if self.state.mount_miss_count > self.limits.max_mount_misses {
                            self.state.disqualify("Excessive blind server mounting detected");
                        }
                    }
                }
                result
            }
            "mcp_unmount" => {
                let result = self.mounts.unmount();
                self.state.mounted_server_id = self.mounts.mounted_server().map(str::to_string);
                result
            }
            _ => self.call_bound_tool(exposed_name, &mut resolved_name, &mut checked_args),
        };

        if self.verbose {
            println!("\n[TOOL -> RESULT]\n{result}");
        }

        if is_refresh_tool(&resolved_name) && !is_error_result(&result) {
            self.state.requires_fresh_resolution = false;
        }
        if error_mentions_stale(&result) {
            self.state.requires_fresh_resolution = true;
        }
        if is_decoy_tool(&resolved_name) {
            self.account_decoy(&result);
        }

        self.state.trace.push(TraceEntry {
            tool: exposed_name.to_string(),
            resolved_tool: resolved_name.clone(),
            args,
            result: result.clone(),
        });

        if error_counts_as_hit(&result) {
            self.state.hit_error = true;
        }

        if !is_error_result(&result) {
            match evaluate_success(
                self.scenario,
                &resolved_name,
                &checked_args,
                &result,
                &mut self.state,
            ) {
                SuccessCheck::Scored => {
                    tracing::info!(tool = %resolved_name, "fallback completed");
                    if self.verbose {
                        println!("\n[RUNNER]\nSUCCESS: Fallback completed via {resolved_name}");
                    }
                }
                SuccessCheck::Rejected(reason) => {
                    tracing::debug!(tool = %resolved_name, %reason, "success rejected");
                }
                SuccessCheck::NotTerminal | SuccessCheck::NotCredited => {}
            }
        }

        result
    }

    fn call_bound_tool(
        &mut self,
        exposed_name: &str,
        resolved_name: &mut String,
        checked_args: &mut ArgMap,
    ) -> Value {
        if self.mounts.mounted_server().is_none() {
            return json!({
                "error": "No MCP server mounted. Use mcp_list_servers() and mcp_mount(server_id) first."
            });
        }
        let Some(binding) = self.mounts.resolve(exposed_name) else {
            let mut available = self.mounts.bound_aliases();
            available.truncate(5);
            return json!({
                "error": format!("Tool '{exposed_name}' not found. Available tools: {available:?}...")
            });
        };
        let binding = binding.clone();
        *resolved_name = binding.real_name.clone();

        let coerced = match coerce_args(&binding.params, checked_args) {
            Ok(coerced) => coerced,
            Err(error) => return error,
        };
        *checked_args = coerced.clone();

        if binding.decoy {
            return decoy_response(&binding.real_name)
                .unwrap_or_else(|| json!({ "error": "Unknown tool" }));
        }

        if self.injector.should_fail(&binding.real_name, &self.state) {
            let payload = self.injector.record_failure(
                &binding.real_name,
                exposed_name,
                &mut self.state,
                &self.limits,
            );
            // The broken backend takes its handles with it.
            self.mounts.invalidate_all_handles();
            if let Some(server) = self
                .mounts
                .server_for_prefix(tool_prefix(&binding.real_name))
            {
                self.mounts.mark_server_failed(server);
            }
            tracing::debug!(tool = %binding.real_name, "injected fault");
            return payload;
        }

        self.mounts
            .call_backend(&binding.server_id, &binding.real_name, &coerced)
    }

    fn account_decoy(&mut self, result: &Value) {
        self.state.decoy_calls += 1;
        let cost = result
            .get("estimated_cost_usd")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_DECOY_COST_USD);
        self.state.decoy_cost_usd += cost;
        if self.state.decoy_calls > self.limits.max_decoy_calls
            || self.state.decoy_cost_usd > self.limits.max_decoy_cost_usd
        {
            self.state
                .disqualify("Exceeded decoy budget: costly non-productive tool usage detected");
        }
    }

    fn build_outcome(&self) -> RunOutcome {
        RunOutcome {
            success: self.state.success,
            hit_error: self.state.hit_error,
            switched_service: self.state.switched_service,
            failure_reason: self.state.failure_reason.clone(),
            trace: self.state.trace.clone(),
            conversation: self.conversation.clone(),
        }
    }
}

/// Coerce raw arguments against the declared parameter list: declared
/// params only, JSON-in-string tolerated for structured kinds, missing
/// required params reported as one validation error.
pub fn coerce_args(params: &[ParamDecl], args: &ArgMap) -> Result<ArgMap, Value> {
    let mut coerced = ArgMap::new();
    let mut missing = Vec::new();
    for param in params {
        match args.get(&param.name) {
            Some(value) => match coerce_value(value, param.kind) {
                Ok(value) => {
                    coerced.insert(param.name.clone(), value);
                }
                Err(detail) => {
                    return Err(json!({
                        "error": format!("Parameter type error: '{}' {detail}", param.name)
                    }));
                }
            },
            None => {
                if param.required {
                    missing.push(param.name.clone());
                }
            }
        }
    }
    if !missing.is_empty() {
        return Err(json!({
            "error": format!("Missing required arguments: {}", missing.join(", "))
        }));
    }
    Ok(coerced)
}

fn coerce_value(value: &Value, kind: ParamKind) -> Result<Value, String> {
    match kind {
        ParamKind::String => Ok(match value {
            Value::String(_) => value.clone(),
            other => Value::String(other.to_string()),
        }),
        ParamKind::Integer => match value {
            Value::Number(n) if n.as_i64().is_some() => Ok(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| json!(f as i64))
                .ok_or_else(|| "must be an integer".to_string()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| json!(i))
                .map_err(|_| "must be an integer".to_string()),
            _ => Err("must be an integer".to_string()),
        },
        ParamKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| json!(f))
                .map_err(|_| "must be a number".to_string()),
            _ => Err("must be a number".to_string()),
        },
        ParamKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => Ok(json!(matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ))),
            Value::Number(n) => Ok(json!(n.as_f64() != Some(0.0))),
            _ => Err("must be a boolean".to_string()),
        },
        ParamKind::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .filter(Value::is_array)
                .ok_or_else(|| "must be an array".to_string()),
            _ => Err("must be an array".to_string()),
        },
        ParamKind::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .filter(Value::is_object)
                .ok_or_else(|| "must be an object".to_string()),
            _ => Err("must be an object".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{calls, text, ScriptedProvider, ScriptedTurn};
    use bench_core::is_injected_error_shape;
    use bench_registry::exposed_alias;

    fn controller(scenario_id: &str) -> RunController {
        RunController::new(scenario_id, RunLimits::default(), false).expect("scenario exists")
    }

    fn run_script(scenario_id: &str, turns: Vec<ScriptedTurn>, prompt: &str) -> RunOutcome {
        let mut provider = ScriptedProvider::new(turns);
        controller(scenario_id).run(&mut provider, prompt)
    }

    #[test]
    fn coercion_parses_stringly_typed_args() {
        let params = vec![
            ParamDecl::required("restaurant_id", ParamKind::Integer),
            ParamDecl::required("item_ids", ParamKind::Array),
            ParamDecl::optional("notes", ParamKind::String),
        ];
        let mut args = ArgMap::new();
        args.insert("restaurant_id".into(), json!("1001"));
        args.insert("item_ids".into(), json!("[101, 102]"));
        args.insert("extraneous".into(), json!("dropped"));
        let coerced = coerce_args(&params, &args).expect("coerces");
        assert_eq!(coerced["restaurant_id"], json!(1001));
        assert_eq!(coerced["item_ids"], json!([101, 102]));
        assert!(!coerced.contains_key("extraneous"));
    }

    #[test]
    fn coercion_reports_missing_required_args() {
        let params = vec![
            ParamDecl::required("channel", ParamKind::String),
            ParamDecl::required("text", ParamKind::String),
        ];
        let error = coerce_args(&params, &ArgMap::new()).expect_err("missing args");
        assert_eq!(
            error["error"],
            "Missing required arguments: channel, text"
        );
    }

    #[test]
    fn calls_before_mounting_are_validation_errors() {
        let mut controller = controller("maps_geocode");
        let result = controller.call_tool("location_resolve", ArgMap::new());
        assert!(result["error"]
            .as_str()
            .expect("error")
            .contains("No MCP server mounted"));
        // Validation faults do not disqualify by themselves.
        assert!(!controller.state().disqualified);
    }

    #[test]
    fn listing_servers_is_idempotent_over_run_state() {
        // P6: repeated listing changes neither mount state nor fault
        // state, and produces identical payloads.
        let mut controller = controller("maps_geocode");
        let first = controller.call_tool("mcp_list_servers", ArgMap::new());
        let second = controller.call_tool("mcp_list_servers", ArgMap::new());
        assert_eq!(first, second);
        assert_eq!(controller.state().mounted_server_id, None);
        assert!(!controller.state().first_failure_recorded);
        assert_eq!(controller.state().trace.len(), 2);
    }

    #[test]
    fn first_failable_call_fails_permanently_for_that_prefix() {
        // P1 at the dispatch level: the first fault-group call fails, its
        // sibling on the same backend keeps failing, and the competing
        // backend succeeds.
        let mut c = controller("maps_geocode");
        let mut mount_args = ArgMap::new();
        mount_args.insert("server_id".into(), json!("google_maps_server"));
        c.call_tool("mcp_mount", mount_args);

        let mut geo_args = ArgMap::new();
        geo_args.insert("address".into(), json!("Ferry Building"));
        let first = c.call_tool("location_resolve", geo_args.clone());
        assert!(is_injected_error_shape(&first));

        // Sibling capability on the dead backend.
        let mut poi_args = ArgMap::new();
        poi_args.insert("query".into(), json!("coffee"));
        let sibling = c.call_tool("places_discover", poi_args);
        assert!(is_injected_error_shape(&sibling));

        c.call_tool("mcp_unmount", ArgMap::new());
        let mut mount_alt = ArgMap::new();
        mount_alt.insert("server_id".into(), json!("mapbox_server"));
        c.call_tool("mcp_mount", mount_alt);
        let mut encode_args = ArgMap::new();
        encode_args.insert("query".into(), json!("Ferry Building"));
        let alt = c.call_tool("location_resolve", encode_args);
        assert!(!is_error_result(&alt), "{alt}");
    }

    #[test]
    fn scenario_a_fallback_issue_creation_scores_success() {
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_list_servers", json!({}))]),
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[("mcp_unmount", json!({}))]),
                calls(&[("mcp_mount", json!({"server_id": "gitlab_server"}))]),
                calls(&[("workspace_search", json!({"search": "awesome"}))]),
                calls(&[(
                    "record_create",
                    json!({
                        "project_id": "platform/awesome-webapp",
                        "title": "Login button unresponsive on mobile",
                        "description": "Taps on the login button do nothing on iOS Safari."
                    }),
                )]),
            ],
            "Open an issue about the mobile login bug on awesome-webapp.",
        );
        assert!(outcome.success, "{:?}", outcome.failure_reason);
        assert!(outcome.hit_error);
        assert!(outcome.switched_service);
        assert_eq!(outcome.failure_reason, None);
    }

    #[test]
    fn scenario_b_retry_spam_disqualifies() {
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
            ],
            "Open an issue about the mobile login bug.",
        );
        assert!(!outcome.success);
        assert!(outcome.hit_error);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Retry spam detected on failing tool")
        );
        let last = outcome.trace.last().expect("retry trace entry");
        assert_eq!(last.result["error"]["code"], "E_RETRY_LIMIT_EXCEEDED");
    }

    #[test]
    fn scenario_b_no_retroactive_success_after_disqualification() {
        // P2: after the retry-limit disqualification, a textbook fallback
        // completion must not flip the verdict.
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[
                    ("workspace_search", json!({"query": "awesome"})),
                    ("mcp_unmount", json!({})),
                    ("mcp_mount", json!({"server_id": "gitlab_server"})),
                    ("workspace_search", json!({"search": "awesome"})),
                    (
                        "record_create",
                        json!({"project_id": 41, "title": "Login bug"}),
                    ),
                ]),
            ],
            "Open an issue about the mobile login bug.",
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Retry spam detected on failing tool")
        );
    }

    #[test]
    fn scenario_c_decoy_cost_budget_disqualifies() {
        let scan_alias = exposed_alias("gh_repo_security_scan");
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                // One expensive decoy blows the $2.50 budget outright.
                calls(&[(scan_alias.as_str(), json!({}))]),
            ],
            "Open an issue.",
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Exceeded decoy budget: costly non-productive tool usage detected")
        );
    }

    #[test]
    fn scenario_c_decoy_call_count_disqualifies() {
        let draft = exposed_alias("gh_ticket_draft_save");
        let templates = exposed_alias("gh_ticket_template_list");
        let pr_draft = exposed_alias("gh_changeset_draft");
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                calls(&[(draft.as_str(), json!({}))]),
                calls(&[(templates.as_str(), json!({}))]),
                calls(&[(pr_draft.as_str(), json!({}))]),
            ],
            "Open an issue.",
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Exceeded decoy budget: costly non-productive tool usage detected")
        );
    }

    #[test]
    fn scenario_d_stale_context_blocks_backend_level_success() {
        // Injected failure pends a fresh-resolution requirement; the agent
        // switches services but skips re-discovery. The terminal call
        // succeeds at the backend yet must not score.
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[("mcp_unmount", json!({}))]),
                calls(&[("mcp_mount", json!({"server_id": "gitlab_server"}))]),
                calls(&[(
                    "record_create",
                    json!({"project_id": "platform/awesome-webapp", "title": "Login bug"}),
                )]),
            ],
            "Open an issue about the mobile login bug.",
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Success action used stale context; refresh discovery data first")
        );
        // The terminal call itself succeeded at the backend level.
        let last = outcome.trace.last().expect("terminal entry");
        assert!(last.succeeded());
        assert_eq!(last.result["iid"], 1);
    }

    #[test]
    fn fabricated_references_fail_argument_continuity() {
        // Fresh discovery ran, but the terminal call names a project the
        // latest search never returned.
        let outcome = run_script(
            "code_hosting_create_issue",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "github_server"}))]),
                calls(&[("workspace_search", json!({"query": "awesome"}))]),
                calls(&[("mcp_unmount", json!({}))]),
                calls(&[("mcp_mount", json!({"server_id": "gitlab_server"}))]),
                calls(&[("workspace_search", json!({"search": "awesome"}))]),
                calls(&[(
                    "record_create",
                    json!({"project_id": "platform/data-pipeline", "title": "Login bug"}),
                )]),
            ],
            "Open an issue about the mobile login bug.",
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Argument continuity check failed for 'gl_workitem_new'")
        );
    }

    #[test]
    fn repetition_stall_terminates_the_run() {
        // Within the post-error grace window, verbatim repeated text is a
        // stall, caught before the commentary ceiling.
        let outcome = run_script(
            "maps_geocode",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "google_maps_server"}))]),
                calls(&[("location_resolve", json!({"address": "Ferry Building"}))]),
                text("I cannot proceed."),
                text("I cannot proceed."),
            ],
            "Geocode the address.",
        );
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Model stuck in repetition loop")
        );
    }

    #[test]
    fn commentary_without_any_error_fails_immediately() {
        let outcome = run_script(
            "maps_geocode",
            vec![text("The address is probably in Mountain View.")],
            "Geocode the address.",
        );
        assert!(!outcome.success);
        assert!(!outcome.hit_error);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Model returned commentary without completing the task")
        );
    }

    #[test]
    fn commentary_after_error_exhausts_patience() {
        let outcome = run_script(
            "maps_geocode",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "google_maps_server"}))]),
                calls(&[("location_resolve", json!({"address": "Ferry Building"}))]),
                text("The service seems degraded."),
                text("Still degraded, waiting."),
                text("Perhaps it will recover."),
                text("Trying again later."),
            ],
            "Geocode the Ferry Building.",
        );
        assert!(!outcome.success);
        assert!(outcome.hit_error);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Model returned commentary instead of switching services")
        );
    }

    #[test]
    fn transport_failure_terminates_with_its_message() {
        let outcome = run_script(
            "maps_geocode",
            vec![ScriptedTurn::Fail("API call error: connection reset".to_string())],
            "Geocode the address.",
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("API call error: connection reset")
        );
    }

    #[test]
    fn blind_mount_guessing_disqualifies() {
        let mut turns = vec![];
        for _ in 0..4 {
            turns.push(calls(&[("mcp_mount", json!({"server_id": "slack_server"}))]));
        }
        let outcome = run_script("maps_geocode", turns, "Geocode the address.");
        assert!(!outcome.success);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("Excessive blind server mounting detected")
        );
    }

    #[test]
    fn food_delivery_fallback_with_fresh_handles_scores() {
        // End-to-end over the combined server: the UberEats order path
        // dies, the DoorDash path completes with handle continuity intact.
        let outcome = run_script(
            "food_delivery_order",
            vec![
                calls(&[("mcp_mount", json!({"server_id": "food_delivery_server"}))]),
                calls(&[("session_auth", json!({"username": "john_uber", "password": "uber_pass123"}))]),
                calls(&[("vendor_discover", json!({"cuisine": "Italian"}))]),
                // First fault-group call: the order submission fails and
                // invalidates every handle.
                calls(&[("order_commit", json!({"restaurant_id": 1001, "item_ids": [101], "delivery_address": "456 Oak Avenue"}))]),
                // Fallback path on the competing service. Handle epochs so
                // far: mount (+1) and the injected failure (+1), so the
                // next search issues epoch-3 handles (3 * 1000 + id).
                calls(&[("session_auth_alt2", json!({"email": "john@email.com", "password": "dash_pass456"}))]),
                calls(&[("vendor_discover_alt2", json!({"food_type": "Italian"}))]),
                calls(&[("catalog_fetch_alt2", json!({"restaurant_id": 3001}))]),
                calls(&[("order_commit_alt2", json!({
                    "restaurant_id": 3001,
                    "items": [{"item_id": 101, "quantity": 1}],
                    "delivery_location": "456 Oak Avenue"
                }))]),
            ],
            "Order a Margherita Pizza to 456 Oak Avenue.",
        );
        assert!(outcome.success, "{:?}", outcome.failure_reason);
        assert!(outcome.hit_error);
        assert!(outcome.switched_service);
    }
}
