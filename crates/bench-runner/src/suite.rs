//! Benchmark suite: scenarios × difficulty levels, one fresh controller
//! and fresh backend set per run, aggregated into a console scorecard.
//! A run that panics internally is contained and recorded as
//! "Runner crashed", never aborting the sweep.

use anyhow::Result;
use bench_core::ProviderAdapter;
use chrono::Utc;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use crate::controller::RunController;
use crate::sink::{JsonTraceSink, RunTraceRecord, TraceSink, RUN_TRACE_SCHEMA_VERSION};
use crate::state::{RunLimits, RunOutcome};

pub const DIFFICULTY_LEVELS: &[&str] = &["easy", "medium", "hard"];

#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub provider: String,
    pub model: String,
    pub scenarios: Vec<String>,
    pub levels: Vec<String>,
    pub limits: RunLimits,
    pub verbose: bool,
    pub trace_dir: Option<PathBuf>,
    /// Scenario id -> { level -> prompt } object.
    pub prompts: Value,
}

#[derive(Debug, Clone)]
pub struct ScoredRun {
    pub scenario: String,
    pub server: String,
    pub level: String,
    pub prompt: String,
    pub outcome: RunOutcome,
}

pub struct BenchmarkSuite {
    config: SuiteConfig,
    pub results: Vec<ScoredRun>,
}

impl BenchmarkSuite {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
        }
    }

    /// Run every scenario × level. `make_adapter` is called once per run so
    /// each run owns an independent conversation.
    pub fn run_all<F>(&mut self, mut make_adapter: F) -> Result<()>
    where
        F: FnMut() -> Result<Box<dyn ProviderAdapter>>,
    {
        let total = self.config.scenarios.len() * self.config.levels.len();
        let mut current = 0;
        let mut sink = match &self.config.trace_dir {
            Some(dir) => Some(JsonTraceSink::new(dir)?),
            None => None,
        };

        println!("{}", "=".repeat(70));
        println!(
            "  BENCHMARK: {} ({})",
            self.config.model, self.config.provider
        );
        println!(
            "  Scenarios: {} | Levels: {} | Total runs: {}",
            self.config.scenarios.len(),
            self.config.levels.len(),
            total
        );
        println!("{}", "=".repeat(70));

        let scenarios = self.config.scenarios.clone();
        let levels = self.config.levels.clone();
        for scenario_id in &scenarios {
            let Some(spec) = bench_registry::scenario(scenario_id) else {
                println!("\n[SKIP] Unknown scenario '{scenario_id}'");
                continue;
            };
            for level in &levels {
                current += 1;
                let Some(prompt) = self
                    .config
                    .prompts
                    .get(scenario_id)
                    .and_then(|entry| entry.get(level))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                else {
                    println!("\n[SKIP] No {level} prompt for '{scenario_id}'");
                    continue;
                };

                println!("\n{}", "\u{2500}".repeat(70));
                println!("  [{current}/{total}] {scenario_id} | {}", level.to_uppercase());
                println!("{}", "\u{2500}".repeat(70));

                let outcome = self.execute_run(scenario_id, &prompt, &mut make_adapter);
                let scored = ScoredRun {
                    scenario: scenario_id.clone(),
                    server: spec.category.as_str().to_string(),
                    level: level.clone(),
                    prompt: prompt.clone(),
                    outcome,
                };

                if let Some(sink) = sink.as_mut() {
                    let record = self.trace_record(&scored);
                    match sink.write_run(&record) {
                        Ok(path) => println!("  Trace saved: {}", path.display()),
                        Err(err) => println!("  Trace write failed: {err}"),
                    }
                }

                let status = if scored.outcome.success { "PASS" } else { "FAIL" };
                let reason = if scored.outcome.success {
                    String::new()
                } else {
                    format!(
                        " ({})",
                        scored.outcome.failure_reason.as_deref().unwrap_or("")
                    )
                };
                println!("  Result: {status}{reason}");
                self.results.push(scored);
            }
        }

        self.print_scorecard();
        Ok(())
    }

    fn execute_run<F>(&self, scenario_id: &str, prompt: &str, make_adapter: &mut F) -> RunOutcome
    where
        F: FnMut() -> Result<Box<dyn ProviderAdapter>>,
    {
        let limits = self.config.limits.clone();
        let verbose = self.config.verbose;
        let attempt = catch_unwind(AssertUnwindSafe(|| -> Result<RunOutcome> {
            let mut provider = make_adapter()?;
            let mut controller = RunController::new(scenario_id, limits, verbose)?;
            Ok(controller.run(provider.as_mut(), prompt))
        }));
        match attempt {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => crashed_outcome(&err.to_string()),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                crashed_outcome(&message)
            }
        }
    }

    fn trace_record(&self, scored: &ScoredRun) -> RunTraceRecord {
        RunTraceRecord {
            schema_version: RUN_TRACE_SCHEMA_VERSION.to_string(),
            scenario: scored.scenario.clone(),
            server: scored.server.clone(),
            level: scored.level.clone(),
            model: self.config.model.clone(),
            provider: self.config.provider.clone(),
            prompt: scored.prompt.clone(),
            success: scored.outcome.success,
            hit_error: scored.outcome.hit_error,
            switched_service: scored.outcome.switched_service,
            failure_reason: scored.outcome.failure_reason.clone(),
            recorded_at: Utc::now().to_rfc3339(),
            conversation: scored.outcome.conversation.clone(),
            trace: scored.outcome.trace.clone(),
        }
    }

    pub fn print_scorecard(&self) {
        println!("\n");
        println!("{}", "=".repeat(70));
        println!(
            "  SCORECARD - {} ({})",
            self.config.model, self.config.provider
        );
        println!("{}", "=".repeat(70));

        println!("\n  BY DIFFICULTY LEVEL:");
        println!("  {:<12} {:>6} {:>6} {:>10}", "Level", "Pass", "Total", "Accuracy");
        println!("  {}", "\u{2500}".repeat(36));
        let mut all_pass = 0;
        let mut all_total = 0;
        for level in DIFFICULTY_LEVELS {
            let total = self.results.iter().filter(|r| r.level == *level).count();
            let pass = self
                .results
                .iter()
                .filter(|r| r.level == *level && r.outcome.success)
                .count();
            let pct = if total > 0 {
                pass as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            println!(
                "  {:<12} {:>6} {:>6} {:>9.1}%",
                level.to_uppercase(),
                pass,
                total,
                pct
            );
            all_pass += pass;
            all_total += total;
        }
        let avg = if all_total > 0 {
            all_pass as f64 / all_total as f64 * 100.0
        } else {
            0.0
        };
        println!("  {}", "\u{2500}".repeat(36));
        println!("  {:<12} {:>6} {:>6} {:>9.1}%", "AVERAGE", all_pass, all_total, avg);

        println!("\n  BY SERVER PAIR:");
        println!("  {:<20} {:>6} {:>6} {:>10}", "Server", "Pass", "Total", "Accuracy");
        println!("  {}", "\u{2500}".repeat(44));
        let mut servers: Vec<String> = self.results.iter().map(|r| r.server.clone()).collect();
        servers.sort();
        servers.dedup();
        for server in &servers {
            let total = self.results.iter().filter(|r| &r.server == server).count();
            let pass = self
                .results
                .iter()
                .filter(|r| &r.server == server && r.outcome.success)
                .count();
            let pct = if total > 0 {
                pass as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            println!("  {:<20} {:>6} {:>6} {:>9.1}%", server, pass, total, pct);
        }

        println!("\n  DETAILED RESULTS:");
        println!("  {:<30} {:<8} {:<8} {}", "Scenario", "Level", "Result", "Reason");
        println!("  {}", "\u{2500}".repeat(80));
        for scored in &self.results {
            let status = if scored.outcome.success { "PASS" } else { "FAIL" };
            let mut reason = if scored.outcome.success {
                String::new()
            } else {
                scored
                    .outcome
                    .failure_reason
                    .clone()
                    .unwrap_or_default()
            };
            if reason.len() > 30 {
                reason.truncate(30);
                reason.push_str("...");
            }
            println!(
                "  {:<30} {:<8} {:<8} {}",
                scored.scenario, scored.level, status, reason
            );
        }

        println!("\n{}", "=".repeat(70));
        println!("  FINAL SCORE: {all_pass}/{all_total} ({avg:.1}%)");
        println!("{}", "=".repeat(70));
    }
}

fn crashed_outcome(message: &str) -> RunOutcome {
    RunOutcome {
        success: false,
        hit_error: false,
        switched_service: false,
        failure_reason: Some(format!("Runner crashed: {message}")),
        trace: Vec::new(),
        conversation: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{calls, ScriptedProvider, ScriptedTurn};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn config(scenarios: &[&str], levels: &[&str], trace_dir: Option<PathBuf>) -> SuiteConfig {
        SuiteConfig {
            provider: "scripted".to_string(),
            model: "scripted-model".to_string(),
            scenarios: scenarios.iter().map(|s| s.to_string()).collect(),
            levels: levels.iter().map(|s| s.to_string()).collect(),
            limits: RunLimits::default(),
            verbose: false,
            trace_dir,
            prompts: bench_registry::builtin_prompts().expect("prompts"),
        }
    }

    fn fallback_script() -> Vec<ScriptedTurn> {
        vec![
            calls(&[("mcp_mount", json!({"server_id": "google_maps_server"}))]),
            calls(&[("location_resolve", json!({"address": "1600 Amphitheatre Parkway, Mountain View"}))]),
            calls(&[("mcp_unmount", json!({}))]),
            calls(&[("mcp_mount", json!({"server_id": "mapbox_server"}))]),
            calls(&[("location_resolve", json!({"query": "1600 Amphitheatre Parkway, Mountain View"}))]),
        ]
    }

    #[test]
    fn suite_runs_each_level_with_a_fresh_adapter() {
        let mut suite = BenchmarkSuite::new(config(&["maps_geocode"], &["easy", "hard"], None));
        let scripts = Arc::new(Mutex::new(VecDeque::from([
            fallback_script(),
            fallback_script(),
        ])));
        let scripts_handle = scripts.clone();
        suite
            .run_all(move || {
                let script = scripts_handle
                    .lock()
                    .expect("scripts lock")
                    .pop_front()
                    .expect("a script per run");
                Ok(Box::new(ScriptedProvider::new(script)))
            })
            .expect("suite run");
        assert_eq!(suite.results.len(), 2);
        for scored in &suite.results {
            assert!(scored.outcome.success, "{:?}", scored.outcome.failure_reason);
            assert!(scored.outcome.hit_error);
        }
    }

    #[test]
    fn traces_are_persisted_per_run() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("bench_suite_traces_{nanos}"));
        let mut suite =
            BenchmarkSuite::new(config(&["maps_geocode"], &["easy"], Some(dir.clone())));
        suite
            .run_all(|| Ok(Box::new(ScriptedProvider::new(fallback_script()))))
            .expect("suite run");
        let trace_path = dir.join("maps_geocode_easy.json");
        assert!(trace_path.exists());
        let record: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&trace_path).expect("read")).expect("json");
        assert_eq!(record["provider"], "scripted");
        assert_eq!(record["success"], true);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_scenarios_are_skipped_not_fatal() {
        let mut suite = BenchmarkSuite::new(config(&["no_such_scenario"], &["easy"], None));
        suite
            .run_all(|| Ok(Box::new(ScriptedProvider::new(Vec::new()))))
            .expect("suite run");
        assert!(suite.results.is_empty());
    }
}
