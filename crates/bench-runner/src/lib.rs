//! Core engine of the service-fallback benchmark: fault injection, server
//! mounting, continuity validation, the per-run turn-loop controller, and
//! the scenario sweep suite. Mock backends and provider adapters plug in
//! from their own crates; all policy lives here.

mod continuity;
mod controller;
mod fault;
mod mount;
mod scripted;
mod sink;
mod state;
mod suite;

pub use continuity::{argument_continuity_ok, evaluate_success, prerequisites_satisfied, SuccessCheck};
pub use controller::{coerce_args, RunController, SYSTEM_PROMPT};
pub use fault::FaultInjector;
pub use mount::{MountManager, ToolBinding};
pub use scripted::{calls, text, ScriptedProvider, ScriptedTurn};
pub use sink::{bundle_traces, JsonTraceSink, RunTraceRecord, TraceSink, RUN_TRACE_SCHEMA_VERSION};
pub use state::{RunLimits, RunOutcome, RunState, TraceEntry};
pub use suite::{BenchmarkSuite, ScoredRun, SuiteConfig, DIFFICULTY_LEVELS};
