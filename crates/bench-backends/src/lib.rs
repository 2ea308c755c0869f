//! Mock service backends. Each backend declares its tool surface as data
//! (no reflection) and dispatches calls by name; failures are returned as
//! `{"error": ...}` values, never panics. Discovery responses issue
//! epoch-tagged transient handles that go stale when
//! `invalidate_transient_handles` is called.

use bench_core::{ArgMap, ParamDecl};
use serde_json::{json, Value};

mod brave;
mod discord;
mod exa;
mod food_delivery;
mod github;
mod gitlab;
mod google_maps;
mod mapbox;
mod slack;

pub use brave::BraveSearchBackend;
pub use discord::DiscordBackend;
pub use exa::ExaSearchBackend;
pub use food_delivery::FoodDeliveryBackend;
pub use github::GitHubBackend;
pub use gitlab::GitLabBackend;
pub use google_maps::GoogleMapsBackend;
pub use mapbox::MapboxBackend;
pub use slack::SlackBackend;

/// One declared tool on a backend.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamDecl>,
}

/// A mock service. `load_scenario` seeds state once per run;
/// `invalidate_transient_handles` is an explicit capability (default
/// no-op) bumping the handle epoch after injected failures and mount
/// switches.
pub trait Backend {
    fn tools(&self) -> Vec<ToolSpec>;
    fn call(&mut self, tool: &str, args: &ArgMap) -> Value;
    fn load_scenario(&mut self, scenario: &Value);
    fn invalidate_transient_handles(&mut self) {}
}

pub(crate) fn err(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

pub(crate) fn unknown_tool(backend: &str, tool: &str) -> Value {
    err(format!("Tool '{tool}' not implemented by {backend}"))
}

pub(crate) fn str_arg<'a>(args: &'a ArgMap, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

/// Integer argument, tolerating numeric strings.
pub(crate) fn i64_arg(args: &ArgMap, name: &str) -> Option<i64> {
    match args.get(name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn f64_arg(args: &ArgMap, name: &str) -> Option<f64> {
    match args.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn usize_arg_or(args: &ArgMap, name: &str, default: usize) -> usize {
    i64_arg(args, name)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerant_numeric_args() {
        let mut args = ArgMap::new();
        args.insert("a".into(), json!(7));
        args.insert("b".into(), json!("12"));
        args.insert("c".into(), json!("not a number"));
        assert_eq!(i64_arg(&args, "a"), Some(7));
        assert_eq!(i64_arg(&args, "b"), Some(12));
        assert_eq!(i64_arg(&args, "c"), None);
        assert_eq!(i64_arg(&args, "missing"), None);
        assert_eq!(usize_arg_or(&args, "missing", 10), 10);
    }

    #[test]
    fn every_backend_declares_unique_tool_names() {
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(FoodDeliveryBackend::new()),
            Box::new(GitHubBackend::new()),
            Box::new(GitLabBackend::new()),
            Box::new(SlackBackend::new()),
            Box::new(DiscordBackend::new()),
            Box::new(GoogleMapsBackend::new()),
            Box::new(MapboxBackend::new()),
            Box::new(BraveSearchBackend::new()),
            Box::new(ExaSearchBackend::new()),
        ];
        let mut seen = std::collections::BTreeSet::new();
        for backend in &backends {
            for tool in backend.tools() {
                assert!(seen.insert(tool.name), "duplicate tool {}", tool.name);
            }
        }
    }
}
