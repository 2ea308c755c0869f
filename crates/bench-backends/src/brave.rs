//! Brave search mock (`brv_` tools). Result ids are epoch-tagged; every
//! search opens a new epoch.

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, str_arg, unknown_tool, usize_arg_or, Backend, ToolSpec};

const WEB_CORPUS: &[(&str, &str, &str)] = &[
    (
        "Blocking HTTP clients in Rust compared",
        "https://example.org/rust-http-clients",
        "A side-by-side look at synchronous HTTP client libraries, connection pooling and TLS options.",
    ),
    (
        "Designing worker pools with bounded queues",
        "https://example.org/worker-pools",
        "Backpressure strategies for thread pools: bounded channels, tickets and completion polling.",
    ),
    (
        "Acme Robotics raises Series B",
        "https://example.org/acme-robotics-series-b",
        "Acme Robotics, maker of warehouse automation arms, announced a $40M round and 180 employees.",
    ),
    (
        "Field guide to retry budgets",
        "https://example.org/retry-budgets",
        "Why hammering a failing endpoint makes outages worse, and what to do instead.",
    ),
];

const LOCAL_CORPUS: &[(&str, &str, &str)] = &[
    ("Beacon Coffee", "120 Market St, San Francisco", "coffee"),
    ("Fog Lifter Cafe", "501 Mission St, San Francisco", "coffee"),
    ("Harbor Noodle", "8 Embarcadero Ctr, San Francisco", "restaurant"),
];

pub struct BraveSearchBackend {
    search_epoch: i64,
}

impl BraveSearchBackend {
    pub fn new() -> Self {
        Self { search_epoch: 0 }
    }

    fn index_query(&mut self, args: &ArgMap) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return err("query is required");
        };
        let count = usize_arg_or(args, "count", 5);
        self.search_epoch += 1;
        let results: Vec<Value> = WEB_CORPUS
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, (title, url, description))| {
                json!({
                    "title": title,
                    "url": url,
                    "description": description,
                    "result_id": format!("brv_{}_{}", self.search_epoch, i),
                })
            })
            .collect();
        json!({
            "query": query,
            "search_epoch": self.search_epoch,
            "results": results,
        })
    }

    fn nearby_lookup(&mut self, args: &ArgMap) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return err("query is required");
        };
        let needle = query.to_lowercase();
        self.search_epoch += 1;
        let results: Vec<Value> = LOCAL_CORPUS
            .iter()
            .enumerate()
            .filter(|(_, (name, _, category))| {
                needle.contains(category) || name.to_lowercase().contains(&needle)
            })
            .map(|(i, (name, address, category))| {
                json!({
                    "name": name,
                    "address": address,
                    "category": category,
                    "result_id": format!("brv_local_{}_{}", self.search_epoch, i),
                })
            })
            .collect();
        json!({
            "query": query,
            "search_epoch": self.search_epoch,
            "results": results,
        })
    }
}

impl Default for BraveSearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for BraveSearchBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "brv_index_query",
                description: "Web search against the Brave index. Returns results with title, url and description.",
                params: vec![
                    ParamDecl::required("query", ParamKind::String),
                    ParamDecl::optional("count", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "brv_nearby_lookup",
                description: "Local search against the Brave index for places near a location.",
                params: vec![
                    ParamDecl::required("query", ParamKind::String),
                    ParamDecl::optional("location", ParamKind::String),
                ],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "brv_index_query" => self.index_query(args),
            "brv_nearby_lookup" => self.nearby_lookup(args),
            other => unknown_tool("BraveSearchBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }

    fn invalidate_transient_handles(&mut self) {
        self.search_epoch += 1;
    }
}
