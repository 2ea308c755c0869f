//! Exa search mock (`exa_` tools). Document extraction requires a
//! result id from the most recent corpus search; ids are epoch-tagged.

use std::collections::BTreeMap;

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, str_arg, unknown_tool, usize_arg_or, Backend, ToolSpec};

const CORPUS: &[(&str, &str, &str)] = &[
    (
        "Synchronous HTTP in systems languages",
        "https://example.org/sync-http",
        "Long-form survey of blocking HTTP stacks, TLS backends and connection reuse trade-offs.",
    ),
    (
        "Bounded queues and backpressure",
        "https://example.org/bounded-queues",
        "How bounded work queues keep producers honest; includes worked examples with thread pools.",
    ),
    (
        "Retry storms considered harmful",
        "https://example.org/retry-storms",
        "Case studies of outages amplified by aggressive client retries.",
    ),
];

const CODE_CORPUS: &[(&str, &str, &str)] = &[
    (
        "worker-pool/src/queue.rs",
        "example/worker-pool",
        "let (tx, rx) = mpsc::sync_channel(capacity); // bounded hand-off between producers and workers",
    ),
    (
        "jobs/src/dispatch.rs",
        "example/jobs",
        "while let Ok(task) = rx.recv_timeout(poll_interval) { pool.execute(task)?; }",
    ),
];

pub struct ExaSearchBackend {
    search_epoch: i64,
    doc_handles: BTreeMap<String, usize>,
}

impl ExaSearchBackend {
    pub fn new() -> Self {
        Self {
            search_epoch: 0,
            doc_handles: BTreeMap::new(),
        }
    }

    fn corpus_search(&mut self, args: &ArgMap) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return err("query is required");
        };
        let num_results = usize_arg_or(args, "num_results", 5);
        self.search_epoch += 1;
        self.doc_handles.clear();
        let results: Vec<Value> = CORPUS
            .iter()
            .take(num_results)
            .enumerate()
            .map(|(i, (title, url, snippet))| {
                let id = format!("exa_{}_{}", self.search_epoch, i);
                self.doc_handles.insert(id.clone(), i);
                json!({
                    "id": id,
                    "title": title,
                    "url": url,
                    "snippet": snippet,
                })
            })
            .collect();
        json!({
            "query": query,
            "search_epoch": self.search_epoch,
            "results": results,
        })
    }

    fn doc_extract(&mut self, args: &ArgMap) -> Value {
        let Some(result_id) = str_arg(args, "result_id") else {
            return err("result_id is required");
        };
        match self.doc_handles.get(result_id) {
            Some(idx) => {
                let (title, url, snippet) = CORPUS[*idx];
                json!({
                    "id": result_id,
                    "title": title,
                    "url": url,
                    "text": format!("{snippet} (full text)"),
                })
            }
            None => err("Result id is stale. Re-run the corpus search before extracting documents."),
        }
    }

    fn codebase_query(&mut self, args: &ArgMap) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return err("query is required");
        };
        let results: Vec<Value> = CODE_CORPUS
            .iter()
            .map(|(file, repo, snippet)| {
                json!({ "file": file, "repo": repo, "snippet": snippet })
            })
            .collect();
        json!({ "query": query, "results": results })
    }

    fn org_intelligence(&mut self, args: &ArgMap) -> Value {
        let Some(company) = str_arg(args, "company") else {
            return err("company is required");
        };
        if company.to_lowercase().contains("acme") {
            json!({
                "found": true,
                "company": {
                    "name": "Acme Robotics",
                    "industry": "Warehouse automation",
                    "employees": 180,
                    "funding": "Series B, $40M",
                    "summary": "Builds robotic picking arms and the fleet software that drives them.",
                },
            })
        } else {
            json!({ "found": false, "company": null })
        }
    }
}

impl Default for ExaSearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ExaSearchBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "exa_corpus_search",
                description: "Semantic web search over the Exa corpus. Returns results with ids usable for document extraction.",
                params: vec![
                    ParamDecl::required("query", ParamKind::String),
                    ParamDecl::optional("num_results", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "exa_doc_extract",
                description: "Extract the full text of a result using an id from the most recent corpus search.",
                params: vec![ParamDecl::required("result_id", ParamKind::String)],
            },
            ToolSpec {
                name: "exa_codebase_query",
                description: "Search code context with Exa. Returns results with file, repo and snippet.",
                params: vec![ParamDecl::required("query", ParamKind::String)],
            },
            ToolSpec {
                name: "exa_org_intelligence",
                description: "Company research with Exa. Returns found plus a company profile when known.",
                params: vec![ParamDecl::required("company", ParamKind::String)],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "exa_corpus_search" => self.corpus_search(args),
            "exa_doc_extract" => self.doc_extract(args),
            "exa_codebase_query" => self.codebase_query(args),
            "exa_org_intelligence" => self.org_intelligence(args),
            other => unknown_tool("ExaSearchBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }

    fn invalidate_transient_handles(&mut self) {
        self.search_epoch += 1;
        self.doc_handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, Value)]) -> ArgMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn extraction_requires_current_epoch_id() {
        let mut api = ExaSearchBackend::new();
        let found = api.call("exa_corpus_search", &args(&[("query", json!("retry storms"))]));
        let id = found["results"][0]["id"].as_str().expect("id").to_string();
        let doc = api.call("exa_doc_extract", &args(&[("result_id", json!(id.clone()))]));
        assert!(doc.get("error").is_none());

        api.invalidate_transient_handles();
        let stale = api.call("exa_doc_extract", &args(&[("result_id", json!(id))]));
        assert!(stale["error"].as_str().expect("stale").contains("stale"));
    }

    #[test]
    fn company_research_finds_acme() {
        let mut api = ExaSearchBackend::new();
        let result = api.call("exa_org_intelligence", &args(&[("company", json!("Acme Robotics"))]));
        assert_eq!(result["found"], true);
        assert_eq!(result["company"]["employees"], 180);
        let missing = api.call("exa_org_intelligence", &args(&[("company", json!("Globex"))]));
        assert_eq!(missing["found"], false);
    }
}
