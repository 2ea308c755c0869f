//! GitLab mock (`gl_` tools). Projects are addressed by numeric id or
//! `path_with_namespace`; namespace queries stamp results with the current
//! query epoch and issue per-epoch result handles.

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, i64_arg, str_arg, unknown_tool, Backend, ToolSpec};

#[derive(Debug, Clone)]
struct Project {
    id: i64,
    path_with_namespace: String,
    description: String,
    visibility: &'static str,
    default_branch: String,
    branches: Vec<String>,
    issues: Vec<Value>,
    merge_requests: Vec<Value>,
}

pub struct GitLabBackend {
    projects: Vec<Project>,
    query_epoch: i64,
    next_project_id: i64,
}

fn seed_project(id: i64, path: &str, description: &str, branches: &[&str]) -> Project {
    Project {
        id,
        path_with_namespace: path.to_string(),
        description: description.to_string(),
        visibility: "public",
        default_branch: "main".to_string(),
        branches: branches.iter().map(|b| b.to_string()).collect(),
        issues: Vec::new(),
        merge_requests: Vec::new(),
    }
}

impl GitLabBackend {
    pub fn new() -> Self {
        Self {
            projects: vec![
                seed_project(
                    41,
                    "platform/awesome-webapp",
                    "A modern webapp with login and checkout flows",
                    &["main", "fix-login"],
                ),
                seed_project(
                    42,
                    "platform/data-pipeline",
                    "Streaming data pipeline toolkit",
                    &["main"],
                ),
            ],
            query_epoch: 0,
            next_project_id: 100,
        }
    }

    /// Accepts a numeric id or a path_with_namespace.
    fn find_project(&self, reference: &Value) -> Option<usize> {
        match reference {
            Value::Number(n) => {
                let id = n.as_i64()?;
                self.projects.iter().position(|p| p.id == id)
            }
            Value::String(s) => {
                if let Ok(id) = s.trim().parse::<i64>() {
                    if let Some(idx) = self.projects.iter().position(|p| p.id == id) {
                        return Some(idx);
                    }
                }
                self.projects
                    .iter()
                    .position(|p| p.path_with_namespace == *s)
            }
            _ => None,
        }
    }

    fn project_arg(&self, args: &ArgMap) -> Result<usize, Value> {
        let Some(reference) = args.get("project_id") else {
            return Err(err("project_id is required"));
        };
        self.find_project(reference)
            .ok_or_else(|| err(format!("Project {reference} not found")))
    }

    fn namespace_query(&mut self, args: &ArgMap) -> Value {
        let search = str_arg(args, "search").unwrap_or_default().to_lowercase();
        let page = i64_arg(args, "page").unwrap_or(1).max(1) as usize;
        let per_page = i64_arg(args, "per_page").unwrap_or(10).max(1) as usize;
        self.query_epoch += 1;
        let matches: Vec<Value> = self
            .projects
            .iter()
            .filter(|p| {
                p.path_with_namespace.to_lowercase().contains(&search)
                    || p.description.to_lowercase().contains(&search)
            })
            .map(|p| {
                json!({
                    "id": p.id,
                    "path_with_namespace": p.path_with_namespace,
                    "description": p.description,
                    "visibility": p.visibility,
                    "result_handle": format!("p_{}_{}", self.query_epoch, p.id),
                })
            })
            .collect();
        let total = matches.len();
        let start = (page - 1) * per_page;
        let page_items: Vec<Value> = matches.into_iter().skip(start).take(per_page).collect();
        json!({
            "total_count": total,
            "query_epoch": self.query_epoch,
            "items": page_items,
        })
    }

    fn workitem_new(&mut self, args: &ArgMap) -> Value {
        let idx = match self.project_arg(args) {
            Ok(idx) => idx,
            Err(e) => return e,
        };
        let Some(title) = str_arg(args, "title") else {
            return err("title is required");
        };
        let description = str_arg(args, "description").unwrap_or_default();
        let iid = self.projects[idx].issues.len() as i64 + 1;
        let issue = json!({
            "iid": iid,
            "project_id": self.projects[idx].id,
            "title": title,
            "description": description,
            "state": "opened",
        });
        self.projects[idx].issues.push(issue.clone());
        json!({
            "iid": iid,
            "project_id": self.projects[idx].id,
            "title": title,
            "state": "opened",
            "web_url": format!(
                "https://gitlab.com/{}/-/issues/{}",
                self.projects[idx].path_with_namespace, iid
            ),
        })
    }

    fn project_fork(&mut self, args: &ArgMap) -> Value {
        let idx = match self.project_arg(args) {
            Ok(idx) => idx,
            Err(e) => return e,
        };
        let namespace = str_arg(args, "namespace").unwrap_or("benchmark-user");
        let source = self.projects[idx].clone();
        let short_name = source
            .path_with_namespace
            .rsplit('/')
            .next()
            .unwrap_or("project")
            .to_string();
        let fork = Project {
            id: self.next_project_id,
            path_with_namespace: format!("{namespace}/{short_name}"),
            issues: Vec::new(),
            merge_requests: Vec::new(),
            ..source.clone()
        };
        self.next_project_id += 1;
        let result = json!({
            "id": fork.id,
            "path_with_namespace": fork.path_with_namespace,
            "forked_from_project": { "id": source.id, "path_with_namespace": source.path_with_namespace },
        });
        self.projects.push(fork);
        result
    }

    fn diff_request(&mut self, args: &ArgMap) -> Value {
        let idx = match self.project_arg(args) {
            Ok(idx) => idx,
            Err(e) => return e,
        };
        let Some(title) = str_arg(args, "title") else {
            return err("title is required");
        };
        let Some(source_branch) = str_arg(args, "source_branch") else {
            return err("source_branch is required");
        };
        let target_branch = str_arg(args, "target_branch")
            .unwrap_or(&self.projects[idx].default_branch)
            .to_string();
        if !self.projects[idx].branches.iter().any(|b| b == source_branch) {
            return err(format!("Source branch {source_branch} not found"));
        }
        if !self.projects[idx].branches.iter().any(|b| *b == target_branch) {
            return err(format!("Target branch {target_branch} not found"));
        }
        let iid = self.projects[idx].merge_requests.len() as i64 + 1;
        let mr = json!({
            "iid": iid,
            "title": title,
            "source_branch": source_branch,
            "target_branch": target_branch,
            "state": "opened",
        });
        self.projects[idx].merge_requests.push(mr);
        json!({
            "iid": iid,
            "project_id": self.projects[idx].id,
            "title": title,
            "source_branch": source_branch,
            "target_branch": target_branch,
            "state": "opened",
        })
    }

    fn branch_init(&mut self, args: &ArgMap) -> Value {
        let idx = match self.project_arg(args) {
            Ok(idx) => idx,
            Err(e) => return e,
        };
        let Some(branch) = str_arg(args, "branch") else {
            return err("branch is required");
        };
        let reference = str_arg(args, "ref")
            .unwrap_or(&self.projects[idx].default_branch)
            .to_string();
        if !self.projects[idx].branches.iter().any(|b| *b == reference) {
            return err(format!("Ref {reference} not found"));
        }
        if self.projects[idx].branches.iter().any(|b| b == branch) {
            return err(format!("Branch {branch} already exists"));
        }
        self.projects[idx].branches.push(branch.to_string());
        json!({ "branch": branch, "ref": reference })
    }

    fn workitems_list(&mut self, args: &ArgMap) -> Value {
        let idx = match self.project_arg(args) {
            Ok(idx) => idx,
            Err(e) => return e,
        };
        json!({
            "total_count": self.projects[idx].issues.len(),
            "items": self.projects[idx].issues,
        })
    }
}

impl Default for GitLabBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for GitLabBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "gl_namespace_query",
                description: "Search GitLab projects by path or description. Returns items with id and path_with_namespace.",
                params: vec![
                    ParamDecl::required("search", ParamKind::String),
                    ParamDecl::optional("page", ParamKind::Integer),
                    ParamDecl::optional("per_page", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "gl_workitem_new",
                description: "Create an issue on a GitLab project. project_id is an id or path_with_namespace from a prior namespace query.",
                params: vec![
                    ParamDecl::required("project_id", ParamKind::String),
                    ParamDecl::required("title", ParamKind::String),
                    ParamDecl::optional("description", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gl_project_fork",
                description: "Fork a GitLab project into a namespace.",
                params: vec![
                    ParamDecl::required("project_id", ParamKind::String),
                    ParamDecl::optional("namespace", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gl_diff_request",
                description: "Open a merge request on a GitLab project from source_branch into target_branch.",
                params: vec![
                    ParamDecl::required("project_id", ParamKind::String),
                    ParamDecl::required("title", ParamKind::String),
                    ParamDecl::required("source_branch", ParamKind::String),
                    ParamDecl::optional("target_branch", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gl_branch_init",
                description: "Create a branch on a GitLab project from an existing ref.",
                params: vec![
                    ParamDecl::required("project_id", ParamKind::String),
                    ParamDecl::required("branch", ParamKind::String),
                    ParamDecl::optional("ref", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gl_workitems_list",
                description: "List issues of a GitLab project.",
                params: vec![ParamDecl::required("project_id", ParamKind::String)],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "gl_namespace_query" => self.namespace_query(args),
            "gl_workitem_new" => self.workitem_new(args),
            "gl_project_fork" => self.project_fork(args),
            "gl_diff_request" => self.diff_request(args),
            "gl_branch_init" => self.branch_init(args),
            "gl_workitems_list" => self.workitems_list(args),
            other => unknown_tool("GitLabBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }

    fn invalidate_transient_handles(&mut self) {
        self.query_epoch += 1;
    }
}
