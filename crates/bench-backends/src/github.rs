//! GitHub mock (`gh_` tools). Repositories are addressed by owner/repo;
//! issue and change-request numbers are allocated per repository.

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, i64_arg, str_arg, unknown_tool, Backend, ToolSpec};

#[derive(Debug, Clone)]
struct Repo {
    id: i64,
    owner: String,
    name: String,
    description: String,
    private: bool,
    default_branch: String,
    branches: Vec<String>,
    issues: Vec<Value>,
    pulls: Vec<Value>,
}

impl Repo {
    fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

pub struct GitHubBackend {
    repos: Vec<Repo>,
    next_repo_id: i64,
}

fn seed_repo(id: i64, owner: &str, name: &str, description: &str, branches: &[&str]) -> Repo {
    Repo {
        id,
        owner: owner.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        private: false,
        default_branch: "main".to_string(),
        branches: branches.iter().map(|b| b.to_string()).collect(),
        issues: Vec::new(),
        pulls: Vec::new(),
    }
}

impl GitHubBackend {
    pub fn new() -> Self {
        Self {
            repos: vec![
                seed_repo(
                    1,
                    "octo-team",
                    "awesome-webapp",
                    "A modern webapp with login and checkout flows",
                    &["main", "fix-login", "develop"],
                ),
                seed_repo(
                    2,
                    "octo-team",
                    "data-pipeline",
                    "Streaming data pipeline toolkit",
                    &["main"],
                ),
                seed_repo(
                    3,
                    "dataworks",
                    "pipeline-scheduler",
                    "Cron-style pipeline scheduler",
                    &["main", "v2"],
                ),
            ],
            next_repo_id: 100,
        }
    }

    fn find_repo(&self, owner: &str, repo: &str) -> Option<usize> {
        self.repos
            .iter()
            .position(|r| r.owner == owner && r.name == repo)
    }

    fn repo_args<'a>(&self, args: &'a ArgMap) -> Result<(&'a str, &'a str, usize), Value> {
        let owner = str_arg(args, "owner").unwrap_or_default();
        let repo = str_arg(args, "repo").unwrap_or_default();
        match self.find_repo(owner, repo) {
            Some(idx) => Ok((owner, repo, idx)),
            None => Err(err(format!("Repository {owner}/{repo} not found"))),
        }
    }

    fn project_lookup(&mut self, args: &ArgMap) -> Value {
        let query = str_arg(args, "query").unwrap_or_default().to_lowercase();
        let page = i64_arg(args, "page").unwrap_or(1).max(1) as usize;
        let per_page = i64_arg(args, "per_page").unwrap_or(10).max(1) as usize;
        let matches: Vec<Value> = self
            .repos
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&query)
                    || r.description.to_lowercase().contains(&query)
            })
            .map(|r| {
                json!({
                    "id": r.id,
                    "full_name": r.full_name(),
                    "description": r.description,
                    "private": r.private,
                })
            })
            .collect();
        let total = matches.len();
        let start = (page - 1) * per_page;
        let page_items: Vec<Value> = matches.into_iter().skip(start).take(per_page).collect();
        json!({ "total_count": total, "items": page_items })
    }

    fn ticket_submit(&mut self, args: &ArgMap) -> Value {
        let (_, _, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        let Some(title) = str_arg(args, "title") else {
            return err("title is required");
        };
        let body = str_arg(args, "body").unwrap_or_default();
        let number = self.repos[idx].issues.len() as i64 + 1;
        let issue = json!({
            "number": number,
            "title": title,
            "body": body,
            "state": "open",
            "labels": args.get("labels").cloned().unwrap_or_else(|| json!([])),
        });
        self.repos[idx].issues.push(issue.clone());
        json!({
            "number": number,
            "title": title,
            "state": "open",
            "html_url": format!("https://github.com/{}/issues/{}", self.repos[idx].full_name(), number),
        })
    }

    fn repo_duplicate(&mut self, args: &ArgMap) -> Value {
        let (_, repo_name, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        let fork_owner = str_arg(args, "organization")
            .unwrap_or("benchmark-user")
            .to_string();
        let source = self.repos[idx].clone();
        let fork = Repo {
            id: self.next_repo_id,
            owner: fork_owner,
            name: repo_name.to_string(),
            issues: Vec::new(),
            pulls: Vec::new(),
            ..source.clone()
        };
        self.next_repo_id += 1;
        let full_name = fork.full_name();
        self.repos.push(fork);
        json!({
            "id": self.next_repo_id - 1,
            "full_name": full_name,
            "forked_from": source.full_name(),
        })
    }

    fn changeset_propose(&mut self, args: &ArgMap) -> Value {
        let (_, _, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        let Some(title) = str_arg(args, "title") else {
            return err("title is required");
        };
        let Some(head) = str_arg(args, "head") else {
            return err("head branch is required");
        };
        let base = str_arg(args, "base")
            .unwrap_or(&self.repos[idx].default_branch)
            .to_string();
        if !self.repos[idx].branches.iter().any(|b| b == head) {
            return err(format!("Head branch {head} not found"));
        }
        if !self.repos[idx].branches.iter().any(|b| *b == base) {
            return err(format!("Base branch {base} not found"));
        }
        let number = self.repos[idx].pulls.len() as i64 + 1;
        let pull = json!({
            "number": number,
            "title": title,
            "head": head,
            "base": base,
            "state": "open",
        });
        self.repos[idx].pulls.push(pull);
        json!({
            "number": number,
            "title": title,
            "head": head,
            "base": base,
            "state": "open",
            "html_url": format!("https://github.com/{}/pull/{}", self.repos[idx].full_name(), number),
        })
    }

    fn ticket_enumerate(&mut self, args: &ArgMap) -> Value {
        let (_, _, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        let state = str_arg(args, "state").unwrap_or("open");
        let issues: Vec<Value> = self.repos[idx]
            .issues
            .iter()
            .filter(|i| state == "all" || i["state"] == state)
            .cloned()
            .collect();
        json!({ "total_count": issues.len(), "issues": issues })
    }

    fn ticket_fetch(&mut self, args: &ArgMap) -> Value {
        let (_, _, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        let Some(number) = i64_arg(args, "issue_number") else {
            return err("issue_number must be an integer");
        };
        match self.repos[idx]
            .issues
            .iter()
            .find(|i| i["number"] == number)
        {
            Some(issue) => issue.clone(),
            None => err(format!("Issue #{number} not found")),
        }
    }

    fn ref_create(&mut self, args: &ArgMap) -> Value {
        let (_, _, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        let Some(branch) = str_arg(args, "branch") else {
            return err("branch is required");
        };
        let source = str_arg(args, "from_branch")
            .unwrap_or(&self.repos[idx].default_branch)
            .to_string();
        if !self.repos[idx].branches.iter().any(|b| *b == source) {
            return err(format!("Source branch {source} not found"));
        }
        if self.repos[idx].branches.iter().any(|b| b == branch) {
            return err(format!("Branch {branch} already exists"));
        }
        self.repos[idx].branches.push(branch.to_string());
        json!({ "ref": format!("refs/heads/{branch}"), "from": source })
    }

    fn refs_enumerate(&mut self, args: &ArgMap) -> Value {
        let (_, _, idx) = match self.repo_args(args) {
            Ok(found) => found,
            Err(e) => return e,
        };
        json!({
            "branches": self.repos[idx].branches,
            "default_branch": self.repos[idx].default_branch,
        })
    }
}

impl Default for GitHubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for GitHubBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "gh_project_lookup",
                description: "Search for GitHub repositories by name or description. Returns items with full_name entries.",
                params: vec![
                    ParamDecl::required("query", ParamKind::String),
                    ParamDecl::optional("page", ParamKind::Integer),
                    ParamDecl::optional("per_page", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "gh_ticket_submit",
                description: "Create an issue on a GitHub repository. Use a full_name from a prior repository search for owner/repo.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                    ParamDecl::required("title", ParamKind::String),
                    ParamDecl::optional("body", ParamKind::String),
                    ParamDecl::optional("labels", ParamKind::Array),
                ],
            },
            ToolSpec {
                name: "gh_repo_duplicate",
                description: "Fork a GitHub repository to your account or an organization.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                    ParamDecl::optional("organization", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gh_changeset_propose",
                description: "Open a pull request on a GitHub repository from head branch into base.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                    ParamDecl::required("title", ParamKind::String),
                    ParamDecl::required("head", ParamKind::String),
                    ParamDecl::optional("base", ParamKind::String),
                    ParamDecl::optional("body", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gh_ticket_enumerate",
                description: "List issues of a GitHub repository, optionally filtered by state.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                    ParamDecl::optional("state", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gh_ticket_fetch",
                description: "Fetch a single issue of a GitHub repository by number.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                    ParamDecl::required("issue_number", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "gh_ref_create",
                description: "Create a branch on a GitHub repository from an existing branch.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                    ParamDecl::required("branch", ParamKind::String),
                    ParamDecl::optional("from_branch", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "gh_refs_enumerate",
                description: "List branches of a GitHub repository.",
                params: vec![
                    ParamDecl::required("owner", ParamKind::String),
                    ParamDecl::required("repo", ParamKind::String),
                ],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "gh_project_lookup" => self.project_lookup(args),
            "gh_ticket_submit" => self.ticket_submit(args),
            "gh_repo_duplicate" => self.repo_duplicate(args),
            "gh_changeset_propose" => self.changeset_propose(args),
            "gh_ticket_enumerate" => self.ticket_enumerate(args),
            "gh_ticket_fetch" => self.ticket_fetch(args),
            "gh_ref_create" => self.ref_create(args),
            "gh_refs_enumerate" => self.refs_enumerate(args),
            other => unknown_tool("GitHubBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }
}
