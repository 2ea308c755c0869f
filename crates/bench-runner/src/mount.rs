//! Server discovery and mounting. The agent sees only the catalog until it
//! mounts a server; mounting builds an explicit alias table over the
//! backend's declared tools (plus that server's decoys), and unmounting
//! clears every binding and invalidates transient handles everywhere.

use bench_backends::{
    Backend, BraveSearchBackend, DiscordBackend, ExaSearchBackend, FoodDeliveryBackend,
    GitHubBackend, GitLabBackend, GoogleMapsBackend, MapboxBackend, SlackBackend,
};
use bench_core::{sanitize_service_names, ArgMap, ParamDecl, ToolDecl};
use bench_registry::{
    decoy_tools_for_prefixes, exposed_alias, is_combined_server, server_descriptor,
    servers_for_category, Category, SERVER_CATALOG,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

const MOUNT_HINT: &str = "Use mcp_mount(server_id) to connect and see available tools.";
const UNMOUNT_HINT: &str = "Use mcp_list_servers() to see options, then mcp_mount(server_id).";

/// One exposed tool while a server is mounted.
#[derive(Debug, Clone)]
pub struct ToolBinding {
    pub real_name: String,
    pub server_id: String,
    pub description: String,
    pub params: Vec<ParamDecl>,
    pub decoy: bool,
}

pub struct MountManager {
    category: Category,
    backends: BTreeMap<String, Box<dyn Backend>>,
    mounted: Option<String>,
    bindings: BTreeMap<String, ToolBinding>,
    failed_servers: BTreeSet<String>,
}

fn make_backend(server_id: &str) -> Box<dyn Backend> {
    match server_id {
        "github_server" => Box::new(GitHubBackend::new()),
        "gitlab_server" => Box::new(GitLabBackend::new()),
        "slack_server" => Box::new(SlackBackend::new()),
        "discord_server" => Box::new(DiscordBackend::new()),
        "google_maps_server" => Box::new(GoogleMapsBackend::new()),
        "mapbox_server" => Box::new(MapboxBackend::new()),
        "brave_search_server" => Box::new(BraveSearchBackend::new()),
        "exa_search_server" => Box::new(ExaSearchBackend::new()),
        "food_delivery_server" => Box::new(FoodDeliveryBackend::new()),
        other => unreachable!("no backend for server id {other}"),
    }
}

impl MountManager {
    /// Fresh backends for every server of the category; nothing is exposed
    /// until the agent mounts one.
    pub fn new(category: Category) -> Self {
        let mut backends: BTreeMap<String, Box<dyn Backend>> = BTreeMap::new();
        for server_id in servers_for_category(category) {
            let mut backend = make_backend(server_id);
            backend.load_scenario(&json!({}));
            backends.insert(server_id.to_string(), backend);
        }
        Self {
            category,
            backends,
            mounted: None,
            bindings: BTreeMap::new(),
            failed_servers: BTreeSet::new(),
        }
    }

    pub fn mounted_server(&self) -> Option<&str> {
        self.mounted.as_deref()
    }

    pub fn mark_server_failed(&mut self, server_id: &str) {
        self.failed_servers.insert(server_id.to_string());
    }

    /// Server of the currently active scenario owning a tool prefix.
    pub fn server_for_prefix(&self, prefix: &str) -> Option<&'static str> {
        servers_for_category(self.category)
            .iter()
            .copied()
            .find(|id| {
                server_descriptor(id)
                    .map(|d| d.tool_prefixes.contains(&prefix))
                    .unwrap_or(false)
            })
    }

    /// Read-only catalog view; repeated calls never change mount or fault
    /// state.
    pub fn list_servers(&self) -> Value {
        let servers: Vec<Value> = SERVER_CATALOG
            .iter()
            .map(|descriptor| {
                json!({
                    "server_id": descriptor.id,
                    "name": descriptor.display_name,
                    "description": descriptor.brief,
                    "status": if self.failed_servers.contains(descriptor.id) {
                        "failed"
                    } else {
                        "available"
                    },
                })
            })
            .collect();
        json!({
            "available_servers": servers,
            "currently_mounted": self.mounted,
            "hint": MOUNT_HINT,
        })
    }

    pub fn mount(&mut self, server_id: &str) -> Value {
        let Some(descriptor) = server_descriptor(server_id) else {
            return json!({ "error": format!("Unknown server: {server_id}") });
        };
        if !self.backends.contains_key(server_id) {
            return json!({
                "error": format!(
                    "Server '{server_id}' exists but is not configured for this scenario \
                     ('{}').",
                    self.category.as_str()
                )
            });
        }
        if let Some(current) = &self.mounted {
            if !is_combined_server(current) {
                return json!({
                    "error": format!("Already mounted to '{current}'. Use mcp_unmount() first.")
                });
            }
        }

        self.mounted = Some(server_id.to_string());
        self.bindings.clear();

        let Some(backend) = self.backends.get(server_id) else {
            return json!({ "error": format!("Server '{server_id}' is not configured") });
        };

        // Real tools first, then that server's decoys; aliases collide into
        // `_alt2`, `_alt3`, ... suffixes deterministically.
        let mut alias_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut surface: Vec<(String, String, Vec<ParamDecl>, bool)> = backend
            .tools()
            .into_iter()
            .map(|spec| {
                (
                    spec.name.to_string(),
                    spec.description.to_string(),
                    spec.params,
                    false,
                )
            })
            .collect();
        for decoy in decoy_tools_for_prefixes(descriptor.tool_prefixes) {
            surface.push((decoy.name.to_string(), decoy.description.to_string(), Vec::new(), true));
        }

        let mut tool_list = Vec::new();
        for (real_name, description, params, decoy) in surface {
            let base_alias = exposed_alias(&real_name);
            let count = alias_counts.entry(base_alias.clone()).or_insert(0);
            *count += 1;
            let alias = if *count == 1 {
                base_alias
            } else {
                format!("{base_alias}_alt{count}")
            };
            let clean_description = sanitize_service_names(&description);
            let preview: String = clean_description.chars().take(80).collect();
            tool_list.push(json!({ "name": alias, "description": preview }));
            self.bindings.insert(
                alias,
                ToolBinding {
                    real_name,
                    server_id: server_id.to_string(),
                    description: clean_description,
                    params,
                    decoy,
                },
            );
        }

        json!({
            "status": "mounted",
            "server_id": server_id,
            "server_name": descriptor.display_name,
            "tools": tool_list,
            "tool_count": tool_list.len(),
        })
    }

    pub fn unmount(&mut self) -> Value {
        let Some(old) = self.mounted.take() else {
            return json!({ "error": "No server is mounted." });
        };
        self.bindings.clear();
        self.invalidate_all_handles();
        json!({
            "status": "unmounted",
            "previous_server": old,
            "hint": UNMOUNT_HINT,
        })
    }

    /// Bump handle epochs on every backend of the scenario. Stale
    /// identifiers must not survive a mount switch or an injected failure.
    pub fn invalidate_all_handles(&mut self) {
        for backend in self.backends.values_mut() {
            backend.invalidate_transient_handles();
        }
    }

    pub fn resolve(&self, alias: &str) -> Option<&ToolBinding> {
        self.bindings.get(alias)
    }

    pub fn bound_aliases(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    pub fn call_backend(&mut self, server_id: &str, real_name: &str, args: &ArgMap) -> Value {
        match self.backends.get_mut(server_id) {
            Some(backend) => backend.call(real_name, args),
            None => json!({ "error": format!("Server '{server_id}' is not configured") }),
        }
    }

    /// The full tool surface for the provider adapter: the three mount
    /// tools always, plus the bound tools while mounted.
    pub fn tool_decls(&self) -> Vec<ToolDecl> {
        let mut tools = vec![
            ToolDecl {
                name: "mcp_list_servers".to_string(),
                description: "List all available MCP servers in this category. Call this first to see what servers are available.".to_string(),
                params: vec![],
            },
            ToolDecl {
                name: "mcp_mount".to_string(),
                description: "Mount an MCP server to access its tools. You must mount a server before you can use its tools.".to_string(),
                params: vec![ParamDecl::required("server_id", bench_core::ParamKind::String)],
            },
            ToolDecl {
                name: "mcp_unmount".to_string(),
                description: "Unmount the current server. Use this before mounting a different server.".to_string(),
                params: vec![],
            },
        ];
        for (alias, binding) in &self.bindings {
            tools.push(ToolDecl {
                name: alias.clone(),
                description: binding.description.clone(),
                params: binding.params.clone(),
            });
        }
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_all_servers_regardless_of_category() {
        let mounts = MountManager::new(Category::Maps);
        let listing = mounts.list_servers();
        let servers = listing["available_servers"].as_array().expect("servers");
        assert_eq!(servers.len(), SERVER_CATALOG.len());
        assert_eq!(listing["currently_mounted"], Value::Null);
    }

    #[test]
    fn listing_is_read_only() {
        let mounts = MountManager::new(Category::Maps);
        let first = mounts.list_servers();
        let second = mounts.list_servers();
        assert_eq!(first, second);
        assert_eq!(mounts.mounted_server(), None);
    }

    #[test]
    fn mount_exposes_canonical_aliases() {
        let mut mounts = MountManager::new(Category::CodeHosting);
        let result = mounts.mount("github_server");
        assert_eq!(result["status"], "mounted");
        let binding = mounts.resolve("workspace_search").expect("canonical alias bound");
        assert_eq!(binding.real_name, "gh_project_lookup");
        assert_eq!(binding.server_id, "github_server");
        assert!(!binding.decoy);
        // Decoys ride along under hashed aliases.
        let decoy_alias = exposed_alias("gh_ticket_draft_save");
        assert!(mounts.resolve(&decoy_alias).expect("decoy bound").decoy);
    }

    #[test]
    fn mount_is_exclusive_for_paired_servers() {
        let mut mounts = MountManager::new(Category::CodeHosting);
        mounts.mount("github_server");
        let second = mounts.mount("gitlab_server");
        assert!(second["error"]
            .as_str()
            .expect("exclusivity error")
            .contains("Already mounted"));
        assert_eq!(mounts.mounted_server(), Some("github_server"));
    }

    #[test]
    fn mount_rejects_unknown_and_unconfigured_servers() {
        let mut mounts = MountManager::new(Category::Maps);
        let unknown = mounts.mount("telepathy_server");
        assert!(unknown["error"].as_str().expect("err").starts_with("Unknown server"));
        let unconfigured = mounts.mount("slack_server");
        assert!(unconfigured["error"]
            .as_str()
            .expect("err")
            .contains("not configured for this scenario"));
        assert_eq!(mounts.mounted_server(), None);
    }

    #[test]
    fn unmount_requires_a_mounted_server() {
        let mut mounts = MountManager::new(Category::WebSearch);
        assert!(mounts.unmount().get("error").is_some());
        mounts.mount("brave_search_server");
        let result = mounts.unmount();
        assert_eq!(result["status"], "unmounted");
        assert_eq!(result["previous_server"], "brave_search_server");
        assert!(mounts.resolve("knowledge_search").is_none());
    }

    #[test]
    fn descriptions_are_brand_sanitized() {
        let mut mounts = MountManager::new(Category::FoodDelivery);
        mounts.mount("food_delivery_server");
        let binding = mounts.resolve("vendor_discover").expect("bound");
        assert!(!binding.description.contains("UberEats"), "{}", binding.description);
        assert!(binding.description.contains("service"));
    }

    #[test]
    fn combined_server_exposes_both_prefixes() {
        let mut mounts = MountManager::new(Category::FoodDelivery);
        mounts.mount("food_delivery_server");
        assert!(mounts.resolve("session_auth").is_some());
        // Both ue_session_init and dd_auth_handshake map to session_auth;
        // the collision dedups with a suffix.
        assert!(mounts.resolve("session_auth_alt2").is_some());
    }

    #[test]
    fn tool_decls_always_include_mount_layer() {
        let mounts = MountManager::new(Category::TeamMessaging);
        let names: Vec<String> = mounts.tool_decls().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["mcp_list_servers", "mcp_mount", "mcp_unmount"]);
    }
}
