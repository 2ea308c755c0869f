//! Immutable benchmark configuration: the server catalog, fault groups,
//! exposed-alias tables, vague-error catalog, decoy tools, and per-scenario
//! success criteria. Loaded once; nothing here mutates at runtime.

use anyhow::{anyhow, Result};
use include_dir::{include_dir, Dir};
use serde_json::{json, Value};

mod decoys;
mod scenarios;

pub use decoys::{decoy_response, decoy_tools_for_prefixes, is_decoy_tool, DecoyTool};
pub use scenarios::{
    entity_rules_for, scenario, scenario_ids, ArgSelector, EntityRule, ScenarioSpec, SCENARIOS,
};

static SCENARIOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/../../scenarios");

/// Task categories; each maps to one pair of competing servers (food
/// delivery is the single combined server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    CodeHosting,
    TeamMessaging,
    Maps,
    WebSearch,
    FoodDelivery,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::CodeHosting => "code_hosting",
            Category::TeamMessaging => "team_messaging",
            Category::Maps => "maps",
            Category::WebSearch => "web_search",
            Category::FoodDelivery => "food_delivery",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "code_hosting" => Some(Category::CodeHosting),
            "team_messaging" => Some(Category::TeamMessaging),
            "maps" => Some(Category::Maps),
            "web_search" => Some(Category::WebSearch),
            "food_delivery" => Some(Category::FoodDelivery),
            _ => None,
        }
    }
}

/// Static catalog entry for one mountable server.
#[derive(Debug, Clone)]
pub struct ServerDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub brief: &'static str,
    /// Tool-name prefixes owned by this server (combined servers own more
    /// than one).
    pub tool_prefixes: &'static [&'static str],
    pub combined: bool,
}

pub const SERVER_CATALOG: &[ServerDescriptor] = &[
    ServerDescriptor {
        id: "github_server",
        display_name: "GitHub Server",
        brief: "GitHub code hosting and collaboration API endpoint",
        tool_prefixes: &["gh"],
        combined: false,
    },
    ServerDescriptor {
        id: "gitlab_server",
        display_name: "GitLab Server",
        brief: "GitLab project and merge workflow API endpoint",
        tool_prefixes: &["gl"],
        combined: false,
    },
    ServerDescriptor {
        id: "slack_server",
        display_name: "Slack Server",
        brief: "Slack workspace messaging API endpoint",
        tool_prefixes: &["slk"],
        combined: false,
    },
    ServerDescriptor {
        id: "discord_server",
        display_name: "Discord Server",
        brief: "Discord server messaging API endpoint",
        tool_prefixes: &["dsc"],
        combined: false,
    },
    ServerDescriptor {
        id: "google_maps_server",
        display_name: "Google Maps Server",
        brief: "Google Maps routing and geocoding API endpoint",
        tool_prefixes: &["gmap"],
        combined: false,
    },
    ServerDescriptor {
        id: "mapbox_server",
        display_name: "Mapbox Server",
        brief: "Mapbox geospatial search and routing API endpoint",
        tool_prefixes: &["mbx"],
        combined: false,
    },
    ServerDescriptor {
        id: "brave_search_server",
        display_name: "Brave Search Server",
        brief: "Brave web and local search API endpoint",
        tool_prefixes: &["brv"],
        combined: false,
    },
    ServerDescriptor {
        id: "exa_search_server",
        display_name: "Exa Search Server",
        brief: "Exa semantic research and code search API endpoint",
        tool_prefixes: &["exa"],
        combined: false,
    },
    ServerDescriptor {
        id: "food_delivery_server",
        display_name: "Food Delivery Server",
        brief: "Combined food ordering API endpoint",
        tool_prefixes: &["ue", "dd"],
        combined: true,
    },
];

pub fn server_descriptor(id: &str) -> Option<&'static ServerDescriptor> {
    SERVER_CATALOG.iter().find(|s| s.id == id)
}

pub fn is_combined_server(id: &str) -> bool {
    server_descriptor(id).map(|s| s.combined).unwrap_or(false)
}

pub fn servers_for_category(category: Category) -> &'static [&'static str] {
    match category {
        Category::CodeHosting => &["github_server", "gitlab_server"],
        Category::TeamMessaging => &["slack_server", "discord_server"],
        Category::Maps => &["google_maps_server", "mapbox_server"],
        Category::WebSearch => &["brave_search_server", "exa_search_server"],
        Category::FoodDelivery => &["food_delivery_server"],
    }
}

/// Paired alternative for fallback; `None` for combined servers.
pub fn alternative_server(id: &str) -> Option<&'static str> {
    match id {
        "github_server" => Some("gitlab_server"),
        "gitlab_server" => Some("github_server"),
        "slack_server" => Some("discord_server"),
        "discord_server" => Some("slack_server"),
        "google_maps_server" => Some("mapbox_server"),
        "mapbox_server" => Some("google_maps_server"),
        "brave_search_server" => Some("exa_search_server"),
        "exa_search_server" => Some("brave_search_server"),
        _ => None,
    }
}

/// Failable tools per category: the equivalence classes of "the same
/// capability on competing backends". First call to any member fails for
/// the rest of the run.
pub fn fault_group(category: Category) -> &'static [&'static str] {
    match category {
        Category::CodeHosting => &[
            "gh_ticket_submit",
            "gl_workitem_new",
            "gh_changeset_propose",
            "gl_diff_request",
            "gh_project_lookup",
            "gl_namespace_query",
            "gh_repo_duplicate",
            "gl_project_fork",
        ],
        Category::TeamMessaging => &[
            "slk_broadcast_text",
            "dsc_chat_post",
            "slk_emoji_attach",
            "dsc_emote_add",
            "slk_timeline_fetch",
            "dsc_log_retrieve",
        ],
        Category::Maps => &[
            "gmap_path_calculate",
            "mbx_route_compute",
            "gmap_coords_resolve",
            "mbx_location_encode",
            "gmap_poi_query",
            "mbx_feature_search",
        ],
        Category::WebSearch => &[
            "brv_index_query",
            "exa_corpus_search",
            "exa_codebase_query",
            "exa_org_intelligence",
        ],
        Category::FoodDelivery => &[
            "ue_transaction_submit",
            "dd_checkout_complete",
            "ue_fulfillment_track",
            "dd_delivery_status",
        ],
    }
}

/// Discovery tools whose success clears a pending stale-resolution flag.
pub const REFRESH_TOOLS: &[&str] = &[
    "dd_merchant_search",
    "ue_vendor_discover",
    "gh_project_lookup",
    "gl_namespace_query",
    "slk_timeline_fetch",
    "dsc_log_retrieve",
    "gmap_coords_resolve",
    "mbx_location_encode",
    "gmap_poi_query",
    "mbx_feature_search",
    "brv_index_query",
    "exa_corpus_search",
    "exa_codebase_query",
    "exa_org_intelligence",
];

pub fn is_refresh_tool(name: &str) -> bool {
    REFRESH_TOOLS.contains(&name)
}

/// Vague synthetic errors. Deliberately worded so that "switch providers"
/// is not the obvious remedy; the evaluation depends on that.
#[derive(Debug, Clone)]
pub struct VagueError {
    pub code: &'static str,
    pub message: &'static str,
    pub retry_after: Option<&'static str>,
}

pub const VAGUE_ERRORS: &[VagueError] = &[
    VagueError { code: "E_UPSTREAM_TIMEOUT", message: "Request timed out after 30000ms. The upstream service did not respond in time.", retry_after: None },
    VagueError { code: "E_RESOURCE_EXHAUSTED", message: "Resource quota exceeded. Daily limit reached for this endpoint.", retry_after: Some("86400s") },
    VagueError { code: "E_MAINTENANCE_WINDOW", message: "Service temporarily unavailable due to scheduled maintenance.", retry_after: Some("3600s") },
    VagueError { code: "E_REGION_UNAVAILABLE", message: "This service is not available in your region. Geographic restrictions apply.", retry_after: None },
    VagueError { code: "E_DEPRECATED_ENDPOINT", message: "This endpoint has been deprecated. Please consult documentation for alternatives.", retry_after: None },
    VagueError { code: "E_RATE_LIMITED", message: "Too many requests. Please reduce request frequency.", retry_after: Some("60s") },
    VagueError { code: "E_INTERNAL_ERROR", message: "An unexpected error occurred. Our team has been notified.", retry_after: None },
    VagueError { code: "E_SERVICE_DEGRADED", message: "Service is experiencing degraded performance. Some features may be unavailable.", retry_after: None },
    VagueError { code: "E_CAPACITY_EXCEEDED", message: "Server capacity exceeded. Request queued for later processing.", retry_after: Some("300s") },
    VagueError { code: "E_DEPENDENCY_FAILED", message: "A downstream dependency failed to respond. Please try again later.", retry_after: None },
];

/// Synthesize one vague error payload, selected deterministically from the
/// catalog by digesting the seed.
pub fn vague_error_payload(seed: &str) -> Value {
    let entry = &VAGUE_ERRORS[bench_core::stable_choice_index(seed, VAGUE_ERRORS.len())];
    json!({
        "error": {
            "code": entry.code,
            "message": entry.message,
            "retry_after": entry.retry_after,
        }
    })
}

/// Canonical exposed alias for a backend tool, shared across competing
/// services so the agent cannot pattern-match backend-specific names.
pub fn canonical_alias(real_name: &str) -> Option<&'static str> {
    let alias = match real_name {
        "gh_ticket_submit" | "gl_workitem_new" => "record_create",
        "gh_changeset_propose" | "gl_diff_request" => "change_request_create",
        "gh_project_lookup" | "gl_namespace_query" => "workspace_search",
        "gh_repo_duplicate" | "gl_project_fork" => "workspace_clone",
        "slk_broadcast_text" | "dsc_chat_post" => "message_publish",
        "slk_emoji_attach" | "dsc_emote_add" => "reaction_apply",
        "slk_timeline_fetch" | "dsc_log_retrieve" => "message_history_read",
        "gmap_path_calculate" | "mbx_route_compute" => "route_plan",
        "gmap_coords_resolve" | "mbx_location_encode" => "location_resolve",
        "gmap_poi_query" | "mbx_feature_search" => "places_discover",
        "brv_index_query" | "exa_corpus_search" => "knowledge_search",
        "exa_codebase_query" => "code_search",
        "exa_org_intelligence" => "organization_research",
        "dd_checkout_complete" | "ue_transaction_submit" => "order_commit",
        "dd_delivery_status" | "ue_fulfillment_track" => "delivery_status_check",
        "dd_merchant_search" | "ue_vendor_discover" => "vendor_discover",
        "dd_offerings_list" | "ue_catalog_fetch" => "catalog_fetch",
        "dd_auth_handshake" | "ue_session_init" => "session_auth",
        _ => return None,
    };
    Some(alias)
}

/// Exposed alias for a real tool: canonical when registered, otherwise the
/// prefix-stripped name disambiguated by a short digest.
pub fn exposed_alias(real_name: &str) -> String {
    if let Some(alias) = canonical_alias(real_name) {
        return alias.to_string();
    }
    let no_prefix = real_name
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(real_name);
    let digest = bench_core::sha256_hex(real_name.as_bytes());
    format!("{}_{}", no_prefix, &digest[..6])
}

/// Leading prefix of a tool name (`gh_ticket_submit` -> `gh`).
pub fn tool_prefix(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// Built-in scenario prompts, embedded from the repo's `scenarios/` dir.
pub fn builtin_prompts() -> Result<Value> {
    let file = SCENARIOS_DIR
        .get_file("prompts.json")
        .ok_or_else(|| anyhow!("embedded prompts.json missing"))?;
    let data = std::str::from_utf8(file.contents())?;
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_pairs_are_symmetric() {
        for server in SERVER_CATALOG {
            match alternative_server(server.id) {
                Some(alt) => {
                    assert_eq!(alternative_server(alt), Some(server.id));
                    assert!(!server.combined);
                }
                None => assert!(server.combined, "{} should be combined", server.id),
            }
        }
    }

    #[test]
    fn every_category_has_configured_servers() {
        for category in [
            Category::CodeHosting,
            Category::TeamMessaging,
            Category::Maps,
            Category::WebSearch,
            Category::FoodDelivery,
        ] {
            let servers = servers_for_category(category);
            assert!(!servers.is_empty());
            for id in servers {
                assert!(server_descriptor(id).is_some(), "unknown server {id}");
            }
        }
    }

    #[test]
    fn fault_groups_span_both_backends() {
        let group = fault_group(Category::CodeHosting);
        assert!(group.iter().any(|t| t.starts_with("gh_")));
        assert!(group.iter().any(|t| t.starts_with("gl_")));
    }

    #[test]
    fn vague_error_payload_comes_from_catalog() {
        let payload = vague_error_payload("gh_ticket_submit:1");
        let code = payload["error"]["code"].as_str().expect("code");
        assert!(VAGUE_ERRORS.iter().any(|e| e.code == code));
        // Deterministic for the same seed.
        assert_eq!(payload, vague_error_payload("gh_ticket_submit:1"));
    }

    #[test]
    fn exposed_alias_prefers_canonical_names() {
        assert_eq!(exposed_alias("gh_ticket_submit"), "record_create");
        assert_eq!(exposed_alias("gl_workitem_new"), "record_create");
        let hashed = exposed_alias("gh_ticket_enumerate");
        assert!(hashed.starts_with("ticket_enumerate_"), "{hashed}");
        assert_eq!(hashed.len(), "ticket_enumerate_".len() + 6);
        assert_eq!(hashed, exposed_alias("gh_ticket_enumerate"));
    }

    #[test]
    fn builtin_prompts_cover_all_scenarios() {
        let prompts = builtin_prompts().expect("embedded prompts");
        for id in scenario_ids() {
            let entry = prompts.get(id).unwrap_or_else(|| panic!("no prompts for {id}"));
            assert!(entry.get("easy").is_some(), "{id} missing easy prompt");
        }
    }
}
