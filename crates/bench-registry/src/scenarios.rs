//! Per-scenario configuration: the success-indicating (tool, result key)
//! pairs, workflow prerequisites, and the declarative entity-reference
//! rules behind argument-continuity checking.

use crate::Category;

/// One benchmark scenario within a category.
#[derive(Debug, Clone)]
pub struct ScenarioSpec {
    pub id: &'static str,
    pub category: Category,
    /// A call to `tool` whose result carries a usable `key` completes the
    /// task (subject to the acceptance gate).
    pub success_criteria: &'static [(&'static str, &'static str)],
    /// Per terminal tool: groups of alternatives, each group needing at
    /// least one prior successful call.
    pub prerequisites: &'static [(&'static str, &'static [&'static [&'static str]])],
}

pub const SCENARIOS: &[ScenarioSpec] = &[
    ScenarioSpec {
        id: "food_delivery_order",
        category: Category::FoodDelivery,
        success_criteria: &[
            ("ue_transaction_submit", "order_id"),
            ("dd_checkout_complete", "confirmation_number"),
        ],
        prerequisites: &[
            (
                "dd_checkout_complete",
                &[&["dd_auth_handshake"], &["dd_merchant_search"], &["dd_offerings_list"]],
            ),
            (
                "ue_transaction_submit",
                &[&["ue_session_init"], &["ue_vendor_discover"], &["ue_catalog_fetch"]],
            ),
        ],
    },
    ScenarioSpec {
        id: "food_delivery_status",
        category: Category::FoodDelivery,
        success_criteria: &[
            ("ue_fulfillment_track", "status"),
            ("dd_delivery_status", "order_status"),
        ],
        prerequisites: &[
            ("dd_delivery_status", &[&["dd_auth_handshake"]]),
            ("ue_fulfillment_track", &[&["ue_session_init"]]),
        ],
    },
    ScenarioSpec {
        id: "code_hosting_create_issue",
        category: Category::CodeHosting,
        success_criteria: &[
            ("gh_ticket_submit", "number"),
            ("gl_workitem_new", "iid"),
        ],
        prerequisites: &[
            ("gh_ticket_submit", &[&["gh_project_lookup"]]),
            ("gl_workitem_new", &[&["gl_namespace_query"]]),
        ],
    },
    ScenarioSpec {
        id: "code_hosting_fork_repo",
        category: Category::CodeHosting,
        success_criteria: &[
            ("gh_repo_duplicate", "full_name"),
            ("gl_project_fork", "id"),
        ],
        prerequisites: &[
            ("gh_repo_duplicate", &[&["gh_project_lookup"]]),
            ("gl_project_fork", &[&["gl_namespace_query"]]),
        ],
    },
    ScenarioSpec {
        id: "code_hosting_create_pr",
        category: Category::CodeHosting,
        success_criteria: &[
            ("gh_changeset_propose", "number"),
            ("gl_diff_request", "iid"),
        ],
        prerequisites: &[
            ("gh_changeset_propose", &[&["gh_project_lookup"]]),
            ("gl_diff_request", &[&["gl_namespace_query"]]),
        ],
    },
    ScenarioSpec {
        id: "code_hosting_search_repos",
        category: Category::CodeHosting,
        success_criteria: &[
            ("gh_project_lookup", "total_count"),
            ("gl_namespace_query", "total_count"),
        ],
        prerequisites: &[],
    },
    ScenarioSpec {
        id: "web_search_general",
        category: Category::WebSearch,
        success_criteria: &[
            ("brv_index_query", "results"),
            ("exa_corpus_search", "results"),
        ],
        prerequisites: &[],
    },
    ScenarioSpec {
        id: "web_search_code",
        category: Category::WebSearch,
        success_criteria: &[
            ("brv_index_query", "results"),
            ("exa_codebase_query", "results"),
        ],
        prerequisites: &[],
    },
    ScenarioSpec {
        id: "web_search_company",
        category: Category::WebSearch,
        success_criteria: &[
            ("brv_index_query", "results"),
            ("exa_org_intelligence", "found"),
        ],
        prerequisites: &[],
    },
    ScenarioSpec {
        id: "team_messaging_send",
        category: Category::TeamMessaging,
        success_criteria: &[
            ("slk_broadcast_text", "ts"),
            ("dsc_chat_post", "message"),
        ],
        prerequisites: &[
            ("slk_broadcast_text", &[&["slk_rooms_enumerate", "slk_timeline_fetch"]]),
            ("dsc_chat_post", &[&["dsc_rooms_scan", "dsc_log_retrieve"]]),
        ],
    },
    ScenarioSpec {
        id: "team_messaging_react",
        category: Category::TeamMessaging,
        success_criteria: &[
            ("slk_emoji_attach", "ok"),
            ("dsc_emote_add", "success"),
        ],
        prerequisites: &[
            ("slk_emoji_attach", &[&["slk_timeline_fetch"]]),
            ("dsc_emote_add", &[&["dsc_log_retrieve"]]),
        ],
    },
    ScenarioSpec {
        id: "team_messaging_history",
        category: Category::TeamMessaging,
        success_criteria: &[
            ("slk_timeline_fetch", "messages"),
            ("dsc_log_retrieve", "messages"),
        ],
        prerequisites: &[
            ("slk_timeline_fetch", &[&["slk_rooms_enumerate"]]),
            ("dsc_log_retrieve", &[&["dsc_rooms_scan"]]),
        ],
    },
    ScenarioSpec {
        id: "maps_directions",
        category: Category::Maps,
        success_criteria: &[
            ("gmap_path_calculate", "routes"),
            ("mbx_route_compute", "routes"),
        ],
        prerequisites: &[
            ("gmap_path_calculate", &[&["gmap_coords_resolve", "gmap_poi_query"]]),
            ("mbx_route_compute", &[&["mbx_location_encode", "mbx_feature_search"]]),
        ],
    },
    ScenarioSpec {
        id: "maps_geocode",
        category: Category::Maps,
        success_criteria: &[
            ("gmap_coords_resolve", "results"),
            ("mbx_location_encode", "features"),
        ],
        prerequisites: &[],
    },
    ScenarioSpec {
        id: "maps_places",
        category: Category::Maps,
        success_criteria: &[
            ("gmap_poi_query", "results"),
            ("mbx_feature_search", "features"),
        ],
        prerequisites: &[
            ("gmap_poi_query", &[&["gmap_coords_resolve"]]),
            ("mbx_feature_search", &[&["mbx_location_encode"]]),
        ],
    },
];

pub fn scenario(id: &str) -> Option<&'static ScenarioSpec> {
    SCENARIOS.iter().find(|s| s.id == id)
}

pub fn scenario_ids() -> Vec<&'static str> {
    SCENARIOS.iter().map(|s| s.id).collect()
}

/// How a terminal call's argument names the entity being referenced.
#[derive(Debug, Clone, Copy)]
pub enum ArgSelector {
    /// A single argument field.
    Scalar(&'static str),
    /// Every element of a list argument; `key` digs into object elements.
    Each {
        field: &'static str,
        key: Option<&'static str>,
    },
    /// `owner` and `repo` joined as `owner/repo`.
    OwnerRepo,
}

/// Declarative continuity rule: the selected argument value(s) must appear
/// in the MOST RECENT successful `discovery_tool` result, under
/// `collection[*][key]` for any key in `keys`.
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub terminal_tool: &'static str,
    pub selector: ArgSelector,
    pub discovery_tool: &'static str,
    pub collection: &'static str,
    pub keys: &'static [&'static str],
}

pub const ENTITY_RULES: &[EntityRule] = &[
    EntityRule {
        terminal_tool: "dd_checkout_complete",
        selector: ArgSelector::Scalar("restaurant_id"),
        discovery_tool: "dd_merchant_search",
        collection: "available_restaurants",
        keys: &["restaurant_id"],
    },
    EntityRule {
        terminal_tool: "dd_checkout_complete",
        selector: ArgSelector::Each { field: "items", key: Some("item_id") },
        discovery_tool: "dd_offerings_list",
        collection: "menu_items",
        keys: &["id"],
    },
    EntityRule {
        terminal_tool: "ue_transaction_submit",
        selector: ArgSelector::Scalar("restaurant_id"),
        discovery_tool: "ue_vendor_discover",
        collection: "restaurants",
        keys: &["id"],
    },
    EntityRule {
        terminal_tool: "ue_transaction_submit",
        selector: ArgSelector::Each { field: "item_ids", key: None },
        discovery_tool: "ue_catalog_fetch",
        collection: "menu",
        keys: &["item_id"],
    },
    EntityRule {
        terminal_tool: "gh_ticket_submit",
        selector: ArgSelector::OwnerRepo,
        discovery_tool: "gh_project_lookup",
        collection: "items",
        keys: &["full_name"],
    },
    EntityRule {
        terminal_tool: "gh_repo_duplicate",
        selector: ArgSelector::OwnerRepo,
        discovery_tool: "gh_project_lookup",
        collection: "items",
        keys: &["full_name"],
    },
    EntityRule {
        terminal_tool: "gh_changeset_propose",
        selector: ArgSelector::OwnerRepo,
        discovery_tool: "gh_project_lookup",
        collection: "items",
        keys: &["full_name"],
    },
    EntityRule {
        terminal_tool: "gl_workitem_new",
        selector: ArgSelector::Scalar("project_id"),
        discovery_tool: "gl_namespace_query",
        collection: "items",
        keys: &["id", "path_with_namespace"],
    },
    EntityRule {
        terminal_tool: "gl_project_fork",
        selector: ArgSelector::Scalar("project_id"),
        discovery_tool: "gl_namespace_query",
        collection: "items",
        keys: &["id", "path_with_namespace"],
    },
    EntityRule {
        terminal_tool: "gl_diff_request",
        selector: ArgSelector::Scalar("project_id"),
        discovery_tool: "gl_namespace_query",
        collection: "items",
        keys: &["id", "path_with_namespace"],
    },
    EntityRule {
        terminal_tool: "slk_emoji_attach",
        selector: ArgSelector::Scalar("timestamp"),
        discovery_tool: "slk_timeline_fetch",
        collection: "messages",
        keys: &["reaction_handle"],
    },
    EntityRule {
        terminal_tool: "dsc_emote_add",
        selector: ArgSelector::Scalar("message_id"),
        discovery_tool: "dsc_log_retrieve",
        collection: "messages",
        keys: &["reaction_handle"],
    },
];

pub fn entity_rules_for(terminal_tool: &str) -> Vec<&'static EntityRule> {
    ENTITY_RULES
        .iter()
        .filter(|r| r.terminal_tool == terminal_tool)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_reference_their_own_category_tools() {
        for spec in SCENARIOS {
            assert!(!spec.success_criteria.is_empty(), "{} has no criteria", spec.id);
            let group = crate::fault_group(spec.category);
            // At least one success-indicating tool per scenario is a
            // fault-group member, otherwise the fallback test is vacuous.
            assert!(
                spec.success_criteria.iter().any(|(tool, _)| group.contains(tool)),
                "{} never exercises its fault group",
                spec.id
            );
        }
    }

    #[test]
    fn terminal_tools_with_rules_exist_in_some_scenario() {
        for rule in ENTITY_RULES {
            let known = SCENARIOS.iter().any(|s| {
                s.success_criteria.iter().any(|(t, _)| *t == rule.terminal_tool)
            });
            assert!(known, "{} not a terminal tool anywhere", rule.terminal_tool);
        }
    }

    #[test]
    fn continuity_pairs_match_the_checked_set() {
        // The set of (terminal, discovery) pairs the validator enforces.
        let pairs: Vec<(&str, &str)> = ENTITY_RULES
            .iter()
            .map(|r| (r.terminal_tool, r.discovery_tool))
            .collect();
        for expected in [
            ("dd_checkout_complete", "dd_merchant_search"),
            ("dd_checkout_complete", "dd_offerings_list"),
            ("ue_transaction_submit", "ue_vendor_discover"),
            ("ue_transaction_submit", "ue_catalog_fetch"),
            ("gh_ticket_submit", "gh_project_lookup"),
            ("gl_workitem_new", "gl_namespace_query"),
            ("slk_emoji_attach", "slk_timeline_fetch"),
            ("dsc_emote_add", "dsc_log_retrieve"),
        ] {
            assert!(pairs.contains(&expected), "missing {expected:?}");
        }
    }
}
