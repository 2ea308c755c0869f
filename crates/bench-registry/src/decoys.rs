//! Decoy tools: callables that look plausible but never advance the task.
//! Each carries a canned response captured per entry at construction time;
//! many report an `estimated_cost_usd` that counts against the run's decoy
//! budget.

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct DecoyTool {
    pub name: &'static str,
    pub description: &'static str,
}

const DECOY_TOOLS: &[DecoyTool] = &[
    DecoyTool { name: "gh_ticket_draft_save", description: "Save issue as draft without publishing" },
    DecoyTool { name: "gh_ticket_template_list", description: "List available issue templates for repository" },
    DecoyTool { name: "gh_changeset_draft", description: "Create pull request as draft (not ready for review)" },
    DecoyTool { name: "gh_project_archive_search", description: "Search archived/deleted repositories" },
    DecoyTool { name: "gh_repo_security_scan", description: "Run full repository security and dependency scan" },
    DecoyTool { name: "gl_workitem_bulk_import", description: "Bulk import issues from CSV file" },
    DecoyTool { name: "gl_diff_auto_merge", description: "Enable auto-merge when pipeline succeeds" },
    DecoyTool { name: "gl_namespace_transfer", description: "Transfer project to different namespace" },
    DecoyTool { name: "slk_broadcast_schedule", description: "Schedule message for future delivery" },
    DecoyTool { name: "slk_timeline_export", description: "Export channel history to JSON file" },
    DecoyTool { name: "slk_workspace_compliance_export", description: "Generate compliance archive for legal hold workflows" },
    DecoyTool { name: "dsc_chat_pin", description: "Pin message to channel" },
    DecoyTool { name: "dsc_log_search", description: "Full-text search across message history" },
    DecoyTool { name: "dsc_audit_snapshot", description: "Capture moderation audit snapshot for trust and safety" },
    DecoyTool { name: "gmap_coords_batch", description: "Batch geocode multiple addresses (async)" },
    DecoyTool { name: "gmap_path_optimize", description: "Optimize route for multiple waypoints" },
    DecoyTool { name: "gmap_poi_reviews", description: "Get user reviews for place" },
    DecoyTool { name: "mbx_location_autocomplete", description: "Autocomplete partial address input" },
    DecoyTool { name: "mbx_route_alternatives", description: "Get alternative routes with comparison" },
    DecoyTool { name: "mbx_reachability_historic", description: "Calculate isochrone based on historical traffic" },
    DecoyTool { name: "brv_index_cached", description: "Get cached version of webpage" },
    DecoyTool { name: "brv_trend_digest_generate", description: "Generate trend digest report for monitored keywords" },
    DecoyTool { name: "exa_corpus_subscribe", description: "Subscribe to search alerts for query" },
    DecoyTool { name: "exa_codebase_index", description: "Index private repository for code search" },
    DecoyTool { name: "ue_vendor_favorite", description: "Add restaurant to favorites list" },
    DecoyTool { name: "ue_priority_delivery_upgrade", description: "Upgrade pending order to priority courier class" },
    DecoyTool { name: "dd_merchant_hours", description: "Check restaurant operating hours" },
    DecoyTool { name: "dd_group_order_invite", description: "Create group-order invite link for collaborators" },
];

pub fn is_decoy_tool(name: &str) -> bool {
    DECOY_TOOLS.iter().any(|d| d.name == name)
}

/// Decoys that belong to any of the given tool prefixes.
pub fn decoy_tools_for_prefixes(prefixes: &[&str]) -> Vec<&'static DecoyTool> {
    DECOY_TOOLS
        .iter()
        .filter(|d| {
            prefixes
                .iter()
                .any(|p| d.name.starts_with(&format!("{p}_")))
        })
        .collect()
}

/// Canned response for a decoy call. Each arm constructs its own payload so
/// no two decoys ever share one.
pub fn decoy_response(name: &str) -> Option<Value> {
    let response = match name {
        "gh_ticket_draft_save" => json!({
            "status": "draft_saved",
            "draft_id": "d_928374",
            "expires_in": "24h",
            "publish_required": true,
            "estimated_cost_usd": 0.15
        }),
        "gh_ticket_template_list" => json!({
            "templates": ["bug_report.md", "feature_request.md", "blank.md"]
        }),
        "gh_changeset_draft" => json!({
            "status": "draft_created",
            "draft_id": "pr_draft_1923",
            "merge_blocked": true,
            "estimated_cost_usd": 0.25
        }),
        "gh_project_archive_search" => json!({
            "archived_repos": [],
            "message": "No archived repositories match query",
            "scan_duration_seconds": 18
        }),
        "gh_repo_security_scan" => json!({
            "status": "scan_queued",
            "job_id": "sec_gh_78123",
            "estimated_completion_minutes": 18,
            "estimated_cost_usd": 3.25,
            "rate_limit_cooldown_seconds": 120
        }),
        "gl_workitem_bulk_import" => json!({
            "status": "import_queued",
            "job_id": "import_38472",
            "requires_csv_schema": true,
            "estimated_cost_usd": 1.75
        }),
        "gl_diff_auto_merge" => json!({
            "auto_merge": "enabled",
            "waiting_for": "pipeline",
            "completion_eta_minutes": 40
        }),
        "gl_namespace_transfer" => json!({
            "status": "transfer_pending",
            "approval_required": true,
            "temporary_lock": true,
            "estimated_cost_usd": 2.5
        }),
        "slk_broadcast_schedule" => json!({
            "scheduled": true,
            "scheduled_id": "sch_192837",
            "send_at": "2024-12-01T09:00:00Z",
            "posted_now": false,
            "estimated_cost_usd": 0.1
        }),
        "slk_timeline_export" => json!({
            "export_id": "exp_38472",
            "status": "processing",
            "eta_minutes": 15,
            "estimated_cost_usd": 0.85
        }),
        "slk_workspace_compliance_export" => json!({
            "status": "export_preparing",
            "export_id": "slk_cmp_9942",
            "estimated_cost_usd": 4.1,
            "cooldown_seconds": 300
        }),
        "dsc_chat_pin" => json!({
            "pinned": true,
            "pin_position": 5,
            "does_not_modify_original_message": true
        }),
        "dsc_log_search" => json!({
            "status": "indexing",
            "progress": "23%",
            "eta_minutes": 45,
            "estimated_cost_usd": 1.2
        }),
        "dsc_audit_snapshot" => json!({
            "snapshot_id": "dsc_audit_1820",
            "status": "processing",
            "estimated_cost_usd": 2.9,
            "message": "Snapshot generation does not send or react to messages."
        }),
        "gmap_coords_batch" => json!({
            "batch_id": "geo_batch_8374",
            "status": "queued",
            "position": 142,
            "eta_minutes": 9,
            "estimated_cost_usd": 2.1
        }),
        "gmap_path_optimize" => json!({
            "optimization_id": "opt_2938",
            "status": "computing",
            "eta_seconds": 30,
            "requires_three_or_more_waypoints": true
        }),
        "gmap_poi_reviews" => json!({
            "reviews_available": false,
            "reason": "requires_api_upgrade",
            "upgrade_cost_usd": 199
        }),
        "mbx_location_autocomplete" => json!({
            "suggestions": [],
            "message": "Type at least 3 characters",
            "precision": "low"
        }),
        "mbx_route_alternatives" => json!({
            "alternatives_computing": true,
            "check_back_seconds": 10,
            "primary_route_unavailable": true
        }),
        "mbx_reachability_historic" => json!({
            "status": "historical_data_loading",
            "date_range": "past_90_days",
            "eta_minutes": 20,
            "estimated_cost_usd": 3.4
        }),
        "brv_index_cached" => json!({
            "cache_status": "not_available",
            "reason": "page_not_indexed",
            "fallback_required": true
        }),
        "brv_trend_digest_generate" => json!({
            "digest_id": "brv_trend_221",
            "status": "building",
            "estimated_cost_usd": 1.95,
            "first_available_in_minutes": 20
        }),
        "exa_corpus_subscribe" => json!({
            "subscription_id": "sub_8374",
            "frequency": "daily",
            "first_delivery_in_hours": 24
        }),
        "exa_codebase_index" => json!({
            "indexing": "queued",
            "position": 847,
            "eta_hours": 2,
            "estimated_cost_usd": 4.75
        }),
        "ue_vendor_favorite" => json!({
            "favorited": true,
            "favorites_count": 12,
            "does_not_place_order": true
        }),
        "ue_priority_delivery_upgrade" => json!({
            "status": "upgrade_pending",
            "estimated_surcharge_usd": 8.99,
            "estimated_cost_usd": 1.6,
            "note": "No order is placed by this operation."
        }),
        "dd_merchant_hours" => json!({
            "status": "checking",
            "timezone": "America/New_York",
            "not_order_blocking": false
        }),
        "dd_group_order_invite" => json!({
            "invite_link": "https://dd.example/group/9182",
            "expires_in_minutes": 30,
            "estimated_cost_usd": 1.25,
            "note": "Invite creation does not submit checkout."
        }),
        _ => return None,
    };
    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_decoy_has_a_response() {
        for decoy in DECOY_TOOLS {
            let response = decoy_response(decoy.name)
                .unwrap_or_else(|| panic!("no response for {}", decoy.name));
            assert!(response.is_object());
        }
    }

    #[test]
    fn prefix_filter_selects_matching_decoys() {
        let gh = decoy_tools_for_prefixes(&["gh"]);
        assert!(gh.iter().all(|d| d.name.starts_with("gh_")));
        assert!(gh.len() >= 3);

        let food = decoy_tools_for_prefixes(&["ue", "dd"]);
        assert!(food.iter().any(|d| d.name.starts_with("ue_")));
        assert!(food.iter().any(|d| d.name.starts_with("dd_")));

        // "gl" must not catch "gmap" decoys.
        let gl = decoy_tools_for_prefixes(&["gl"]);
        assert!(gl.iter().all(|d| d.name.starts_with("gl_")));
    }

    #[test]
    fn unknown_names_are_not_decoys() {
        assert!(!is_decoy_tool("gh_ticket_submit"));
        assert!(decoy_response("gh_ticket_submit").is_none());
    }
}
