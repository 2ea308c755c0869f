//! Discord mock (`dsc_` tools). Mirrors the messaging surface with
//! different field names than the Slack mock; message logs issue
//! epoch-tagged reaction handles.

use std::collections::BTreeMap;

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{str_arg, unknown_tool, usize_arg_or, Backend, ToolSpec};

#[derive(Debug, Clone)]
struct Message {
    id: String,
    author_id: String,
    content: String,
    timestamp: String,
    reactions: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Channel {
    id: &'static str,
    name: &'static str,
    category: &'static str,
}

pub struct DiscordBackend {
    channels: Vec<Channel>,
    messages: BTreeMap<String, Vec<Message>>,
    next_message_id: i64,
    handle_epoch: i64,
}

impl DiscordBackend {
    pub fn new() -> Self {
        let channels = vec![
            Channel { id: "100001", name: "general", category: "Text Channels" },
            Channel { id: "100002", name: "engineering", category: "Text Channels" },
            Channel { id: "100003", name: "off-topic", category: "Text Channels" },
        ];
        let mut messages = BTreeMap::new();
        messages.insert(
            "100001".to_string(),
            vec![
                Message {
                    id: "m_101".to_string(),
                    author_id: "u_31".to_string(),
                    content: "Standup moved to 10:30 today".to_string(),
                    timestamp: "2026-08-06T09:00:00Z".to_string(),
                    reactions: Vec::new(),
                },
                Message {
                    id: "m_102".to_string(),
                    author_id: "u_47".to_string(),
                    content: "New build is on staging".to_string(),
                    timestamp: "2026-08-06T11:20:00Z".to_string(),
                    reactions: Vec::new(),
                },
            ],
        );
        messages.insert(
            "100002".to_string(),
            vec![Message {
                id: "m_103".to_string(),
                author_id: "u_12".to_string(),
                content: "Flaky test quarantined, tracking in #249".to_string(),
                timestamp: "2026-08-06T12:05:00Z".to_string(),
                reactions: Vec::new(),
            }],
        );
        Self {
            channels,
            messages,
            next_message_id: 104,
            handle_epoch: 0,
        }
    }

    fn resolve_channel(&self, reference: &str) -> Option<&'static str> {
        self.channels
            .iter()
            .find(|c| c.id == reference || c.name == reference)
            .map(|c| c.id)
    }

    fn next_message_id(&mut self) -> String {
        let id = self.next_message_id;
        self.next_message_id += 1;
        format!("m_{id}")
    }

    fn reaction_handle(&self, message_id: &str) -> String {
        format!("dh_{}_{}", self.handle_epoch, message_id)
    }

    fn resolve_message_id(&self, raw: &str) -> Result<String, Value> {
        if let Some(rest) = raw.strip_prefix("dh_") {
            let (epoch, id) = rest
                .split_once('_')
                .ok_or_else(|| json!({"error": format!("Malformed reaction handle '{raw}'")}))?;
            if epoch != self.handle_epoch.to_string() {
                return Err(json!({
                    "error": "Reaction handle is stale. Re-read the message log before reacting."
                }));
            }
            return Ok(id.to_string());
        }
        Ok(raw.to_string())
    }

    fn rooms_scan(&mut self) -> Value {
        let channels: Vec<Value> = self
            .channels
            .iter()
            .map(|c| json!({ "id": c.id, "name": c.name, "category": c.category }))
            .collect();
        json!({ "success": true, "channels": channels })
    }

    fn chat_post(&mut self, args: &ArgMap) -> Value {
        let reference = str_arg(args, "channel_id").unwrap_or_default();
        let Some(channel_id) = self.resolve_channel(reference) else {
            return json!({ "success": false, "error": format!("Channel '{reference}' not found") });
        };
        let Some(content) = str_arg(args, "content") else {
            return json!({ "success": false, "error": "content is required" });
        };
        let id = self.next_message_id();
        let message = Message {
            id: id.clone(),
            author_id: "u_00".to_string(),
            content: content.to_string(),
            timestamp: "2026-08-07T00:00:00Z".to_string(),
            reactions: Vec::new(),
        };
        self.messages
            .entry(channel_id.to_string())
            .or_default()
            .push(message);
        json!({
            "success": true,
            "channel_id": channel_id,
            "message": { "id": id, "content": content },
        })
    }

    fn emote_add(&mut self, args: &ArgMap) -> Value {
        let reference = str_arg(args, "channel_id").unwrap_or_default();
        let Some(channel_id) = self.resolve_channel(reference) else {
            return json!({ "success": false, "error": format!("Channel '{reference}' not found") });
        };
        let raw_id = str_arg(args, "message_id").unwrap_or_default();
        let message_id = match self.resolve_message_id(raw_id) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let emoji = str_arg(args, "emoji").unwrap_or("👍").to_string();
        let Some(messages) = self.messages.get_mut(channel_id) else {
            return json!({ "success": false, "error": "Channel has no messages" });
        };
        for msg in messages.iter_mut() {
            if msg.id == message_id {
                msg.reactions.push(json!({ "emoji": emoji, "count": 1 }));
                return json!({ "success": true, "message_id": msg.id, "emoji": emoji });
            }
        }
        json!({ "success": false, "error": format!("Message '{raw_id}' not found") })
    }

    fn log_retrieve(&mut self, args: &ArgMap) -> Value {
        let reference = str_arg(args, "channel_id").unwrap_or_default();
        let Some(channel_id) = self.resolve_channel(reference) else {
            return json!({ "success": false, "error": format!("Channel '{reference}' not found") });
        };
        let limit = usize_arg_or(args, "limit", 10);
        let messages = self.messages.get(channel_id).cloned().unwrap_or_default();
        let start = messages.len().saturating_sub(limit);
        let rows: Vec<Value> = messages[start..]
            .iter()
            .map(|msg| {
                json!({
                    "id": msg.id,
                    "author_id": msg.author_id,
                    "content": msg.content,
                    "timestamp": msg.timestamp,
                    "reactions": msg.reactions,
                    "reaction_handle": self.reaction_handle(&msg.id),
                })
            })
            .collect();
        json!({ "success": true, "messages": rows })
    }

    fn player_lookup(&mut self, args: &ArgMap) -> Value {
        let username = str_arg(args, "username").unwrap_or_default();
        let known = [("petra", "u_12"), ("sam", "u_31"), ("riley", "u_47")];
        match known.iter().find(|(name, _)| *name == username) {
            Some((_, id)) => json!({ "success": true, "user_id": id }),
            None => json!({ "success": false, "error": format!("User '{username}' not found") }),
        }
    }

    fn guild_stats(&mut self) -> Value {
        json!({
            "success": true,
            "server_name": "Benchmark Guild",
            "member_count": 52,
            "channel_count": self.channels.len(),
        })
    }
}

impl Default for DiscordBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for DiscordBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "dsc_rooms_scan",
                description: "List the text channels of the Discord server.",
                params: vec![],
            },
            ToolSpec {
                name: "dsc_chat_post",
                description: "Send a message to a Discord channel, addressed by id or name.",
                params: vec![
                    ParamDecl::required("channel_id", ParamKind::String),
                    ParamDecl::required("content", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "dsc_emote_add",
                description: "Add an emoji reaction to a Discord message. Pass the reaction_handle from the most recent log retrieval as message_id.",
                params: vec![
                    ParamDecl::required("channel_id", ParamKind::String),
                    ParamDecl::required("message_id", ParamKind::String),
                    ParamDecl::required("emoji", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "dsc_log_retrieve",
                description: "Read recent messages of a Discord channel, including reaction handles.",
                params: vec![
                    ParamDecl::required("channel_id", ParamKind::String),
                    ParamDecl::optional("limit", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "dsc_player_lookup",
                description: "Look up a Discord user id by username.",
                params: vec![ParamDecl::required("username", ParamKind::String)],
            },
            ToolSpec {
                name: "dsc_guild_stats",
                description: "Get member and channel statistics for the Discord server.",
                params: vec![],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "dsc_rooms_scan" => self.rooms_scan(),
            "dsc_chat_post" => self.chat_post(args),
            "dsc_emote_add" => self.emote_add(args),
            "dsc_log_retrieve" => self.log_retrieve(args),
            "dsc_player_lookup" => self.player_lookup(args),
            "dsc_guild_stats" => self.guild_stats(),
            other => unknown_tool("DiscordBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }

    fn invalidate_transient_handles(&mut self) {
        self.handle_epoch += 1;
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
    fn post_reports_message_payload() {
        let mut api = DiscordBackend::new();
        let result = api.call(
            "dsc_chat_post",
            &args(&[
                ("channel_id", json!("engineering")),
                ("content", json!("Deploy finished, all checks green")),
            ]),
        );
        assert_eq!(result["success"], true);
        assert_eq!(result["message"]["id"], "m_104");
    }

    #[test]
    fn stale_reaction_handle_is_rejected() {
        let mut api = DiscordBackend::new();
        let log = api.call("dsc_log_retrieve", &args(&[("channel_id", json!("general"))]));
        let handle = log["messages"][0]["reaction_handle"]
            .as_str()
            .expect("handle")
            .to_string();
        api.invalidate_transient_handles();
        let result = api.call(
            "dsc_emote_add",
            &args(&[
                ("channel_id", json!("general")),
                ("message_id", json!(handle)),
                ("emoji", json!("👍")),
            ]),
        );
        assert!(result["error"].as_str().expect("stale").contains("stale"));
    }

    #[test]
    fn fresh_handle_reacts_successfully() {
        let mut api = DiscordBackend::new();
        let log = api.call("dsc_log_retrieve", &args(&[("channel_id", json!("general"))]));
        let handle = log["messages"][1]["reaction_handle"]
            .as_str()
            .expect("handle")
            .to_string();
        let result = api.call(
            "dsc_emote_add",
            &args(&[
                ("channel_id", json!("general")),
                ("message_id", json!(handle)),
                ("emoji", json!("👍")),
            ]),
        );
        assert_eq!(result["success"], true);
        assert_eq!(result["message_id"], "m_102");
    }
}
