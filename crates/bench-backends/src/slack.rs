//! Slack mock (`slk_` tools). Channel history issues epoch-tagged
//! `reaction_handle`s; reacting with a handle from an old epoch is rejected
//! as stale.

use std::collections::BTreeMap;

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, str_arg, unknown_tool, usize_arg_or, Backend, ToolSpec};

#[derive(Debug, Clone)]
struct Message {
    ts: String,
    user: String,
    text: String,
    reactions: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Channel {
    id: &'static str,
    name: &'static str,
    topic: &'static str,
    num_members: i64,
}

pub struct SlackBackend {
    channels: Vec<Channel>,
    messages: BTreeMap<String, Vec<Message>>,
    next_ts: i64,
    handle_epoch: i64,
}

impl SlackBackend {
    pub fn new() -> Self {
        let channels = vec![
            Channel { id: "C001", name: "general", topic: "Company-wide announcements", num_members: 48 },
            Channel { id: "C002", name: "engineering", topic: "Engineering discussion", num_members: 17 },
            Channel { id: "C003", name: "random", topic: "Watercooler", num_members: 31 },
        ];
        let mut messages = BTreeMap::new();
        messages.insert(
            "C001".to_string(),
            vec![
                Message {
                    ts: "1699999997.000001".to_string(),
                    user: "U014".to_string(),
                    text: "Reminder: all-hands on Thursday".to_string(),
                    reactions: Vec::new(),
                },
                Message {
                    ts: "1699999998.000001".to_string(),
                    user: "U022".to_string(),
                    text: "Release notes draft is up for review".to_string(),
                    reactions: Vec::new(),
                },
            ],
        );
        messages.insert(
            "C002".to_string(),
            vec![Message {
                ts: "1699999999.000001".to_string(),
                user: "U009".to_string(),
                text: "CI is green again after the cache fix".to_string(),
                reactions: Vec::new(),
            }],
        );
        Self {
            channels,
            messages,
            next_ts: 1_700_000_000,
            handle_epoch: 0,
        }
    }

    fn resolve_channel(&self, reference: &str) -> Option<&'static str> {
        self.channels
            .iter()
            .find(|c| c.id == reference || c.name == reference)
            .map(|c| c.id)
    }

    fn next_ts(&mut self) -> String {
        let ts = self.next_ts;
        self.next_ts += 1;
        format!("{ts}.000001")
    }

    fn reaction_handle(&self, ts: &str) -> String {
        format!("rh_{}_{}", self.handle_epoch, ts)
    }

    /// Accepts a reaction_handle from channel history, or a raw ts.
    fn resolve_timestamp(&self, raw: &str) -> Result<String, Value> {
        if let Some(rest) = raw.strip_prefix("rh_") {
            let (epoch, ts) = rest
                .split_once('_')
                .ok_or_else(|| err(format!("Malformed reaction handle '{raw}'")))?;
            if epoch != self.handle_epoch.to_string() {
                return Err(err(
                    "Reaction handle is stale. Re-fetch channel history before reacting.",
                ));
            }
            return Ok(ts.to_string());
        }
        Ok(raw.to_string())
    }

    fn rooms_enumerate(&mut self, args: &ArgMap) -> Value {
        let limit = usize_arg_or(args, "limit", 100);
        let channels: Vec<Value> = self
            .channels
            .iter()
            .take(limit)
            .map(|c| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "is_private": false,
                    "topic": { "value": c.topic },
                    "num_members": c.num_members,
                })
            })
            .collect();
        json!({ "ok": true, "channels": channels })
    }

    fn broadcast_text(&mut self, args: &ArgMap) -> Value {
        let channel = str_arg(args, "channel").unwrap_or_default();
        let Some(channel_id) = self.resolve_channel(channel) else {
            return json!({ "ok": false, "error": format!("Channel '{channel}' not found") });
        };
        let Some(text) = str_arg(args, "text") else {
            return json!({ "ok": false, "error": "text is required" });
        };
        let ts = self.next_ts();
        self.messages
            .entry(channel_id.to_string())
            .or_default()
            .push(Message {
                ts: ts.clone(),
                user: "U000".to_string(),
                text: text.to_string(),
                reactions: Vec::new(),
            });
        json!({
            "ok": true,
            "channel": channel_id,
            "ts": ts,
            "message": { "text": text, "ts": ts },
        })
    }

    fn emoji_attach(&mut self, args: &ArgMap) -> Value {
        let channel = str_arg(args, "channel").unwrap_or_default();
        let Some(channel_id) = self.resolve_channel(channel) else {
            return json!({ "ok": false, "error": format!("Channel '{channel}' not found") });
        };
        let raw_ts = str_arg(args, "timestamp").unwrap_or_default();
        let ts = match self.resolve_timestamp(raw_ts) {
            Ok(ts) => ts,
            Err(e) => return e,
        };
        let reaction = str_arg(args, "reaction").unwrap_or("thumbsup").to_string();
        let Some(messages) = self.messages.get_mut(channel_id) else {
            return json!({ "ok": false, "error": "Channel has no messages" });
        };
        for msg in messages.iter_mut() {
            if msg.ts == ts {
                if let Some(existing) = msg
                    .reactions
                    .iter_mut()
                    .find(|r| r["name"] == reaction.as_str())
                {
                    let count = existing["count"].as_i64().unwrap_or(0) + 1;
                    existing["count"] = json!(count);
                } else {
                    msg.reactions.push(json!({ "name": reaction, "count": 1 }));
                }
                return json!({ "ok": true });
            }
        }
        json!({ "ok": false, "error": format!("Message '{raw_ts}' not found") })
    }

    fn timeline_fetch(&mut self, args: &ArgMap) -> Value {
        let channel = str_arg(args, "channel").unwrap_or_default();
        let Some(channel_id) = self.resolve_channel(channel) else {
            return json!({ "ok": false, "error": format!("Channel '{channel}' not found") });
        };
        let limit = usize_arg_or(args, "limit", 10);
        let messages = self.messages.get(channel_id).cloned().unwrap_or_default();
        let start = messages.len().saturating_sub(limit);
        let rows: Vec<Value> = messages[start..]
            .iter()
            .map(|msg| {
                json!({
                    "ts": msg.ts,
                    "user": msg.user,
                    "text": msg.text,
                    "reactions": msg.reactions,
                    "reaction_handle": self.reaction_handle(&msg.ts),
                })
            })
            .collect();
        json!({ "ok": true, "messages": rows })
    }

    fn members_list(&mut self) -> Value {
        json!({
            "ok": true,
            "members": [
                { "id": "U000", "name": "benchbot", "is_bot": true },
                { "id": "U009", "name": "petra", "is_bot": false },
                { "id": "U014", "name": "sam", "is_bot": false },
                { "id": "U022", "name": "riley", "is_bot": false },
            ]
        })
    }
}

impl Default for SlackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SlackBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "slk_rooms_enumerate",
                description: "List public channels in the Slack workspace with topics and member counts.",
                params: vec![ParamDecl::optional("limit", ParamKind::Integer)],
            },
            ToolSpec {
                name: "slk_broadcast_text",
                description: "Post a message to a Slack channel, addressed by id or name.",
                params: vec![
                    ParamDecl::required("channel", ParamKind::String),
                    ParamDecl::required("text", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "slk_emoji_attach",
                description: "Add an emoji reaction to a Slack message. Pass the reaction_handle from the most recent channel history fetch as timestamp.",
                params: vec![
                    ParamDecl::required("channel", ParamKind::String),
                    ParamDecl::required("timestamp", ParamKind::String),
                    ParamDecl::required("reaction", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "slk_timeline_fetch",
                description: "Get recent messages of a Slack channel, including reaction handles.",
                params: vec![
                    ParamDecl::required("channel", ParamKind::String),
                    ParamDecl::optional("limit", ParamKind::Integer),
                ],
            },
            ToolSpec {
                name: "slk_members_list",
                description: "List members of the Slack workspace.",
                params: vec![],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "slk_rooms_enumerate" => self.rooms_enumerate(args),
            "slk_broadcast_text" => self.broadcast_text(args),
            "slk_emoji_attach" => self.emoji_attach(args),
            "slk_timeline_fetch" => self.timeline_fetch(args),
            "slk_members_list" => self.members_list(),
            other => unknown_tool("SlackBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }

    fn invalidate_transient_handles(&mut self) {
        self.handle_epoch += 1;
    }
}
