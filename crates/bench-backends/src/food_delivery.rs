//! Combined food-delivery backend: UberEats (`ue_`) and DoorDash (`dd_`)
//! over one shared restaurant world. Restaurant handles drift: every search
//! opens a new epoch and orders placed with handles from an older epoch are
//! rejected as stale.

use std::collections::BTreeMap;

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, i64_arg, str_arg, unknown_tool, Backend, ToolSpec};

#[derive(Debug, Clone)]
struct Restaurant {
    name: &'static str,
    cuisine: &'static str,
    rating: f64,
    delivery_time: i64,
}

#[derive(Debug, Clone)]
struct MenuItem {
    item_id: i64,
    name: &'static str,
    price: f64,
}

pub struct FoodDeliveryBackend {
    ue_authenticated: bool,
    dd_authenticated: bool,
    restaurants: BTreeMap<i64, Restaurant>,
    menus: BTreeMap<i64, Vec<MenuItem>>,
    orders: BTreeMap<i64, Value>,
    order_counter: i64,
    ue_search_epoch: i64,
    dd_search_epoch: i64,
    ue_handles: BTreeMap<i64, i64>,
    dd_handles: BTreeMap<i64, i64>,
}

fn default_restaurants() -> BTreeMap<i64, Restaurant> {
    BTreeMap::from([
        (1, Restaurant { name: "Mario's Pizza", cuisine: "Italian", rating: 4.5, delivery_time: 30 }),
        (2, Restaurant { name: "Dragon Wok", cuisine: "Chinese", rating: 4.2, delivery_time: 25 }),
        (3, Restaurant { name: "Taco Fiesta", cuisine: "Mexican", rating: 4.7, delivery_time: 20 }),
    ])
}

fn default_menus() -> BTreeMap<i64, Vec<MenuItem>> {
    BTreeMap::from([
        (1, vec![
            MenuItem { item_id: 101, name: "Margherita Pizza", price: 12.99 },
            MenuItem { item_id: 102, name: "Pepperoni Pizza", price: 14.99 },
            MenuItem { item_id: 103, name: "Garlic Bread", price: 5.99 },
        ]),
        (2, vec![
            MenuItem { item_id: 201, name: "Kung Pao Chicken", price: 11.99 },
            MenuItem { item_id: 202, name: "Fried Rice", price: 8.99 },
            MenuItem { item_id: 203, name: "Spring Rolls", price: 6.99 },
        ]),
        (3, vec![
            MenuItem { item_id: 301, name: "Beef Burrito", price: 10.99 },
            MenuItem { item_id: 302, name: "Chicken Tacos", price: 9.99 },
            MenuItem { item_id: 303, name: "Guacamole & Chips", price: 7.99 },
        ]),
    ])
}

fn default_orders() -> BTreeMap<i64, Value> {
    BTreeMap::from([
        (1001, json!({
            "order_id": 1001,
            "service": "ubereats",
            "restaurant": "Mario's Pizza",
            "items": [{"name": "Pepperoni Pizza", "price": 14.99}],
            "total": 14.99,
            "delivery_address": "456 Oak Avenue",
            "estimated_delivery": 25,
            "status": "out_for_delivery"
        })),
        (1002, json!({
            "order_id": 1002,
            "service": "doordash",
            "restaurant": "Dragon Wok",
            "items": [{"name": "Kung Pao Chicken", "price": 11.99}],
            "total": 11.99,
            "delivery_address": "789 Pine Street",
            "estimated_delivery": 20,
            "status": "preparing"
        })),
    ])
}

impl FoodDeliveryBackend {
    pub fn new() -> Self {
        Self {
            ue_authenticated: false,
            dd_authenticated: false,
            restaurants: default_restaurants(),
            menus: default_menus(),
            orders: default_orders(),
            order_counter: 1003,
            ue_search_epoch: 0,
            dd_search_epoch: 0,
            ue_handles: BTreeMap::new(),
            dd_handles: BTreeMap::new(),
        }
    }

    fn resolve_ue(&self, handle: i64) -> Option<i64> {
        self.ue_handles.get(&handle).copied()
    }

    fn resolve_dd(&self, handle: i64) -> Option<i64> {
        self.dd_handles.get(&handle).copied()
    }

    fn ue_session_init(&mut self) -> Value {
        self.ue_authenticated = true;
        json!({ "authentication_status": true })
    }

    fn ue_vendor_discover(&mut self, args: &ArgMap) -> Value {
        if !self.ue_authenticated {
            return err("User not authenticated. Please log in to UberEats first.");
        }
        let cuisine = str_arg(args, "cuisine").unwrap_or_default().to_lowercase();
        self.ue_search_epoch += 1;
        self.ue_handles.clear();
        let mut results = Vec::new();
        for (rid, rdata) in &self.restaurants {
            if rdata.cuisine.to_lowercase().contains(&cuisine) {
                let handle = self.ue_search_epoch * 1000 + rid;
                self.ue_handles.insert(handle, *rid);
                results.push(json!({
                    "id": handle,
                    "source_restaurant_id": rid,
                    "name": rdata.name,
                    "cuisine": rdata.cuisine,
                    "rating": rdata.rating,
                    "delivery_time": rdata.delivery_time,
                }));
            }
        }
        json!({ "restaurants": results })
    }

    fn ue_catalog_fetch(&mut self, args: &ArgMap) -> Value {
        if !self.ue_authenticated {
            return err("User not authenticated. Please log in to UberEats first.");
        }
        let Some(handle) = i64_arg(args, "restaurant_id") else {
            return err("restaurant_id must be an integer handle");
        };
        let Some(rid) = self.resolve_ue(handle) else {
            return err("Restaurant handle is stale. Re-run restaurant search before fetching menu.");
        };
        let menu: Vec<Value> = self
            .menus
            .get(&rid)
            .map(|items| {
                items
                    .iter()
                    .map(|m| json!({"item_id": m.item_id, "name": m.name, "price": m.price}))
                    .collect()
            })
            .unwrap_or_default();
        json!({
            "restaurant_name": self.restaurants[&rid].name,
            "menu": menu,
        })
    }

    fn ue_transaction_submit(&mut self, args: &ArgMap) -> Value {
        if !self.ue_authenticated {
            return err("User not authenticated. Please log in to UberEats first.");
        }
        let Some(handle) = i64_arg(args, "restaurant_id") else {
            return err("restaurant_id must be an integer handle");
        };
        let Some(rid) = self.resolve_ue(handle) else {
            return err("Restaurant handle is stale. Re-run restaurant search before placing order.");
        };
        let item_ids: Vec<i64> = args
            .get("item_ids")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        let address = str_arg(args, "delivery_address").unwrap_or_default();

        let menu = self.menus.get(&rid).cloned().unwrap_or_default();
        let mut ordered = Vec::new();
        let mut total = 0.0;
        for item_id in &item_ids {
            match menu.iter().find(|m| m.item_id == *item_id) {
                Some(item) => {
                    total += item.price;
                    ordered.push(json!({"name": item.name, "price": item.price}));
                }
                None => return err(format!("Item with ID {item_id} not found on the menu.")),
            }
        }
        let total = (total * 100.0).round() / 100.0;

        let order = json!({
            "order_id": self.order_counter,
            "service": "ubereats",
            "restaurant": self.restaurants[&rid].name,
            "items": ordered,
            "total": total,
            "delivery_address": address,
            "estimated_delivery": self.restaurants[&rid].delivery_time,
            "status": "confirmed",
        });
        self.orders.insert(self.order_counter, order.clone());
        self.order_counter += 1;
        order
    }

    fn ue_fulfillment_track(&mut self, args: &ArgMap) -> Value {
        if !self.ue_authenticated {
            return err("User not authenticated. Please log in to UberEats first.");
        }
        let Some(order_id) = i64_arg(args, "order_id") else {
            return err("order_id must be an integer");
        };
        match self.orders.get(&order_id) {
            Some(order) => json!({
                "order_id": order["order_id"],
                "status": order["status"],
                "estimated_delivery": order["estimated_delivery"],
            }),
            None => err(format!("Order with ID {order_id} not found.")),
        }
    }

    fn dd_auth_handshake(&mut self) -> Value {
        self.dd_authenticated = true;
        json!({ "login_success": true })
    }

    fn dd_merchant_search(&mut self, args: &ArgMap) -> Value {
        if !self.dd_authenticated {
            return err("Not logged in. Please authenticate with DoorDash first.");
        }
        let food_type = str_arg(args, "food_type").unwrap_or_default().to_lowercase();
        self.dd_search_epoch += 1;
        self.dd_handles.clear();
        let mut results = Vec::new();
        for (rid, rdata) in &self.restaurants {
            if rdata.cuisine.to_lowercase().contains(&food_type) {
                let handle = self.dd_search_epoch * 1000 + rid;
                self.dd_handles.insert(handle, *rid);
                results.push(json!({
                    "restaurant_id": handle,
                    "source_restaurant_id": rid,
                    "restaurant_name": rdata.name,
                    "food_type": rdata.cuisine,
                    "customer_rating": rdata.rating,
                    "eta_minutes": rdata.delivery_time,
                }));
            }
        }
        json!({ "available_restaurants": results })
    }

    fn dd_offerings_list(&mut self, args: &ArgMap) -> Value {
        if !self.dd_authenticated {
            return err("Not logged in. Please authenticate with DoorDash first.");
        }
        let Some(handle) = i64_arg(args, "restaurant_id") else {
            return err("restaurant_id must be an integer handle");
        };
        let Some(rid) = self.resolve_dd(handle) else {
            return err("Restaurant handle is stale. Re-run restaurant search before viewing menu.");
        };
        let menu_items: Vec<Value> = self
            .menus
            .get(&rid)
            .map(|items| {
                items
                    .iter()
                    .map(|m| json!({"id": m.item_id, "item_name": m.name, "item_price": m.price}))
                    .collect()
            })
            .unwrap_or_default();
        json!({
            "store_name": self.restaurants[&rid].name,
            "menu_items": menu_items,
        })
    }

    fn dd_checkout_complete(&mut self, args: &ArgMap) -> Value {
        if !self.dd_authenticated {
            return err("Not logged in. Please authenticate with DoorDash first.");
        }
        let Some(handle) = i64_arg(args, "restaurant_id") else {
            return err("restaurant_id must be an integer handle");
        };
        let Some(rid) = self.resolve_dd(handle) else {
            return err("Restaurant handle is stale. Re-run restaurant search before submitting order.");
        };
        let location = str_arg(args, "delivery_location").unwrap_or_default();
        let requested = args
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let menu = self.menus.get(&rid).cloned().unwrap_or_default();
        let mut ordered = Vec::new();
        let mut total = 0.0;
        for entry in &requested {
            let item_id = entry.get("item_id").and_then(Value::as_i64);
            let quantity = entry.get("quantity").and_then(Value::as_i64).unwrap_or(1);
            let Some(item) = item_id.and_then(|id| menu.iter().find(|m| m.item_id == id)) else {
                return err(format!(
                    "Item with ID {} not found on the menu.",
                    item_id.map(|v| v.to_string()).unwrap_or_else(|| "?".into())
                ));
            };
            total += item.price * quantity as f64;
            ordered.push(json!({
                "item_name": item.name,
                "quantity": quantity,
                "item_price": item.price,
            }));
        }
        let total = (total * 100.0).round() / 100.0;

        self.orders.insert(
            self.order_counter,
            json!({
                "order_id": self.order_counter,
                "service": "doordash",
                "restaurant": self.restaurants[&rid].name,
                "items": ordered,
                "total": total,
                "delivery_address": location,
                "estimated_delivery": self.restaurants[&rid].delivery_time,
                "status": "confirmed",
            }),
        );
        let confirmation = json!({
            "confirmation_number": self.order_counter,
            "store": self.restaurants[&rid].name,
            "order_items": ordered,
            "order_total": total,
            "delivery_location": location,
            "eta": self.restaurants[&rid].delivery_time,
            "order_status": "confirmed",
        });
        self.order_counter += 1;
        confirmation
    }

    fn dd_delivery_status(&mut self, args: &ArgMap) -> Value {
        if !self.dd_authenticated {
            return err("Not logged in. Please authenticate with DoorDash first.");
        }
        let Some(confirmation) = i64_arg(args, "confirmation_number") else {
            return err("confirmation_number must be an integer");
        };
        match self.orders.get(&confirmation) {
            Some(order) => json!({
                "confirmation_number": order["order_id"],
                "order_status": order["status"],
                "eta": order["estimated_delivery"],
            }),
            None => err(format!(
                "Order with confirmation number {confirmation} not found."
            )),
        }
    }
}

impl Default for FoodDeliveryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for FoodDeliveryBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "ue_session_init",
                description: "Authenticate with UberEats using username and password.",
                params: vec![
                    ParamDecl::required("username", ParamKind::String),
                    ParamDecl::required("password", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "ue_vendor_discover",
                description: "Search for restaurants on UberEats by cuisine type. Returns restaurants with id, name, cuisine, rating and delivery_time.",
                params: vec![ParamDecl::required("cuisine", ParamKind::String)],
            },
            ToolSpec {
                name: "ue_catalog_fetch",
                description: "Get the menu for a restaurant on UberEats. Pass the id returned by the most recent restaurant search.",
                params: vec![ParamDecl::required("restaurant_id", ParamKind::Integer)],
            },
            ToolSpec {
                name: "ue_transaction_submit",
                description: "Place a food delivery order on UberEats. Pass the restaurant id and menu item_ids from the most recent search and menu fetch.",
                params: vec![
                    ParamDecl::required("restaurant_id", ParamKind::Integer),
                    ParamDecl::required("item_ids", ParamKind::Array),
                    ParamDecl::required("delivery_address", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "ue_fulfillment_track",
                description: "Check the status of an UberEats order by order_id.",
                params: vec![ParamDecl::required("order_id", ParamKind::Integer)],
            },
            ToolSpec {
                name: "dd_auth_handshake",
                description: "Authenticate with DoorDash using email and password.",
                params: vec![
                    ParamDecl::required("email", ParamKind::String),
                    ParamDecl::required("password", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "dd_merchant_search",
                description: "Search for restaurants on DoorDash by food type. Returns available_restaurants with restaurant_id, restaurant_name, food_type, customer_rating and eta_minutes.",
                params: vec![ParamDecl::required("food_type", ParamKind::String)],
            },
            ToolSpec {
                name: "dd_offerings_list",
                description: "View the menu of a DoorDash restaurant. Pass the restaurant_id from the most recent merchant search.",
                params: vec![ParamDecl::required("restaurant_id", ParamKind::Integer)],
            },
            ToolSpec {
                name: "dd_checkout_complete",
                description: "Submit a DoorDash order. items is a list of {item_id, quantity} using ids from the most recent menu view.",
                params: vec![
                    ParamDecl::required("restaurant_id", ParamKind::Integer),
                    ParamDecl::required("items", ParamKind::Array),
                    ParamDecl::required("delivery_location", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "dd_delivery_status",
                description: "Check the status of a DoorDash order by confirmation_number.",
                params: vec![ParamDecl::required("confirmation_number", ParamKind::Integer)],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "ue_session_init" => self.ue_session_init(),
            "ue_vendor_discover" => self.ue_vendor_discover(args),
            "ue_catalog_fetch" => self.ue_catalog_fetch(args),
            "ue_transaction_submit" => self.ue_transaction_submit(args),
            "ue_fulfillment_track" => self.ue_fulfillment_track(args),
            "dd_auth_handshake" => self.dd_auth_handshake(),
            "dd_merchant_search" => self.dd_merchant_search(args),
            "dd_offerings_list" => self.dd_offerings_list(args),
            "dd_checkout_complete" => self.dd_checkout_complete(args),
            "dd_delivery_status" => self.dd_delivery_status(args),
            other => unknown_tool("FoodDeliveryBackend", other),
        }
    }

    fn load_scenario(&mut self, scenario: &Value) {
        *self = Self::new();
        if let Some(flag) = scenario.get("ubereats_authenticated").and_then(Value::as_bool) {
            self.ue_authenticated = flag;
        }
        if let Some(flag) = scenario.get("doordash_authenticated").and_then(Value::as_bool) {
            self.dd_authenticated = flag;
        }
        if let Some(counter) = scenario.get("order_counter").and_then(Value::as_i64) {
            self.order_counter = counter;
        }
    }

    fn invalidate_transient_handles(&mut self) {
        self.ue_search_epoch += 1;
        self.dd_search_epoch += 1;
        self.ue_handles.clear();
        self.dd_handles.clear();
    }
}
