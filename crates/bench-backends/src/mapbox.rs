//! Mapbox mock (`mbx_` tools). Same world as the Google Maps mock but with
//! Mapbox response shapes: features with `center` as [lng, lat], routes
//! with distance/duration pairs, and epoch-tagged `mref_` handles.

use std::collections::BTreeMap;

use bench_core::{ArgMap, ParamDecl, ParamKind};
use serde_json::{json, Value};

use crate::{err, f64_arg, str_arg, unknown_tool, Backend, ToolSpec};

#[derive(Debug, Clone)]
struct Feature {
    needle: &'static str,
    place_name: &'static str,
    lng: f64,
    lat: f64,
}

const GEOCODE_FEATURES: &[Feature] = &[
    Feature { needle: "1600 amphitheatre", place_name: "1600 Amphitheatre Parkway, Mountain View, California 94043", lng: -122.0842, lat: 37.4224 },
    Feature { needle: "ferry building", place_name: "Ferry Building, San Francisco, California 94111", lng: -122.3937, lat: 37.7955 },
    Feature { needle: "golden gate park", place_name: "Golden Gate Park, San Francisco, California", lng: -122.4862, lat: 37.7694 },
    Feature { needle: "downtown san francisco", place_name: "Downtown, San Francisco, California", lng: -122.4074, lat: 37.7879 },
];

const SEARCH_FEATURES: &[Feature] = &[
    Feature { needle: "coffee", place_name: "Beacon Coffee, 120 Market St", lng: -122.3951, lat: 37.7936 },
    Feature { needle: "coffee", place_name: "Fog Lifter Cafe, 501 Mission St", lng: -122.3986, lat: 37.7880 },
    Feature { needle: "restaurant", place_name: "Harbor Noodle, 8 Embarcadero Ctr", lng: -122.3952, lat: 37.7946 },
];

pub struct MapboxBackend {
    search_epoch: i64,
    feature_handles: BTreeMap<String, usize>,
}

impl MapboxBackend {
    pub fn new() -> Self {
        Self {
            search_epoch: 0,
            feature_handles: BTreeMap::new(),
        }
    }

    fn location_encode(&mut self, args: &ArgMap) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return err("query is required");
        };
        let needle = query.to_lowercase();
        let features: Vec<Value> = GEOCODE_FEATURES
            .iter()
            .filter(|f| needle.contains(f.needle) || f.needle.contains(needle.trim()))
            .map(|f| {
                json!({
                    "place_name": f.place_name,
                    "center": [f.lng, f.lat],
                    "relevance": 0.98,
                })
            })
            .collect();
        json!({ "features": features, "attribution": "mock" })
    }

    fn point_decode(&mut self, args: &ArgMap) -> Value {
        let (Some(lng), Some(lat)) = (f64_arg(args, "longitude"), f64_arg(args, "latitude")) else {
            return err("longitude and latitude are required numbers");
        };
        let nearest = GEOCODE_FEATURES
            .iter()
            .min_by(|a, b| {
                let da = (a.lat - lat).powi(2) + (a.lng - lng).powi(2);
                let db = (b.lat - lat).powi(2) + (b.lng - lng).powi(2);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(&GEOCODE_FEATURES[0]);
        json!({ "features": [{ "place_name": nearest.place_name, "center": [nearest.lng, nearest.lat] }] })
    }

    fn feature_search(&mut self, args: &ArgMap) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return err("query is required");
        };
        let needle = query.to_lowercase();
        self.search_epoch += 1;
        self.feature_handles.clear();
        let mut features = Vec::new();
        for (idx, feature) in SEARCH_FEATURES.iter().enumerate() {
            if needle.contains(feature.needle) || feature.place_name.to_lowercase().contains(&needle)
            {
                let handle = format!("mref_{}_{}", self.search_epoch, idx);
                self.feature_handles.insert(handle.clone(), idx);
                features.push(json!({
                    "place_name": feature.place_name,
                    "center": [feature.lng, feature.lat],
                    "feature_handle": handle,
                }));
            }
        }
        json!({ "features": features, "query_epoch": self.search_epoch })
    }

    fn route_compute(&mut self, args: &ArgMap) -> Value {
        let (Some(origin), Some(destination)) =
            (str_arg(args, "origin"), str_arg(args, "destination"))
        else {
            return err("origin and destination are required");
        };
        let profile = str_arg(args, "profile").unwrap_or("driving");
        json!({
            "routes": [{
                "profile": profile,
                "distance": 7180.5,
                "duration": 1190.0,
                "legs": [{
                    "summary": format!("{origin} -> {destination}"),
                    "steps": [
                        { "maneuver": "depart", "name": origin },
                        { "maneuver": "arrive", "name": destination },
                    ],
                }],
            }],
            "code": "Ok",
        })
    }

    fn haversine_dist(&mut self, args: &ArgMap) -> Value {
        let (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) = (
            f64_arg(args, "lat1"),
            f64_arg(args, "lon1"),
            f64_arg(args, "lat2"),
            f64_arg(args, "lon2"),
        ) else {
            return err("lat1, lon1, lat2, lon2 are required numbers");
        };
        let r = 6371000.0_f64;
        let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
        let (dp, dl) = ((lat2 - lat1).to_radians(), (lon2 - lon1).to_radians());
        let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
        let distance = 2.0 * r * a.sqrt().atan2((1.0 - a).sqrt());
        json!({ "distance_meters": distance })
    }

    fn heading_calc(&mut self, args: &ArgMap) -> Value {
        let (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) = (
            f64_arg(args, "lat1"),
            f64_arg(args, "lon1"),
            f64_arg(args, "lat2"),
            f64_arg(args, "lon2"),
        ) else {
            return err("lat1, lon1, lat2, lon2 are required numbers");
        };
        let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
        let dl = (lon2 - lon1).to_radians();
        let y = dl.sin() * p2.cos();
        let x = p1.cos() * p2.sin() - p1.sin() * p2.cos() * dl.cos();
        let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
        json!({ "bearing_degrees": bearing })
    }
}

impl Default for MapboxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MapboxBackend {
    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "mbx_location_encode",
                description: "Forward geocode a query with Mapbox. Returns features with place_name and center [lng, lat].",
                params: vec![ParamDecl::required("query", ParamKind::String)],
            },
            ToolSpec {
                name: "mbx_point_decode",
                description: "Reverse geocode a coordinate with Mapbox.",
                params: vec![
                    ParamDecl::required("longitude", ParamKind::Number),
                    ParamDecl::required("latitude", ParamKind::Number),
                ],
            },
            ToolSpec {
                name: "mbx_feature_search",
                description: "Search features with Mapbox. Returns features with feature_handle entries valid until the next search.",
                params: vec![
                    ParamDecl::required("query", ParamKind::String),
                    ParamDecl::optional("proximity", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "mbx_route_compute",
                description: "Compute a route between two locations with Mapbox. Returns routes with distance and duration.",
                params: vec![
                    ParamDecl::required("origin", ParamKind::String),
                    ParamDecl::required("destination", ParamKind::String),
                    ParamDecl::optional("profile", ParamKind::String),
                ],
            },
            ToolSpec {
                name: "mbx_haversine_dist",
                description: "Great-circle distance in meters between two coordinates.",
                params: vec![
                    ParamDecl::required("lat1", ParamKind::Number),
                    ParamDecl::required("lon1", ParamKind::Number),
                    ParamDecl::required("lat2", ParamKind::Number),
                    ParamDecl::required("lon2", ParamKind::Number),
                ],
            },
            ToolSpec {
                name: "mbx_heading_calc",
                description: "Initial bearing in degrees from one coordinate to another.",
                params: vec![
                    ParamDecl::required("lat1", ParamKind::Number),
                    ParamDecl::required("lon1", ParamKind::Number),
                    ParamDecl::required("lat2", ParamKind::Number),
                    ParamDecl::required("lon2", ParamKind::Number),
                ],
            },
        ]
    }

    fn call(&mut self, tool: &str, args: &ArgMap) -> Value {
        match tool {
            "mbx_location_encode" => self.location_encode(args),
            "mbx_point_decode" => self.point_decode(args),
            "mbx_feature_search" => self.feature_search(args),
            "mbx_route_compute" => self.route_compute(args),
            "mbx_haversine_dist" => self.haversine_dist(args),
            "mbx_heading_calc" => self.heading_calc(args),
            other => unknown_tool("MapboxBackend", other),
        }
    }

    fn load_scenario(&mut self, _scenario: &Value) {
        *self = Self::new();
    }

    fn invalidate_transient_handles(&mut self) {
        self.search_epoch += 1;
        self.feature_handles.clear();
    }
}
