//! Pedestrian routing over an external walking-route API
//!
//! The provider answers with a GeoJSON-style feature collection: point
//! features carry turn-coded guidance, line features carry the walk
//! polyline. Feature order follows the route from start to goal.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::geo::Coordinate;
use crate::route::normalize::{self, RawGuidance};
use crate::route::{PlannedTrip, Route, RouteSummary, TransportType};
use crate::{Error, Result};

use super::PedestrianRouter;

/// Request timeout for the pedestrian endpoint
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pedestrian routing adapter backed by an HTTP provider
pub struct HttpPedestrianRouter {
    client: reqwest::Client,
    endpoint: Url,
    app_key: String,
}

impl HttpPedestrianRouter {
    /// Create a new adapter
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the app key is missing
    pub fn new(endpoint: Url, app_key: String) -> Result<Self> {
        if app_key.is_empty() {
            return Err(Error::Config(
                "pedestrian routing app key required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            app_key,
        })
    }
}

#[async_trait]
impl PedestrianRouter for HttpPedestrianRouter {
    async fn fetch(&self, start: Coordinate, goal: Coordinate) -> Result<PlannedTrip> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RouteRequest<'a> {
            start_x: f64,
            start_y: f64,
            end_x: f64,
            end_y: f64,
            start_name: &'a str,
            end_name: &'a str,
            req_coord_type: &'a str,
            res_coord_type: &'a str,
        }

        let request = RouteRequest {
            start_x: start.longitude(),
            start_y: start.latitude(),
            end_x: goal.longitude(),
            end_y: goal.latitude(),
            start_name: "start",
            end_name: "goal",
            req_coord_type: "WGS84GEO",
            res_coord_type: "WGS84GEO",
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("appKey", &self.app_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("pedestrian request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "pedestrian provider error {status}: {body}"
            )));
        }

        let collection: FeatureCollection = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed pedestrian response: {e}")))?;

        parse_trip(&collection)
    }
}

/// Convert a provider feature collection into a planned walking trip
fn parse_trip(collection: &FeatureCollection) -> Result<PlannedTrip> {
    if collection.features.is_empty() {
        return Err(Error::Provider(
            "pedestrian provider returned no geometry features".to_string(),
        ));
    }

    let mut walk: Vec<Coordinate> = Vec::new();
    let mut guides: Vec<RawGuidance> = Vec::new();
    let mut total_distance_m = 0.0;
    let mut total_time_s = 0.0;

    for feature in &collection.features {
        match feature.geometry.kind.as_str() {
            "Point" => {
                if let Some((lon, lat)) = parse_point(&feature.geometry.coordinates) {
                    guides.push(RawGuidance::Coded {
                        turn_code: feature.properties.turn_type,
                        description: feature.properties.description.clone().unwrap_or_default(),
                        latitude: lat,
                        longitude: lon,
                        distance_m: feature.properties.distance.unwrap_or(0.0),
                        duration_s: feature.properties.time.unwrap_or(0.0),
                    });
                }
            }
            "LineString" => {
                for (lon, lat) in parse_linestring(&feature.geometry.coordinates) {
                    if let Some(c) = Coordinate::new(lat, lon) {
                        walk.push(c);
                    }
                }
                total_distance_m += feature.properties.distance.unwrap_or(0.0);
                total_time_s += feature.properties.time.unwrap_or(0.0);
            }
            other => {
                tracing::debug!(geometry = other, "skipping unsupported geometry");
            }
        }

        // Trip-level totals, when the provider reports them on a feature
        if let Some(d) = feature.properties.total_distance {
            total_distance_m = d;
        }
        if let Some(t) = feature.properties.total_time {
            total_time_s = t;
        }
    }

    if walk.is_empty() {
        return Err(Error::Provider(
            "pedestrian provider returned no line geometry".to_string(),
        ));
    }

    let route = Route::walk_only(&walk);
    let instructions = normalize::to_instructions(&guides, &route.walk);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_time_min = (total_time_s / 60.0).ceil().max(0.0) as u32;

    Ok(PlannedTrip {
        route,
        instructions,
        summary: RouteSummary::new(TransportType::Walk, total_distance_m, total_time_min),
    })
}

/// Extract `(lon, lat)` from a GeoJSON point coordinate array
fn parse_point(coords: &serde_json::Value) -> Option<(f64, f64)> {
    let arr = coords.as_array()?;
    Some((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
}

/// Extract `(lon, lat)` pairs from a GeoJSON linestring coordinate array
fn parse_linestring(coords: &serde_json::Value) -> Vec<(f64, f64)> {
    coords
        .as_array()
        .map(|points| points.iter().filter_map(parse_point).collect())
        .unwrap_or_default()
}

/// Provider feature collection response
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    #[serde(default)]
    turn_type: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    total_distance: Option<f64>,
    #[serde(default)]
    total_time: Option<f64>,
}
