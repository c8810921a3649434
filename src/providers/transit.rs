//! Multimodal transit routing over an external transit API
//!
//! The provider answers with itineraries made of walk/subway/bus legs. The
//! provider's own walking shapes are untrustworthy (often absent), so every
//! walk leg is re-derived by calling the pedestrian adapter for that leg's
//! endpoints and merging its guidance in leg order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::geo::{self, Coordinate};
use crate::route::normalize::{self, RawGuidance, TransitMode};
use crate::route::{Instruction, InstructionKind, PlannedTrip, Route, RouteSummary, TransportType};
use crate::{Error, Result};

use super::{PedestrianRouter, TransitOptions, TransitRouter};

/// Request timeout for the transit endpoint
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Transit routing adapter backed by an HTTP provider
pub struct HttpTransitRouter {
    client: reqwest::Client,
    endpoint: Url,
    app_key: String,
    pedestrian: Arc<dyn PedestrianRouter>,
}

impl HttpTransitRouter {
    /// Create a new adapter
    ///
    /// Walk legs are re-routed through `pedestrian` rather than trusting the
    /// transit provider's walking shapes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the app key is missing
    pub fn new(
        endpoint: Url,
        app_key: String,
        pedestrian: Arc<dyn PedestrianRouter>,
    ) -> Result<Self> {
        if app_key.is_empty() {
            return Err(Error::Config("transit routing app key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            app_key,
            pedestrian,
        })
    }

    /// Assemble a trip from the first itinerary, leg by leg
    async fn assemble(&self, itinerary: &Itinerary) -> Result<PlannedTrip> {
        let mut route = Route::default();
        let mut instructions: Vec<Instruction> = Vec::new();

        for leg in &itinerary.legs {
            let (Some(leg_start), Some(leg_end)) = (leg.start.coordinate(), leg.end.coordinate())
            else {
                tracing::warn!(mode = %leg.mode, "dropping leg with invalid endpoints");
                continue;
            };

            match leg.mode.as_str() {
                "WALK" => {
                    self.append_walk_leg(leg, leg_start, leg_end, &mut route, &mut instructions)
                        .await;
                }
                "SUBWAY" | "BUS" => {
                    append_transit_leg(leg, leg_start, &mut route, &mut instructions);
                }
                other => {
                    tracing::debug!(mode = other, "skipping unsupported leg mode");
                }
            }
        }

        route.walk = geo::dedupe_sequential(&route.walk);
        route.subway = geo::dedupe_sequential(&route.subway);
        route.bus = geo::dedupe_sequential(&route.bus);

        if route.coord_count() < 2 {
            return Err(Error::Provider(
                "transit itinerary produced too little geometry".to_string(),
            ));
        }

        // Wholesale dedupe across merged legs
        let mut seen = HashSet::new();
        instructions.retain(|i| seen.insert(i.dedupe_key()));

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_time_min = (itinerary.total_time_s / 60.0).ceil().max(0.0) as u32;

        Ok(PlannedTrip {
            route,
            instructions,
            summary: RouteSummary::new(
                TransportType::Transit,
                itinerary.total_distance_m,
                total_time_min,
            ),
        })
    }

    /// Re-derive a walk leg through the pedestrian adapter
    ///
    /// The sub-leg's instructions are merged minus the duplicate start
    /// marker. When the pedestrian call fails the leg degrades to its two
    /// endpoints with a single generic walk instruction.
    async fn append_walk_leg(
        &self,
        leg: &Leg,
        leg_start: Coordinate,
        leg_end: Coordinate,
        route: &mut Route,
        instructions: &mut Vec<Instruction>,
    ) {
        match self.pedestrian.fetch(leg_start, leg_end).await {
            Ok(sub) => {
                route.walk.extend(sub.route.walk);
                instructions.extend(
                    sub.instructions
                        .into_iter()
                        .filter(|i| i.kind != InstructionKind::Start),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "walk leg re-derivation failed, using endpoints");
                route.walk.push(leg_start);
                route.walk.push(leg_end);

                let mut inst = Instruction::new(
                    InstructionKind::Walk,
                    format!("Walk to {}", leg.end.name.as_deref().unwrap_or("the next stop")),
                    leg_start,
                );
                inst.distance_m = leg.distance_m.unwrap_or(0.0);
                inst.duration_s = leg.section_time_s.unwrap_or(0.0);
                instructions.push(inst);
            }
        }
    }
}

/// Append a subway/bus leg: pass-shape polyline plus one boarding instruction
fn append_transit_leg(
    leg: &Leg,
    leg_start: Coordinate,
    route: &mut Route,
    instructions: &mut Vec<Instruction>,
) {
    let mode = if leg.mode == "SUBWAY" {
        TransitMode::Subway
    } else {
        TransitMode::Bus
    };

    let shape = leg
        .pass_shape
        .as_ref()
        .map(|s| parse_linestring(&s.linestring))
        .unwrap_or_default();

    match mode {
        TransitMode::Subway => route.subway.extend(&shape),
        TransitMode::Bus => route.bus.extend(&shape),
    }

    let start_name = leg.start.name.clone();
    let end_name = leg.end.name.clone();
    let verb = match mode {
        TransitMode::Subway => "Take",
        TransitMode::Bus => "Board",
    };
    let description = format!(
        "{verb} {} from {} to {}",
        leg.route.as_deref().unwrap_or("the line"),
        start_name.as_deref().unwrap_or("here"),
        end_name.as_deref().unwrap_or("your stop"),
    );

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let raw = RawGuidance::Transit {
        mode,
        description,
        latitude: leg_start.latitude(),
        longitude: leg_start.longitude(),
        route_name: leg.route.clone(),
        start_station: start_name,
        end_station: end_name,
        station_count: leg
            .pass_stop_list
            .as_ref()
            .map(|l| l.station_list.len() as u32),
        section_time_min: leg
            .section_time_s
            .map(|s| (s / 60.0).ceil().max(0.0) as u32),
    };

    instructions.extend(normalize::to_instructions(&[raw], &[]));
}

#[async_trait]
impl TransitRouter for HttpTransitRouter {
    async fn fetch(
        &self,
        start: Coordinate,
        goal: Coordinate,
        opt: TransitOptions,
    ) -> Result<PlannedTrip> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct TransitRequest<'a> {
            start_x: f64,
            start_y: f64,
            end_x: f64,
            end_y: f64,
            count: u8,
            format: &'a str,
        }

        let request = TransitRequest {
            start_x: start.longitude(),
            start_y: start.latitude(),
            end_x: goal.longitude(),
            end_y: goal.latitude(),
            count: opt.itinerary_count,
            format: "json",
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("appKey", &self.app_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("transit request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "transit provider error {status}: {body}"
            )));
        }

        let payload: TransitResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed transit response: {e}")))?;

        let Some(itinerary) = payload
            .meta_data
            .and_then(|m| m.plan)
            .and_then(|p| p.itineraries.into_iter().next())
        else {
            return Err(Error::Provider(
                "transit provider returned no itineraries".to_string(),
            ));
        };

        self.assemble(&itinerary).await
    }
}

/// Parse a `"lon,lat lon,lat ..."` pass-shape linestring
fn parse_linestring(linestring: &str) -> Vec<Coordinate> {
    linestring
        .split_whitespace()
        .filter_map(|pair| {
            let (lon, lat) = pair.split_once(',')?;
            Coordinate::parse(lat, lon)
        })
        .collect()
}

/// Provider transit response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitResponse {
    #[serde(default)]
    meta_data: Option<MetaData>,
}

#[derive(Debug, Deserialize)]
struct MetaData {
    #[serde(default)]
    plan: Option<Plan>,
}

#[derive(Debug, Deserialize)]
struct Plan {
    #[serde(default)]
    itineraries: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Itinerary {
    #[serde(rename = "totalTime", default)]
    total_time_s: f64,
    #[serde(rename = "totalDistance", default)]
    total_distance_m: f64,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Leg {
    #[serde(default)]
    mode: String,
    #[serde(default)]
    route: Option<String>,
    #[serde(rename = "sectionTime", default)]
    section_time_s: Option<f64>,
    #[serde(rename = "distance", default)]
    distance_m: Option<f64>,
    start: LegPoint,
    end: LegPoint,
    #[serde(default)]
    pass_shape: Option<PassShape>,
    #[serde(default)]
    pass_stop_list: Option<PassStopList>,
}

#[derive(Debug, Deserialize)]
struct LegPoint {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

impl LegPoint {
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Deserialize)]
struct PassShape {
    #[serde(default)]
    linestring: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassStopList {
    #[serde(default)]
    station_list: Vec<Station>,
}

#[derive(Debug, Deserialize)]
struct Station {
    #[serde(rename = "stationName", default)]
    #[allow(dead_code)]
    name: String,
}
