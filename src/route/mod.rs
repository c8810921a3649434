//! Route and instruction data model
//!
//! One [`PlannedTrip`] is produced per routing call and superseded wholesale
//! on re-route; instructions are never patched incrementally.

pub mod normalize;

use serde::Serialize;

use crate::geo::{self, Coordinate};

/// Canonical turn-by-turn instruction categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Start,
    Destination,
    Straight,
    Left,
    Right,
    Uturn,
    Crosswalk,
    Stairs,
    Overpass,
    Underground,
    Ramp,
    StairsRamp,
    Subway,
    Bus,
    Walk,
    Direction,
    Normal,
}

/// One discrete guidance unit tied to a position along the route
#[derive(Debug, Clone, Serialize)]
pub struct Instruction {
    /// Instruction category
    pub kind: InstructionKind,

    /// Speakable description (may be empty for silent waypoints)
    pub description: String,

    /// Validated position this instruction applies at
    pub position: Coordinate,

    /// Distance covered by this instruction in meters
    pub distance_m: f64,

    /// Duration of this instruction in seconds
    pub duration_s: f64,

    /// Raw provider turn code, when one was supplied
    pub turn_code: Option<u16>,

    /// Transit line name (subway/bus instructions only)
    pub route_name: Option<String>,

    /// Boarding station/stop name
    pub start_station: Option<String>,

    /// Alighting station/stop name
    pub end_station: Option<String>,

    /// Number of stations/stops traversed
    pub station_count: Option<u32>,

    /// Leg duration in minutes as reported by the transit provider
    pub section_time_min: Option<u32>,
}

impl Instruction {
    /// Create a plain instruction with no transit metadata
    #[must_use]
    pub fn new(kind: InstructionKind, description: impl Into<String>, position: Coordinate) -> Self {
        Self {
            kind,
            description: description.into(),
            position,
            distance_m: 0.0,
            duration_s: 0.0,
            turn_code: None,
            route_name: None,
            start_station: None,
            end_station: None,
            station_count: None,
            section_time_min: None,
        }
    }

    /// Stable key for deduplication: rounded position + description + kind
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        format!("{}|{}|{:?}", self.position.key(), self.description, self.kind)
    }
}

/// Polylines for one trip, split by travel mode
///
/// Each array is an ordered polyline deduplicated of consecutive identical
/// points. Both transit arrays may be populated from upstream data; the
/// single-path rendering policy picks one primary transit polyline at a time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Route {
    pub walk: Vec<Coordinate>,
    pub subway: Vec<Coordinate>,
    pub bus: Vec<Coordinate>,
}

impl Route {
    /// Build a walk-only route, deduplicating consecutive points
    #[must_use]
    pub fn walk_only(points: &[Coordinate]) -> Self {
        Self {
            walk: geo::dedupe_sequential(points),
            subway: Vec::new(),
            bus: Vec::new(),
        }
    }

    /// Total number of coordinates across all modes
    #[must_use]
    pub fn coord_count(&self) -> usize {
        self.walk.len() + self.subway.len() + self.bus.len()
    }
}

/// Overall trip mode chosen by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Walk,
    Transit,
}

/// Trip-level summary surfaced alongside the route
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    /// Which mode this trip uses
    pub transport_type: TransportType,

    /// Total trip distance in meters
    pub total_distance_m: f64,

    /// Estimated total time in minutes
    pub total_time_min: u32,

    /// Why the planner fell back to walking, when it did
    pub fallback_reason: Option<String>,

    /// A transit alternative existed but was slower than the configured
    /// walk-time ratio
    pub alternative_available: bool,

    /// Estimated time of the discarded transit alternative, in minutes
    pub alternative_time_min: Option<u32>,
}

impl RouteSummary {
    /// Summary for a plain trip with no fallback annotations
    #[must_use]
    pub fn new(transport_type: TransportType, total_distance_m: f64, total_time_min: u32) -> Self {
        Self {
            transport_type,
            total_distance_m,
            total_time_min,
            fallback_reason: None,
            alternative_available: false,
            alternative_time_min: None,
        }
    }
}

/// A complete planned trip: geometry, guidance and summary
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTrip {
    pub route: Route,
    pub instructions: Vec<Instruction>,
    pub summary: RouteSummary,
}
