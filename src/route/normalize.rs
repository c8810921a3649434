//! Route normalization
//!
//! Converts heterogeneous provider guidance records into the canonical
//! [`Instruction`] schema, and derives guidance from bare geometry when a
//! provider supplies none.

use std::collections::HashSet;

use crate::geo::{self, Coordinate};
use crate::route::{Instruction, InstructionKind};

/// Turn-angle magnitude above which a left/right turn is announced
const TURN_THRESHOLD_DEG: f64 = 45.0;

/// Turn-angle magnitude above which a coarse compass direction is announced
const DIRECTION_THRESHOLD_DEG: f64 = 15.0;

/// Segment length above which the segment is always announced as straight
const LONG_SEGMENT_M: f64 = 200.0;

/// Transit leg mode carried by a [`RawGuidance::Transit`] record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitMode {
    Subway,
    Bus,
}

/// Unified provider guidance record
///
/// Every provider adapter converts its native response into this shape
/// before normalization, so the normalizer has exactly one input format.
/// Positions are raw and unvalidated here; validation happens during
/// normalization and failing records are dropped.
#[derive(Debug, Clone)]
pub enum RawGuidance {
    /// A turn-coded pedestrian guidance point
    Coded {
        turn_code: Option<u16>,
        description: String,
        latitude: f64,
        longitude: f64,
        distance_m: f64,
        duration_s: f64,
    },

    /// A transit leg boarding record
    Transit {
        mode: TransitMode,
        description: String,
        latitude: f64,
        longitude: f64,
        route_name: Option<String>,
        start_station: Option<String>,
        end_station: Option<String>,
        station_count: Option<u32>,
        section_time_min: Option<u32>,
    },
}

/// Map a provider turn code to a canonical instruction kind
#[must_use]
pub fn kind_for_code(code: u16) -> Option<InstructionKind> {
    match code {
        11 => Some(InstructionKind::Straight),
        12 => Some(InstructionKind::Left),
        13 => Some(InstructionKind::Right),
        14 => Some(InstructionKind::Uturn),
        125 => Some(InstructionKind::Overpass),
        126 => Some(InstructionKind::Underground),
        127 => Some(InstructionKind::Stairs),
        128 => Some(InstructionKind::Ramp),
        129 => Some(InstructionKind::StairsRamp),
        200 => Some(InstructionKind::Start),
        201 => Some(InstructionKind::Destination),
        211..=217 => Some(InstructionKind::Crosswalk),
        _ => None,
    }
}

/// Classify an instruction from its description text
///
/// Used when a provider supplies no turn code. Keyword checks run in
/// priority order; both Korean and English provider texts are handled.
#[must_use]
pub fn kind_from_description(description: &str) -> InstructionKind {
    let lower = description.to_lowercase();

    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if matches(&["횡단보도", "crosswalk"]) {
        InstructionKind::Crosswalk
    } else if matches(&["계단", "stairs"]) {
        InstructionKind::Stairs
    } else if matches(&["육교", "overpass"]) {
        InstructionKind::Overpass
    } else if matches(&["지하보도", "지하도", "underground tunnel"]) {
        InstructionKind::Underground
    } else if matches(&["지하철", "역", "subway", "station"]) {
        InstructionKind::Subway
    } else if matches(&["버스", "bus"]) {
        InstructionKind::Bus
    } else if matches(&["좌회전", "left"]) {
        InstructionKind::Left
    } else if matches(&["우회전", "right"]) {
        InstructionKind::Right
    } else if matches(&["직진", "straight"]) {
        InstructionKind::Straight
    } else {
        InstructionKind::Normal
    }
}

/// Normalize raw provider guidance into canonical instructions
///
/// When `raw_guides` is empty the instructions are derived from `path`
/// geometry instead. Records with invalid positions are dropped; identical
/// (position, description, kind) records are deduplicated.
#[must_use]
pub fn to_instructions(raw_guides: &[RawGuidance], path: &[Coordinate]) -> Vec<Instruction> {
    let mapped = if raw_guides.is_empty() {
        derive_from_geometry(path)
    } else {
        raw_guides.iter().filter_map(normalize_one).collect()
    };

    dedupe_instructions(mapped)
}

/// Convert one raw guidance record, validating its position
fn normalize_one(raw: &RawGuidance) -> Option<Instruction> {
    match raw {
        RawGuidance::Coded {
            turn_code,
            description,
            latitude,
            longitude,
            distance_m,
            duration_s,
        } => {
            let position = Coordinate::new(*latitude, *longitude)?;
            let kind = turn_code
                .and_then(kind_for_code)
                .unwrap_or_else(|| kind_from_description(description));

            let mut inst = Instruction::new(kind, description.clone(), position);
            inst.distance_m = distance_m.max(0.0);
            inst.duration_s = duration_s.max(0.0);
            inst.turn_code = *turn_code;
            Some(inst)
        }
        RawGuidance::Transit {
            mode,
            description,
            latitude,
            longitude,
            route_name,
            start_station,
            end_station,
            station_count,
            section_time_min,
        } => {
            let position = Coordinate::new(*latitude, *longitude)?;
            let kind = match mode {
                TransitMode::Subway => InstructionKind::Subway,
                TransitMode::Bus => InstructionKind::Bus,
            };

            let mut inst = Instruction::new(kind, description.clone(), position);
            inst.route_name = route_name.clone();
            inst.start_station = start_station.clone();
            inst.end_station = end_station.clone();
            inst.station_count = *station_count;
            inst.section_time_min = *section_time_min;
            inst.duration_s = f64::from(section_time_min.unwrap_or(0)) * 60.0;
            Some(inst)
        }
    }
}

/// Derive instructions from bare geometry by scanning coordinate triples
///
/// Emits a start instruction at the first point and a destination
/// instruction at the last point, with turn detection in between based on
/// bearing deltas.
fn derive_from_geometry(path: &[Coordinate]) -> Vec<Instruction> {
    let Some((&first, rest)) = path.split_first() else {
        return Vec::new();
    };

    let mut out = vec![Instruction::new(InstructionKind::Start, "Start", first)];

    let Some((&last, _)) = rest.split_last() else {
        // Single-point path still gets a destination marker
        out.push(Instruction::new(
            InstructionKind::Destination,
            "Arrive at your destination",
            first,
        ));
        return out;
    };

    for window in path.windows(3) {
        let [prev, cur, next] = window else {
            continue;
        };

        let segment_m = geo::haversine_m(*cur, *next);
        let angle = geo::turn_angle_deg(*prev, *cur, *next);

        let mut inst = if segment_m > LONG_SEGMENT_M || angle.abs() < DIRECTION_THRESHOLD_DEG {
            let rounded = round_to_ten(segment_m);
            let mut i = Instruction::new(
                InstructionKind::Straight,
                format!("Go straight for {rounded} meters"),
                *cur,
            );
            i.distance_m = rounded;
            i
        } else if angle.abs() > TURN_THRESHOLD_DEG {
            let (kind, text) = if angle > 0.0 {
                (InstructionKind::Right, "Turn right")
            } else {
                (InstructionKind::Left, "Turn left")
            };
            Instruction::new(kind, text, *cur)
        } else {
            let compass = compass_name(geo::bearing_deg(*cur, *next));
            Instruction::new(
                InstructionKind::Direction,
                format!("Head {compass}"),
                *cur,
            )
        };

        if inst.distance_m == 0.0 {
            inst.distance_m = segment_m;
        }
        out.push(inst);
    }

    out.push(Instruction::new(
        InstructionKind::Destination,
        "Arrive at your destination",
        last,
    ));
    out
}

/// Drop instructions whose (rounded position, description, kind) repeats
fn dedupe_instructions(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut seen = HashSet::new();
    instructions
        .into_iter()
        .filter(|i| seen.insert(i.dedupe_key()))
        .collect()
}

/// Round a distance to the nearest 10 meters for speakable output
fn round_to_ten(meters: f64) -> f64 {
    (meters / 10.0).round() * 10.0
}

/// Coarse 8-way compass name for a bearing
fn compass_name(bearing: f64) -> &'static str {
    match bearing {
        b if !(22.5..337.5).contains(&b) => "north",
        b if b < 67.5 => "northeast",
        b if b < 112.5 => "east",
        b if b < 157.5 => "southeast",
        b if b < 202.5 => "south",
        b if b < 247.5 => "southwest",
        b if b < 292.5 => "west",
        _ => "northwest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    // -- turn-code table ------------------------------------------------------

    #[test]
    fn code_13_is_always_right() {
        assert_eq!(kind_for_code(13), Some(InstructionKind::Right));
    }

    #[test]
    fn code_table_covers_structures() {
        assert_eq!(kind_for_code(11), Some(InstructionKind::Straight));
        assert_eq!(kind_for_code(12), Some(InstructionKind::Left));
        assert_eq!(kind_for_code(14), Some(InstructionKind::Uturn));
        assert_eq!(kind_for_code(125), Some(InstructionKind::Overpass));
        assert_eq!(kind_for_code(126), Some(InstructionKind::Underground));
        assert_eq!(kind_for_code(127), Some(InstructionKind::Stairs));
        assert_eq!(kind_for_code(128), Some(InstructionKind::Ramp));
        assert_eq!(kind_for_code(129), Some(InstructionKind::StairsRamp));
        assert_eq!(kind_for_code(200), Some(InstructionKind::Start));
        assert_eq!(kind_for_code(201), Some(InstructionKind::Destination));
    }

    #[test]
    fn crosswalk_code_range() {
        for code in 211..=217 {
            assert_eq!(kind_for_code(code), Some(InstructionKind::Crosswalk));
        }
        assert_eq!(kind_for_code(218), None);
        assert_eq!(kind_for_code(210), None);
    }

    // -- keyword fallback -----------------------------------------------------

    #[test]
    fn korean_left_turn_maps_to_left() {
        assert_eq!(kind_from_description("좌회전 후 직진"), InstructionKind::Left);
    }

    #[test]
    fn crosswalk_beats_turn_keywords() {
        // Priority order: structures come before turn directions
        assert_eq!(
            kind_from_description("횡단보도 건넌 후 좌회전"),
            InstructionKind::Crosswalk
        );
    }

    #[test]
    fn english_keywords_match() {
        assert_eq!(kind_from_description("take the stairs"), InstructionKind::Stairs);
        assert_eq!(kind_from_description("turn right at the corner"), InstructionKind::Right);
        assert_eq!(kind_from_description("board the bus"), InstructionKind::Bus);
    }

    #[test]
    fn unknown_description_is_normal() {
        assert_eq!(kind_from_description("계속 이동"), InstructionKind::Normal);
    }

    // -- coded normalization --------------------------------------------------

    #[test]
    fn code_wins_over_description() {
        let raw = RawGuidance::Coded {
            turn_code: Some(13),
            description: "좌회전".to_string(), // says left, code says right
            latitude: 35.0,
            longitude: 129.0,
            distance_m: 50.0,
            duration_s: 40.0,
        };
        let out = to_instructions(&[raw], &[]);
        assert_eq!(out[0].kind, InstructionKind::Right);
        assert_eq!(out[0].turn_code, Some(13));
    }

    #[test]
    fn invalid_position_is_dropped() {
        let raw = vec![
            RawGuidance::Coded {
                turn_code: Some(12),
                description: "ok".to_string(),
                latitude: 35.0,
                longitude: 129.0,
                distance_m: 0.0,
                duration_s: 0.0,
            },
            RawGuidance::Coded {
                turn_code: Some(13),
                description: "bad".to_string(),
                latitude: 95.0,
                longitude: 129.0,
                distance_m: 0.0,
                duration_s: 0.0,
            },
        ];
        let out = to_instructions(&raw, &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, InstructionKind::Left);
    }

    #[test]
    fn identical_records_are_deduplicated() {
        let rec = RawGuidance::Coded {
            turn_code: Some(12),
            description: "좌회전".to_string(),
            latitude: 35.0,
            longitude: 129.0,
            distance_m: 10.0,
            duration_s: 8.0,
        };
        let out = to_instructions(&[rec.clone(), rec], &[]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn transit_record_carries_metadata() {
        let raw = RawGuidance::Transit {
            mode: TransitMode::Subway,
            description: "2호선 탑승".to_string(),
            latitude: 35.157,
            longitude: 129.059,
            route_name: Some("2호선".to_string()),
            start_station: Some("서면".to_string()),
            end_station: Some("센텀시티".to_string()),
            station_count: Some(7),
            section_time_min: Some(14),
        };
        let out = to_instructions(&[raw], &[]);
        assert_eq!(out[0].kind, InstructionKind::Subway);
        assert_eq!(out[0].station_count, Some(7));
        assert_eq!(out[0].duration_s, 840.0);
    }

    // -- geometry derivation --------------------------------------------------

    #[test]
    fn geometry_derivation_brackets_with_start_and_destination() {
        let path = vec![
            coord(35.0, 129.0),
            coord(35.001, 129.0),
            coord(35.002, 129.0),
        ];
        let out = to_instructions(&[], &path);

        assert_eq!(out.first().unwrap().kind, InstructionKind::Start);
        assert_eq!(out.last().unwrap().kind, InstructionKind::Destination);
    }

    #[test]
    fn sharp_turn_detected_from_geometry() {
        // North then hard east: a right turn at the middle point
        let path = vec![
            coord(35.0, 129.0),
            coord(35.001, 129.0),
            coord(35.001, 129.001),
        ];
        let out = to_instructions(&[], &path);
        assert!(out.iter().any(|i| i.kind == InstructionKind::Right), "{out:?}");
    }

    #[test]
    fn long_segment_is_straight_regardless_of_angle() {
        // The outgoing segment is ~1.1 km, so even a sharp bend reads as
        // straight with a rounded distance
        let path = vec![
            coord(35.0, 129.0),
            coord(35.0001, 129.0),
            coord(35.0001, 129.012),
        ];
        let out = to_instructions(&[], &path);
        let mid = &out[1];
        assert_eq!(mid.kind, InstructionKind::Straight);
        assert_eq!(mid.distance_m % 10.0, 0.0);
    }

    #[test]
    fn gentle_bend_gets_compass_direction() {
        // Roughly 25 degrees of bend
        let path = vec![
            coord(35.0, 129.0),
            coord(35.0008, 129.0),
            coord(35.0016, 129.0004),
        ];
        let out = to_instructions(&[], &path);
        assert!(
            out.iter().any(|i| i.kind == InstructionKind::Direction),
            "{out:?}"
        );
    }

    #[test]
    fn empty_path_yields_no_instructions() {
        assert!(to_instructions(&[], &[]).is_empty());
    }

    // -- compass --------------------------------------------------------------

    #[test]
    fn compass_names() {
        assert_eq!(compass_name(0.0), "north");
        assert_eq!(compass_name(45.0), "northeast");
        assert_eq!(compass_name(90.0), "east");
        assert_eq!(compass_name(180.0), "south");
        assert_eq!(compass_name(270.0), "west");
        assert_eq!(compass_name(350.0), "north");
    }
}
