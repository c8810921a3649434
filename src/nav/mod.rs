//! Live navigation progress tracking
//!
//! [`ProgressTracker`] is a pure state machine over instruction advancement;
//! [`Navigator`] couples it to the narration queue and the start debounce.
//! Position updates must be applied one at a time, in arrival order — both
//! types take `&mut self` so interleaved index mutation cannot happen.

mod debounce;

use std::sync::Arc;

use crate::config::NarrationConfig;
use crate::geo::{self, Coordinate};
use crate::route::{Instruction, InstructionKind, PlannedTrip, Route};
use crate::voice::Narrator;
use crate::Result;

pub use debounce::StartDebounce;

/// Tracker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No active session
    Idle,
    /// Session active, consuming position updates
    Navigating,
}

/// One active navigation session
///
/// Owned exclusively by the tracker; created on route-start, destroyed on
/// stop, arrival or reset. `current_index` only increases while active.
#[derive(Debug)]
pub struct NavigationSession {
    pub destination: Coordinate,
    pub route: Route,
    pub instructions: Vec<Instruction>,
    pub current_index: usize,
}

/// What a position update did to the session
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    /// Advanced to the instruction at `index`; `description` should be
    /// narrated when non-empty
    Advanced { index: usize, description: String },
    /// Reached the destination; the session is over
    Arrived,
}

/// Advances through an instruction sequence against live positions
#[derive(Debug)]
pub struct ProgressTracker {
    state: TrackerState,
    session: Option<NavigationSession>,
    advance_radius_m: f64,
    arrival_radius_m: f64,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(advance_radius_m: f64, arrival_radius_m: f64) -> Self {
        Self {
            state: TrackerState::Idle,
            session: None,
            advance_radius_m,
            arrival_radius_m,
        }
    }

    #[must_use]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    /// Begin a session, implicitly tearing down any prior one
    pub fn start(&mut self, destination: Coordinate, route: Route, instructions: Vec<Instruction>) {
        if self.session.is_some() {
            tracing::debug!("replacing active navigation session");
        }

        self.session = Some(NavigationSession {
            destination,
            route,
            instructions,
            current_index: 0,
        });
        self.state = TrackerState::Navigating;
    }

    /// Apply one position update
    ///
    /// Advances at most one instruction per update, even when the position
    /// is within range of several. A no-op while idle, when the instruction
    /// list is empty, or when already at the last index — except for the
    /// final destination-arrival check.
    pub fn on_position(&mut self, position: Coordinate) -> Option<NavEvent> {
        if self.state != TrackerState::Navigating {
            return None;
        }
        let session = self.session.as_mut()?;
        let last = session.instructions.len().checked_sub(1)?;

        if session.current_index < last {
            let next = &session.instructions[session.current_index + 1];
            if geo::haversine_m(position, next.position) > self.advance_radius_m {
                return None;
            }

            session.current_index += 1;
            let inst = &session.instructions[session.current_index];

            if session.current_index == last
                && inst.kind == InstructionKind::Destination
                && geo::haversine_m(position, inst.position) <= self.arrival_radius_m
            {
                return Some(self.finish());
            }

            return Some(NavEvent::Advanced {
                index: session.current_index,
                description: inst.description.clone(),
            });
        }

        // Already at the last instruction: arrival check only
        let inst = &session.instructions[last];
        if inst.kind == InstructionKind::Destination
            && geo::haversine_m(position, inst.position) <= self.arrival_radius_m
        {
            return Some(self.finish());
        }

        None
    }

    /// End the session unconditionally
    pub fn stop(&mut self) {
        self.session = None;
        self.state = TrackerState::Idle;
    }

    fn finish(&mut self) -> NavEvent {
        self.session = None;
        self.state = TrackerState::Idle;
        NavEvent::Arrived
    }
}

/// Positions for a simulated walkthrough of a trip, in guidance order
///
/// Instruction positions already follow leg order (walk segments interleave
/// with transit boardings), unlike the per-mode route polylines. Falls back
/// to the walk polyline when a trip carries no instructions.
#[must_use]
pub fn replay_positions(trip: &PlannedTrip) -> Vec<Coordinate> {
    if trip.instructions.is_empty() {
        return trip.route.walk.clone();
    }
    geo::dedupe_sequential(
        &trip
            .instructions
            .iter()
            .map(|i| i.position)
            .collect::<Vec<_>>(),
    )
}

/// Drives the tracker and speaks its events
pub struct Navigator {
    tracker: ProgressTracker,
    debounce: StartDebounce,
    narrator: Arc<Narrator>,
}

impl Navigator {
    #[must_use]
    pub fn new(narrator: Arc<Narrator>, config: &NarrationConfig) -> Self {
        Self {
            tracker: ProgressTracker::new(config.advance_radius_m, config.arrival_radius_m),
            debounce: StartDebounce::new(config.start_debounce),
            narrator,
        }
    }

    #[must_use]
    pub fn is_navigating(&self) -> bool {
        self.tracker.state() == TrackerState::Navigating
    }

    /// Start navigating a planned trip
    ///
    /// Returns `false` when the trigger was debounced (a duplicate inside
    /// the suppression window); the existing session is untouched then.
    ///
    /// # Errors
    ///
    /// Returns error if the trip has no usable destination position.
    pub fn start(&mut self, trip: &PlannedTrip) -> Result<bool> {
        if !self.debounce.try_trigger() {
            tracing::debug!("route start suppressed by debounce window");
            return Ok(false);
        }

        let destination = trip
            .instructions
            .last()
            .map(|i| i.position)
            .or_else(|| trip.route.walk.last().copied())
            .ok_or_else(|| {
                crate::Error::InvalidInput("trip has no destination position".to_string())
            })?;

        self.tracker
            .start(destination, trip.route.clone(), trip.instructions.clone());

        tracing::info!(
            instructions = trip.instructions.len(),
            "navigation started"
        );
        self.narrator.say_now("Starting navigation.");
        Ok(true)
    }

    /// Feed one position update, narrating whatever it triggers
    pub fn on_position(&mut self, position: Coordinate) {
        match self.tracker.on_position(position) {
            Some(NavEvent::Advanced { index, description }) => {
                tracing::debug!(index, "advanced instruction");
                if !description.is_empty() {
                    self.narrator.say(&description);
                }
            }
            Some(NavEvent::Arrived) => {
                tracing::info!("arrived at destination");
                self.narrator.say_now("You have arrived at your destination.");
            }
            None => {}
        }
    }

    /// Stop navigating and announce it
    pub fn stop(&mut self) {
        if self.tracker.state() == TrackerState::Navigating {
            self.tracker.stop();
            self.debounce.reset();
            self.narrator.say_now("Navigation ended.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Instruction;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    /// Three instructions spaced ~111 m apart going north
    fn three_instructions() -> Vec<Instruction> {
        vec![
            Instruction::new(InstructionKind::Start, "Start", coord(35.0, 129.0)),
            Instruction::new(InstructionKind::Left, "Turn left", coord(35.001, 129.0)),
            Instruction::new(
                InstructionKind::Destination,
                "Arrive at your destination",
                coord(35.002, 129.0),
            ),
        ]
    }

    fn start_tracker(instructions: Vec<Instruction>) -> ProgressTracker {
        let mut t = ProgressTracker::new(20.0, 10.0);
        let dest = instructions
            .last()
            .map_or(coord(35.0, 129.0), |i| i.position);
        t.start(dest, Route::default(), instructions);
        t
    }

    #[test]
    fn starts_idle() {
        let t = ProgressTracker::new(20.0, 10.0);
        assert_eq!(t.state(), TrackerState::Idle);
        assert!(t.session().is_none());
    }

    #[test]
    fn ignores_positions_while_idle() {
        let mut t = ProgressTracker::new(20.0, 10.0);
        assert_eq!(t.on_position(coord(35.0, 129.0)), None);
    }

    #[test]
    fn advances_exactly_one_step() {
        let mut t = start_tracker(three_instructions());

        // Right on top of instruction 1
        let ev = t.on_position(coord(35.001, 129.0));
        assert_eq!(
            ev,
            Some(NavEvent::Advanced {
                index: 1,
                description: "Turn left".to_string()
            })
        );
        assert_eq!(t.session().unwrap().current_index, 1);
    }

    #[test]
    fn does_not_skip_ahead_when_in_range_of_two() {
        // Instructions 1 and 2 both within 20 m of the position
        let instructions = vec![
            Instruction::new(InstructionKind::Start, "Start", coord(35.0, 129.0)),
            Instruction::new(InstructionKind::Left, "Turn left", coord(35.00001, 129.0)),
            Instruction::new(
                InstructionKind::Destination,
                "Arrive",
                coord(35.00002, 129.0),
            ),
        ];
        let mut t = start_tracker(instructions);

        let ev = t.on_position(coord(35.00001, 129.0));
        assert!(matches!(ev, Some(NavEvent::Advanced { index: 1, .. })));
        // One update advances one index, never two
        assert_eq!(t.session().unwrap().current_index, 1);
    }

    #[test]
    fn far_position_is_a_noop() {
        let mut t = start_tracker(three_instructions());
        assert_eq!(t.on_position(coord(35.5, 129.5)), None);
        assert_eq!(t.session().unwrap().current_index, 0);
    }

    #[test]
    fn arrival_ends_the_session() {
        let mut t = start_tracker(three_instructions());

        assert!(t.on_position(coord(35.001, 129.0)).is_some());
        let ev = t.on_position(coord(35.002, 129.0));
        assert_eq!(ev, Some(NavEvent::Arrived));
        assert_eq!(t.state(), TrackerState::Idle);
        assert!(t.session().is_none());
    }

    #[test]
    fn near_destination_but_outside_arrival_radius_advances_only() {
        let mut t = start_tracker(three_instructions());
        t.on_position(coord(35.001, 129.0));

        // ~15 m south of the destination: inside the 20 m advance radius,
        // outside the 10 m arrival radius
        let ev = t.on_position(coord(35.001_87, 129.0));
        assert!(matches!(ev, Some(NavEvent::Advanced { index: 2, .. })), "{ev:?}");
        assert_eq!(t.state(), TrackerState::Navigating);

        // Next update right at the destination completes arrival
        let ev = t.on_position(coord(35.002, 129.0));
        assert_eq!(ev, Some(NavEvent::Arrived));
    }

    #[test]
    fn empty_instruction_list_is_a_noop() {
        let mut t = start_tracker(Vec::new());
        assert_eq!(t.on_position(coord(35.0, 129.0)), None);
        assert_eq!(t.state(), TrackerState::Navigating);
    }

    #[test]
    fn stop_clears_state() {
        let mut t = start_tracker(three_instructions());
        t.stop();
        assert_eq!(t.state(), TrackerState::Idle);
        assert!(t.session().is_none());
    }

    #[test]
    fn replay_follows_guidance_order_not_mode_grouping() {
        use crate::route::{RouteSummary, TransportType};

        // Walk, board the subway, walk again: the polylines are grouped by
        // mode, but the replay must visit positions in leg order
        let walk_a = coord(35.0, 129.0);
        let board = coord(35.001, 129.0);
        let alight = coord(35.01, 129.0);
        let dest = coord(35.011, 129.0);

        let mut route = Route::walk_only(&[walk_a, board, alight, dest]);
        route.subway = vec![board, alight];

        let trip = PlannedTrip {
            route,
            instructions: vec![
                Instruction::new(InstructionKind::Start, "Start", walk_a),
                Instruction::new(InstructionKind::Subway, "Take line 2", board),
                Instruction::new(InstructionKind::Walk, "Walk to the exit", alight),
                Instruction::new(InstructionKind::Destination, "Arrive", dest),
            ],
            summary: RouteSummary::new(TransportType::Transit, 1300.0, 12),
        };

        let positions = replay_positions(&trip);
        assert_eq!(positions, vec![walk_a, board, alight, dest]);
    }

    #[test]
    fn replay_of_bare_trip_uses_the_walk_polyline() {
        use crate::route::{RouteSummary, TransportType};

        let points = [coord(35.0, 129.0), coord(35.001, 129.0)];
        let trip = PlannedTrip {
            route: Route::walk_only(&points),
            instructions: Vec::new(),
            summary: RouteSummary::new(TransportType::Walk, 111.0, 2),
        };

        assert_eq!(replay_positions(&trip), points.to_vec());
    }

    #[test]
    fn new_start_replaces_session() {
        let mut t = start_tracker(three_instructions());
        t.on_position(coord(35.001, 129.0));
        assert_eq!(t.session().unwrap().current_index, 1);

        t.start(coord(36.0, 129.0), Route::default(), three_instructions());
        assert_eq!(t.session().unwrap().current_index, 0);
    }
}
