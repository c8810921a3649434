//! Routing provider adapters
//!
//! Each adapter wraps one external routing source behind a narrow trait so
//! the planner never sees provider-native shapes. Adapters convert internal
//! failures into the crate error taxonomy; a raw network error never crosses
//! this boundary.

mod pedestrian;
mod transit;

use async_trait::async_trait;

pub use pedestrian::HttpPedestrianRouter;
pub use transit::HttpTransitRouter;

use crate::Result;
use crate::geo::Coordinate;
use crate::route::PlannedTrip;

/// Options for a transit routing request
#[derive(Debug, Clone, Copy)]
pub struct TransitOptions {
    /// Number of itineraries to request from the provider
    pub itinerary_count: u8,
}

impl Default for TransitOptions {
    fn default() -> Self {
        Self { itinerary_count: 1 }
    }
}

/// A pedestrian routing source
#[async_trait]
pub trait PedestrianRouter: Send + Sync {
    /// Fetch a walking route between two points
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when credentials are absent and
    /// `Error::Provider` when the provider returns no geometry or fails.
    async fn fetch(&self, start: Coordinate, goal: Coordinate) -> Result<PlannedTrip>;
}

/// A multimodal transit routing source
#[async_trait]
pub trait TransitRouter: Send + Sync {
    /// Fetch a walk/subway/bus route between two points
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when credentials are absent and
    /// `Error::Provider` when the provider returns no itinerary or fails.
    async fn fetch(
        &self,
        start: Coordinate,
        goal: Coordinate,
        opt: TransitOptions,
    ) -> Result<PlannedTrip>;
}
