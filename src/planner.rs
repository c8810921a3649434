//! Combined route planning
//!
//! Orchestrates the pedestrian and transit adapters, applies the
//! walk/transit decision policy and guarantees a single well-formed result
//! or a single well-formed error — never a partial route.

use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::geo::{self, Coordinate};
use crate::providers::{PedestrianRouter, TransitOptions, TransitRouter};
use crate::route::PlannedTrip;
use crate::{Error, Result};

/// Plans one unified trip from the available routing providers
pub struct RoutePlanner {
    pedestrian: Arc<dyn PedestrianRouter>,
    transit: Arc<dyn TransitRouter>,
    config: PlannerConfig,
}

impl RoutePlanner {
    #[must_use]
    pub fn new(
        pedestrian: Arc<dyn PedestrianRouter>,
        transit: Arc<dyn TransitRouter>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            pedestrian,
            transit,
            config,
        }
    }

    /// Plan a trip between two points
    ///
    /// Policy, by straight-line distance `d`:
    /// 1. `d` within the walk cutoff: pedestrian only, transit is not tried.
    /// 2. Otherwise attempt transit; if its time exceeds the configured
    ///    ratio of a naive walking estimate, the pedestrian result is
    ///    returned instead, annotated with the transit time.
    /// 3. Transit failure or a degenerate transit route falls back to the
    ///    pedestrian result, annotated with the reason.
    ///
    /// # Errors
    ///
    /// Fails only when both providers fail.
    pub async fn plan(&self, start: Coordinate, goal: Coordinate) -> Result<PlannedTrip> {
        let crow_flies_m = geo::haversine_m(start, goal);

        if crow_flies_m <= self.config.walk_cutoff_m {
            tracing::debug!(distance_m = crow_flies_m, "within walk cutoff, pedestrian only");
            return self.pedestrian.fetch(start, goal).await;
        }

        let fallback_reason = match self
            .transit
            .fetch(start, goal, TransitOptions::default())
            .await
        {
            Ok(transit) if transit.route.coord_count() >= 2 => {
                let walk_min = naive_walk_minutes(crow_flies_m, self.config.walk_speed_m_per_h);
                let transit_min = f64::from(transit.summary.total_time_min);

                if transit_min > walk_min * self.config.transit_walk_ratio {
                    tracing::info!(
                        transit_min,
                        walk_min,
                        "transit barely faster than walking, preferring pedestrian"
                    );
                    return match self.pedestrian.fetch(start, goal).await {
                        Ok(mut trip) => {
                            trip.summary.alternative_available = true;
                            trip.summary.alternative_time_min =
                                Some(transit.summary.total_time_min);
                            Ok(trip)
                        }
                        // Transit was valid, just slow; still better than failing
                        Err(e) => {
                            tracing::warn!(error = %e, "pedestrian refetch failed, keeping transit");
                            Ok(transit)
                        }
                    };
                }

                return Ok(transit);
            }
            Ok(transit) => {
                tracing::warn!(
                    coords = transit.route.coord_count(),
                    "transit route degenerate, falling back to pedestrian"
                );
                "transit returned too few coordinates".to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "transit unavailable, falling back to pedestrian");
                format!("transit unavailable: {e}")
            }
        };

        match self.pedestrian.fetch(start, goal).await {
            Ok(mut trip) => {
                trip.summary.fallback_reason = Some(fallback_reason);
                Ok(trip)
            }
            Err(pedestrian_err) => Err(Error::Provider(format!(
                "both providers failed: {fallback_reason}; pedestrian: {pedestrian_err}"
            ))),
        }
    }
}

/// Naive walking-time estimate in minutes for a straight-line distance
fn naive_walk_minutes(distance_m: f64, speed_m_per_h: f64) -> f64 {
    distance_m / speed_m_per_h * 60.0
}
