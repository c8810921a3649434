//! Configuration management
//!
//! Settings are resolved in priority order:
//! 1. Environment variables (`WAYLINE_*`)
//! 2. TOML config file (`~/.config/wayline/config.toml`)
//! 3. Built-in defaults

mod file;

use std::time::Duration;

use url::Url;

use crate::{Error, Result};

pub use file::{config_file_path, load_config_file, WaylineConfigFile};

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: ApiKeys,
    pub endpoints: Endpoints,
    pub planner: PlannerConfig,
    pub narration: NarrationConfig,
}

/// API keys for the external providers
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Pedestrian routing provider app key
    pub route: String,
    /// Transit routing provider app key
    pub transit: String,
    /// Place search provider app key
    pub search: String,
    /// TTS provider API key (optional; console narration without it)
    pub tts: String,
}

/// Provider endpoint URLs
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub pedestrian_route: Url,
    pub transit_route: Url,
    pub place_search: Url,
    pub coord_transform: Url,
    pub tts: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        // Default endpoints are infallible to parse
        Self {
            pedestrian_route: Url::parse("https://apis.openapi.sk.com/tmap/routes/pedestrian")
                .unwrap(),
            transit_route: Url::parse("https://apis.openapi.sk.com/transit/routes").unwrap(),
            place_search: Url::parse("https://apis.openapi.sk.com/tmap/pois").unwrap(),
            coord_transform: Url::parse(
                "https://apis.openapi.sk.com/tmap/geo/coordconvert",
            )
            .unwrap(),
            tts: Url::parse("https://api.openai.com/v1/audio/speech").unwrap(),
        }
    }
}

/// Route planning thresholds
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Below this straight-line distance transit is never attempted, meters
    pub walk_cutoff_m: f64,
    /// Transit must beat this multiple of the naive walking time
    pub transit_walk_ratio: f64,
    /// Naive walking speed used for the comparison, meters per hour
    pub walk_speed_m_per_h: f64,
    /// How long a destination confirmation stays valid, seconds
    pub confirm_timeout_s: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            walk_cutoff_m: 500.0,
            transit_walk_ratio: 1.5,
            walk_speed_m_per_h: 4000.0,
            confirm_timeout_s: 10,
        }
    }
}

/// Narration and live-tracking tuning
#[derive(Debug, Clone)]
pub struct NarrationConfig {
    /// TTS voice identifier
    pub tts_voice: String,
    /// TTS speed multiplier
    pub tts_speed: f32,
    /// Identical utterances inside this window are dropped
    pub dedupe_window: Duration,
    /// Watchdog budget as a multiple of the estimated playback time
    pub watchdog_factor: f64,
    /// A position this close to the next instruction advances it, meters
    pub advance_radius_m: f64,
    /// A position this close to the destination ends the trip, meters
    pub arrival_radius_m: f64,
    /// Route-start triggers inside this window are suppressed
    pub start_debounce: Duration,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            dedupe_window: Duration::from_secs(3),
            watchdog_factor: 1.6,
            advance_radius_m: 20.0,
            arrival_radius_m: 10.0,
            start_debounce: Duration::from_millis(400),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and the config file
    ///
    /// # Errors
    ///
    /// Returns error if an endpoint override is not a valid URL.
    pub fn load() -> Result<Self> {
        Self::from_sources(&load_config_file())
    }

    /// Resolve configuration against a parsed file overlay
    ///
    /// # Errors
    ///
    /// Returns error if an endpoint override is not a valid URL.
    pub fn from_sources(file: &WaylineConfigFile) -> Result<Self> {
        let api_keys = ApiKeys {
            route: env_or("WAYLINE_ROUTE_APP_KEY", file.api_keys.route.as_deref()),
            transit: env_or("WAYLINE_TRANSIT_APP_KEY", file.api_keys.transit.as_deref()),
            search: env_or("WAYLINE_SEARCH_APP_KEY", file.api_keys.search.as_deref()),
            tts: env_or("WAYLINE_TTS_API_KEY", file.api_keys.tts.as_deref()),
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            pedestrian_route: endpoint_or(
                "WAYLINE_ROUTE_ENDPOINT",
                file.endpoints.pedestrian_route.as_deref(),
                defaults.pedestrian_route,
            )?,
            transit_route: endpoint_or(
                "WAYLINE_TRANSIT_ENDPOINT",
                file.endpoints.transit_route.as_deref(),
                defaults.transit_route,
            )?,
            place_search: endpoint_or(
                "WAYLINE_SEARCH_ENDPOINT",
                file.endpoints.place_search.as_deref(),
                defaults.place_search,
            )?,
            coord_transform: endpoint_or(
                "WAYLINE_TRANSFORM_ENDPOINT",
                file.endpoints.coord_transform.as_deref(),
                defaults.coord_transform,
            )?,
            tts: endpoint_or(
                "WAYLINE_TTS_ENDPOINT",
                file.endpoints.tts.as_deref(),
                defaults.tts,
            )?,
        };

        let planner_defaults = PlannerConfig::default();
        let planner = PlannerConfig {
            walk_cutoff_m: file
                .planner
                .walk_cutoff_m
                .unwrap_or(planner_defaults.walk_cutoff_m),
            transit_walk_ratio: file
                .planner
                .transit_walk_ratio
                .unwrap_or(planner_defaults.transit_walk_ratio),
            walk_speed_m_per_h: file
                .planner
                .walk_speed_m_per_h
                .unwrap_or(planner_defaults.walk_speed_m_per_h),
            confirm_timeout_s: file
                .planner
                .confirm_timeout_s
                .unwrap_or(planner_defaults.confirm_timeout_s),
        };

        let narration_defaults = NarrationConfig::default();
        let narration = NarrationConfig {
            tts_voice: file
                .narration
                .tts_voice
                .clone()
                .unwrap_or(narration_defaults.tts_voice),
            tts_speed: file
                .narration
                .tts_speed
                .unwrap_or(narration_defaults.tts_speed),
            dedupe_window: file
                .narration
                .dedupe_window_ms
                .map_or(narration_defaults.dedupe_window, Duration::from_millis),
            watchdog_factor: file
                .narration
                .watchdog_factor
                .unwrap_or(narration_defaults.watchdog_factor),
            advance_radius_m: file
                .narration
                .advance_radius_m
                .unwrap_or(narration_defaults.advance_radius_m),
            arrival_radius_m: file
                .narration
                .arrival_radius_m
                .unwrap_or(narration_defaults.arrival_radius_m),
            start_debounce: file
                .narration
                .start_debounce_ms
                .map_or(narration_defaults.start_debounce, Duration::from_millis),
        };

        Ok(Self {
            api_keys,
            endpoints,
            planner,
            narration,
        })
    }
}

/// Env var wins over the file value; empty string otherwise
fn env_or(var: &str, file_value: Option<&str>) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| file_value.map(String::from))
        .unwrap_or_default()
}

/// Resolve an endpoint: env var, then file, then the built-in default
fn endpoint_or(var: &str, file_value: Option<&str>, default: Url) -> Result<Url> {
    let Some(raw) = std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| file_value.map(String::from))
    else {
        return Ok(default);
    };

    Url::parse(&raw).map_err(|e| Error::Config(format!("invalid endpoint URL {raw:?}: {e}")))
}
