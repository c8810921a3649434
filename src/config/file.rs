//! TOML configuration file loading
//!
//! Supports `~/.config/wayline/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct WaylineConfigFile {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Provider endpoint overrides
    #[serde(default)]
    pub endpoints: EndpointsFileConfig,

    /// Route planning thresholds
    #[serde(default)]
    pub planner: PlannerFileConfig,

    /// Narration and live-tracking tuning
    #[serde(default)]
    pub narration: NarrationFileConfig,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    /// Pedestrian routing provider app key
    pub route: Option<String>,

    /// Transit routing provider app key
    pub transit: Option<String>,

    /// Place search provider app key
    pub search: Option<String>,

    /// TTS provider API key
    pub tts: Option<String>,
}

/// Provider endpoint URLs
#[derive(Debug, Default, Deserialize)]
pub struct EndpointsFileConfig {
    pub pedestrian_route: Option<String>,
    pub transit_route: Option<String>,
    pub place_search: Option<String>,
    pub coord_transform: Option<String>,
    pub tts: Option<String>,
}

/// Route planning thresholds
#[derive(Debug, Default, Deserialize)]
pub struct PlannerFileConfig {
    /// Straight-line distance below which transit is never tried, meters
    pub walk_cutoff_m: Option<f64>,

    /// Transit time must beat this multiple of the walking estimate
    pub transit_walk_ratio: Option<f64>,

    /// Naive walking speed, meters per hour
    pub walk_speed_m_per_h: Option<f64>,

    /// Destination confirmation timeout, seconds
    pub confirm_timeout_s: Option<u64>,
}

/// Narration and live-tracking tuning
#[derive(Debug, Default, Deserialize)]
pub struct NarrationFileConfig {
    /// TTS voice identifier
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Duplicate-utterance suppression window, milliseconds
    pub dedupe_window_ms: Option<u64>,

    /// Watchdog budget as a multiple of estimated playback time
    pub watchdog_factor: Option<f64>,

    /// Instruction advance radius, meters
    pub advance_radius_m: Option<f64>,

    /// Arrival detection radius, meters
    pub arrival_radius_m: Option<f64>,

    /// Duplicate route-start suppression window, milliseconds
    pub start_debounce_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `WaylineConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> WaylineConfigFile {
    let Some(path) = config_file_path() else {
        return WaylineConfigFile::default();
    };

    if !path.exists() {
        return WaylineConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                WaylineConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            WaylineConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/wayline/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("wayline").join("config.toml"))
}
