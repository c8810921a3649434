//! Wayline - Voice-guided pedestrian and transit navigation
//!
//! This library provides the core functionality for the Wayline assistant:
//! - Place search with scored ranking and query broadening
//! - Pedestrian and transit routing via external HTTP providers
//! - Route normalization into a uniform spoken-instruction sequence
//! - Live progress tracking against position updates
//! - Serialized, interruptible speech narration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      CLI                             │
//! │   search  │  route  │  navigate  │  test-tts        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Wayline Core                       │
//! │   Planner  │  POI  │  Normalizer  │  Nav  │  Voice  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External Providers                      │
//! │   Pedestrian  │  Transit  │  Search  │  TTS         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod nav;
pub mod planner;
pub mod poi;
pub mod providers;
pub mod route;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::Coordinate;
pub use nav::{NavEvent, Navigator, ProgressTracker, TrackerState};
pub use planner::RoutePlanner;
pub use poi::{Candidate, HttpSearchBackend, PoiResolver, SearchBackend};
pub use providers::{
    HttpPedestrianRouter, HttpTransitRouter, PedestrianRouter, TransitOptions, TransitRouter,
};
pub use route::{
    Instruction, InstructionKind, PlannedTrip, Route, RouteSummary, TransportType,
};
pub use voice::{ConsoleSpeaker, HttpTts, Narrator, Speaker};
