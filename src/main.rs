use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use wayline::nav::Navigator;
use wayline::poi::{HttpSearchBackend, PoiResolver};
use wayline::providers::{HttpPedestrianRouter, HttpTransitRouter, PedestrianRouter};
use wayline::route::PlannedTrip;
use wayline::voice::{ConsoleSpeaker, HttpTts, Narrator, Speaker};
use wayline::{Config, Coordinate, RoutePlanner};

/// Wayline - Voice-guided pedestrian and transit navigation
#[derive(Parser)]
#[command(name = "wayline", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a place
    Search {
        /// Free-text place query
        query: String,
        /// Reference position as "lat,lon"; ranks nearer candidates higher
        #[arg(short, long)]
        near: Option<String>,
    },
    /// Plan a route and print its instructions
    Route {
        /// Start position as "lat,lon"
        from: String,
        /// Goal position as "lat,lon"
        to: String,
    },
    /// Plan a route and simulate walking it with narration
    Navigate {
        /// Start position as "lat,lon"
        from: String,
        /// Goal position as "lat,lon"
        to: String,
        /// Milliseconds between simulated position updates
        #[arg(long, default_value = "300")]
        interval_ms: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,wayline=info",
        1 => "info,wayline=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    match cli.command {
        Command::Search { query, near } => cmd_search(&config, &query, near.as_deref()).await,
        Command::Route { from, to } => cmd_route(&config, &from, &to).await,
        Command::Navigate {
            from,
            to,
            interval_ms,
        } => cmd_navigate(&config, &from, &to, interval_ms).await,
        Command::TestTts { text } => cmd_test_tts(&config, &text).await,
    }
}

/// Parse a "lat,lon" argument
fn parse_position(raw: &str) -> anyhow::Result<Coordinate> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("expected \"lat,lon\", got {raw:?}"))?;
    Coordinate::parse(lat.trim(), lon.trim())
        .ok_or_else(|| anyhow::anyhow!("invalid coordinates {raw:?}"))
}

fn build_planner(config: &Config) -> anyhow::Result<RoutePlanner> {
    let pedestrian: Arc<dyn PedestrianRouter> = Arc::new(HttpPedestrianRouter::new(
        config.endpoints.pedestrian_route.clone(),
        config.api_keys.route.clone(),
    )?);
    let transit = Arc::new(HttpTransitRouter::new(
        config.endpoints.transit_route.clone(),
        config.api_keys.transit.clone(),
        Arc::clone(&pedestrian),
    )?);
    Ok(RoutePlanner::new(
        pedestrian,
        transit,
        config.planner.clone(),
    ))
}

/// TTS-backed speaker when credentials exist, console otherwise
fn build_speaker(config: &Config) -> anyhow::Result<Arc<dyn Speaker>> {
    if config.api_keys.tts.is_empty() {
        tracing::info!("no TTS API key configured, narrating to console");
        return Ok(Arc::new(ConsoleSpeaker));
    }

    Ok(Arc::new(HttpTts::new(
        config.endpoints.tts.clone(),
        config.api_keys.tts.clone(),
        config.narration.tts_voice.clone(),
        config.narration.tts_speed,
    )?))
}

/// Search for a place and print the ranked candidates
async fn cmd_search(config: &Config, query: &str, near: Option<&str>) -> anyhow::Result<()> {
    let reference = near.map(parse_position).transpose()?;

    let backend = Arc::new(HttpSearchBackend::new(
        config.endpoints.place_search.clone(),
        config.endpoints.coord_transform.clone(),
        config.api_keys.search.clone(),
    )?);
    let resolver = PoiResolver::new(backend);

    let candidates = resolver.resolve(query, reference).await;
    if candidates.is_empty() {
        println!("No places found for {query:?}");
        return Ok(());
    }

    for (i, c) in candidates.iter().enumerate() {
        let distance = c
            .distance_m
            .map(|d| format!(" ({:.0} m away)", d))
            .unwrap_or_default();
        println!(
            "{}. {} — {} [score {:.0}]{}",
            i + 1,
            c.name,
            c.full_address,
            c.score,
            distance
        );
        println!(
            "   {:.6}, {:.6}",
            c.position.latitude(),
            c.position.longitude()
        );
    }

    Ok(())
}

/// Plan a route and print the summary plus each instruction
async fn cmd_route(config: &Config, from: &str, to: &str) -> anyhow::Result<()> {
    let start = parse_position(from)?;
    let goal = parse_position(to)?;

    let planner = build_planner(config)?;
    let trip = planner.plan(start, goal).await?;

    print_summary(&trip);
    for (i, inst) in trip.instructions.iter().enumerate() {
        println!("{:3}. {}", i + 1, inst.description);
    }

    Ok(())
}

/// Plan a route, then replay its polyline as simulated position updates
async fn cmd_navigate(
    config: &Config,
    from: &str,
    to: &str,
    interval_ms: u64,
) -> anyhow::Result<()> {
    let start = parse_position(from)?;
    let goal = parse_position(to)?;

    let planner = build_planner(config)?;
    let trip = planner.plan(start, goal).await?;
    print_summary(&trip);

    let speaker = build_speaker(config)?;
    let narrator = Arc::new(Narrator::new(speaker, &config.narration));
    let mut navigator = Navigator::new(Arc::clone(&narrator), &config.narration);

    if !navigator.start(&trip)? {
        anyhow::bail!("navigation start was suppressed");
    }

    // Replay the trip in guidance order, paced to let narration keep up
    let positions = wayline::nav::replay_positions(&trip);

    let mut updates = Box::pin(
        tokio_stream::iter(positions).throttle(Duration::from_millis(interval_ms)),
    );
    while let Some(position) = updates.next().await {
        navigator.on_position(position);
        if !navigator.is_navigating() {
            break;
        }
    }

    if navigator.is_navigating() {
        tracing::warn!("route replay ended before arrival was detected");
        navigator.stop();
    }

    // Let the queue drain before tearing the worker down
    tokio::time::sleep(Duration::from_millis(500)).await;
    narrator.shutdown().await;

    Ok(())
}

fn print_summary(trip: &PlannedTrip) {
    let s = &trip.summary;
    println!(
        "{:?} route: {:.0} m, about {} min",
        s.transport_type, s.total_distance_m, s.total_time_min
    );
    if let Some(reason) = &s.fallback_reason {
        println!("  (fallback: {reason})");
    }
    if s.alternative_available {
        if let Some(min) = s.alternative_time_min {
            println!("  (transit alternative available, about {min} min)");
        }
    }
}

/// Test TTS output
async fn cmd_test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = HttpTts::new(
        config.endpoints.tts.clone(),
        config.api_keys.tts.clone(),
        config.narration.tts_voice.clone(),
        config.narration.tts_speed,
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    // Check MP3 header
    if mp3_data.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            mp3_data[0], mp3_data[1], mp3_data[2], mp3_data[3]
        );
    }

    println!("\n---");
    println!("If the byte count is nonzero, TTS is working!");

    Ok(())
}
