use clap::Parser;
use easy_location::location::{
    platform_channel, ProviderKind, SimulatedPermissions, SimulatedProvider,
};
use easy_location::output::JsonLinesObserver;
use easy_location::{Coordinator, LocationConfig, LocationSession, SessionEnd, UpdateSettings};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// easyloc — permission-gated location updates against a simulated platform.
///
/// Creates a coordinator, attaches a JSON-printing observer, starts it,
/// answers the simulated permission prompt and prints each delivered
/// sample as one JSON line on stdout.
///
/// Examples:
///   easyloc
///   easyloc --samples 10 --interval-ms 200
///   easyloc --deny
///   easyloc --prefer gps --disable network
///   easyloc --lat 69.6492 --lon 18.9553 --pre-granted
#[derive(Parser)]
#[command(name = "easyloc", version, about, long_about = None)]
struct Cli {
    /// Simulated user denies the permission prompt.
    #[arg(long, conflicts_with = "pre_granted")]
    deny: bool,

    /// Platform already holds the permission; no prompt is shown.
    #[arg(long)]
    pre_granted: bool,

    /// Stop after this many delivered samples.
    #[arg(long, short = 'n', default_value_t = 5)]
    samples: usize,

    /// Route start latitude (-90 to 90).
    #[arg(long, allow_hyphen_values = true, default_value_t = 59.3293)]
    lat: f64,

    /// Route start longitude (-180 to 180).
    #[arg(long, allow_hyphen_values = true, default_value_t = 18.0686)]
    lon: f64,

    /// Minimum time between updates in milliseconds (overrides config).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Minimum distance between updates in meters (overrides config).
    #[arg(long)]
    min_distance: Option<f32>,

    /// Preferred provider, most preferred first. Repeatable (overrides config).
    #[arg(long = "prefer")]
    prefer: Vec<ProviderKind>,

    /// Provider the simulated platform reports as switched off. Repeatable.
    #[arg(long = "disable")]
    disable: Vec<ProviderKind>,

    /// Config file path. Defaults to <config_dir>/easy-location/config.json.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give up after this many milliseconds.
    #[arg(long, default_value_t = 90_000)]
    timeout_ms: u64,

    /// Debug logging on stderr.
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = easy_location::logging::init_logging(cli.verbose) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    if !(-90.0..=90.0).contains(&cli.lat) || !(-180.0..=180.0).contains(&cli.lon) {
        eprintln!("Error: Invalid coordinates. Lat: -90..90, Lon: -180..180");
        std::process::exit(1);
    }

    let settings = resolve_settings(&cli);

    // ── Wire up the simulated platform ──────────────────────────

    let (tx, rx) = platform_channel();
    let mut permissions = SimulatedPermissions::new(tx.clone(), !cli.deny);
    if cli.pre_granted {
        permissions = permissions.pre_granted();
    }
    let mut provider = SimulatedProvider::new(tx, cli.lat, cli.lon);
    for p in &cli.disable {
        provider.disable(*p);
    }

    let mut coordinator = Coordinator::with_settings(permissions, provider, settings);
    coordinator.set_observer(Some(Box::new(JsonLinesObserver::new(io::stdout()))));

    // ── Run ─────────────────────────────────────────────────────

    let mut session = LocationSession::new(coordinator, rx);
    let end = session
        .run(cli.samples, Duration::from_millis(cli.timeout_ms))
        .await;
    let provider_used = session.coordinator().active_provider();
    let stats = session.finish();

    let provider_label = provider_used
        .map(|p| p.to_string())
        .unwrap_or_else(|| "none".into());
    eprintln!(
        "  \u{1F4CD} Session ended: {} ({} delivered, {} dropped, provider: {})",
        end, stats.delivered, stats.dropped, provider_label
    );

    if end == SessionEnd::TimedOut && stats.delivered == 0 {
        eprintln!("  Hint: try a shorter --interval-ms or a longer --timeout-ms");
    }
}

fn resolve_settings(cli: &Cli) -> UpdateSettings {
    // Priority: command-line flags > config file > defaults

    let loaded = match &cli.config {
        Some(path) => LocationConfig::load_from(path),
        None => LocationConfig::load(),
    };
    let mut settings = loaded
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        })
        .updates;

    if let Some(ms) = cli.interval_ms {
        settings.min_interval_ms = ms;
    }
    if let Some(m) = cli.min_distance {
        settings.min_distance_m = m;
    }
    if !cli.prefer.is_empty() {
        settings.preferred_providers = cli.prefer.clone();
    }

    settings.validate().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    settings
}
