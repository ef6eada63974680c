//! Plate Scan CLI
//!
//! Runs scan rounds against a camera and the recognizer / registry
//! service: wait for a plate candidate, confirm it against the registry,
//! print the verdict, rescan. `--mock` swaps in a synthetic camera, a
//! scripted recognizer and an in-memory registry.

use clap::Parser;
use plate_scan::{
    activity::{ActivityEntry, ActivityLog, InMemoryActivityLog},
    capture::{
        CameraBackend, CameraManager, FileConfig, FrameSampler, MockBackend, Platform,
    },
    metrics::{MetricsRegistry, MetricsSnapshot},
    recognition::{BoundingBox, Recognition, RecognitionError, Recognizer, ScriptedRecognizer},
    registry::{InMemoryRegistry, NewVehicle, RegistryRecord, VehicleRegistry, VehicleType},
    scan::{ScanPipeline, Verdict},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Attempts at bringing the camera up before a round is abandoned.
const CAMERA_RETRIES: u32 = 3;

#[derive(Parser, Debug)]
#[command(name = "plate-scan", version, about = "Licence plate capture and registry check")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the recognizer / registry service
    #[arg(long)]
    api_url: Option<String>,

    /// Use the synthetic camera, a scripted recognizer and an in-memory registry
    #[arg(long)]
    mock: bool,

    /// User agent of the client platform, used for camera label handling
    #[arg(long, default_value = "")]
    user_agent: String,

    /// Number of scan rounds before exiting
    #[arg(long)]
    rounds: Option<u32>,

    /// Port for the Prometheus exporter (0 disables)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Directory for candidate previews and annotated frames
    #[arg(long)]
    save_preview: Option<PathBuf>,

    /// Log a call or report for every check under this name
    #[arg(long)]
    reporter: Option<String>,
}

#[cfg(feature = "metrics")]
type MetricsHandle = Option<Arc<tokio::sync::RwLock<plate_scan::metrics::MetricsState>>>;
#[cfg(not(feature = "metrics"))]
type MetricsHandle = Option<MetricsRegistry>;

struct RunSettings {
    rounds: u32,
    preview_dir: Option<PathBuf>,
    reporter: Option<String>,
    metrics: MetricsHandle,
}

#[derive(Debug, Default)]
struct Summary {
    rounds: u32,
    registered: u32,
    unregistered: u32,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Plate Scan v{}", plate_scan::VERSION);

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(url) = &args.api_url {
        config.backend.base_url = url.clone();
    }
    if let Some(rounds) = args.rounds {
        config.output.rounds = rounds;
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }

    // Sender stays alive even if the handler install fails
    let (stop, shutdown) = watch::channel(false);
    let stop = Arc::new(stop);
    let signal = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = signal.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    if let Some(dir) = &args.save_preview {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create preview directory: {}", e);
            std::process::exit(1);
        }
    }

    let settings = RunSettings {
        rounds: config.output.rounds.max(1),
        preview_dir: args.save_preview.clone(),
        reporter: args.reporter.clone(),
        metrics: start_metrics(config.output.metrics_port),
    };
    let platform = Platform::from_user_agent(&args.user_agent);

    let summary = if args.mock {
        info!("Running against the mock camera and scripted recognizer");
        run_mock(&config, platform, &settings, shutdown).await
    } else {
        match run_live(&config, platform, &settings, shutdown).await {
            Ok(summary) => summary,
            Err(message) => {
                eprintln!("{}", message);
                std::process::exit(1);
            }
        }
    };

    info!(
        "Completed {} round(s): {} registered, {} unregistered",
        summary.rounds, summary.registered, summary.unregistered
    );
    finish_metrics(&settings.metrics);
    drop(stop);
}

async fn run_mock(
    config: &FileConfig,
    platform: Platform,
    settings: &RunSettings,
    shutdown: watch::Receiver<bool>,
) -> Summary {
    let plates = ["12가3456", "34나5678"];
    let recognizer = ScriptedRecognizer::new().with_latency(Duration::from_millis(300));
    for round in 0..settings.rounds {
        let plate = plates[round as usize % plates.len()];
        recognizer
            .push_reply(Recognition::not_recognized())
            .push_failure(RecognitionError::Transport("connection reset".into()))
            .push_reply(Recognition::new(
                format!("서울{}", plate),
                Some(BoundingBox::new(180.0, 200.0, 460.0, 280.0)),
            ));
    }

    let mut resident = NewVehicle::unidentified("12가 3456", "010-1234-5678");
    resident.owner_name = "Kim Minjun".into();
    resident.dong = "101".into();
    resident.ho = "1203".into();
    resident.vehicle_type = VehicleType::Resident;
    let registry = InMemoryRegistry::new();
    if let Err(e) = registry.create(resident).await {
        warn!(error = %e, "Failed to seed registry");
    }

    let camera = CameraManager::new(MockBackend::default(), platform, &config.capture);
    let pipeline = ScanPipeline::new(camera, recognizer, registry, &config.scan);
    run(pipeline, InMemoryActivityLog::new(), settings, shutdown).await
}

#[cfg(all(feature = "camera", feature = "http"))]
async fn run_live(
    config: &FileConfig,
    platform: Platform,
    settings: &RunSettings,
    shutdown: watch::Receiver<bool>,
) -> Result<Summary, String> {
    use plate_scan::backend::{BackendClient, HttpActivityLog, HttpRecognizer, HttpRegistry};
    use plate_scan::capture::NativeBackend;

    if config.backend.base_url.is_empty() {
        return Err("Live mode needs a service URL (--api-url or [backend] base_url)".into());
    }
    let client = BackendClient::new(config.backend.normalized_base_url(), config.scan.timeout())
        .map_err(|e| format!("Failed to set up service client: {}", e))?;

    let camera = CameraManager::new(NativeBackend::new(), platform, &config.capture);
    let pipeline = ScanPipeline::new(
        camera,
        HttpRecognizer::new(client.clone()),
        HttpRegistry::new(client.clone()),
        &config.scan,
    );
    Ok(run(pipeline, HttpActivityLog::new(client), settings, shutdown).await)
}

#[cfg(not(all(feature = "camera", feature = "http")))]
async fn run_live(
    _config: &FileConfig,
    _platform: Platform,
    _settings: &RunSettings,
    _shutdown: watch::Receiver<bool>,
) -> Result<Summary, String> {
    Err("Live mode needs the `camera` and `http` features; use --mock otherwise".into())
}

async fn run<B, R, G, L>(
    mut pipeline: ScanPipeline<B, R, G>,
    activity: L,
    settings: &RunSettings,
    mut shutdown: watch::Receiver<bool>,
) -> Summary
where
    B: CameraBackend,
    R: Recognizer,
    G: VehicleRegistry,
    L: ActivityLog,
{
    let mut summary = Summary::default();

    for round in 1..=settings.rounds {
        let started = if round == 1 {
            pipeline.activate()
        } else {
            pipeline.rescan()
        };
        if let Err(e) = started {
            warn!(error = %e, "{}", e.notice().hint());
            if !bring_up_camera(&mut pipeline, &mut shutdown).await {
                error!("Camera unavailable, stopping");
                break;
            }
        }

        info!(round, "Scanning for a plate");
        let Some(candidate) = pipeline.run_until_candidate(&mut shutdown).await else {
            break;
        };

        if let Some(dir) = &settings.preview_dir {
            save_previews(&pipeline, dir, round).await;
        }

        let Some(verdict) = pipeline.confirm().await else {
            continue;
        };
        summary.rounds += 1;
        report(&candidate, &verdict);

        if let Some(reporter) = &settings.reporter {
            log_activity(&activity, &verdict, &candidate, reporter).await;
        }

        publish_metrics(
            &settings.metrics,
            &MetricsSnapshot::from_pipeline(
                &pipeline.stats(),
                pipeline.verdicts(),
                pipeline.status().await,
                pipeline.camera().is_live(),
            ),
        )
        .await;

        match verdict {
            Verdict::Registered(_) => summary.registered += 1,
            Verdict::Unregistered => summary.unregistered += 1,
        }
    }

    pipeline.deactivate();
    summary
}

/// Retries the camera a few times; false if it stayed down or shutdown was requested.
async fn bring_up_camera<B, R, G>(
    pipeline: &mut ScanPipeline<B, R, G>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool
where
    B: CameraBackend,
    R: Recognizer,
    G: VehicleRegistry,
{
    for attempt in 1..=CAMERA_RETRIES {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(2)) => {}
            _ = shutdown.changed() => return false,
        }
        match pipeline.retry_camera() {
            Ok(()) => return true,
            Err(e) => warn!(attempt, error = %e, "{}", e.notice().hint()),
        }
    }
    false
}

fn report(candidate: &str, verdict: &Verdict) {
    match verdict.record() {
        Some(record) => println!("{} registered: {}", candidate, describe(record)),
        None => println!("{} unregistered", candidate),
    }
}

fn describe(record: &RegistryRecord) -> String {
    format!(
        "{} ({}, unit {}, {})",
        record.plate_number,
        record.owner_name,
        record.unit_number(),
        record.vehicle_type.as_str()
    )
}

async fn log_activity<L: ActivityLog>(log: &L, verdict: &Verdict, candidate: &str, reporter: &str) {
    let entry = ActivityEntry::call_for(verdict, reporter).unwrap_or_else(|| {
        ActivityEntry::report(verdict, candidate, "unregistered vehicle", "", reporter)
    });
    if let Err(e) = log.append(entry).await {
        warn!(error = %e, "Failed to log activity");
    }
}

async fn save_previews<B, R, G>(pipeline: &ScanPipeline<B, R, G>, dir: &Path, round: u32)
where
    B: CameraBackend,
    R: Recognizer,
    G: VehicleRegistry,
{
    let (preview, overlay) = {
        let session = pipeline.session().await;
        (
            session.candidate().map(|c| c.preview().clone()),
            session.overlay().cloned(),
        )
    };

    if let Some(preview) = preview {
        write_png(&preview, &dir.join(format!("round-{}-plate.png", round)));
    }
    if let (Some(overlay), Some(frame)) = (overlay, pipeline.camera().sample()) {
        let mut annotated = frame.into_image();
        overlay.render(&mut annotated);
        write_png(&annotated, &dir.join(format!("round-{}-frame.png", round)));
    }
}

fn write_png(image: &image::RgbImage, path: &Path) {
    let result = plate_scan::capture::encode_png(image)
        .map_err(|e| e.to_string())
        .and_then(|bytes| std::fs::write(path, bytes).map_err(|e| e.to_string()));
    match result {
        Ok(()) => info!(path = %path.display(), "Preview saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to save preview"),
    }
}

#[cfg(feature = "metrics")]
fn start_metrics(port: u16) -> MetricsHandle {
    use plate_scan::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "Failed to create metrics registry");
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!(error = %e, "Metrics server stopped");
        }
    });
    Some(state)
}

#[cfg(not(feature = "metrics"))]
fn start_metrics(port: u16) -> MetricsHandle {
    if port == 0 {
        return None;
    }
    warn!("Built without the `metrics` feature; metrics will be printed at exit");
    MetricsRegistry::new()
        .map_err(|e| warn!(error = %e, "Failed to create metrics registry"))
        .ok()
}

#[cfg(feature = "metrics")]
async fn publish_metrics(handle: &MetricsHandle, snapshot: &MetricsSnapshot) {
    if let Some(state) = handle {
        state.read().await.update(snapshot);
    }
}

#[cfg(not(feature = "metrics"))]
async fn publish_metrics(handle: &MetricsHandle, snapshot: &MetricsSnapshot) {
    if let Some(registry) = handle {
        registry.update(snapshot);
    }
}

#[cfg(feature = "metrics")]
fn finish_metrics(_handle: &MetricsHandle) {}

#[cfg(not(feature = "metrics"))]
fn finish_metrics(handle: &MetricsHandle) {
    if let Some(registry) = handle {
        match registry.encode() {
            Ok(text) => println!("{}", text),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }
}
