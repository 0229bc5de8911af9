use anyhow::Result;
use clap::{Parser, ValueEnum};
use scancam::canvas::load_font;
use scancam::{
    BarcodeFormat, CameraError, CaptureCoordinator, Collaborators, DisplayRotation, EventBus,
    HostEvent, InactivityTimer, KeyboardInputHandler, LoggingFeedback, RasterImage, ScanEvent,
    ScanMode, ScanOutcome, ScancamConfig, SessionKey, SessionRuntime, SimulatedCamera,
    SimulatedDecodeWorker, SimulationConfig, SurfaceHandle, ViewfinderRenderer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "scancam")]
#[command(about = "Barcode capture session with a live viewfinder overlay")]
#[command(version)]
#[command(long_about = "Runs a capture session against a simulated camera and decode worker. \
The viewfinder overlay is rendered into an in-memory display surface that can be saved as PNG, \
and the session ends with either the decoded text or a cancellation.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scancam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting a session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Text the simulated decoder finds
    #[arg(long, default_value = "SCANCAM-DEMO", help = "Payload the simulated decoder reports")]
    payload: String,

    /// Override the scan mode from the configuration
    #[arg(long, value_name = "MODE", help = "Scan mode: continuous or single-shot")]
    mode: Option<String>,

    /// Failed attempts before the payload decodes
    #[arg(long, default_value_t = 1, help = "Number of failed decode attempts before success")]
    fail_attempts: u32,

    /// Make the simulated camera fail to open
    #[arg(long, help = "Simulate a camera driver failure on open")]
    fail_camera: bool,

    /// Save the display surface as PNG when the session ends
    #[arg(long, value_name = "PNG", help = "Write the final overlay frame to this PNG file")]
    snapshot: Option<String>,

    /// Read hardware keys from the terminal
    #[arg(long, help = "Enable terminal keys: ESC/q cancel, UP/DOWN torch")]
    keyboard: bool,

    /// Print the outcome as JSON
    #[arg(long, help = "Print the session outcome and events as JSON")]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// One JSON object per line, with the active session span
    Json,
    /// Multi-line human readable output
    Pretty,
    /// Single-line output without targets
    Compact,
}

impl Args {
    fn log_level(&self) -> &'static str {
        match (self.debug, self.verbose, self.quiet) {
            (true, _, _) => "debug",
            (_, true, _) => "info",
            (_, _, true) => "error",
            _ => "warn",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting scancam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match ScancamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(mode) = args.mode.as_deref() {
        config.session.mode = match mode {
            "continuous" => ScanMode::Continuous,
            "single-shot" | "single_shot" => ScanMode::SingleShot,
            other => anyhow::bail!("Unknown scan mode '{}'", other),
        };
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }
    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let outcome = run_session(&args, config).await?;

    if args.json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        match &outcome {
            ScanOutcome::Success { text } => println!("✓ Scanned: {}", text),
            ScanOutcome::Cancelled => println!("✗ Scan cancelled"),
        }
    }

    let exit_code = match outcome {
        ScanOutcome::Success { .. } => 0,
        ScanOutcome::Cancelled => 1,
    };
    std::process::exit(exit_code);
}

async fn run_session(args: &Args, config: ScancamConfig) -> Result<ScanOutcome> {
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let event_bus = Arc::new(if args.debug {
        EventBus::with_debug_logging(64)
    } else {
        EventBus::default()
    });

    spawn_event_observer(&event_bus, host_tx.clone(), args.json);

    // Display surface the overlay is rendered into
    let (width, height) = config.display.resolution;
    let mut display = RasterImage::new(width, height);
    if let Some(path) = &config.viewfinder.tip_text_font_path {
        match load_font(path) {
            Ok(font) => display = display.with_font(font),
            Err(e) => warn!("Prompt font unavailable, using metrics fallback: {}", e),
        }
    }
    let mut runtime = SessionRuntime::new(host_rx, display);

    let keyboard = if args.keyboard {
        let handler = KeyboardInputHandler::new(host_tx.clone());
        handler.start().await?;
        Some(handler)
    } else {
        None
    };

    // Ctrl+C cancels like the back key
    let ctrl_c_tx = host_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT signal (Ctrl+C)");
            let _ = ctrl_c_tx.send(HostEvent::Key(SessionKey::Back));
        }
    });

    let simulation = SimulationConfig {
        payload: args.payload.clone(),
        format: BarcodeFormat::Code128,
        fail_attempts: args.fail_attempts,
        decode_time: Duration::from_millis(600),
        frame_size: config.display.preview_resolution,
    };

    // The host brings the first session to the foreground with a surface
    for event in [
        HostEvent::Foreground,
        HostEvent::SurfaceReady(Some(SurfaceHandle(1))),
    ] {
        host_tx
            .send(event)
            .map_err(|_| anyhow::anyhow!("Session loop closed before start"))?;
    }

    let fail_camera = args.fail_camera;
    let outcome = runtime
        .launch(|dispatch| {
            let renderer = ViewfinderRenderer::new(config.viewfinder.clone())?;
            let points = renderer.points_handle();

            let camera = SimulatedCamera::new(config.display.clone());
            if fail_camera {
                camera.fail_next_open(CameraError::DriverIo {
                    details: "simulated driver failure".to_string(),
                });
            }

            let idle_tx = host_tx.clone();
            let collaborators = Collaborators {
                camera: Box::new(camera),
                feedback: Box::new(LoggingFeedback::new()),
                idle: Box::new(InactivityTimer::new(
                    config.session.inactivity_timeout(),
                    move || {
                        let _ = idle_tx.send(HostEvent::IdleTimeout);
                    },
                )),
                decoder: Box::new(SimulatedDecodeWorker::new(
                    simulation.clone(),
                    host_tx.clone(),
                    points,
                )),
                dispatch: Box::new(dispatch),
            };

            Ok(CaptureCoordinator::new(
                config.session.clone(),
                renderer,
                DisplayRotation::Rotation0,
                collaborators,
                Arc::clone(&event_bus),
            ))
        })
        .await?;

    if let Some(handler) = keyboard {
        handler.stop().await?;
    }

    if let Some(path) = &args.snapshot {
        runtime.canvas().save(path)?;
        info!("Saved overlay snapshot to {}", path);
    }

    Ok(outcome)
}

/// Acts as the host UI: dismisses fatal notices and echoes events
fn spawn_event_observer(
    event_bus: &Arc<EventBus>,
    host_tx: mpsc::UnboundedSender<HostEvent>,
    json: bool,
) {
    let mut receiver = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if json {
                if let Ok(line) = serde_json::to_string(&event) {
                    eprintln!("{}", line);
                }
            }

            if let ScanEvent::FatalNotice { message } = &event {
                eprintln!("Camera error: {}", message);
                let _ = host_tx.send(HostEvent::NoticeDismissed);
            }
        }
    });
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // RUST_LOG wins over the command-line level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("scancam={}", args.log_level()))?,
    };

    // Source locations only help when debugging the session loop
    let located = args.debug;
    let layer = match args.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_names(located)
            .with_file(located)
            .with_line_number(located)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Scancam Configuration File");
    println!("# This is the default configuration with all available options.");
    println!("# Colours are 32-bit ARGB integers; every key may also be set through");
    println!("# SCANCAM__<SECTION>__<KEY> environment variables.");
    println!();
    println!("{}", toml::to_string_pretty(&ScancamConfig::default())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_flags_select_level_and_format() {
        let args = Args::try_parse_from(["scancam"]).unwrap();
        assert_eq!(args.log_level(), "warn");
        assert_eq!(args.log_format, LogFormat::Pretty);

        let args = Args::try_parse_from(["scancam", "--debug", "--quiet", "--log-format", "json"]).unwrap();
        assert_eq!(args.log_level(), "debug");
        assert_eq!(args.log_format, LogFormat::Json);

        let args = Args::try_parse_from(["scancam", "-q", "--log-format", "compact"]).unwrap();
        assert_eq!(args.log_level(), "error");
        assert_eq!(args.log_format, LogFormat::Compact);

        assert!(Args::try_parse_from(["scancam", "--log-format", "xml"]).is_err());
    }
}
