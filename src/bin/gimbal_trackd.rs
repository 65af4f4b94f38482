//! gimbal_trackd - face tracking gimbal daemon
//!
//! This daemon:
//! 1. Loads configuration (file named by --config or GIMBAL_CONFIG, then env)
//! 2. Opens the frame source and the configured detector backend
//! 3. Connects to the actuator, retrying per the reconnect policy
//! 4. Tracks the largest face until Ctrl-C or the source runs out
//! 5. Parks the gimbal with a neutral command and closes the port

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gimbal_tracker::detect::BackendRegistry;
use gimbal_tracker::transport::ConsoleTransport;
use gimbal_tracker::{
    build_transport, open_source, Dispatcher, Mode, StopSignal, Tracker, TrackerConfig,
    TrackingLoop, Transport,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Track the largest face with a two-axis gimbal")]
struct Args {
    /// JSON or TOML config file.
    #[arg(long, env = "GIMBAL_CONFIG")]
    config: Option<PathBuf>,

    /// Print command frames to stdout instead of writing to the actuator.
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Control mode (absolute_angle or rate_command).
    #[arg(long)]
    mode: Option<Mode>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = TrackerConfig::load_from(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.control.mode = mode;
    }
    if let Some(max_frames) = args.max_frames {
        config.source.max_frames = Some(max_frames);
    }
    config.validate()?;

    let mut registry = BackendRegistry::from_settings(&config.detector)?;
    log::info!("detector backends available: {}", registry.list().join(", "));
    let detector = registry.take(&config.detector.backend)?;

    let mut source = open_source(&config.source, config.frame)?;
    source.connect()?;

    let transport: Box<dyn Transport> = if args.dry_run {
        log::info!("dry run: command frames go to stdout");
        Box::new(ConsoleTransport::stdout())
    } else {
        build_transport(&config.transport)
    };
    let dispatcher = Dispatcher::new(transport);
    let tracker = Tracker::new(config.tracker_settings())?;

    let mut tracking = TrackingLoop::new(tracker, detector, config.detector.params, dispatcher);

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.request_stop())
        .context("error setting Ctrl-C handler")?;

    tracking.connect(&config.transport.reconnect)?;
    let stats = tracking.run(source.as_mut(), &stop)?;

    log::info!(
        "gimbal_trackd stopped: processed={} sent={} no_target={} tx_failures={} rejected={} boxes_dropped={} parked={}",
        stats.frames_processed,
        stats.commands_sent,
        stats.frames_without_target,
        stats.transmission_failures,
        stats.frames_rejected,
        stats.boxes_discarded,
        stats.neutral_sent
    );
    Ok(())
}
