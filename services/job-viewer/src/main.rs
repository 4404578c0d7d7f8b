//! Headless forecast job viewer.
//!
//! Loads one job from the forecast API and drives a viewer session against
//! a headless map:
//! - Groups the job's layers by variable and level
//! - Fetches each frame of the shown group once, in the background
//! - Reduces wind fields to the map's level of detail
//! - Steps or plays the timeline and logs what is on screen

mod config;
mod http_source;
mod viewport;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use frame_cache::{ViewerEvent, ViewerSession, Viewport};
use viewer_common::{BoundingBox, ValidTime};

use crate::http_source::HttpDataSource;
use crate::viewport::{HeadlessViewport, LogPresenter};

#[derive(Parser, Debug)]
#[command(name = "job-viewer")]
#[command(about = "Load a forecast job and animate its layers headlessly")]
struct Args {
    /// Job to load
    job_id: String,

    /// Forecast API endpoint
    #[arg(long, env = "VIEWER_API_URL", default_value = "http://localhost:8080/api")]
    api_url: String,

    /// YAML viewer configuration
    #[arg(long, env = "VIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// Variable to show (default: first group of the job)
    #[arg(short, long)]
    variable: Option<String>,

    /// Vertical level to show (default: lowest available)
    #[arg(long)]
    level: Option<i32>,

    /// Start at the frame nearest this ISO 8601 time
    #[arg(long)]
    time: Option<String>,

    /// Map zoom (default: fit the job domain)
    #[arg(long)]
    zoom: Option<f64>,

    /// Screen size as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x800")]
    size: String,

    /// Number of single steps to take after loading
    #[arg(long, default_value = "0")]
    steps: u32,

    /// Play the animation for this many milliseconds
    #[arg(long)]
    play_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    request_timeout: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Expose Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(port) = args.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "Prometheus metrics exporter initialized");
    }

    let config = config::load_config(args.config.as_deref())?;
    let size = parse_size(&args.size)?;

    info!(job_id = %args.job_id, api_url = %args.api_url, "Starting job viewer");

    let source = Arc::new(HttpDataSource::new(
        args.api_url.clone(),
        Duration::from_secs(args.request_timeout),
    )?);

    let viewport = HeadlessViewport::new(0.0, 0.0, 0.0, size);
    let mut session = ViewerSession::new(config, source, viewport, Arc::new(LogPresenter));
    let ready = session.ready();

    session.load_job(&args.job_id).await?;
    let job = ready
        .wait()
        .await
        .ok_or_else(|| anyhow!("job {} never became ready", args.job_id))?;

    // Place the map before any frame is fetched so wind fields are reduced
    // for the real view
    session.viewport_mut().fit_job(&job);
    if let Some(zoom) = args.zoom {
        session.viewport_mut().set_zoom(zoom);
    }

    let variable = match &args.variable {
        Some(variable) => variable.clone(),
        None => session
            .catalog()
            .groups()
            .next()
            .map(|g| g.variable().to_string())
            .ok_or_else(|| anyhow!("job {} has no layers", args.job_id))?,
    };

    session.show_group(&variable, args.level)?;
    let fetched = session.drain_fetches().await;
    report_group(&session, &variable, fetched);

    if let Some(time) = &args.time {
        let target = ValidTime::parse_iso8601(time)?;
        let selected = session.select_nearest(target.millis());
        info!(requested = %target, selected = ?selected.map(|t| t.to_string()), "Selected time");
    }

    for _ in 0..args.steps {
        let time = session.step(1);
        report_frame(&session, time);
    }

    if let Some(play_ms) = args.play_ms {
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let _ = tx.send(ViewerEvent::Play).await;
            tokio::time::sleep(Duration::from_millis(play_ms)).await;
            let _ = tx.send(ViewerEvent::Pause).await;
            let _ = tx.send(ViewerEvent::Shutdown).await;
        });
        session.run(rx).await;
        report_frame(&session, session.animation().selected_time());
    }

    Ok(())
}

fn parse_size(size: &str) -> Result<(u32, u32)> {
    let (w, h) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("size must look like WIDTHxHEIGHT, got {}", size))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

fn report_group(session: &ViewerSession<HeadlessViewport>, variable: &str, fetched: usize) {
    let Some(group) = session.catalog().group(variable) else {
        return;
    };
    let extent: BoundingBox = projection::extent_to_wgs84(&session.viewport().extent());
    info!(
        variable,
        display_name = group.display_name(),
        level = group.selected_level(),
        levels = ?group.levels().collect::<Vec<_>>(),
        units = group.units(),
        palette = group.palette(),
        progress = group.progress(),
        fetched,
        extent = ?extent,
        "Layer group loaded"
    );
}

fn report_frame(session: &ViewerSession<HeadlessViewport>, time: Option<ValidTime>) {
    let viewport = session.viewport();
    for key in viewport.visible_frames() {
        if let Some(drawn) = viewport.frame(key) {
            info!(
                frame = %key,
                kind = %drawn.kind,
                opacity = drawn.opacity,
                arrows = drawn.arrows,
                "Visible frame"
            );
        }
    }
    info!(time = ?time.map(|t| t.to_string()), "Current time");
}
