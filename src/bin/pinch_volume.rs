//! pinch_volume - gesture volume control
//!
//! Watches the webcam for a hand and sets the system output volume from the
//! distance between the thumb and index fingertips.
//!
//! Try it without a camera, model or audio server:
//!
//! ```text
//! pinch_volume --camera stub://demo --detector synthetic --audio simulated
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pinch_volume::config::{AudioBackendKind, DetectorBackendKind, PinchVolumeConfig};
use pinch_volume::display::{HeadlessRenderer, Renderer};
use pinch_volume::ingest::{resolve_device, V4l2Config, V4l2Source};
use pinch_volume::pipeline::{self, ExitReason, RunOptions, VolumeController};
use pinch_volume::{open_endpoint, select_detector, VolumeCurve, VolumeSink};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Control the system volume with a thumb/index pinch seen by a webcam"
)]
struct Args {
    /// Config file (JSON, or TOML when the extension is .toml).
    #[arg(long, env = "PINCH_VOLUME_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Camera index, device path, or stub://name[?frames=N].
    #[arg(long)]
    camera: Option<String>,

    /// Hand detector backend: tract or synthetic.
    #[arg(long)]
    detector: Option<DetectorBackendKind>,

    /// Hand landmark ONNX model (tract detector).
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Volume backend: pactl or simulated.
    #[arg(long)]
    audio: Option<AudioBackendKind>,

    /// Run without a display window.
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    // Audio first: without an output to control there is nothing to do.
    let endpoint = open_endpoint(&cfg.audio).context("open volume endpoint")?;
    let sink = VolumeSink::open(endpoint, cfg.audio.threshold)?;
    let curve = VolumeCurve::from_settings(&cfg.mapping)?;
    let mut controller = VolumeController::new(curve, sink, cfg.smoothing_window);

    let camera = V4l2Config {
        device: resolve_device(&cfg.camera.device),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    };
    let mut source = V4l2Source::open(camera)?;

    let mut detector = select_detector(&cfg.detector)?;
    detector
        .warm_up()
        .with_context(|| format!("warm up {} detector", detector.name()))?;

    let mut renderer = open_renderer(cfg.display.enabled)?;

    log::info!(
        "pinch_volume running. detector={} audio={} smoothing={} threshold={:.2}",
        detector.name(),
        controller.sink().endpoint().name(),
        cfg.smoothing_window,
        cfg.audio.threshold
    );
    log::info!("move thumb & index to adjust volume, press ESC to exit");

    let options = RunOptions {
        mirror: cfg.camera.mirror,
        show_fps: cfg.display.show_fps,
    };
    let summary = pipeline::run(
        &mut source,
        detector.as_mut(),
        &mut controller,
        renderer.as_mut(),
        options,
        &shutdown,
    )?;

    source.close();
    let reason = match summary.exit {
        ExitReason::EndOfStream => "end of stream",
        ExitReason::ExitKey => "exit key",
        ExitReason::Cancelled => "interrupted",
    };
    log::info!(
        "stopped ({}): frames={} hands={} writes={} detector_errors={} write_errors={} final_level={:.2}",
        reason,
        summary.stats.frames,
        summary.stats.hands,
        summary.stats.writes,
        summary.stats.detector_errors,
        summary.stats.write_errors,
        controller.sink().last_applied()
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<PinchVolumeConfig> {
    let mut cfg = match &args.config {
        Some(path) => PinchVolumeConfig::load_from(path)?,
        None => PinchVolumeConfig::load()?,
    };
    if let Some(camera) = &args.camera {
        cfg.camera.device = camera.clone();
    }
    if let Some(detector) = args.detector {
        cfg.detector.backend = detector;
    }
    if let Some(model) = &args.model {
        cfg.detector.model_path = model.clone();
    }
    if let Some(audio) = args.audio {
        cfg.audio.backend = audio;
    }
    if args.headless {
        cfg.display.enabled = false;
    }
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(feature = "window")]
fn open_renderer(enabled: bool) -> Result<Box<dyn Renderer>> {
    if enabled {
        Ok(Box::new(pinch_volume::display::WindowRenderer::new()))
    } else {
        Ok(Box::new(HeadlessRenderer::new()))
    }
}

#[cfg(not(feature = "window"))]
fn open_renderer(enabled: bool) -> Result<Box<dyn Renderer>> {
    if enabled {
        log::warn!("built without the window feature; running headless");
    }
    Ok(Box::new(HeadlessRenderer::new()))
}
