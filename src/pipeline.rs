//! Per-frame control loop.
//!
//! Each iteration: capture, mirror, detect, measure the pinch, map the
//! distance to a level, smooth it, and offer it to the volume sink. Frames
//! with no hand skip everything after detection; the smoothing window and
//! the last applied level carry over untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::audio::{SinkOutcome, VolumeEndpoint, VolumeSink};
use crate::detect::{HandDetector, HandLandmarks};
use crate::display::{RenderAction, Renderer};
use crate::error::is_end_of_stream;
use crate::frame::Frame;
use crate::gesture::{measure_pinch, PinchMeasurement};
use crate::ingest::FrameSource;
use crate::mapping::{VolumeCurve, VolumeTarget};
use crate::overlay;
use crate::smoothing::MovingAverage;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Instantaneous frame rate from consecutive frame timestamps.
#[derive(Debug, Default)]
pub struct FpsCounter {
    last: Option<Instant>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame at `now`. The first frame reports 0.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let fps = match self.last {
            Some(prev) => 1.0 / (now.saturating_duration_since(prev).as_secs_f64() + 1e-6),
            None => 0.0,
        };
        self.last = Some(now);
        fps
    }
}

/// What happened to a detected hand this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandReport {
    pub landmarks: HandLandmarks,
    pub pinch: PinchMeasurement,
    pub target: VolumeTarget,
    /// Windowed mean of recent target levels.
    pub smoothed: f64,
    /// `None` when the write to the endpoint failed.
    pub applied: Option<SinkOutcome>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    NoHand,
    Hand(HandReport),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub outcome: FrameOutcome,
}

/// Counters kept across the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub hands: u64,
    pub writes: u64,
    pub detector_errors: u64,
    pub write_errors: u64,
}

/// Mapping, smoothing and gating state carried across frames.
pub struct VolumeController<E> {
    curve: VolumeCurve,
    sink: VolumeSink<E>,
    smoother: MovingAverage,
    fps: FpsCounter,
    stats: LoopStats,
}

impl<E: VolumeEndpoint> VolumeController<E> {
    pub fn new(curve: VolumeCurve, sink: VolumeSink<E>, smoothing_window: usize) -> Self {
        Self {
            curve,
            sink,
            smoother: MovingAverage::new(smoothing_window),
            fps: FpsCounter::new(),
            stats: LoopStats::default(),
        }
    }

    /// Run detection and the volume update for one (already mirrored) frame.
    ///
    /// Detector failures are logged and the frame is treated as having no hand.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        detector: &mut dyn HandDetector,
        now: Instant,
    ) -> FrameReport {
        self.stats.frames += 1;
        let fps = self.fps.tick(now);

        let detected = match detector.detect(frame.pixels(), frame.width, frame.height) {
            Ok(hand) => hand,
            Err(e) => {
                self.stats.detector_errors += 1;
                log::warn!("hand detection failed ({}): {:#}", detector.name(), e);
                None
            }
        };

        let outcome = match detected {
            Some(landmarks) => FrameOutcome::Hand(self.apply_hand(landmarks, frame.width, frame.height)),
            None => FrameOutcome::NoHand,
        };

        FrameReport {
            width: frame.width,
            height: frame.height,
            fps,
            outcome,
        }
    }

    /// Map a detected hand to a level and offer the smoothed level to the sink.
    pub fn apply_hand(&mut self, landmarks: HandLandmarks, width: u32, height: u32) -> HandReport {
        self.stats.hands += 1;
        let pinch = measure_pinch(&landmarks, width, height);
        let target = self.curve.target_for(pinch.distance, self.sink.range());
        let smoothed = self.smoother.push(target.level);

        let applied = match self.sink.apply(smoothed) {
            Ok(outcome) => {
                if let SinkOutcome::Applied(_) = outcome {
                    self.stats.writes += 1;
                }
                Some(outcome)
            }
            Err(e) => {
                self.stats.write_errors += 1;
                log::warn!("volume write failed: {:#}", e);
                None
            }
        };

        HandReport {
            landmarks,
            pinch,
            target,
            smoothed,
            applied,
        }
    }

    pub fn sink(&self) -> &VolumeSink<E> {
        &self.sink
    }

    pub fn smoother(&self) -> &MovingAverage {
        &self.smoother
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub mirror: bool,
    pub show_fps: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mirror: true,
            show_fps: crate::config::SHOW_FPS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The source stopped producing frames.
    EndOfStream,
    /// ESC pressed or the window was closed.
    ExitKey,
    /// The shutdown flag was raised (Ctrl-C).
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub exit: ExitReason,
    pub stats: LoopStats,
}

/// Drive the loop until the stream ends, the user quits, or `shutdown` is set.
///
/// Only renderer failures are returned as errors. The caller owns the source
/// and releases the camera when it drops it.
pub fn run<S, E>(
    source: &mut S,
    detector: &mut dyn HandDetector,
    controller: &mut VolumeController<E>,
    renderer: &mut dyn Renderer,
    options: RunOptions,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    S: FrameSource + ?Sized,
    E: VolumeEndpoint,
{
    let mut last_health_log = Instant::now();

    let exit = loop {
        if shutdown.load(Ordering::SeqCst) {
            log::info!("shutdown requested");
            break ExitReason::Cancelled;
        }

        let mut frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                if is_end_of_stream(&e) {
                    log::info!("{}: {}", source.describe(), e);
                } else {
                    log::warn!("{}: frame read failed: {:#}", source.describe(), e);
                }
                break ExitReason::EndOfStream;
            }
        };
        if options.mirror {
            frame.mirror_horizontal();
        }

        let report = controller.process_frame(&frame, detector, Instant::now());
        let overlay = overlay::compose(&report, options.show_fps);
        if renderer.render(&frame, &overlay)? == RenderAction::Exit {
            log::info!("exit requested from display");
            break ExitReason::ExitKey;
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = controller.stats();
            log::info!(
                "health frames={} hands={} writes={} fps={:.1} level={:.2} detector={} source={}",
                stats.frames,
                stats.hands,
                stats.writes,
                report.fps,
                controller.sink().last_applied(),
                detector.name(),
                source.describe()
            );
            last_health_log = Instant::now();
        }
    };

    Ok(RunSummary {
        exit,
        stats: controller.stats(),
    })
}
