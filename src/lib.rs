//! Pinch Volume
//!
//! Controls the system output volume with a hand gesture seen by a webcam.
//!
//! # Pipeline
//!
//! Every captured frame goes through the same steps:
//!
//! 1. **Capture**: read an RGB frame and mirror it so the view acts like a mirror.
//! 2. **Detect**: find at most one hand and its 21 landmarks.
//! 3. **Measure**: pixel distance between thumb tip (4) and index tip (8).
//! 4. **Map**: clamp the distance, apply a perceptual curve, and convert the
//!    percentage to a logarithmic endpoint level.
//! 5. **Smooth**: average the last few target levels.
//! 6. **Gate**: write the level only when it moved by more than the threshold.
//! 7. **Display**: draw the debug overlay and watch for ESC.
//!
//! # Module Structure
//!
//! - `ingest`: camera sources (V4L2 devices, synthetic `stub://` streams)
//! - `detect`: hand landmark detectors (tract ONNX model, synthetic)
//! - `gesture`, `mapping`, `smoothing`: distance to level
//! - `audio`: volume endpoints and the hysteresis sink
//! - `overlay`, `display`: debug view
//! - `pipeline`: the per-frame loop
//! - `config`: file and environment configuration

pub mod audio;
pub mod config;
pub mod detect;
pub mod display;
pub mod error;
pub mod frame;
pub mod gesture;
pub mod ingest;
pub mod mapping;
pub mod overlay;
pub mod pipeline;
pub mod smoothing;

pub use audio::{
    open_endpoint, PactlEndpoint, SimulatedEndpoint, SinkOutcome, VolumeEndpoint, VolumeSink,
};
pub use config::PinchVolumeConfig;
pub use detect::{select_detector, HandDetector, HandLandmarks, Landmark, SyntheticBackend};
pub use display::{HeadlessRenderer, RenderAction, Renderer};
#[cfg(feature = "window")]
pub use display::WindowRenderer;
pub use error::ControlError;
pub use frame::Frame;
pub use gesture::{measure_pinch, PinchMeasurement};
pub use ingest::{FrameSource, V4l2Config, V4l2Source};
pub use mapping::{VolumeCurve, VolumeRange, VolumeTarget};
pub use pipeline::{
    run, ExitReason, FrameOutcome, FrameReport, HandReport, RunOptions, RunSummary,
    VolumeController,
};
pub use smoothing::MovingAverage;
