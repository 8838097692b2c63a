//! Frame ingestion sources.
//!
//! This module provides the camera sources for the control loop:
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - Synthetic `stub://` source (demos and tests)
//!
//! A source is opened once at startup and owns the device until it is
//! dropped. Opening fails with `ControlError::DeviceUnavailable`; a failed read
//! reports `ControlError::Capture`, which the loop treats as end of stream.

pub mod normalize;
pub mod v4l2;

pub use v4l2::{V4l2Config, V4l2Source, V4l2Stats};

use anyhow::Result;

use crate::frame::Frame;

/// Anything that yields one frame per loop iteration.
pub trait FrameSource {
    /// Human-readable identifier used in logs.
    fn describe(&self) -> String;

    /// Capture the next frame.
    ///
    /// Errors downcasting to `ControlError::Capture` mean the stream is over.
    fn next_frame(&mut self) -> Result<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }
}

/// Resolve a camera index or path to a device path.
///
/// A bare index such as `0` becomes `/dev/video0`; anything else is returned as-is.
pub fn resolve_device(camera: &str) -> String {
    let trimmed = camera.trim();
    match trimmed.parse::<u32>() {
        Ok(index) => format!("/dev/video{index}"),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_index_resolves_to_device_node() {
        assert_eq!(resolve_device("0"), "/dev/video0");
        assert_eq!(resolve_device(" 2 "), "/dev/video2");
        assert_eq!(resolve_device("/dev/video4"), "/dev/video4");
        assert_eq!(resolve_device("stub://desk"), "stub://desk");
    }
}
