//! V4L2 camera source.
//!
//! This module provides `V4l2Source` for capturing frames from a local webcam.
//!
//! The V4L2 source is responsible for:
//! - Opening a local device node (e.g., /dev/video0) exactly once
//! - Negotiating a capture format (RGB3, YUYV or MJPG)
//! - Normalising every captured buffer to RGB24
//! - Releasing the device on every exit path (explicit `close` or drop)
//!
//! `stub://` paths select a synthetic source that needs no hardware.

use anyhow::Result;
#[cfg(feature = "ingest-v4l2")]
use anyhow::{anyhow, Context};
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;

use super::FrameSource;
#[cfg(feature = "ingest-v4l2")]
use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::error::ControlError;
use crate::frame::Frame;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0") or `stub://name[?frames=N]`.
    pub device: String,
    /// Requested frame rate. Zero leaves the driver default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// V4L2 frame source.
///
/// Uses libv4l for real devices, with a synthetic fallback for `stub://` paths.
pub struct V4l2Source {
    backend: V4l2Backend,
}

enum V4l2Backend {
    Synthetic(SyntheticV4l2Source),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceV4l2Source),
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: V4l2Backend::Synthetic(SyntheticV4l2Source::new(config)),
            });
        }

        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: V4l2Backend::Device(DeviceV4l2Source::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(ControlError::device_unavailable(
                &config.device,
                "camera capture requires the ingest-v4l2 feature",
            )
            .into())
        }
    }

    /// Create and connect in one step.
    pub fn open(config: V4l2Config) -> Result<Self> {
        let mut source = Self::new(config)?;
        source.connect()?;
        Ok(source)
    }

    /// Connect to the device. Fails with `ControlError::DeviceUnavailable`.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            V4l2Backend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.connect(),
        }
    }

    /// Release the device. Safe to call more than once.
    pub fn close(&mut self) {
        match &mut self.backend {
            V4l2Backend::Synthetic(source) => source.close(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.close(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> V4l2Stats {
        match &self.backend {
            V4l2Backend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.stats(),
        }
    }
}

impl FrameSource for V4l2Source {
    fn describe(&self) -> String {
        self.stats().device
    }

    fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            V4l2Backend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.next_frame(),
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.close();
    }
}

/// Statistics for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Stats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for demos and tests
// ----------------------------------------------------------------------------

struct SyntheticV4l2Source {
    config: V4l2Config,
    frame_count: u64,
    /// Stream ends after this many frames (`?frames=N`), otherwise endless.
    frame_limit: Option<u64>,
    connected: bool,
}

impl SyntheticV4l2Source {
    fn new(config: V4l2Config) -> Self {
        let frame_limit = parse_frame_limit(&config.device);
        Self {
            config,
            frame_count: 0,
            frame_limit,
            connected: false,
        }
    }

    /// Synthetic sources are always available.
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!(
            "V4l2Source: connected to {} (synthetic, {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            log::debug!("V4l2Source: released {}", self.config.device);
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(ControlError::capture(format!("{} not connected", self.config.device)).into());
        }
        if self.frame_limit.is_some_and(|limit| self.frame_count >= limit) {
            return Err(ControlError::capture(format!(
                "{} exhausted after {} frames",
                self.config.device, self.frame_count
            ))
            .into());
        }
        self.frame_count += 1;
        Frame::from_rgb(
            self.generate_synthetic_pixels(),
            self.config.width,
            self.config.height,
        )
    }

    /// Slowly drifting gradient with a little sensor noise.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let mut pixels = Vec::with_capacity(width * height * 3);
        let drift = (self.frame_count % 256) as usize;
        for y in 0..height {
            for x in 0..width {
                let noise = rand::random::<u8>() % 8;
                pixels.push(((x * 255 / width.max(1) + drift) % 256) as u8);
                pixels.push(((y * 255 / height.max(1)) as u8).saturating_add(noise));
                pixels.push(96);
            }
        }
        pixels
    }

    fn stats(&self) -> V4l2Stats {
        V4l2Stats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

fn parse_frame_limit(device: &str) -> Option<u64> {
    let (_, query) = device.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "frames")
        .and_then(|(_, value)| value.parse().ok())
}

// ----------------------------------------------------------------------------
// Production V4L2 source using libv4l
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceV4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_format: PixelFormat,
}

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceV4l2Source {
    fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            active_format: PixelFormat::Rgb24,
            config,
            state: None,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        let device_path = self.config.device.clone();
        self.try_connect()
            .map_err(|err| ControlError::device_unavailable(&device_path, err).into())
    }

    fn try_connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;

        let format = self.negotiate_format(&mut device)?;
        let fourcc = format.fourcc.repr;
        self.active_format = PixelFormat::from_fourcc(&fourcc).ok_or_else(|| {
            anyhow!(
                "unsupported pixel format {}",
                String::from_utf8_lossy(&fourcc)
            )
        })?;
        self.active_width = format.width;
        self.active_height = format.height;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        let state = DeviceV4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{} {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.active_format
        );
        Ok(())
    }

    /// Ask for each supported format in order of decode cost and keep the first
    /// one the driver accepts.
    fn negotiate_format(&self, device: &mut v4l::Device) -> Result<v4l::Format> {
        use v4l::video::Capture;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;

        for candidate in [PixelFormat::Rgb24, PixelFormat::Yuyv, PixelFormat::Mjpeg] {
            format.fourcc = v4l::FourCC::new(candidate.fourcc());
            match device.set_format(&format) {
                Ok(applied) if applied.fourcc == format.fourcc => return Ok(applied),
                Ok(_) => continue,
                Err(err) => {
                    log::debug!(
                        "V4l2Source: {} rejected {:?}: {}",
                        self.config.device,
                        candidate,
                        err
                    );
                }
            }
        }

        Err(anyhow!(
            "{} supports none of RGB3, YUYV, MJPG",
            self.config.device
        ))
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::info!(
                "V4l2Source: released {} after {} frames",
                self.config.device,
                self.frame_count
            );
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| ControlError::capture(format!("{} not connected", self.config.device)))?;
        let buf = state
            .with_stream_mut(|stream| stream.next().map(|(buf, _meta)| buf.to_vec()))
            .map_err(|err| ControlError::capture(format!("{}: {}", self.config.device, err)))?;

        self.frame_count += 1;

        let rgb = normalize_to_rgb(
            &buf,
            self.active_width,
            self.active_height,
            self.active_format,
        )?;
        Frame::from_rgb(rgb, self.active_width, self.active_height)
    }

    fn stats(&self) -> V4l2Stats {
        V4l2Stats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_end_of_stream;

    fn stub_config(device: &str) -> V4l2Config {
        V4l2Config {
            device: device.to_string(),
            target_fps: 30,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn v4l2_source_produces_frames() -> Result<()> {
        let mut source = V4l2Source::open(stub_config("stub://test"))?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.pixels().len(), 64 * 48 * 3);
        assert_eq!(source.stats().frames_captured, 1);

        Ok(())
    }

    #[test]
    fn frame_limit_ends_the_stream() -> Result<()> {
        let mut source = V4l2Source::open(stub_config("stub://test?frames=2"))?;
        source.next_frame()?;
        source.next_frame()?;

        let err = source.next_frame().unwrap_err();
        assert!(is_end_of_stream(&err));
        Ok(())
    }

    #[test]
    fn closed_source_stops_producing() -> Result<()> {
        let mut source = V4l2Source::open(stub_config("stub://test"))?;
        source.close();
        source.close();

        let err = source.next_frame().unwrap_err();
        assert!(is_end_of_stream(&err));
        Ok(())
    }

    #[test]
    fn frame_limit_parsing() {
        assert_eq!(parse_frame_limit("stub://cam?frames=10"), Some(10));
        assert_eq!(parse_frame_limit("stub://cam?fps=3&frames=7"), Some(7));
        assert_eq!(parse_frame_limit("stub://cam"), None);
        assert_eq!(parse_frame_limit("stub://cam?frames=x"), None);
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn device_paths_need_the_v4l2_feature() {
        let err = V4l2Source::new(stub_config("/dev/video0")).err().expect("must fail");
        assert!(matches!(
            err.downcast_ref::<ControlError>(),
            Some(ControlError::DeviceUnavailable { .. })
        ));
    }
}
