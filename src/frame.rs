//! Captured video frames.
//!
//! - `Frame`: one RGB24 image, owned by a single loop iteration.
//!
//! Frames are produced by the ingest layer, optionally mirrored so the preview
//! behaves like a mirror, handed to the detector by slice, then drawn on and
//! discarded. Nothing retains a frame across iterations.

use anyhow::{anyhow, Result};

/// Bytes per RGB24 pixel.
pub const CHANNELS: usize = 3;

/// RGB24 frame, row-major, `height * width * 3` bytes.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap RGB24 bytes. Fails when the buffer length does not match the dimensions.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Solid-colour frame, mostly useful for synthetic sources and tests.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// RGB value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Flip the frame around its vertical axis in place.
    pub fn mirror_horizontal(&mut self) {
        let width = self.width as usize;
        if width < 2 {
            return;
        }
        let stride = width * CHANNELS;
        for row in self.data.chunks_exact_mut(stride) {
            for x in 0..width / 2 {
                let left = x * CHANNELS;
                let right = (width - 1 - x) * CHANNELS;
                for c in 0..CHANNELS {
                    row.swap(left + c, right + c);
                }
            }
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}
