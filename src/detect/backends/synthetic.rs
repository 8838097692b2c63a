use std::f32::consts::PI;

use anyhow::Result;
use rand::Rng;

use crate::detect::backend::HandDetector;
use crate::detect::landmarks::{HandLandmarks, Landmark, INDEX_FINGER_TIP, THUMB_TIP};

/// Frames per open/close pinch cycle.
const DEFAULT_PERIOD_FRAMES: u64 = 180;
/// Trailing frames of each cycle with the hand out of view.
const DEFAULT_ABSENT_FRAMES: u64 = 20;
const MIN_SEPARATION_PX: f32 = 10.0;
const MAX_SEPARATION_PX: f32 = 230.0;

/// Open-hand pose in units of hand size, relative to the palm centre.
/// Thumb and index tips are placed separately.
const HAND_TEMPLATE: [(f32, f32); 21] = [
    (0.00, 0.45),
    (-0.12, 0.35),
    (-0.22, 0.22),
    (-0.28, 0.10),
    (0.00, 0.00),
    (-0.10, 0.00),
    (-0.11, -0.15),
    (-0.11, -0.25),
    (0.00, 0.00),
    (0.00, -0.02),
    (0.00, -0.20),
    (0.00, -0.30),
    (0.00, -0.40),
    (0.09, 0.00),
    (0.10, -0.16),
    (0.10, -0.26),
    (0.10, -0.34),
    (0.17, 0.04),
    (0.19, -0.08),
    (0.20, -0.16),
    (0.21, -0.23),
];

/// Scripted detector that pretends a hand is slowly pinching open and closed.
///
/// Pairs with the `stub://` camera so the whole loop can run without a
/// webcam or a model file. Each cycle ends with a short stretch of frames
/// where no hand is reported.
pub struct SyntheticBackend {
    frame_count: u64,
    period_frames: u64,
    absent_frames: u64,
    jitter_px: f32,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            period_frames: DEFAULT_PERIOD_FRAMES,
            absent_frames: DEFAULT_ABSENT_FRAMES,
            jitter_px: 1.5,
        }
    }

    /// Override the cycle length and the number of hand-absent frames per cycle.
    pub fn with_cycle(mut self, period_frames: u64, absent_frames: u64) -> Self {
        self.period_frames = period_frames.max(1);
        self.absent_frames = absent_frames.min(self.period_frames - 1);
        self
    }

    /// Pixel jitter applied to the fingertips. Zero makes output deterministic.
    pub fn with_jitter(mut self, jitter_px: f32) -> Self {
        self.jitter_px = jitter_px.max(0.0);
        self
    }

    fn separation_at(&self, frame: u64) -> Option<f32> {
        let visible = self.period_frames - self.absent_frames;
        let step = frame % self.period_frames;
        if step >= visible {
            return None;
        }
        let phase = 2.0 * PI * step as f32 / visible as f32;
        let t = (1.0 - phase.cos()) / 2.0;
        Some(MIN_SEPARATION_PX + t * (MAX_SEPARATION_PX - MIN_SEPARATION_PX))
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn detect(&mut self, _pixels: &[u8], width: u32, height: u32) -> Result<Option<HandLandmarks>> {
        let frame = self.frame_count;
        self.frame_count += 1;

        let Some(mut separation) = self.separation_at(frame) else {
            return Ok(None);
        };
        if self.jitter_px > 0.0 {
            separation += rand::thread_rng().gen_range(-self.jitter_px..=self.jitter_px);
        }
        synthetic_hand(width, height, separation.max(0.0)).map(Some)
    }
}

/// Build a plausible hand whose thumb and index tips are `separation_px` apart.
pub fn synthetic_hand(width: u32, height: u32, separation_px: f32) -> Result<HandLandmarks> {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    let size = 0.5 * h;
    let (cx, cy) = (0.5 * w, 0.55 * h);

    let mut points: Vec<Landmark> = HAND_TEMPLATE
        .iter()
        .map(|&(dx, dy)| Landmark::new((cx + dx * size) / w, (cy + dy * size) / h, 0.0))
        .collect();

    let pinch_x = cx - 0.25 * size;
    let pinch_y = cy - 0.15 * size;
    let half = separation_px / 2.0;
    points[THUMB_TIP] = Landmark::new(pinch_x / w, (pinch_y + half) / h, -0.02);
    points[INDEX_FINGER_TIP] = Landmark::new(pinch_x / w, (pinch_y - half) / h, -0.02);

    HandLandmarks::new(points, 0.95)
}
