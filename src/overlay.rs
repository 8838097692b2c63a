//! Debug overlay drawn on top of each frame.
//!
//! `compose` turns a `FrameReport` into a list of shapes; `Overlay::draw`
//! rasterizes them into a `0x00RRGGBB` pixel buffer. Keeping the two apart
//! lets tests check what would be drawn without opening a window.
//!
//! Layout, for a 640x480 frame:
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ FPS: 29.8                                   │
//! │ Dist: 118      (or "No Hand Detected")      │
//! │                                             │
//! │  ┌──┐         o────o  thumb / index tips    │
//! │  │  │          \  /                         │
//! │  │██│         hand skeleton                 │
//! │  │██│                                       │
//! │  └──┘                                       │
//! │ Vol: 63%                                    │
//! └────────────────────────────────────────────┘
//! ```

use crate::detect::HAND_CONNECTIONS;
use crate::mapping::interp;
use crate::pipeline::{FrameOutcome, FrameReport};

pub const YELLOW: u32 = 0x00FF_FF00;
pub const MAGENTA: u32 = 0x00FF_00FF;
pub const GREEN: u32 = 0x0000_FF00;
pub const CYAN: u32 = 0x0000_FFFF;
pub const RED: u32 = 0x00FF_0000;
pub const BONE: u32 = 0x00E0_E0E0;

const BAR_LEFT: i32 = 50;
const BAR_RIGHT: i32 = 85;
const BAR_TOP: i32 = 150;
const BAR_BOTTOM: i32 = 400;
const TIP_RADIUS: i32 = 10;
const JOINT_RADIUS: i32 = 3;

/// One drawing primitive. Coordinates are frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// `origin` is the bottom-left corner of the first glyph.
    Text {
        text: String,
        origin: (i32, i32),
        scale: i32,
        color: u32,
    },
    Circle {
        center: (i32, i32),
        radius: i32,
        color: u32,
        filled: bool,
    },
    Line {
        from: (i32, i32),
        to: (i32, i32),
        thickness: i32,
        color: u32,
    },
    Rect {
        top_left: (i32, i32),
        bottom_right: (i32, i32),
        color: u32,
        filled: bool,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub shapes: Vec<Shape>,
}

/// Build the overlay for one processed frame.
pub fn compose(report: &FrameReport, show_fps: bool) -> Overlay {
    let mut shapes = Vec::new();

    if show_fps {
        shapes.push(Shape::Text {
            text: format!("FPS: {:.1}", report.fps),
            origin: (10, 35),
            scale: 3,
            color: YELLOW,
        });
    }

    match &report.outcome {
        FrameOutcome::NoHand => {
            shapes.push(Shape::Text {
                text: "No Hand Detected".to_string(),
                origin: (40, 70),
                scale: 3,
                color: RED,
            });
        }
        FrameOutcome::Hand(hand) => {
            let joints: Vec<(i32, i32)> = hand
                .landmarks
                .points()
                .iter()
                .map(|lm| clamp_to_view(lm.to_pixel(report.width, report.height), report))
                .collect();
            for &(a, b) in HAND_CONNECTIONS {
                shapes.push(Shape::Line {
                    from: joints[a],
                    to: joints[b],
                    thickness: 2,
                    color: BONE,
                });
            }
            for &joint in &joints {
                shapes.push(Shape::Circle {
                    center: joint,
                    radius: JOINT_RADIUS,
                    color: RED,
                    filled: true,
                });
            }

            let thumb = clamp_to_view(hand.pinch.thumb, report);
            let index = clamp_to_view(hand.pinch.index, report);
            for tip in [thumb, index] {
                shapes.push(Shape::Circle {
                    center: tip,
                    radius: TIP_RADIUS,
                    color: MAGENTA,
                    filled: true,
                });
            }
            shapes.push(Shape::Line {
                from: thumb,
                to: index,
                thickness: 3,
                color: MAGENTA,
            });

            let percent = hand.target.percent;
            let bar_y = interp(
                percent,
                (0.0, 100.0),
                (f64::from(BAR_BOTTOM), f64::from(BAR_TOP)),
            ) as i32;
            shapes.push(Shape::Rect {
                top_left: (BAR_LEFT, BAR_TOP),
                bottom_right: (BAR_RIGHT, BAR_BOTTOM),
                color: GREEN,
                filled: false,
            });
            shapes.push(Shape::Rect {
                top_left: (BAR_LEFT, bar_y),
                bottom_right: (BAR_RIGHT, BAR_BOTTOM),
                color: GREEN,
                filled: true,
            });
            shapes.push(Shape::Text {
                text: format!("Vol: {}%", percent as i32),
                origin: (40, 430),
                scale: 4,
                color: GREEN,
            });
            shapes.push(Shape::Text {
                text: format!("Dist: {}", hand.target.distance as i32),
                origin: (40, 70),
                scale: 3,
                color: CYAN,
            });
        }
    }

    Overlay { shapes }
}

/// Pull a point to within one frame size of the visible area.
///
/// Points further out would only be clipped, but lines towards them still
/// cost a step per pixel.
fn clamp_to_view((x, y): (i32, i32), report: &FrameReport) -> (i32, i32) {
    let w = i32::try_from(report.width).unwrap_or(i32::MAX / 2);
    let h = i32::try_from(report.height).unwrap_or(i32::MAX / 2);
    (x.clamp(-w, 2 * w), y.clamp(-h, 2 * h))
}

impl Overlay {
    /// Rasterize into `buf`, a `width * height` buffer of `0x00RRGGBB` pixels.
    /// Anything falling outside the buffer is clipped.
    pub fn draw(&self, buf: &mut [u32], width: usize, height: usize) {
        let mut canvas = Canvas { buf, width, height };
        for shape in &self.shapes {
            match shape {
                Shape::Text {
                    text,
                    origin,
                    scale,
                    color,
                } => canvas.text(text, *origin, *scale, *color),
                Shape::Circle {
                    center,
                    radius,
                    color,
                    filled,
                } => canvas.circle(*center, *radius, *color, *filled),
                Shape::Line {
                    from,
                    to,
                    thickness,
                    color,
                } => canvas.line(*from, *to, *thickness, *color),
                Shape::Rect {
                    top_left,
                    bottom_right,
                    color,
                    filled,
                } => canvas.rect(*top_left, *bottom_right, *color, *filled),
            }
        }
    }
}

struct Canvas<'a> {
    buf: &'a mut [u32],
    width: usize,
    height: usize,
}

impl Canvas<'_> {
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.set_pixel(x, y, color);
            }
        }
    }

    fn rect(&mut self, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: u32, filled: bool) {
        if filled {
            self.fill_rect(x0, y0, x1, y1, color);
            return;
        }
        // Two-pixel border.
        self.fill_rect(x0, y0, x1, y0 + 1, color);
        self.fill_rect(x0, y1 - 1, x1, y1, color);
        self.fill_rect(x0, y0, x0 + 1, y1, color);
        self.fill_rect(x1 - 1, y0, x1, y1, color);
    }

    fn circle(&mut self, (cx, cy): (i32, i32), radius: i32, color: u32, filled: bool) {
        let r2 = radius * radius;
        let inner = (radius - 1).max(0).pow(2);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let d2 = dx * dx + dy * dy;
                if d2 <= r2 && (filled || d2 >= inner) {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham line stamped with a square brush.
    fn line(&mut self, (x0, y0): (i32, i32), (x1, y1): (i32, i32), thickness: i32, color: u32) {
        let half = (thickness.max(1) - 1) / 2;
        let extra = (thickness.max(1) - 1) - half;
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.fill_rect(x - half, y - half, x + extra, y + extra, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 3x5 bitmap glyphs, each bit a `scale` x `scale` block.
    fn text(&mut self, text: &str, (x, baseline): (i32, i32), scale: i32, color: u32) {
        let scale = scale.max(1);
        let top = baseline - 5 * scale;
        let mut cx = x;
        for ch in text.chars() {
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3 {
                    if bits & (1 << (2 - col)) != 0 {
                        let px = cx + col * scale;
                        let py = top + row as i32 * scale;
                        self.fill_rect(px, py, px + scale - 1, py + scale - 1, color);
                    }
                }
            }
            cx += 4 * scale;
        }
    }
}

fn char_glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _ => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}
