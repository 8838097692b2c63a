//! Frame presentation.
//!
//! The control loop hands every processed frame and its overlay to a
//! `Renderer`. The renderer also reports whether the user asked to quit.

use anyhow::Result;

use crate::frame::Frame;
use crate::overlay::Overlay;

pub const WINDOW_TITLE: &str = "Smart Volume Control";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderAction {
    Continue,
    /// ESC pressed or window closed.
    Exit,
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<RenderAction>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<RenderAction> {
        (**self).render(frame, overlay)
    }
}

/// Draws nothing. Used with `--headless`.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, _frame: &Frame, _overlay: &Overlay) -> Result<RenderAction> {
        self.frames += 1;
        Ok(RenderAction::Continue)
    }
}

/// Pack an RGB24 frame into `0x00RRGGBB` pixels.
pub fn frame_to_argb(frame: &Frame, buf: &mut Vec<u32>) {
    buf.clear();
    buf.extend(frame.pixels().chunks_exact(3).map(|px| {
        (u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2])
    }));
}

#[cfg(feature = "window")]
pub use window::WindowRenderer;

#[cfg(feature = "window")]
mod window {
    use anyhow::{anyhow, Result};
    use minifb::{Key, Window, WindowOptions};

    use super::{frame_to_argb, RenderAction, Renderer, WINDOW_TITLE};
    use crate::frame::Frame;
    use crate::overlay::Overlay;

    /// Native window backed by minifb. Opened on the first frame, sized to it.
    #[derive(Default)]
    pub struct WindowRenderer {
        window: Option<Window>,
        size: (usize, usize),
        buf: Vec<u32>,
    }

    impl WindowRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        fn ensure_window(&mut self, width: usize, height: usize) -> Result<&mut Window> {
            if self.window.is_none() || self.size != (width, height) {
                let window = Window::new(
                    WINDOW_TITLE,
                    width,
                    height,
                    WindowOptions {
                        resize: false,
                        ..WindowOptions::default()
                    },
                )
                .map_err(|e| anyhow!("open display window: {}", e))?;
                log::info!("display window opened ({}x{})", width, height);
                self.window = Some(window);
                self.size = (width, height);
            }
            self.window
                .as_mut()
                .ok_or_else(|| anyhow!("display window missing"))
        }
    }

    impl Renderer for WindowRenderer {
        fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<RenderAction> {
            let (width, height) = (frame.width as usize, frame.height as usize);
            let mut buf = std::mem::take(&mut self.buf);
            frame_to_argb(frame, &mut buf);
            overlay.draw(&mut buf, width, height);

            let window = self.ensure_window(width, height)?;
            let result = window
                .update_with_buffer(&buf, width, height)
                .map_err(|e| anyhow!("update display window: {}", e));
            let action = if !window.is_open() || window.is_key_down(Key::Escape) {
                RenderAction::Exit
            } else {
                RenderAction::Continue
            };
            self.buf = buf;
            result?;
            Ok(action)
        }
    }
}
