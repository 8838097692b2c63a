use anyhow::Result;

use crate::detect::landmarks::HandLandmarks;

/// Hand detector backend trait.
///
/// Any model that turns an RGB24 image into at most one hand's landmarks can
/// drive the control loop. The loop never looks at more than one hand.
pub trait HandDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB24 frame.
    ///
    /// `Ok(None)` means no hand in view, which is a normal outcome. `Err` is a
    /// detector failure; the loop logs it and carries on with the next frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Option<HandLandmarks>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: HandDetector + ?Sized> HandDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Option<HandLandmarks>> {
        (**self).detect(pixels, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
