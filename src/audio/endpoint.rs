use anyhow::Result;

use crate::mapping::VolumeRange;

/// OS volume control surface.
///
/// Levels are in the endpoint's native units (dB for every backend here).
pub trait VolumeEndpoint {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Supported level range.
    fn range(&self) -> Result<VolumeRange>;

    /// Level currently applied by the OS.
    fn current_level(&self) -> Result<f64>;

    /// Apply a new level.
    fn set_level(&mut self, level: f64) -> Result<()>;
}

impl<E: VolumeEndpoint + ?Sized> VolumeEndpoint for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn range(&self) -> Result<VolumeRange> {
        (**self).range()
    }

    fn current_level(&self) -> Result<f64> {
        (**self).current_level()
    }

    fn set_level(&mut self, level: f64) -> Result<()> {
        (**self).set_level(level)
    }
}
