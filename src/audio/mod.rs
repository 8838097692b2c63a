//! OS volume output.
//!
//! - `VolumeEndpoint`: the control surface (range, current level, set level).
//! - `VolumeSink`: hysteresis gate that decides when a level is worth writing.
//! - Backends: `pactl` (PulseAudio / PipeWire) and an in-memory simulation.

mod endpoint;
pub mod pactl;
mod simulated;
mod sink;

pub use endpoint::VolumeEndpoint;
pub use pactl::PactlEndpoint;
pub use simulated::SimulatedEndpoint;
pub use sink::{SinkOutcome, VolumeSink};

use anyhow::Result;

use crate::config::{AudioBackendKind, AudioSettings};
use crate::mapping::VolumeRange;

/// Open the endpoint named in the settings.
pub fn open_endpoint(settings: &AudioSettings) -> Result<Box<dyn VolumeEndpoint>> {
    let range = VolumeRange::new(settings.min_db, settings.max_db)?;
    match settings.backend {
        AudioBackendKind::Simulated => {
            // Start mid-range so the first gesture produces a visible write.
            let start = (range.min + range.max) / 2.0;
            Ok(Box::new(SimulatedEndpoint::new(range, start)))
        }
        AudioBackendKind::Pactl => Ok(Box::new(PactlEndpoint::new(&settings.sink, range)?)),
    }
}
