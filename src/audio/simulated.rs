use anyhow::Result;

use super::VolumeEndpoint;
use crate::mapping::VolumeRange;

/// In-memory endpoint. Remembers every level it was asked to apply.
#[derive(Clone, Debug)]
pub struct SimulatedEndpoint {
    range: VolumeRange,
    level: f64,
    history: Vec<f64>,
}

impl SimulatedEndpoint {
    pub fn new(range: VolumeRange, initial_level: f64) -> Self {
        Self {
            range,
            level: range.clamp(initial_level),
            history: Vec::new(),
        }
    }

    /// Levels written so far, oldest first.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

impl VolumeEndpoint for SimulatedEndpoint {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn range(&self) -> Result<VolumeRange> {
        Ok(self.range)
    }

    fn current_level(&self) -> Result<f64> {
        Ok(self.level)
    }

    fn set_level(&mut self, level: f64) -> Result<()> {
        self.level = self.range.clamp(level);
        self.history.push(level);
        log::info!("simulated volume set to {:.2} dB", self.level);
        Ok(())
    }
}
