use anyhow::{Context, Result};

use super::VolumeEndpoint;
use crate::mapping::VolumeRange;

/// Outcome of offering a level to the sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SinkOutcome {
    /// The level was written to the endpoint.
    Applied(f64),
    /// The change was within the threshold; nothing was written.
    Unchanged,
}

/// Hysteresis gate in front of a volume endpoint.
///
/// A proposed level is written only when it differs from the last applied
/// level by strictly more than `threshold`. Writes are therefore bounded by
/// how far the hand moves, not by the frame rate.
pub struct VolumeSink<E> {
    endpoint: E,
    range: VolumeRange,
    last_applied: f64,
    threshold: f64,
    writes: u64,
}

impl<E: VolumeEndpoint> VolumeSink<E> {
    /// Read the endpoint range and current level once, at startup.
    pub fn open(endpoint: E, threshold: f64) -> Result<Self> {
        let range = endpoint
            .range()
            .with_context(|| format!("read volume range from {}", endpoint.name()))?;
        let last_applied = endpoint
            .current_level()
            .with_context(|| format!("read current volume from {}", endpoint.name()))?;
        log::info!(
            "volume endpoint {}: range [{:.2}, {:.2}], current {:.2}",
            endpoint.name(),
            range.min,
            range.max,
            last_applied
        );
        Ok(Self {
            endpoint,
            range,
            last_applied,
            threshold,
            writes: 0,
        })
    }

    /// Write `proposed` if it clears the threshold.
    ///
    /// On a failed write the last applied level is left untouched, so the next
    /// frame offers the change again.
    pub fn apply(&mut self, proposed: f64) -> Result<SinkOutcome> {
        if (proposed - self.last_applied).abs() <= self.threshold {
            return Ok(SinkOutcome::Unchanged);
        }
        self.endpoint
            .set_level(proposed)
            .with_context(|| format!("set volume {:.2} on {}", proposed, self.endpoint.name()))?;
        log::debug!(
            "volume {:.2} -> {:.2} ({})",
            self.last_applied,
            proposed,
            self.endpoint.name()
        );
        self.last_applied = proposed;
        self.writes += 1;
        Ok(SinkOutcome::Applied(proposed))
    }

    pub fn range(&self) -> VolumeRange {
        self.range
    }

    pub fn last_applied(&self) -> f64 {
        self.last_applied
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of successful writes since `open`.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SimulatedEndpoint;
    use anyhow::anyhow;

    fn sink_at(level: f64) -> VolumeSink<SimulatedEndpoint> {
        let range = VolumeRange::new(-65.25, 0.0).unwrap();
        VolumeSink::open(SimulatedEndpoint::new(range, level), 0.8).unwrap()
    }

    #[test]
    fn baseline_comes_from_the_endpoint() {
        let sink = sink_at(-20.0);
        assert_eq!(sink.last_applied(), -20.0);
        assert_eq!(sink.range().min, -65.25);
        assert_eq!(sink.writes(), 0);
    }

    #[test]
    fn small_changes_are_not_written() -> Result<()> {
        let mut sink = sink_at(-20.0);
        for proposed in [-20.0, -20.5, -19.3, -20.7, -19.5] {
            assert_eq!(sink.apply(proposed)?, SinkOutcome::Unchanged);
        }
        assert!(sink.endpoint().history().is_empty());
        assert_eq!(sink.last_applied(), -20.0);
        Ok(())
    }

    #[test]
    fn large_changes_are_written_and_become_baseline() -> Result<()> {
        let mut sink = sink_at(-20.0);
        assert_eq!(sink.apply(-18.0)?, SinkOutcome::Applied(-18.0));
        assert_eq!(sink.last_applied(), -18.0);
        // Measured from the new baseline now.
        assert_eq!(sink.apply(-18.5)?, SinkOutcome::Unchanged);
        assert_eq!(sink.apply(-25.0)?, SinkOutcome::Applied(-25.0));
        assert_eq!(sink.endpoint().history(), &[-18.0, -25.0]);
        assert_eq!(sink.writes(), 2);
        Ok(())
    }

    #[test]
    fn slow_drift_is_written_once_threshold_is_crossed() -> Result<()> {
        let mut sink = sink_at(-30.0);
        let mut level = -30.0;
        let mut applied = Vec::new();
        for _ in 0..10 {
            level += 0.3;
            if let SinkOutcome::Applied(l) = sink.apply(level)? {
                applied.push(l);
            }
        }
        // Every write is more than 0.8 away from the one before it.
        assert!(!applied.is_empty());
        let mut prev = -30.0;
        for l in applied {
            assert!((l - prev).abs() > 0.8);
            prev = l;
        }
        Ok(())
    }

    struct FailingEndpoint;

    impl VolumeEndpoint for FailingEndpoint {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn range(&self) -> Result<VolumeRange> {
            VolumeRange::new(-60.0, 0.0)
        }
        fn current_level(&self) -> Result<f64> {
            Ok(-10.0)
        }
        fn set_level(&mut self, _level: f64) -> Result<()> {
            Err(anyhow!("device busy"))
        }
    }

    #[test]
    fn failed_writes_keep_the_old_baseline() -> Result<()> {
        let mut sink = VolumeSink::open(FailingEndpoint, 0.8)?;
        assert!(sink.apply(-30.0).is_err());
        assert_eq!(sink.last_applied(), -10.0);
        assert_eq!(sink.writes(), 0);
        Ok(())
    }
}
