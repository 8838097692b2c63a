//! Pinch distance to volume level.
//!
//! The distance is clamped, normalized, bent through a power curve into a
//! perceptual percentage, then pushed through `log10(pct/100 * 9 + 1)` onto
//! the endpoint's logarithmic (dB) range. Together the two curves make equal
//! finger movements sound like roughly equal loudness steps.

use anyhow::{anyhow, Result};

use crate::config::MappingSettings;

/// Exponent of the perceptual power curve.
pub const PERCEPTUAL_EXPONENT: f64 = 0.8;

/// Volume range of an endpoint, in its native units (usually dB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeRange {
    pub min: f64,
    pub max: f64,
}

impl VolumeRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min < max) {
            return Err(anyhow!("invalid volume range [{}, {}]", min, max));
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, level: f64) -> f64 {
        level.clamp(self.min, self.max)
    }
}

/// Result of mapping one distance sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeTarget {
    /// Distance after clamping.
    pub distance: f64,
    /// Perceptual volume, `min_audible_percent..=100`.
    pub percent: f64,
    /// Level in endpoint units.
    pub level: f64,
}

/// Distance-to-volume curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeCurve {
    min_distance: f64,
    max_distance: f64,
    min_audible_percent: f64,
}

impl VolumeCurve {
    pub fn new(min_distance: f64, max_distance: f64, min_audible_percent: f64) -> Result<Self> {
        if !(min_distance < max_distance) {
            return Err(anyhow!(
                "min distance {} must be below max distance {}",
                min_distance,
                max_distance
            ));
        }
        if !(min_audible_percent > 0.0 && min_audible_percent <= 100.0) {
            return Err(anyhow!(
                "min audible percent must be in (0, 100], got {}",
                min_audible_percent
            ));
        }
        Ok(Self {
            min_distance,
            max_distance,
            min_audible_percent,
        })
    }

    pub fn from_settings(settings: &MappingSettings) -> Result<Self> {
        Self::new(
            settings.min_hand_distance,
            settings.max_hand_distance,
            settings.min_audible_percent,
        )
    }

    pub fn clamp_distance(&self, distance: f64) -> f64 {
        distance.clamp(self.min_distance, self.max_distance)
    }

    /// Perceptual percentage for a raw distance.
    pub fn percent_for(&self, distance: f64) -> f64 {
        let clamped = self.clamp_distance(distance);
        let norm = (clamped - self.min_distance) / (self.max_distance - self.min_distance);
        let percent = norm.powf(PERCEPTUAL_EXPONENT) * 100.0;
        percent.clamp(self.min_audible_percent, 100.0)
    }

    /// Full mapping for a raw distance onto `range`.
    pub fn target_for(&self, distance: f64, range: VolumeRange) -> VolumeTarget {
        let percent = self.percent_for(distance);
        VolumeTarget {
            distance: self.clamp_distance(distance),
            percent,
            level: percent_to_level(percent, range),
        }
    }
}

/// Map a perceptual percentage onto a logarithmic endpoint range.
pub fn percent_to_level(percent: f64, range: VolumeRange) -> f64 {
    let x = (percent / 100.0 * 9.0 + 1.0).log10();
    interp(x, (0.0, 1.0), (range.min, range.max))
}

/// Piecewise-linear interpolation of `x` from `domain` onto `range`.
///
/// Inputs outside the domain take the nearest endpoint's value.
pub fn interp(x: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let (x0, x1) = domain;
    let (y0, y1) = range;
    if x <= x0 {
        return y0;
    }
    if x >= x1 {
        return y1;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn curve() -> VolumeCurve {
        VolumeCurve::new(25.0, 200.0, 10.0).unwrap()
    }

    fn range() -> VolumeRange {
        VolumeRange::new(-65.25, 0.0).unwrap()
    }

    #[test]
    fn short_distances_stay_audible() {
        let curve = curve();
        for d in [0.0, 5.0, 24.9, 25.0] {
            assert_eq!(curve.percent_for(d), 10.0, "distance {}", d);
        }
        // Just above the clamp the power curve is still below the floor.
        assert_eq!(curve.percent_for(26.0), 10.0);
    }

    #[test]
    fn long_distances_reach_full_volume() {
        let curve = curve();
        for d in [200.0, 250.0, 10_000.0] {
            assert_eq!(curve.percent_for(d), 100.0, "distance {}", d);
        }
    }

    #[test]
    fn mapping_is_monotonic_over_the_range() {
        let curve = curve();
        let range = range();
        let mut prev = f64::NEG_INFINITY;
        let mut d = 20.0;
        while d <= 210.0 {
            let level = curve.target_for(d, range).level;
            assert!(level >= prev, "level dropped at {}", d);
            prev = level;
            d += 0.5;
        }
    }

    #[test]
    fn midpoint_follows_power_curve() {
        let percent = curve().percent_for(112.5);
        assert!((percent - 0.5f64.powf(0.8) * 100.0).abs() < EPS);
    }

    #[test]
    fn min_distance_maps_to_log_of_one_point_nine() {
        let range = range();
        let target = curve().target_for(25.0, range);
        let expected = range.min + 1.9f64.log10() * (range.max - range.min);
        assert_eq!(target.percent, 10.0);
        assert!((target.level - expected).abs() < EPS);
        assert!((1.9f64.log10() - 0.2788).abs() < 1e-4);
    }

    #[test]
    fn max_distance_maps_to_range_max() {
        let target = curve().target_for(200.0, range());
        assert_eq!(target.percent, 100.0);
        assert!((target.level - 0.0).abs() < EPS);
    }

    #[test]
    fn out_of_range_distances_are_clamped_not_rejected() {
        let curve = curve();
        let range = range();
        assert_eq!(curve.target_for(-40.0, range).distance, 25.0);
        assert_eq!(curve.target_for(900.0, range).distance, 200.0);
        assert_eq!(curve.target_for(-40.0, range), curve.target_for(25.0, range));
    }

    #[test]
    fn levels_stay_inside_the_range() {
        let curve = curve();
        let range = VolumeRange::new(-96.0, -10.0).unwrap();
        for d in (0..300).map(f64::from) {
            let level = curve.target_for(d, range).level;
            assert!(level >= range.min && level <= range.max);
        }
    }

    #[test]
    fn interp_clamps_outside_domain() {
        assert_eq!(interp(-1.0, (0.0, 1.0), (-60.0, 0.0)), -60.0);
        assert_eq!(interp(2.0, (0.0, 1.0), (-60.0, 0.0)), 0.0);
        assert!((interp(0.25, (0.0, 1.0), (-60.0, 0.0)) + 45.0).abs() < EPS);
        // Descending ranges work too (the overlay bar grows upwards).
        assert_eq!(interp(50.0, (0.0, 100.0), (400.0, 150.0)), 275.0);
    }

    #[test]
    fn constructors_reject_bad_parameters() {
        assert!(VolumeCurve::new(200.0, 25.0, 10.0).is_err());
        assert!(VolumeCurve::new(25.0, 200.0, 0.0).is_err());
        assert!(VolumeCurve::new(25.0, 200.0, 101.0).is_err());
        assert!(VolumeRange::new(0.0, 0.0).is_err());
    }
}
