//! PulseAudio / PipeWire volume endpoint driven through the `pactl` CLI.
//!
//! `pactl` reports volume in dB but only accepts absolute values as linear
//! factors (a leading `-` means "relative"), so writes convert dB to
//! `10^(dB/20)` first.

use std::process::Command;

use anyhow::{anyhow, Context, Result};
use regex::Regex;

use super::VolumeEndpoint;
use crate::mapping::VolumeRange;

pub struct PactlEndpoint {
    sink: String,
    range: VolumeRange,
    level_pattern: Regex,
}

impl PactlEndpoint {
    /// `range` is the dB span the gesture covers; pactl has no range query.
    pub fn new(sink: &str, range: VolumeRange) -> Result<Self> {
        let level_pattern = Regex::new(r"(-?\d+(?:\.\d+)?|-inf)\s*dB")
            .context("compile pactl volume pattern")?;
        Ok(Self {
            sink: sink.to_string(),
            range,
            level_pattern,
        })
    }

    fn parse_level(&self, output: &str) -> Result<f64> {
        let caps = self
            .level_pattern
            .captures(output)
            .ok_or_else(|| anyhow!("no dB value in pactl output: {}", output.trim()))?;
        match &caps[1] {
            "-inf" => Ok(self.range.min),
            value => value
                .parse::<f64>()
                .map_err(|e| anyhow!("invalid dB value '{}': {}", value, e)),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("pactl")
            .args(args)
            .output()
            .context("failed to spawn pactl (is PulseAudio or PipeWire installed?)")?;
        if !output.status.success() {
            return Err(anyhow!(
                "pactl {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VolumeEndpoint for PactlEndpoint {
    fn name(&self) -> &'static str {
        "pactl"
    }

    fn range(&self) -> Result<VolumeRange> {
        Ok(self.range)
    }

    fn current_level(&self) -> Result<f64> {
        let output = self.run(&["get-sink-volume", &self.sink])?;
        self.parse_level(&output)
    }

    fn set_level(&mut self, level: f64) -> Result<()> {
        let value = volume_arg(level, self.range);
        self.run(&["set-sink-volume", &self.sink, &value])?;
        Ok(())
    }
}

/// `set-sink-volume` argument for a dB level, clamped to `range` first.
fn volume_arg(level: f64, range: VolumeRange) -> String {
    format!("{:.6}", db_to_linear(range.clamp(level)))
}

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
