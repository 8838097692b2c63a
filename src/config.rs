use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Builds with camera capture and the landmark model default to the live
/// pipeline. Anything less defaults to the stub camera, synthetic hand and
/// simulated volume, so a plain build runs out of the box.
pub const LIVE_PIPELINE: bool = cfg!(all(feature = "ingest-v4l2", feature = "backend-tract"));

pub const DEFAULT_CAMERA_DEVICE: &str = if LIVE_PIPELINE {
    "/dev/video0"
} else {
    "stub://camera"
};
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;
pub const DEFAULT_MODEL_PATH: &str = "models/hand_landmark.onnx";
const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
pub const MIN_HAND_DISTANCE: f64 = 25.0;
pub const MAX_HAND_DISTANCE: f64 = 200.0;
pub const SMOOTHING_WINDOW: usize = 5;
pub const SHOW_FPS: bool = true;
pub const MIN_AUDIBLE_PERCENT: f64 = 10.0;
pub const VOLUME_CHANGE_THRESHOLD: f64 = 0.8;
const DEFAULT_PACTL_SINK: &str = "@DEFAULT_SINK@";
const DEFAULT_MIN_DB: f64 = -65.25;
const DEFAULT_MAX_DB: f64 = 0.0;

#[derive(Debug, Deserialize, Default)]
struct PinchVolumeConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    mapping: Option<MappingConfigFile>,
    smoothing: Option<SmoothingConfigFile>,
    audio: Option<AudioConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    mirror: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<DetectorBackendKind>,
    model_path: Option<PathBuf>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct MappingConfigFile {
    min_hand_distance: Option<f64>,
    max_hand_distance: Option<f64>,
    min_audible_percent: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SmoothingConfigFile {
    window: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct AudioConfigFile {
    backend: Option<AudioBackendKind>,
    sink: Option<String>,
    min_db: Option<f64>,
    max_db: Option<f64>,
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    enabled: Option<bool>,
    show_fps: Option<bool>,
}

/// Which hand detector to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackendKind {
    /// Scripted pinch cycle, no model required.
    Synthetic,
    /// ONNX hand landmark model via tract (feature `backend-tract`).
    Tract,
}

impl DetectorBackendKind {
    pub fn default_for_build() -> Self {
        if LIVE_PIPELINE {
            Self::Tract
        } else {
            Self::Synthetic
        }
    }
}

impl FromStr for DetectorBackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Self::Synthetic),
            "tract" => Ok(Self::Tract),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected synthetic or tract)",
                other
            )),
        }
    }
}

/// Which volume endpoint to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackendKind {
    /// In-memory endpoint; logs writes and touches nothing.
    Simulated,
    /// PulseAudio / PipeWire default sink through `pactl`.
    Pactl,
}

impl AudioBackendKind {
    pub fn default_for_build() -> Self {
        if LIVE_PIPELINE {
            Self::Pactl
        } else {
            Self::Simulated
        }
    }
}

impl FromStr for AudioBackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "pactl" => Ok(Self::Pactl),
            other => Err(anyhow!(
                "unknown audio backend '{}' (expected simulated or pactl)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PinchVolumeConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub mapping: MappingSettings,
    pub smoothing_window: usize,
    pub audio: AudioSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Flip frames horizontally so the preview behaves like a mirror.
    pub mirror: bool,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: DetectorBackendKind,
    pub model_path: PathBuf,
    pub min_confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingSettings {
    pub min_hand_distance: f64,
    pub max_hand_distance: f64,
    pub min_audible_percent: f64,
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub backend: AudioBackendKind,
    /// Sink name passed to `pactl`.
    pub sink: String,
    /// Volume range in dB reported for endpoints that have no native range query.
    pub min_db: f64,
    pub max_db: f64,
    /// Minimum change in dB before a new level is written.
    pub threshold: f64,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub show_fps: bool,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            min_hand_distance: MIN_HAND_DISTANCE,
            max_hand_distance: MAX_HAND_DISTANCE,
            min_audible_percent: MIN_AUDIBLE_PERCENT,
        }
    }
}

impl Default for PinchVolumeConfig {
    fn default() -> Self {
        // Defaults cannot fail: every field falls back to a constant.
        Self::from_file(PinchVolumeConfigFile::default())
    }
}

impl PinchVolumeConfig {
    /// Load from the file named by `PINCH_VOLUME_CONFIG` (if any), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PINCH_VOLUME_CONFIG").ok();
        Self::load_with(config_path.as_deref().map(Path::new))
    }

    /// Like [`load`](Self::load) but with an explicit config file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(Some(path))
    }

    fn load_with(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PinchVolumeConfigFile) -> Self {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            mirror: camera_file.mirror.unwrap_or(true),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(DetectorBackendKind::default_for_build),
            model_path: detector_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            min_confidence: detector_file
                .min_confidence
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
        };

        let mapping_file = file.mapping.unwrap_or_default();
        let mapping = MappingSettings {
            min_hand_distance: mapping_file
                .min_hand_distance
                .unwrap_or(MIN_HAND_DISTANCE),
            max_hand_distance: mapping_file
                .max_hand_distance
                .unwrap_or(MAX_HAND_DISTANCE),
            min_audible_percent: mapping_file
                .min_audible_percent
                .unwrap_or(MIN_AUDIBLE_PERCENT),
        };

        let smoothing_window = file
            .smoothing
            .and_then(|smoothing| smoothing.window)
            .unwrap_or(SMOOTHING_WINDOW);

        let audio_file = file.audio.unwrap_or_default();
        let audio = AudioSettings {
            backend: audio_file
                .backend
                .unwrap_or_else(AudioBackendKind::default_for_build),
            sink: audio_file
                .sink
                .unwrap_or_else(|| DEFAULT_PACTL_SINK.to_string()),
            min_db: audio_file.min_db.unwrap_or(DEFAULT_MIN_DB),
            max_db: audio_file.max_db.unwrap_or(DEFAULT_MAX_DB),
            threshold: audio_file.threshold.unwrap_or(VOLUME_CHANGE_THRESHOLD),
        };

        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            enabled: display_file.enabled.unwrap_or(true),
            show_fps: display_file.show_fps.unwrap_or(SHOW_FPS),
        };

        Self {
            camera,
            detector,
            mapping,
            smoothing_window,
            audio,
            display,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("PINCH_VOLUME_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(backend) = std::env::var("PINCH_VOLUME_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.parse()?;
            }
        }
        if let Ok(path) = std::env::var("PINCH_VOLUME_MODEL") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("PINCH_VOLUME_AUDIO") {
            if !backend.trim().is_empty() {
                self.audio.backend = backend.parse()?;
            }
        }
        if let Ok(window) = std::env::var("PINCH_VOLUME_SMOOTHING_WINDOW") {
            self.smoothing_window = window.trim().parse().map_err(|_| {
                anyhow!("PINCH_VOLUME_SMOOTHING_WINDOW must be a positive integer")
            })?;
        }
        if let Ok(headless) = std::env::var("PINCH_VOLUME_HEADLESS") {
            self.display.enabled = !parse_flag(&headless)?;
        }
        Ok(())
    }

    /// Check cross-field constraints. Call again after applying CLI overrides.
    pub fn validate(&self) -> Result<()> {
        let mapping = &self.mapping;
        if !(mapping.min_hand_distance >= 0.0
            && mapping.min_hand_distance < mapping.max_hand_distance)
        {
            return Err(anyhow!(
                "mapping distances must satisfy 0 <= min < max (got {} and {})",
                mapping.min_hand_distance,
                mapping.max_hand_distance
            ));
        }
        if !(mapping.min_audible_percent > 0.0 && mapping.min_audible_percent <= 100.0) {
            return Err(anyhow!(
                "min_audible_percent must be in (0, 100], got {}",
                mapping.min_audible_percent
            ));
        }
        if self.smoothing_window == 0 {
            return Err(anyhow!("smoothing window must be at least 1"));
        }
        if !(self.audio.min_db < self.audio.max_db) {
            return Err(anyhow!(
                "audio range must satisfy min_db < max_db (got {} and {})",
                self.audio.min_db,
                self.audio.max_db
            ));
        }
        if !(self.audio.threshold >= 0.0) {
            return Err(anyhow!("audio threshold must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.detector.min_confidence) {
            return Err(anyhow!(
                "detector min_confidence must be in [0, 1], got {}",
                self.detector.min_confidence
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<PinchVolumeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("expected a boolean flag, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_tuned_constants() {
        let cfg = PinchVolumeConfig::default();
        assert_eq!(cfg.mapping.min_hand_distance, 25.0);
        assert_eq!(cfg.mapping.max_hand_distance, 200.0);
        assert_eq!(cfg.mapping.min_audible_percent, 10.0);
        assert_eq!(cfg.smoothing_window, 5);
        assert_eq!(cfg.audio.threshold, 0.8);
        assert!(cfg.display.show_fps);
        assert!(cfg.camera.mirror);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_distances() {
        let mut cfg = PinchVolumeConfig::default();
        cfg.mapping.min_hand_distance = 200.0;
        cfg.mapping.max_hand_distance = 25.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_window_and_bad_range() {
        let mut cfg = PinchVolumeConfig::default();
        cfg.smoothing_window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = PinchVolumeConfig::default();
        cfg.audio.min_db = 0.0;
        cfg.audio.max_db = -10.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn backend_names_parse_case_insensitively() -> Result<()> {
        assert_eq!("Tract".parse::<DetectorBackendKind>()?, DetectorBackendKind::Tract);
        assert_eq!(" synthetic ".parse::<DetectorBackendKind>()?, DetectorBackendKind::Synthetic);
        assert_eq!("PACTL".parse::<AudioBackendKind>()?, AudioBackendKind::Pactl);
        assert!("alsa".parse::<AudioBackendKind>().is_err());
        Ok(())
    }

    #[test]
    fn flags_parse() -> Result<()> {
        assert!(parse_flag("1")?);
        assert!(parse_flag("TRUE")?);
        assert!(!parse_flag("off")?);
        assert!(parse_flag("maybe").is_err());
        Ok(())
    }
}
