mod backend;
pub mod backends;
pub mod landmarks;

pub use backend::HandDetector;
pub use backends::{synthetic_hand, SyntheticBackend};
pub use landmarks::{HandLandmarks, Landmark, HAND_CONNECTIONS};

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;

use anyhow::Result;

use crate::config::{DetectorBackendKind, DetectorSettings};

/// Build the detector named in the settings.
pub fn select_detector(settings: &DetectorSettings) -> Result<Box<dyn HandDetector>> {
    match settings.backend {
        DetectorBackendKind::Synthetic => Ok(Box::new(SyntheticBackend::new())),
        DetectorBackendKind::Tract => open_tract(settings),
    }
}

#[cfg(feature = "backend-tract")]
fn open_tract(settings: &DetectorSettings) -> Result<Box<dyn HandDetector>> {
    let backend = TractBackend::new(&settings.model_path)?.with_threshold(settings.min_confidence);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(_settings: &DetectorSettings) -> Result<Box<dyn HandDetector>> {
    Err(anyhow::anyhow!(
        "the tract detector requires the backend-tract feature"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(backend: DetectorBackendKind) -> DetectorSettings {
        DetectorSettings {
            backend,
            model_path: PathBuf::from("missing/hand_landmark.onnx"),
            min_confidence: 0.7,
        }
    }

    #[test]
    fn synthetic_backend_is_always_available() -> Result<()> {
        let detector = select_detector(&settings(DetectorBackendKind::Synthetic))?;
        assert_eq!(detector.name(), "synthetic");
        Ok(())
    }

    #[test]
    fn tract_backend_without_model_fails() {
        assert!(select_detector(&settings(DetectorBackendKind::Tract)).is_err());
    }
}
