use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures the control loop has to tell apart.
///
/// Everything else travels as a plain `anyhow::Error`. The loop downcasts to
/// this type to decide between a fatal startup failure and a graceful stop.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The camera could not be opened. Fatal at startup, never retried.
    #[error("camera {device} unavailable")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: BoxError,
    },

    /// A frame read failed mid-stream. Treated as end of stream.
    #[error("frame capture failed: {0}")]
    Capture(String),
}

impl ControlError {
    pub fn device_unavailable(device: &str, source: impl Into<BoxError>) -> Self {
        Self::DeviceUnavailable {
            device: device.to_string(),
            source: source.into(),
        }
    }

    pub fn capture(reason: impl std::fmt::Display) -> Self {
        Self::Capture(reason.to_string())
    }
}

/// Returns true when `err` means the frame stream has ended.
pub fn is_end_of_stream(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ControlError>(), Some(ControlError::Capture(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_errors_mark_end_of_stream() {
        let err = anyhow::Error::new(ControlError::capture("device unplugged"));
        assert!(is_end_of_stream(&err));
        assert_eq!(err.to_string(), "frame capture failed: device unplugged");
    }

    #[test]
    fn device_errors_are_not_end_of_stream() {
        let err = anyhow::Error::new(ControlError::device_unavailable("/dev/video3", "ENOENT"));
        assert!(!is_end_of_stream(&err));
        assert!(!is_end_of_stream(&anyhow::anyhow!("other")));
    }

    #[test]
    fn device_errors_keep_their_cause_chain() {
        let cause = anyhow::anyhow!("No such file or directory").context("open v4l2 device /dev/video9");
        let err = anyhow::Error::new(ControlError::device_unavailable("/dev/video9", cause));

        assert_eq!(err.to_string(), "camera /dev/video9 unavailable");
        let chain: Vec<String> = err.chain().map(|e| e.to_string()).collect();
        assert_eq!(
            chain,
            vec![
                "camera /dev/video9 unavailable",
                "open v4l2 device /dev/video9",
                "No such file or directory",
            ]
        );
        assert_eq!(
            format!("{:#}", err),
            "camera /dev/video9 unavailable: open v4l2 device /dev/video9: No such file or directory"
        );
    }
}
