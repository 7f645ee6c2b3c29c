use thiserror::Error;

/// Frame pipeline errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("no frame data supplied")]
    NullFrame,

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("destination too small: need {required} bytes, got {actual}")]
    DimensionMismatch { required: usize, actual: usize },

    #[error("device not ready: no frame captured yet")]
    DeviceNotReady,

    #[error("invalid frame geometry: {0}")]
    InvalidGeometry(String),

    #[error("native image access failed: {0}")]
    NativeImage(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_names_the_tag() {
        let err = FrameError::UnsupportedFormat("YUY2".to_string());
        assert_eq!(err.to_string(), "unsupported pixel format: YUY2");
    }

    #[test]
    fn dimension_mismatch_reports_sizes() {
        let err = FrameError::DimensionMismatch {
            required: 12,
            actual: 8,
        };
        assert_eq!(
            err.to_string(),
            "destination too small: need 12 bytes, got 8"
        );
    }
}
