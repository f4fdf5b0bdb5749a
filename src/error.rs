// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the technique evaluation library.
//!
//! Evaluation-time conditions (missing keypoints, degenerate geometry,
//! unconfigured scoring) are represented as status values on the result
//! types, not as errors. This module only covers faults that happen before
//! or outside an evaluation pass: configuration loading and refinement
//! transport.

use std::fmt;

/// Result type alias for technique evaluation operations.
pub type Result<T> = std::result::Result<T, TechniqueError>;

/// Main error type for the technique evaluation library.
#[derive(Debug)]
pub enum TechniqueError {
    /// Error loading or parsing an evaluation configuration.
    ConfigError(String),
    /// Error from the optional text refinement backend.
    RefineError(String),
    /// IO error (file not found, permission denied, etc.).
    Io(std::io::Error),
}

impl fmt::Display for TechniqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::RefineError(msg) => write!(f, "Refine error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for TechniqueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TechniqueError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TechniqueError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TechniqueError::ConfigError("test".to_string());
        assert_eq!(err.to_string(), "Config error: test");

        let err = TechniqueError::RefineError("test".to_string());
        assert_eq!(err.to_string(), "Refine error: test");
    }

    #[test]
    fn test_io_error_source() {
        let err: TechniqueError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
