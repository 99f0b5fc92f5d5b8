//! Error types for the alignment pipeline.
//!
//! Every error is a deterministic function of the inputs; nothing here is
//! transient or worth retrying.

use thiserror::Error;

/// Main error type for pipeline stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VivipetError {
    /// Invalid configuration (unknown preset, zero factor, bad width, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A spatial frame cannot be inverted or decomposed.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The volume cannot go through a stage (e.g. it crops to nothing).
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
}

/// Result type for pipeline stages.
pub type Result<T> = std::result::Result<T, VivipetError>;

impl VivipetError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create an invalid volume error.
    pub fn invalid_volume(msg: impl Into<String>) -> Self {
        Self::InvalidVolume(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VivipetError::invalid_configuration("unknown window preset 'bone'");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: unknown window preset 'bone'"
        );
    }

    #[test]
    fn test_geometry_error() {
        let err = VivipetError::geometry("singular frame");
        assert!(matches!(err, VivipetError::Geometry(_)));
    }
}
