//! Error types for robot operations.

use thiserror::Error;

/// Errors raised by the mount, sensor, drive and navigation layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RobotError {
    /// Angle outside [0, 360) or outside the mount's allowed arc.
    #[error("invalid angle {angle}: {reason}")]
    InvalidAngle {
        /// The rejected angle.
        angle: f64,
        /// Why it was rejected.
        reason: String,
    },

    /// Directional command the sensor cannot honor.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Every sample of a swath failed.
    #[error("no measurement at angle {angle}")]
    NoMeasurement {
        /// Center of the swath that produced nothing.
        angle: f64,
    },

    /// A required collaborator is missing.
    #[error("unconfigured: {0}")]
    Unconfigured(String),

    /// A configuration parameter was rejected.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl RobotError {
    /// Creates an invalid angle error.
    pub fn invalid_angle(angle: f64, reason: impl Into<String>) -> Self {
        Self::InvalidAngle {
            angle,
            reason: reason.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for robot operations.
pub type Result<T> = std::result::Result<T, RobotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RobotError::invalid_angle(360.0, "must be in range 0-359");
        let msg = format!("{err}");
        assert!(msg.contains("360"));
        assert!(msg.contains("0-359"));
    }

    #[test]
    fn error_no_measurement() {
        let msg = format!("{}", RobotError::NoMeasurement { angle: 180.0 });
        assert!(msg.contains("180"));
    }

    #[test]
    fn error_invalid_parameter() {
        let err = RobotError::invalid_parameter("kp", "must be non-negative");
        let msg = format!("{err}");
        assert!(msg.contains("kp"));
        assert!(msg.contains("non-negative"));
    }
}
