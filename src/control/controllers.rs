//! Controllers for the robot

use crate::common::error::{Result, RobotError};
use std::collections::HashMap;

/// Proportional-differential controller on corridor cross-track error.
///
/// Positive cross-track error means the robot is left of the centerline;
/// positive steering turns the robot left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossTrackController {
    kp: f64,
    kd: f64,
}

impl CrossTrackController {
    /// Create a new controller
    pub fn new() -> Self {
        CrossTrackController { kp: 0.2, kd: 1.0 }
    }

    pub fn with_gains(kp: f64, kd: f64) -> Self {
        CrossTrackController { kp, kd }
    }

    pub fn gains(&self) -> (f64, f64) {
        (self.kp, self.kd)
    }

    /// Steering factor for the current error and the error one period ago
    pub fn compute_steering(&self, cte: f64, last_cte: f64) -> f64 {
        -self.kp * cte - self.kd * (cte - last_cte)
    }

    /// Configure the gains with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&kp) = params.get("kp") {
            if kp < 0.0 {
                return Err(RobotError::invalid_parameter("kp", "must be non-negative"));
            }
            self.kp = kp;
        }

        if let Some(&kd) = params.get("kd") {
            if kd < 0.0 {
                return Err(RobotError::invalid_parameter("kd", "must be non-negative"));
            }
            self.kd = kd;
        }

        Ok(())
    }
}

impl Default for CrossTrackController {
    fn default() -> Self {
        Self::new()
    }
}
