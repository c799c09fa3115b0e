//! Range sensor interfaces for the corridor robot
pub mod ultrasonic;

use crate::common::error::Result;
use crate::common::types::{Centimeters, Degrees, DistanceScan};

pub use ultrasonic::{SensorConfig, UltrasonicSensor};

/// A directional range sensor.
///
/// Angles are mount-relative directions in [0, 360).
pub trait RangeSensor: Send {
    /// Get the sensor name
    fn name(&self) -> &str;

    /// Closest obstacle in the default swath centered on `angle`
    fn sense(&mut self, angle: Degrees) -> Result<Centimeters>;

    /// Filtered distance in exactly one direction
    fn sense_distance(&mut self, angle: Degrees) -> Result<Centimeters>;

    /// Closest obstacle among `samples` directions across `center ± width/2`
    fn sense_swath(&mut self, center: Degrees, width: Degrees, samples: usize) -> Result<Centimeters>;

    /// Every reachable sample across `center ± width/2`, in sweep order
    fn scan(&mut self, center: Degrees, width: Degrees, samples: usize) -> Result<DistanceScan>;

    /// Point the sensor back at its rest direction
    fn center(&mut self) -> Result<()>;

    /// True if the sensor sits on a movable mount
    fn has_mount(&self) -> bool;
}

/// Sample directions for a swath, wrapped into [0, 360)
pub fn swath_angles(center: Degrees, width: Degrees, samples: usize) -> Vec<Degrees> {
    match samples {
        0 => Vec::new(),
        1 => vec![crate::common::angles::normalize(center)],
        n => {
            let spacing = width / (n - 1) as f64;
            let start = center - width / 2.0;
            (0..n)
                .map(|i| crate::common::angles::normalize(start + i as f64 * spacing))
                .collect()
        }
    }
}
