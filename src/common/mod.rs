//! Common utilities and types for the corridor robot
pub mod angles;
pub mod error;

/// Common types used across the codebase
pub mod types {
    /// A direction in degrees, clockwise positive, 0 = robot forward
    pub type Degrees = f64;

    /// A range reading in centimetres
    pub type Centimeters = u32;

    /// One sample of a distance scan: (direction, distance)
    pub type ScanSample = (Degrees, Centimeters);

    /// An ordered sequence of samples across a continuous arc
    pub type DistanceScan = Vec<ScanSample>;
}
