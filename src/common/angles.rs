//! Angle normalization and wrap-aware distances

use super::types::Degrees;

/// Wrap an angle into [0, 360)
pub fn normalize(angle: Degrees) -> Degrees {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into (-180, 180]
pub fn to_signed(angle: Degrees) -> Degrees {
    let wrapped = normalize(angle);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// True if the angle lies in [0, 360)
pub fn is_valid_angle(angle: Degrees) -> bool {
    (0.0..360.0).contains(&angle)
}

/// Shortest angular travel between two directions, in [0, 180]
pub fn angular_distance(from: Degrees, to: Degrees) -> Degrees {
    to_signed(to - from).abs()
}
