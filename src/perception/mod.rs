//! Perception module: the swivel mount, range sensing and heading estimation
pub mod filters;
pub mod heading;
pub mod mount;
pub mod sensors;

pub use self::heading::HeadingDistribution;
pub use self::mount::{MountConfig, SwivelMount};
pub use self::sensors::{RangeSensor, SensorConfig, UltrasonicSensor};
