//! Servo-driven swivel mount for the rangefinder

use crate::common::angles::{angular_distance, is_valid_angle, normalize};
use crate::common::error::{Result, RobotError};
use crate::common::types::Degrees;
use crate::hardware::{self, Clock, SharedDriver};
use log::trace;
use std::sync::Arc;
use std::time::Duration;

/// Settle time per 90 degrees of travel
const SETTLE_DELAYS: [Duration; 4] = [
    Duration::from_millis(200),
    Duration::from_millis(400),
    Duration::from_millis(600),
    Duration::from_millis(800),
];

/// Mount geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountConfig {
    /// Direction of the mount's center, relative to the robot's centerline
    pub center: Degrees,
    /// Servo angle that points the mount at `center`
    pub servo_center: Degrees,
    /// True if increasing the servo angle swivels clockwise seen from above
    pub clockwise: bool,
    /// Allowable travel, centered on `center`
    pub arc: Degrees,
}

impl Default for MountConfig {
    fn default() -> Self {
        MountConfig {
            center: 0.0,
            servo_center: 90.0,
            clockwise: false,
            arc: 180.0,
        }
    }
}

/// A mount that swivels through a horizontal arc
pub struct SwivelMount {
    driver: SharedDriver,
    clock: Arc<dyn Clock>,
    config: MountConfig,
    max_left: Degrees,
    max_right: Degrees,
    current_angle: Degrees,
}

impl SwivelMount {
    /// Create a mount and swing it to its center
    pub fn new(driver: SharedDriver, clock: Arc<dyn Clock>, config: MountConfig) -> Result<Self> {
        for (name, value) in [
            ("center", config.center),
            ("arc", config.arc),
            ("servo_center", config.servo_center),
        ] {
            if !is_valid_angle(value) {
                return Err(RobotError::invalid_angle(
                    value,
                    format!("{name} must be in range 0-359"),
                ));
            }
        }

        let mut mount = SwivelMount {
            driver,
            clock,
            config,
            max_left: normalize(config.center - config.arc / 2.0),
            max_right: normalize(config.center + config.arc / 2.0),
            current_angle: config.center,
        };
        mount.center()?;
        Ok(mount)
    }

    /// True if the angle is within the left/right limits
    pub fn can_reach(&self, angle: Degrees) -> bool {
        is_valid_angle(angle) && angular_distance(self.config.center, angle) <= self.config.arc / 2.0
    }

    /// Position along the arc, measured clockwise from the left limit
    fn arc_offset(&self, angle: Degrees) -> Degrees {
        normalize(angle - self.max_left)
    }

    /// Servo angle that points the mount at `angle`
    pub fn servo_angle(&self, angle: Degrees) -> Degrees {
        if self.config.clockwise {
            normalize(self.config.servo_center + angle)
        } else {
            normalize(self.config.servo_center - angle)
        }
    }

    /// Swivel to `angle` and wait for the servo to settle
    pub fn swivel(&mut self, angle: Degrees) -> Result<()> {
        if !is_valid_angle(angle) {
            return Err(RobotError::invalid_angle(angle, "must be in range 0-359"));
        }
        if !self.can_reach(angle) {
            return Err(RobotError::invalid_angle(
                angle,
                format!("must be in range {}-{}", self.max_left, self.max_right),
            ));
        }

        let servo = (self.servo_angle(angle).round() as u16) % 360;
        trace!("swivel mount {} -> {} (servo {})", self.current_angle, angle, servo);
        hardware::lock(&self.driver).servo(servo);

        // the servo sweeps through the arc, never across the dead zone
        let travel = (self.arc_offset(angle) - self.arc_offset(self.current_angle)).abs();
        let tier = ((travel / 90.0) as usize).min(SETTLE_DELAYS.len() - 1);
        self.clock.sleep(SETTLE_DELAYS[tier]);

        self.current_angle = angle;
        Ok(())
    }

    /// Swivel back to the mount's center
    pub fn center(&mut self) -> Result<()> {
        self.swivel(self.config.center)
    }

    pub fn current_angle(&self) -> Degrees {
        self.current_angle
    }

    /// (max_left, max_right)
    pub fn arc_limits(&self) -> (Degrees, Degrees) {
        (self.max_left, self.max_right)
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::recording::{DriverCall, RecordingDriver, SimulatedClock};
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn mount_with(config: MountConfig) -> (SwivelMount, Arc<Mutex<RecordingDriver>>, SimulatedClock) {
        let driver = Arc::new(Mutex::new(RecordingDriver::new()));
        let clock = SimulatedClock::new();
        let mount = SwivelMount::new(driver.clone(), Arc::new(clock.clone()), config).unwrap();
        driver.lock().unwrap().clear_calls();
        (mount, driver, clock)
    }

    #[test]
    fn default_mount_limits_and_center() {
        let (mount, _, clock) = mount_with(MountConfig::default());
        assert_eq!(mount.arc_limits(), (270.0, 90.0));
        assert_relative_eq!(mount.current_angle(), 0.0);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(200)]);
    }

    #[test]
    fn construction_centers_the_servo() {
        let driver = Arc::new(Mutex::new(RecordingDriver::new()));
        let config = MountConfig {
            servo_center: 93.0,
            ..MountConfig::default()
        };
        SwivelMount::new(driver.clone(), Arc::new(SimulatedClock::new()), config).unwrap();
        assert_eq!(driver.lock().unwrap().calls(), &[DriverCall::Servo(93)]);
    }

    #[test]
    fn construction_rejects_out_of_range_angles() {
        let driver: SharedDriver = Arc::new(Mutex::new(RecordingDriver::new()));
        let clock: Arc<dyn Clock> = Arc::new(SimulatedClock::new());
        let bad = [
            MountConfig { center: 375.0, ..MountConfig::default() },
            MountConfig { arc: 375.0, ..MountConfig::default() },
            MountConfig { servo_center: 375.0, ..MountConfig::default() },
        ];
        for config in bad {
            let result = SwivelMount::new(driver.clone(), clock.clone(), config);
            assert!(matches!(result, Err(RobotError::InvalidAngle { .. })));
        }
    }

    #[test]
    fn counter_clockwise_servo_translation() {
        let (mount, _, _) = mount_with(MountConfig::default());
        assert_relative_eq!(mount.servo_angle(0.0), 90.0);
        assert_relative_eq!(mount.servo_angle(90.0), 0.0);
        assert_relative_eq!(mount.servo_angle(270.0), 180.0);
    }

    #[test]
    fn clockwise_servo_translation() {
        let (mount, _, _) = mount_with(MountConfig {
            clockwise: true,
            ..MountConfig::default()
        });
        assert_relative_eq!(mount.servo_angle(0.0), 90.0);
        assert_relative_eq!(mount.servo_angle(90.0), 180.0);
        assert_relative_eq!(mount.servo_angle(270.0), 0.0);
    }

    #[test]
    fn swivel_commands_servo_and_records_angle() {
        let (mut mount, driver, _) = mount_with(MountConfig::default());
        mount.swivel(90.0).unwrap();
        assert_eq!(driver.lock().unwrap().calls(), &[DriverCall::Servo(0)]);
        assert_relative_eq!(mount.current_angle(), 90.0);
    }

    #[test]
    fn swivel_rejects_invalid_angles() {
        let (mut mount, _, _) = mount_with(MountConfig::default());
        for angle in [-1.0, 360.0] {
            assert!(matches!(mount.swivel(angle), Err(RobotError::InvalidAngle { .. })));
        }
        assert!(mount.swivel(0.0).is_ok());
        assert!(mount.swivel(359.0).is_ok());
    }

    #[test]
    fn swivel_rejects_angles_outside_arc() {
        let (mut mount, driver, _) = mount_with(MountConfig::default());
        for angle in [91.0, 180.0, 269.0] {
            assert!(matches!(mount.swivel(angle), Err(RobotError::InvalidAngle { .. })));
        }
        assert!(driver.lock().unwrap().calls().is_empty());
    }

    #[test]
    fn settle_delay_grows_with_travel() {
        let (mut mount, _, clock) = mount_with(MountConfig::default());
        mount.swivel(45.0).unwrap();
        mount.swivel(315.0).unwrap();
        mount.swivel(270.0).unwrap();
        mount.swivel(90.0).unwrap();
        let sleeps = clock.sleeps();
        assert_eq!(
            &sleeps[1..],
            &[
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(200),
                Duration::from_millis(600),
            ]
        );
    }

    #[test]
    fn zero_arc_only_reaches_center() {
        let (mut mount, driver, _) = mount_with(MountConfig {
            arc: 0.0,
            ..MountConfig::default()
        });
        assert!(mount.can_reach(0.0));
        assert!(!mount.can_reach(180.0));
        assert!(!mount.can_reach(1.0));
        assert!(matches!(mount.swivel(180.0), Err(RobotError::InvalidAngle { .. })));
        assert!(driver.lock().unwrap().calls().is_empty());
        assert!(mount.swivel(0.0).is_ok());
    }

    #[test]
    fn settle_delay_follows_travel_along_the_arc() {
        let (mut mount, _, clock) = mount_with(MountConfig {
            arc: 300.0,
            ..MountConfig::default()
        });
        assert_eq!(mount.arc_limits(), (210.0, 150.0));
        mount.swivel(150.0).unwrap();
        // 300 degrees the long way round; the short way crosses the dead zone
        mount.swivel(210.0).unwrap();
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn center_returns_to_mount_center() {
        let (mut mount, driver, _) = mount_with(MountConfig::default());
        mount.swivel(60.0).unwrap();
        mount.center().unwrap();
        assert_relative_eq!(mount.current_angle(), 0.0);
        assert_eq!(driver.lock().unwrap().servo_angles(), vec![30, 90]);
    }
}
