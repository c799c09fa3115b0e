//! Control module: drive-train command translation and steering control
pub mod controllers;

use crate::common::error::{Result, RobotError};
use crate::common::types::{Centimeters, Degrees, DistanceScan};
use crate::hardware::{self, Motor, SharedDriver};
use crate::perception::sensors::RangeSensor;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Drive-train settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveConfig {
    /// Cruise speed; the slowest speed that does not stall the motors
    pub default_speed: u16,
    /// Outside-wheel speed added per unit of steering factor
    pub turn_offset: f64,
    /// Outside-wheel speed limit as a multiple of the cruise speed
    pub max_turn_ratio: f64,
    /// Robot rotation per encoder tick
    pub degrees_per_tick: f64,
    /// Trim setting for straight-line travel
    pub trim: i16,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            default_speed: 60,
            turn_offset: 10.0,
            max_turn_ratio: 1.5,
            degrees_per_tick: 5.0,
            trim: 90,
        }
    }
}

impl DriveConfig {
    /// Apply named parameters, rejecting invalid values
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&speed) = params.get("default_speed") {
            if !(1.0..=255.0).contains(&speed) {
                return Err(RobotError::invalid_parameter("default_speed", "must be in range 1-255"));
            }
            self.default_speed = speed.round() as u16;
        }

        if let Some(&offset) = params.get("turn_offset") {
            if offset < 0.0 {
                return Err(RobotError::invalid_parameter("turn_offset", "must be non-negative"));
            }
            self.turn_offset = offset;
        }

        if let Some(&ratio) = params.get("max_turn_ratio") {
            if ratio < 1.0 {
                return Err(RobotError::invalid_parameter("max_turn_ratio", "must be at least 1"));
            }
            self.max_turn_ratio = ratio;
        }

        if let Some(&dpt) = params.get("degrees_per_tick") {
            if dpt <= 0.0 {
                return Err(RobotError::invalid_parameter("degrees_per_tick", "must be positive"));
            }
            self.degrees_per_tick = dpt;
        }

        if let Some(&trim) = params.get("trim") {
            if !(-100.0..=255.0).contains(&trim) {
                return Err(RobotError::invalid_parameter("trim", "must be in range -100-255"));
            }
            self.trim = trim.round() as i16;
        }

        Ok(())
    }
}

/// Halts the motors from outside the control loop.
///
/// Once stopped, the drive controller ignores further motion commands, so a
/// control loop still running on another thread cannot restart the motors.
#[derive(Clone)]
pub struct StopHandle {
    driver: SharedDriver,
    halted: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        // flag before the bus lock: a command holding the lock now is
        // followed by this stop, a later one sees the flag
        self.halted.store(true, Ordering::SeqCst);
        hardware::lock(&self.driver).stop();
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}

/// Differential drive with wheel encoders and an optional range sensor
pub struct DriveController {
    driver: SharedDriver,
    config: DriveConfig,
    left_speed: u16,
    right_speed: u16,
    encoder_baseline: (i64, i64),
    sensor: Option<Box<dyn RangeSensor>>,
    halted: Arc<AtomicBool>,
}

impl DriveController {
    /// Take control of the bus: halt, set cruise speed and straight trim
    pub fn new(driver: SharedDriver, config: DriveConfig) -> Self {
        let encoder_baseline = {
            let mut bus = hardware::lock(&driver);
            bus.stop();
            bus.set_speed(config.default_speed);
            bus.trim_write(config.trim);
            (bus.enc_read(Motor::Left), bus.enc_read(Motor::Right))
        };

        DriveController {
            driver,
            config,
            left_speed: config.default_speed,
            right_speed: config.default_speed,
            encoder_baseline,
            sensor: None,
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach the range sensor used for navigation
    pub fn attach_sensor(&mut self, sensor: Box<dyn RangeSensor>) {
        info!("attached range sensor {}", sensor.name());
        self.sensor = Some(sensor);
    }

    fn sensor_mut(&mut self) -> Result<&mut Box<dyn RangeSensor>> {
        self.sensor
            .as_mut()
            .ok_or_else(|| RobotError::Unconfigured("no range sensor attached".to_string()))
    }

    /// Closest obstacle around a mount-relative direction
    pub fn sense(&mut self, angle: Degrees) -> Result<Centimeters> {
        self.sensor_mut()?.sense(angle)
    }

    /// Ordered distance scan across `center ± width/2`
    pub fn scan(&mut self, center: Degrees, width: Degrees, samples: usize) -> Result<DistanceScan> {
        self.sensor_mut()?.scan(center, width, samples)
    }

    /// True once a [`StopHandle`] has halted the motors
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Drive forward at cruise speed
    pub fn fwd(&mut self) {
        let mut bus = hardware::lock(&self.driver);
        if self.is_halted() {
            return;
        }
        self.left_speed = self.config.default_speed;
        self.right_speed = self.config.default_speed;
        bus.set_speed(self.config.default_speed);
        bus.fwd();
    }

    /// Halt; a mounted sensor is re-centered first
    pub fn stop(&mut self) -> Result<()> {
        let centered = match self.sensor.as_mut() {
            Some(sensor) if sensor.has_mount() => sensor.center(),
            _ => Ok(()),
        };
        hardware::lock(&self.driver).stop();
        centered
    }

    /// Bias the wheel speeds; positive turns left, negative turns right
    pub fn steer(&mut self, factor: f64) {
        let cruise = self.config.default_speed;
        let outside = (cruise as f64 + factor.abs() * self.config.turn_offset)
            .min(cruise as f64 * self.config.max_turn_ratio)
            .round() as u16;

        let (left, right) = if factor > 0.0 {
            (cruise, outside)
        } else if factor < 0.0 {
            (outside, cruise)
        } else {
            (cruise, cruise)
        };

        debug!("steer {:.2}: left {} right {}", factor, left, right);
        let mut bus = hardware::lock(&self.driver);
        if self.is_halted() {
            return;
        }
        bus.set_left_speed(left);
        bus.set_right_speed(right);
        self.left_speed = left;
        self.right_speed = right;
    }

    /// Rotate in place; positive is clockwise (right-hand)
    pub fn rotate(&mut self, degrees: Degrees) -> Result<()> {
        self.stop()?;

        let ticks = (degrees.abs() / self.config.degrees_per_tick).round() as u32;
        if ticks == 0 {
            return Ok(());
        }

        debug!("rotate {} degrees ({} ticks)", degrees, ticks);
        let mut bus = hardware::lock(&self.driver);
        if self.is_halted() {
            return Ok(());
        }
        bus.enc_tgt(true, true, ticks);
        if degrees > 0.0 {
            bus.right_rot();
        } else {
            bus.left_rot();
        }
        Ok(())
    }

    /// Degrees turned since the previous call; positive is clockwise.
    ///
    /// Each call rebases the encoder baseline, so callers accumulate totals.
    pub fn degrees_turned(&mut self) -> Degrees {
        let (left, right) = self.read_encoders();
        let (base_left, base_right) = self.encoder_baseline;
        self.encoder_baseline = (left, right);
        ((left - base_left) - (right - base_right)) as f64 * self.config.degrees_per_tick
    }

    fn read_encoders(&self) -> (i64, i64) {
        let mut bus = hardware::lock(&self.driver);
        (bus.enc_read(Motor::Left), bus.enc_read(Motor::Right))
    }

    /// Battery voltage
    pub fn voltage(&self) -> f64 {
        hardware::lock(&self.driver).volt()
    }

    /// Current (left, right) wheel speeds
    pub fn wheel_speeds(&self) -> (u16, u16) {
        (self.left_speed, self.right_speed)
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Configure the drive train with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        self.config.configure(params)
    }

    /// Handle that can halt the motors from another thread
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            driver: self.driver.clone(),
            halted: self.halted.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::recording::{DriverCall, RecordingDriver, SimulatedClock};
    use crate::perception::{MountConfig, SwivelMount, UltrasonicSensor};
    use std::sync::{Arc, Mutex};

    fn drive() -> (DriveController, Arc<Mutex<RecordingDriver>>) {
        let driver = Arc::new(Mutex::new(RecordingDriver::new()));
        let drive = DriveController::new(driver.clone(), DriveConfig::default());
        driver.lock().unwrap().clear_calls();
        (drive, driver)
    }

    fn mounted_drive() -> (DriveController, Arc<Mutex<RecordingDriver>>) {
        let (mut drive, driver) = drive();
        let mount = SwivelMount::new(
            driver.clone(),
            Arc::new(SimulatedClock::new()),
            MountConfig::default(),
        )
        .unwrap();
        drive.attach_sensor(Box::new(UltrasonicSensor::new(driver.clone(), Some(mount))));
        driver.lock().unwrap().clear_calls();
        (drive, driver)
    }

    #[test]
    fn new_initializes_bus() {
        let driver = Arc::new(Mutex::new(RecordingDriver::new()));
        DriveController::new(driver.clone(), DriveConfig::default());
        let driver = driver.lock().unwrap();
        assert_eq!(
            &driver.calls()[..3],
            &[DriverCall::Stop, DriverCall::SetSpeed(60), DriverCall::TrimWrite(90)]
        );
    }

    #[test]
    fn fwd_sets_cruise_speed() {
        let (mut drive, driver) = drive();
        drive.steer(2.0);
        drive.fwd();
        assert_eq!(drive.wheel_speeds(), (60, 60));
        let driver = driver.lock().unwrap();
        assert_eq!(&driver.calls()[2..], &[DriverCall::SetSpeed(60), DriverCall::Fwd]);
    }

    #[test]
    fn steer_left_speeds_up_right_wheel() {
        let (mut drive, driver) = drive();
        drive.steer(2.0);
        assert_eq!(drive.wheel_speeds(), (60, 80));
        assert_eq!(
            driver.lock().unwrap().calls(),
            &[DriverCall::SetLeftSpeed(60), DriverCall::SetRightSpeed(80)]
        );
    }

    #[test]
    fn steer_right_speeds_up_left_wheel() {
        let (mut drive, _) = drive();
        drive.steer(-1.5);
        assert_eq!(drive.wheel_speeds(), (75, 60));
    }

    #[test]
    fn steer_zero_restores_cruise() {
        let (mut drive, _) = drive();
        drive.steer(-1.0);
        drive.steer(0.0);
        assert_eq!(drive.wheel_speeds(), (60, 60));
    }

    #[test]
    fn steer_clamps_outside_wheel() {
        let (mut drive, _) = drive();
        for factor in [3.0, 4.5, 100.0] {
            drive.steer(factor);
            assert_eq!(drive.wheel_speeds(), (60, 90));
            drive.steer(-factor);
            assert_eq!(drive.wheel_speeds(), (90, 60));
        }
    }

    #[test]
    fn rotate_right_targets_ticks() {
        let (mut drive, driver) = drive();
        drive.rotate(90.0).unwrap();
        assert_eq!(
            driver.lock().unwrap().calls(),
            &[
                DriverCall::Stop,
                DriverCall::EncTgt { left: true, right: true, ticks: 18 },
                DriverCall::RightRot,
            ]
        );
    }

    #[test]
    fn rotate_left_for_negative_degrees() {
        let (mut drive, driver) = drive();
        drive.rotate(-45.0).unwrap();
        let driver = driver.lock().unwrap();
        assert_eq!(driver.count(&DriverCall::LeftRot), 1);
        assert_eq!(driver.count(&DriverCall::RightRot), 0);
    }

    #[test]
    fn rotate_zero_only_stops() {
        let (mut drive, driver) = drive();
        drive.rotate(0.0).unwrap();
        assert_eq!(driver.lock().unwrap().calls(), &[DriverCall::Stop]);
    }

    #[test]
    fn degrees_turned_is_consuming() {
        let (mut drive, driver) = drive();
        driver.lock().unwrap().set_encoders(12, -6);
        assert_eq!(drive.degrees_turned(), 90.0);
        assert_eq!(drive.degrees_turned(), 0.0);

        driver.lock().unwrap().set_encoders(10, -4);
        assert_eq!(drive.degrees_turned(), -20.0);
    }

    #[test]
    fn stop_recenters_mounted_sensor_first() {
        let (mut drive, driver) = mounted_drive();
        drive.sense(60.0).unwrap();
        driver.lock().unwrap().clear_calls();

        drive.stop().unwrap();
        assert_eq!(
            driver.lock().unwrap().calls(),
            &[DriverCall::Servo(90), DriverCall::Stop]
        );
    }

    #[test]
    fn sensing_without_sensor_is_unconfigured() {
        let (mut drive, _) = drive();
        assert!(matches!(drive.sense(0.0), Err(RobotError::Unconfigured(_))));
        assert!(matches!(drive.scan(0.0, 180.0, 19), Err(RobotError::Unconfigured(_))));
    }

    #[test]
    fn stop_handle_halts_motors() {
        let (drive, driver) = drive();
        let handle = drive.stop_handle();
        std::thread::spawn(move || handle.stop()).join().unwrap();
        assert_eq!(driver.lock().unwrap().calls(), &[DriverCall::Stop]);
    }

    #[test]
    fn halted_drive_ignores_motion_commands() {
        let (mut drive, driver) = drive();
        let handle = drive.stop_handle();
        handle.stop();
        assert!(drive.is_halted());
        assert!(handle.is_halted());

        drive.fwd();
        drive.steer(-2.0);
        drive.rotate(90.0).unwrap();
        assert_eq!(drive.wheel_speeds(), (60, 60));
        // the rotation's leading stop is still issued
        assert_eq!(
            driver.lock().unwrap().calls(),
            &[DriverCall::Stop, DriverCall::Stop]
        );
    }

    #[test]
    fn voltage_reads_the_bus() {
        let driver = Arc::new(Mutex::new(RecordingDriver::new().with_voltage(9.6)));
        let drive = DriveController::new(driver.clone(), DriveConfig::default());
        assert_eq!(drive.voltage(), 9.6);
    }

    #[test]
    fn configure_validates_parameters() {
        let (mut drive, _) = drive();
        let mut params = HashMap::new();
        params.insert("max_turn_ratio".to_string(), 2.0);
        drive.configure(&params).unwrap();
        drive.steer(100.0);
        assert_eq!(drive.wheel_speeds(), (60, 120));

        params.insert("degrees_per_tick".to_string(), 0.0);
        assert!(drive.configure(&params).is_err());
    }
}
