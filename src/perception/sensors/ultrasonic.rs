//! Median-filtered ultrasonic rangefinder, optionally on a swivel mount

use super::{swath_angles, RangeSensor};
use crate::common::angles::is_valid_angle;
use crate::common::error::{Result, RobotError};
use crate::common::types::{Centimeters, Degrees, DistanceScan};
use crate::hardware::{self, SharedDriver};
use crate::perception::filters::{Filter, MedianFilter};
use crate::perception::mount::SwivelMount;
use log::{trace, warn};
use std::collections::HashMap;

/// Raw readings taken per direction
const READINGS_PER_SAMPLE: usize = 3;

/// Correction applied to the filtered raw reading
pub type ErrorCorrection = Box<dyn Fn(f64) -> f64 + Send>;

/// Ultrasonic sensor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    /// Bus pin the sensor is wired to
    pub pin: u8,
    /// Default swath width for `sense`
    pub swath_width: Degrees,
    /// Default sample count for `sense`
    pub swath_samples: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            pin: 15,
            swath_width: 30.0,
            swath_samples: 3,
        }
    }
}

impl SensorConfig {
    /// Apply named parameters, rejecting invalid values
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&pin) = params.get("pin") {
            if !(0.0..=255.0).contains(&pin) || pin.fract() != 0.0 {
                return Err(RobotError::invalid_parameter("pin", "must be an integer in 0-255"));
            }
            self.pin = pin as u8;
        }

        if let Some(&width) = params.get("swath_width") {
            if !(0.0..360.0).contains(&width) {
                return Err(RobotError::invalid_parameter("swath_width", "must be in range 0-359"));
            }
            self.swath_width = width;
        }

        if let Some(&samples) = params.get("swath_samples") {
            if samples < 1.0 || samples.fract() != 0.0 {
                return Err(RobotError::invalid_parameter(
                    "swath_samples",
                    "must be a positive integer",
                ));
            }
            self.swath_samples = samples as usize;
        }

        Ok(())
    }
}

/// Ultrasonic rangefinder
pub struct UltrasonicSensor {
    driver: SharedDriver,
    mount: Option<SwivelMount>,
    config: SensorConfig,
    filter: MedianFilter,
    error_correction: Option<ErrorCorrection>,
}

impl UltrasonicSensor {
    /// Create a sensor; without a mount it can only look straight ahead
    pub fn new(driver: SharedDriver, mount: Option<SwivelMount>) -> Self {
        UltrasonicSensor {
            driver,
            mount,
            config: SensorConfig::default(),
            filter: MedianFilter::new(),
            error_correction: None,
        }
    }

    pub fn with_config(mut self, config: SensorConfig) -> Self {
        self.config = config;
        self
    }

    /// Pass every filtered reading through `correction`
    pub fn with_error_correction<F>(mut self, correction: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + 'static,
    {
        self.error_correction = Some(Box::new(correction));
        self
    }

    /// Configure the sensor with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        self.config.configure(params)
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn mount(&self) -> Option<&SwivelMount> {
        self.mount.as_ref()
    }

    fn point_at(&mut self, angle: Degrees) -> Result<()> {
        match self.mount.as_mut() {
            None if angle != 0.0 => Err(RobotError::UnsupportedOperation(format!(
                "fixed sensor cannot look toward {angle}"
            ))),
            None => Ok(()),
            Some(mount) if !mount.can_reach(angle) => Err(RobotError::UnsupportedOperation(
                format!("angle {angle} is outside the mount arc"),
            )),
            Some(mount) => mount.swivel(angle),
        }
    }
}

impl RangeSensor for UltrasonicSensor {
    fn name(&self) -> &str {
        "UltrasonicSensor"
    }

    fn sense(&mut self, angle: Degrees) -> Result<Centimeters> {
        let (width, samples) = (self.config.swath_width, self.config.swath_samples);
        self.sense_swath(angle, width, samples)
    }

    fn sense_distance(&mut self, angle: Degrees) -> Result<Centimeters> {
        if !is_valid_angle(angle) {
            return Err(RobotError::invalid_angle(angle, "must be in range 0-359"));
        }
        self.point_at(angle)?;

        let readings: Vec<u32> = {
            let mut bus = hardware::lock(&self.driver);
            (0..READINGS_PER_SAMPLE).map(|_| bus.us_dist(self.config.pin)).collect()
        };
        let median = self
            .filter
            .filter(&readings[..])
            .ok_or(RobotError::NoMeasurement { angle })?;
        let corrected = match &self.error_correction {
            Some(correct) => correct(median),
            None => median,
        };

        trace!("range at {}: raw {:?} -> {}", angle, readings, corrected);
        Ok(corrected.trunc().max(0.0) as Centimeters)
    }

    fn sense_swath(&mut self, center: Degrees, width: Degrees, samples: usize) -> Result<Centimeters> {
        self.scan(center, width, samples)?
            .into_iter()
            .map(|(_, distance)| distance)
            .min()
            .ok_or(RobotError::NoMeasurement { angle: center })
    }

    fn scan(&mut self, center: Degrees, width: Degrees, samples: usize) -> Result<DistanceScan> {
        let mut scan = DistanceScan::with_capacity(samples);
        for angle in swath_angles(center, width, samples) {
            match self.sense_distance(angle) {
                Ok(distance) => scan.push((angle, distance)),
                Err(RobotError::UnsupportedOperation(reason)) => {
                    warn!("skipping swath sample: {}", reason);
                }
                Err(e) => return Err(e),
            }
        }

        if scan.is_empty() {
            return Err(RobotError::NoMeasurement { angle: center });
        }
        Ok(scan)
    }

    fn center(&mut self) -> Result<()> {
        match self.mount.as_mut() {
            Some(mount) => mount.center(),
            None => Ok(()),
        }
    }

    fn has_mount(&self) -> bool {
        self.mount.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::recording::{DriverCall, RecordingDriver, SimulatedClock};
    use crate::perception::filters::field_error_correction;
    use crate::perception::mount::MountConfig;
    use std::sync::{Arc, Mutex};

    fn mounted(driver: RecordingDriver) -> (UltrasonicSensor, Arc<Mutex<RecordingDriver>>) {
        let driver = Arc::new(Mutex::new(driver));
        let mount = SwivelMount::new(
            driver.clone(),
            Arc::new(SimulatedClock::new()),
            MountConfig::default(),
        )
        .unwrap();
        driver.lock().unwrap().clear_calls();
        (UltrasonicSensor::new(driver.clone(), Some(mount)), driver)
    }

    #[test]
    fn sense_distance_takes_median_of_three() {
        let (mut sensor, driver) = mounted(RecordingDriver::new().with_ranges(vec![29, 29, 28]));
        assert_eq!(sensor.sense_distance(60.0).unwrap(), 29);

        let driver = driver.lock().unwrap();
        assert_eq!(driver.servo_angles(), vec![30]);
        assert_eq!(driver.count(&DriverCall::UsDist(15)), 3);
    }

    #[test]
    fn sense_distance_applies_error_correction() {
        let (sensor, _) = mounted(RecordingDriver::new().with_ranges(vec![130, 130, 130]));
        let mut sensor = sensor.with_error_correction(field_error_correction);
        assert_eq!(sensor.sense_distance(0.0).unwrap(), 100);
    }

    #[test]
    fn fixed_sensor_only_looks_ahead() {
        let driver = Arc::new(Mutex::new(RecordingDriver::new().with_ranges(vec![50, 50, 50])));
        let mut sensor = UltrasonicSensor::new(driver.clone(), None);
        assert!(matches!(
            sensor.sense_distance(45.0),
            Err(RobotError::UnsupportedOperation(_))
        ));
        assert_eq!(sensor.sense_distance(0.0).unwrap(), 50);
        assert!(driver.lock().unwrap().servo_angles().is_empty());
    }

    #[test]
    fn sense_distance_rejects_invalid_angle() {
        let (mut sensor, _) = mounted(RecordingDriver::new());
        assert!(matches!(
            sensor.sense_distance(360.0),
            Err(RobotError::InvalidAngle { .. })
        ));
    }

    #[test]
    fn swath_probes_in_order_and_returns_minimum() {
        let model = |servo: u16| match servo {
            120 => 102,
            100 => 100,
            _ => 101,
        };
        let (mut sensor, driver) = mounted(RecordingDriver::new().with_range_model(model));
        assert_eq!(sensor.sense_swath(350.0, 40.0, 3).unwrap(), 100);
        assert_eq!(driver.lock().unwrap().servo_angles(), vec![120, 100, 80]);
    }

    #[test]
    fn swath_drops_out_of_arc_samples() {
        let (mut sensor, _) = mounted(RecordingDriver::new().with_range_model(|_| 64));
        let scan = sensor.scan(90.0, 30.0, 3).unwrap();
        assert_eq!(scan, vec![(75.0, 64), (90.0, 64)]);
    }

    #[test]
    fn swath_with_nothing_reachable_fails() {
        let (mut sensor, _) = mounted(RecordingDriver::new());
        assert!(matches!(
            sensor.sense_swath(180.0, 30.0, 3),
            Err(RobotError::NoMeasurement { .. })
        ));
    }

    #[test]
    fn sense_uses_default_swath() {
        let (mut sensor, driver) = mounted(RecordingDriver::new().with_range_model(|_| 40));
        assert_eq!(sensor.sense(0.0).unwrap(), 40);
        assert_eq!(driver.lock().unwrap().servo_angles(), vec![105, 90, 75]);
    }

    #[test]
    fn configure_rejects_bad_values() {
        let mut config = SensorConfig::default();
        let mut params = HashMap::new();
        params.insert("swath_samples".to_string(), 0.0);
        assert!(config.configure(&params).is_err());

        params.insert("swath_samples".to_string(), 5.0);
        params.insert("swath_width".to_string(), 60.0);
        config.configure(&params).unwrap();
        assert_eq!(config.swath_samples, 5);
        assert_eq!(config.swath_width, 60.0);
    }
}
