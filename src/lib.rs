pub mod common;
pub mod control;
pub mod hardware;
pub mod navigation;
pub mod perception;

use crate::common::error::Result;
use crate::control::controllers::CrossTrackController;
use crate::control::{DriveConfig, DriveController, StopHandle};
use crate::hardware::{Clock, RandomSource, SharedDriver};
use crate::navigation::{CorridorNavigator, NavigationState, NavigatorConfig};
use crate::perception::filters::field_error_correction;
use crate::perception::{MountConfig, SensorConfig, SwivelMount, UltrasonicSensor};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

/// Settings for every component of the robot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotConfig {
    pub mount: MountConfig,
    pub sensor: SensorConfig,
    pub drive: DriveConfig,
    pub navigator: NavigatorConfig,
    pub controller: CrossTrackController,
    /// Apply the field-calibrated range correction
    pub correct_ranges: bool,
}

impl RobotConfig {
    /// Apply named parameters to every component that knows them
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        self.sensor.configure(params)?;
        self.drive.configure(params)?;
        self.controller.configure(params)?;
        self.navigator.configure(params)
    }
}

/// Core of the corridor robot: drive train, mounted rangefinder and navigator
pub struct CorridorRobot {
    navigator: CorridorNavigator,
    stop_handle: StopHandle,
}

impl CorridorRobot {
    /// Compose drive → mount → sensor → navigator on a shared bus
    pub fn new(
        driver: SharedDriver,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RandomSource>,
        config: RobotConfig,
    ) -> Result<Self> {
        let mut drive = DriveController::new(driver.clone(), config.drive);
        let mount = SwivelMount::new(driver.clone(), clock.clone(), config.mount)?;
        let mut sensor = UltrasonicSensor::new(driver, Some(mount)).with_config(config.sensor);
        if config.correct_ranges {
            sensor = sensor.with_error_correction(field_error_correction);
        }
        drive.attach_sensor(Box::new(sensor));

        let stop_handle = drive.stop_handle();
        let navigator = CorridorNavigator::new(drive, rng, clock)
            .with_config(config.navigator)
            .with_controller(config.controller);
        Ok(CorridorRobot {
            navigator,
            stop_handle,
        })
    }

    /// Run until the corridor ends; errors leave the robot stopped
    pub fn run(&mut self) -> Result<()> {
        info!("starting corridor run");
        self.navigator.run()?;
        info!("corridor run finished");
        Ok(())
    }

    /// Stop the robot and re-center the sensor
    pub fn shutdown(&mut self) -> Result<()> {
        self.navigator.drive_mut().stop()
    }

    pub fn state(&self) -> NavigationState {
        self.navigator.state()
    }

    pub fn voltage(&self) -> f64 {
        self.navigator.drive().voltage()
    }

    /// Handle that can halt the motors while `run` is blocking
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    pub fn navigator(&self) -> &CorridorNavigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut CorridorNavigator {
        &mut self.navigator
    }
}
