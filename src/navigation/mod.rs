//! Navigation module: orient into a corridor, then track its centerline
pub mod perpendicular;

use self::perpendicular::find_perpendicular;
use crate::common::angles::{normalize, to_signed};
use crate::common::error::{Result, RobotError};
use crate::common::types::{Centimeters, Degrees};
use crate::control::controllers::CrossTrackController;
use crate::control::DriveController;
use crate::hardware::{Clock, RandomSource};
use crate::perception::HeadingDistribution;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Direction of the right-hand wall probe
pub const RIGHT: Degrees = 90.0;

/// Direction of the left-hand wall probe
pub const LEFT: Degrees = 270.0;

/// State of the corridor state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Unoriented,
    Tracking,
    Terminated,
}

/// Wall the robot started out closer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensingSide {
    Left,
    Right,
}

/// Per-run corridor tracking state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorridorTrack {
    /// Wall-to-wall width measured at tracking start
    pub width: f64,
    /// Cross-track error of the previous control period
    pub last_cte: f64,
    pub side: SensingSide,
}

impl CorridorTrack {
    /// Start tracking from the distances to the left and right walls
    pub fn begin(left: Centimeters, right: Centimeters) -> Self {
        let width = left as f64 + right as f64;
        let cte = width / 2.0 - left as f64;
        CorridorTrack {
            width,
            last_cte: cte,
            side: if cte > 0.0 {
                SensingSide::Left
            } else {
                SensingSide::Right
            },
        }
    }

    /// Cross-track error from a wall reading; positive is left of center
    pub fn cross_track_error(&self, direction: Degrees, distance: Centimeters) -> f64 {
        if direction <= RIGHT {
            distance as f64 - self.width / 2.0
        } else {
            self.width / 2.0 - distance as f64
        }
    }

    /// A reading longer than the corridor is wide means the walls have ended
    pub fn is_corridor_end(&self, distance: Centimeters) -> bool {
        distance as f64 > self.width
    }
}

/// Sensing direction for a wall-normal estimate.
///
/// The rangefinder only covers the forward half circle: directions in it are
/// used as they are, rear directions fall back to the nearer side beam and
/// straight back falls back to the sensing side.
pub fn wall_direction(estimate: Degrees, side: SensingSide) -> Degrees {
    let angle = normalize(estimate);
    if angle <= RIGHT || angle >= LEFT {
        angle
    } else if angle < 180.0 {
        RIGHT
    } else if angle > 180.0 {
        LEFT
    } else {
        match side {
            SensingSide::Left => LEFT,
            SensingSide::Right => RIGHT,
        }
    }
}

/// Turn that brings a wall normal onto the nearer side beam
pub fn turn_toward_side(wall_normal: Degrees) -> Degrees {
    let signed = to_signed(wall_normal);
    if signed >= 0.0 {
        signed - RIGHT
    } else {
        signed + RIGHT
    }
}

/// Navigator settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorConfig {
    /// Pace of the tracking loop
    pub control_period: Duration,
    /// Arc of the orientation scan, centered straight ahead
    pub scan_width: Degrees,
    /// Samples in the orientation scan
    pub scan_samples: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        NavigatorConfig {
            control_period: Duration::from_secs(1),
            scan_width: 180.0,
            scan_samples: 19,
        }
    }
}

impl NavigatorConfig {
    /// Apply named parameters, rejecting invalid values
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&period) = params.get("control_period") {
            if !(period > 0.0 && period.is_finite()) {
                return Err(RobotError::invalid_parameter("control_period", "must be positive"));
            }
            self.control_period = Duration::from_secs_f64(period);
        }

        if let Some(&width) = params.get("scan_width") {
            if !(width > 0.0 && width < 360.0) {
                return Err(RobotError::invalid_parameter("scan_width", "must be in range 1-359"));
            }
            self.scan_width = width;
        }

        if let Some(&samples) = params.get("scan_samples") {
            if samples < 2.0 || samples.fract() != 0.0 {
                return Err(RobotError::invalid_parameter(
                    "scan_samples",
                    "must be an integer of at least 2",
                ));
            }
            self.scan_samples = samples as usize;
        }

        Ok(())
    }
}

/// Corridor state machine: orient once, then track until the corridor ends
pub struct CorridorNavigator {
    drive: DriveController,
    heading: HeadingDistribution,
    /// Turn not yet applied to `heading` because it is smaller than a bin
    heading_residual: Degrees,
    controller: CrossTrackController,
    config: NavigatorConfig,
    state: NavigationState,
    track: Option<CorridorTrack>,
    rng: Box<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl CorridorNavigator {
    /// Create a navigator around a drive train with an attached range sensor
    pub fn new(drive: DriveController, rng: Box<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        CorridorNavigator {
            drive,
            heading: HeadingDistribution::full_circle(),
            heading_residual: 0.0,
            controller: CrossTrackController::new(),
            config: NavigatorConfig::default(),
            state: NavigationState::Unoriented,
            track: None,
            rng,
            clock,
        }
    }

    pub fn with_config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_controller(mut self, controller: CrossTrackController) -> Self {
        self.controller = controller;
        self
    }

    /// Configure the navigator and its steering gains with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        self.config.configure(params)?;
        self.controller.configure(params)
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn heading(&self) -> &HeadingDistribution {
        &self.heading
    }

    pub fn track(&self) -> Option<&CorridorTrack> {
        self.track.as_ref()
    }

    pub fn drive(&self) -> &DriveController {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut DriveController {
        &mut self.drive
    }

    /// Run the state machine until the corridor ends or a stop handle halts
    /// the drive.
    ///
    /// Any error stops the robot before it is returned.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.halt_if_requested() {
                return Ok(());
            }
            let step = match self.state {
                NavigationState::Unoriented => self.orient(),
                NavigationState::Tracking => self.follow_corridor(),
                NavigationState::Terminated => return Ok(()),
            };

            if let Err(e) = step {
                warn!("navigation aborted in {:?}: {}", self.state, e);
                self.track = None;
                if let Err(stop_err) = self.drive.stop() {
                    warn!("stop after abort failed to re-center sensor: {}", stop_err);
                }
                return Err(e);
            }
        }
    }

    /// Scan ahead, estimate the nearest wall normal and turn parallel to it
    pub fn orient(&mut self) -> Result<()> {
        self.drive.stop()?;

        let scan = self
            .drive
            .scan(0.0, self.config.scan_width, self.config.scan_samples)?;
        let distances: Vec<Centimeters> = scan.iter().map(|&(_, distance)| distance).collect();
        let index = find_perpendicular(&distances).ok_or(RobotError::NoMeasurement { angle: 0.0 })?;
        let (wall_normal, wall_distance) = scan[index];
        self.heading.observe_perpendicular(wall_normal);

        let bin = self.heading.sample(self.rng.as_mut());
        let turn = turn_toward_side(self.heading.angle_of(bin));
        info!(
            "wall normal at {} ({} cm), turning {} degrees",
            wall_normal, wall_distance, turn
        );

        self.drive.rotate(turn)?;
        self.apply_turn(turn);
        self.clock.sleep(self.config.control_period);

        self.state = NavigationState::Tracking;
        Ok(())
    }

    /// Measure the corridor and start driving along it
    pub fn begin_tracking(&mut self) -> Result<CorridorTrack> {
        let right = self.drive.sense(RIGHT)?;
        let left = self.drive.sense(LEFT)?;
        let track = CorridorTrack::begin(left, right);
        info!(
            "corridor width {} cm, cross-track error {:.1}, sensing {:?}",
            track.width, track.last_cte, track.side
        );

        // the orientation turn is already folded into the heading estimate
        self.drive.degrees_turned();
        self.drive.fwd();
        self.state = NavigationState::Tracking;
        self.track = Some(track);
        Ok(track)
    }

    /// One control period of centerline tracking
    pub fn track_step(&mut self) -> Result<NavigationState> {
        let mut track = self
            .track
            .ok_or_else(|| RobotError::Unconfigured("tracking has not started".to_string()))?;

        if self.halt_if_requested() {
            return Ok(self.state);
        }

        let turned = self.drive.degrees_turned();
        self.apply_turn(turned);

        let bin = self.heading.sample(self.rng.as_mut());
        let direction = wall_direction(self.heading.angle_of(bin), track.side);
        let distance = self.drive.sense(direction)?;

        if track.is_corridor_end(distance) {
            info!(
                "reading {} cm at {} exceeds corridor width {}, stopping",
                distance, direction, track.width
            );
            self.drive.stop()?;
            self.track = None;
            self.state = NavigationState::Terminated;
            return Ok(self.state);
        }

        let cte = track.cross_track_error(direction, distance);
        let steering = self.controller.compute_steering(cte, track.last_cte);
        debug!(
            "turned {:.0}, sensed {} cm at {}, cte {:.1}, steering {:.2}",
            turned, distance, direction, cte, steering
        );
        self.drive.steer(steering);

        track.last_cte = cte;
        self.track = Some(track);
        self.clock.sleep(self.config.control_period);
        Ok(self.state)
    }

    /// Keep the heading estimate robot-relative after the robot turned
    /// `turned` degrees clockwise. Whole bins are applied, the rest carried.
    fn apply_turn(&mut self, turned: Degrees) {
        let pending = self.heading_residual - turned;
        self.heading_residual = pending - self.heading.rotate(pending);
    }

    fn halt_if_requested(&mut self) -> bool {
        if !self.drive.is_halted() {
            return false;
        }
        if self.state != NavigationState::Terminated {
            info!("drive halted externally in {:?}, terminating", self.state);
            self.track = None;
            self.state = NavigationState::Terminated;
        }
        true
    }

    fn follow_corridor(&mut self) -> Result<()> {
        self.begin_tracking()?;
        while self.track_step()? != NavigationState::Terminated {}
        Ok(())
    }
}
