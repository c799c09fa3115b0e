//! Recording bus driver, simulated clock and scripted randomness

use super::{Clock, Driver, Motor, RandomSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Range returned when nothing else has been scripted
pub const DEFAULT_RANGE: u32 = 100;

/// One command received by a [`RecordingDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Stop,
    SetSpeed(u16),
    SetLeftSpeed(u16),
    SetRightSpeed(u16),
    Fwd,
    Servo(u16),
    EncTgt { left: bool, right: bool, ticks: u32 },
    LeftRot,
    RightRot,
    EncRead(Motor),
    UsDist(u8),
    TrimWrite(i16),
    Volt,
}

type RangeModel = Box<dyn FnMut(u16) -> u32 + Send>;

/// Driver that records every command and answers reads from scripted data.
///
/// Range reads are served, in order of preference, from the queued readings
/// (popped from the back), then from the range model (called with the last
/// commanded servo angle), then [`DEFAULT_RANGE`]. It always answers.
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    queued_ranges: Vec<u32>,
    range_model: Option<RangeModel>,
    servo_angle: u16,
    encoders: [i64; 2],
    voltage: f64,
}

impl RecordingDriver {
    pub fn new() -> Self {
        RecordingDriver {
            calls: Vec::new(),
            queued_ranges: Vec::new(),
            range_model: None,
            servo_angle: 90,
            encoders: [0, 0],
            voltage: 12.0,
        }
    }

    /// Queue raw readings; the last element is returned first
    pub fn with_ranges(mut self, readings: Vec<u32>) -> Self {
        self.queued_ranges = readings;
        self
    }

    /// Answer range reads from a function of the servo angle
    pub fn with_range_model<F>(mut self, model: F) -> Self
    where
        F: FnMut(u16) -> u32 + Send + 'static,
    {
        self.range_model = Some(Box::new(model));
        self
    }

    pub fn with_voltage(mut self, voltage: f64) -> Self {
        self.voltage = voltage;
        self
    }

    /// Set absolute encoder counts
    pub fn set_encoders(&mut self, left: i64, right: i64) {
        self.encoders = [left, right];
    }

    /// All commands received so far
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Forget recorded commands
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Servo angles commanded so far, in order
    pub fn servo_angles(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Servo(angle) => Some(*angle),
                _ => None,
            })
            .collect()
    }

    /// Number of times a command was received
    pub fn count(&self, call: &DriverCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for RecordingDriver {
    fn stop(&mut self) {
        self.calls.push(DriverCall::Stop);
    }

    fn set_speed(&mut self, speed: u16) {
        self.calls.push(DriverCall::SetSpeed(speed));
    }

    fn set_left_speed(&mut self, speed: u16) {
        self.calls.push(DriverCall::SetLeftSpeed(speed));
    }

    fn set_right_speed(&mut self, speed: u16) {
        self.calls.push(DriverCall::SetRightSpeed(speed));
    }

    fn fwd(&mut self) {
        self.calls.push(DriverCall::Fwd);
    }

    fn servo(&mut self, angle: u16) {
        self.servo_angle = angle;
        self.calls.push(DriverCall::Servo(angle));
    }

    fn enc_tgt(&mut self, left: bool, right: bool, ticks: u32) {
        self.calls.push(DriverCall::EncTgt { left, right, ticks });
    }

    fn left_rot(&mut self) {
        self.calls.push(DriverCall::LeftRot);
    }

    fn right_rot(&mut self) {
        self.calls.push(DriverCall::RightRot);
    }

    fn enc_read(&mut self, motor: Motor) -> i64 {
        self.calls.push(DriverCall::EncRead(motor));
        self.encoders[motor as usize]
    }

    fn us_dist(&mut self, pin: u8) -> u32 {
        self.calls.push(DriverCall::UsDist(pin));
        if let Some(reading) = self.queued_ranges.pop() {
            return reading;
        }
        let servo_angle = self.servo_angle;
        match self.range_model.as_mut() {
            Some(model) => model(servo_angle),
            None => DEFAULT_RANGE,
        }
    }

    fn trim_write(&mut self, trim: i16) {
        self.calls.push(DriverCall::TrimWrite(trim));
    }

    fn volt(&mut self) -> f64 {
        self.calls.push(DriverCall::Volt);
        self.voltage
    }
}

/// Clock that records requested waits instead of blocking
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total simulated time elapsed
    pub fn elapsed(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for SimulatedClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Random source replaying fixed values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        ScriptedRandom {
            values: values.into(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        match self.values.pop_front() {
            Some(value) => {
                self.values.push_back(value);
                value
            }
            None => 0.0,
        }
    }
}
