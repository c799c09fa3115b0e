//! Hardware seams: the motor/servo/encoder bus, real-time waits and randomness
pub mod recording;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Wheel motor index on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motor {
    Left = 0,
    Right = 1,
}

/// Command set of the low-level motor/servo/encoder bus.
///
/// Calls are synchronous and never time out; an implementation that does
/// not answer blocks the control loop.
pub trait Driver: Send {
    /// Halt both motors
    fn stop(&mut self);

    /// Set the speed of both motors
    fn set_speed(&mut self, speed: u16);

    /// Set the speed of the left motor
    fn set_left_speed(&mut self, speed: u16);

    /// Set the speed of the right motor
    fn set_right_speed(&mut self, speed: u16);

    /// Drive forward at the configured speeds
    fn fwd(&mut self);

    /// Point the servo at an absolute servo angle
    fn servo(&mut self, angle: u16);

    /// Arm encoder targeting: motors flagged true stop after `ticks` ticks
    fn enc_tgt(&mut self, left: bool, right: bool, ticks: u32);

    /// Rotate in place counter-clockwise
    fn left_rot(&mut self);

    /// Rotate in place clockwise
    fn right_rot(&mut self);

    /// Read a wheel encoder, in signed ticks
    fn enc_read(&mut self, motor: Motor) -> i64;

    /// Read a raw ultrasonic distance on the given pin, in centimetres
    fn us_dist(&mut self, pin: u8) -> u32;

    /// Write the straight-line trim setting
    fn trim_write(&mut self, trim: i16);

    /// Read the battery voltage
    fn volt(&mut self) -> f64;
}

/// Bus handle shared by the mount, the sensor and the drive train
pub type SharedDriver = Arc<Mutex<dyn Driver>>;

/// Wrap a driver for sharing between components
pub fn share<D: Driver + 'static>(driver: D) -> SharedDriver {
    Arc::new(Mutex::new(driver))
}

/// Lock the bus. A panic on another holder leaves the bus usable.
pub fn lock(driver: &SharedDriver) -> MutexGuard<'_, dyn Driver + 'static> {
    driver.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Real-time wait capability
pub trait Clock: Send + Sync {
    /// Block for the given duration
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of uniform samples in [0, 1) for weighted draws
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;
}

/// Pseudo-random source backed by `StdRng`
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Deterministic source for a given seed
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from the operating system
    pub fn from_entropy() -> Self {
        SeededRandom {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
