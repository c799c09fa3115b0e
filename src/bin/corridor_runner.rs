use anyhow::{Context, Result};
use corridor_core::common::angles::to_signed;
use corridor_core::hardware::recording::RecordingDriver;
use corridor_core::hardware::{self, SeededRandom, SystemClock};
use corridor_core::perception::MountConfig;
use corridor_core::{CorridorRobot, RobotConfig};
use env_logger::Env;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Servo angle for the sensor centerline on this chassis
const SERVO_CENTER: f64 = 93.0;

/// Range reported past the end of the corridor
const OPEN_RANGE: f64 = 400.0;

/// Raw readings for a straight corridor with walls 40 cm to the left and
/// 60 cm to the right, which opens up after `length` readings.
fn simulated_corridor(length: usize) -> impl FnMut(u16) -> u32 + Send {
    let mut readings = 0;
    move |servo| {
        readings += 1;
        let direction = to_signed(SERVO_CENTER - servo as f64).to_radians();
        let true_range = if readings > length || direction == 0.0 {
            OPEN_RANGE
        } else if direction > 0.0 {
            (60.0 / direction.sin().abs()).min(OPEN_RANGE)
        } else {
            (40.0 / direction.sin().abs()).min(OPEN_RANGE)
        };
        // inverse of the field error correction applied by the sensor
        (true_range * 1.32 - 2.5).max(0.0) as u32
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = RobotConfig {
        mount: MountConfig {
            servo_center: SERVO_CENTER,
            ..MountConfig::default()
        },
        correct_ranges: true,
        ..RobotConfig::default()
    };

    let mut params = HashMap::new();
    params.insert("kp".to_string(), 0.2);
    params.insert("kd".to_string(), 1.0);
    params.insert("control_period".to_string(), 1.0);
    config.configure(&params).context("invalid robot parameters")?;

    let driver = hardware::share(RecordingDriver::new().with_range_model(simulated_corridor(150)));
    let mut robot = CorridorRobot::new(
        driver,
        Arc::new(SystemClock),
        Box::new(SeededRandom::from_entropy()),
        config,
    )
    .context("failed to initialize robot")?;

    info!("Voltage: {:.2}", robot.voltage());
    info!("Starting in 3 seconds...");
    tokio::time::sleep(Duration::from_secs(3)).await;

    let stop = robot.stop_handle();
    let run = tokio::task::spawn_blocking(move || robot.run());

    tokio::select! {
        result = run => match result {
            Ok(Ok(())) => info!("corridor finished, robot stopped"),
            Ok(Err(e)) => {
                stop.stop();
                error!("corridor run failed: {}", e);
                return Err(e).context("corridor run failed");
            }
            Err(e) => {
                stop.stop();
                return Err(e).context("navigation task panicked");
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping robot");
            // latches the halt flag; the navigator thread can no longer move the motors
            stop.stop();
            std::process::exit(0);
        }
    }

    Ok(())
}
