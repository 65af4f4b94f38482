//! Control law and output mapping.
//!
//! - `pd`: per-axis proportional-derivative controller
//! - `mapper`: turns raw controller output into actuator commands

pub mod mapper;
pub mod pd;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

pub use mapper::{CommandMapper, ANGLE_MAX, ANGLE_MIN, ANGLE_NEUTRAL, RATE_LIMIT, RATE_NEUTRAL};
pub use pd::{AxisController, AxisControllerState, PdGains};

/// What the two command values mean to the actuator. Fixed for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Servo positions in degrees.
    AbsoluteAngle,
    /// Signed yaw/pitch rates, percent of full speed.
    RateCommand,
}

impl Mode {
    /// Gains used when the configuration does not name any.
    pub fn default_gains(self) -> PdGains {
        match self {
            Mode::AbsoluteAngle => PdGains::new(0.6, 0.1),
            Mode::RateCommand => PdGains::new(0.4, 0.4),
        }
    }

    /// Command sent on shutdown to park the actuator.
    pub fn neutral_command(self) -> [i32; 2] {
        match self {
            Mode::AbsoluteAngle => [ANGLE_NEUTRAL, ANGLE_NEUTRAL],
            Mode::RateCommand => [RATE_NEUTRAL, RATE_NEUTRAL],
        }
    }

    /// Smallest digit width that holds every value the mapper can emit.
    pub fn min_digits(self) -> usize {
        match self {
            Mode::AbsoluteAngle => ANGLE_MAX.to_string().len(),
            Mode::RateCommand => (-RATE_LIMIT).to_string().len(),
        }
    }

    /// Positional error for one axis. Angle mode steers the servo toward the
    /// target; rate mode reports how far the target sits from center.
    pub fn axis_error(self, coordinate: i32, center: i32) -> i32 {
        match self {
            Mode::AbsoluteAngle => center.saturating_sub(coordinate),
            Mode::RateCommand => coordinate.saturating_sub(center),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::AbsoluteAngle => write!(f, "absolute_angle"),
            Mode::RateCommand => write!(f, "rate_command"),
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "absolute_angle" | "angle" => Ok(Mode::AbsoluteAngle),
            "rate_command" | "rate" => Ok(Mode::RateCommand),
            other => Err(anyhow!(
                "unknown mode '{}' (expected absolute_angle or rate_command)",
                other
            )),
        }
    }
}
