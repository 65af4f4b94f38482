use super::Mode;

/// Servo travel accepted in absolute-angle mode, degrees.
pub const ANGLE_MIN: i32 = 20;
pub const ANGLE_MAX: i32 = 160;
pub const ANGLE_NEUTRAL: i32 = 90;

/// Rate saturation in rate-command mode.
pub const RATE_LIMIT: i32 = 100;
pub const RATE_NEUTRAL: i32 = 0;

/// Maps raw PD output for one axis into an actuator command.
#[derive(Clone, Copy, Debug)]
pub struct CommandMapper {
    mode: Mode,
}

impl CommandMapper {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Command for controller output `u` on an axis spanning `frame_dim` pixels.
    ///
    /// Angle mode interpolates `[floor(-dim/2), floor(dim/2)]` onto
    /// `[ANGLE_MIN, ANGLE_MAX]`, clamping outside the domain. For odd `dim` the
    /// lower bound reaches one pixel further than the upper one. Rate mode
    /// saturates at `±RATE_LIMIT`. Both truncate toward zero.
    pub fn map(&self, u: f64, frame_dim: u32) -> i32 {
        match self.mode {
            Mode::AbsoluteAngle => {
                let low = -(frame_dim as f64 / 2.0).ceil();
                let high = (frame_dim / 2) as f64;
                interp_clamped(u, (low, high), (ANGLE_MIN as f64, ANGLE_MAX as f64)) as i32
            }
            Mode::RateCommand => u.clamp(-(RATE_LIMIT as f64), RATE_LIMIT as f64) as i32,
        }
    }
}

/// Linear interpolation that pins inputs outside `domain` to the range ends.
fn interp_clamped(x: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let (x0, x1) = domain;
    let (y0, y1) = range;
    if x <= x0 {
        if x1 <= x0 && x >= x1 {
            return (y0 + y1) / 2.0;
        }
        return y0;
    }
    if x >= x1 {
        return y1;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}
