//! Proportional-derivative control, one instance per axis.
//!
//! `u = kp * e + kd * (e - e_prev)`. No integral term and no windup guard;
//! the output is dimensionless and bounded later by the mapper.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PdGains {
    pub kp: f64,
    pub kd: f64,
}

impl PdGains {
    pub fn new(kp: f64, kd: f64) -> Self {
        Self { kp, kd }
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.kd.is_finite()
    }
}

/// Error history carried between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisControllerState {
    pub previous_error: f64,
}

#[derive(Clone, Debug)]
pub struct AxisController {
    gains: PdGains,
    state: AxisControllerState,
}

impl AxisController {
    pub fn new(gains: PdGains) -> Self {
        Self {
            gains,
            state: AxisControllerState::default(),
        }
    }

    pub fn gains(&self) -> PdGains {
        self.gains
    }

    pub fn state(&self) -> AxisControllerState {
        self.state
    }

    /// Control output for `error`. Always records `error` as the new
    /// previous error, so call only on frames that have a target.
    pub fn update(&mut self, error: f64) -> f64 {
        let derivative = error - self.state.previous_error;
        let output = self.gains.kp * error + self.gains.kd * derivative;
        self.state.previous_error = error;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_uses_zero_history() {
        let mut axis = AxisController::new(PdGains::new(0.6, 0.1));
        let u = axis.update(195.0);
        assert!((u - 136.5).abs() < 1e-9);
        assert_eq!(axis.state().previous_error, 195.0);
    }

    #[test]
    fn derivative_uses_difference_of_consecutive_errors() {
        let mut axis = AxisController::new(PdGains::new(0.0, 1.0));
        axis.update(10.0);
        let u = axis.update(4.0);
        assert!((u - (4.0 - 10.0)).abs() < 1e-9);
        assert_eq!(axis.state().previous_error, 4.0);
    }

    #[test]
    fn proportional_only_ignores_history() {
        let mut axis = AxisController::new(PdGains::new(0.5, 0.0));
        axis.update(-40.0);
        assert!((axis.update(20.0) - 10.0).abs() < 1e-9);
    }
}
