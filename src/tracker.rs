//! Per-frame tracking controller.
//!
//! `Tracker` turns one frame's detections into at most one command frame. It
//! owns the yaw and pitch controller state; nothing else mutates it.
//!
//! Frames without a target produce no command and leave both axes' error
//! history as it was. After a target-loss gap, the first derivative term is
//! therefore computed against the last error seen before the gap.

use anyhow::{anyhow, Result};

use crate::control::{AxisController, AxisControllerState, CommandMapper, Mode, PdGains};
use crate::detect::DetectionSet;
use crate::error::MalformedValue;
use crate::frame::FrameGeometry;
use crate::target::{track_point, TrackPoint};
use crate::transport::CommandFrame;

/// Mapped command for one frame, before framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlOutput {
    /// Yaw angle or yaw rate.
    pub primary: i32,
    /// Pitch angle or pitch rate.
    pub secondary: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerSettings {
    pub mode: Mode,
    pub geometry: FrameGeometry,
    pub yaw: PdGains,
    pub pitch: PdGains,
    pub digits: usize,
}

impl TrackerSettings {
    /// Settings using the mode's default gains.
    pub fn for_mode(mode: Mode, geometry: FrameGeometry, digits: usize) -> Self {
        Self {
            mode,
            geometry,
            yaw: mode.default_gains(),
            pitch: mode.default_gains(),
            digits,
        }
    }
}

pub struct Tracker {
    mode: Mode,
    geometry: FrameGeometry,
    yaw: AxisController,
    pitch: AxisController,
    mapper: CommandMapper,
    digits: usize,
    neutral: CommandFrame,
}

impl Tracker {
    /// Fails when the digit width cannot carry every value the mode emits.
    pub fn new(settings: TrackerSettings) -> Result<Self> {
        if settings.digits < settings.mode.min_digits() {
            return Err(anyhow!(
                "{} mode needs at least {} digits per value (configured {})",
                settings.mode,
                settings.mode.min_digits(),
                settings.digits
            ));
        }
        if !settings.yaw.is_finite() || !settings.pitch.is_finite() {
            return Err(anyhow!("controller gains must be finite"));
        }
        let neutral = CommandFrame::encode(&settings.mode.neutral_command(), settings.digits)?;
        Ok(Self {
            mode: settings.mode,
            geometry: settings.geometry,
            yaw: AxisController::new(settings.yaw),
            pitch: AxisController::new(settings.pitch),
            mapper: CommandMapper::new(settings.mode),
            digits: settings.digits,
            neutral,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Current (yaw, pitch) controller state.
    pub fn axis_states(&self) -> (AxisControllerState, AxisControllerState) {
        (self.yaw.state(), self.pitch.state())
    }

    /// Run the control law for a target at `point`.
    pub fn control(&mut self, point: TrackPoint) -> ControlOutput {
        let error_x = self.mode.axis_error(point.cx, self.geometry.center_x());
        let error_y = self.mode.axis_error(point.cy, self.geometry.center_y());

        let u_x = self.yaw.update(error_x as f64);
        let u_y = self.pitch.update(error_y as f64);

        ControlOutput {
            primary: self.mapper.map(u_x, self.geometry.width),
            secondary: self.mapper.map(u_y, self.geometry.height),
        }
    }

    /// Command for one frame's detections, or `None` when there is no target.
    pub fn step(
        &mut self,
        detections: &DetectionSet,
    ) -> Result<Option<CommandFrame>, MalformedValue> {
        let Some(point) = track_point(detections) else {
            return Ok(None);
        };
        let output = self.control(point);
        CommandFrame::encode(&[output.primary, output.secondary], self.digits).map(Some)
    }

    /// Neutral command that parks the actuator.
    pub fn shutdown_command(&self) -> CommandFrame {
        self.neutral.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn angle_tracker() -> Tracker {
        Tracker::new(TrackerSettings::for_mode(
            Mode::AbsoluteAngle,
            FrameGeometry::new(640, 480),
            3,
        ))
        .unwrap()
    }

    fn one_box(x: i32, y: i32, w: i32, h: i32) -> DetectionSet {
        DetectionSet::from_boxes([BoundingBox::new(x, y, w, h)])
    }

    #[test]
    fn single_face_produces_interpolated_angles() {
        let mut tracker = angle_tracker();
        let frame = tracker.step(&one_box(100, 100, 50, 50)).unwrap().unwrap();

        // yaw: e = 320 - 125 = 195, u = 0.6*195 + 0.1*195 = 136.5 -> 119
        // pitch: e = 240 - 125 = 115, u = 80.5 -> 20 + 320.5*140/480 = 113
        assert_eq!(frame.values(), &[119, 113]);
        assert_eq!(frame.as_str(), "$119113");

        let (yaw, pitch) = tracker.axis_states();
        assert_eq!(yaw.previous_error, 195.0);
        assert_eq!(pitch.previous_error, 115.0);
    }

    #[test]
    fn no_target_sends_nothing_and_keeps_history() {
        let mut tracker = angle_tracker();
        tracker.step(&one_box(100, 100, 50, 50)).unwrap();
        let before = tracker.axis_states();

        assert_eq!(tracker.step(&DetectionSet::empty()).unwrap(), None);
        assert_eq!(tracker.axis_states(), before);
    }

    #[test]
    fn history_survives_target_loss() {
        let mut tracker = angle_tracker();
        tracker.step(&one_box(100, 100, 50, 50)).unwrap();
        tracker.step(&DetectionSet::empty()).unwrap();
        let frame = tracker.step(&one_box(295, 215, 50, 50)).unwrap().unwrap();

        // centered target, so only the derivative against the pre-gap error acts:
        // yaw u = 0.1 * (0 - 195) = -19.5 -> 85, pitch u = 0.1 * (0 - 115) = -11.5 -> 86
        assert_eq!(frame.values(), &[85, 86]);
        assert_eq!(frame.as_str(), "$085086");

        let (yaw, pitch) = tracker.axis_states();
        assert_eq!(yaw.previous_error, 0.0);
        assert_eq!(pitch.previous_error, 0.0);
    }

    #[test]
    fn largest_face_is_tracked() {
        let mut tracker = angle_tracker();
        let detections = DetectionSet::from_boxes([
            BoundingBox::new(0, 0, 10, 10),
            BoundingBox::new(295, 215, 50, 50),
        ]);
        let frame = tracker.step(&detections).unwrap().unwrap();
        assert_eq!(frame.values(), &[90, 90]);
    }

    #[test]
    fn rate_mode_saturates_and_uses_signed_error() {
        let mut tracker = Tracker::new(TrackerSettings::for_mode(
            Mode::RateCommand,
            FrameGeometry::new(640, 480),
            4,
        ))
        .unwrap();
        // target far left and high: e_x = 5 - 320 = -315, e_y = 5 - 240 = -235
        let frame = tracker.step(&one_box(0, 0, 10, 10)).unwrap().unwrap();
        assert_eq!(frame.values(), &[-100, -100]);
        assert_eq!(frame.as_str(), "$-100-100");

        // slight offset: e_x = 330 - 320 = 10, u = 0.4*10 + 0.4*(10 + 315) = 134
        let frame = tracker.step(&one_box(325, 235, 10, 10)).unwrap().unwrap();
        assert_eq!(frame.values()[0], 100);
    }

    #[test]
    fn shutdown_command_is_the_mode_midpoint() {
        assert_eq!(angle_tracker().shutdown_command().as_str(), "$090090");

        let rate = Tracker::new(TrackerSettings::for_mode(
            Mode::RateCommand,
            FrameGeometry::new(640, 480),
            4,
        ))
        .unwrap();
        assert_eq!(rate.shutdown_command().as_str(), "$00000000");
    }

    #[test]
    fn narrow_digit_width_is_rejected_up_front() {
        let settings =
            TrackerSettings::for_mode(Mode::RateCommand, FrameGeometry::new(640, 480), 3);
        assert!(Tracker::new(settings).is_err());
    }
}
