//! Tracking loop.
//!
//! Drives the per-frame pipeline and owns the session lifecycle:
//!
//! ```text
//! Idle -> Connecting -> Running -> Draining -> Stopped
//!              \______________________________/
//!                    (connect failed)
//! ```
//!
//! One thread, one frame at a time: frame N's command is written before
//! frame N+1 is fetched. Stopping is cooperative; the stop signal is checked
//! once per iteration. On the way out the loop sends exactly one neutral
//! command so the gimbal parks before the port closes.

use anyhow::{anyhow, Result};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::detect::{DetectionParams, DetectionSet, DetectorBackend};
use crate::error::ConnectionError;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::tracker::Tracker;
use crate::transport::{CommandFrame, Dispatcher};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// How many times to retry a failed connect, and how long to wait between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries after the first failed attempt. 0 gives up immediately.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Cooperative stop flag, shareable with a signal handler.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Connecting,
    Running,
    Draining,
    Stopped,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames_processed: u64,
    pub frames_without_target: u64,
    pub commands_sent: u64,
    pub transmission_failures: u64,
    pub frames_rejected: u64,
    /// Detector boxes dropped for having no extent or leaving the frame.
    pub boxes_discarded: u64,
    pub neutral_sent: bool,
}

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Sent(CommandFrame),
    /// Nothing detected; no command and controller state untouched.
    NoTarget,
    /// Command computed but the write failed. The next frame sends a fresh one.
    TransmissionFailed(CommandFrame),
    /// Frame discarded (wrong geometry or a value too wide for the frame format).
    Rejected,
}

impl FrameOutcome {
    pub fn command(&self) -> Option<&CommandFrame> {
        match self {
            FrameOutcome::Sent(frame) | FrameOutcome::TransmissionFailed(frame) => Some(frame),
            FrameOutcome::NoTarget | FrameOutcome::Rejected => None,
        }
    }
}

pub struct TrackingLoop {
    tracker: Tracker,
    detector: Box<dyn DetectorBackend>,
    params: DetectionParams,
    dispatcher: Dispatcher,
    state: LoopState,
    stats: LoopStats,
}

impl TrackingLoop {
    pub fn new(
        tracker: Tracker,
        detector: Box<dyn DetectorBackend>,
        params: DetectionParams,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            tracker,
            detector,
            params,
            dispatcher,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Open the actuator connection, retrying per `policy`.
    ///
    /// On success the loop is `Running`. When every attempt fails it is
    /// `Stopped` and the last error is returned.
    pub fn connect(&mut self, policy: &ReconnectPolicy) -> Result<(), ConnectionError> {
        match self.state {
            LoopState::Idle => {}
            LoopState::Running => return Ok(()),
            _ => {
                return Err(ConnectionError {
                    address: self.dispatcher.address().to_string(),
                    source: io::Error::new(
                        io::ErrorKind::Other,
                        format!("cannot connect from state {:?}", self.state),
                    ),
                })
            }
        }

        self.state = LoopState::Connecting;
        let mut attempt = 0u32;
        loop {
            match self.dispatcher.connect() {
                Ok(()) => {
                    self.state = LoopState::Running;
                    return Ok(());
                }
                Err(err) if attempt < policy.max_attempts => {
                    attempt += 1;
                    log::warn!(
                        "{} (retry {}/{} in {}ms)",
                        err,
                        attempt,
                        policy.max_attempts,
                        policy.delay.as_millis()
                    );
                    std::thread::sleep(policy.delay);
                }
                Err(err) => {
                    log::error!("{}", err);
                    self.state = LoopState::Stopped;
                    return Err(err);
                }
            }
        }
    }

    /// Run detection, control and dispatch for one frame.
    ///
    /// Transmission failures and rejected frames are counted and reported in
    /// the outcome; only detector failures are returned as errors.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        if self.state != LoopState::Running {
            return Err(anyhow!("tracking loop is {:?}, not running", self.state));
        }
        self.stats.frames_processed += 1;

        if frame.geometry() != self.tracker.geometry() {
            log::warn!(
                "frame {} is {}x{}, expected {}x{}; skipped",
                frame.sequence,
                frame.width,
                frame.height,
                self.tracker.geometry().width,
                self.tracker.geometry().height
            );
            self.stats.frames_rejected += 1;
            return Ok(FrameOutcome::Rejected);
        }

        let boxes = self.detector.detect(frame, &self.params)?;
        let (detections, discarded) =
            DetectionSet::from_boxes_within(boxes, self.tracker.geometry());
        if discarded > 0 {
            log::warn!(
                "frame {}: dropped {} detector box(es) outside the frame",
                frame.sequence,
                discarded
            );
            self.stats.boxes_discarded += discarded as u64;
        }

        let command = match self.tracker.step(&detections) {
            Ok(Some(command)) => command,
            Ok(None) => {
                self.stats.frames_without_target += 1;
                return Ok(FrameOutcome::NoTarget);
            }
            Err(err) => {
                log::error!("frame {} rejected: {}", frame.sequence, err);
                self.stats.frames_rejected += 1;
                return Ok(FrameOutcome::Rejected);
            }
        };

        match self.dispatcher.send(&command) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                Ok(FrameOutcome::Sent(command))
            }
            Err(err) => {
                log::warn!("frame {}: {}", frame.sequence, err);
                self.stats.transmission_failures += 1;
                Ok(FrameOutcome::TransmissionFailed(command))
            }
        }
    }

    /// Command produced for `frame`, if any. `None` covers frames with no
    /// target and rejected frames.
    pub fn step(&mut self, frame: &Frame) -> Result<Option<CommandFrame>> {
        let outcome = self.process_frame(frame)?;
        Ok(outcome.command().cloned())
    }

    /// Process frames until `stop` is raised or `source` runs dry, then drain.
    ///
    /// A source or detector failure also drains before the error is returned.
    pub fn run(&mut self, source: &mut dyn FrameSource, stop: &StopSignal) -> Result<LoopStats> {
        if self.state != LoopState::Running {
            return Err(anyhow!("tracking loop is {:?}, not running", self.state));
        }
        if let Err(err) = self.detector.warm_up() {
            self.shutdown();
            return Err(err.context(format!("detector {} warm-up failed", self.detector.name())));
        }
        log::info!(
            "tracking started: mode={} detector={} actuator={}",
            self.tracker.mode(),
            self.detector.name(),
            self.dispatcher.address()
        );

        let mut last_health_log = Instant::now();
        loop {
            if stop.is_stop_requested() {
                log::info!("stop requested");
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("frame source exhausted");
                    break;
                }
                Err(err) => {
                    self.shutdown();
                    return Err(err.context("frame source failed"));
                }
            };

            if let Err(err) = self.process_frame(&frame) {
                self.shutdown();
                return Err(err.context(format!("detection failed on frame {}", frame.sequence)));
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let source_stats = source.stats();
                log::info!(
                    "source healthy={} captured={} url={} | processed={} sent={} no_target={} tx_failures={} rejected={} boxes_dropped={}",
                    source.is_healthy(),
                    source_stats.frames_captured,
                    source_stats.url,
                    self.stats.frames_processed,
                    self.stats.commands_sent,
                    self.stats.frames_without_target,
                    self.stats.transmission_failures,
                    self.stats.frames_rejected,
                    self.stats.boxes_discarded
                );
                last_health_log = Instant::now();
            }
        }

        self.shutdown();
        Ok(self.stats.clone())
    }

    /// Park the actuator and release the connection.
    ///
    /// From `Running` this sends the neutral command once, then disconnects.
    /// Calling it again, or from any other state, only makes sure the loop
    /// ends up `Stopped`.
    pub fn shutdown(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Draining;
            let neutral = self.tracker.shutdown_command();
            match self.dispatcher.send(&neutral) {
                Ok(()) => {
                    self.stats.neutral_sent = true;
                    log::info!("neutral command {} sent", neutral);
                }
                Err(err) => {
                    self.stats.transmission_failures += 1;
                    log::warn!("neutral command not delivered: {}", err);
                }
            }
        }
        self.dispatcher.disconnect();
        self.state = LoopState::Stopped;
    }
}

impl Drop for TrackingLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Mode;
    use crate::detect::{BoundingBox, ScriptedBackend};
    use crate::frame::{FrameGeometry, PixelFormat};
    use crate::tracker::TrackerSettings;
    use crate::transport::{MemoryTransport, TransportEvent};

    fn blank(width: u32, height: u32, sequence: u64) -> Frame {
        Frame::new(
            vec![0; (width * height) as usize],
            width,
            height,
            PixelFormat::Gray8,
            sequence,
        )
        .unwrap()
    }

    fn scripted_loop(script: Vec<Vec<BoundingBox>>) -> (TrackingLoop, MemoryTransport) {
        let tracker = Tracker::new(TrackerSettings::for_mode(
            Mode::AbsoluteAngle,
            FrameGeometry::new(64, 48),
            3,
        ))
        .unwrap();
        let transport = MemoryTransport::new("mem://loop");
        let dispatcher = Dispatcher::new(Box::new(transport.clone()));
        let tracking = TrackingLoop::new(
            tracker,
            Box::new(ScriptedBackend::new(script)),
            DetectionParams::default(),
            dispatcher,
        );
        (tracking, transport)
    }

    #[test]
    fn connect_moves_idle_to_running() {
        let (mut tracking, transport) = scripted_loop(vec![]);
        assert_eq!(tracking.state(), LoopState::Idle);
        tracking.connect(&ReconnectPolicy::no_retry()).unwrap();
        assert_eq!(tracking.state(), LoopState::Running);
        assert!(transport.is_open());
    }

    #[test]
    fn connect_failure_without_retry_stops() {
        let (mut tracking, transport) = scripted_loop(vec![]);
        transport.fail_next_opens(1);
        assert!(tracking.connect(&ReconnectPolicy::no_retry()).is_err());
        assert_eq!(tracking.state(), LoopState::Stopped);
        assert_eq!(transport.open_attempts(), 1);
    }

    #[test]
    fn connect_retries_up_to_policy() {
        let (mut tracking, transport) = scripted_loop(vec![]);
        transport.fail_next_opens(2);
        let policy = ReconnectPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1),
        };
        tracking.connect(&policy).unwrap();
        assert_eq!(transport.open_attempts(), 3);
        assert_eq!(tracking.state(), LoopState::Running);
    }

    #[test]
    fn frames_are_refused_before_connect() {
        let (mut tracking, _transport) = scripted_loop(vec![]);
        assert!(tracking.process_frame(&blank(64, 48, 1)).is_err());
    }

    #[test]
    fn step_returns_the_command_for_a_frame() {
        let (mut tracking, transport) = scripted_loop(vec![
            vec![BoundingBox::new(8, 8, 16, 16)],
            vec![],
        ]);
        tracking.connect(&ReconnectPolicy::no_retry()).unwrap();

        // centroid (16, 16), center (32, 24): e = (16, 8), u = (11.2, 5.6)
        let command = tracking.step(&blank(64, 48, 1)).unwrap().unwrap();
        assert_eq!(command.as_str(), "$114106");
        assert_eq!(tracking.step(&blank(64, 48, 2)).unwrap(), None);
        assert_eq!(transport.frames(), vec!["$114106"]);
    }

    #[test]
    fn wrong_geometry_is_rejected_without_touching_state() {
        let (mut tracking, transport) =
            scripted_loop(vec![vec![BoundingBox::new(0, 0, 8, 8)]]);
        tracking.connect(&ReconnectPolicy::no_retry()).unwrap();

        let outcome = tracking.process_frame(&blank(32, 32, 1)).unwrap();
        assert_eq!(outcome, FrameOutcome::Rejected);
        assert_eq!(tracking.stats().frames_rejected, 1);
        assert_eq!(tracking.tracker().axis_states().0.previous_error, 0.0);
        assert!(transport.frames().is_empty());
    }

    #[test]
    fn out_of_frame_boxes_are_dropped_before_selection() {
        let (mut tracking, transport) = scripted_loop(vec![
            vec![BoundingBox::new(i32::MAX, 0, 10, 10)],
            vec![
                BoundingBox::new(-100, -100, 400, 400),
                BoundingBox::new(8, 8, 16, 16),
            ],
        ]);
        tracking.connect(&ReconnectPolicy::no_retry()).unwrap();

        assert_eq!(
            tracking.process_frame(&blank(64, 48, 1)).unwrap(),
            FrameOutcome::NoTarget
        );
        assert_eq!(tracking.tracker().axis_states().0.previous_error, 0.0);

        let command = tracking.step(&blank(64, 48, 2)).unwrap().unwrap();
        assert_eq!(command.as_str(), "$114106");
        assert_eq!(tracking.stats().boxes_discarded, 2);
        assert_eq!(transport.frames(), vec!["$114106"]);
    }

    #[test]
    fn shutdown_sends_one_neutral_then_closes() {
        let (mut tracking, transport) = scripted_loop(vec![]);
        tracking.connect(&ReconnectPolicy::no_retry()).unwrap();
        tracking.shutdown();
        tracking.shutdown();

        assert_eq!(tracking.state(), LoopState::Stopped);
        assert!(tracking.stats().neutral_sent);
        assert_eq!(
            transport.events(),
            vec![
                TransportEvent::Opened,
                TransportEvent::Frame("$090090".to_string()),
                TransportEvent::Closed,
            ]
        );
    }

    #[test]
    fn dropping_a_running_loop_parks_the_actuator() {
        let (mut tracking, transport) = scripted_loop(vec![]);
        tracking.connect(&ReconnectPolicy::no_retry()).unwrap();
        drop(tracking);
        assert_eq!(transport.frames(), vec!["$090090"]);
        assert!(!transport.is_open());
    }
}
