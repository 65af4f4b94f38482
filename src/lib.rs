//! Gimbal Tracker
//!
//! Closed-loop face tracking for a two-axis gimbal. Each camera frame goes
//! through a fixed pipeline:
//!
//! 1. **Detect**: a detector backend returns face bounding boxes.
//! 2. **Select**: the largest box is the target; its floor centroid is the
//!    track point.
//! 3. **Control**: one PD controller per axis turns the pixel error into a
//!    control effort.
//! 4. **Map**: the effort becomes a servo angle (20..=160) or a signed rate
//!    (-100..=100), depending on the mode.
//! 5. **Dispatch**: the pair is framed as `$` + zero-padded values and
//!    written to the actuator.
//!
//! Frames without a face send nothing. Shutdown always parks the actuator
//! with one neutral command before the port closes.
//!
//! # Module Structure
//!
//! - `frame`: frame buffers and geometry
//! - `ingest`: frame sources (`stub://` synthetic scenes)
//! - `detect`: detector backends and the backend registry
//! - `target`: target selection and centroid extraction
//! - `control`: control modes, PD controllers and the command mapper
//! - `transport`: command framing, actuator transports and the dispatcher
//! - `tracker`: per-frame controller combining the above
//! - `runtime`: the tracking loop state machine
//! - `config`: file + environment configuration

pub mod config;
pub mod control;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod runtime;
pub mod target;
pub mod tracker;
pub mod transport;

pub use config::{TrackerConfig, TransportKind};
pub use control::{Mode, PdGains};
pub use detect::{BoundingBox, DetectionParams, DetectionSet, DetectorBackend};
pub use error::{ConnectionError, MalformedValue, TransmissionError};
pub use frame::{Frame, FrameGeometry, PixelFormat};
pub use ingest::{open_source, FrameSource, SourceStats};
pub use runtime::{FrameOutcome, LoopState, LoopStats, ReconnectPolicy, StopSignal, TrackingLoop};
pub use target::{select_target, track_point, TrackPoint};
pub use tracker::{ControlOutput, Tracker, TrackerSettings};
pub use transport::{build_transport, CommandFrame, Dispatcher, Transport};
