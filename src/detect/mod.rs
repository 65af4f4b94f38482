mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectionParams, DetectorBackend};
pub use backends::{bright_spot, BrightSpotBackend, ScriptedBackend, StubBackend};
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection, DetectionSet};
