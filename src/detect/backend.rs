use anyhow::{anyhow, Result};

use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Tuning passed through to the detector unchanged from configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Image shrink factor between scale steps. Must be > 1.0.
    pub scale_factor: f64,
    /// Overlap count a candidate needs to be accepted. Must be >= 1.
    pub min_neighbors: u32,
}

impl DetectionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale_factor > 1.0) {
            return Err(anyhow!(
                "scale_factor must be greater than 1.0 (got {})",
                self.scale_factor
            ));
        }
        if self.min_neighbors < 1 {
            return Err(anyhow!("min_neighbors must be at least 1"));
        }
        Ok(())
    }
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.08,
            min_neighbors: 10,
        }
    }
}

/// Detector backend trait.
///
/// Backends return boxes in any order; ranking happens in `DetectionSet`.
/// A frame with nothing in it is `Ok(vec![])`, not an error.
pub trait DetectorBackend: Send {
    /// Backend identifier, used for registry lookup.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame, params: &DetectionParams) -> Result<Vec<BoundingBox>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
