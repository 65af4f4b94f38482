use anyhow::Result;

use crate::detect::backend::{DetectionParams, DetectorBackend};
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Stub backend for testing. Never finds anything.
pub struct StubBackend {
    frames_seen: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { frames_seen: 0 }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectionParams) -> Result<Vec<BoundingBox>> {
        self.frames_seen += 1;
        Ok(Vec::new())
    }
}
