//! Frame sources.
//!
//! Camera capture is an external collaborator: applications that own a
//! camera implement `FrameSource` for it. The crate ships the synthetic
//! `stub://` source used for dry runs and tests.
//!
//! Sources are not restartable. Once `next_frame` returns `Ok(None)` the
//! source is exhausted and the tracking loop drains.

pub mod synthetic;

use anyhow::{bail, Result};

use crate::config::SourceSettings;
use crate::frame::{Frame, FrameGeometry};

pub use synthetic::SyntheticSource;

/// Sequence of frames consumed by the tracking loop.
pub trait FrameSource {
    /// Prepare the source. Called once before the first frame.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Block until the next frame is available. `Ok(None)` ends the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Open the source named by `settings.url`.
pub fn open_source(
    settings: &SourceSettings,
    geometry: FrameGeometry,
) -> Result<Box<dyn FrameSource>> {
    if settings.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(settings.clone(), geometry)?));
    }
    bail!(
        "no built-in frame source for '{}' (only stub:// urls; camera capture is supplied by the embedding application)",
        settings.url
    )
}
