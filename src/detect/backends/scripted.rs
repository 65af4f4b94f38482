//! Replays recorded detections, one frame per script entry.
//!
//! Script files are JSON lines: each non-blank line is an array of
//! `[x, y, w, h]` boxes for one frame (`[]` for a frame with no target).
//! Lines starting with `#` are comments. Once the script is exhausted every
//! further frame reports no detections.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;

use crate::detect::backend::{DetectionParams, DetectorBackend};
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

pub struct ScriptedBackend {
    script: VecDeque<Vec<BoundingBox>>,
    replayed: u64,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<BoundingBox>>) -> Self {
        Self {
            script: script.into(),
            replayed: 0,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open detection script {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file), &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut script = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read {}", source))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let boxes: Vec<[i32; 4]> = serde_json::from_str(trimmed)
                .map_err(|e| anyhow!("{}:{}: invalid detection line: {}", source, idx + 1, e))?;
            let boxes: Vec<BoundingBox> = boxes.into_iter().map(BoundingBox::from).collect();
            if let Some(bad) = boxes.iter().find(|b| !b.has_extent()) {
                return Err(anyhow!(
                    "{}:{}: box {:?} must have positive width and height",
                    source,
                    idx + 1,
                    bad
                ));
            }
            script.push(boxes);
        }
        log::info!("loaded {} scripted frames from {}", script.len(), source);
        Ok(Self::new(script))
    }

    /// Frames still queued in the script.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn replayed(&self) -> u64 {
        self.replayed
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectionParams) -> Result<Vec<BoundingBox>> {
        match self.script.pop_front() {
            Some(boxes) => {
                self.replayed += 1;
                Ok(boxes)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    fn blank_frame() -> Frame {
        Frame::new(vec![0; 4], 2, 2, PixelFormat::Gray8, 1).unwrap()
    }

    #[test]
    fn replays_lines_in_order_then_goes_quiet() -> Result<()> {
        let script = "# recorded session\n[[100,100,50,50]]\n\n[]\n[[0,0,4,4],[10,10,8,8]]\n";
        let mut backend = ScriptedBackend::from_reader(script.as_bytes(), "inline")?;
        assert_eq!(backend.remaining(), 3);

        let params = DetectionParams::default();
        let frame = blank_frame();
        assert_eq!(
            backend.detect(&frame, &params)?,
            vec![BoundingBox::new(100, 100, 50, 50)]
        );
        assert!(backend.detect(&frame, &params)?.is_empty());
        assert_eq!(backend.detect(&frame, &params)?.len(), 2);
        assert!(backend.detect(&frame, &params)?.is_empty());
        assert_eq!(backend.replayed(), 3);
        Ok(())
    }

    #[test]
    fn malformed_line_reports_position() {
        let err = ScriptedBackend::from_reader("[[1,2,3]]\n".as_bytes(), "inline")
            .err()
            .expect("short box must be rejected");
        assert!(err.to_string().contains("inline:1"));
    }

    #[test]
    fn non_positive_sizes_are_rejected_with_position() {
        let script = "[[0,0,4,4]]\n[[5,5,-3,8]]\n";
        let err = ScriptedBackend::from_reader(script.as_bytes(), "inline")
            .err()
            .expect("negative width must be rejected");
        assert!(err.to_string().contains("inline:2"));
    }
}
