//! Synthetic `stub://` frame source.
//!
//! Renders grayscale frames with bright squares ("faces") drifting along
//! Lissajous paths over a dark background. `stub://<name>?faces=N` draws N
//! squares (1..=4), each smaller than the last; `stub://empty` draws none.
//!
//! With `target_fps > 0` the source sleeps so frames leave at that rate.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::config::SourceSettings;
use crate::frame::{Frame, FrameGeometry, PixelFormat};

const BACKGROUND: u8 = 16;
const FOREGROUND: u8 = 230;
const MAX_FACES: usize = 4;

pub struct SyntheticSource {
    settings: SourceSettings,
    geometry: FrameGeometry,
    faces: usize,
    frame_count: u64,
    next_deadline: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings, geometry: FrameGeometry) -> Result<Self> {
        let faces = parse_face_count(&settings.url)?;
        Ok(Self {
            settings,
            geometry,
            faces,
            frame_count: 0,
            next_deadline: None,
        })
    }

    /// Top-left corner and side of each square for frame `t`.
    fn squares(&self, t: u64) -> Vec<(u32, u32, u32)> {
        let (w, h) = (self.geometry.width, self.geometry.height);
        let base_side = (w.min(h) / 8).max(1);
        (0..self.faces)
            .map(|i| {
                let side = (base_side / (i as u32 + 1)).max(1);
                let phase = i as f64 * 1.7;
                let t = t as f64;
                let cx = w as f64 / 2.0 + (w as f64 / 3.0) * (t * 0.05 + phase).sin();
                let cy = h as f64 / 2.0 + (h as f64 / 3.0) * (t * 0.07 + phase).sin();
                let x = (cx - side as f64 / 2.0).clamp(0.0, (w - side) as f64) as u32;
                let y = (cy - side as f64 / 2.0).clamp(0.0, (h - side) as f64) as u32;
                (x, y, side)
            })
            .collect()
    }

    fn render(&self) -> Vec<u8> {
        let width = self.geometry.width as usize;
        let mut pixels = vec![BACKGROUND; width * self.geometry.height as usize];
        for (x, y, side) in self.squares(self.frame_count) {
            for row in y..y + side {
                let start = row as usize * width + x as usize;
                pixels[start..start + side as usize].fill(FOREGROUND);
            }
        }
        pixels
    }

    fn pace(&mut self) {
        if self.settings.target_fps == 0 {
            return;
        }
        let interval = Duration::from_secs(1) / self.settings.target_fps;
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline.max(now) + interval);
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{}, {} face(s))",
            self.settings.url,
            self.geometry.width,
            self.geometry.height,
            self.faces
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(max) = self.settings.max_frames {
            if self.frame_count >= max {
                return Ok(None);
            }
        }
        self.pace();
        self.frame_count += 1;
        let frame = Frame::new(
            self.render(),
            self.geometry.width,
            self.geometry.height,
            PixelFormat::Gray8,
            self.frame_count,
        )?;
        Ok(Some(frame))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.settings.url.clone(),
        }
    }
}

fn parse_face_count(url: &str) -> Result<usize> {
    let rest = url
        .strip_prefix("stub://")
        .ok_or_else(|| anyhow!("synthetic source requires a stub:// url (got {})", url))?;
    let (name, query) = rest.split_once('?').unwrap_or((rest, ""));
    if name == "empty" {
        return Ok(0);
    }
    let mut faces = 1;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some(("faces", value)) => {
                faces = value
                    .parse()
                    .map_err(|_| anyhow!("invalid faces count '{}' in {}", value, url))?;
            }
            _ => return Err(anyhow!("unknown stub source option '{}' in {}", pair, url)),
        }
    }
    if faces > MAX_FACES {
        return Err(anyhow!("stub source supports at most {} faces", MAX_FACES));
    }
    Ok(faces)
}
