//! Bright-spot detection on frame luma.
//!
//! Threshold segmentation followed by 4-connected component labelling; each
//! component becomes one bounding box. Pairs with the synthetic `stub://`
//! source, which renders bright squares on a dark background.
//!
//! `scale_factor` has no meaning for a single-scale segmenter and is ignored.
//! `min_neighbors` is read as the minimum number of lit pixels a component
//! needs before it is reported.

use anyhow::Result;
use std::collections::VecDeque;

use crate::detect::backend::{DetectionParams, DetectorBackend};
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

pub const DEFAULT_THRESHOLD: u8 = 128;

pub struct BrightSpotBackend {
    threshold: u8,
}

impl BrightSpotBackend {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }
}

impl Default for BrightSpotBackend {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DetectorBackend for BrightSpotBackend {
    fn name(&self) -> &'static str {
        "bright_spot"
    }

    fn detect(&mut self, frame: &Frame, params: &DetectionParams) -> Result<Vec<BoundingBox>> {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let lit: Vec<bool> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| frame.luma_at(x as u32, y as u32) >= self.threshold)
            .collect();

        let mut visited = vec![false; width * height];
        let mut boxes = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..lit.len() {
            if !lit[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);

            let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
            let (mut max_x, mut max_y) = (0usize, 0usize);
            let mut pixels = 0u32;

            while let Some(idx) = queue.pop_front() {
                let (x, y) = (idx % width, idx / width);
                pixels += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                let mut visit = |n: usize| {
                    if lit[n] && !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                };
                if x > 0 {
                    visit(idx - 1);
                }
                if x + 1 < width {
                    visit(idx + 1);
                }
                if y > 0 {
                    visit(idx - width);
                }
                if y + 1 < height {
                    visit(idx + width);
                }
            }

            if pixels >= params.min_neighbors {
                boxes.push(BoundingBox::new(
                    min_x as i32,
                    min_y as i32,
                    (max_x - min_x + 1) as i32,
                    (max_y - min_y + 1) as i32,
                ));
            }
        }

        Ok(boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    fn frame_with_squares(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> Frame {
        let mut pixels = vec![10u8; (width * height) as usize];
        for &(sx, sy, side) in squares {
            for y in sy..sy + side {
                for x in sx..sx + side {
                    pixels[(y * width + x) as usize] = 240;
                }
            }
        }
        Frame::new(pixels, width, height, PixelFormat::Gray8, 1).unwrap()
    }

    #[test]
    fn finds_one_box_per_component() -> Result<()> {
        let frame = frame_with_squares(64, 48, &[(2, 3, 5), (30, 20, 10)]);
        let params = DetectionParams {
            scale_factor: 1.1,
            min_neighbors: 1,
        };
        let mut boxes = BrightSpotBackend::default().detect(&frame, &params)?;
        boxes.sort_by_key(|b| b.x);
        assert_eq!(
            boxes,
            vec![BoundingBox::new(2, 3, 5, 5), BoundingBox::new(30, 20, 10, 10)]
        );
        Ok(())
    }

    #[test]
    fn drops_components_below_min_pixel_count() -> Result<()> {
        let frame = frame_with_squares(32, 32, &[(1, 1, 2), (10, 10, 6)]);
        let params = DetectionParams {
            scale_factor: 1.1,
            min_neighbors: 10,
        };
        let boxes = BrightSpotBackend::default().detect(&frame, &params)?;
        assert_eq!(boxes, vec![BoundingBox::new(10, 10, 6, 6)]);
        Ok(())
    }

    #[test]
    fn dark_frame_yields_nothing() -> Result<()> {
        let frame = frame_with_squares(16, 16, &[]);
        let boxes = BrightSpotBackend::default().detect(&frame, &DetectionParams::default())?;
        assert!(boxes.is_empty());
        Ok(())
    }
}
