//! Video frames as seen by the tracker.
//!
//! A `Frame` is an image plus the metadata the tracking loop needs. Pixels are
//! private; detectors read them through `Frame::pixels` and nothing else in
//! the pipeline touches them.

use anyhow::{anyhow, Result};

/// Pixel layout of a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One luma byte per pixel.
    Gray8,
    /// Three bytes per pixel, R G B.
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Frame geometry the controller measures errors against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Horizontal center with floor division.
    pub fn center_x(&self) -> i32 {
        (self.width / 2) as i32
    }

    /// Vertical center with floor division.
    pub fn center_y(&self) -> i32 {
        (self.height / 2) as i32
    }
}

/// One captured image.
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Position in the source's sequence, starting at 1.
    pub sequence: u64,
}

impl Frame {
    /// Wrap a pixel buffer, checking its length against the geometry.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer holds {} bytes, expected {} for {}x{} {:?}",
                pixels.len(),
                expected,
                width,
                height,
                format
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            format,
            sequence,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    /// Luma of the pixel at (x, y). Out-of-bounds reads return 0.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let idx = (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel();
        match self.format {
            PixelFormat::Gray8 => self.pixels[idx],
            PixelFormat::Rgb8 => {
                let r = self.pixels[idx] as u32;
                let g = self.pixels[idx + 1] as u32;
                let b = self.pixels[idx + 2] as u32;
                // ITU-R BT.601 weights, integer form
                ((299 * r + 587 * g + 114 * b) / 1000) as u8
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer_length() {
        assert!(Frame::new(vec![0; 10], 4, 4, PixelFormat::Gray8, 1).is_err());
        assert!(Frame::new(vec![0; 16], 4, 4, PixelFormat::Gray8, 1).is_ok());
        assert!(Frame::new(vec![0; 16], 4, 4, PixelFormat::Rgb8, 1).is_err());
    }

    #[test]
    fn luma_reads_both_formats() -> Result<()> {
        let mut gray = vec![0u8; 4];
        gray[3] = 200;
        let frame = Frame::new(gray, 2, 2, PixelFormat::Gray8, 1)?;
        assert_eq!(frame.luma_at(1, 1), 200);
        assert_eq!(frame.luma_at(5, 5), 0);

        let rgb = vec![255u8; 12];
        let frame = Frame::new(rgb, 2, 2, PixelFormat::Rgb8, 2)?;
        assert_eq!(frame.luma_at(0, 1), 255);
        Ok(())
    }

    #[test]
    fn geometry_center_uses_floor_division() {
        let geometry = FrameGeometry::new(641, 481);
        assert_eq!(geometry.center_x(), 320);
        assert_eq!(geometry.center_y(), 240);
    }
}
