use serde::{Deserialize, Serialize};

use crate::frame::FrameGeometry;

/// Axis-aligned box in pixel coordinates, as reported by a detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Positive width and height.
    pub fn has_extent(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Non-degenerate and entirely inside a frame of `geometry`.
    pub fn lies_within(&self, geometry: FrameGeometry) -> bool {
        self.has_extent()
            && self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.w as i64 <= geometry.width as i64
            && self.y as i64 + self.h as i64 <= geometry.height as i64
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// One candidate target. The area is derived from the box on construction
/// and cannot be set independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    bbox: BoundingBox,
    area: i64,
}

impl Detection {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            area: bbox.area(),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn area(&self) -> i64 {
        self.area
    }
}

/// All detections for one frame, largest area first.
///
/// Ordering uses a stable sort, so boxes with equal area keep the order the
/// detector reported them in. Boxes without positive width and height never
/// become detections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn from_boxes<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let mut detections: Vec<Detection> = boxes
            .into_iter()
            .filter(BoundingBox::has_extent)
            .map(Detection::new)
            .collect();
        detections.sort_by(|a, b| b.area.cmp(&a.area));
        Self { detections }
    }

    /// Like `from_boxes`, keeping only boxes that lie inside the frame.
    /// Also returns how many boxes were dropped.
    pub fn from_boxes_within<I>(boxes: I, geometry: FrameGeometry) -> (Self, usize)
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let mut dropped = 0;
        let kept: Vec<BoundingBox> = boxes
            .into_iter()
            .filter(|b| {
                let inside = b.lies_within(geometry);
                if !inside {
                    dropped += 1;
                }
                inside
            })
            .collect();
        (Self::from_boxes(kept), dropped)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// Highest-priority detection, if any.
    pub fn first(&self) -> Option<&Detection> {
        self.detections.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }
}
