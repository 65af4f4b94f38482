//! Target selection and centroid extraction.
//!
//! Each frame is decided on its own: the largest box wins and there is no
//! hysteresis. Two faces of equal size can therefore alternate as the target
//! from one frame to the next.

use crate::detect::{BoundingBox, Detection, DetectionSet};

/// Point the controller steers toward, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackPoint {
    pub cx: i32,
    pub cy: i32,
}

impl TrackPoint {
    /// Display form of "no target", matching the `(-1, -1)` used on overlays.
    pub const SENTINEL: (i32, i32) = (-1, -1);

    /// Center of a box, with floor division. Saturates at the `i32` range.
    pub fn centroid(bbox: &BoundingBox) -> Self {
        Self {
            cx: bbox.x.saturating_add(bbox.w.div_euclid(2)),
            cy: bbox.y.saturating_add(bbox.h.div_euclid(2)),
        }
    }

    /// Coordinates of an optional point, falling back to the sentinel.
    pub fn or_sentinel(point: Option<TrackPoint>) -> (i32, i32) {
        point.map_or(Self::SENTINEL, |p| (p.cx, p.cy))
    }
}

/// Highest-priority detection of the frame.
pub fn select_target(detections: &DetectionSet) -> Option<&Detection> {
    detections.first()
}

/// Selection and centroid in one step; `None` when the frame has no target.
pub fn track_point(detections: &DetectionSet) -> Option<TrackPoint> {
    select_target(detections).map(|d| TrackPoint::centroid(&d.bbox()))
}
