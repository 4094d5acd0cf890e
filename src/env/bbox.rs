use serde::{Deserialize, Serialize};

use super::action::BoxAction;

/// Smallest side length a box can shrink to, in pixels
const MIN_SIDE: f32 = 1.0;

/// Axis-aligned bounding box in pixel coordinates
///
/// `(x0, y0)` is the top-left corner, `(x1, y1)` the bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Box covering a whole `width x height` image
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box, in `[0, 1]`
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix0 = self.x0.max(other.x0);
        let iy0 = self.y0.max(other.y0);
        let ix1 = self.x1.min(other.x1);
        let iy1 = self.y1.min(other.y1);

        let intersection = ((ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0)) as f64;
        let union = self.area() as f64 + other.area() as f64 - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Apply a box action, keeping the result inside the image
    pub fn transformed(&self, action: BoxAction, alpha: f32, width: u32, height: u32) -> Self {
        let (dx0, dy0, dx1, dy1) = action.deltas(self.width(), self.height(), alpha);
        let moved = Self::new(self.x0 + dx0, self.y0 + dy0, self.x1 + dx1, self.y1 + dy1);
        moved.clamped(width, height)
    }

    /// Clamp to image bounds, never collapsing below `MIN_SIDE`
    fn clamped(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let (x0, x1) = clamp_span(self.x0, self.x1, w);
        let (y0, y1) = clamp_span(self.y0, self.y1, h);
        Self::new(x0, y0, x1, y1)
    }
}

/// Clamp `[lo, hi]` into `[0, limit]` keeping at least `MIN_SIDE` length
fn clamp_span(lo: f32, hi: f32, limit: f32) -> (f32, f32) {
    let min_side = MIN_SIDE.min(limit);
    let mut lo = lo.clamp(0.0, limit);
    let mut hi = hi.clamp(0.0, limit);
    if hi - lo < min_side {
        let center = ((lo + hi) / 2.0).clamp(min_side / 2.0, limit - min_side / 2.0);
        lo = center - min_side / 2.0;
        hi = center + min_side / 2.0;
    }
    (lo, hi)
}
