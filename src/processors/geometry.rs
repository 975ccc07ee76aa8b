//! Geometric primitives over the normalized layout coordinate space.
//!
//! Layout boxes are integers in `[0, 1000]` with a top-left origin, independent
//! of the page's pixel size. This module provides the box and point types plus
//! the overlap measures used by NMS and containment merging.

use crate::core::constants::{CONTAINMENT_THRESHOLD, NORMALIZED_COORD_MAX};
use serde::{Deserialize, Serialize};

/// A point in normalized `[0, 1000]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// X-coordinate of the point.
    pub x: i32,
    /// Y-coordinate of the point.
    pub y: i32,
}

impl NormalizedPoint {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the point with both coordinates clamped into `[0, 1000]`.
    pub fn clamped(&self) -> Self {
        Self {
            x: clamp_coord(self.x),
            y: clamp_coord(self.y),
        }
    }
}

/// An axis-aligned box in normalized `[0, 1000]` coordinates.
///
/// A valid box has every coordinate in range and `x1 < x2`, `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedBBox {
    /// Left edge.
    pub x1: i32,
    /// Top edge.
    pub y1: i32,
    /// Right edge.
    pub x2: i32,
    /// Bottom edge.
    pub y2: i32,
}

/// Width/height scale factors for center-preserving box expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnclipRatio {
    /// Horizontal scale factor.
    pub width_ratio: f32,
    /// Vertical scale factor.
    pub height_ratio: f32,
}

impl UnclipRatio {
    /// Creates a new ratio.
    pub fn new(width_ratio: f32, height_ratio: f32) -> Self {
        Self {
            width_ratio,
            height_ratio,
        }
    }

    /// Returns true for the `(1, 1)` ratio, which leaves boxes unchanged.
    pub fn is_identity(&self) -> bool {
        self.width_ratio == 1.0 && self.height_ratio == 1.0
    }

    /// Returns true when both factors are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width_ratio.is_finite()
            && self.height_ratio.is_finite()
            && self.width_ratio > 0.0
            && self.height_ratio > 0.0
    }
}

/// A pixel rectangle inside an image, as produced by [`NormalizedBBox::to_pixel_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl NormalizedBBox {
    /// Creates a new box from its corner coordinates.
    ///
    /// # Arguments
    ///
    /// * `x1` - Left edge.
    /// * `y1` - Top edge.
    /// * `x2` - Right edge.
    /// * `y2` - Bottom edge.
    #[inline]
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns the coordinates as `[x1, y1, x2, y2]`.
    pub fn to_array(&self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Checks that all coordinates are within `[0, 1000]` and the box is non-degenerate.
    pub fn is_valid(&self) -> bool {
        let in_range = |v: i32| (0..=NORMALIZED_COORD_MAX).contains(&v);
        in_range(self.x1)
            && in_range(self.y1)
            && in_range(self.x2)
            && in_range(self.y2)
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    /// Returns the box with every coordinate clamped into `[0, 1000]`.
    ///
    /// The result may be degenerate; callers check [`is_valid`](Self::is_valid).
    pub fn clamped(&self) -> Self {
        Self {
            x1: clamp_coord(self.x1),
            y1: clamp_coord(self.y1),
            x2: clamp_coord(self.x2),
            y2: clamp_coord(self.y2),
        }
    }

    /// Area using the exclusive convention (`(x2 - x1) * (y2 - y1)`), zero when degenerate.
    pub fn area(&self) -> i64 {
        let w = (self.x2 - self.x1).max(0) as i64;
        let h = (self.y2 - self.y1).max(0) as i64;
        w * h
    }

    /// Area using the +1 inclusive-pixel convention used by IoU.
    fn inclusive_area(&self) -> f32 {
        let w = (self.x2 - self.x1 + 1).max(0) as f32;
        let h = (self.y2 - self.y1 + 1).max(0) as f32;
        w * h
    }

    /// The 4-point rectangle polygon, clockwise from the top-left corner.
    pub fn polygon(&self) -> Vec<NormalizedPoint> {
        vec![
            NormalizedPoint::new(self.x1, self.y1),
            NormalizedPoint::new(self.x2, self.y1),
            NormalizedPoint::new(self.x2, self.y2),
            NormalizedPoint::new(self.x1, self.y2),
        ]
    }

    /// Key used for position-based reading order: `(y1, x1, y2, x2)`.
    pub fn reading_order_key(&self) -> (i32, i32, i32, i32) {
        (self.y1, self.x1, self.y2, self.x2)
    }

    /// Expands (or shrinks) the box around its center.
    ///
    /// The result is clamped to `[0, 1000]` and floored. Boxes with
    /// non-positive width or height are returned unchanged.
    pub fn unclip(&self, ratio: UnclipRatio) -> Self {
        let (x1, y1, x2, y2) = (
            self.x1 as f32,
            self.y1 as f32,
            self.x2 as f32,
            self.y2 as f32,
        );
        let width = x2 - x1;
        let height = y2 - y1;
        if width <= 0.0 || height <= 0.0 {
            return *self;
        }

        let new_w = width * ratio.width_ratio;
        let new_h = height * ratio.height_ratio;
        let cx = x1 + width / 2.0;
        let cy = y1 + height / 2.0;

        let fit = |v: f32| v.clamp(0.0, NORMALIZED_COORD_MAX as f32).floor() as i32;
        Self {
            x1: fit(cx - new_w / 2.0),
            y1: fit(cy - new_h / 2.0),
            x2: fit(cx + new_w / 2.0),
            y2: fit(cy + new_h / 2.0),
        }
    }

    /// Maps the box onto an image of `width` x `height` pixels.
    ///
    /// Left/top edges are floored and right/bottom edges ceiled so the pixel
    /// rectangle fully covers the normalized box; the result is intersected
    /// with the image bounds. Returns `None` when the intersection is empty.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        let scale = |v: i32, extent: u32| v as f64 * extent as f64 / NORMALIZED_COORD_MAX as f64;
        let x1 = scale(self.x1, width).floor().max(0.0);
        let y1 = scale(self.y1, height).floor().max(0.0);
        let x2 = scale(self.x2, width).ceil().min(width as f64);
        let y2 = scale(self.y2, height).ceil().min(height as f64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

#[inline]
fn clamp_coord(v: i32) -> i32 {
    v.clamp(0, NORMALIZED_COORD_MAX)
}

/// Intersection-over-union with the +1 inclusive-pixel convention.
///
/// Returns 0 when the union area is 0.
pub fn iou(a: &NormalizedBBox, b: &NormalizedBBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter_w = (x2 - x1 + 1).max(0) as f32;
    let inter_h = (y2 - y1 + 1).max(0) as f32;
    let inter = inter_w * inter_h;

    let union = a.inclusive_area() + b.inclusive_area() - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}

/// Returns true when at least 80% of `inner`'s area lies inside `outer`.
///
/// Uses exclusive areas; a zero-area `inner` is never contained.
pub fn is_contained(inner: &NormalizedBBox, outer: &NormalizedBBox) -> bool {
    let inner_area = inner.area();
    if inner_area <= 0 {
        return false;
    }
    let inter = NormalizedBBox::new(
        inner.x1.max(outer.x1),
        inner.y1.max(outer.y1),
        inner.x2.min(outer.x2),
        inner.y2.min(outer.y2),
    )
    .area();
    inter as f64 / inner_area as f64 >= CONTAINMENT_THRESHOLD
}
