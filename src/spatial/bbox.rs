//! Axis-aligned boxes in pixel space
//!
//! `BoundingBox` carries model-reported floating point corners; `PixelBox`
//! carries integer corners for masks and tiles. Both use exclusive maxima so
//! a valid box always has `min < max` on each axis.

use num_traits::clamp;
use serde::{Deserialize, Serialize};

/// Detection box as `(x_min, y_min, x_max, y_max)` in pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x_min: f32,
    /// Top edge
    pub y_min: f32,
    /// Right edge
    pub x_max: f32,
    /// Bottom edge
    pub y_max: f32,
}

impl BoundingBox {
    /// Create a box from its corners
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Horizontal extent (zero for degenerate boxes)
    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    /// Vertical extent (zero for degenerate boxes)
    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    /// Covered area
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// All corners finite and `min < max` on both axes
    pub fn is_valid(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min < self.x_max
            && self.y_min < self.y_max
    }

    /// Valid and inside `[0, width] x [0, height]`
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.is_valid()
            && self.x_min >= 0.0
            && self.y_min >= 0.0
            && self.x_max <= width as f32
            && self.y_max <= height as f32
    }

    /// Shift by a tile origin
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.x_min + dx,
            self.y_min + dy,
            self.x_max + dx,
            self.y_max + dy,
        )
    }

    /// Multiply every corner by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(
            self.x_min * factor,
            self.y_min * factor,
            self.x_max * factor,
            self.y_max * factor,
        )
    }

    /// Clip to `[0, width] x [0, height]`, or `None` if nothing valid remains
    pub fn clamped(&self, width: u32, height: u32) -> Option<Self> {
        let (w, h) = (width as f32, height as f32);
        let clipped = Self::new(
            clamp(self.x_min, 0.0, w),
            clamp(self.y_min, 0.0, h),
            clamp(self.x_max, 0.0, w),
            clamp(self.y_max, 0.0, h),
        );
        clipped.is_valid().then_some(clipped)
    }

    /// Area of the overlap with another box
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let width = self.x_max.min(other.x_max) - self.x_min.max(other.x_min);
        let height = self.y_max.min(other.y_max) - self.y_min.max(other.y_min);
        if width <= 0.0 || height <= 0.0 {
            0.0
        } else {
            width * height
        }
    }

    /// Intersection over union; zero when either box is empty
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// `(x, y, width, height)` form used by persistence records
    pub fn to_xywh(&self) -> [f32; 4] {
        [self.x_min, self.y_min, self.width(), self.height()]
    }
}

/// Integer pixel rectangle with exclusive maxima
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    /// Leftmost column
    pub x_min: u32,
    /// Topmost row
    pub y_min: u32,
    /// One past the rightmost column
    pub x_max: u32,
    /// One past the bottom row
    pub y_max: u32,
}

impl PixelBox {
    /// Box covering exactly one pixel
    pub const fn single(x: u32, y: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x + 1,
            y_max: y + 1,
        }
    }

    /// Grow to include pixel `(x, y)`
    pub fn include(&mut self, x: u32, y: u32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x + 1);
        self.y_max = self.y_max.max(y + 1);
    }

    /// Column count
    pub const fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    /// Row count
    pub const fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    /// Floating point view of the same rectangle
    pub fn to_bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.x_min as f32,
            self.y_min as f32,
            self.x_max as f32,
            self.y_max as f32,
        )
    }
}
