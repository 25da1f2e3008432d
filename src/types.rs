use serde::{Deserialize, Serialize};

/// A 2D point in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned rectangle defined by top-left corner, width, and height.
///
/// Coordinates share the pixel space of the source image and may be
/// fractional or lie partly outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Snap to whole pixels: `(left, top, width, height)`.
    ///
    /// Edges are rounded independently so adjacent rectangles never overlap
    /// or leave a gap. Returns `None` when nothing remains after rounding,
    /// when an edge is not finite, or when a side does not fit in `u32`.
    pub fn to_pixels(&self) -> Option<(i64, i64, u32, u32)> {
        let edges = [self.x, self.y, self.right(), self.bottom()];
        if !edges.iter().all(|e| e.is_finite()) {
            return None;
        }
        let [left, top, right, bottom] = edges.map(|e| e.round() as i64);
        let width = u32::try_from(right.checked_sub(left)?).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(bottom.checked_sub(top)?).ok().filter(|h| *h > 0)?;
        Some((left, top, width, height))
    }
}
