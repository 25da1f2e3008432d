//! Eye contour geometry.
//!
//! Converts the landmark points outlining one eye into the rectangle a decal
//! is stretched over: the axis-aligned bounding box of the contour, grown by
//! a padding factor around its own center.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Point, Rect};

/// Padding used by the shipped configuration.
pub const DEFAULT_PADDING: f32 = 1.7;

/// Ordered outline of one eye as reported by a landmark provider.
///
/// Always holds at least one point. The point order follows the provider's
/// landmark indexing and is preserved as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct EyeContour {
    points: Vec<Point>,
}

impl EyeContour {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyContour);
        }
        Ok(Self { points })
    }

    /// For callers holding points that are non-empty by construction.
    pub(crate) fn from_nonempty(points: Vec<Point>) -> Self {
        debug_assert!(!points.is_empty());
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Contours are never empty, so this is always false.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Tight axis-aligned bounding box of every point.
    pub fn bounding_box(&self) -> Rect {
        let first = self.points[0];
        let (min_x, min_y, max_x, max_y) = self.points[1..].iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        );
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

impl TryFrom<Vec<Point>> for EyeContour {
    type Error = Error;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<EyeContour> for Vec<Point> {
    fn from(contour: EyeContour) -> Self {
        contour.points
    }
}

/// Grow `rect` by factor `k` in both dimensions, keeping its center fixed.
pub fn pad_rect(rect: Rect, k: f32) -> Rect {
    let width = rect.width * k;
    let height = rect.height * k;
    Rect::new(
        rect.x - (width - rect.width) / 2.0,
        rect.y - (height - rect.height) / 2.0,
        width,
        height,
    )
}

/// Placement rectangle for a decal over one eye.
///
/// Pure function of the contour and `k`. A contour whose points all coincide
/// yields a zero-size rectangle at that point.
pub fn eye_rect(contour: &EyeContour, k: f32) -> Rect {
    pad_rect(contour.bounding_box(), k)
}

/// Reject padding factors that would shrink or corrupt the placement.
pub fn validate_padding(k: f32) -> Result<f32> {
    if k.is_finite() && k >= 1.0 {
        Ok(k)
    } else {
        Err(Error::InvalidPadding(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn contour(points: &[(f32, f32)]) -> EyeContour {
        EyeContour::new(points.iter().copied().map(Point::from).collect()).unwrap()
    }

    #[test]
    fn square_contour_padded_by_one_and_a_half() {
        let eye = contour(&[(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)]);
        assert_eq!(eye.bounding_box(), Rect::new(10.0, 10.0, 10.0, 10.0));
        assert_eq!(eye_rect(&eye, 1.5), Rect::new(7.5, 7.5, 15.0, 15.0));
    }

    #[test]
    fn unit_padding_is_the_bounding_box() {
        let eye = contour(&[(3.25, 8.0), (11.0, 6.5), (9.75, 12.0), (4.0, 10.0)]);
        assert_eq!(eye_rect(&eye, 1.0), eye.bounding_box());
    }

    #[test]
    fn coincident_points_give_zero_size_rect() {
        let eye = contour(&[(42.0, 17.0); 6]);
        let rect = eye_rect(&eye, 1.7);
        assert_eq!(rect, Rect::new(42.0, 17.0, 0.0, 0.0));
        assert!(rect.is_empty());
    }

    #[test]
    fn single_point_contour_is_accepted() {
        let eye = contour(&[(1.0, 2.0)]);
        assert_eq!(eye.len(), 1);
        assert!(!eye.is_empty());
        assert_eq!(eye_rect(&eye, 2.0), Rect::new(1.0, 2.0, 0.0, 0.0));
    }

    #[test]
    fn empty_contour_is_rejected() {
        assert!(matches!(EyeContour::new(vec![]), Err(Error::EmptyContour)));
    }

    #[test]
    fn contour_points_are_left_untouched() {
        let points = vec![Point::new(5.0, 1.0), Point::new(0.0, 3.0), Point::new(2.0, 9.0)];
        let eye = EyeContour::new(points.clone()).unwrap();
        let _ = eye_rect(&eye, 1.6);
        let _ = eye_rect(&eye, 1.6);
        assert_eq!(eye.points(), points.as_slice());
    }

    #[test]
    fn empty_contour_fails_to_deserialize() {
        let parsed: std::result::Result<EyeContour, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
        let parsed: EyeContour = serde_json::from_str(r#"[{"x":1.0,"y":2.0}]"#).unwrap();
        assert_eq!(parsed.points(), &[Point::new(1.0, 2.0)]);
    }

    #[test]
    fn padding_validation() {
        assert_eq!(validate_padding(1.0).unwrap(), 1.0);
        assert_eq!(validate_padding(DEFAULT_PADDING).unwrap(), DEFAULT_PADDING);
        assert!(validate_padding(0.9).is_err());
        assert!(validate_padding(f32::NAN).is_err());
        assert!(validate_padding(f32::INFINITY).is_err());
    }

    proptest! {
        #[test]
        fn padded_rect_keeps_center_and_scales_size(
            raw in prop::collection::vec((-1000.0f32..1000.0, -1000.0f32..1000.0), 1..12),
            k in 1.0f32..3.0,
        ) {
            let eye = contour(&raw);
            let bbox = eye.bounding_box();
            let rect = eye_rect(&eye, k);

            let tolerance = 1e-2;
            prop_assert!((rect.center().x - bbox.center().x).abs() < tolerance);
            prop_assert!((rect.center().y - bbox.center().y).abs() < tolerance);
            prop_assert!((rect.width - bbox.width * k).abs() < tolerance);
            prop_assert!((rect.height - bbox.height * k).abs() < tolerance);
        }

        #[test]
        fn padded_rect_contains_every_point(
            raw in prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 1..12),
            k in 1.0f32..3.0,
        ) {
            let eye = contour(&raw);
            let rect = eye_rect(&eye, k);
            for p in eye.points() {
                prop_assert!(p.x >= rect.x - 1e-3 && p.x <= rect.right() + 1e-3);
                prop_assert!(p.y >= rect.y - 1e-3 && p.y <= rect.bottom() + 1e-3);
            }
        }
    }
}
