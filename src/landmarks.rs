//! Face landmark capability boundary.
//!
//! The compositor never sees a detection library's types. Anything able to
//! report eye contours for the faces in an image implements
//! [`LandmarkProvider`]; the built-in SeetaFace backend lives in
//! [`crate::detector`], and [`RecordedLandmarks`] replays landmarks produced
//! elsewhere (for example a JSON dump from a browser-side detector).

use std::ops::RangeInclusive;
use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::EyeContour;
use crate::types::Point;

/// Eye on the left side of the image in the iBUG 68-point scheme.
pub const LEFT_EYE_68: RangeInclusive<usize> = 36..=41;

/// Eye on the right side of the image in the iBUG 68-point scheme.
pub const RIGHT_EYE_68: RangeInclusive<usize> = 42..=47;

/// Eye contours of one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: EyeContour,
    pub right_eye: EyeContour,
}

impl FaceLandmarks {
    pub fn new(left_eye: EyeContour, right_eye: EyeContour) -> Self {
        Self {
            left_eye,
            right_eye,
        }
    }

    /// Pick the eye contours out of a 68 (or 81) point landmark shape.
    ///
    /// Returns `None` if the shape is too short to contain both eyes.
    pub fn from_68_points(points: &[Point]) -> Option<Self> {
        if points.len() <= *RIGHT_EYE_68.end() {
            return None;
        }
        let left = EyeContour::new(points[LEFT_EYE_68].to_vec()).ok()?;
        let right = EyeContour::new(points[RIGHT_EYE_68].to_vec()).ok()?;
        Some(Self::new(left, right))
    }
}

/// Pluggable landmark detection backend.
///
/// Returns one entry per detected face, in the backend's own order. An
/// empty vector means no face was found; there is no other failure path.
pub trait LandmarkProvider: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Vec<FaceLandmarks>;
}

/// One face as stored in a landmark recording.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RecordedFace {
    Contours {
        left_eye: EyeContour,
        right_eye: EyeContour,
    },
    Shape {
        points: Vec<Point>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Recording {
    /// Dimensions of the image the landmarks were measured on.
    width: Option<u32>,
    height: Option<u32>,
    faces: Vec<RecordedFace>,
}

/// Replays landmarks measured by an external detector.
///
/// The JSON document looks like:
///
/// ```json
/// {
///   "width": 640,
///   "height": 480,
///   "faces": [
///     { "left_eye": [{"x": 1.0, "y": 2.0}], "right_eye": [{"x": 3.0, "y": 4.0}] },
///     { "points": [ ...68 points... ] }
///   ]
/// }
/// ```
///
/// `width`/`height` are optional. When present and different from the image
/// being processed, the points are rescaled to the image.
#[derive(Debug, Clone)]
pub struct RecordedLandmarks {
    faces: Vec<FaceLandmarks>,
    measured_on: Option<(u32, u32)>,
}

impl RecordedLandmarks {
    pub fn new(faces: Vec<FaceLandmarks>) -> Self {
        Self {
            faces,
            measured_on: None,
        }
    }

    /// Record the image size the landmarks belong to.
    pub fn measured_on(mut self, width: u32, height: u32) -> Self {
        self.measured_on = Some((width, height));
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let recording: Recording = serde_json::from_str(json)?;

        let mut faces = Vec::with_capacity(recording.faces.len());
        for (index, face) in recording.faces.into_iter().enumerate() {
            let landmarks = match face {
                RecordedFace::Contours {
                    left_eye,
                    right_eye,
                } => FaceLandmarks::new(left_eye, right_eye),
                RecordedFace::Shape { points } => FaceLandmarks::from_68_points(&points)
                    .ok_or_else(|| {
                        Error::Landmarks(format!(
                            "face {}: expected at least {} points, got {}",
                            index,
                            RIGHT_EYE_68.end() + 1,
                            points.len()
                        ))
                    })?,
            };
            faces.push(landmarks);
        }

        let measured_on = match (recording.width, recording.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            (None, None) => None,
            _ => {
                return Err(Error::Landmarks(
                    "width and height must both be given and non-zero".into(),
                ))
            }
        };

        Ok(Self { faces, measured_on })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}

fn scale_contour(contour: &EyeContour, sx: f32, sy: f32) -> EyeContour {
    let points = contour
        .points()
        .iter()
        .map(|p| Point::new(p.x * sx, p.y * sy))
        .collect();
    // Scaling never changes the point count.
    EyeContour::new(points).unwrap_or_else(|_| contour.clone())
}

impl LandmarkProvider for RecordedLandmarks {
    fn detect(&self, image: &DynamicImage) -> Vec<FaceLandmarks> {
        let Some((w, h)) = self.measured_on else {
            return self.faces.clone();
        };
        if (w, h) == (image.width(), image.height()) {
            return self.faces.clone();
        }

        let sx = image.width() as f32 / w as f32;
        let sy = image.height() as f32 / h as f32;
        log::debug!(
            "rescaling recorded landmarks from {}x{} to {}x{}",
            w,
            h,
            image.width(),
            image.height()
        );
        self.faces
            .iter()
            .map(|face| {
                FaceLandmarks::new(
                    scale_contour(&face.left_eye, sx, sy),
                    scale_contour(&face.right_eye, sx, sy),
                )
            })
            .collect()
    }
}
