//! Detector initialisation and the built-in SeetaFace backend.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use crate::geometry::EyeContour;
use crate::landmarks::{FaceLandmarks, LandmarkProvider};
use crate::types::{Point, Rect};

/// Mean contour of the eye on the image's left, in face-box normalised [0,1]
/// coordinates (iBUG points 36-41).
const MEAN_LEFT_EYE: [(f32, f32); 6] = [
    (0.24, 0.32),
    (0.28, 0.29),
    (0.34, 0.29),
    (0.38, 0.33),
    (0.34, 0.35),
    (0.28, 0.35),
];

/// Mean contour of the eye on the image's right (iBUG points 42-47).
const MEAN_RIGHT_EYE: [(f32, f32); 6] = [
    (0.62, 0.33),
    (0.66, 0.29),
    (0.72, 0.29),
    (0.76, 0.32),
    (0.72, 0.35),
    (0.66, 0.35),
];

fn denormalize(face: &Rect, mean: &[(f32, f32)]) -> Vec<Point> {
    mean.iter()
        .map(|&(nx, ny)| Point::new(face.x + nx * face.width, face.y + ny * face.height))
        .collect()
}

/// Place the mean eye contours inside a detected face box.
pub fn place_mean_eyes(face: &Rect) -> FaceLandmarks {
    FaceLandmarks::new(
        EyeContour::from_nonempty(denormalize(face, &MEAN_LEFT_EYE)),
        EyeContour::from_nonempty(denormalize(face, &MEAN_RIGHT_EYE)),
    )
}

/// An initialised landmark provider, ready to be passed to the pipeline.
///
/// Obtained either from [`DetectorHandle::initialize`] (built-in backend,
/// model loaded from the configured candidates) or by wrapping any
/// [`LandmarkProvider`] with [`DetectorHandle::from_provider`].
#[derive(Clone)]
pub struct DetectorHandle {
    name: String,
    provider: Arc<dyn LandmarkProvider>,
}

impl DetectorHandle {
    pub fn from_provider<P>(name: impl Into<String>, provider: P) -> Self
    where
        P: LandmarkProvider + 'static,
    {
        Self {
            name: name.into(),
            provider: Arc::new(provider),
        }
    }

    /// Load the built-in SeetaFace backend, trying each configured model path
    /// in order.
    #[cfg(feature = "rustface")]
    pub fn initialize(config: &crate::config::DetectorConfig) -> crate::Result<Self> {
        let detector = seeta::SeetaDetector::load(config)?;
        Ok(Self::from_provider("seetaface", detector))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detect(&self, image: &DynamicImage) -> Vec<FaceLandmarks> {
        self.provider.detect(image)
    }

    pub(crate) fn shared(&self) -> Arc<dyn LandmarkProvider> {
        Arc::clone(&self.provider)
    }
}

impl fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "rustface")]
pub use seeta::SeetaDetector;

#[cfg(feature = "rustface")]
mod seeta {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    use image::DynamicImage;

    use super::place_mean_eyes;
    use crate::config::DetectorConfig;
    use crate::error::{Error, Result};
    use crate::landmarks::{FaceLandmarks, LandmarkProvider};
    use crate::types::Rect;

    /// Face detector backed by the `rustface` crate (SeetaFace engine).
    ///
    /// Eye contours come from the mean eye shape scaled into each face box.
    pub struct SeetaDetector {
        model: rustface::Model,
        min_face_size: u32,
        score_threshold: f64,
        pyramid_scale_factor: f32,
        slide_window_step: u32,
    }

    fn read_model(path: &Path) -> Result<rustface::Model> {
        let file = File::open(path)?;
        rustface::read_model(BufReader::new(file))
            .map_err(|e| Error::ModelLoad(e.to_string()))
    }

    impl SeetaDetector {
        /// Load the first model that reads successfully. Later paths are
        /// only tried when earlier ones fail.
        pub fn load(config: &DetectorConfig) -> Result<Self> {
            config.validate()?;
            let mut failures = Vec::new();

            for path in &config.model_paths {
                match read_model(path) {
                    Ok(model) => {
                        if !failures.is_empty() {
                            log::warn!(
                                "loaded face detector model from fallback {}",
                                path.display()
                            );
                        } else {
                            log::info!("loaded face detector model from {}", path.display());
                        }
                        return Ok(Self {
                            model,
                            min_face_size: config.min_face_size,
                            score_threshold: config.score_threshold,
                            pyramid_scale_factor: config.pyramid_scale_factor,
                            slide_window_step: config.slide_window_step,
                        });
                    }
                    Err(e) => {
                        log::warn!("cannot load face detector model {}: {}", path.display(), e);
                        failures.push(format!("{}: {}", path.display(), e));
                    }
                }
            }

            if failures.is_empty() {
                return Err(Error::ModelLoad("no model paths configured".into()));
            }
            Err(Error::ModelLoad(failures.join("; ")))
        }
    }

    impl LandmarkProvider for SeetaDetector {
        fn detect(&self, image: &DynamicImage) -> Vec<FaceLandmarks> {
            let gray = image.to_luma8();
            let mut detector = rustface::create_detector_with_model(self.model.clone());
            detector.set_min_face_size(self.min_face_size);
            detector.set_score_thresh(self.score_threshold);
            detector.set_pyramid_scale_factor(self.pyramid_scale_factor);
            detector.set_slide_window_step(self.slide_window_step, self.slide_window_step);

            let faces = detector.detect(&rustface::ImageData::new(
                gray.as_raw(),
                gray.width(),
                gray.height(),
            ));
            log::debug!("seetaface found {} face(s)", faces.len());

            faces
                .iter()
                .map(|face| {
                    let bbox = face.bbox();
                    place_mean_eyes(&Rect::new(
                        bbox.x() as f32,
                        bbox.y() as f32,
                        bbox.width() as f32,
                        bbox.height() as f32,
                    ))
                })
                .collect()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::eye_rect;

    struct Fixed(Vec<FaceLandmarks>);

    impl LandmarkProvider for Fixed {
        fn detect(&self, _image: &DynamicImage) -> Vec<FaceLandmarks> {
            self.0.clone()
        }
    }

    #[test]
    fn mean_eyes_fall_inside_face_box() {
        let face = Rect::new(100.0, 50.0, 200.0, 200.0);
        let eyes = place_mean_eyes(&face);
        assert_eq!(eyes.left_eye.len(), 6);
        let first = eyes.left_eye.points()[0];
        assert!((first.x - 148.0).abs() < 1e-3);
        assert!((first.y - 114.0).abs() < 1e-3);

        let left = eye_rect(&eyes.left_eye, 1.0);
        let right = eye_rect(&eyes.right_eye, 1.0);
        assert!(left.right() < right.x);
        assert!(left.x >= face.x && right.right() <= face.right());
    }

    #[test]
    fn handle_delegates_to_provider() {
        let eyes = place_mean_eyes(&Rect::new(0.0, 0.0, 10.0, 10.0));
        let handle = DetectorHandle::from_provider("fixed", Fixed(vec![eyes.clone()]));
        assert_eq!(handle.name(), "fixed");
        assert_eq!(handle.detect(&DynamicImage::new_rgb8(10, 10)), vec![eyes]);
        assert!(format!("{:?}", handle).contains("fixed"));
    }
}
