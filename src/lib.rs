//! # eye-swap
//!
//! Find the eyes in a photo and stamp decal images over them.
//!
//! This crate provides:
//! - **Eye geometry**: padded placement rectangles from eye landmark contours
//! - **Compositing**: the source image with left/right decals stretched over
//!   every detected eye, encoded as JPEG or PNG
//! - **Detection boundary**: a [`LandmarkProvider`] trait, a SeetaFace-based
//!   backend and a provider that replays recorded landmarks
//! - **Request handling**: an async pipeline that loads decals while faces
//!   are detected, and a session that drops results of superseded requests
//!
//! ## Algorithm Overview
//!
//! 1. Detect faces; each face reports a left and a right eye contour
//! 2. For each contour take the axis-aligned bounding box of its points
//! 3. Grow the box by the padding factor `k` around its center
//! 4. Draw the source image, then each face's left and right decal stretched
//!    into its box, in detection order
//! 5. Encode the surface
//!
//! ## Quick Start
//!
//! ```rust
//! use eye_swap::{eye_rect, EyeContour, Point, Rect};
//!
//! let eye = EyeContour::new(vec![
//!     Point::new(10.0, 10.0),
//!     Point::new(20.0, 10.0),
//!     Point::new(20.0, 20.0),
//!     Point::new(10.0, 20.0),
//! ])
//! .unwrap();
//!
//! assert_eq!(eye_rect(&eye, 1.5), Rect::new(7.5, 7.5, 15.0, 15.0));
//! ```
//!
//! ## Custom Detectors
//!
//! Implement [`LandmarkProvider`] for any detection backend:
//!
//! ```rust
//! use eye_swap::{DetectorHandle, FaceLandmarks, LandmarkProvider};
//! use image::DynamicImage;
//!
//! struct MyDetector;
//!
//! impl LandmarkProvider for MyDetector {
//!     fn detect(&self, _image: &DynamicImage) -> Vec<FaceLandmarks> {
//!         // Run your model and return the eye contours of every face
//!         vec![]
//!     }
//! }
//!
//! let handle = DetectorHandle::from_provider("mine", MyDetector);
//! assert_eq!(handle.name(), "mine");
//! ```

pub mod catalog;
pub mod compositor;
pub mod config;
pub mod decal;
pub mod detector;
mod error;
pub mod export;
mod geometry;
pub mod landmarks;
pub mod pipeline;
pub mod session;
mod types;

pub use catalog::{DecalCatalog, DecalStyle};
pub use compositor::{CompositeResult, Compositor, EyePlacement, OutputFormat};
pub use config::Config;
pub use decal::{DecalPair, DecalSide};
#[cfg(feature = "rustface")]
pub use detector::SeetaDetector;
pub use detector::DetectorHandle;
pub use error::{Error, Result};
pub use export::{download_filename, DirectoryStore, ImageStore};
pub use geometry::{eye_rect, pad_rect, validate_padding, EyeContour, DEFAULT_PADDING};
pub use landmarks::{FaceLandmarks, LandmarkProvider, RecordedLandmarks};
pub use pipeline::{EyeSwapper, RequestState, RequestTrace};
pub use session::{Displayed, Outcome, SwapSession};
pub use types::{Point, Rect};
