//! Eye decal compositing.
//!
//! Draws the source image onto a fresh surface, stretches the left and right
//! decals over every face's padded eye rectangles, and encodes the result.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::decal::{DecalPair, DecalSide};
use crate::error::{Error, Result};
use crate::geometry::{eye_rect, validate_padding, DEFAULT_PADDING};
use crate::landmarks::FaceLandmarks;
use crate::types::Rect;

/// Default JPEG quality, matching what browsers use for canvas exports.
pub const DEFAULT_QUALITY: f32 = 0.92;

/// Largest surface allocated unless configured otherwise.
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 50_000_000;

/// Encoding of the exported composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Where one decal lands on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EyePlacement {
    /// Index of the face in detection order.
    pub face: usize,
    pub side: DecalSide,
    pub rect: Rect,
}

/// The flattened, encoded output of one compositing pass.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub style_id: String,
    pub placements: Vec<EyePlacement>,
}

impl CompositeResult {
    pub fn num_faces(&self) -> usize {
        self.placements.len() / 2
    }
}

/// Computes eye placements and draws decal pairs over a source image.
#[derive(Debug, Clone)]
pub struct Compositor {
    padding: f32,
    format: OutputFormat,
    quality: f32,
    max_surface_pixels: u64,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            format: OutputFormat::default(),
            quality: DEFAULT_QUALITY,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
        }
    }
}

impl Compositor {
    /// Create a compositor with padding factor `k` (finite, at least 1.0).
    pub fn new(padding: f32) -> Result<Self> {
        Ok(Self {
            padding: validate_padding(padding)?,
            ..Self::default()
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            padding: config.padding,
            format: config.output.format,
            quality: config.output.quality,
            max_surface_pixels: config.max_surface_pixels,
        })
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Encoder quality from 0.0 to 1.0; only JPEG uses it.
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn max_surface_pixels(mut self, pixels: u64) -> Self {
        self.max_surface_pixels = pixels;
        self
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Left then right placement for every face, in detection order.
    pub fn placements(&self, faces: &[FaceLandmarks]) -> Vec<EyePlacement> {
        faces
            .iter()
            .enumerate()
            .flat_map(|(face, landmarks)| {
                [
                    EyePlacement {
                        face,
                        side: DecalSide::Left,
                        rect: eye_rect(&landmarks.left_eye, self.padding),
                    },
                    EyePlacement {
                        face,
                        side: DecalSide::Right,
                        rect: eye_rect(&landmarks.right_eye, self.padding),
                    },
                ]
            })
            .collect()
    }

    fn acquire_surface(&self, width: u32, height: u32) -> Result<RgbaImage> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels == 0 || pixels > self.max_surface_pixels {
            return Err(Error::SurfaceUnavailable { width, height });
        }
        Ok(RgbaImage::new(width, height))
    }

    /// Draw the source and every decal onto a new surface.
    ///
    /// Fails without drawing if there are no faces, a decal is empty, or the
    /// surface cannot be allocated.
    pub fn draw(
        &self,
        source: &DynamicImage,
        faces: &[FaceLandmarks],
        decals: &DecalPair,
    ) -> Result<(RgbaImage, Vec<EyePlacement>)> {
        if faces.is_empty() {
            return Err(Error::DetectionEmpty);
        }
        for side in [DecalSide::Left, DecalSide::Right] {
            let decal = decals.get(side);
            if decal.width() == 0 || decal.height() == 0 {
                return Err(Error::DecalLoadFailure {
                    side,
                    reference: decals.style_id.clone(),
                    reason: "image has no pixels".into(),
                });
            }
        }

        let mut surface = self.acquire_surface(source.width(), source.height())?;
        imageops::replace(&mut surface, &source.to_rgba8(), 0, 0);

        let placements = self.placements(faces);
        for placement in &placements {
            let drawn = self.stamp(&mut surface, decals.get(placement.side), &placement.rect);
            log::debug!(
                "face {} {} eye at ({:.1}, {:.1}) {:.1}x{:.1}{}",
                placement.face,
                placement.side,
                placement.rect.x,
                placement.rect.y,
                placement.rect.width,
                placement.rect.height,
                if drawn { "" } else { " (nothing visible)" }
            );
        }

        Ok((surface, placements))
    }

    /// Stretch `decal` into `rect` and blend it over the surface.
    ///
    /// Returns false when nothing visible is drawn: zero-size rectangles,
    /// rectangles entirely off the surface, or rectangles larger than the
    /// surface limit.
    fn stamp(&self, surface: &mut RgbaImage, decal: &RgbaImage, rect: &Rect) -> bool {
        let Some((left, top, width, height)) = rect.to_pixels() else {
            return false;
        };
        let off_surface = left >= i64::from(surface.width())
            || top >= i64::from(surface.height())
            || left + i64::from(width) <= 0
            || top + i64::from(height) <= 0;
        if off_surface {
            return false;
        }
        if u64::from(width) * u64::from(height) > self.max_surface_pixels {
            log::warn!("skipping {}x{} decal larger than the surface limit", width, height);
            return false;
        }

        let stretched = imageops::resize(decal, width, height, FilterType::Triangle);
        imageops::overlay(surface, &stretched, left, top);
        true
    }

    /// Encode a drawn surface with the configured format.
    pub fn encode(&self, surface: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let (width, height) = surface.dimensions();

        match self.format {
            OutputFormat::Jpeg => {
                let rgb = flatten_on_black(surface);
                let quality = (self.quality * 100.0).round().clamp(1.0, 100.0) as u8;
                JpegEncoder::new_with_quality(&mut buffer, quality)
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| Error::Encode(e.to_string()))?;
            }
            OutputFormat::Png => {
                PngEncoder::new(&mut buffer)
                    .write_image(surface.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(|e| Error::Encode(e.to_string()))?;
            }
        }

        Ok(buffer)
    }

    /// Draw and encode in one step.
    pub fn composite(
        &self,
        source: &DynamicImage,
        faces: &[FaceLandmarks],
        decals: &DecalPair,
    ) -> Result<CompositeResult> {
        let (surface, placements) = self.draw(source, faces, decals)?;
        let data = self.encode(&surface)?;
        log::info!(
            "composited {} face(s) with style {:?} into {} bytes of {}",
            faces.len(),
            decals.style_id,
            data.len(),
            self.format.mime_type()
        );

        Ok(CompositeResult {
            data,
            format: self.format,
            width: surface.width(),
            height: surface.height(),
            style_id: decals.style_id.clone(),
            placements,
        })
    }
}

/// Drop alpha for opaque encodings by compositing onto black.
fn flatten_on_black(surface: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(surface.width(), surface.height(), |x, y| {
        let [r, g, b, a] = surface.get_pixel(x, y).0;
        let scale = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EyeContour;
    use crate::types::Point;
    use image::{Rgba, RgbImage};

    const GREEN: Rgba<u8> = Rgba([0, 200, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, GREEN))
    }

    fn decals() -> DecalPair {
        DecalPair::new(
            "test",
            RgbaImage::from_pixel(4, 4, RED),
            RgbaImage::from_pixel(4, 4, BLUE),
        )
    }

    fn square(x: f32, y: f32, size: f32) -> EyeContour {
        EyeContour::new(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
        .unwrap()
    }

    fn face(left: (f32, f32), right: (f32, f32)) -> FaceLandmarks {
        FaceLandmarks::new(square(left.0, left.1, 10.0), square(right.0, right.1, 10.0))
    }

    #[test]
    fn zero_faces_is_detection_empty() {
        let result = Compositor::default().draw(&source(50, 50), &[], &decals());
        assert!(matches!(result, Err(Error::DetectionEmpty)));
    }

    #[test]
    fn decals_cover_padded_eye_rects() {
        let compositor = Compositor::new(1.5).unwrap();
        let faces = [face((10.0, 10.0), (40.0, 10.0))];
        let (surface, placements) = compositor.draw(&source(80, 40), &faces, &decals()).unwrap();

        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].rect, Rect::new(7.5, 7.5, 15.0, 15.0));
        assert_eq!(placements[1].rect, Rect::new(37.5, 7.5, 15.0, 15.0));

        assert_eq!(surface.get_pixel(15, 15), &RED);
        assert_eq!(surface.get_pixel(45, 15), &BLUE);
        assert_eq!(surface.get_pixel(30, 15), &GREEN);
        assert_eq!(surface.get_pixel(5, 35), &GREEN);
    }

    #[test]
    fn two_faces_get_four_independent_draws() {
        let compositor = Compositor::new(1.0).unwrap();
        let faces = [face((5.0, 5.0), (25.0, 5.0)), face((5.0, 45.0), (25.0, 45.0))];
        let (surface, placements) = compositor.draw(&source(60, 80), &faces, &decals()).unwrap();

        let summary: Vec<_> = placements.iter().map(|p| (p.face, p.side)).collect();
        assert_eq!(
            summary,
            [
                (0, DecalSide::Left),
                (0, DecalSide::Right),
                (1, DecalSide::Left),
                (1, DecalSide::Right),
            ]
        );

        for (x, y, expected) in [(10, 10, RED), (30, 10, BLUE), (10, 50, RED), (30, 50, BLUE)] {
            assert_eq!(surface.get_pixel(x, y), &expected, "pixel ({}, {})", x, y);
        }
        // Between the two faces nothing was stamped.
        assert_eq!(surface.get_pixel(10, 30), &GREEN);
        assert_eq!(surface.get_pixel(50, 10), &GREEN);
    }

    #[test]
    fn degenerate_contour_draws_nothing_and_succeeds() {
        let point = EyeContour::new(vec![Point::new(20.0, 20.0); 6]).unwrap();
        let faces = [FaceLandmarks::new(point.clone(), point)];
        let (surface, placements) = Compositor::default()
            .draw(&source(40, 40), &faces, &decals())
            .unwrap();

        assert!(placements.iter().all(|p| p.rect.is_empty()));
        assert!(surface.pixels().all(|p| *p == GREEN));
    }

    #[test]
    fn partially_offscreen_decal_is_clipped() {
        let faces = [face((-5.0, -5.0), (200.0, 200.0))];
        let (surface, _) = Compositor::new(1.0)
            .unwrap()
            .draw(&source(30, 30), &faces, &decals())
            .unwrap();
        assert_eq!(surface.get_pixel(0, 0), &RED);
        assert_eq!(surface.get_pixel(10, 10), &GREEN);
    }

    #[test]
    fn contour_spanning_beyond_pixel_range_draws_nothing() {
        let eye = EyeContour::new(vec![Point::new(-1e20, 5.0), Point::new(1e20, 15.0)]).unwrap();
        let faces = [FaceLandmarks::new(eye.clone(), eye)];
        let (surface, placements) = Compositor::new(1.0)
            .unwrap()
            .draw(&source(20, 20), &faces, &decals())
            .unwrap();

        assert_eq!(placements.len(), 2);
        assert!(surface.pixels().all(|p| *p == GREEN));
    }

    #[test]
    fn jpeg_flattens_translucent_pixels_onto_black() {
        let mut surface = RgbaImage::from_pixel(2, 1, Rgba([200, 100, 50, 255]));
        surface.put_pixel(1, 0, Rgba([200, 100, 50, 0]));
        let flat = flatten_on_black(&surface);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));

        let half = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        assert_eq!(flatten_on_black(&half).get_pixel(0, 0), &Rgb([100, 50, 25]));
    }

    #[test]
    fn oversized_source_is_surface_unavailable() {
        let faces = [face((1.0, 1.0), (5.0, 1.0))];
        let result = Compositor::default()
            .max_surface_pixels(100)
            .draw(&source(20, 20), &faces, &decals());
        assert!(matches!(
            result,
            Err(Error::SurfaceUnavailable { width: 20, height: 20 })
        ));
    }

    #[test]
    fn empty_decal_fails_before_drawing() {
        let faces = [face((1.0, 1.0), (5.0, 1.0))];
        let pair = DecalPair::new("broken", RgbaImage::new(0, 0), RgbaImage::from_pixel(2, 2, BLUE));
        let result = Compositor::default().draw(&source(20, 20), &faces, &pair);
        assert!(matches!(
            result,
            Err(Error::DecalLoadFailure { side: DecalSide::Left, .. })
        ));
    }

    #[test]
    fn source_fully_overwrites_surface() {
        let faces = [face((0.0, 0.0), (2.0, 0.0))];
        let translucent = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([9, 9, 9, 0])));
        let (surface, _) = Compositor::new(1.0)
            .unwrap()
            .draw(&translucent, &faces, &decals())
            .unwrap();
        assert_eq!(surface.get_pixel(19, 19), &Rgba([9, 9, 9, 0]));
    }

    #[test]
    fn rgb_source_is_drawn_opaque() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, image::Rgb([1, 2, 3])));
        let faces = [face((0.0, 0.0), (0.0, 0.0))];
        let (surface, _) = Compositor::new(1.0).unwrap().draw(&rgb, &faces, &decals()).unwrap();
        assert_eq!(surface.get_pixel(15, 15), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn jpeg_and_png_encodings() {
        let faces = [face((10.0, 10.0), (40.0, 10.0))];

        let jpeg = Compositor::default()
            .composite(&source(80, 40), &faces, &decals())
            .unwrap();
        assert_eq!(&jpeg.data[..2], &[0xFF, 0xD8]);
        assert_eq!((jpeg.width, jpeg.height), (80, 40));
        assert_eq!(jpeg.num_faces(), 1);

        let png = Compositor::default()
            .format(OutputFormat::Png)
            .composite(&source(80, 40), &faces, &decals())
            .unwrap();
        assert_eq!(&png.data[1..4], b"PNG");
        assert_eq!(png.style_id, "test");
    }

    #[test]
    fn compositing_is_deterministic() {
        let faces = [face((10.0, 10.0), (40.0, 10.0)), face((12.0, 22.0), (44.0, 21.0))];
        let compositor = Compositor::new(1.6).unwrap();
        let first = compositor.composite(&source(80, 40), &faces, &decals()).unwrap();
        let second = compositor.composite(&source(80, 40), &faces, &decals()).unwrap();
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn invalid_padding_is_rejected() {
        assert!(matches!(Compositor::new(0.5), Err(Error::InvalidPadding(_))));
    }

    #[test]
    fn output_format_naming() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(serde_json::to_string(&OutputFormat::Png).unwrap(), "\"png\"");
    }
}
