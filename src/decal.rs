//! Decal image loading.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::Serialize;

use crate::catalog::{resolve_reference, DecalStyle};
use crate::error::{Error, Result};

/// Which eye a decal belongs to, as seen in the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecalSide {
    Left,
    Right,
}

impl fmt::Display for DecalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecalSide::Left => f.write_str("left"),
            DecalSide::Right => f.write_str("right"),
        }
    }
}

/// Both decals of a style, decoded and ready to draw.
#[derive(Debug, Clone)]
pub struct DecalPair {
    pub style_id: String,
    pub left: RgbaImage,
    pub right: RgbaImage,
}

impl DecalPair {
    pub fn new(style_id: impl Into<String>, left: RgbaImage, right: RgbaImage) -> Self {
        Self {
            style_id: style_id.into(),
            left,
            right,
        }
    }

    pub fn get(&self, side: DecalSide) -> &RgbaImage {
        match side {
            DecalSide::Left => &self.left,
            DecalSide::Right => &self.right,
        }
    }
}

/// Decode in-memory decal bytes. Empty (0x0) images count as failures.
pub fn decode_decal(side: DecalSide, reference: &str, bytes: &[u8]) -> Result<RgbaImage> {
    let failure = |reason: String| Error::DecalLoadFailure {
        side,
        reference: reference.to_string(),
        reason,
    };

    let image = image::load_from_memory(bytes).map_err(|e| failure(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(failure("image has no pixels".into()));
    }
    Ok(image.to_rgba8())
}

/// Read and decode one decal. File reads go through `tokio::fs`; decoding
/// runs on the blocking pool.
pub async fn load_decal(side: DecalSide, path: PathBuf) -> Result<RgbaImage> {
    let reference = path.display().to_string();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::DecalLoadFailure {
            side,
            reference: reference.clone(),
            reason: e.to_string(),
        })?;

    tokio::task::spawn_blocking(move || decode_decal(side, &reference, &bytes)).await?
}

/// Load both decals of `style` concurrently.
///
/// Both loads always run to completion; if both fail, the left failure is
/// reported.
pub async fn load_pair(style: &DecalStyle, asset_root: &Path) -> Result<DecalPair> {
    let (left, right) = tokio::join!(
        load_decal(DecalSide::Left, resolve_reference(asset_root, &style.left_image)),
        load_decal(DecalSide::Right, resolve_reference(asset_root, &style.right_image)),
    );
    Ok(DecalPair::new(style.id.clone(), left?, right?))
}
