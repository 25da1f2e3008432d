//! Configuration loaded from YAML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::DecalCatalog;
use crate::compositor::{OutputFormat, DEFAULT_MAX_SURFACE_PIXELS, DEFAULT_QUALITY};
use crate::error::{Error, Result};
use crate::geometry::{validate_padding, DEFAULT_PADDING};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Eye box growth factor (dimensionless, >= 1.0)
    pub padding: f32,

    /// Largest source image, in pixels, a drawing surface is allocated for
    pub max_surface_pixels: u64,

    /// Export encoding
    pub output: OutputConfig,

    /// Decal assets
    pub assets: AssetConfig,

    /// Built-in face detector
    pub detector: DetectorConfig,
}

/// Export encoding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Encoder quality (0.0-1.0), JPEG only
    pub quality: f32,
}

/// Where decal images and catalogs live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory relative decal references resolve against
    pub root: PathBuf,

    /// JSON catalog replacing the built-in styles
    pub catalog: Option<PathBuf>,
}

/// SeetaFace detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Candidate model files, tried in order until one loads
    pub model_paths: Vec<PathBuf>,

    /// Smallest face side, in pixels, the detector reports
    pub min_face_size: u32,

    /// Minimum detection score
    pub score_threshold: f64,

    /// Image pyramid downscale per level (0.01-0.99)
    pub pyramid_scale_factor: f32,

    /// Sliding window step in pixels
    pub slide_window_step: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            output: OutputConfig::default(),
            assets: AssetConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            catalog: None,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_paths: vec![
                PathBuf::from("models/seeta_fd_frontal_v1.0.bin"),
                PathBuf::from("/usr/share/eye-swap/seeta_fd_frontal_v1.0.bin"),
            ],
            min_face_size: 20,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

impl DetectorConfig {
    /// Reject values the SeetaFace engine refuses.
    pub fn validate(&self) -> Result<()> {
        if self.min_face_size < 20 {
            return Err(Error::Config(
                "Detector min_face_size must be at least 20".to_string(),
            ));
        }
        if !(self.score_threshold >= 0.0) {
            return Err(Error::Config(
                "Detector score_threshold must be non-negative".to_string(),
            ));
        }
        if !(0.01..=0.99).contains(&self.pyramid_scale_factor) {
            return Err(Error::Config(
                "Pyramid scale factor must be between 0.01 and 0.99".to_string(),
            ));
        }
        if self.slide_window_step == 0 {
            return Err(Error::Config(
                "Slide window step must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_padding(self.padding)?;

        if self.max_surface_pixels == 0 {
            return Err(Error::Config(
                "max_surface_pixels must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.output.quality) {
            return Err(Error::Config(
                "Output quality must be between 0.0 and 1.0".to_string(),
            ));
        }

        self.detector.validate()
    }

    /// The configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<DecalCatalog> {
        match &self.assets.catalog {
            Some(path) => DecalCatalog::from_file(path),
            None => Ok(DecalCatalog::builtin()),
        }
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# eye-swap configuration

# Eye box growth factor
padding: 1.7
max_surface_pixels: 50000000

output:
  format: jpeg
  quality: 0.92

assets:
  root: "assets"
  # catalog: "assets/catalog.json"

detector:
  model_paths:
    - "models/seeta_fd_frontal_v1.0.bin"
    - "/usr/share/eye-swap/seeta_fd_frontal_v1.0.bin"
  min_face_size: 20
  score_threshold: 2.0
  pyramid_scale_factor: 0.8
  slide_window_step: 4
"#;
