use thiserror::Error;

use crate::decal::DecalSide;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no face detected in the source image")]
    DetectionEmpty,

    #[error("failed to decode source image: {0}")]
    SourceLoadFailure(String),

    #[error("failed to load {side} eye decal {reference:?}: {reason}")]
    DecalLoadFailure {
        side: DecalSide,
        reference: String,
        reason: String,
    },

    #[error("cannot acquire a {width}x{height} drawing surface")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("failed to encode composite: {0}")]
    Encode(String),

    #[error("eye contour must contain at least one point")]
    EmptyContour,

    #[error("padding factor must be finite and >= 1.0, got {0}")]
    InvalidPadding(f32),

    #[error("unknown decal style: {0}")]
    UnknownStyle(String),

    #[error("invalid landmark data: {0}")]
    Landmarks(String),

    #[error("invalid decal catalog: {0}")]
    Catalog(String),

    #[error("failed to load face detector model: {0}")]
    ModelLoad(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
