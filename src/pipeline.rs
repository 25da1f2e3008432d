//! One eye-swap request, from encoded bytes to encoded composite.
//!
//! ```text
//! Idle -> DetectingFaces -> NoFacesFound
//!                        -> FacesFound -> LoadingDecals -> LoadFailure
//!                                                       -> Drawing -> Composited
//! ```
//!
//! Decal loading starts together with detection; the state only moves to
//! `LoadingDecals` once faces are known, because drawing needs both.
//! A source that fails to decode or an unknown style ends in `LoadFailure`
//! straight from `Idle`. Surface, encoding and task failures end in
//! `Abandoned`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::catalog::DecalCatalog;
use crate::compositor::{CompositeResult, Compositor};
use crate::config::Config;
use crate::decal;
use crate::detector::DetectorHandle;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    DetectingFaces,
    NoFacesFound,
    FacesFound,
    LoadingDecals,
    LoadFailure,
    Drawing,
    Composited,
    Abandoned,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::NoFacesFound
                | RequestState::LoadFailure
                | RequestState::Composited
                | RequestState::Abandoned
        )
    }

    fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, DetectingFaces | LoadFailure | Abandoned)
                | (DetectingFaces, NoFacesFound | FacesFound | Abandoned)
                | (FacesFound, LoadingDecals)
                | (LoadingDecals, LoadFailure | Drawing | Abandoned)
                | (Drawing, Composited | Abandoned)
        )
    }
}

/// States a request passed through, starting at `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTrace {
    states: Vec<RequestState>,
}

impl Default for RequestTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTrace {
    pub fn new() -> Self {
        Self {
            states: vec![RequestState::Idle],
        }
    }

    pub fn current(&self) -> RequestState {
        self.states[self.states.len() - 1]
    }

    pub fn history(&self) -> &[RequestState] {
        &self.states
    }

    fn advance(&mut self, next: RequestState) {
        let current = self.current();
        debug_assert!(
            current.can_advance_to(next),
            "invalid request transition {:?} -> {:?}",
            current,
            next
        );
        log::debug!("request {:?} -> {:?}", current, next);
        self.states.push(next);
    }

    /// Move to a terminal failure state and hand back the error.
    fn fail(&mut self, state: RequestState, err: Error) -> Error {
        self.advance(state);
        err
    }
}

/// Decode the user-supplied image.
pub fn decode_source(bytes: &[u8]) -> Result<DynamicImage> {
    let image =
        image::load_from_memory(bytes).map_err(|e| Error::SourceLoadFailure(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::SourceLoadFailure("image has no pixels".into()));
    }
    Ok(image)
}

/// Runs eye-swap requests against one detector, catalog and compositor.
///
/// Holds no per-request state; every call owns its inputs and surface, so
/// calls may run concurrently. Retrying is simply calling again.
#[derive(Debug, Clone)]
pub struct EyeSwapper {
    detector: DetectorHandle,
    catalog: Arc<DecalCatalog>,
    asset_root: PathBuf,
    compositor: Arc<Compositor>,
}

impl EyeSwapper {
    pub fn new(
        detector: DetectorHandle,
        catalog: DecalCatalog,
        asset_root: impl Into<PathBuf>,
        compositor: Compositor,
    ) -> Self {
        Self {
            detector,
            catalog: Arc::new(catalog),
            asset_root: asset_root.into(),
            compositor: Arc::new(compositor),
        }
    }

    pub fn from_config(detector: DetectorHandle, config: &Config) -> Result<Self> {
        Ok(Self::new(
            detector,
            config.load_catalog()?,
            config.assets.root.clone(),
            Compositor::from_config(config)?,
        ))
    }

    pub fn catalog(&self) -> &DecalCatalog {
        &self.catalog
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub async fn swap(&self, source: Vec<u8>, style_id: &str) -> Result<CompositeResult> {
        let mut trace = RequestTrace::new();
        self.swap_traced(source, style_id, &mut trace).await
    }

    /// Same as [`EyeSwapper::swap`], recording every state transition.
    pub async fn swap_traced(
        &self,
        source: Vec<u8>,
        style_id: &str,
        trace: &mut RequestTrace,
    ) -> Result<CompositeResult> {
        let style = match self.catalog.get(style_id) {
            Ok(style) => style.clone(),
            Err(e) => return Err(trace.fail(RequestState::LoadFailure, e)),
        };

        let decoded = tokio::task::spawn_blocking(move || decode_source(&source)).await;
        let source = match decoded.map_err(Error::from).and_then(|r| r) {
            Ok(image) => Arc::new(image),
            Err(e) => return Err(trace.fail(RequestState::LoadFailure, e)),
        };

        trace.advance(RequestState::DetectingFaces);
        let provider = self.detector.shared();
        let detect_source = Arc::clone(&source);
        let (faces, decals) = tokio::join!(
            tokio::task::spawn_blocking(move || provider.detect(&detect_source)),
            decal::load_pair(&style, &self.asset_root),
        );

        let faces = match faces {
            Ok(faces) => faces,
            Err(e) => return Err(trace.fail(RequestState::Abandoned, e.into())),
        };
        if faces.is_empty() {
            log::info!("no face found with detector {}", self.detector.name());
            return Err(trace.fail(RequestState::NoFacesFound, Error::DetectionEmpty));
        }
        trace.advance(RequestState::FacesFound);
        log::debug!("detector {} found {} face(s)", self.detector.name(), faces.len());

        trace.advance(RequestState::LoadingDecals);
        let decals = match decals {
            Ok(decals) => decals,
            Err(e) => return Err(trace.fail(RequestState::LoadFailure, e)),
        };

        trace.advance(RequestState::Drawing);
        let compositor = Arc::clone(&self.compositor);
        let drawn =
            tokio::task::spawn_blocking(move || compositor.composite(&source, &faces, &decals))
                .await;
        match drawn.map_err(Error::from).and_then(|r| r) {
            Ok(result) => {
                trace.advance(RequestState::Composited);
                Ok(result)
            }
            Err(e) => Err(trace.fail(RequestState::Abandoned, e)),
        }
    }
}
