//! Sequencing of overlapping requests.
//!
//! A user may pick another style while the previous composite is still being
//! produced. Every submission takes the next sequence number; only the most
//! recently issued request may publish its result, whatever order the
//! requests finish in.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::compositor::CompositeResult;
use crate::error::Result;
use crate::pipeline::EyeSwapper;

/// The result currently on display.
#[derive(Debug, Clone)]
pub struct Displayed {
    pub sequence: u64,
    pub result: Arc<CompositeResult>,
}

/// What happened to a submitted request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The result became the displayed one.
    Published(Arc<CompositeResult>),
    /// A newer request was issued first; this result (or error) was dropped.
    Superseded { sequence: u64, latest: u64 },
}

/// Shared handle; clones refer to the same sequence and display slot.
#[derive(Debug, Clone)]
pub struct SwapSession {
    swapper: Arc<EyeSwapper>,
    issued: Arc<AtomicU64>,
    displayed: Arc<Mutex<Option<Displayed>>>,
}

impl SwapSession {
    pub fn new(swapper: EyeSwapper) -> Self {
        Self {
            swapper: Arc::new(swapper),
            issued: Arc::new(AtomicU64::new(0)),
            displayed: Arc::new(Mutex::new(None)),
        }
    }

    pub fn swapper(&self) -> &EyeSwapper {
        &self.swapper
    }

    /// Start a request. The sequence number is taken immediately, before the
    /// returned future is first polled.
    pub fn submit(
        &self,
        source: Vec<u8>,
        style_id: impl Into<String>,
    ) -> impl Future<Output = Result<Outcome>> + Send + 'static {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let session = self.clone();
        let style_id = style_id.into();
        log::debug!("request {} submitted with style {:?}", sequence, style_id);
        async move { session.run(sequence, source, style_id).await }
    }

    async fn run(self, sequence: u64, source: Vec<u8>, style_id: String) -> Result<Outcome> {
        let result = self.swapper.swap(source, &style_id).await;

        let latest = self.issued.load(Ordering::SeqCst);
        if sequence != latest {
            log::warn!(
                "discarding result of request {}; request {} is newer",
                sequence,
                latest
            );
            return Ok(Outcome::Superseded { sequence, latest });
        }

        let result = Arc::new(result?);
        let mut displayed = self.displayed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = displayed.as_ref() {
            if current.sequence > sequence {
                return Ok(Outcome::Superseded {
                    sequence,
                    latest: current.sequence,
                });
            }
        }
        *displayed = Some(Displayed {
            sequence,
            result: Arc::clone(&result),
        });
        Ok(Outcome::Published(result))
    }

    pub fn current(&self) -> Option<Displayed> {
        self.displayed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequence number of the most recently submitted request (0 if none).
    pub fn latest_sequence(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}
