//! Background session execution.
//!
//! Runs an analysis session on its own thread so a host application stays
//! responsive during a long book. The handle supports cooperative
//! cancellation and joins the thread on `Drop`, so an abandoned handle
//! never leaks a running session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::engine::ExtractionEngine;
use super::error::AnalysisError;
use super::orchestrator::AnalysisSession;
use super::types::{AnalysisConfig, BatchStatusEvent, SessionOutcome};

/// Handle for a session running on a background thread.
pub struct SessionHandle {
    session_id: String,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<SessionOutcome, AnalysisError>>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request cancellation. The in-flight batch (if any) completes and its
    /// result is kept; no further batch starts.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the session to finish and return its outcome.
    pub fn join(mut self) -> Result<SessionOutcome, AnalysisError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(AnalysisError::Engine("session thread panicked".to_string()))),
            None => Err(AnalysisError::Engine("session already joined".to_string())),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start an analysis session on a background thread.
///
/// `progress` is invoked from that thread; keep it cheap or hand the event
/// off to a channel.
pub fn spawn_session(
    config: AnalysisConfig,
    pages: Vec<String>,
    engine: Arc<dyn ExtractionEngine>,
    progress: Option<Box<dyn Fn(BatchStatusEvent) + Send>>,
) -> SessionHandle {
    let mut session = AnalysisSession::new(config);
    let session_id = session.session_id().to_string();
    let cancel = session.cancel_handle();

    tracing::debug!(session_id = %session_id, "Spawning background analysis session");

    let handle = std::thread::spawn(move || {
        let progress_ref = progress
            .as_ref()
            .map(|f| f.as_ref() as &dyn Fn(BatchStatusEvent));
        session.run(&pages, engine.as_ref(), progress_ref)
    });

    SessionHandle {
        session_id,
        cancel,
        handle: Some(handle),
    }
}
