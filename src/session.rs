//! Upload session and the state it publishes
//!
//! ```text
//! Idle ──submit──▶ Validating ──ok──▶ InFlight{p} ──reply ok──▶ Succeeded{result}
//!   ▲                  │                   │
//!   └──── rejected ────┘                   └──error──▶ Failed{reason}
//! ```
//!
//! [`SessionStore`] is constructed once and passed by reference: it owns the
//! current [`UploadState`], the staged file and the published
//! [`AnalysisResult`]. Only [`UploadSession::submit`] writes state and result.
//!
//! While a submission is in flight the calling thread owns the
//! [`ProgressController`] and drains one channel of [`SessionEvent`]s. The
//! synthetic ticker and the transport worker only send events into it, so the
//! displayed progress is only ever written from one place.

use crate::config::ClientConfig;
use crate::error::{LotviewError, Result, TransportError};
use crate::progress::ProgressController;
use crate::transport::{parse_reply, HttpReply, Transport};
use crate::validate::{validate, CandidateFile};
use crate::value::ReportValue;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Outcome of one successful upload. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub report: ReportValue,
    /// Locator of the processed video, relative to the backend base.
    pub media_ref: String,
}

impl AnalysisResult {
    pub fn new(report: ReportValue, media_ref: impl Into<String>) -> Self {
        Self {
            report,
            media_ref: media_ref.into(),
        }
    }

    /// A result the report view can show: some report and a media locator.
    pub fn is_viewable(&self) -> bool {
        !self.report.is_null() && !self.media_ref.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Validating,
    InFlight { displayed_progress: u8 },
    Succeeded { result: Arc<AnalysisResult> },
    Failed { reason: String },
}

impl UploadState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadState::InFlight { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Validating => "validating",
            UploadState::InFlight { .. } => "in-flight",
            UploadState::Succeeded { .. } => "succeeded",
            UploadState::Failed { .. } => "failed",
        }
    }
}

/// Process-wide upload state, owned explicitly.
#[derive(Debug)]
pub struct SessionStore {
    state: UploadState,
    staged: Option<CandidateFile>,
    result: Option<Arc<AnalysisResult>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            state: UploadState::Idle,
            staged: None,
            result: None,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn staged(&self) -> Option<&CandidateFile> {
        self.staged.as_ref()
    }

    pub fn result(&self) -> Option<&Arc<AnalysisResult>> {
        self.result.as_ref()
    }

    /// The published result, or `NoResult` when there is nothing to view.
    pub fn require_result(&self) -> Result<Arc<AnalysisResult>> {
        self.result
            .as_ref()
            .filter(|r| r.is_viewable())
            .cloned()
            .ok_or(LotviewError::NoResult)
    }

    /// Stage a file. A new selection wholesale replaces the previous one and
    /// returns a finished session to `Idle`.
    pub fn select(&mut self, file: CandidateFile) -> Result<()> {
        if self.state.is_in_flight() {
            return Err(LotviewError::SessionBusy);
        }
        debug!(file = %file.display_name, "file staged");
        self.staged = Some(file);
        self.state = UploadState::Idle;
        Ok(())
    }

    pub fn select_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = CandidateFile::from_path(path)?;
        self.select(file)
    }

    pub fn clear_selection(&mut self) {
        if !self.state.is_in_flight() {
            self.staged = None;
            self.state = UploadState::Idle;
        }
    }

    /// Install a result read back from a saved report.
    pub fn load_result(&mut self, result: AnalysisResult) -> Result<Arc<AnalysisResult>> {
        if self.state.is_in_flight() {
            return Err(LotviewError::SessionBusy);
        }
        let result = Arc::new(result);
        self.result = Some(Arc::clone(&result));
        self.state = UploadState::Succeeded {
            result: Arc::clone(&result),
        };
        Ok(result)
    }

    /// Gate a submission and move to `InFlight`. Returns the file to send.
    fn begin(&mut self) -> Result<CandidateFile> {
        if self.state.is_in_flight() {
            return Err(LotviewError::SessionBusy);
        }
        let file = self.staged.clone().ok_or(LotviewError::NoFileSelected)?;

        self.state = UploadState::Validating;
        if let Err(rejection) = validate(&file) {
            info!(file = %file.display_name, reason = ?rejection, "upload rejected");
            self.state = UploadState::Idle;
            return Err(rejection.into());
        }

        // Starting a new upload retires the previous result
        self.result = None;
        self.state = UploadState::InFlight { displayed_progress: 0 };
        Ok(file)
    }

    fn set_progress(&mut self, displayed_progress: u8) {
        if self.state.is_in_flight() {
            self.state = UploadState::InFlight { displayed_progress };
        }
    }

    fn publish(&mut self, result: AnalysisResult) -> Arc<AnalysisResult> {
        let result = Arc::new(result);
        self.result = Some(Arc::clone(&result));
        self.staged = None;
        result
    }

    fn finish(&mut self, state: UploadState) {
        self.state = state;
    }
}

/// Messages drained by the thread that owns the progress controller.
#[derive(Debug)]
pub enum SessionEvent {
    Tick,
    TransportProgress(f64),
    TransportFinished(std::result::Result<HttpReply, TransportError>),
}

/// Where a displayed-progress change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressSource {
    Start,
    Tick,
    Transport,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub source: ProgressSource,
}

/// Drives one submission at a time against a [`Transport`].
pub struct UploadSession {
    config: ClientConfig,
    seed: Option<u64>,
}

impl UploadSession {
    pub fn new(config: ClientConfig) -> Self {
        Self { config, seed: None }
    }

    /// Seed the synthetic ticker's random steps.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validate the staged file, send it, and publish the result.
    ///
    /// `observer` sees every displayed-progress value, in order, on the
    /// calling thread. On success the result is published before the
    /// finalize delay starts and the state turns `Succeeded` after it.
    pub fn submit<T, F>(
        &self,
        store: &mut SessionStore,
        transport: &T,
        mut observer: F,
    ) -> Result<Arc<AnalysisResult>>
    where
        T: Transport + ?Sized,
        F: FnMut(ProgressUpdate),
    {
        let file = store.begin()?;
        info!(file = %file.describe(), "upload started");

        let mut controller = ProgressController::new(&self.config);
        if let Some(seed) = self.seed {
            controller = controller.with_rng(StdRng::seed_from_u64(seed));
        }

        let (tx, rx) = mpsc::channel::<SessionEvent>();
        let tick_tx = tx.clone();
        controller.start(move || tick_tx.send(SessionEvent::Tick).is_ok());
        observer(ProgressUpdate {
            percent: controller.displayed(),
            source: ProgressSource::Start,
        });

        let reply = thread::scope(|scope| {
            let worker_tx = tx;
            let file = &file;
            scope.spawn(move || {
                let progress_tx = worker_tx.clone();
                let sink = Box::new(move |ratio: f64| {
                    let _ = progress_tx.send(SessionEvent::TransportProgress(ratio));
                });
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| transport.send(file, sink)))
                    .unwrap_or_else(|_| {
                        Err(TransportError::Network {
                            message: Some("upload worker crashed".to_string()),
                        })
                    });
                let _ = worker_tx.send(SessionEvent::TransportFinished(outcome));
            });

            loop {
                let (percent, source) = match rx.recv() {
                    Ok(SessionEvent::Tick) => (controller.advance(), ProgressSource::Tick),
                    Ok(SessionEvent::TransportProgress(ratio)) => {
                        let percent = controller.on_transport_progress(ratio);
                        debug!(ratio, percent, "transport progress");
                        (percent, ProgressSource::Transport)
                    }
                    Ok(SessionEvent::TransportFinished(outcome)) => break outcome,
                    Err(_) => {
                        break Err(TransportError::Network { message: None });
                    }
                };
                store.set_progress(percent);
                observer(ProgressUpdate { percent, source });
            }
        });

        let outcome = reply.and_then(|reply| parse_reply(&reply));
        match outcome {
            Ok(result) => {
                let percent = controller.complete();
                store.set_progress(percent);
                observer(ProgressUpdate {
                    percent,
                    source: ProgressSource::Complete,
                });

                let result = store.publish(result);
                info!(media_ref = %result.media_ref, "analysis result published");

                if !self.config.finalize_delay.is_zero() {
                    thread::sleep(self.config.finalize_delay);
                }
                store.finish(UploadState::Succeeded {
                    result: Arc::clone(&result),
                });
                Ok(result)
            }
            Err(err) => {
                controller.fail();
                let reason = err.reason();
                warn!(%reason, error = ?err, "upload failed");
                store.finish(UploadState::Failed { reason });
                Err(err.into())
            }
        }
    }
}
