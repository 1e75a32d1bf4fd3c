//! Chunked upload coordinator.
//!
//! Runs one upload at a time: split the source, send every chunk strictly
//! in order with a bounded retry, then finalize. The service keys its
//! receive-side state by chunk index, so chunk `i + 1` is never sent before
//! chunk `i` is confirmed. Cancellation is cooperative: the token is
//! checked before each chunk and once more before finalize, and an
//! in-flight chunk call is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use mediashare_protocol::PostId;
use mediashare_protocol::constants::CACHE_KEY_POSTS;
use mediashare_transfer::{
    ChunkRange, ChunkSource, SessionIdSource, TimeRandomIdSource, TransferError, UploadSession,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{ServiceError, UploadError};
use crate::service::{CacheInvalidator, MediaService};
use crate::types::{UploadConfig, UploadEvent, UploadReceipt, UploadState};

/// Progress reported while the finalize call is still pending.
const MAX_PROGRESS_BEFORE_FINALIZE: u8 = 99;

/// Uploads local media to the service in fixed-size chunks.
pub struct UploadCoordinator {
    service: Arc<dyn MediaService>,
    cache: Option<Arc<dyn CacheInvalidator>>,
    ids: Arc<dyn SessionIdSource>,
    config: UploadConfig,
    active: AtomicBool,
    cancel: Mutex<CancellationToken>,
    progress: watch::Sender<u8>,
    state: watch::Sender<UploadState>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<UploadEvent>>>,
}

impl UploadCoordinator {
    /// Creates a coordinator that talks to `service`.
    pub fn new(service: Arc<dyn MediaService>, config: UploadConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (progress, _) = watch::channel(0);
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            service,
            cache: None,
            ids: Arc::new(TimeRandomIdSource::new()),
            config,
            active: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            progress,
            state,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Invalidates the feed cache after each successful upload.
    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the default time-based session id generator.
    pub fn with_id_source(mut self, ids: Arc<dyn SessionIdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Current progress, 0..=100.
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn state(&self) -> UploadState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    /// Returns `true` while an upload call is running.
    pub fn is_uploading(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Requests cancellation of the running upload. Never blocks.
    ///
    /// Takes effect at the next checkpoint; calling it while idle has no
    /// effect on the next upload.
    pub fn cancel(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Uploads `source`, cancellable through [`cancel`](Self::cancel).
    pub async fn upload<S>(&self, source: S) -> Result<UploadReceipt, UploadError>
    where
        S: ChunkSource + Send + 'static,
    {
        self.upload_with_cancel(source, CancellationToken::new())
            .await
    }

    /// Uploads `source`, cancellable through `cancel` or [`cancel`](Self::cancel).
    pub async fn upload_with_cancel<S>(
        &self,
        source: S,
        cancel: CancellationToken,
    ) -> Result<UploadReceipt, UploadError>
    where
        S: ChunkSource + Send + 'static,
    {
        let _guard = ActiveGuard::acquire(&self.active).ok_or(UploadError::AlreadyUploading)?;

        if !self.service.is_available() {
            warn!("media service unavailable, upload not started");
            self.emit(UploadEvent::Failed {
                session_id: None,
                error: UploadError::ServiceUnavailable.to_string(),
            });
            return Err(UploadError::ServiceUnavailable);
        }

        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = cancel.clone();
        self.progress.send_replace(0);

        let session_id = self.ids.next_id();
        let result = self.run(source, session_id, &cancel).await;

        match &result {
            Ok(receipt) => {
                info!(
                    post_id = receipt.post_id,
                    bytes = receipt.total_bytes,
                    chunks = receipt.chunks,
                    "upload completed"
                );
                self.emit(UploadEvent::Completed { session_id });
                self.progress.send_replace(0);
            }
            // Progress is left where the cancellation found it.
            Err(e) if e.is_cancelled() => {
                self.emit(UploadEvent::Cancelled { session_id });
            }
            Err(e) => {
                warn!(session_id, error = %e, "upload failed");
                self.set_state(UploadState::Failed);
                self.emit(UploadEvent::Failed {
                    session_id: Some(session_id),
                    error: e.to_string(),
                });
                self.progress.send_replace(0);
            }
        }

        result
    }

    async fn run<S>(
        &self,
        mut source: S,
        session_id: PostId,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, UploadError>
    where
        S: ChunkSource + Send + 'static,
    {
        self.set_state(UploadState::Splitting);

        let total_size = source.total_len();
        let mut session = UploadSession::new(session_id, total_size, self.config.chunk_size)?;
        let plan = *session.plan();

        debug!(
            session_id,
            total_bytes = total_size,
            chunks = plan.len(),
            "upload session started"
        );

        if plan.is_empty() {
            self.progress.send_replace(100);
        }

        for range in plan.iter() {
            self.set_state(UploadState::Transmitting {
                chunk_index: range.index,
            });

            if cancel.is_cancelled() {
                return Err(self.abort(session_id).await);
            }

            let (returned, data) = tokio::task::spawn_blocking(move || {
                let data = source.read_range(&range);
                (source, data)
            })
            .await
            .map_err(|e| TransferError::Io(std::io::Error::other(e)))?;
            source = returned;
            let data = data?;

            self.send_chunk(&session, &range, &data).await?;
            session.record_chunk(&range)?;

            let percent = session.progress().min(MAX_PROGRESS_BEFORE_FINALIZE);
            self.progress.send_replace(percent);
            self.emit(UploadEvent::Progress {
                session_id,
                chunk_index: range.index,
                percent,
                uploaded_bytes: session.uploaded_bytes(),
                total_bytes: total_size,
            });

            debug!(
                session_id,
                chunk = range.index,
                uploaded = session.uploaded_bytes(),
                total = total_size,
                "chunk confirmed"
            );
        }

        // A cancel requested during the last chunk still wins over finalize.
        if cancel.is_cancelled() {
            return Err(self.abort(session_id).await);
        }

        self.set_state(UploadState::Finalizing);
        match self.service.finalize_upload(session_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(UploadError::FinalizeFailed {
                    session_id,
                    reason: "rejected by service".into(),
                });
            }
            Err(e) => {
                return Err(UploadError::FinalizeFailed {
                    session_id,
                    reason: e.to_string(),
                });
            }
        }

        self.progress.send_replace(100);
        self.set_state(UploadState::Done);

        if let Some(cache) = &self.cache {
            cache.invalidate(CACHE_KEY_POSTS);
        }

        Ok(UploadReceipt {
            post_id: session_id,
            total_bytes: total_size,
            chunks: plan.len(),
        })
    }

    /// Sends one chunk, retrying on a fixed backoff.
    async fn send_chunk(
        &self,
        session: &UploadSession,
        range: &ChunkRange,
        data: &[u8],
    ) -> Result<(), UploadError> {
        let attempts = self.config.retry.attempts();
        let mut attempt = 1;

        loop {
            let error = match self
                .service
                .upload_media_chunk(session.id(), session.total_size(), range.index, data)
                .await
            {
                Ok(true) => return Ok(()),
                Ok(false) => ServiceError::Rejected(format!("chunk {} not accepted", range.index)),
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(UploadError::ServiceUnavailable);
            }

            if attempt >= attempts {
                return Err(UploadError::ChunkUploadFailed {
                    index: range.index,
                    attempts: attempt,
                    source: error,
                });
            }

            warn!(
                session_id = session.id(),
                chunk = range.index,
                attempt,
                error = %error,
                "chunk upload failed, retrying"
            );
            self.emit(UploadEvent::Retrying {
                session_id: session.id(),
                chunk_index: range.index,
                attempt,
                error: error.to_string(),
            });

            tokio::time::sleep(self.config.retry.backoff).await;
            attempt += 1;
        }
    }

    /// Best-effort server-side cleanup after a cancellation.
    async fn abort(&self, session_id: PostId) -> UploadError {
        self.set_state(UploadState::CleaningUp);
        info!(session_id, "upload cancelled, deleting uploaded chunks");

        if let Err(e) = self.service.delete_chunk(session_id).await {
            warn!(session_id, error = %e, "failed to clean up chunks");
            self.emit(UploadEvent::CleanupFailed {
                session_id,
                error: e.to_string(),
            });
        }

        self.set_state(UploadState::Aborted);
        UploadError::Cancelled { session_id }
    }

    fn set_state(&self, state: UploadState) {
        self.state.send_replace(state);
        self.emit(UploadEvent::StateChanged(state));
    }

    fn emit(&self, event: UploadEvent) {
        if self.events_tx.try_send(event).is_err() {
            trace!("upload event dropped (no receiver or channel full)");
        }
    }
}

/// Marks the coordinator busy for the lifetime of one upload call.
struct ActiveGuard<'a>(&'a AtomicBool);

impl<'a> ActiveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
