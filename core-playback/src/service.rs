//! # Decode Service
//!
//! Runs decode sessions on tokio's blocking pool and streams their PCM back to
//! async code through a bounded channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────┐      PcmEvent       ┌──────────────────┐
//! │ spawn_blocking              │ ──── mpsc(N) ─────▶ │ DecodeHandle     │
//! │  DecodeSession::run_until   │                     │  recv() / stop() │
//! │  └─ ChannelSink             │ ◀── cancellation ── │                  │
//! └─────────────────────────────┘                     └──────────────────┘
//! ```
//!
//! The channel gives back-pressure: when the consumer falls behind, the decode
//! thread blocks inside `deliver`. Dropping the receiver makes the next
//! delivery fail with `SinkDelivery`, which ends the session.
//!
//! At most one session per path runs at a time; a second `start` for a busy
//! path fails with `PathBusy`.

use crate::config::SessionConfig;
use crate::error::{PlaybackError, Result};
use crate::session::{DecodeSession, RunSummary};
use crate::traits::MediaBackend;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::playback::{PcmFormat, PcmSink};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default number of chunks buffered between the decode thread and the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Message sent from a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum PcmEvent {
    /// Sent once before the first chunk.
    Started(PcmFormat),
    /// One chunk of interleaved S16LE.
    Chunk(Bytes),
}

/// [`PcmSink`] that forwards into a tokio channel from a blocking thread.
pub struct ChannelSink {
    tx: mpsc::Sender<PcmEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PcmEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: PcmEvent) -> BridgeResult<()> {
        self.tx
            .blocking_send(event)
            .map_err(|_| BridgeError::OperationFailed("PCM receiver dropped".to_string()))
    }
}

impl PcmSink for ChannelSink {
    fn start(&mut self, format: &PcmFormat) -> BridgeResult<()> {
        self.send(PcmEvent::Started(*format))
    }

    fn deliver(&mut self, chunk: &[u8]) -> BridgeResult<()> {
        self.send(PcmEvent::Chunk(Bytes::copy_from_slice(chunk)))
    }
}

/// Registry entry for a path with a running session. Removed on drop.
struct ActivePath {
    registry: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl ActivePath {
    fn claim(registry: &Arc<Mutex<HashSet<PathBuf>>>, path: &Path) -> Result<Self> {
        if !registry.lock().insert(path.to_path_buf()) {
            return Err(PlaybackError::PathBusy(path.display().to_string()));
        }

        Ok(Self {
            registry: Arc::clone(registry),
            path: path.to_path_buf(),
        })
    }
}

impl Drop for ActivePath {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.path);
    }
}

/// Handle to a session running on the blocking pool.
pub struct DecodeHandle {
    events: mpsc::Receiver<PcmEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<RunSummary>>,
}

impl DecodeHandle {
    /// Next event, or `None` once the session has finished sending.
    pub async fn recv(&mut self) -> Option<PcmEvent> {
        self.events.recv().await
    }

    /// Ask the session to stop after the current iteration.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token observed by the session, for wiring into other cancellation trees.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session to end and return its summary.
    ///
    /// The receiver is dropped first. Events not yet received are discarded,
    /// and a session still producing fails with `SinkDelivery` on its next
    /// chunk, so call [`stop`](Self::stop) beforehand to end it cleanly.
    pub async fn join(self) -> Result<RunSummary> {
        let DecodeHandle { events, task, .. } = self;
        drop(events);

        task.await
            .map_err(|e| PlaybackError::Internal(format!("decode task failed: {}", e)))?
    }
}

/// Starts decode sessions on tokio's blocking pool.
pub struct DecodeService<B> {
    backend: Arc<B>,
    config: SessionConfig,
    channel_capacity: usize,
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl<B> DecodeService<B>
where
    B: MediaBackend + Send + Sync + 'static,
{
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Set how many events may queue before the decode thread blocks.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns `true` while a session for `path` is running.
    pub fn is_active(&self, path: &Path) -> bool {
        self.active.lock().contains(path)
    }

    /// Number of sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.lock().len()
    }

    /// Start decoding `path` in the background.
    ///
    /// Open errors are not reported here: they surface from
    /// [`DecodeHandle::join`] after the event stream ends without a
    /// `Started` event.
    ///
    /// # Errors
    ///
    /// - `PathBusy` if a session for `path` is already running
    /// - `Internal` if called outside a tokio runtime
    pub fn start(&self, path: impl AsRef<Path>) -> Result<DecodeHandle> {
        let path = path.as_ref().to_path_buf();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlaybackError::Internal(format!("no tokio runtime: {}", e)))?;

        let claim = ActivePath::claim(&self.active, &path)?;
        let (tx, events) = mpsc::channel(self.channel_capacity);
        let cancel = CancellationToken::new();

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let stop = cancel.clone();

        info!(file = %strip_path(&path.to_string_lossy()), "Starting background decode");

        let task = runtime.spawn_blocking(move || {
            let _claim = claim;
            let mut sink = ChannelSink::new(tx);
            let mut session = DecodeSession::open(backend.as_ref(), &path, config)?;
            let result = session.run_until(&mut sink, &stop);
            debug!("Background decode finished: ok={}", result.is_ok());
            result
        });

        Ok(DecodeHandle {
            events,
            cancel,
            task,
        })
    }
}
