//! Streaming Session
//!
//! A session owns one client-facing output channel and one generation worker.
//! Three independent signals can end it: the worker finishing (`complete` or
//! `fail`), the deadline fixed at open, or the client going away. Whichever
//! fires first moves the state through [`StateCell::finish`]; every later
//! signal is ignored. The winner
//!
//! 1. writes at most one terminal chunk,
//! 2. drops the output sender so the client connection closes,
//! 3. cancels and aborts the worker, exactly once.
//!
//! ```no_run
//! use a3s_chat::config::SessionConfig;
//! use a3s_chat::session::StreamingSession;
//!
//! # async fn example() {
//! let (session, _stream) = StreamingSession::open(&SessionConfig::default());
//! session.run(|session| async move {
//!     session.send_text("Hello").await?;
//!     session.complete(5).await?;
//!     Ok::<(), a3s_chat::ChatError>(())
//! });
//! # }
//! ```

pub mod state;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::chat::types::ChatResponseChunk;
use crate::config::SessionConfig;
use crate::error::{ChatError, Result};

pub use state::SessionState;
use state::StateCell;

/// Client side of a session: yields chunks until the terminal one, then ends.
pub type ChunkStream = ReceiverStream<ChatResponseChunk>;

/// Handle to one streaming session. Cheap to clone.
#[derive(Clone)]
pub struct StreamingSession {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    started_at: Instant,
    timeout: Duration,
    state: StateCell,
    sender: Mutex<Option<mpsc::Sender<ChatResponseChunk>>>,
    cancel: CancellationToken,
    worker: OnceLock<AbortHandle>,
    releases: AtomicUsize,
}

impl StreamingSession {
    /// Allocate the output channel and arm the deadline.
    ///
    /// Returns immediately. Must be called inside a tokio runtime.
    pub fn open(config: &SessionConfig) -> (Self, ChunkStream) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let timeout = config.timeout();

        let session = Self {
            inner: Arc::new(Inner {
                id: format!("sess-{}", uuid::Uuid::new_v4()),
                started_at: Instant::now(),
                timeout,
                state: StateCell::new(),
                sender: Mutex::new(Some(tx.clone())),
                cancel: CancellationToken::new(),
                worker: OnceLock::new(),
                releases: AtomicUsize::new(0),
            }),
        };

        tracing::info!(
            session_id = %session.id(),
            timeout_ms = timeout.as_millis() as u64,
            "Opened streaming session"
        );

        session.spawn_watcher(tx);
        (session, ReceiverStream::new(rx))
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.get()
    }

    pub fn started_at(&self) -> Instant {
        self.inner.started_at
    }

    pub fn deadline(&self) -> Instant {
        self.inner.started_at + self.inner.timeout
    }

    /// Schedule the generation work on its own task.
    ///
    /// Errors returned by `work` and panics inside it become a single `fail`;
    /// nothing escapes the task. A session runs at most one worker.
    pub fn run<F, Fut>(&self, work: F)
    where
        F: FnOnce(StreamingSession) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if !self.inner.state.start() {
            tracing::warn!(
                session_id = %self.id(),
                state = %self.state(),
                "Worker not started, session is no longer idle"
            );
            return;
        }

        let session = self.clone();
        let cancel = self.inner.cancel.clone();
        let handle = tokio::spawn(async move {
            let worker = session.clone();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                outcome = AssertUnwindSafe(async move { work(worker).await }).catch_unwind() => outcome,
            };

            match outcome {
                Ok(Ok(())) => {
                    if !session.state().is_terminal() {
                        let _ = session
                            .fail("generation finished without a completion signal")
                            .await;
                    }
                }
                Ok(Err(err)) => {
                    let _ = session.fail(failure_text(&err)).await;
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "worker panicked".to_string());
                    let _ = session.fail(reason).await;
                }
            }
        });

        let _ = self.inner.worker.set(handle.abort_handle());
        if self.inner.cancel.is_cancelled() {
            handle.abort();
        }
    }

    /// Push one non-terminal chunk.
    ///
    /// After a terminal transition this returns `AlreadyClosed` and nothing
    /// reaches the client. A vanished client yields `ChannelClosed` and ends
    /// the session as `Disconnected`.
    pub async fn send(&self, chunk: ChatResponseChunk) -> Result<()> {
        if chunk.is_done {
            return Err(ChatError::Generation(
                "terminal chunks are sent by complete or fail".to_string(),
            ));
        }

        let guard = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => return Err(ChatError::AlreadyClosed),
            guard = self.inner.sender.lock() => guard,
        };
        if self.state().is_terminal() {
            return Err(ChatError::AlreadyClosed);
        }
        let Some(tx) = guard.as_ref() else {
            return Err(ChatError::AlreadyClosed);
        };

        let sent = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => return Err(ChatError::AlreadyClosed),
            sent = tx.send(chunk) => sent,
        };
        drop(guard);

        match sent {
            Ok(()) => Ok(()),
            Err(_) => {
                let _ = self.disconnect().await;
                Err(ChatError::ChannelClosed)
            }
        }
    }

    /// Push a text fragment.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(ChatResponseChunk::delta(text)).await
    }

    /// Finish successfully.
    ///
    /// `AlreadyClosed` means another terminal path won. `ChannelClosed` means
    /// this call ended the session but the client was gone, so the session is
    /// recorded as `Disconnected`.
    pub async fn complete(&self, used_token: u32) -> Result<()> {
        let chunk = ChatResponseChunk::done(used_token, self.inner.started_at);
        self.finish(SessionState::Completed, Some(chunk)).await
    }

    /// Finish with an error chunk. Same return contract as [`Self::complete`].
    pub async fn fail(&self, message: impl AsRef<str>) -> Result<()> {
        let chunk = ChatResponseChunk::error(message);
        self.finish(SessionState::Failed, Some(chunk)).await
    }

    async fn time_out(&self) -> Result<()> {
        let chunk = ChatResponseChunk::error(
            ChatError::Timeout(self.inner.timeout).to_string(),
        );
        self.finish(SessionState::TimedOut, Some(chunk)).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.finish(SessionState::Disconnected, None).await
    }

    async fn finish(&self, outcome: SessionState, terminal: Option<ChatResponseChunk>) -> Result<()> {
        if !self.inner.state.finish(outcome) {
            tracing::debug!(
                session_id = %self.id(),
                attempted = %outcome,
                state = %self.state(),
                "Ignored terminal signal, session already finished"
            );
            return Err(ChatError::AlreadyClosed);
        }

        // A timed-out worker may be parked in `send`; cancel first so it lets
        // go of the sender.
        if outcome == SessionState::TimedOut {
            self.inner.cancel.cancel();
        }

        let mut guard = self.lock_sender().await;
        let delivery = match (guard.take(), terminal) {
            (Some(tx), Some(chunk)) if outcome == SessionState::TimedOut => {
                tx.try_send(chunk).map_err(|e| match e {
                    TrySendError::Closed(_) => ChatError::ChannelClosed,
                    TrySendError::Full(_) => ChatError::Timeout(self.inner.timeout),
                })
            }
            (Some(tx), Some(chunk)) => {
                match tokio::time::timeout_at(self.deadline(), tx.send(chunk)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(_)) => Err(ChatError::ChannelClosed),
                    Err(_) => Err(ChatError::Timeout(self.inner.timeout)),
                }
            }
            _ => Ok(()),
        };
        drop(guard);

        // Only the winner writes here, so the override cannot race.
        if matches!(delivery, Err(ChatError::ChannelClosed)) {
            self.inner.state.replace(outcome, SessionState::Disconnected);
        }

        let elapsed_ms = self.inner.started_at.elapsed().as_millis() as u64;
        match (self.state(), &delivery) {
            (SessionState::Completed, Ok(())) => {
                tracing::info!(session_id = %self.id(), elapsed_ms, "Session completed")
            }
            (SessionState::Failed, Ok(())) => {
                tracing::warn!(session_id = %self.id(), elapsed_ms, "Session failed")
            }
            (SessionState::TimedOut, _) => {
                tracing::warn!(session_id = %self.id(), elapsed_ms, "Session timed out")
            }
            (SessionState::Disconnected, Err(_)) => tracing::warn!(
                session_id = %self.id(),
                attempted = %outcome,
                elapsed_ms,
                "Client gone, terminal chunk undelivered"
            ),
            (SessionState::Disconnected, Ok(())) => {
                tracing::warn!(session_id = %self.id(), elapsed_ms, "Client disconnected")
            }
            (state, _) => tracing::warn!(
                session_id = %self.id(),
                %state,
                elapsed_ms,
                "Client did not drain the terminal chunk before the deadline"
            ),
        }

        self.release();
        delivery
    }

    /// Lock the sender, giving up politeness once the deadline passes.
    async fn lock_sender(&self) -> MutexGuard<'_, Option<mpsc::Sender<ChatResponseChunk>>> {
        match tokio::time::timeout_at(self.deadline(), self.inner.sender.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                self.inner.cancel.cancel();
                self.inner.sender.lock().await
            }
        }
    }

    /// Tear down the worker. Only the terminal winner gets here.
    fn release(&self) {
        self.inner.releases.fetch_add(1, Ordering::AcqRel);
        self.inner.cancel.cancel();
        if let Some(worker) = self.inner.worker.get() {
            worker.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::Acquire)
    }

    fn spawn_watcher(&self, tx: mpsc::Sender<ChatResponseChunk>) {
        let session = self.clone();
        let cancel = self.inner.cancel.clone();
        let deadline = self.deadline();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tx.closed() => {
                    let _ = session.disconnect().await;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = session.time_out().await;
                }
            }
        });
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Text shown to the client for a worker error.
fn failure_text(err: &ChatError) -> String {
    match err {
        ChatError::Generation(message) => message.clone(),
        other => other.to_string(),
    }
}
