//! SessionHandle - single-writer actor around a `SyncEngine`
//!
//! Telemetry and user commands from any thread are queued on one bounded
//! channel and applied to the engine strictly in order. The engine runs on
//! the blocking pool because transport calls may wait on a backend.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ActualTotals, RealtimeSample, SyncReport, SyncStatus};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::engine::SyncEngine;
use crate::error::SyncError;

type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

/// Command applied by the session worker
#[derive(Debug)]
pub enum SessionCommand {
    Telemetry {
        sample: RealtimeSample,
        reply: Option<Reply<SyncReport>>,
    },
    SelectMedia {
        path: PathBuf,
        reply: Reply<()>,
    },
    Start {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Seek {
        position_ms: f64,
        reply: Reply<()>,
    },
    UpdateTotals {
        totals: ActualTotals,
    },
    Stop,
    Status {
        reply: oneshot::Sender<SyncStatus>,
    },
}

/// Handle to a running session worker
#[derive(Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    /// Stop that could not be queued; applied before the next command
    stop_requested: Arc<AtomicBool>,
    worker_handle: JoinHandle<SyncStatus>,
}

impl SessionHandle {
    /// Move the engine into a worker on the blocking pool
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(engine: SyncEngine, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let stop_requested = Arc::new(AtomicBool::new(false));
        let flag = stop_requested.clone();
        let worker_handle = tokio::task::spawn_blocking(move || session_worker(engine, rx, flag));
        Self {
            tx,
            stop_requested,
            worker_handle,
        }
    }

    /// Clone of the command sender for producers on other tasks
    pub fn sender(&self) -> mpsc::Sender<SessionCommand> {
        self.tx.clone()
    }

    pub async fn select_media(&self, path: impl Into<PathBuf>) -> Result<(), SyncError> {
        let path = path.into();
        self.request(|reply| SessionCommand::SelectMedia { path, reply })
            .await
    }

    pub async fn start(&self) -> Result<(), SyncError> {
        self.request(|reply| SessionCommand::Start { reply }).await
    }

    pub async fn pause(&self) -> Result<(), SyncError> {
        self.request(|reply| SessionCommand::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<(), SyncError> {
        self.request(|reply| SessionCommand::Resume { reply }).await
    }

    pub async fn seek(&self, position_ms: f64) -> Result<(), SyncError> {
        self.request(|reply| SessionCommand::Seek { position_ms, reply })
            .await
    }

    /// Queue a sample and wait for its report
    pub async fn telemetry(&self, sample: RealtimeSample) -> Result<SyncReport, SyncError> {
        self.request(|reply| SessionCommand::Telemetry {
            sample,
            reply: Some(reply),
        })
        .await
    }

    /// Queue a sample without waiting (non-blocking)
    ///
    /// Returns false if the queue is full (sample dropped) or closed.
    pub fn try_telemetry(&self, sample: RealtimeSample) -> bool {
        match self.tx.try_send(SessionCommand::Telemetry {
            sample,
            reply: None,
        }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("trainer_sync_samples_dropped_total").increment(1);
                warn!("session queue full, sample dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub async fn update_totals(&self, totals: ActualTotals) -> Result<(), SyncError> {
        self.tx
            .send(SessionCommand::UpdateTotals { totals })
            .await
            .map_err(|_| SyncError::SessionClosed)
    }

    /// Request a stop without waiting for the transport to release
    ///
    /// Safe from any thread, with or without a runtime.
    pub fn stop(&self) {
        match self.tx.try_send(SessionCommand::Stop) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stop_requested.store(true, Ordering::Release);
                // The worker may have drained the queue before the flag was set
                if let Err(mpsc::error::TrySendError::Full(_)) =
                    self.tx.try_send(SessionCommand::Stop)
                {
                    debug!("session queue full, stop flagged for the worker");
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("stop requested on closed session");
            }
        }
    }

    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Status { reply })
            .await
            .map_err(|_| SyncError::SessionClosed)?;
        rx.await.map_err(|_| SyncError::SessionClosed)
    }

    /// Stop the engine, drain the queue and return the final status
    #[instrument(name = "session_handle_shutdown", skip(self))]
    pub async fn shutdown(self) -> Result<SyncStatus, SyncError> {
        let _ = self.tx.send(SessionCommand::Stop).await;
        drop(self.tx);
        self.worker_handle.await.map_err(|e| {
            error!(error = ?e, "session worker panicked");
            SyncError::SessionClosed
        })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SyncError::SessionClosed)?;
        rx.await.map_err(|_| SyncError::SessionClosed)?
    }
}

#[instrument(name = "session_worker_loop", skip_all)]
fn session_worker(
    mut engine: SyncEngine,
    mut rx: mpsc::Receiver<SessionCommand>,
    stop_requested: Arc<AtomicBool>,
) -> SyncStatus {
    debug!("session worker started");

    while let Some(command) = rx.blocking_recv() {
        if stop_requested.swap(false, Ordering::AcqRel) {
            engine.stop_playback();
        }
        match command {
            SessionCommand::Telemetry { sample, reply } => {
                let result = engine.telemetry_update(sample);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            error!(error = %e, "telemetry update failed");
                        }
                    }
                }
            }
            SessionCommand::SelectMedia { path, reply } => {
                let _ = reply.send(engine.media_selected(&path));
            }
            SessionCommand::Start { reply } => {
                let _ = reply.send(engine.start_playback());
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(engine.pause_playback());
            }
            SessionCommand::Resume { reply } => {
                let _ = reply.send(engine.resume_playback());
            }
            SessionCommand::Seek { position_ms, reply } => {
                let _ = reply.send(engine.seek_playback(position_ms));
            }
            SessionCommand::UpdateTotals { totals } => engine.update_actual_totals(totals),
            SessionCommand::Stop => engine.stop_playback(),
            SessionCommand::Status { reply } => {
                let _ = reply.send(engine.status());
            }
        }
    }

    engine.stop_playback();
    debug!("session worker stopped");
    engine.status()
}
