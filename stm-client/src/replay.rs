use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::{watch, Mutex};

use crate::client::ApiError;
use crate::db::{self, QueuedOp, StoreError};

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(300);

/// Sends one queued operation to the server.
#[async_trait]
pub trait ReplayTransport: Send + Sync {
    async fn replay(&self, op: &QueuedOp) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every queued operation was accepted.
    Drained,
    /// An operation failed; it and everything after it stay queued.
    Halted,
    /// Another pass was already running, so this trigger was a no-op.
    AlreadyDraining,
    /// A recent pass failed and its retry window has not elapsed yet.
    BackingOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub outcome: ReplayOutcome,
    pub replayed: usize,
    pub remaining: usize,
}

#[derive(Debug, Default)]
struct ReplayState {
    draining: bool,
    consecutive_failures: u32,
    next_attempt_at: Option<Instant>,
}

struct DrainProgress {
    replayed: usize,
    halted: bool,
}

/// Drains the offline queue against the server, oldest operation first.
///
/// An operation is removed only once the server accepts it. Any failure,
/// transport or verdict, halts the pass so a later operation is never
/// applied ahead of an earlier one that has not landed; the rest of the
/// queue waits for the next trigger. Triggers that arrive mid-drain
/// coalesce into the running pass, and passes after a failure are spaced
/// out with capped exponential backoff.
pub struct ReplayCoordinator {
    transport: Arc<dyn ReplayTransport>,
    conn: Arc<Mutex<Connection>>,
    state: std::sync::Mutex<ReplayState>,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl ReplayCoordinator {
    pub fn new(transport: Arc<dyn ReplayTransport>, conn: Arc<Mutex<Connection>>) -> Self {
        Self::with_backoff(transport, conn, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP)
    }

    pub fn with_backoff(
        transport: Arc<dyn ReplayTransport>,
        conn: Arc<Mutex<Connection>>,
        backoff_base: Duration,
        backoff_cap: Duration,
    ) -> Self {
        Self {
            transport,
            conn,
            state: std::sync::Mutex::new(ReplayState::default()),
            backoff_base,
            backoff_cap,
        }
    }

    pub async fn queue_len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        Ok(db::queue_len(&conn)? as usize)
    }

    /// Runs one replay pass unless one is already running or a backoff
    /// window is open. Server failures are folded into the summary; only
    /// local store errors surface as `Err`.
    pub async fn trigger(&self) -> Result<ReplaySummary, StoreError> {
        if let Err(outcome) = self.try_begin() {
            let remaining = self.queue_len().await?;
            return Ok(ReplaySummary {
                outcome,
                replayed: 0,
                remaining,
            });
        }

        let progress = match self.drain().await {
            Ok(progress) => progress,
            Err(err) => {
                self.state
                    .lock()
                    .expect("replay state lock poisoned")
                    .draining = false;
                return Err(err);
            }
        };
        self.finish(progress.halted);

        let remaining = self.queue_len().await?;
        Ok(ReplaySummary {
            outcome: if progress.halted {
                ReplayOutcome::Halted
            } else {
                ReplayOutcome::Drained
            },
            replayed: progress.replayed,
            remaining,
        })
    }

    fn try_begin(&self) -> Result<(), ReplayOutcome> {
        let mut state = self.state.lock().expect("replay state lock poisoned");
        if state.draining {
            return Err(ReplayOutcome::AlreadyDraining);
        }
        if state
            .next_attempt_at
            .map_or(false, |at| at > Instant::now())
        {
            return Err(ReplayOutcome::BackingOff);
        }
        state.draining = true;
        Ok(())
    }

    fn finish(&self, halted: bool) {
        let mut state = self.state.lock().expect("replay state lock poisoned");
        state.draining = false;
        if halted {
            state.consecutive_failures += 1;
            state.next_attempt_at =
                Some(Instant::now() + self.backoff_delay(state.consecutive_failures));
        } else {
            state.consecutive_failures = 0;
            state.next_attempt_at = None;
        }
    }

    async fn drain(&self) -> Result<DrainProgress, StoreError> {
        let snapshot = {
            let conn = self.conn.lock().await;
            db::pending_in_order(&conn)?
        };

        let mut replayed = 0;
        for op in &snapshot {
            match self.transport.replay(op).await {
                Ok(()) => {
                    let conn = self.conn.lock().await;
                    db::remove_op(&conn, op.id)?;
                    replayed += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        "replay halted at queued op {} ({} {}): {}",
                        op.id,
                        op.method,
                        op.path,
                        err
                    );
                    return Ok(DrainProgress {
                        replayed,
                        halted: true,
                    });
                }
            }
        }

        Ok(DrainProgress {
            replayed,
            halted: false,
        })
    }

    fn backoff_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(5);
        self.backoff_base
            .saturating_mul(1 << exponent)
            .min(self.backoff_cap)
    }

    /// Spawns a task that runs one replay pass each time the connectivity
    /// signal flips to online.
    pub fn spawn_on_reconnect(
        self: Arc<Self>,
        mut online: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while online.changed().await.is_ok() {
                let is_online = *online.borrow();
                if !is_online {
                    continue;
                }
                if let Err(err) = self.trigger().await {
                    tracing::error!("replay pass could not reach the local store: {err}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests;
