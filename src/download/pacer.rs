//! Global start-rate limiter for queries and retrievals.
//!
//! A background task emits one start token per randomized interval in
//! `[min, max]`. At most one token is buffered, so an idle period never turns
//! into a burst of back-to-back requests.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use idl_core::download::Pacer;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), idl_core::download::PacerError> {
//! let pacer = Pacer::new(Duration::from_millis(250), Duration::from_millis(750));
//! pacer.start();
//!
//! let cancel = CancellationToken::new();
//! pacer.wait(&cancel).await?;
//! // ... start one request
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::constants::PACER_MIN_FLOOR;

/// Why [`Pacer::wait`] returned without a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacerError {
    /// [`Pacer::stop`] was called.
    #[error("pacer stopped")]
    Stopped,
    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

/// Shared token source bounding how often a new operation may start.
///
/// `Pacer` is `Send + Sync`; share it by reference or wrap it in `Arc`.
/// Dropping it stops the background task.
#[derive(Debug)]
pub struct Pacer {
    min: Duration,
    max: Duration,
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
    stop: CancellationToken,
    started: AtomicBool,
}

impl Pacer {
    /// Creates a stopped-until-started pacer.
    ///
    /// A zero `min` becomes 150ms; a `max` below `min` is raised to `min`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = if min.is_zero() { PACER_MIN_FLOOR } else { min };
        let max = max.max(min);
        let (tx, rx) = mpsc::channel(1);
        Self {
            min,
            max,
            tx,
            rx: Mutex::new(rx),
            stop: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Effective `(min, max)` bounds after clamping.
    #[must_use]
    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }

    /// Spawns the emitter task. Later calls are no-ops.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let tx = self.tx.clone();
        let stop = self.stop.clone();
        let (min, max) = (self.min, self.max);
        debug!(min_ms = min.as_millis(), max_ms = max.as_millis(), "pacer started");

        tokio::spawn(async move {
            loop {
                let delay = next_delay(min, max);
                tokio::select! {
                    () = stop.cancelled() => break,
                    () = tokio::time::sleep(delay) => {
                        if tx.try_send(()).is_err() {
                            trace!("pacer token already pending");
                        }
                    }
                }
            }
            debug!("pacer stopped");
        });
    }

    /// Stops the emitter and wakes every waiter with [`PacerError::Stopped`].
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Waits for the next start token.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Cancelled`] when `cancel` fires and
    /// [`PacerError::Stopped`] once the pacer is stopped.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), PacerError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PacerError::Cancelled),
            () = self.stop.cancelled() => Err(PacerError::Stopped),
            token = async { self.rx.lock().await.recv().await } => {
                token.ok_or(PacerError::Stopped)
            }
        }
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

fn next_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let spread = u64::try_from((max - min).as_nanos()).unwrap_or(u64::MAX);
    min + Duration::from_nanos(rand::thread_rng().gen_range(0..=spread))
}
