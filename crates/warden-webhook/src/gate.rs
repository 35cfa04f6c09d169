//! Concurrency gate and request cancellation

use crate::error::WebhookError;
use std::time::Duration;
use tokio::sync::{watch, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::debug;

/// Cancellation signal threaded through a request.
///
/// Fires when its [`CancelHandle`] is triggered or its deadline passes,
/// whichever comes first. A cancellation built with [`Cancellation::none`]
/// never fires.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Triggers the paired [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Cancellation {
    pub fn none() -> Self {
        Self::default()
    }

    /// A cancellation fired by the returned handle.
    pub fn channel() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                rx: Some(rx),
                deadline: None,
            },
        )
    }

    /// A cancellation fired by a watch channel, such as a shutdown signal.
    pub fn from_watch(rx: watch::Receiver<bool>) -> Self {
        Self {
            rx: Some(rx),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        let signalled = self.rx.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        signalled || expired
    }

    /// Resolves once the cancellation fires. Pends forever if it cannot.
    pub async fn cancelled(&self) {
        let signal = async {
            match &self.rx {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // A dropped sender that never cancelled can no longer fire.
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }
}

/// Bounds the number of requests evaluated at once.
///
/// A slot is held by the returned permit and released when it drops, on
/// every exit path.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Semaphore,
    limit: usize,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Semaphore::new(limit),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot. Cancellation wins over a slot that frees up at the
    /// same time.
    pub async fn acquire(
        &self,
        cancel: &Cancellation,
    ) -> Result<SemaphorePermit<'_>, WebhookError> {
        if cancel.is_cancelled() {
            return Err(WebhookError::Aborted);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request cancelled while waiting for a serving slot");
                Err(WebhookError::Aborted)
            }
            permit = self.semaphore.acquire() => permit.map_err(|_| WebhookError::Aborted),
        }
    }
}
