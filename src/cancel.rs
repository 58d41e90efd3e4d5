//! Cooperative cancellation for long-running fits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ClusterError, ClusterResult};

/// Abort flag shared between a running fit and its caller, plus an optional
/// deadline.
///
/// Clones share the same flag, so a token handed to an engine can be
/// cancelled from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with `Cancelled` or `DeadlineExceeded` if the run must stop.
    pub fn check(&self, context: &str) -> ClusterResult<()> {
        if self.is_cancelled() {
            return Err(ClusterError::Cancelled {
                context: context.to_string(),
            });
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ClusterError::DeadlineExceeded {
                context: context.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
