use std::sync::mpsc;
use std::time::Instant;

use crate::error::JoinError;

/// A handle to one in-flight unit of work submitted to a
/// [`WorkerPool`](crate::pool::WorkerPool).
///
/// The handle resolves when the submitted job finishes (normally or by
/// panicking) and observes [`JoinError::Disconnected`] if the job was
/// discarded before running (pool shut down while the job was queued).
pub struct TaskHandle<T> {
    pub(crate) rx: mpsc::Receiver<Result<T, String>>,
}

impl<T> TaskHandle<T> {
    /// Block until the job settles and return its output.
    pub fn join(self) -> Result<T, JoinError> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(panic_msg)) => Err(JoinError::Panicked(panic_msg)),
            Err(_) => Err(JoinError::Disconnected),
        }
    }

    /// Block until the job settles or `deadline` passes.
    ///
    /// `None` waits without bound and behaves exactly like [`Self::join`].
    pub fn join_until(self, deadline: Option<Instant>) -> Result<T, JoinError> {
        let Some(deadline) = deadline else {
            return self.join();
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(panic_msg)) => Err(JoinError::Panicked(panic_msg)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(JoinError::TimedOut),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(JoinError::Disconnected),
        }
    }
}
