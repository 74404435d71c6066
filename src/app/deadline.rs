use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Raced<T> {
    Settled(T),
    TimedOut,
    Lost,
}

// Losing the race does not stop the worker; it only flips the abandoned flag
// so the late result is recognised and discarded instead of delivered.
pub(crate) struct PendingOperation<T> {
    label: &'static str,
    abandoned: Arc<AtomicBool>,
    rx: mpsc::Receiver<T>,
}

impl<T: Send + 'static> PendingOperation<T> {
    pub(crate) fn spawn<F>(label: &'static str, op: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let abandoned = Arc::new(AtomicBool::new(false));
        let worker_flag = Arc::clone(&abandoned);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let value = op();
            if worker_flag.load(Ordering::SeqCst) {
                debug!(operation = label, "late result of abandoned operation discarded");
                return;
            }
            let _ = tx.send(value);
        });
        Self {
            label,
            abandoned,
            rx,
        }
    }

    pub(crate) fn wait(self, limit: Duration) -> Raced<T> {
        match self.rx.recv_timeout(limit) {
            Ok(value) => Raced::Settled(value),
            Err(RecvTimeoutError::Timeout) => {
                self.abandoned.store(true, Ordering::SeqCst);
                debug!(
                    operation = self.label,
                    limit_ms = limit.as_millis() as u64,
                    "deadline reached; operation abandoned"
                );
                Raced::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => Raced::Lost,
        }
    }

    #[cfg(test)]
    pub(crate) fn abandoned_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abandoned)
    }
}

pub(crate) fn race<T, F>(label: &'static str, limit: Duration, op: F) -> Raced<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    PendingOperation::spawn(label, op).wait(limit)
}
