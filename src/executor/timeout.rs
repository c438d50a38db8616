//! Cooperative query cancellation/timeout (spec §4.6, §9: "adapt the
//! teacher's atomic-flag cancellation pattern rather than inventing one").
//! Operators check `QueryTimeout::check` at each suspension point between
//! steps; nothing preempts mid-operator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TimeoutError {
    pub timeout: Duration,
    pub elapsed: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query exceeded timeout of {:?} (ran for {:?})", self.timeout, self.elapsed)
    }
}

impl std::error::Error for TimeoutError {}

#[derive(Clone)]
pub struct QueryTimeout {
    cancelled: Arc<AtomicBool>,
    start_time: Instant,
    timeout_duration: Option<Duration>,
}

impl QueryTimeout {
    pub fn new(timeout: Option<Duration>) -> Self {
        QueryTimeout {
            cancelled: Arc::new(AtomicBool::new(false)),
            start_time: Instant::now(),
            timeout_duration: timeout,
        }
    }

    pub fn infinite() -> Self {
        QueryTimeout::new(None)
    }

    /// Called at each operator suspension point; `Err` means the scheduler
    /// must stop dispatching new nodes and surface `Error::Timeout` /
    /// `Error::Cancelled`.
    pub fn check(&self) -> Result<(), TimeoutError> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(TimeoutError {
                timeout: self.timeout_duration.unwrap_or(Duration::ZERO),
                elapsed: self.start_time.elapsed(),
            });
        }
        if let Some(timeout) = self.timeout_duration {
            let elapsed = self.start_time.elapsed();
            if elapsed > timeout {
                self.cancelled.store(true, Ordering::Relaxed);
                return Err(TimeoutError { timeout, elapsed });
            }
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { cancelled: Arc::clone(&self.cancelled) }
    }
}

impl Default for QueryTimeout {
    fn default() -> Self {
        QueryTimeout::new(Some(Duration::from_secs(60)))
    }
}

#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn no_timeout_never_trips() {
        let timeout = QueryTimeout::new(None);
        assert!(timeout.check().is_ok());
    }

    #[test]
    fn explicit_cancel_is_observed_through_a_handle() {
        let timeout = QueryTimeout::new(Some(Duration::from_secs(10)));
        let handle = timeout.cancel_handle();
        handle.cancel();
        assert!(timeout.is_cancelled());
        assert!(timeout.check().is_err());
    }

    #[test]
    fn short_timeout_trips_after_sleeping_past_it() {
        let timeout = QueryTimeout::new(Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(50));
        assert!(timeout.check().is_err());
    }
}
