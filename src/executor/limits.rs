//! Memory accounting for a single query (spec §4.6 "memory high water
//! mark"), adapted from the teacher's `ResourceLimits`/`MemoryTracker`
//! cooperative-checking design: operators add their working-set estimate
//! as they allocate it and the tracker rejects the add once the
//! configured high water mark would be exceeded, rather than polling
//! actual process RSS.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceError {
    #[error("memory limit exceeded: used {used} bytes, limit {limit} bytes")]
    MemoryLimitExceeded { limit: usize, used: usize },
}

#[derive(Clone)]
pub struct MemoryTracker {
    used: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl MemoryTracker {
    pub fn new(limit: Option<usize>) -> Self {
        MemoryTracker { used: Arc::new(AtomicUsize::new(0)), limit }
    }

    /// Account for `bytes` more memory in use; fails without mutating
    /// state further if that would cross the high water mark.
    pub fn allocate(&self, bytes: usize) -> Result<(), ResourceError> {
        let previous = self.used.fetch_add(bytes, Ordering::Relaxed);
        let now = previous + bytes;
        if let Some(limit) = self.limit {
            if now > limit {
                self.used.fetch_sub(bytes, Ordering::Relaxed);
                return Err(ResourceError::MemoryLimitExceeded { limit, used: now });
            }
        }
        Ok(())
    }

    pub fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}
