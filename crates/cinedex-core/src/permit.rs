//! Counting permit pool bounding in-flight oracle calls.
//!
//! A [`PermitPool`] is an explicit value handed to each
//! [`BoundedAnnotator`](crate::annotate::BoundedAnnotator). Independent
//! pipeline runs build their own pools and never contend with each other.
//! Clones share the same underlying count.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::AppError;

/// Default number of concurrent oracle calls.
pub const DEFAULT_PERMITS: usize = 10;

/// Largest pool the underlying semaphore can hold.
pub const MAX_PERMITS: usize = Semaphore::MAX_PERMITS;

#[derive(Debug, Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held permit. Dropping it returns the permit to the pool.
#[derive(Debug)]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}

impl PermitPool {
    /// Creates a pool with `capacity` permits.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `capacity` is zero, since every
    /// acquisition would then wait forever, or above [`MAX_PERMITS`].
    pub fn new(capacity: usize) -> Result<Self, AppError> {
        if capacity == 0 {
            return Err(AppError::ConfigError(
                "permit pool capacity must be at least 1".to_string(),
            ));
        }
        if capacity > MAX_PERMITS {
            return Err(AppError::ConfigError(format!(
                "permit pool capacity must be at most {}, got {}",
                MAX_PERMITS, capacity
            )));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits for a free permit.
    ///
    /// # Errors
    ///
    /// Fails only if the semaphore is closed, which this pool never does.
    pub async fn acquire(&self) -> Result<Permit, AppError> {
        let inner = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AppError::Generic("permit pool closed".to_string()))?;
        Ok(Permit { _inner: inner })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

impl Default for PermitPool {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_PERMITS)),
            capacity: DEFAULT_PERMITS,
        }
    }
}
