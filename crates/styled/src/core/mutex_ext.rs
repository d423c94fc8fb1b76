//! Poison-aware locking for the shared host document
//!
//! The host document is shared between the sheet's [`HostTarget`] and
//! whoever renders it. A panic while one side holds the lock must not turn
//! every later style insertion into a panic as well, so locks go through
//! [`MutexExt::lock_or_recover`], which logs the poison event and reports it
//! as an error the caller can degrade on.
//!
//! [`HostTarget`]: crate::core::HostTarget

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Extension trait for safe mutex operations
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
/// use styled::core::mutex_ext::MutexExt;
///
/// let mutex = Mutex::new(42);
/// match mutex.lock_or_recover() {
///     Ok(guard) => assert_eq!(*guard, 42),
///     Err(e) => panic!("Mutex poisoned: {}", e),
/// }
/// ```
pub trait MutexExt<T> {
    /// The error type returned when the mutex is poisoned
    type Error;

    /// Lock the mutex, returning an error if poisoned.
    ///
    /// The poisoned state is logged with `tracing::error!`. The data is not
    /// recovered: a half-applied rule insertion could leave the container
    /// text and the index bookkeeping out of step.
    fn lock_or_recover(&self) -> Result<MutexGuard<'_, T>, Self::Error>;
}

/// Error type for mutex poisoning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexPoisonedError;

impl std::fmt::Display for MutexPoisonedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mutex was poisoned - another thread panicked while holding the lock")
    }
}

impl std::error::Error for MutexPoisonedError {}

impl<T> MutexExt<T> for Mutex<T> {
    type Error = MutexPoisonedError;

    fn lock_or_recover(&self) -> Result<MutexGuard<'_, T>, Self::Error> {
        self.lock().map_err(|_poisoned: PoisonError<MutexGuard<'_, T>>| {
            tracing::error!(
                "Mutex was poisoned - another thread panicked while holding the lock. \
                 Refusing to touch the guarded document."
            );
            MutexPoisonedError
        })
    }
}
