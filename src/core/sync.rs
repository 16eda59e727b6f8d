//! Synchronization utilities for robust mutex handling
//!
//! Queue state is guarded by `std::sync::Mutex` and mutated from `Drop`
//! implementations, where an error cannot be propagated. A poisoned lock is
//! therefore recovered rather than surfaced: every critical section in the
//! queue family leaves the state consistent before it can panic.

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the guard if a previous holder panicked
///
/// # Arguments
/// * `mutex` - The mutex to lock
/// * `context` - Short name of the owner, used in the warning on recovery
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use taskgate::core::sync::lock_or_recover;
///
/// let mutex = Mutex::new(42);
/// let guard = lock_or_recover(&mutex, "example");
/// assert_eq!(*guard, 42);
/// ```
pub fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poison_err| {
        log::warn!(
            "{}: internal synchronisation error (mutex poisoned), a panic occurred while holding the lock; recovering state",
            context
        );
        poison_err.into_inner()
    })
}
