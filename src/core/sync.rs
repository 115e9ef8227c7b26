//! Lock poisoning helpers
//!
//! A poisoned lock means a worker panicked while holding it. Rather than
//! propagating the panic with `unwrap()`, callers convert the poison into
//! their own module error and keep going.

use std::sync::LockResult;

/// Convert a poisoned lock result into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use msgpipe::core::sync::handle_mutex_poison;
/// use msgpipe::consumer::ConsumerError;
///
/// let workers = Mutex::new(Vec::<usize>::new());
/// let guard = handle_mutex_poison(workers.lock(), |message| ConsumerError::SyncError { message })
///     .unwrap();
/// assert!(guard.is_empty());
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "lock poisoned by a panic in another task: {:?}",
            poison_err
        ))
    })
}
