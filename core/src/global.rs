//! The process-wide dispatch instance and access functions.

use crate::dispatch::Dispatch;
use crate::error::Result;
use once_cell::sync::Lazy;
use std::time::Duration;

// The one and only global dispatch instance.
// It will be created on its first access in a thread-safe manner.
static GLOBAL_DISPATCH: Lazy<Dispatch> = Lazy::new(Dispatch::new);

/// Provides a reference to the global dispatch instance.
///
/// Collectors registered here receive events from every logger created
/// through [`crate::Logger::new`], from anywhere in the application.
///
/// # Examples
///
/// ```
/// use herald::{global, Level};
///
/// // Nothing is registered yet, so every level is disabled.
/// assert!(!global().enabled_for(Level::Debug));
/// ```
pub fn global() -> &'static Dispatch {
  &GLOBAL_DISPATCH
}

/// Flushes and resets the global dispatch instance.
///
/// Call this before process exit when buffered collectors are registered;
/// without it, queued events may be lost.  See [`Dispatch::close`] for the
/// full semantics.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// herald::close(Duration::from_secs(5)).unwrap();
/// ```
pub fn close(timeout: Duration) -> Result<()> {
  global().close(timeout)
}
