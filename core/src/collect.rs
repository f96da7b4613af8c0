use crate::error::Result;
use crate::event::Event;
use std::fmt;
use std::sync::Arc;

/// The interface for event subscribers.
///
/// Events are only generated and dispatched when collectors are registered
/// with matching threshold levels.  Implementations must be prepared for
/// `collect` to be called from a delivery worker thread rather than the
/// logging call site.
///
/// Failures are communicated by returning an error: a failed delivery is
/// retried a small number of times, and persistent failure moves the
/// collector into a degraded state until a delivery succeeds again.  A
/// panicking collector is disposed of entirely.  See the worker
/// documentation for the exact policy.
///
/// The `Display` implementation supplies the name used in degradation and
/// disposal notifications, e.g. `File(path=/var/log/app.log)`.
pub trait Collect: fmt::Display + Send + Sync {
  /// Deliver one event.  The shared allocation is borrowed so collectors
  /// that buffer events can retain a clone of the `Arc` instead of copying
  /// the event.
  fn collect(&self, event: &Arc<Event>) -> Result<()>;

  /// Called exactly once when the collector is removed from service, after
  /// its final event.  The default does nothing; adapters holding files or
  /// connections flush and release them here.
  fn close(&self) -> Result<()> {
    Ok(())
  }
}
