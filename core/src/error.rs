use std::sync::Arc;
use thiserror::Error;

/// The main error type for the `herald` library.
#[derive(Debug, Error)]
pub enum Error {
  /// One or more events were discarded because an asynchronous collector's
  /// buffer was full.  The drop count travels in the fields of the
  /// degradation notification, not in the error itself.
  #[error("events dropped due to full buffer")]
  Drops,

  /// `close` gave up waiting for buffered events to flush.
  #[error("timeout waiting for buffers to flush")]
  FlushTimeout,

  /// An I/O failure inside a collector adapter.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A collector panicked while handling an event.  The payload text is
  /// preserved for the disposal notification.
  #[error("collector panicked: {0}")]
  Panic(String),

  /// A collector rejected an event for a reason of its own.
  #[error("{0}")]
  Collect(String),
}

/// A convenience `Result` type defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A shareable error value.  Events carry their associated error behind an
/// `Arc` because a single event is read concurrently by every matching
/// collector, and the degradation controller reuses one error across many
/// notification events.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;
