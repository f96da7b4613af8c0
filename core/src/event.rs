use crate::context::Context;
use crate::error::SharedError;
use crate::frame::Frame;
use crate::level::Level;
use chrono::{DateTime, Utc};
use std::panic::Location;

/// A log event.
///
/// A single `Arc<Event>` is handed to every matching collector, possibly
/// across several worker threads at once.  Events are therefore constructed
/// once and never altered afterwards; collectors that need to keep one
/// around clone the `Arc`, not the event.
#[derive(Debug, Clone)]
pub struct Event {
  /// UTC time at which the event was generated.
  pub time: DateTime<Utc>,
  /// Event severity level.
  pub level: Level,
  /// Context of the logger that generated the event.
  pub context: Context,
  /// Call-site frames, empty when frame capture is disabled.
  pub frames: Vec<Frame>,
  /// The error associated with the message, if any.
  pub error: Option<SharedError>,
  /// The log message.
  pub message: String,
}

impl Event {
  pub(crate) fn new(
    context: Context,
    level: Level,
    error: Option<SharedError>,
    message: String,
  ) -> Event {
    Event {
      time: Utc::now(),
      level,
      context,
      frames: Vec::new(),
      error,
      message,
    }
  }

  /// Attaches the call site, honoring the configured frame counts: events
  /// at `Error` or `Fatal` use `error_frames`, everything else `frames`,
  /// and a count of zero disables capture.  Counts larger than one still
  /// yield the single call-site frame that `#[track_caller]` provides.
  pub(crate) fn capture_call_site(
    &mut self,
    frames: usize,
    error_frames: usize,
    location: &Location<'_>,
  ) {
    let depth = match self.level {
      Level::Error | Level::Fatal => error_frames,
      _ => frames,
    };
    if depth == 0 {
      return;
    }
    self.frames = vec![Frame::from_location(location)];
  }
}
