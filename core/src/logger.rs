//! The logging front-end.  A `Logger` pairs an immutable [`Context`] with
//! a [`Dispatch`] handle; the leveled methods build events and hand them
//! to the dispatcher.  Loggers are cheap to clone and derive.

use crate::context::{Context, Fields, Value};
use crate::dispatch::Dispatch;
use crate::error::SharedError;
use crate::event::Event;
use crate::global::global;
use crate::level::Level;
use crate::worker::panic_text;
use crate::Error;
use std::any::Any;
use std::panic::Location;
use std::sync::Arc;

/// Emits events under a named context.
///
/// Logging through a disabled level costs one atomic snapshot load; the
/// event is only constructed when some collector wants it.
#[derive(Clone)]
pub struct Logger {
  context: Context,
  dispatch: Dispatch,
}

impl Logger {
  /// A logger bound to the process-wide dispatch.
  pub fn new(name: &str) -> Logger {
    global().logger(name)
  }

  pub(crate) fn bound(dispatch: Dispatch, name: &str) -> Logger {
    Logger {
      context: Context::new(name),
      dispatch,
    }
  }

  /// The context this logger stamps onto events.
  pub fn context(&self) -> &Context {
    &self.context
  }

  /// A derived logger whose context carries one additional field.
  pub fn with_value(&self, key: impl Into<String>, value: impl Into<Value>) -> Logger {
    Logger {
      context: self.context.with_value(key, value),
      dispatch: self.dispatch.clone(),
    }
  }

  /// A derived logger whose context carries every field in `fields`.
  pub fn with_fields(&self, fields: Fields) -> Logger {
    Logger {
      context: self.context.with_fields(fields),
      dispatch: self.dispatch.clone(),
    }
  }

  /// Whether an event at `level` would currently reach any collector.
  /// Useful for guarding expensive message construction.
  pub fn enabled_for(&self, level: Level) -> bool {
    self.dispatch.enabled_for(level)
  }

  #[track_caller]
  pub fn debug(&self, message: impl Into<String>) {
    self.emit(Level::Debug, None, message.into(), Location::caller());
  }

  #[track_caller]
  pub fn info(&self, message: impl Into<String>) {
    self.emit(Level::Info, None, message.into(), Location::caller());
  }

  #[track_caller]
  pub fn warn(&self, message: impl Into<String>) {
    self.emit(Level::Warn, None, message.into(), Location::caller());
  }

  /// Logs `message` at the error level with `error` attached to the event.
  #[track_caller]
  pub fn error<E>(&self, error: E, message: impl Into<String>)
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    self.emit(
      Level::Error,
      Some(Arc::new(error)),
      message.into(),
      Location::caller(),
    );
  }

  /// Logs `message` at the fatal level, then panics with it.  The panic
  /// happens whether or not any collector is listening.
  #[track_caller]
  pub fn panic(&self, message: impl Into<String>) -> ! {
    let message = message.into();
    self.emit(Level::Fatal, None, message.clone(), Location::caller());
    panic!("{}", message);
  }

  /// Logs a caught panic payload at the fatal level without resuming the
  /// panic.  Meant for `catch_unwind` handlers that want the failure on
  /// record before carrying on.  String payloads are reported verbatim.
  #[track_caller]
  pub fn report_recovery(&self, cause: &(dyn Any + Send), message: impl Into<String>) {
    let error: SharedError = Arc::new(Error::Panic(panic_text(cause)));
    self.emit(
      Level::Fatal,
      Some(error),
      message.into(),
      Location::caller(),
    );
  }

  fn emit(&self, level: Level, error: Option<SharedError>, message: String, location: &Location) {
    let config = self.dispatch.inner.current_config();
    if level > config.threshold {
      return;
    }

    let mut event = Event::new(self.context.clone(), level, error, message);
    event.capture_call_site(config.frames, config.error_frames, location);
    self.dispatch.inner.dispatch_event(event);
  }
}
