//! # Herald
//!
//! A structured event logging core with pluggable collectors, built for
//! programs that cannot let logging failures take them down.
//!
//! # Features
//! - **Severity Routing**: Collectors subscribe at a threshold; an event
//!   reaches every collector whose threshold admits its level.
//! - **Structured Context**: Loggers carry immutable key/value contexts;
//!   derived loggers extend them without copying what came before.
//! - **Sync & Buffered Delivery**: Collectors run synchronously on the
//!   logging thread, or behind a bounded queue that never blocks it.
//! - **Degradation & Recovery**: Failing collectors are retried with
//!   exponential backoff and muted until they accept events again, with
//!   notifications broadcast to the healthy collectors.
//! - **Panic Isolation**: A panicking collector is disposed and reported;
//!   the logging call that hit it carries on.
//! - **Coordinated Shutdown**: [`close`] drains in-flight events, flushes
//!   buffers, and resets cleanly, all under a caller-chosen timeout.
//!
//! # Quick Start
//!
//! ```
//! use herald::{Collect, Dispatch, Event, Level, Result};
//! use std::fmt;
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! // A collector that keeps event messages in memory.
//! struct Memory {
//!   lines: Mutex<Vec<String>>,
//! }
//!
//! impl fmt::Display for Memory {
//!   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!     f.write_str("Memory()")
//!   }
//! }
//!
//! impl Collect for Memory {
//!   fn collect(&self, event: &Arc<Event>) -> Result<()> {
//!     self.lines.lock().unwrap().push(event.message.clone());
//!     Ok(())
//!   }
//! }
//!
//! let dispatch = Dispatch::new();
//! let memory = Arc::new(Memory { lines: Mutex::new(Vec::new()) });
//! dispatch.register(Level::Info, Arc::clone(&memory) as Arc<dyn Collect>);
//!
//! let log = dispatch.logger("example").with_value("user", "ada");
//! log.info("says hello");
//! log.debug("not collected at this threshold");
//!
//! dispatch.close(Duration::from_secs(5)).unwrap();
//! assert_eq!(*memory.lines.lock().unwrap(), ["says hello"]);
//! ```
//!
//! Most programs register collectors on [`global`] once at startup and log
//! through [`Logger::new`] everywhere else.

mod collect;
mod config;
mod context;
mod dispatch;
mod error;
mod event;
mod frame;
mod global;
mod level;
mod logger;
mod worker;

// Re-export the primary user-facing types for convenience
pub use collect::Collect;
pub use context::{Context, Fields, Value};
pub use dispatch::Dispatch;
pub use error::{Error, Result, SharedError};
pub use event::Event;
pub use frame::{Frame, UNKNOWN_FILE, UNKNOWN_FUNCTION, UNKNOWN_PACKAGE};
pub use global::{close, global};
pub use level::{Level, ParseLevelError};
pub use logger::Logger;
