//! # Herald Collectors
//!
//! Ready-made collector adapters and output formatting for the
//! [`herald`] structured logging core.
//!
//! ## Features
//!
//! *   **Terminal Output**: Human-readable lines on stdout with automatic
//!     color detection, optionally routing errors to stderr.
//! *   **File Output**: Lazily-opened append-only log files that cooperate
//!     with external rotators.
//! *   **Socket Output**: TCP and UDP shippers with lazy connect and
//!     reconnect-on-failure.
//! *   **Formatting**: A pluggable [`EventFormatter`] trait with
//!     human-readable and JSON-lines implementations.
//! *   **Pipelines**: Immutable filter/transform chains attachable in front
//!     of any collector.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use herald::Level;
//! use herald_collectors::{Pipeline, TerminalCollector};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> herald::Result<()> {
//!   // Everything at Info and above goes to the terminal, errors to stderr.
//!   let terminal = Arc::new(TerminalCollector::new().errors_to_stderr(true));
//!   herald::global().register(Level::Info, terminal);
//!
//!   // Debug noise from the wire module goes to a file.
//!   let wire = Pipeline::new()
//!     .filter(|event| event.context.name() == "wire")
//!     .attach(Arc::new(herald_collectors::FileCollector::new("wire.log")));
//!   herald::global().register_buffered(Level::Debug, 1024, Arc::new(wire));
//!
//!   let log = herald::Logger::new("wire");
//!   log.info("connection accepted");
//!
//!   herald::close(Duration::from_secs(5))
//! }
//! ```

mod file;
mod pipeline;
mod socket;
mod terminal;

pub mod format;

// Re-export the primary user-facing types for convenience.
pub use file::FileCollector;
pub use format::{EventFormatter, HumanFormatter, JsonFormatter};
pub use pipeline::{Pipeline, PipelineCollector};
pub use socket::SocketCollector;
pub use terminal::TerminalCollector;
