// Strategies for rendering events into byte streams.

use herald::{Event, Result};

pub mod human;
pub mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

/// Trait for types that can render an [`Event`] into a byte vector.
///
/// Implementations are line-oriented: the returned bytes end with a newline
/// so adapters can write them as-is.
pub trait EventFormatter: Send + Sync + 'static {
  fn format_event(&self, event: &Event) -> Result<Vec<u8>>;
}
