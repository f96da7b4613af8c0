use crate::format::{EventFormatter, HumanFormatter};
use herald::{Collect, Event, Level, Result};
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

/// Writes formatted events to standard output.
///
/// The default formatter is [`HumanFormatter`] with colors enabled when
/// stdout is a terminal.  With [`TerminalCollector::errors_to_stderr`],
/// `Error` and `Fatal` events are routed to standard error instead.
pub struct TerminalCollector {
  formatter: Box<dyn EventFormatter>,
  errors_to_stderr: bool,
}

impl TerminalCollector {
  pub fn new() -> TerminalCollector {
    let colors = io::stdout().is_terminal();
    TerminalCollector {
      formatter: Box::new(HumanFormatter::new().with_colors(colors)),
      errors_to_stderr: false,
    }
  }

  pub fn formatter(mut self, formatter: impl EventFormatter) -> TerminalCollector {
    self.formatter = Box::new(formatter);
    self
  }

  pub fn errors_to_stderr(mut self, enabled: bool) -> TerminalCollector {
    self.errors_to_stderr = enabled;
    self
  }

  fn uses_stderr(&self, level: Level) -> bool {
    self.errors_to_stderr && matches!(level, Level::Error | Level::Fatal)
  }
}

impl Default for TerminalCollector {
  fn default() -> TerminalCollector {
    TerminalCollector::new()
  }
}

impl fmt::Display for TerminalCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Terminal()")
  }
}

impl Collect for TerminalCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    let bytes = self.formatter.format_event(event)?;
    if self.uses_stderr(event.level) {
      let mut output = io::stderr().lock();
      output.write_all(&bytes)?;
      output.flush()?;
    } else {
      let mut output = io::stdout().lock();
      output.write_all(&bytes)?;
      output.flush()?;
    }
    Ok(())
  }
}
