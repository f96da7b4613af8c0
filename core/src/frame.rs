use std::fmt;
use std::panic::Location;

/// Placeholder used when the package of a call site cannot be determined.
pub const UNKNOWN_PACKAGE: &str = "<unknown package>";
/// Placeholder used when the function of a call site cannot be determined.
pub const UNKNOWN_FUNCTION: &str = "<unknown function>";
/// Placeholder used when the source file of a call site cannot be determined.
pub const UNKNOWN_FILE: &str = "<unknown file>";

/// A single call-site record attached to an event.
///
/// Fields that cannot be resolved hold the `UNKNOWN_*` placeholders (line 0
/// for an unknown line).  Call-site attribution relies on
/// `#[track_caller]`, which yields the file and line of the logging call;
/// package and function names are not resolvable that way and always carry
/// their placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub package: String,
  pub function: String,
  pub file: String,
  pub line: u32,
}

impl Frame {
  pub(crate) fn from_location(location: &Location<'_>) -> Frame {
    Frame {
      package: UNKNOWN_PACKAGE.to_string(),
      function: UNKNOWN_FUNCTION.to_string(),
      file: location.file().to_string(),
      line: location.line(),
    }
  }
}

impl fmt::Display for Frame {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.file, self.line)
  }
}
