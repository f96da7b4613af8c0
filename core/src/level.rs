use std::fmt;
use std::str::FromStr;

/// Severity levels, ordered from most to least severe.
///
/// `Off` is a threshold-only value: a collector registered at `Off` receives
/// nothing, and no event is ever generated at `Off`.  A collector with
/// threshold `T` receives every event whose level `S` satisfies `S <= T`, so
/// a `Warn` collector sees `Warn`, `Error`, and `Fatal` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
  /// Threshold value that disables event collection entirely.
  Off,
  /// Conditions that are unrecoverable from the program's point of view.
  Fatal,
  /// Failures that the program can continue past.
  Error,
  /// Suspicious conditions worth surfacing.
  Warn,
  /// Routine operational messages.
  Info,
  /// Development diagnostics.
  Debug,
}

impl Level {
  /// The upper-case name of the level, as rendered in formatted output.
  pub fn as_str(&self) -> &'static str {
    match self {
      Level::Off => "OFF",
      Level::Fatal => "FATAL",
      Level::Error => "ERROR",
      Level::Warn => "WARN",
      Level::Info => "INFO",
      Level::Debug => "DEBUG",
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error returned when parsing an unrecognized level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "unrecognized level name: {}", self.0)
  }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
  type Err = ParseLevelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "OFF" => Ok(Level::Off),
      "FATAL" => Ok(Level::Fatal),
      "ERROR" => Ok(Level::Error),
      "WARN" => Ok(Level::Warn),
      "INFO" => Ok(Level::Info),
      "DEBUG" => Ok(Level::Debug),
      _ => Err(ParseLevelError(s.to_string())),
    }
  }
}
