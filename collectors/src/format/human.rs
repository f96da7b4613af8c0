use super::EventFormatter;
use chrono::Local;
use herald::{Event, Level, Result};
use std::fmt::Write;

// ANSI color codes, selected by severity.
const RED: u8 = 31;
const GREEN: u8 = 32;
const YELLOW: u8 = 33;
const BLUE: u8 = 34;

/// Renders events as single human-readable lines:
///
/// ```text
/// Jan  2 15:04:05 INFO server.rs:42 message[: error] key1=val1 key2=val2
/// ```
///
/// The source segment is omitted when frame capture is disabled.  Context
/// pairs are sorted by key, and values are quoted only when they contain
/// whitespace, quotes, or control characters.
pub struct HumanFormatter {
  colors: bool,
}

impl HumanFormatter {
  pub fn new() -> HumanFormatter {
    HumanFormatter { colors: false }
  }

  /// Wraps each line in an ANSI color escape by severity: DEBUG blue, INFO
  /// green, WARN yellow, ERROR and FATAL red.
  pub fn with_colors(mut self, colors: bool) -> HumanFormatter {
    self.colors = colors;
    self
  }
}

impl Default for HumanFormatter {
  fn default() -> HumanFormatter {
    HumanFormatter::new()
  }
}

impl EventFormatter for HumanFormatter {
  fn format_event(&self, event: &Event) -> Result<Vec<u8>> {
    let mut line = String::with_capacity(128);
    let _ = write!(
      line,
      "{} {}",
      event.time.with_timezone(&Local).format("%b %e %H:%M:%S"),
      event.level
    );

    if let Some(frame) = event.frames.first() {
      let short = match frame.file.rsplit_once('/') {
        Some((_, name)) => name,
        None => frame.file.as_str(),
      };
      let _ = write!(line, " {}:{}", short, frame.line);
    }

    let error_text = event.error.as_ref().map(|error| error.to_string());
    if !event.message.is_empty() {
      line.push(' ');
      push_escaped(&mut line, &event.message);
      if let Some(text) = &error_text {
        if *text != event.message {
          line.push_str(": ");
          push_escaped(&mut line, text);
        }
      }
    } else if let Some(text) = &error_text {
      line.push(' ');
      push_escaped(&mut line, text);
    }

    let fields = event.context.fields();
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();
    for key in keys {
      line.push(' ');
      push_quotable(&mut line, key);
      line.push('=');
      push_quotable(&mut line, &fields[key].to_string());
    }

    if self.colors {
      if let Some(color) = color_for(event.level) {
        line = format!("\x1b[{}m{}\x1b[0m", color, line);
      }
    }
    line.push('\n');
    Ok(line.into_bytes())
  }
}

fn color_for(level: Level) -> Option<u8> {
  match level {
    Level::Debug => Some(BLUE),
    Level::Info => Some(GREEN),
    Level::Warn => Some(YELLOW),
    Level::Error | Level::Fatal => Some(RED),
    Level::Off => None,
  }
}

/// Copies `text`, rewriting control characters and non-space whitespace as
/// escape sequences so an event can never break the line structure.
fn push_escaped(out: &mut String, text: &str) {
  for ch in text.chars() {
    if ch == ' ' || (!ch.is_control() && !ch.is_whitespace()) {
      out.push(ch);
    } else {
      out.extend(ch.escape_default());
    }
  }
}

/// Writes `text` bare when it is plain, quoted-and-escaped otherwise.
fn push_quotable(out: &mut String, text: &str) {
  if text.is_empty() {
    out.push_str("\"\"");
    return;
  }
  let special = text.chars().any(|ch| {
    matches!(ch, '"' | '\'' | '\\' | '\0') || ch.is_whitespace() || ch.is_control()
  });
  if special {
    let _ = write!(out, "{:?}", text);
  } else {
    out.push_str(text);
  }
}
