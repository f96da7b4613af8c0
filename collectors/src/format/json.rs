use super::EventFormatter;
use chrono::SecondsFormat;
use herald::{Error, Event, Result, Value};
use serde_json::{Map, Value as JsonValue};

/// Renders each event as one JSON object per line: `time` (RFC 3339 with
/// millisecond precision), `level`, `name`, `message`, plus `error`,
/// `file`/`line`, and a `fields` object when present.
pub struct JsonFormatter;

impl JsonFormatter {
  pub fn new() -> JsonFormatter {
    JsonFormatter
  }
}

impl Default for JsonFormatter {
  fn default() -> JsonFormatter {
    JsonFormatter::new()
  }
}

impl EventFormatter for JsonFormatter {
  fn format_event(&self, event: &Event) -> Result<Vec<u8>> {
    let mut object = Map::new();
    object.insert(
      "time".to_string(),
      JsonValue::String(event.time.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    object.insert(
      "level".to_string(),
      JsonValue::String(event.level.to_string()),
    );
    object.insert(
      "name".to_string(),
      JsonValue::String(event.context.name().to_string()),
    );
    object.insert(
      "message".to_string(),
      JsonValue::String(event.message.clone()),
    );
    if let Some(error) = &event.error {
      object.insert("error".to_string(), JsonValue::String(error.to_string()));
    }
    if let Some(frame) = event.frames.first() {
      object.insert("file".to_string(), JsonValue::String(frame.file.clone()));
      object.insert("line".to_string(), JsonValue::from(frame.line));
    }

    let fields = event.context.fields();
    if !fields.is_empty() {
      let mut rendered = Map::new();
      for (key, value) in fields {
        rendered.insert(key, json_value(&value));
      }
      object.insert("fields".to_string(), JsonValue::Object(rendered));
    }

    let mut bytes = serde_json::to_vec(&JsonValue::Object(object))
      .map_err(|err| Error::Collect(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
  }
}

fn json_value(value: &Value) -> JsonValue {
  match value {
    Value::Bool(v) => JsonValue::Bool(*v),
    Value::Int(v) => JsonValue::from(*v),
    Value::UInt(v) => JsonValue::from(*v),
    Value::Float(v) => match serde_json::Number::from_f64(*v) {
      Some(number) => JsonValue::Number(number),
      None => JsonValue::String(v.to_string()),
    },
    Value::String(v) => JsonValue::String(v.clone()),
  }
}
