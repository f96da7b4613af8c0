use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A map representation of contextual key/value pairs, used both to add
/// several pairs at once and as the flattened view of a [`Context`].
pub type Fields = HashMap<String, Value>;

/// A loggable value.  Values are coerced into this enum when they are added
/// to a context.  Stored values are immutable: an event referencing the
/// context may sit in an asynchronous buffer long after the call site has
/// moved on.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Bool(bool),
  Int(i64),
  UInt(u64),
  Float(f64),
  String(String),
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Bool(v) => write!(f, "{}", v),
      Value::Int(v) => write!(f, "{}", v),
      Value::UInt(v) => write!(f, "{}", v),
      Value::Float(v) => write!(f, "{}", v),
      Value::String(v) => f.write_str(v),
    }
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Value {
    Value::Bool(v)
  }
}

impl From<i32> for Value {
  fn from(v: i32) -> Value {
    Value::Int(v.into())
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Value {
    Value::Int(v)
  }
}

impl From<u32> for Value {
  fn from(v: u32) -> Value {
    Value::UInt(v.into())
  }
}

impl From<u64> for Value {
  fn from(v: u64) -> Value {
    Value::UInt(v)
  }
}

impl From<usize> for Value {
  fn from(v: usize) -> Value {
    Value::UInt(v as u64)
  }
}

impl From<f32> for Value {
  fn from(v: f32) -> Value {
    Value::Float(v.into())
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Value {
    Value::Float(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Value {
    Value::String(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Value {
    Value::String(v)
  }
}

/// A named, immutable collection of key/value pairs.
///
/// Deriving a new context via [`Context::with_value`] or
/// [`Context::with_fields`] never mutates the receiver: derived contexts
/// share structure with their parents, so they are cheap to create and safe
/// to read from any thread.
///
/// Any key except the empty string is valid.  Storing duplicate keys is
/// allowed, but the resulting behavior is currently unspecified.
#[derive(Debug, Clone)]
pub struct Context {
  name: Arc<str>,
  head: Option<Arc<Pair>>,
}

#[derive(Debug)]
struct Pair {
  key: String,
  value: Value,
  prev: Option<Arc<Pair>>,
}

impl Context {
  /// Returns a new, empty context with the given name.
  pub fn new(name: impl Into<String>) -> Context {
    Context {
      name: Arc::from(name.into()),
      head: None,
    }
  }

  /// Returns a new context with the given name, containing all the
  /// key/value pairs of the provided contexts.
  pub fn join<'a, I>(name: impl Into<String>, contexts: I) -> Context
  where
    I: IntoIterator<Item = &'a Context>,
  {
    let mut joined = Context::new(name);
    for context in contexts {
      let mut pairs = Vec::new();
      context.each(|key, value| pairs.push((key.to_string(), value.clone())));
      for (key, value) in pairs.into_iter().rev() {
        joined = joined.with_value(key, value);
      }
    }
    joined
  }

  /// The name the context was created with.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The number of stored pairs.  Duplicate keys are counted once per
  /// insertion.
  pub fn len(&self) -> usize {
    let mut count = 0;
    let mut current = self.head.as_ref();
    while let Some(pair) = current {
      count += 1;
      current = pair.prev.as_ref();
    }
    count
  }

  /// Whether the context holds no pairs.
  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Calls `f` on each key/value pair, most recently added first.
  /// Duplicate keys are visited once per insertion.
  pub fn each(&self, mut f: impl FnMut(&str, &Value)) {
    let mut current = self.head.as_ref();
    while let Some(pair) = current {
      f(&pair.key, &pair.value);
      current = pair.prev.as_ref();
    }
  }

  /// Returns a map view of the pairs.  When a key was stored more than
  /// once, the most recently added value wins.
  pub fn fields(&self) -> Fields {
    let mut ordered = Vec::new();
    self.each(|key, value| ordered.push((key.to_string(), value.clone())));
    let mut fields = Fields::with_capacity(ordered.len());
    for (key, value) in ordered.into_iter().rev() {
      fields.insert(key, value);
    }
    fields
  }

  /// Returns a new context extending `self` with one additional pair.
  /// An empty key is rejected: the receiver is returned unchanged.
  pub fn with_value(&self, key: impl Into<String>, value: impl Into<Value>) -> Context {
    let key = key.into();
    if key.is_empty() {
      return self.clone();
    }
    Context {
      name: Arc::clone(&self.name),
      head: Some(Arc::new(Pair {
        key,
        value: value.into(),
        prev: self.head.clone(),
      })),
    }
  }

  /// Returns a new context extending `self` with every pair from `fields`.
  pub fn with_fields(&self, fields: Fields) -> Context {
    let mut context = self.clone();
    for (key, value) in fields {
      context = context.with_value(key, value);
    }
    context
  }
}

impl fmt::Display for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Context(name={})", self.name)
  }
}
