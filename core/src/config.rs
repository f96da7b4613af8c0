use crate::collect::Collect;
use crate::level::Level;
use crate::worker::Worker;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) const DEFAULT_FRAMES: usize = 1;
pub(crate) const DEFAULT_ERROR_FRAMES: usize = 1;

/// Registry identity of a collector: the address of its `Arc` allocation.
/// Clones of one `Arc` share an identity; two separately constructed
/// collectors are always distinct, even if their configuration matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CollectorId(usize);

impl CollectorId {
  pub(crate) fn of(collector: &Arc<dyn Collect>) -> CollectorId {
    CollectorId(Arc::as_ptr(collector) as *const () as usize)
  }
}

/// Per-collector delivery settings.  Cloning an entry copies the settings
/// but shares the worker and collector handles.
#[derive(Clone)]
pub(crate) struct Entry {
  pub(crate) threshold: Level,
  pub(crate) degraded: bool,
  pub(crate) worker: Arc<dyn Worker>,
  pub(crate) collector: Arc<dyn Collect>,
}

/// One immutable configuration snapshot.  Mutators clone the current
/// snapshot, adjust the clone, and publish it; dispatchers iterate whatever
/// snapshot they loaded and are never affected by later mutations.
#[derive(Clone)]
pub(crate) struct Config {
  /// Cached maximum threshold over all non-degraded entries, `Off` when
  /// there are none.  Lets the hot path skip event construction outright.
  pub(crate) threshold: Level,
  pub(crate) frames: usize,
  pub(crate) error_frames: usize,
  pub(crate) registry: HashMap<CollectorId, Entry>,
}

impl Default for Config {
  fn default() -> Config {
    Config {
      threshold: Level::Off,
      frames: DEFAULT_FRAMES,
      error_frames: DEFAULT_ERROR_FRAMES,
      registry: HashMap::new(),
    }
  }
}

impl Config {
  /// Recomputes the cached global threshold.  Only meaningful on a fresh
  /// clone that is about to be published.
  pub(crate) fn update_threshold(&mut self) {
    self.threshold = self
      .registry
      .values()
      .filter(|entry| !entry.degraded)
      .map(|entry| entry.threshold)
      .max()
      .unwrap_or(Level::Off);
  }
}

/// Holder for the current configuration snapshot.
///
/// Reads clone the current `Arc` under a read lock that writers only take
/// for the pointer store itself; all mutation work (cloning the config,
/// adjusting it, recomputing the threshold) happens outside the write
/// section, serialized by the separate mutation mutex.
pub(crate) struct AtomicConfig {
  mutation: Mutex<()>,
  current: RwLock<Arc<Config>>,
}

impl AtomicConfig {
  pub(crate) fn new() -> AtomicConfig {
    AtomicConfig {
      mutation: Mutex::new(()),
      current: RwLock::new(Arc::new(Config::default())),
    }
  }

  /// The current snapshot.
  pub(crate) fn current(&self) -> Arc<Config> {
    Arc::clone(&self.current.read())
  }

  /// Serializes a mutation sequence.  Hold the guard across
  /// `current`/`publish` pairs so concurrent mutators cannot interleave.
  pub(crate) fn lock_mutations(&self) -> MutexGuard<'_, ()> {
    self.mutation.lock()
  }

  /// Publishes a new snapshot.  Callers must hold the mutation guard.
  pub(crate) fn publish(&self, config: Arc<Config>) {
    *self.current.write() = config;
  }
}
