//! The dispatch hub: owns the collector registry and fans events out to
//! the delivery workers.  Mutations copy the current snapshot, so logging
//! threads never wait on registration, disposal, or level changes.

use crate::collect::Collect;
use crate::config::{AtomicConfig, CollectorId, Config, Entry};
use crate::context::{Context, Fields};
use crate::error::{Error, Result, SharedError};
use crate::event::Event;
use crate::level::Level;
use crate::logger::Logger;
use crate::worker::new_worker;
use crossbeam_channel::bounded;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Context name carried by events the library emits about itself:
/// degradation notices, recovery notices, and collector failures.
pub(crate) const INTERNAL_CONTEXT: &str = "herald";

/// Routes events to registered collectors.
///
/// A `Dispatch` is a cheap clonable handle; clones share the same registry.
/// Most programs use the process-wide instance through [`crate::global`],
/// but independent instances can be created for tests or embedded use.
#[derive(Clone)]
pub struct Dispatch {
  pub(crate) inner: Arc<DispatchInner>,
}

impl Default for Dispatch {
  fn default() -> Dispatch {
    Dispatch::new()
  }
}

impl Dispatch {
  pub fn new() -> Dispatch {
    Dispatch {
      inner: Arc::new(DispatchInner {
        config: AtomicConfig::new(),
        sending: AtomicUsize::new(0),
      }),
    }
  }

  /// Registers a collector for synchronous delivery.  Events at or below
  /// `threshold` block the logging call until the collector accepts them.
  /// Registering the same collector handle again is a no-op; use
  /// [`Dispatch::set_level`] to change a live threshold.
  pub fn register(&self, threshold: Level, collector: Arc<dyn Collect>) {
    self.inner.register_worker(threshold, 0, collector);
  }

  /// Registers a collector for buffered delivery through a queue of
  /// `capacity` events.  Logging calls never block on this collector: when
  /// the queue is full the event is dropped and counted, and the drop
  /// total is reported through the degradation cycle.  A zero capacity
  /// falls back to synchronous delivery.
  pub fn register_buffered(&self, threshold: Level, capacity: usize, collector: Arc<dyn Collect>) {
    self.inner.register_worker(threshold, capacity, collector);
  }

  /// Changes a registered collector's threshold.  `Level::Off` mutes the
  /// collector without unregistering it.  Unknown collectors are ignored.
  pub fn set_level(&self, collector: &Arc<dyn Collect>, threshold: Level) {
    self.inner.set_threshold(collector, threshold);
  }

  /// Sets how many call-site frames events carry: `frames` for debug,
  /// info, and warn events, `error_frames` for error and fatal events.
  /// Zero disables capture for that group.
  pub fn set_frames(&self, frames: usize, error_frames: usize) {
    self.inner.set_frames(frames, error_frames);
  }

  /// Unregisters a collector, discards anything buffered for it, and
  /// closes it.  Unknown collectors are ignored.
  pub fn dispose(&self, collector: &Arc<dyn Collect>) {
    self.inner.dispose_collector(collector);
  }

  /// Whether any registered, healthy collector would receive an event at
  /// `level`.
  pub fn enabled_for(&self, level: Level) -> bool {
    level != Level::Off && level <= self.inner.config.current().threshold
  }

  /// A logger bound to this dispatch under the given context name.
  pub fn logger(&self, name: &str) -> Logger {
    Logger::bound(self.clone(), name)
  }

  /// Flushes buffered events and resets the dispatch to its initial
  /// state: no collectors, default frame counts.  In-flight logging calls
  /// are drained first, then every worker is terminated in parallel with
  /// a final flush.  Returns [`Error::FlushTimeout`] if that takes longer
  /// than `timeout`; termination keeps running in the background in that
  /// case.  Safe to call repeatedly.
  pub fn close(&self, timeout: Duration) -> Result<()> {
    let inner = Arc::clone(&self.inner);
    let (done_tx, done_rx) = bounded(1);
    thread::spawn(move || {
      inner.terminate_all();
      let _ = done_tx.send(());
    });
    match done_rx.recv_timeout(timeout) {
      Ok(()) => Ok(()),
      Err(_) => Err(Error::FlushTimeout),
    }
  }
}

pub(crate) struct DispatchInner {
  config: AtomicConfig,
  /// Logging calls currently fanning out an event.  Termination waits for
  /// this to drain so workers never see a send after their shutdown.
  sending: AtomicUsize,
}

impl DispatchInner {
  fn register_worker(
    self: &Arc<Self>,
    threshold: Level,
    capacity: usize,
    collector: Arc<dyn Collect>,
  ) {
    let _guard = self.config.lock_mutations();
    let current = self.config.current();
    let id = CollectorId::of(&collector);
    if current.registry.contains_key(&id) {
      return;
    }

    let worker = new_worker(Arc::downgrade(self), Arc::clone(&collector), capacity);
    let mut next = (*current).clone();
    next.registry.insert(
      id,
      Entry {
        threshold,
        degraded: false,
        worker,
        collector,
      },
    );
    next.update_threshold();
    self.config.publish(Arc::new(next));
  }

  fn set_threshold(&self, collector: &Arc<dyn Collect>, threshold: Level) {
    let _guard = self.config.lock_mutations();
    let current = self.config.current();
    let id = CollectorId::of(collector);
    if !current.registry.contains_key(&id) {
      return;
    }

    let mut next = (*current).clone();
    if let Some(entry) = next.registry.get_mut(&id) {
      entry.threshold = threshold;
    }
    next.update_threshold();
    self.config.publish(Arc::new(next));
  }

  fn set_frames(&self, frames: usize, error_frames: usize) {
    let _guard = self.config.lock_mutations();
    let mut next = (*self.config.current()).clone();
    next.frames = frames;
    next.error_frames = error_frames;
    self.config.publish(Arc::new(next));
  }

  /// Called by workers when a collector starts or stops failing.  A
  /// degraded entry stops receiving events and no longer contributes to
  /// the global threshold.
  pub(crate) fn set_degraded(&self, collector: &Arc<dyn Collect>, degraded: bool) {
    let _guard = self.config.lock_mutations();
    let current = self.config.current();
    let id = CollectorId::of(collector);
    if !current.registry.contains_key(&id) {
      return;
    }

    let mut next = (*current).clone();
    if let Some(entry) = next.registry.get_mut(&id) {
      entry.degraded = degraded;
    }
    next.update_threshold();
    self.config.publish(Arc::new(next));
  }

  pub(crate) fn dispose_collector(&self, collector: &Arc<dyn Collect>) {
    let _guard = self.config.lock_mutations();
    let current = self.config.current();
    let id = CollectorId::of(collector);
    let entry = match current.registry.get(&id) {
      Some(entry) => entry.clone(),
      None => return,
    };

    let mut next = (*current).clone();
    next.registry.remove(&id);
    next.update_threshold();
    self.config.publish(Arc::new(next));

    // Terminated under the mutation guard so re-registering the same
    // collector cannot race the old worker's shutdown.
    entry.worker.terminate(false);
  }

  pub(crate) fn current_config(&self) -> Arc<Config> {
    self.config.current()
  }

  /// Fans one event out to every eligible collector.  All workers receive
  /// the same shared allocation.
  pub(crate) fn dispatch_event(&self, event: Event) {
    let _guard = InFlightGuard::enter(&self.sending);
    let event = Arc::new(event);
    for entry in self.config.current().registry.values() {
      if event.level <= entry.threshold && !entry.degraded {
        entry.worker.send(Arc::clone(&event));
      }
    }
  }

  /// Emits an event under the library's own context name.
  pub(crate) fn emit_internal(
    &self,
    level: Level,
    error: Option<SharedError>,
    fields: Fields,
    message: String,
  ) {
    let config = self.config.current();
    if level > config.threshold {
      return;
    }

    let context = Context::new(INTERNAL_CONTEXT).with_fields(fields);
    let mut event = Event::new(context, level, error, message);
    event.capture_call_site(config.frames, config.error_frames, Location::caller());
    self.dispatch_event(event);
  }

  fn terminate_all(&self) {
    let _guard = self.config.lock_mutations();
    let displaced = self.config.current();
    self.config.publish(Arc::new(Config::default()));

    // Workers must not observe a send after termination starts, so wait
    // out the logging calls that loaded the displaced snapshot.
    while self.sending.load(Ordering::SeqCst) != 0 {
      thread::yield_now();
    }

    let mut flushes = Vec::with_capacity(displaced.registry.len());
    for entry in displaced.registry.values() {
      let worker = Arc::clone(&entry.worker);
      flushes.push(thread::spawn(move || worker.terminate(true)));
    }
    for flush in flushes {
      let _ = flush.join();
    }
  }
}

struct InFlightGuard<'a> {
  sending: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
  fn enter(sending: &'a AtomicUsize) -> InFlightGuard<'a> {
    sending.fetch_add(1, Ordering::SeqCst);
    InFlightGuard { sending }
  }
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.sending.fetch_sub(1, Ordering::SeqCst);
  }
}
