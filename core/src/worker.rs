//! Delivery workers.  Each registered collector is driven by exactly one
//! worker: synchronous workers deliver on the calling thread, buffered
//! workers enqueue onto a bounded channel drained by a background thread.
//! Failed deliveries push the collector through the degradation cycle
//! without ever blocking the threads that log.

use crate::collect::Collect;
use crate::context::{Context, Fields, Value};
use crate::dispatch::{DispatchInner, INTERNAL_CONTEXT};
use crate::error::{Error, Result, SharedError};
use crate::event::Event;
use crate::level::Level;
use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Number of immediate `collect` retries before an event counts as dropped.
const SEND_RETRIES: usize = 2;

/// Ceiling for the exponential backoff between recovery attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Delivery endpoint for one registered collector.
pub(crate) trait Worker: Send + Sync {
  /// Hands an event to the collector.  Must not panic, and must be a no-op
  /// after `terminate`.
  fn send(&self, event: Arc<Event>);

  /// Stops the worker and closes the collector.  A buffered worker drains
  /// its queue first when `flush` is set.  Callable more than once; only
  /// the first call does the work.
  fn terminate(&self, flush: bool);
}

/// A capacity of zero selects synchronous delivery.
pub(crate) fn new_worker(
  hub: Weak<DispatchInner>,
  collector: Arc<dyn Collect>,
  capacity: usize,
) -> Arc<dyn Worker> {
  if capacity == 0 {
    Arc::new(SyncWorker::new(hub, collector))
  } else {
    Arc::new(AsyncWorker::new(hub, collector, capacity))
  }
}

enum Delivery {
  Delivered,
  Failed(Error),
  Panicked(Box<dyn Any + Send>),
}

/// Runs the retry cycle with panics contained.  A panic on any attempt
/// abandons the event.
fn deliver_with_retries(collector: &Arc<dyn Collect>, event: &Arc<Event>) -> Delivery {
  match panic::catch_unwind(AssertUnwindSafe(|| attempt_delivery(collector, event))) {
    Ok(Ok(())) => Delivery::Delivered,
    Ok(Err(err)) => Delivery::Failed(err),
    Err(cause) => Delivery::Panicked(cause),
  }
}

/// The first error is the one reported; retry errors are discarded.
fn attempt_delivery(collector: &Arc<dyn Collect>, event: &Arc<Event>) -> Result<()> {
  let first = match collector.collect(event) {
    Ok(()) => return Ok(()),
    Err(err) => err,
  };
  for _ in 0..SEND_RETRIES {
    if collector.collect(event).is_ok() {
      return Ok(());
    }
  }
  Err(first)
}

fn backoff(attempt: u32) -> Duration {
  match 2u64.checked_pow(attempt) {
    Some(millis) => MAX_BACKOFF.min(Duration::from_millis(millis)),
    None => MAX_BACKOFF,
  }
}

pub(crate) fn panic_text(cause: &(dyn Any + Send)) -> String {
  if let Some(text) = cause.downcast_ref::<&str>() {
    (*text).to_string()
  } else if let Some(text) = cause.downcast_ref::<String>() {
    text.clone()
  } else {
    "unknown panic payload".to_string()
  }
}

enum RecoveryOutcome {
  /// The collector accepted the recovery narrative, or panicked and was
  /// handed off for disposal.
  Finished,
  /// Termination arrived while waiting between attempts.  The config is
  /// left untouched; the caller owns the shutdown from here.
  Interrupted { flush: bool },
}

/// Marks the collector degraded, announces it to the healthy collectors,
/// then periodically offers the collector a recovery narrative until one
/// delivery succeeds.  Runs until recovery or until `interrupt` yields a
/// termination flag (or disconnects).
fn run_degradation(
  hub: &Weak<DispatchInner>,
  collector: &Arc<dyn Collect>,
  error: Error,
  drops: u64,
  interrupt: &Receiver<bool>,
) -> RecoveryOutcome {
  let since = Local::now();
  let shared: SharedError = Arc::new(error);

  if let Some(hub) = hub.upgrade() {
    hub.set_degraded(collector, true);
  }
  broadcast_degraded(hub, collector, &shared, drops);

  let mut attempt: u32 = 0;
  loop {
    attempt += 1;
    match interrupt.recv_timeout(backoff(attempt)) {
      Ok(flush) => return RecoveryOutcome::Interrupted { flush },
      Err(RecvTimeoutError::Disconnected) => return RecoveryOutcome::Interrupted { flush: false },
      Err(RecvTimeoutError::Timeout) => {}
    }

    let event = narrative_event(collector, &shared, since, attempt, drops);
    match panic::catch_unwind(AssertUnwindSafe(|| collector.collect(&event))) {
      Ok(Ok(())) => break,
      Ok(Err(_)) => {}
      Err(cause) => {
        report_collector_panic(hub, collector, cause);
        return RecoveryOutcome::Finished;
      }
    }
  }

  if let Some(hub) = hub.upgrade() {
    hub.set_degraded(collector, false);
  }
  broadcast_recovered(hub, collector);
  RecoveryOutcome::Finished
}

fn narrative_event(
  collector: &Arc<dyn Collect>,
  error: &SharedError,
  since: DateTime<Local>,
  attempt: u32,
  drops: u64,
) -> Arc<Event> {
  let context = Context::new(INTERNAL_CONTEXT).with_fields(Fields::from([
    ("attempts".to_string(), Value::from(attempt)),
    ("drops".to_string(), Value::from(drops)),
  ]));
  let message = format!(
    "The current collector, {}, has been in a degraded state since {}.  Delivery of this message has been attempted {} times",
    collector,
    since.format("%b %e %H:%M:%S"),
    attempt
  );
  Arc::new(Event::new(
    context,
    Level::Error,
    Some(Arc::clone(error)),
    message,
  ))
}

/// Announcements run on their own threads so that slow sibling collectors
/// never delay the recovery loop.
fn broadcast_degraded(
  hub: &Weak<DispatchInner>,
  collector: &Arc<dyn Collect>,
  error: &SharedError,
  drops: u64,
) {
  let hub = match hub.upgrade() {
    Some(hub) => hub,
    None => return,
  };
  let collector = Arc::clone(collector);
  let error = Arc::clone(error);
  thread::spawn(move || {
    let fields = Fields::from([("drops".to_string(), Value::from(drops))]);
    hub.emit_internal(
      Level::Error,
      Some(error),
      fields,
      format!("Collector has entered a degraded state: {}", collector),
    );
  });
}

fn broadcast_recovered(hub: &Weak<DispatchInner>, collector: &Arc<dyn Collect>) {
  let hub = match hub.upgrade() {
    Some(hub) => hub,
    None => return,
  };
  let collector = Arc::clone(collector);
  thread::spawn(move || {
    hub.emit_internal(
      Level::Warn,
      None,
      Fields::new(),
      format!("Collector has recovered from a degraded state: {}", collector),
    );
  });
}

/// Disposal and the fatal announcement run on a fresh thread: disposing an
/// asynchronous collector joins its delivery thread, which may be the
/// thread observing the panic.
fn report_collector_panic(
  hub: &Weak<DispatchInner>,
  collector: &Arc<dyn Collect>,
  cause: Box<dyn Any + Send>,
) {
  let hub = match hub.upgrade() {
    Some(hub) => hub,
    None => return,
  };
  let collector = Arc::clone(collector);
  thread::spawn(move || {
    hub.dispose_collector(&collector);
    let error: SharedError = Arc::new(Error::Panic(panic_text(cause.as_ref())));
    hub.emit_internal(
      Level::Fatal,
      Some(error),
      Fields::new(),
      format!(
        "Recovered from collector panic. Collector has been disposed: {}",
        collector
      ),
    );
  });
}

fn close_collector(hub: &Weak<DispatchInner>, collector: &Arc<dyn Collect>) {
  let error: SharedError = match panic::catch_unwind(AssertUnwindSafe(|| collector.close())) {
    Ok(Ok(())) => return,
    Ok(Err(err)) => Arc::new(err),
    Err(cause) => Arc::new(Error::Panic(panic_text(cause.as_ref()))),
  };
  if let Some(hub) = hub.upgrade() {
    hub.emit_internal(
      Level::Error,
      Some(error),
      Fields::new(),
      format!("Failed to close collector {}", collector),
    );
  }
}

struct SyncState {
  terminated: bool,
  drops: u64,
}

/// Delivers on the calling thread.  Degradation recovery is pushed onto a
/// dedicated thread so a failing collector costs its callers one failed
/// retry cycle, not the whole backoff loop.
struct SyncWorker {
  hub: Weak<DispatchInner>,
  collector: Arc<dyn Collect>,
  state: Mutex<SyncState>,
  recovering: Arc<AtomicBool>,
  interrupt_tx: Mutex<Option<Sender<bool>>>,
  interrupt_rx: Receiver<bool>,
}

impl SyncWorker {
  fn new(hub: Weak<DispatchInner>, collector: Arc<dyn Collect>) -> SyncWorker {
    let (interrupt_tx, interrupt_rx) = bounded(1);
    SyncWorker {
      hub,
      collector,
      state: Mutex::new(SyncState {
        terminated: false,
        drops: 0,
      }),
      recovering: Arc::new(AtomicBool::new(false)),
      interrupt_tx: Mutex::new(Some(interrupt_tx)),
      interrupt_rx,
    }
  }

  fn start_recovery(&self, error: Error, drops: u64) {
    // Only one recovery loop per collector.
    if self.recovering.swap(true, Ordering::AcqRel) {
      return;
    }
    let hub = self.hub.clone();
    let collector = Arc::clone(&self.collector);
    let interrupt = self.interrupt_rx.clone();
    let recovering = Arc::clone(&self.recovering);
    thread::spawn(move || {
      run_degradation(&hub, &collector, error, drops, &interrupt);
      recovering.store(false, Ordering::Release);
    });
  }
}

impl Worker for SyncWorker {
  fn send(&self, event: Arc<Event>) {
    let mut state = self.state.lock();
    if state.terminated {
      return;
    }
    match deliver_with_retries(&self.collector, &event) {
      Delivery::Delivered => {}
      Delivery::Failed(err) => {
        state.drops += 1;
        let drops = state.drops;
        drop(state);
        self.start_recovery(err, drops);
      }
      Delivery::Panicked(cause) => {
        drop(state);
        report_collector_panic(&self.hub, &self.collector, cause);
      }
    }
  }

  fn terminate(&self, _flush: bool) {
    let mut state = self.state.lock();
    if state.terminated {
      return;
    }
    state.terminated = true;
    // Dropping the sender wakes any sleeping recovery loop, which then
    // abandons the collector without touching the registry.
    self.interrupt_tx.lock().take();
    close_collector(&self.hub, &self.collector);
  }
}

/// Buffered delivery.  Events are queued with `try_send`; a full queue
/// increments the drop counter instead of blocking the logging thread.
struct AsyncWorker {
  drops: Arc<AtomicU64>,
  queue_tx: Mutex<Option<Sender<Arc<Event>>>>,
  control_tx: Sender<bool>,
  finished_rx: Receiver<()>,
}

impl AsyncWorker {
  fn new(hub: Weak<DispatchInner>, collector: Arc<dyn Collect>, capacity: usize) -> AsyncWorker {
    let (queue_tx, queue_rx) = bounded(capacity);
    // Capacity 1 lets terminate hand off the flush flag without a rendezvous.
    let (control_tx, control_rx) = bounded(1);
    let (finished_tx, finished_rx) = bounded(0);
    let drops = Arc::new(AtomicU64::new(0));
    let driver = DeliveryLoop {
      hub,
      collector,
      queue_rx,
      control_rx,
      drops: Arc::clone(&drops),
      last_drops: 0,
    };
    thread::spawn(move || {
      // Held so the handle's terminate unblocks exactly when the loop exits.
      let _finished = finished_tx;
      driver.run();
    });
    AsyncWorker {
      drops,
      queue_tx: Mutex::new(Some(queue_tx)),
      control_tx,
      finished_rx,
    }
  }
}

impl Worker for AsyncWorker {
  fn send(&self, event: Arc<Event>) {
    if let Some(queue) = self.queue_tx.lock().as_ref() {
      match queue.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
          self.drops.fetch_add(1, Ordering::Relaxed);
        }
        Err(TrySendError::Disconnected(_)) => {}
      }
    }
  }

  fn terminate(&self, flush: bool) {
    let queue = self.queue_tx.lock().take();
    if queue.is_none() {
      return;
    }
    // Closing the queue first guarantees the drain in cleanup sees every
    // event that was accepted before termination.
    drop(queue);
    let _ = self.control_tx.send(flush);
    let _ = self.finished_rx.recv();
  }
}

struct DeliveryLoop {
  hub: Weak<DispatchInner>,
  collector: Arc<dyn Collect>,
  queue_rx: Receiver<Arc<Event>>,
  control_rx: Receiver<bool>,
  drops: Arc<AtomicU64>,
  last_drops: u64,
}

impl DeliveryLoop {
  fn run(mut self) {
    loop {
      select! {
        recv(self.queue_rx) -> received => {
          let event = match received {
            Ok(event) => event,
            Err(_) => {
              // Queue sender gone: either terminate closed it, in which
              // case the flush flag follows on control, or the handle was
              // dropped without terminating.
              let flush = self.control_rx.recv().unwrap_or(false);
              self.cleanup(flush, None);
              return;
            }
          };
          if let Some(flush) = self.reconcile_drops() {
            self.cleanup(flush, Some(event));
            return;
          }
          if let Some(flush) = self.deliver(&event) {
            self.cleanup(flush, None);
            return;
          }
        }
        recv(self.control_rx) -> flush => {
          self.cleanup(flush.unwrap_or(false), None);
          return;
        }
      }
    }
  }

  /// Reports queue overflow before the next delivery, so the drop notice
  /// precedes the events that followed the overflow.  Returns the flush
  /// flag when termination interrupted the degradation cycle.
  fn reconcile_drops(&mut self) -> Option<bool> {
    let drops = self.drops.load(Ordering::Relaxed);
    if drops <= self.last_drops {
      return None;
    }
    self.last_drops = drops;
    match run_degradation(
      &self.hub,
      &self.collector,
      Error::Drops,
      drops,
      &self.control_rx,
    ) {
      RecoveryOutcome::Finished => None,
      RecoveryOutcome::Interrupted { flush } => Some(flush),
    }
  }

  fn deliver(&mut self, event: &Arc<Event>) -> Option<bool> {
    match deliver_with_retries(&self.collector, event) {
      Delivery::Delivered => None,
      Delivery::Failed(err) => {
        let drops = self.drops.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_drops = drops;
        match run_degradation(&self.hub, &self.collector, err, drops, &self.control_rx) {
          RecoveryOutcome::Finished => None,
          RecoveryOutcome::Interrupted { flush } => Some(flush),
        }
      }
      Delivery::Panicked(cause) => {
        report_collector_panic(&self.hub, &self.collector, cause);
        None
      }
    }
  }

  /// Terminal drain.  Events get the plain retry cycle here, not the
  /// degradation loop: nothing can recover a collector that is shutting
  /// down, and the drain must stay bounded.
  fn flush_delivery(&mut self, event: &Arc<Event>) -> bool {
    match deliver_with_retries(&self.collector, event) {
      Delivery::Delivered => true,
      Delivery::Failed(_) => {
        self.drops.fetch_add(1, Ordering::Relaxed);
        true
      }
      Delivery::Panicked(cause) => {
        report_collector_panic(&self.hub, &self.collector, cause);
        false
      }
    }
  }

  fn cleanup(&mut self, flush: bool, pending: Option<Arc<Event>>) {
    if flush {
      let mut drainable = match pending {
        Some(event) => self.flush_delivery(&event),
        None => true,
      };
      while drainable {
        match self.queue_rx.try_recv() {
          Ok(event) => drainable = self.flush_delivery(&event),
          Err(_) => break,
        }
      }
    }
    close_collector(&self.hub, &self.collector);
  }
}
