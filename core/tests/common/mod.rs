#![allow(dead_code)]

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use herald::{Collect, Error, Event, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(5);

/// Records every event it is handed and wakes waiting assertions.  The
/// other doubles wrap a collector, usually one of these.
pub struct CapturingCollector {
  delay: Duration,
  events: Mutex<Vec<Arc<Event>>>,
  arrived: Condvar,
}

impl CapturingCollector {
  pub fn new() -> Arc<CapturingCollector> {
    CapturingCollector::with_delay(Duration::ZERO)
  }

  /// Sleeps before accepting each event, for exercising flush behavior
  /// against a slow sink.
  pub fn with_delay(delay: Duration) -> Arc<CapturingCollector> {
    Arc::new(CapturingCollector {
      delay,
      events: Mutex::new(Vec::new()),
      arrived: Condvar::new(),
    })
  }

  pub fn captured(&self) -> Vec<Arc<Event>> {
    self.events.lock().clone()
  }

  pub fn messages(&self) -> Vec<String> {
    self
      .captured()
      .iter()
      .map(|event| event.message.clone())
      .collect()
  }

  /// Waits until at least `count` events arrived.  Returns false on
  /// timeout.
  pub fn wait_captured(&self, count: usize, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut events = self.events.lock();
    while events.len() < count {
      if self.arrived.wait_until(&mut events, deadline).timed_out() {
        return events.len() >= count;
      }
    }
    true
  }
}

impl fmt::Display for CapturingCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Capturing()")
  }
}

impl Collect for CapturingCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    if !self.delay.is_zero() {
      thread::sleep(self.delay);
    }
    let mut events = self.events.lock();
    events.push(Arc::clone(event));
    self.arrived.notify_all();
    Ok(())
  }
}

/// Blocks every delivery until `unblock`, then forwards to the wrapped
/// collector.  Each delivery announces itself on the entered channel
/// before blocking, so tests can wait for a worker to be mid-delivery.
pub struct BlockingCollector {
  inner: Arc<dyn Collect>,
  entered_tx: Sender<()>,
  gate_rx: Receiver<()>,
  gate_tx: Mutex<Option<Sender<()>>>,
}

impl BlockingCollector {
  pub fn wrapping(inner: Arc<dyn Collect>) -> (Arc<BlockingCollector>, Receiver<()>) {
    let (entered_tx, entered_rx) = unbounded();
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let collector = Arc::new(BlockingCollector {
      inner,
      entered_tx,
      gate_rx,
      gate_tx: Mutex::new(Some(gate_tx)),
    });
    (collector, entered_rx)
  }

  /// Releases every blocked delivery, current and future.
  pub fn unblock(&self) {
    self.gate_tx.lock().take();
  }
}

impl fmt::Display for BlockingCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Blocking({})", self.inner)
  }
}

impl Collect for BlockingCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    let _ = self.entered_tx.send(());
    let _ = self.gate_rx.recv();
    self.inner.collect(event)
  }
}

/// Refuses the first `succeed_after` deliveries, then forwards.  Records
/// the allocation address of every event it sees, so tests can check that
/// retries reuse the same event.
pub struct FailingCollector {
  inner: Arc<dyn Collect>,
  succeed_after: usize,
  attempts: AtomicUsize,
  addresses: Mutex<Vec<usize>>,
}

impl FailingCollector {
  pub fn wrapping(inner: Arc<dyn Collect>, succeed_after: usize) -> Arc<FailingCollector> {
    Arc::new(FailingCollector {
      inner,
      succeed_after,
      attempts: AtomicUsize::new(0),
      addresses: Mutex::new(Vec::new()),
    })
  }

  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }

  pub fn addresses(&self) -> Vec<usize> {
    self.addresses.lock().clone()
  }
}

impl fmt::Display for FailingCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Failing({})", self.inner)
  }
}

impl Collect for FailingCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    self.addresses.lock().push(Arc::as_ptr(event) as usize);
    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
    if attempt < self.succeed_after {
      Err(Error::Collect(format!(
        "refusing delivery attempt {}",
        attempt + 1
      )))
    } else {
      self.inner.collect(event)
    }
  }
}

/// Panics on the first `succeed_after` deliveries, then forwards.
pub struct PanickingCollector {
  inner: Arc<dyn Collect>,
  succeed_after: usize,
  calls: AtomicUsize,
}

impl PanickingCollector {
  pub fn wrapping(inner: Arc<dyn Collect>, succeed_after: usize) -> Arc<PanickingCollector> {
    Arc::new(PanickingCollector {
      inner,
      succeed_after,
      calls: AtomicUsize::new(0),
    })
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl fmt::Display for PanickingCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Panicking({})", self.inner)
  }
}

impl Collect for PanickingCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    if call < self.succeed_after {
      panic!("collector wiring failure");
    }
    self.inner.collect(event)
  }
}

/// Forwards deliveries and records `close` calls, optionally refusing
/// them.
pub struct ClosingCollector {
  inner: Arc<dyn Collect>,
  fail_close: bool,
  close_calls: Mutex<usize>,
  closed: Condvar,
}

impl ClosingCollector {
  pub fn wrapping(inner: Arc<dyn Collect>) -> Arc<ClosingCollector> {
    ClosingCollector::build(inner, false)
  }

  pub fn failing_close(inner: Arc<dyn Collect>) -> Arc<ClosingCollector> {
    ClosingCollector::build(inner, true)
  }

  fn build(inner: Arc<dyn Collect>, fail_close: bool) -> Arc<ClosingCollector> {
    Arc::new(ClosingCollector {
      inner,
      fail_close,
      close_calls: Mutex::new(0),
      closed: Condvar::new(),
    })
  }

  pub fn close_calls(&self) -> usize {
    *self.close_calls.lock()
  }

  pub fn wait_closed(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut close_calls = self.close_calls.lock();
    while *close_calls == 0 {
      if self.closed.wait_until(&mut close_calls, deadline).timed_out() {
        return *close_calls > 0;
      }
    }
    true
  }
}

impl fmt::Display for ClosingCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Closing({})", self.inner)
  }
}

impl Collect for ClosingCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    self.inner.collect(event)
  }

  fn close(&self) -> Result<()> {
    let mut close_calls = self.close_calls.lock();
    *close_calls += 1;
    self.closed.notify_all();
    if self.fail_close {
      Err(Error::Collect("close refused".to_string()))
    } else {
      Ok(())
    }
  }
}
