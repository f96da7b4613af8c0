mod common;
use common::*;

use herald::{Collect, Dispatch, Level};
use serial_test::serial;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn close_flushes_queued_events_before_returning() {
  let dispatch = Dispatch::new();
  let slow = CapturingCollector::with_delay(Duration::from_millis(20));
  dispatch.register_buffered(Level::Debug, 16, Arc::clone(&slow) as Arc<dyn Collect>);

  let log = dispatch.logger("flush");
  for i in 0..8 {
    log.info(format!("queued {}", i));
  }

  dispatch.close(LONG_TIMEOUT).unwrap();

  let seen = slow.messages();
  assert_eq!(seen.len(), 8, "every queued event flushed before close returned");
  assert_eq!(seen[0], "queued 0");
  assert_eq!(seen[7], "queued 7");
}

#[test]
fn close_times_out_when_a_collector_wedges() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let (blocking, entered) = BlockingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>);
  dispatch.register_buffered(Level::Debug, 4, Arc::clone(&blocking) as Arc<dyn Collect>);

  dispatch.logger("wedged").info("stuck in delivery");
  entered.recv_timeout(LONG_TIMEOUT).unwrap();

  let err = dispatch.close(Duration::from_millis(100)).unwrap_err();
  assert!(matches!(err, herald::Error::FlushTimeout));
  assert_eq!(err.to_string(), "timeout waiting for buffers to flush");

  // Release the collector so the detached terminator can finish its flush.
  blocking.unblock();
  assert!(sink.wait_captured(1, LONG_TIMEOUT));
}

#[test]
fn close_resets_to_the_initial_state() {
  let dispatch = Dispatch::new();
  let first = CapturingCollector::new();
  dispatch.register(Level::Debug, Arc::clone(&first) as Arc<dyn Collect>);
  dispatch.set_frames(0, 0);

  dispatch.logger("reset").info("while configured");
  assert!(first.captured()[0].frames.is_empty());

  dispatch.close(LONG_TIMEOUT).unwrap();
  assert!(!dispatch.enabled_for(Level::Fatal));

  // Registration works again and frame capture is back to the default.
  let second = CapturingCollector::new();
  dispatch.register(Level::Debug, Arc::clone(&second) as Arc<dyn Collect>);
  dispatch.logger("reset").info("after reset");

  assert_eq!(second.messages(), vec!["after reset"]);
  assert_eq!(second.captured()[0].frames.len(), 1);
  assert_eq!(first.messages(), vec!["while configured"]);
}

#[test]
fn close_is_idempotent() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let closing = ClosingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>);
  dispatch.register(Level::Debug, Arc::clone(&closing) as Arc<dyn Collect>);

  dispatch.close(LONG_TIMEOUT).unwrap();
  dispatch.close(LONG_TIMEOUT).unwrap();
  assert_eq!(closing.close_calls(), 1);
}

#[test]
fn close_with_nothing_registered_returns_quickly() {
  let dispatch = Dispatch::new();
  dispatch.close(Duration::from_millis(50)).unwrap();
}

#[test]
fn close_waits_for_a_send_already_in_flight() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let (blocking, entered) = BlockingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>);
  dispatch.register(Level::Debug, Arc::clone(&blocking) as Arc<dyn Collect>);

  let log = dispatch.logger("inflight");
  let logging = thread::spawn(move || {
    log.info("caught mid-send");
  });
  entered.recv_timeout(LONG_TIMEOUT).unwrap();

  let closer = {
    let dispatch = dispatch.clone();
    thread::spawn(move || dispatch.close(LONG_TIMEOUT))
  };

  // The closer is spinning on the in-flight send; release it and both
  // threads run to completion.
  thread::sleep(Duration::from_millis(50));
  blocking.unblock();
  logging.join().unwrap();
  closer.join().unwrap().unwrap();
  assert_eq!(sink.messages(), vec!["caught mid-send"]);
}

#[test]
fn close_interrupts_a_stuck_recovery() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let flaky = FailingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>, usize::MAX);
  dispatch.register(Level::Debug, Arc::clone(&flaky) as Arc<dyn Collect>);

  dispatch.logger("stuck").info("never accepted");
  assert!(flaky.attempts() >= 3);

  // Recovery is looping with backoff; close must not wait it out.
  dispatch.close(LONG_TIMEOUT).unwrap();
  assert!(!dispatch.enabled_for(Level::Fatal));

  let settled = flaky.attempts();
  thread::sleep(Duration::from_millis(50));
  assert!(
    flaky.attempts() <= settled + 1,
    "recovery stopped probing after close"
  );
}

#[test]
fn failed_close_is_reported_to_surviving_collectors() {
  let dispatch = Dispatch::new();
  let observer = CapturingCollector::new();
  dispatch.register(Level::Debug, Arc::clone(&observer) as Arc<dyn Collect>);

  let sink = CapturingCollector::new();
  let closing = ClosingCollector::failing_close(Arc::clone(&sink) as Arc<dyn Collect>);
  dispatch.register(Level::Debug, Arc::clone(&closing) as Arc<dyn Collect>);

  let handle = Arc::clone(&closing) as Arc<dyn Collect>;
  dispatch.dispose(&handle);

  assert!(observer.wait_captured(1, LONG_TIMEOUT));
  let report = &observer.captured()[0];
  assert_eq!(report.level, Level::Error);
  assert!(report.message.contains("Failed to close collector"));
  assert!(report.message.contains("Closing(Capturing())"));
  assert_eq!(report.error.as_ref().unwrap().to_string(), "close refused");
}

#[test]
#[serial]
fn the_global_dispatch_is_shared_and_resettable() {
  let sink = CapturingCollector::new();
  herald::global().register(Level::Debug, Arc::clone(&sink) as Arc<dyn Collect>);

  let log = herald::Logger::new("global");
  log.info("through the global dispatch");
  assert_eq!(sink.messages(), vec!["through the global dispatch"]);

  herald::close(LONG_TIMEOUT).unwrap();
  assert!(!herald::global().enabled_for(Level::Fatal));

  log.info("after close");
  assert_eq!(sink.messages().len(), 1);
}
