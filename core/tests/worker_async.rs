mod common;
use common::*;

use crossbeam_channel::{bounded, RecvTimeoutError};
use herald::{Collect, Dispatch, Level, Value};
use std::sync::Arc;
use std::thread;

#[test]
fn buffered_logging_never_blocks_the_caller() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let (blocking, entered) = BlockingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>);
  dispatch.register_buffered(Level::Debug, 4, Arc::clone(&blocking) as Arc<dyn Collect>);

  let log = dispatch.logger("buffered");
  log.info("first");
  log.info("second");
  log.info("third");

  // All three calls returned; the first is held at the gate, the rest queued.
  entered.recv_timeout(LONG_TIMEOUT).unwrap();
  assert!(sink.captured().is_empty());

  blocking.unblock();
  assert!(sink.wait_captured(3, LONG_TIMEOUT));
  assert_eq!(sink.messages(), vec!["first", "second", "third"]);
}

#[test]
fn queue_overflow_drops_and_reports_through_degradation() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let (blocking, entered) = BlockingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>);
  let bystander = CapturingCollector::new();
  dispatch.register_buffered(Level::Debug, 1, Arc::clone(&blocking) as Arc<dyn Collect>);
  dispatch.register(Level::Warn, Arc::clone(&bystander) as Arc<dyn Collect>);

  let log = dispatch.logger("overflow");
  log.info("delivered while blocking");
  entered.recv_timeout(LONG_TIMEOUT).unwrap();
  log.info("queued behind the blocked delivery");
  log.info("dropped on the floor");

  blocking.unblock();

  // The two broadcasts arrive from separate announcement threads, so only
  // their presence is guaranteed, not their order.
  assert!(bystander.wait_captured(2, LONG_TIMEOUT));
  let broadcasts = bystander.captured();
  assert_eq!(broadcasts.len(), 2);
  let entered_notice = broadcasts
    .iter()
    .find(|event| event.message.contains("Collector has entered a degraded state"))
    .expect("missing degradation broadcast");
  assert_eq!(entered_notice.level, Level::Error);
  assert_eq!(entered_notice.context.name(), "herald");
  assert_eq!(
    entered_notice.context.fields().get("drops"),
    Some(&Value::from(1u64))
  );
  let cause = entered_notice.error.as_ref().unwrap();
  assert_eq!(cause.to_string(), "events dropped due to full buffer");
  let recovered_notice = broadcasts
    .iter()
    .find(|event| event.message.contains("Collector has recovered from a degraded state"))
    .expect("missing recovery broadcast");
  assert_eq!(recovered_notice.level, Level::Warn);

  assert!(sink.wait_captured(4, LONG_TIMEOUT));
  let seen = sink.messages();
  assert_eq!(seen[0], "delivered while blocking");
  assert!(seen[1].contains("has been in a degraded state since"));
  assert_eq!(seen[2], "queued behind the blocked delivery");
  assert!(seen[3].contains("Collector has recovered from a degraded state"));
  assert!(!seen.contains(&"dropped on the floor".to_string()));

  let narrative = &sink.captured()[1];
  assert_eq!(
    narrative.context.fields().get("attempts"),
    Some(&Value::from(1u32))
  );
  assert_eq!(
    narrative.context.fields().get("drops"),
    Some(&Value::from(1u64))
  );
}

#[test]
fn zero_capacity_registration_is_synchronous() {
  let dispatch = Dispatch::new();
  let sink = CapturingCollector::new();
  let (blocking, entered) = BlockingCollector::wrapping(Arc::clone(&sink) as Arc<dyn Collect>);
  dispatch.register_buffered(Level::Debug, 0, Arc::clone(&blocking) as Arc<dyn Collect>);

  let log = dispatch.logger("fallback");
  let (done_tx, done_rx) = bounded(1);
  let logging = thread::spawn(move || {
    log.info("sync after all");
    let _ = done_tx.send(());
  });

  entered.recv_timeout(LONG_TIMEOUT).unwrap();
  assert_eq!(
    done_rx.recv_timeout(SHORT_TIMEOUT),
    Err(RecvTimeoutError::Timeout)
  );

  blocking.unblock();
  done_rx.recv_timeout(LONG_TIMEOUT).unwrap();
  logging.join().unwrap();
  assert_eq!(sink.messages(), vec!["sync after all"]);
}
