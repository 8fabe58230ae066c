//! End-to-end exercise of `TableWriter` against a `ConcurrentMemoryTable`:
//! transactions enqueued from one thread are visible on the target once the
//! writer's threshold or max-wait deadline trips, with no direct calls
//! between producer and writer beyond the shared log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tabula::layout::{DataType, FieldFlags, FieldProperties, Row, RowLayout, Value};
use tabula::table::ConcurrentMemoryTable;
use tabula::txlog::{TableWriter, Transaction, TransactionLog, WriterFlags, WriterOptions};

fn layout() -> Arc<RowLayout> {
    Arc::new(
        RowLayout::untyped(
            "events",
            vec![
                FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                FieldProperties::new("label", DataType::String),
            ],
        )
        .unwrap(),
    )
}

#[test]
fn threshold_trigger_flushes_before_max_wait_elapses() {
    let layout = layout();
    let target = Arc::new(ConcurrentMemoryTable::new(layout.clone()));
    let log = Arc::new(TransactionLog::new());
    let options = WriterOptions {
        cache_flush_threshold: 3,
        cache_flush_min_wait: Duration::from_millis(5),
        cache_flush_max_wait: Duration::from_secs(5),
        flush_count: 10,
        flags: WriterFlags::default(),
    };
    let writer = TableWriter::spawn(log.clone(), Arc::clone(&target), options);

    for i in 1..=3 {
        let row = Row::new(
            layout.clone(),
            vec![Some(Value::Int64(i)), Some(Value::String(format!("e{i}")))],
        )
        .unwrap();
        log.enqueue(Transaction::inserted(i, row));
    }

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(target.count(), 3);
    assert!(writer.written_count() >= 3);
    writer.close().unwrap();
}

#[test]
fn max_wait_trigger_flushes_a_single_transaction() {
    let layout = layout();
    let target = Arc::new(ConcurrentMemoryTable::new(layout.clone()));
    let log = Arc::new(TransactionLog::new());
    let options = WriterOptions {
        cache_flush_threshold: 1000,
        cache_flush_min_wait: Duration::from_millis(5),
        cache_flush_max_wait: Duration::from_millis(40),
        flush_count: 10,
        flags: WriterFlags::default(),
    };
    let writer = TableWriter::spawn(log.clone(), Arc::clone(&target), options);

    let row = Row::new(
        layout.clone(),
        vec![Some(Value::Int64(1)), Some(Value::String("lonely".into()))],
    )
    .unwrap();
    log.enqueue(Transaction::inserted(1, row));

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(target.count(), 1);
    writer.close().unwrap();
}

#[test]
fn flush_expedites_a_sub_threshold_queue_instead_of_waiting_for_max_wait() {
    let layout = layout();
    let target = Arc::new(ConcurrentMemoryTable::new(layout.clone()));
    let log = Arc::new(TransactionLog::new());
    // threshold and max-wait are both far outside what a correctly
    // expedited flush() should take to drain a single queued transaction.
    let options = WriterOptions {
        cache_flush_threshold: 1000,
        cache_flush_min_wait: Duration::from_millis(5),
        cache_flush_max_wait: Duration::from_secs(60),
        flush_count: 10,
        flags: WriterFlags::default(),
    };
    let writer = TableWriter::spawn(log.clone(), Arc::clone(&target), options);
    let row = Row::new(
        layout.clone(),
        vec![Some(Value::Int64(1)), Some(Value::String("a".into()))],
    )
    .unwrap();
    log.enqueue(Transaction::inserted(1, row));

    let started = Instant::now();
    writer.flush().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(target.count(), 1);
}
