//! `TransactionLog`: a thread-safe FIFO of pending transactions.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::transaction::Transaction;

/// Ordering guarantee: transactions dequeue in append order, modulo
/// `requeue(at_head = true, ..)`, which reinserts at the front.
#[derive(Default)]
pub struct TransactionLog {
    queue: Mutex<VecDeque<Transaction>>,
    cond: Condvar,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enqueue(&self, tx: Transaction) {
        self.queue.lock().push_back(tx);
        self.cond.notify_all();
    }

    pub fn add_range(&self, txs: impl IntoIterator<Item = Transaction>) {
        let mut queue = self.queue.lock();
        queue.extend(txs);
        self.cond.notify_all();
    }

    pub fn try_dequeue(&self) -> Option<Transaction> {
        self.queue.lock().pop_front()
    }

    pub fn peek(&self) -> Option<Transaction> {
        self.queue.lock().front().cloned()
    }

    /// Reinserts `tx`: at the head if `at_head`, else at the tail.
    pub fn requeue(&self, at_head: bool, tx: Transaction) {
        let mut queue = self.queue.lock();
        if at_head {
            queue.push_front(tx);
        } else {
            queue.push_back(tx);
        }
        self.cond.notify_all();
    }

    /// Blocks until the log is non-empty or `timeout` elapses. Returns
    /// whether the log is non-empty at return time.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            self.cond.wait_for(&mut queue, timeout);
        }
        !queue.is_empty()
    }

    /// Wakes any thread blocked in `wait`, without changing the queue.
    pub fn pulse(&self) {
        let _queue = self.queue.lock();
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DataType, FieldProperties, RowLayout, Value};
    use std::sync::Arc;
    use std::thread;

    fn sample_tx(id: i64) -> Transaction {
        let layout = Arc::new(
            RowLayout::untyped("t", vec![FieldProperties::new("id", DataType::Int64)]).unwrap(),
        );
        let row = crate::layout::Row::new(layout, vec![Some(Value::Int64(id))]).unwrap();
        Transaction::inserted(id, row)
    }

    #[test]
    fn dequeue_is_fifo_except_for_head_requeue() {
        let log = TransactionLog::new();
        log.enqueue(sample_tx(1));
        log.enqueue(sample_tx(2));
        let first = log.try_dequeue().unwrap();
        assert_eq!(first.id, 1);
        log.requeue(true, first);
        assert_eq!(log.try_dequeue().unwrap().id, 1);
        assert_eq!(log.try_dequeue().unwrap().id, 2);
    }

    #[test]
    fn wait_unblocks_when_enqueued_from_another_thread() {
        let log = Arc::new(TransactionLog::new());
        let log2 = Arc::clone(&log);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            log2.enqueue(sample_tx(1));
        });
        let became_nonempty = log.wait(Duration::from_millis(500));
        handle.join().unwrap();
        assert!(became_nonempty);
    }
}
