//! `TableWriter`: a single owned background thread that drains a
//! [`TransactionLog`] into a target table, batching commits subject to
//! size/time thresholds and a requeue-on-failure policy.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use crate::table::TableError;

use super::error::WriterError;
use super::log::TransactionLog;
use super::transaction::{Transaction, TransactionKind};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WriterFlags: u8 {
        const ALLOW_REQUEUE   = 0b0000_0001;
        const THROW_EXCEPTIONS = 0b0000_0010;
    }
}

impl Default for WriterFlags {
    fn default() -> Self {
        WriterFlags::ALLOW_REQUEUE
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Minimum queued count before a flush becomes eligible; `-1` disables
    /// the threshold trigger (only the max-wait deadline can trigger).
    pub cache_flush_threshold: i64,
    pub cache_flush_min_wait: Duration,
    pub cache_flush_max_wait: Duration,
    pub flush_count: usize,
    pub flags: WriterFlags,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            cache_flush_threshold: 1000,
            cache_flush_min_wait: Duration::from_millis(1000),
            cache_flush_max_wait: Duration::from_millis(60_000),
            flush_count: 1000,
            flags: WriterFlags::default(),
        }
    }
}

/// The table a `TableWriter` applies commits to. Implemented by
/// [`crate::table::ConcurrentMemoryTable`]; any table-like type with the
/// same atomic-per-transaction contract can implement it.
pub trait CommitTarget: Send + Sync {
    fn commit(&self, tx: &Transaction) -> Result<(), TableError>;
}

impl CommitTarget for crate::table::ConcurrentMemoryTable {
    fn commit(&self, tx: &Transaction) -> Result<(), TableError> {
        match tx.kind {
            TransactionKind::Inserted => {
                let row = tx.row.clone().ok_or_else(|| {
                    TableError::InvalidOperation("Inserted transaction missing row".into())
                })?;
                self.insert(row).map(|_| ())
            }
            TransactionKind::Updated => {
                let row = tx.row.clone().ok_or_else(|| {
                    TableError::InvalidOperation("Updated transaction missing row".into())
                })?;
                self.update(row)
            }
            TransactionKind::Replaced => {
                let row = tx.row.clone().ok_or_else(|| {
                    TableError::InvalidOperation("Replaced transaction missing row".into())
                })?;
                self.replace(row).map(|_| ())
            }
            TransactionKind::Deleted => self.delete(tx.id),
        }
    }
}

struct Shared {
    exit: AtomicBool,
    flush_requested: AtomicBool,
    error: Mutex<Option<WriterError>>,
    written_count: AtomicU64,
    max_seen_delay: Mutex<ChronoDuration>,
    last_flush: Mutex<Instant>,
}

/// Owns the background worker thread for one `(log, target)` pair. Dropping
/// a `TableWriter` without calling [`TableWriter::close`] leaves the thread
/// running with no further flush requests possible from this handle —
/// always `close()` explicitly.
pub struct TableWriter<T: CommitTarget + 'static> {
    log: Arc<TransactionLog>,
    target: Arc<T>,
    options: WriterOptions,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl<T: CommitTarget + 'static> TableWriter<T> {
    pub fn spawn(log: Arc<TransactionLog>, target: Arc<T>, options: WriterOptions) -> Self {
        let shared = Arc::new(Shared {
            exit: AtomicBool::new(false),
            flush_requested: AtomicBool::new(false),
            error: Mutex::new(None),
            written_count: AtomicU64::new(0),
            max_seen_delay: Mutex::new(ChronoDuration::zero()),
            last_flush: Mutex::new(Instant::now()),
        });

        let worker_log = Arc::clone(&log);
        let worker_target = Arc::clone(&target);
        let worker_shared = Arc::clone(&shared);
        let worker_options = options;
        let handle = std::thread::spawn(move || {
            run(worker_log, worker_target, worker_options, worker_shared);
        });

        Self {
            log,
            target,
            options,
            shared,
            handle: Some(handle),
        }
    }

    pub fn written_count(&self) -> u64 {
        self.shared.written_count.load(Ordering::SeqCst)
    }

    pub fn max_seen_delay(&self) -> ChronoDuration {
        *self.shared.max_seen_delay.lock()
    }

    /// The fatal error that terminated the worker, if any. Cleared once
    /// observed.
    pub fn error(&self) -> Option<WriterError> {
        self.shared.error.lock().take()
    }

    fn is_running(&self) -> bool {
        !self.shared.exit.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cooperatively drains the log: sets the flush-requested signal so the
    /// worker bypasses its min-wait/threshold gate on its next iterations,
    /// pulses it awake, and waits while transactions remain queued and the
    /// worker is running. If the worker has already exited, drains the
    /// remainder synchronously on this thread instead.
    pub fn flush(&self) -> Result<(), WriterError> {
        self.shared.flush_requested.store(true, Ordering::SeqCst);
        self.log.pulse();
        loop {
            if self.log.is_empty() {
                break;
            }
            if !self.is_running() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.shared.flush_requested.store(false, Ordering::SeqCst);
        while let Some(tx) = self.log.try_dequeue() {
            self.target.commit(&tx)?;
        }
        Ok(())
    }

    /// Signals exit, flushes, waits for the worker thread to terminate.
    pub fn close(mut self) -> Result<(), WriterError> {
        self.shared.exit.store(true, Ordering::SeqCst);
        self.log.pulse();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        while let Some(tx) = self.log.try_dequeue() {
            self.target.commit(&tx)?;
        }
        if let Some(err) = self.shared.error.lock().take() {
            return Err(err);
        }
        Ok(())
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }
}

fn run<T: CommitTarget + 'static>(
    log: Arc<TransactionLog>,
    target: Arc<T>,
    options: WriterOptions,
    shared: Arc<Shared>,
) {
    let mut max_wait_deadline = Instant::now() + options.cache_flush_max_wait;

    loop {
        if shared.exit.load(Ordering::SeqCst) {
            return;
        }

        if log.is_empty() {
            max_wait_deadline = Instant::now() + options.cache_flush_max_wait;
            log.wait(options.cache_flush_min_wait);
            continue;
        }

        // An explicit `flush()` bypasses both the min-wait sleep and the
        // threshold/max-wait gate below, forcing an immediate flush attempt.
        let flush_requested = shared.flush_requested.load(Ordering::SeqCst);
        if !flush_requested {
            std::thread::sleep(options.cache_flush_min_wait);
            if shared.exit.load(Ordering::SeqCst) {
                return;
            }
        }

        let queued = log.len() as i64;
        let threshold_met = flush_requested
            || (options.cache_flush_threshold >= 0 && queued >= options.cache_flush_threshold);
        let max_wait_met = flush_requested || Instant::now() >= max_wait_deadline;
        if !(threshold_met || max_wait_met) {
            continue;
        }

        let mut batch = Vec::with_capacity(options.flush_count.min(queued as usize));
        for _ in 0..options.flush_count {
            match log.try_dequeue() {
                Some(tx) => batch.push(tx),
                None => break,
            }
        }
        if batch.is_empty() {
            continue;
        }

        for tx in batch {
            let delay = Utc::now() - tx.created_at;
            let mut seen = shared.max_seen_delay.lock();
            if delay > *seen {
                *seen = delay;
            }
            drop(seen);

            if let Err(err) = target.commit(&tx) {
                if options.flags.contains(WriterFlags::ALLOW_REQUEUE) {
                    log.requeue(true, tx.clone());
                }
                if options.flags.contains(WriterFlags::THROW_EXCEPTIONS) {
                    *shared.error.lock() = Some(WriterError::from(err));
                    shared.exit.store(true, Ordering::SeqCst);
                    return;
                }
                tracing::error!(id = tx.id, error = %err, "writer commit failed");
            } else {
                shared.written_count.fetch_add(1, Ordering::SeqCst);
            }
        }

        *shared.last_flush.lock() = Instant::now();
        max_wait_deadline = Instant::now() + options.cache_flush_max_wait;
        tracing::debug!(
            written = shared.written_count.load(Ordering::SeqCst),
            "writer flush completed"
        );
    }
}
