//! `ConcurrentMemoryTable`: a readers-writer discipline wrapped around a
//! non-concurrent [`MemoryTable`] core.
//!
//! This is a hand-rolled lock, not `parking_lot::RwLock` or `std::sync::RwLock`:
//! neither exposes the bounded-wait-then-seize-exclusivity starvation
//! avoidance the table's writer path requires (§5 of the design notes), so
//! the discipline is built directly on a `Mutex`-guarded counter and a
//! `Condvar`, per the teacher's own preference for `parking_lot` primitives.

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::layout::{Row, RowLayout, Value};
use crate::search::{ResultOption, Search};

use super::error::TableError;
use super::load::LoadProgress;
use super::memory::MemoryTable;

const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(100);

struct LockState {
    readers: u32,
    writer_active: bool,
    writer_waiting: bool,
}

/// Decorates a [`MemoryTable`] with concurrent-reader / exclusive-writer
/// access. Multiple readers run simultaneously; a writer waits up to
/// `max_wait` for the reader count to drain, logging and then waiting
/// unbounded (with new readers already locked out) if that bound is
/// exceeded.
pub struct ConcurrentMemoryTable {
    data: UnsafeCell<MemoryTable>,
    state: Mutex<LockState>,
    cond: Condvar,
    max_wait: Duration,
}

// SAFETY: all access to `data` goes through `acquire_read`/`acquire_write`,
// which uphold the invariant that a writer never runs concurrently with a
// reader or another writer; read access only ever hands out shared
// references.
unsafe impl Sync for ConcurrentMemoryTable {}

impl ConcurrentMemoryTable {
    pub fn new(layout: Arc<RowLayout>) -> Self {
        Self::with_max_wait(layout, DEFAULT_MAX_WAIT)
    }

    pub fn with_max_wait(layout: Arc<RowLayout>, max_wait: Duration) -> Self {
        Self {
            data: UnsafeCell::new(MemoryTable::new(layout)),
            state: Mutex::new(LockState {
                readers: 0,
                writer_active: false,
                writer_waiting: false,
            }),
            cond: Condvar::new(),
            max_wait,
        }
    }

    fn acquire_read(&self) {
        let mut state = self.state.lock();
        while state.writer_active || state.writer_waiting {
            self.cond.wait(&mut state);
        }
        state.readers += 1;
    }

    fn release_read(&self) {
        let mut state = self.state.lock();
        state.readers = state
            .readers
            .checked_sub(1)
            .expect("read-ticket underflow: release_read without a matching acquire_read");
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    fn acquire_write(&self) {
        let mut state = self.state.lock();
        state.writer_waiting = true;
        let deadline = Instant::now() + self.max_wait;
        let mut warned = false;
        while state.readers > 0 {
            let now = Instant::now();
            if now >= deadline {
                if !warned {
                    tracing::warn!(
                        readers = state.readers,
                        max_wait_ms = self.max_wait.as_millis() as u64,
                        "writer exceeded bounded wait for quiescent readers; blocking new readers until the current ones return their tickets"
                    );
                    warned = true;
                }
                self.cond.wait(&mut state);
            } else {
                let remaining = deadline - now;
                self.cond.wait_for(&mut state, remaining);
            }
        }
        state.writer_waiting = false;
        state.writer_active = true;
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        state.writer_active = false;
        self.cond.notify_all();
    }

    pub fn read<T>(&self, f: impl FnOnce(&MemoryTable) -> T) -> T {
        self.acquire_read();
        // SAFETY: acquire_read guarantees no writer holds `data`.
        let result = f(unsafe { &*self.data.get() });
        self.release_read();
        result
    }

    pub fn write<T>(&self, f: impl FnOnce(&mut MemoryTable) -> T) -> T {
        self.acquire_write();
        // SAFETY: acquire_write guarantees exclusive access to `data`.
        let result = f(unsafe { &mut *self.data.get() });
        self.release_write();
        result
    }

    pub fn layout(&self) -> Arc<RowLayout> {
        self.read(|t| t.layout().clone())
    }

    pub fn count(&self) -> usize {
        self.read(MemoryTable::count)
    }

    pub fn sequence_number(&self) -> u64 {
        self.read(MemoryTable::sequence_number)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.read(MemoryTable::ids)
    }

    pub fn sorted_ids(&self) -> Vec<i64> {
        self.read(MemoryTable::sorted_ids)
    }

    pub fn exist(&self, id: i64) -> bool {
        self.read(|t| t.exist(id))
    }

    pub fn get_row(&self, id: i64) -> Option<Row> {
        self.read(|t| t.get_row(id).cloned())
    }

    pub fn get_row_at(&self, position: usize) -> Option<Row> {
        self.read(|t| t.get_row_at(position).cloned())
    }

    pub fn insert(&self, row: Row) -> Result<i64, TableError> {
        self.write(|t| t.insert(row))
    }

    pub fn update(&self, row: Row) -> Result<(), TableError> {
        self.write(|t| t.update(row))
    }

    pub fn replace(&self, row: Row) -> Result<i64, TableError> {
        self.write(|t| t.replace(row))
    }

    pub fn delete(&self, id: i64) -> Result<(), TableError> {
        self.write(|t| t.delete(id))
    }

    pub fn try_delete(&self, search: &Search) -> Result<usize, TableError> {
        self.write(|t| t.try_delete(search))
    }

    pub fn clear(&self, reset_ids: bool) -> Result<(), TableError> {
        self.write(|t| t.clear(reset_ids))
    }

    pub fn find(&self, search: &Search, options: &ResultOption) -> Result<Vec<Row>, TableError> {
        self.read(|t| t.find(search, options))
    }

    pub fn distinct_values(&self, field: usize) -> Vec<Option<Value>> {
        self.read(|t| t.distinct_values(field))
    }

    pub fn set_value(&self, field: usize, value: Value) -> Result<(), TableError> {
        self.write(|t| t.set_value(field, value))
    }

    pub fn load_from(
        &self,
        source: impl IntoIterator<Item = Row>,
        search: Option<&Search>,
        progress: Option<&mut dyn LoadProgress>,
    ) -> Result<u64, TableError> {
        self.write(|t| t.load_from(source, search, progress))
    }
}
