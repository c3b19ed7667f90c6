//! Lock-free wavetable hand-off between the control thread and the render thread.
//!
//! The slot owns one strong count of the current `Arc<WaveTable>` as a raw
//! pointer. Readers (the render thread) announce themselves in `readers`
//! before loading the pointer and leave when their [`TableGuard`] drops; they
//! never touch a lock, never allocate and never release memory.
//!
//! Writers swap the pointer and park the previous table in a retired list.
//! Retired tables are released on the control thread once `readers` has been
//! observed at zero after the swap: any reader that started later can only
//! have loaded the new pointer.

use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::wavetable::WaveTable;

pub(crate) struct TableSlot {
    current: AtomicPtr<WaveTable>,
    readers: AtomicUsize,
    /// Tables swapped out but possibly still read by an in-flight render.
    /// Only ever locked by writers.
    retired: Mutex<Vec<Arc<WaveTable>>>,
}

impl TableSlot {
    pub(crate) fn new(table: Arc<WaveTable>) -> Self {
        Self {
            current: AtomicPtr::new(Arc::into_raw(table).cast_mut()),
            readers: AtomicUsize::new(0),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Pin the current table for the duration of one render call.
    #[inline]
    pub(crate) fn load(&self) -> TableGuard<'_> {
        self.readers.fetch_add(1, Ordering::SeqCst);
        let ptr = self.current.load(Ordering::SeqCst);
        // SAFETY: `ptr` came from `Arc::into_raw` and the slot holds a strong
        // count for it. A writer that swaps it out keeps it in `retired` until
        // it observes `readers == 0`, which cannot happen while this guard
        // (counted above, before the load) is alive.
        let table = unsafe { &*ptr };
        TableGuard { slot: self, table }
    }

    /// Replace the current table. Never blocks a reader.
    pub(crate) fn swap(&self, table: Arc<WaveTable>) {
        let mut retired = self.retired.lock();
        let new = Arc::into_raw(table).cast_mut();
        let old = self.current.swap(new, Ordering::SeqCst);
        // SAFETY: `old` was produced by `Arc::into_raw` and its strong count
        // belonged to the slot; ownership moves into the retired list.
        retired.push(unsafe { Arc::from_raw(old) });
        Self::reclaim_locked(&self.readers, &mut retired);
    }

    /// A strong reference to the current table, for control-side inspection.
    pub(crate) fn current(&self) -> Arc<WaveTable> {
        // Writers hold this lock while swapping, so the pointer cannot be
        // retired and released underneath us.
        let _writers = self.retired.lock();
        let ptr = self.current.load(Ordering::SeqCst);
        // SAFETY: the slot owns a strong count for `ptr`; we add one for the
        // returned `Arc`.
        unsafe {
            Arc::increment_strong_count(ptr);
            Arc::from_raw(ptr)
        }
    }

    /// Release retired tables if no render is in flight.
    pub(crate) fn reclaim(&self) -> usize {
        let mut retired = self.retired.lock();
        Self::reclaim_locked(&self.readers, &mut retired);
        retired.len()
    }

    fn reclaim_locked(readers: &AtomicUsize, retired: &mut Vec<Arc<WaveTable>>) {
        if !retired.is_empty() && readers.load(Ordering::SeqCst) == 0 {
            retired.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn retired_len(&self) -> usize {
        self.retired.lock().len()
    }
}

impl Drop for TableSlot {
    fn drop(&mut self) {
        let ptr = *self.current.get_mut();
        // SAFETY: `&mut self` means no guard is alive; release the slot's count.
        drop(unsafe { Arc::from_raw(ptr) });
    }
}

// SAFETY: the raw pointer is an `Arc<WaveTable>` in disguise and `WaveTable`
// is immutable, so sharing the slot is as safe as sharing the `Arc`.
unsafe impl Send for TableSlot {}
unsafe impl Sync for TableSlot {}

/// A table pinned by an in-flight render.
pub(crate) struct TableGuard<'a> {
    slot: &'a TableSlot,
    table: &'a WaveTable,
}

impl core::ops::Deref for TableGuard<'_> {
    type Target = WaveTable;

    #[inline]
    fn deref(&self) -> &WaveTable {
        self.table
    }
}

impl Drop for TableGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.slot.readers.fetch_sub(1, Ordering::SeqCst);
    }
}
