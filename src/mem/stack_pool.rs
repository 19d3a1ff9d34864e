//! A capacity-bounded stack allocator.
//!
//! Grounded on the teacher's `StackPool`: a free-list-backed pool with
//! allocation statistics, guarded by `spin::Mutex`. The teacher's version
//! returns real mapped memory sized by [`StackSizeClass`]; this crate never
//! switches context, so a stack slot is just an accounting token — what
//! matters is whether the pool has room, not what address it hands back.

use alloc::collections::BTreeSet;
use portable_atomic::{AtomicUsize, Ordering};
use spin::Mutex;

/// An opaque handle to an allocated stack slot. Dropping it without calling
/// [`StackAllocator::dealloc`] leaks the slot's accounting — callers should
/// release it when the owning thread exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackHandle(usize);

/// The stack-allocation boundary an embedding kernel implements against its
/// real page allocator. [`BoundedStackPool`] is the host-testable default.
pub trait StackAllocator {
    /// Reserve a stack slot, or `None` if the allocator is exhausted.
    fn alloc(&self) -> Option<StackHandle>;

    /// Release a previously allocated slot back to the allocator.
    fn dealloc(&self, handle: StackHandle);

    /// Number of slots currently in use.
    fn in_use(&self) -> usize;
}

/// A stack allocator with a fixed capacity, so that thread-creation
/// exhaustion (spec §7, `SpawnError::OutOfMemory`) is reachable without a
/// real allocator: once `capacity` handles are outstanding, `alloc` returns
/// `None` until one is released.
pub struct BoundedStackPool {
    capacity: usize,
    in_use: AtomicUsize,
    next_id: AtomicUsize,
    /// Tracks outstanding handle ids so `dealloc` can reject a double-free;
    /// double-freeing a stack is a programming error, not resource
    /// exhaustion, so it asserts rather than returning `Result`.
    outstanding: Mutex<BTreeSet<usize>>,
}

impl BoundedStackPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_use: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
            outstanding: Mutex::new(BTreeSet::new()),
        }
    }
}

impl StackAllocator for BoundedStackPool {
    fn alloc(&self) -> Option<StackHandle> {
        loop {
            let current = self.in_use.load(Ordering::Acquire);
            if current >= self.capacity {
                return None;
            }
            if self
                .in_use
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                self.outstanding.lock().insert(id);
                return Some(StackHandle(id));
            }
        }
    }

    fn dealloc(&self, handle: StackHandle) {
        let removed = self.outstanding.lock().remove(&handle.0);
        assert!(removed, "stack handle freed twice or not owned by this pool");
        self.in_use.fetch_sub(1, Ordering::AcqRel);
    }

    fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_up_to_capacity() {
        let pool = BoundedStackPool::new(2);
        let a = pool.alloc().unwrap();
        let _b = pool.alloc().unwrap();
        assert!(pool.alloc().is_none());
        pool.dealloc(a);
        assert!(pool.alloc().is_some());
    }

    #[test]
    fn in_use_tracks_outstanding_handles() {
        let pool = BoundedStackPool::new(4);
        assert_eq!(pool.in_use(), 0);
        let h = pool.alloc().unwrap();
        assert_eq!(pool.in_use(), 1);
        pool.dealloc(h);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    #[should_panic(expected = "freed twice")]
    fn double_dealloc_panics() {
        let pool = BoundedStackPool::new(4);
        let h = pool.alloc().unwrap();
        pool.dealloc(h);
        pool.dealloc(h);
    }
}
