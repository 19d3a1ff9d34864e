//! The thread control block and its identity (spec §3 Data Model, §4.2).
//!
//! Grounded on the teacher's `thread/mod.rs` for the shape of `ThreadId` and
//! `ThreadState` (a `NonZero` tid, a small closed state enum); the fields
//! themselves are replaced wholesale since this crate tracks scheduling
//! state rather than a real register/stack context. The roster and ready
//! queue that own these control blocks live in [`crate::sched`], which is
//! the only code that ever sees a [`Tcb`] directly — everything outside the
//! crate addresses a thread by [`ThreadId`].

use alloc::string::String;
use alloc::vec::Vec;
use core::num::NonZeroU64;

use crate::fixed_point::Fp;
use crate::sync::LockId;

/// Stable identity for a thread, assigned once at creation and never
/// reused (`tid()` in spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(NonZeroU64);

impl ThreadId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(NonZeroU64::new(raw).expect("thread id counter must never yield zero"))
    }

    /// The raw integer identity, stable for the thread's lifetime.
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

/// A thread's position in the state machine of spec §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Ready,
    Blocked,
    Dying,
}

/// A lock held by a thread, cached with the priority that lock currently
/// donates so the thread's effective priority can be recomputed without
/// reaching back into the lock table (spec §3: "ordered list of held
/// locks").
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeldLock {
    pub(crate) lock: LockId,
    pub(crate) donated_priority: u8,
}

/// The thread control block. Never exposed outside [`crate::sched`]; every
/// public API addresses a thread through its [`ThreadId`].
#[derive(Debug)]
pub(crate) struct Tcb {
    pub(crate) id: ThreadId,
    pub(crate) name: String,
    pub(crate) state: ThreadState,
    pub(crate) base_priority: u8,
    pub(crate) nice: i8,
    pub(crate) recent_cpu: Fp,
    /// Held locks, kept sorted descending by `donated_priority` (spec §9:
    /// "re-sorted within its holder's held-locks list").
    pub(crate) held_locks: Vec<HeldLock>,
    /// The lock this thread is blocked acquiring, if any.
    pub(crate) waiting_for: Option<LockId>,
    /// Insertion sequence number, used to break ties FIFO-fashion in the
    /// ready queue and in every priority-sorted waiter list (spec §8:
    /// "FIFO within a time slice").
    pub(crate) sequence: u64,
}

impl Tcb {
    /// `max(base_priority, max over held locks of donated_priority)` (spec
    /// §3, the definition of effective priority).
    pub fn effective_priority(&self) -> u8 {
        self.held_locks
            .iter()
            .map(|h| h.donated_priority)
            .max()
            .unwrap_or(0)
            .max(self.base_priority)
    }

    /// Insert or move `lock` to its sorted position by donated priority,
    /// descending (spec §9's reinsertion rule).
    pub fn upsert_held_lock(&mut self, lock: LockId, donated_priority: u8) {
        self.held_locks.retain(|h| h.lock != lock);
        let pos = self
            .held_locks
            .iter()
            .position(|h| h.donated_priority < donated_priority)
            .unwrap_or(self.held_locks.len());
        self.held_locks.insert(
            pos,
            HeldLock {
                lock,
                donated_priority,
            },
        );
    }

    pub fn remove_held_lock(&mut self, lock: LockId) {
        self.held_locks.retain(|h| h.lock != lock);
    }
}
