//! Non-recursive lock with transitive priority donation (spec §4.5).
//!
//! Grounded on `original_source/threads/synch.c`'s `lock_acquire`/
//! `fu_donate_priority`/`lock_release`, generalized to implement true
//! transitive propagation along the whole waits-for chain — the original
//! only walks one hop in several of its call sites, which spec.md's
//! "Nested donation" scenario and §4.5 both require fixed (see
//! `SPEC_FULL.md` §4 and `DESIGN.md`).
//!
//! The embedded semaphore (spec §3) hands off directly to the thread it
//! wakes rather than merely incrementing its value — see the module doc
//! on [`crate::sync::semaphore`] for why that is the correct translation
//! once a blocked call cannot resume itself.

use super::handle_id;
use super::semaphore::{self, SemaphoreId};
use crate::sched::KernelState;
use crate::thread::ThreadId;

handle_id!(LockId);

/// Defensive bound on donation-chain length; the waits-for graph is a
/// forest by invariant (spec §8), so this should never trip outside a
/// programming error upstream.
const MAX_DONATION_HOPS: u32 = 4096;

#[derive(Debug)]
pub(crate) struct LockState {
    pub(crate) holder: Option<ThreadId>,
    pub(crate) donated_priority: u8,
    pub(crate) sema: SemaphoreId,
}

pub(crate) fn init(state: &mut KernelState) -> LockId {
    let sema = semaphore::init(state, 1);
    let id = LockId::new(state.next_lock_id());
    state.locks.insert(
        id,
        LockState {
            holder: None,
            donated_priority: 0,
            sema,
        },
    );
    id
}

pub(crate) fn acquire(state: &mut KernelState, lock: LockId) {
    let t = state.current();
    acquire_as(state, lock, t);
}

/// Acquire `lock` as if `t` were the calling thread. Used directly by
/// [`acquire`] (where `t == state.current()`) and by
/// [`super::condvar::signal`] to re-contend for the lock on behalf of a
/// waiter it just woke, which is not the currently running thread.
pub(crate) fn acquire_as(state: &mut KernelState, lock: LockId, t: ThreadId) {
    assert_ne!(
        state.locks[&lock].holder,
        Some(t),
        "lock is non-recursive: thread already holds it"
    );
    state.thread_mut(t).waiting_for = Some(lock);
    if !state.mlfqs {
        let priority = state.effective_priority(t);
        donate(state, lock, priority);
    }

    let sema = state.locks[&lock].sema;
    if semaphore::try_down(state, sema) {
        complete_acquire(state, lock, t);
    } else {
        semaphore::enqueue_waiter(state, sema, t);
        if t == state.current() {
            state.block_current();
        } else {
            state.force_blocked(t);
        }
    }
}

/// Finish granting `lock` to `t`: spec §4.5 step 1's "On return" clause.
fn complete_acquire(state: &mut KernelState, lock: LockId, t: ThreadId) {
    state.thread_mut(t).waiting_for = None;
    let base = state.thread(t).base_priority;
    let l = state.locks.get_mut(&lock).expect("unknown lock");
    l.holder = Some(t);
    l.donated_priority = l.donated_priority.max(base);
    let donated = l.donated_priority;
    state.thread_mut(t).upsert_held_lock(lock, donated);
}

/// Non-blocking acquire: succeeds only if the lock was free. No donation
/// occurs, since no wait happened (spec §4.5 step 3).
pub(crate) fn try_acquire(state: &mut KernelState, lock: LockId) -> bool {
    let t = state.current();
    assert_ne!(state.locks[&lock].holder, Some(t), "lock is non-recursive");
    let sema = state.locks[&lock].sema;
    if semaphore::try_down(state, sema) {
        let l = state.locks.get_mut(&lock).expect("unknown lock");
        l.holder = Some(t);
        true
    } else {
        false
    }
}

pub(crate) fn release(state: &mut KernelState, lock: LockId) {
    let t = state.current();
    assert_eq!(
        state.locks[&lock].holder,
        Some(t),
        "release of a lock not held by the caller"
    );
    state.thread_mut(t).remove_held_lock(lock);
    {
        let l = state.locks.get_mut(&lock).expect("unknown lock");
        l.holder = None;
        l.donated_priority = 0;
    }

    let sema = state.locks[&lock].sema;
    match semaphore::pop_highest_priority_waiter(state, sema) {
        Some(next_holder) => {
            complete_acquire(state, lock, next_holder);
            state.make_ready(next_holder);
        }
        None => semaphore::increment(state, sema),
    }
    state.yield_if_higher();
}

pub(crate) fn held_by_current(state: &KernelState, lock: LockId) -> bool {
    state.locks[&lock].holder == Some(state.current())
}

pub(crate) fn holder(state: &KernelState, lock: LockId) -> Option<ThreadId> {
    state.locks[&lock].holder
}

pub(crate) fn donated_priority(state: &KernelState, lock: LockId) -> u8 {
    state.locks[&lock].donated_priority
}

/// Propagate `priority` onto `lock` and, transitively, along the
/// waits-for chain rooted at its holder (spec §4.5 step 1, §9's
/// reinsertion rule).
fn donate(state: &mut KernelState, lock: LockId, priority: u8) {
    let mut lock = lock;
    let mut priority = priority;
    for _ in 0..MAX_DONATION_HOPS {
        let l = state.locks.get_mut(&lock).expect("unknown lock");
        if l.donated_priority >= priority {
            return;
        }
        l.donated_priority = priority;
        let holder = match l.holder {
            Some(h) => h,
            None => return,
        };
        state.thread_mut(holder).upsert_held_lock(lock, priority);
        let effective = state.effective_priority(holder);
        match state.thread(holder).waiting_for {
            Some(next) => {
                lock = next;
                priority = effective;
            }
            None => return,
        }
    }
    panic!("priority donation exceeded the maximum chain length; waits-for graph has a cycle");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::{Kernel, KernelConfig};

    #[test]
    fn simple_donation_raises_and_restores_holder_priority() {
        let kernel = Kernel::new(KernelConfig::default());
        let a = kernel.thread_create("a", 31, None).unwrap();
        kernel.test_set_current(a);
        let lock = kernel.lock_init();
        kernel.lock_acquire(lock);

        let b = kernel.thread_create("b", 40, None).unwrap();
        kernel.test_set_current(b);
        kernel.lock_acquire(lock); // blocks; donates 40 to A

        assert_eq!(kernel.thread_get_priority(a), 40);

        kernel.test_set_current(a);
        kernel.lock_release(lock);
        assert_eq!(kernel.thread_get_priority(a), 31);
    }

    #[test]
    fn nested_donation_propagates_two_hops() {
        let kernel = Kernel::new(KernelConfig::default());
        let a = kernel.thread_create("a", 31, None).unwrap();
        let l1 = kernel.lock_init();
        kernel.test_set_current(a);
        kernel.lock_acquire(l1);

        let b = kernel.thread_create("b", 32, None).unwrap();
        let l2 = kernel.lock_init();
        kernel.test_set_current(b);
        kernel.lock_acquire(l2);
        kernel.lock_acquire(l1); // B blocks on A

        let c = kernel.thread_create("c", 50, None).unwrap();
        kernel.test_set_current(c);
        kernel.lock_acquire(l2); // C blocks on B, donation should reach A

        assert_eq!(kernel.thread_get_priority(b), 50);
        assert_eq!(kernel.thread_get_priority(a), 50);
    }
}
