//! Mesa-style condition variable over a lock (spec §4.6).
//!
//! Each waiter parks on a private, single-use semaphore rather than a
//! shared one, so `signal` can wake exactly one waiter without disturbing
//! the others — the same shape as `original_source`'s `cond_wait`, which
//! allocates a fresh semaphore and list element on the waiter's own stack
//! frame. `signal` also completes the woken waiter's re-acquisition of the
//! lock on its behalf (see [`crate::sync::semaphore`]'s module doc for why
//! that is necessary here), which naturally reproduces Mesa semantics: the
//! woken thread cannot actually run again until whoever signaled it
//! releases the lock, because [`super::lock::acquire_as`] finds the lock
//! still held and re-blocks it on the lock's own waiter list.

use alloc::vec::Vec;

use super::handle_id;
use super::lock::{self, LockId};
use super::semaphore::{self, SemaphoreId};
use crate::sched::KernelState;
use crate::thread::ThreadId;

handle_id!(CondVarId);

#[derive(Debug, Default)]
pub(crate) struct CondVarState {
    pub(crate) waiters: Vec<(ThreadId, SemaphoreId)>,
}

pub(crate) fn init(state: &mut KernelState) -> CondVarId {
    let id = CondVarId::new(state.next_condvar_id());
    state.condvars.insert(id, CondVarState::default());
    id
}

pub(crate) fn wait(state: &mut KernelState, cond: CondVarId, lock: LockId) {
    let t = state.current();
    assert!(
        lock::held_by_current(state, lock),
        "cond_wait requires the caller to hold the lock"
    );
    let private = semaphore::init(state, 0);
    state
        .condvars
        .get_mut(&cond)
        .expect("unknown condvar")
        .waiters
        .push((t, private));
    lock::release(state, lock);
    // Always blocks: a fresh semaphore starts at 0, so there is nothing to
    // decrement yet. Re-acquiring `lock` happens in `signal`, not here —
    // this call cannot resume itself once it blocks.
    semaphore::down(state, private);
}

pub(crate) fn signal(state: &mut KernelState, cond: CondVarId, lock: LockId) {
    assert!(
        lock::held_by_current(state, lock),
        "cond_signal requires the caller to hold the lock"
    );
    if let Some((t, private)) = pop_highest_priority_waiter(state, cond) {
        semaphore::up(state, private);
        lock::acquire_as(state, lock, t);
    }
}

pub(crate) fn broadcast(state: &mut KernelState, cond: CondVarId, lock: LockId) {
    while !state.condvars[&cond].waiters.is_empty() {
        signal(state, cond, lock);
    }
}

pub(crate) fn waiter_count(state: &KernelState, cond: CondVarId) -> usize {
    state.condvars[&cond].waiters.len()
}

fn pop_highest_priority_waiter(
    state: &mut KernelState,
    cond: CondVarId,
) -> Option<(ThreadId, SemaphoreId)> {
    let mut waiters = core::mem::take(
        &mut state
            .condvars
            .get_mut(&cond)
            .expect("unknown condvar")
            .waiters,
    );
    if waiters.is_empty() {
        state.condvars.get_mut(&cond).unwrap().waiters = waiters;
        return None;
    }
    let mut best = 0;
    for i in 1..waiters.len() {
        if state.effective_priority(waiters[i].0) > state.effective_priority(waiters[best].0) {
            best = i;
        }
    }
    let winner = waiters.remove(best);
    state.condvars.get_mut(&cond).unwrap().waiters = waiters;
    Some(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::{Kernel, KernelConfig};

    #[test]
    fn signal_wakes_highest_priority_waiter_first() {
        let kernel = Kernel::new(KernelConfig::default());
        let lock = kernel.lock_init();
        let cond = kernel.cond_init();

        let low = kernel.thread_create("low", 31, None).unwrap();
        let mid = kernel.thread_create("mid", 40, None).unwrap();
        let high = kernel.thread_create("high", 45, None).unwrap();

        for t in [low, mid, high] {
            kernel.test_set_current(t);
            kernel.lock_acquire(lock);
            kernel.cond_wait(cond, lock);
        }

        // The lock is free (its last holder released it via cond_wait);
        // pick an uninvolved thread to drive the signals from.
        let driver = kernel.thread_create("driver", 20, None).unwrap();
        kernel.test_set_current(driver);
        kernel.lock_acquire(lock);

        // `signal` only wakes `high` as far as Mesa semantics allow: `high`
        // cannot actually hold the lock until `driver` releases it, so it
        // re-blocks on the lock itself (see this module's doc comment).
        kernel.cond_signal(cond, lock);
        assert_eq!(lock::holder(&kernel.test_state(), lock), Some(driver));

        kernel.lock_release(lock);
        assert_eq!(lock::holder(&kernel.test_state(), lock), Some(high));
        assert_eq!(kernel.current(), high);

        // `high` is done with the lock; freeing it doesn't wake `mid` or
        // `low`, since they are still parked on the condvar, not the lock.
        kernel.lock_release(lock);

        kernel.test_set_current(driver);
        kernel.lock_acquire(lock);
        kernel.cond_signal(cond, lock);
        kernel.lock_release(lock);
        assert_eq!(lock::holder(&kernel.test_state(), lock), Some(mid));
        assert_eq!(kernel.current(), mid);
    }
}
