//! Counting semaphore with priority-ordered waiters (spec §4.4).
//!
//! This crate performs no real context switch, so a blocked call cannot
//! literally pause and resume later the way Pintos' `sema_down` does after
//! `thread_block()`. Instead, whichever call *wakes* a waiter completes
//! that waiter's pending work on its behalf — here, "completion" is simply
//! handing the unit of the semaphore directly to the woken thread instead
//! of incrementing `value` and trusting the waiter to redecrement itself.
//! The two are observably equivalent: spec's `up` increments then the
//! woken `down` immediately decrements, net zero; skipping both steps
//! produces the same `value` without requiring a resumable call. See
//! `DESIGN.md` for the full argument, which applies identically to the
//! lock's embedded semaphore and the condition variable's private ones.

use alloc::vec::Vec;

use super::handle_id;
use crate::sched::KernelState;
use crate::thread::ThreadId;

handle_id!(SemaphoreId);

#[derive(Debug)]
pub(crate) struct SemaphoreState {
    pub(crate) value: u32,
    pub(crate) waiters: Vec<ThreadId>,
}

pub(crate) fn init(state: &mut KernelState, value: u32) -> SemaphoreId {
    let id = SemaphoreId::new(state.next_semaphore_id());
    state.semaphores.insert(
        id,
        SemaphoreState {
            value,
            waiters: Vec::new(),
        },
    );
    id
}

/// Non-blocking decrement: succeeds iff `value > 0` (spec's `try_down`).
pub(crate) fn try_down(state: &mut KernelState, sem: SemaphoreId) -> bool {
    let s = state.semaphores.get_mut(&sem).expect("unknown semaphore");
    if s.value > 0 {
        s.value -= 1;
        true
    } else {
        false
    }
}

/// Blocking decrement on the currently running thread.
pub(crate) fn down(state: &mut KernelState, sem: SemaphoreId) {
    if try_down(state, sem) {
        return;
    }
    let t = state.current();
    enqueue_waiter(state, sem, t);
    state.block_current();
}

/// Record `t` as waiting on `sem` without touching its scheduling state —
/// the caller decides whether `t` is the running thread (and must be
/// rescheduled) or a third thread being re-queued on its behalf (e.g. a
/// condition-variable waiter re-contending for its lock).
pub(crate) fn enqueue_waiter(state: &mut KernelState, sem: SemaphoreId, t: ThreadId) {
    state
        .semaphores
        .get_mut(&sem)
        .expect("unknown semaphore")
        .waiters
        .push(t);
}

/// Wake the highest-effective-priority waiter, or increment `value` if
/// none are waiting (spec's ordering contract: argmax on each `up`, since
/// a waiter's priority may have changed via donation while parked).
pub(crate) fn up(state: &mut KernelState, sem: SemaphoreId) -> Option<ThreadId> {
    match pop_highest_priority_waiter(state, sem) {
        Some(t) => {
            state.make_ready(t);
            Some(t)
        }
        None => {
            increment(state, sem);
            None
        }
    }
}

pub(crate) fn increment(state: &mut KernelState, sem: SemaphoreId) {
    state.semaphores.get_mut(&sem).expect("unknown semaphore").value += 1;
}

/// Remove and return the waiter with the highest effective priority,
/// ties broken by earliest arrival.
pub(crate) fn pop_highest_priority_waiter(
    state: &mut KernelState,
    sem: SemaphoreId,
) -> Option<ThreadId> {
    let mut waiters = core::mem::take(
        &mut state
            .semaphores
            .get_mut(&sem)
            .expect("unknown semaphore")
            .waiters,
    );
    if waiters.is_empty() {
        state.semaphores.get_mut(&sem).unwrap().waiters = waiters;
        return None;
    }
    let mut best = 0;
    for i in 1..waiters.len() {
        if state.effective_priority(waiters[i]) > state.effective_priority(waiters[best]) {
            best = i;
        }
    }
    let winner = waiters.remove(best);
    state.semaphores.get_mut(&sem).unwrap().waiters = waiters;
    Some(winner)
}

pub(crate) fn value(state: &KernelState, sem: SemaphoreId) -> u32 {
    state.semaphores.get(&sem).expect("unknown semaphore").value
}

pub(crate) fn waiter_count(state: &KernelState, sem: SemaphoreId) -> usize {
    state.semaphores.get(&sem).expect("unknown semaphore").waiters.len()
}
