//! The kernel: thread roster, ready queue, and the tick handler that drives
//! preemption and MLFQ recomputation (spec §4.1–4.3, §4.7).
//!
//! `Kernel` is the single owner of every piece of scheduling state —
//! threads, locks, semaphores, condition variables, the sleep queue — kept
//! behind one `spin::Mutex<KernelState>`, mirroring the original's single
//! `intr_disable`/`intr_set_level` critical section around the whole
//! scheduler (spec §5: no spinlocks, interrupt masking is the only mutual
//! exclusion). [`crate::arch::CriticalSection`] models that masking at the
//! Rust level; the mutex underneath exists only because this host model
//! drives `Kernel` from ordinary (possibly multi-threaded, in the test
//! sense) Rust call sites, not because the design needs a second lock.
//!
//! There is no real context switch (see the crate root doc and
//! `SPEC_FULL.md` §4): every operation acts on `KernelState::current`, and
//! a thread that blocks simply hands `current` to whatever
//! [`KernelState::schedule`] picks next and returns normally. Callers that
//! need to know which logical thread is now running call
//! [`Kernel::current`].

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::marker::PhantomData;

use log::{trace, warn};
use spin::{Mutex, MutexGuard};

use crate::arch::{Arch, CriticalSection, DefaultArch};
use crate::errors::{KernelResult, SpawnError};
use crate::fixed_point::Fp;
use crate::mem::{BoundedStackPool, StackAllocator, StackHandle};
use crate::mlfq;
use crate::sync::condvar::{self, CondVarState};
use crate::sync::lock::{self, LockState};
use crate::sync::semaphore::{self, SemaphoreState};
use crate::sync::{CondVarId, LockId, SemaphoreId};
use crate::thread::{Tcb, ThreadId, ThreadState};
use crate::time::{self, SleepRecord, Tick};
use crate::{PRI_DEFAULT, PRI_MAX};

/// Boot-time configuration (spec §6), built as a plain struct rather than
/// parsed from argv — a no_std kernel has no command line (SPEC_FULL §3.3).
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// Enable the multi-level feedback queue policy (spec §4.8). When
    /// `false`, priorities are exactly what `thread_set_priority` last set.
    pub mlfqs: bool,
    /// Timer interrupt frequency in Hz, validated to `19..=1000`.
    pub timer_freq: u32,
    /// Ticks granted to a thread before a round-robin/preemption decision
    /// (spec §4.3, `TIME_SLICE`).
    pub time_slice: u32,
    /// Capacity of the default [`BoundedStackPool`] used by [`Kernel::new`].
    pub stack_pool_capacity: usize,
    /// Busy-wait loop iterations per tick, as produced by
    /// [`time::calibrate_loops_per_tick`] against real hardware. Used only
    /// as the sub-tick fallback in `timer_msleep`/`usleep`/`nsleep`; an
    /// embedding kernel that cares about real sub-tick accuracy should
    /// calibrate this itself and override the default.
    pub loops_per_tick: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mlfqs: false,
            timer_freq: 100,
            time_slice: crate::TIME_SLICE,
            stack_pool_capacity: 64,
            loops_per_tick: 1 << 20,
        }
    }
}

/// All scheduling state, behind a single lock (spec §5).
pub(crate) struct KernelState {
    pub(crate) threads: BTreeMap<ThreadId, Tcb>,
    pub(crate) ready_queue: Vec<ThreadId>,
    pub(crate) locks: BTreeMap<LockId, LockState>,
    pub(crate) semaphores: BTreeMap<SemaphoreId, SemaphoreState>,
    pub(crate) condvars: BTreeMap<CondVarId, CondVarState>,
    pub(crate) sleep_queue: Vec<SleepRecord>,
    stack_handles: BTreeMap<ThreadId, StackHandle>,
    current: ThreadId,
    next_thread_id: u64,
    next_lock_id: u64,
    next_semaphore_id: u64,
    next_condvar_id: u64,
    next_sequence: u64,
    ticks: Tick,
    time_slice: u32,
    time_slice_elapsed: u32,
    pub(crate) mlfqs: bool,
    load_avg: Fp,
    /// The most recently exited thread, whose stack is reaped on the next
    /// `thread_exit` rather than its own (SPEC_FULL §4: a thread cannot
    /// free the stack it is still running on).
    dying: Option<ThreadId>,
}

impl KernelState {
    fn new(config: &KernelConfig) -> Self {
        let main = ThreadId::new(1);
        let mut threads = BTreeMap::new();
        threads.insert(
            main,
            Tcb {
                id: main,
                name: String::from("main"),
                state: ThreadState::Running,
                base_priority: PRI_DEFAULT,
                nice: 0,
                recent_cpu: Fp::ZERO,
                held_locks: Vec::new(),
                waiting_for: None,
                sequence: 0,
            },
        );
        Self {
            threads,
            ready_queue: Vec::new(),
            locks: BTreeMap::new(),
            semaphores: BTreeMap::new(),
            condvars: BTreeMap::new(),
            sleep_queue: Vec::new(),
            stack_handles: BTreeMap::new(),
            current: main,
            next_thread_id: 2,
            next_lock_id: 1,
            next_semaphore_id: 1,
            next_condvar_id: 1,
            next_sequence: 1,
            ticks: 0,
            time_slice: config.time_slice,
            time_slice_elapsed: 0,
            mlfqs: config.mlfqs,
            load_avg: Fp::ZERO,
            dying: None,
        }
    }

    pub(crate) fn current(&self) -> ThreadId {
        self.current
    }

    pub(crate) fn thread(&self, t: ThreadId) -> &Tcb {
        self.threads.get(&t).expect("unknown thread id")
    }

    pub(crate) fn thread_mut(&mut self, t: ThreadId) -> &mut Tcb {
        self.threads.get_mut(&t).expect("unknown thread id")
    }

    /// Effective priority, accounting for donation — except under MLFQ,
    /// where donation is disabled and the computed `base_priority` is the
    /// sole key (spec §6: "`-o mlfqs` selects MLFQ (in which case priority
    /// donation is disabled...)").
    pub(crate) fn effective_priority(&self, t: ThreadId) -> u8 {
        if self.mlfqs {
            self.thread(t).base_priority
        } else {
            self.thread(t).effective_priority()
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    pub(crate) fn next_lock_id(&mut self) -> u64 {
        let id = self.next_lock_id;
        self.next_lock_id += 1;
        id
    }

    pub(crate) fn next_semaphore_id(&mut self) -> u64 {
        let id = self.next_semaphore_id;
        self.next_semaphore_id += 1;
        id
    }

    pub(crate) fn next_condvar_id(&mut self) -> u64 {
        let id = self.next_condvar_id;
        self.next_condvar_id += 1;
        id
    }

    /// Mark `t` ready and enqueue it (spec §4.2 `thread_unblock`). Does not
    /// itself reschedule — callers decide whether a preemption check
    /// follows (spec's contract: creation and lock release yield
    /// explicitly, plain unblocks do not).
    pub(crate) fn make_ready(&mut self, t: ThreadId) {
        self.thread_mut(t).state = ThreadState::Ready;
        self.ready_queue.push(t);
    }

    /// Block the currently running thread and immediately reschedule.
    pub(crate) fn block_current(&mut self) {
        let t = self.current;
        self.thread_mut(t).state = ThreadState::Blocked;
        self.schedule();
    }

    /// Block `t`, which need not be the running thread — used when a
    /// condition-variable signal re-contends for a lock on a waiter's
    /// behalf and finds it still held (spec §4.6).
    pub(crate) fn force_blocked(&mut self, t: ThreadId) {
        self.ready_queue.retain(|&id| id != t);
        self.thread_mut(t).state = ThreadState::Blocked;
    }

    /// Index of the highest-effective-priority ready thread, ties broken
    /// by earliest `sequence` (spec §8: "FIFO within a time slice").
    fn best_ready_index(&self) -> Option<usize> {
        if self.ready_queue.is_empty() {
            return None;
        }
        let mut best = 0;
        for i in 1..self.ready_queue.len() {
            let candidate = self.ready_queue[i];
            let incumbent = self.ready_queue[best];
            let cp = self.effective_priority(candidate);
            let ip = self.effective_priority(incumbent);
            if cp > ip
                || (cp == ip && self.thread(candidate).sequence < self.thread(incumbent).sequence)
            {
                best = i;
            }
        }
        Some(best)
    }

    fn pick_next(&mut self) -> Option<ThreadId> {
        let idx = self.best_ready_index()?;
        Some(self.ready_queue.remove(idx))
    }

    /// Dispatch the next ready thread as `current`. If none is ready, the
    /// caller's thread stays whatever state it was left in — this model
    /// has no idle thread of last resort (SPEC_FULL §4 simplification).
    fn schedule(&mut self) {
        self.time_slice_elapsed = 0;
        match self.pick_next() {
            Some(next) => {
                trace!("schedule: dispatching thread {}", next.as_u64());
                self.thread_mut(next).state = ThreadState::Running;
                self.current = next;
            }
            None => {
                warn!("schedule: no ready thread; current thread stays as left by the caller");
            }
        }
    }

    /// Voluntary yield (spec `thread_yield`): requeue the current thread
    /// and dispatch, even to a thread of equal priority.
    pub(crate) fn yield_current(&mut self) {
        if self.ready_queue.is_empty() {
            return;
        }
        self.requeue_current();
        self.schedule();
    }

    fn requeue_current(&mut self) {
        let cur = self.current;
        let seq = self.next_sequence();
        let t = self.thread_mut(cur);
        t.state = ThreadState::Ready;
        t.sequence = seq;
        self.ready_queue.push(cur);
    }

    /// Preempt immediately if a ready thread now strictly outranks the
    /// current one (spec: creation and lock/semaphore release check this).
    pub(crate) fn yield_if_higher(&mut self) {
        if let Some(idx) = self.best_ready_index() {
            let candidate = self.ready_queue[idx];
            if self.effective_priority(candidate) > self.effective_priority(self.current) {
                self.ready_queue.remove(idx);
                self.requeue_current();
                self.thread_mut(candidate).state = ThreadState::Running;
                self.current = candidate;
                self.time_slice_elapsed = 0;
            }
        }
    }

    /// End-of-time-slice rotation (spec §4.3/§8: round robin within a
    /// priority level). Unlike [`Self::yield_if_higher`], this also
    /// rotates among threads of *equal* priority.
    fn yield_for_timeslice(&mut self) {
        if let Some(idx) = self.best_ready_index() {
            let candidate = self.ready_queue[idx];
            if self.effective_priority(candidate) >= self.effective_priority(self.current) {
                self.ready_queue.remove(idx);
                self.requeue_current();
                self.thread_mut(candidate).state = ThreadState::Running;
                self.current = candidate;
            }
        }
        self.time_slice_elapsed = 0;
    }
}

/// The scheduler core. Generic over the hardware seam ([`Arch`]) and the
/// stack-exhaustion model ([`StackAllocator`]) so an embedding kernel can
/// supply real ones; [`Kernel::new`] wires up the host-testable defaults.
pub struct Kernel<A: Arch = DefaultArch, S: StackAllocator = BoundedStackPool> {
    inner: Mutex<KernelState>,
    stacks: S,
    config: KernelConfig,
    _arch: PhantomData<A>,
}

impl Kernel<DefaultArch, BoundedStackPool> {
    /// Build a kernel with the default host [`Arch`] and a
    /// [`BoundedStackPool`] sized by `config.stack_pool_capacity`.
    pub fn new(config: KernelConfig) -> Self {
        let stacks = BoundedStackPool::new(config.stack_pool_capacity);
        Self::with_stacks(config, stacks)
    }
}

impl<A: Arch, S: StackAllocator> Kernel<A, S> {
    pub fn with_stacks(config: KernelConfig, stacks: S) -> Self {
        assert!(
            (19..=1000).contains(&config.timer_freq),
            "timer frequency {} Hz outside supported 19..=1000 Hz range",
            config.timer_freq
        );
        Self {
            inner: Mutex::new(KernelState::new(&config)),
            stacks,
            config,
            _arch: PhantomData,
        }
    }

    fn lock(&self) -> (CriticalSection<A>, MutexGuard<'_, KernelState>) {
        let cs = CriticalSection::<A>::enter();
        let state = self.inner.lock();
        (cs, state)
    }

    // ---- Thread lifecycle (spec §4.2) ----------------------------------

    /// Register a new thread, initially blocked, then make it ready —
    /// spec.md's `create` minus the `fn`/`arg` payload (SPEC_FULL §4: this
    /// crate never jumps into thread code). Yields immediately if the new
    /// thread outranks the caller.
    pub fn thread_create(&self, name: &str, priority: u8, nice: Option<i8>) -> KernelResult<ThreadId> {
        assert!(priority <= PRI_MAX, "priority {priority} exceeds PRI_MAX");
        let handle = match self.stacks.alloc() {
            Some(h) => h,
            None => {
                warn!("thread_create({name:?}): stack pool exhausted");
                return Err(SpawnError::OutOfMemory.into());
            }
        };
        let (_cs, mut state) = self.lock();
        let id = ThreadId::new(state.next_thread_id);
        state.next_thread_id += 1;
        let sequence = state.next_sequence();
        state.threads.insert(
            id,
            Tcb {
                id,
                name: String::from(name),
                state: ThreadState::Blocked,
                base_priority: priority,
                nice: nice.unwrap_or(0),
                recent_cpu: Fp::ZERO,
                held_locks: Vec::new(),
                waiting_for: None,
                sequence,
            },
        );
        state.stack_handles.insert(id, handle);
        state.make_ready(id);
        trace!("thread_create: {name:?} -> tid {}", id.as_u64());
        state.yield_if_higher();
        Ok(id)
    }

    pub fn current(&self) -> ThreadId {
        self.inner.lock().current()
    }

    pub fn tid(&self, t: ThreadId) -> u64 {
        t.as_u64()
    }

    /// Visit every thread in the roster, interrupts masked for the whole
    /// walk (spec §4.2 `for_each_thread`, used internally by MLFQ's
    /// per-second recomputation).
    pub fn for_each_thread(&self, mut f: impl FnMut(ThreadId)) {
        let (_cs, state) = self.lock();
        for id in state.threads.keys() {
            f(*id);
        }
    }

    /// Mark the caller Dying and switch away. Reaps the *previous* Dying
    /// thread's stack, not its own — freeing the stack you're still
    /// running on is undefined, so the reap always trails by one exit
    /// (SPEC_FULL §4). Returns normally rather than diverging: the
    /// embedding kernel, which owns the real control-flow jump into the
    /// next thread, is the one that never returns to dead code.
    pub fn thread_exit(&self) {
        let (_cs, mut state) = self.lock();
        let t = state.current();
        assert!(
            state.thread(t).held_locks.is_empty(),
            "thread exited while still holding a lock"
        );
        state.thread_mut(t).state = ThreadState::Dying;
        if let Some(prev) = state.dying.replace(t) {
            if let Some(handle) = state.stack_handles.remove(&prev) {
                self.stacks.dealloc(handle);
            }
            state.threads.remove(&prev);
        }
        state.schedule();
    }

    pub fn thread_yield(&self) {
        let (_cs, mut state) = self.lock();
        state.yield_current();
    }

    /// Voluntarily block the calling thread.
    pub fn thread_block(&self) {
        let (_cs, mut state) = self.lock();
        state.block_current();
    }

    pub fn thread_unblock(&self, t: ThreadId) {
        let (_cs, mut state) = self.lock();
        state.make_ready(t);
    }

    /// Set the caller's base priority. Disallowed under MLFQ, where
    /// priority is derived, not assigned (spec §4.8).
    pub fn thread_set_priority(&self, priority: u8) {
        assert!(priority <= PRI_MAX, "priority {priority} exceeds PRI_MAX");
        let (_cs, mut state) = self.lock();
        assert!(!state.mlfqs, "thread_set_priority is disabled while MLFQ is active");
        let t = state.current();
        state.thread_mut(t).base_priority = priority;
        state.yield_if_higher();
    }

    pub fn thread_get_priority(&self, t: ThreadId) -> u8 {
        let (_cs, state) = self.lock();
        state.effective_priority(t)
    }

    /// `t`'s position in the state machine of spec §4.3 (Running, Ready,
    /// Blocked, or Dying).
    pub fn thread_state(&self, t: ThreadId) -> ThreadState {
        let (_cs, state) = self.lock();
        state.thread(t).state
    }

    pub fn thread_set_nice(&self, nice: i8) {
        assert!((-20..=20).contains(&nice), "nice {nice} outside -20..=20");
        let (_cs, mut state) = self.lock();
        let t = state.current();
        state.thread_mut(t).nice = nice;
        if state.mlfqs {
            let recomputed = mlfq::recompute_priority(state.thread(t).recent_cpu, nice);
            state.thread_mut(t).base_priority = recomputed;
        }
        state.yield_if_higher();
    }

    pub fn thread_get_nice(&self) -> i8 {
        let (_cs, state) = self.lock();
        let t = state.current();
        state.thread(t).nice
    }

    pub fn thread_get_load_avg(&self) -> i32 {
        let (_cs, state) = self.lock();
        mlfq::scaled_report(state.load_avg)
    }

    pub fn thread_get_recent_cpu(&self) -> i32 {
        let (_cs, state) = self.lock();
        let t = state.current();
        mlfq::scaled_report(state.thread(t).recent_cpu)
    }

    // ---- Semaphores (spec §4.4) ----------------------------------------

    pub fn sema_init(&self, value: u32) -> SemaphoreId {
        let (_cs, mut state) = self.lock();
        semaphore::init(&mut state, value)
    }

    pub fn sema_down(&self, sem: SemaphoreId) {
        assert!(!A::in_interrupt_context(), "sema_down called from interrupt context");
        let (_cs, mut state) = self.lock();
        semaphore::down(&mut state, sem);
    }

    pub fn sema_try_down(&self, sem: SemaphoreId) -> bool {
        let (_cs, mut state) = self.lock();
        semaphore::try_down(&mut state, sem)
    }

    pub fn sema_up(&self, sem: SemaphoreId) {
        let (_cs, mut state) = self.lock();
        semaphore::up(&mut state, sem);
        state.yield_if_higher();
    }

    // ---- Locks with priority donation (spec §4.5) ----------------------

    pub fn lock_init(&self) -> LockId {
        let (_cs, mut state) = self.lock();
        lock::init(&mut state)
    }

    pub fn lock_acquire(&self, l: LockId) {
        assert!(!A::in_interrupt_context(), "lock_acquire called from interrupt context");
        let (_cs, mut state) = self.lock();
        lock::acquire(&mut state, l);
    }

    pub fn lock_try_acquire(&self, l: LockId) -> bool {
        let (_cs, mut state) = self.lock();
        lock::try_acquire(&mut state, l)
    }

    pub fn lock_release(&self, l: LockId) {
        let (_cs, mut state) = self.lock();
        lock::release(&mut state, l);
    }

    pub fn lock_held_by_current(&self, l: LockId) -> bool {
        let (_cs, state) = self.lock();
        lock::held_by_current(&state, l)
    }

    // ---- Condition variables (spec §4.6) -------------------------------

    pub fn cond_init(&self) -> CondVarId {
        let (_cs, mut state) = self.lock();
        condvar::init(&mut state)
    }

    pub fn cond_wait(&self, c: CondVarId, l: LockId) {
        assert!(!A::in_interrupt_context(), "cond_wait called from interrupt context");
        let (_cs, mut state) = self.lock();
        condvar::wait(&mut state, c, l);
    }

    pub fn cond_signal(&self, c: CondVarId, l: LockId) {
        let (_cs, mut state) = self.lock();
        condvar::signal(&mut state, c, l);
    }

    pub fn cond_broadcast(&self, c: CondVarId, l: LockId) {
        let (_cs, mut state) = self.lock();
        condvar::broadcast(&mut state, c, l);
    }

    // ---- Timer & tick handler (spec §4.7) -------------------------------

    pub fn timer_ticks(&self) -> Tick {
        self.inner.lock().ticks
    }

    pub fn timer_elapsed(&self, since: Tick) -> Tick {
        self.timer_ticks().saturating_sub(since)
    }

    /// Block the caller until at least `ticks` timer ticks have elapsed.
    /// A non-positive `ticks` returns immediately (spec's `timer_sleep`).
    pub fn timer_sleep(&self, ticks: i64) {
        assert!(!A::in_interrupt_context(), "timer_sleep called from interrupt context");
        if ticks <= 0 {
            return;
        }
        let (_cs, mut state) = self.lock();
        let t = state.current();
        let wake_tick = state.ticks + ticks as u64;
        let sequence = state.next_sequence();
        time::sleep_enqueue(&mut state.sleep_queue, SleepRecord { thread: t, wake_tick, sequence });
        state.block_current();
    }

    fn real_time_sleep(&self, num: i64, denom: i64) {
        let ticks = time::ticks_for(num, denom, self.config.timer_freq);
        if ticks > 0 {
            self.timer_sleep(ticks);
        } else {
            assert!(!A::in_interrupt_context(), "sub-tick sleep called from interrupt context");
            let loops = (self.config.loops_per_tick as i128 * num as i128 * self.config.timer_freq as i128
                / denom as i128)
                .max(0) as u64;
            time::busy_wait(loops);
        }
    }

    pub fn timer_msleep(&self, ms: i64) {
        self.real_time_sleep(ms, 1_000);
    }

    pub fn timer_usleep(&self, us: i64) {
        self.real_time_sleep(us, 1_000_000);
    }

    pub fn timer_nsleep(&self, ns: i64) {
        self.real_time_sleep(ns, 1_000_000_000);
    }

    /// The timer-interrupt handler (spec §4.7's five steps): charge the
    /// running thread's `recent_cpu`, recompute MLFQ stats once a second,
    /// wake due sleepers, and rotate/preempt at the end of a time slice.
    /// Called from interrupt context, so unlike the blocking calls above
    /// it does not assert against it.
    pub fn tick(&self) {
        let (_cs, mut state) = self.lock();
        state.ticks += 1;

        if state.mlfqs {
            let cur = state.current();
            let charged = mlfq::charge_tick(state.thread(cur).recent_cpu);
            state.thread_mut(cur).recent_cpu = charged;

            if state.ticks % self.config.timer_freq as u64 == 0 {
                // Open Question (b), resolved: include the running thread.
                let ready_count = state.ready_queue.len() as u32 + 1;
                state.load_avg = mlfq::recompute_load_avg(state.load_avg, ready_count);
                let load_avg = state.load_avg;
                let ids: Vec<ThreadId> = state.threads.keys().copied().collect();
                for id in ids {
                    let (cpu, nice) = {
                        let t = state.thread(id);
                        (t.recent_cpu, t.nice)
                    };
                    state.thread_mut(id).recent_cpu = mlfq::recompute_recent_cpu(cpu, load_avg, nice);
                }
            }
        }

        let woken = time::drain_due(&mut state.sleep_queue, state.ticks);
        for t in woken {
            trace!("tick: waking sleeper {}", t.as_u64());
            state.make_ready(t);
        }

        state.time_slice_elapsed += 1;
        if state.time_slice_elapsed >= state.time_slice {
            if state.mlfqs {
                let ids: Vec<ThreadId> = state.threads.keys().copied().collect();
                for id in ids {
                    let (cpu, nice) = {
                        let t = state.thread(id);
                        (t.recent_cpu, t.nice)
                    };
                    state.thread_mut(id).base_priority = mlfq::recompute_priority(cpu, nice);
                }
            }
            state.yield_for_timeslice();
        }
    }

    // ---- Test-only simulation hooks ------------------------------------

    /// Force `t` to become the running thread, demoting the previously
    /// running thread to Ready. This crate has no real concurrency to
    /// infer "who runs next" from between independent calls, so tests (and
    /// a single-stepping embedding shim) drive it explicitly instead.
    #[cfg(any(test, feature = "std-shim"))]
    pub fn test_set_current(&self, t: ThreadId) {
        let (_cs, mut state) = self.lock();
        assert!(state.threads.contains_key(&t), "unknown thread id");
        let prev = state.current;
        if prev != t && state.thread(prev).state == ThreadState::Running {
            state.thread_mut(prev).state = ThreadState::Ready;
            let seq = state.next_sequence();
            state.thread_mut(prev).sequence = seq;
            state.ready_queue.push(prev);
        }
        state.ready_queue.retain(|&id| id != t);
        state.thread_mut(t).state = ThreadState::Running;
        state.current = t;
    }

    #[cfg(any(test, feature = "std-shim"))]
    pub(crate) fn test_state(&self) -> MutexGuard<'_, KernelState> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_kernel_has_main_thread_running() {
        let kernel = Kernel::new(KernelConfig::default());
        let main = kernel.current();
        assert_eq!(kernel.tid(main), 1);
        assert_eq!(kernel.thread_get_priority(main), PRI_DEFAULT);
    }

    #[test]
    fn creating_a_higher_priority_thread_preempts() {
        let kernel = Kernel::new(KernelConfig::default());
        let main = kernel.current();
        let high = kernel.thread_create("high", PRI_MAX, None).unwrap();
        assert_eq!(kernel.current(), high);
        assert_eq!(kernel.thread_get_priority(main), PRI_DEFAULT);
    }

    #[test]
    fn ready_queue_picks_highest_priority_first() {
        let kernel = Kernel::new(KernelConfig::default());
        let low = kernel.thread_create("low", 10, None).unwrap();
        let _mid = kernel.thread_create("mid", 20, None).unwrap();
        // `low` never preempted main (10 < 31); requeue main so the ready
        // queue now holds {low, mid} and force a pick.
        kernel.thread_yield();
        assert_ne!(kernel.current(), low);
    }

    #[test]
    fn thread_exit_reaps_previous_dying_threads_stack() {
        let kernel = Kernel::new(KernelConfig::default());
        let a = kernel.thread_create("a", 31, None).unwrap();
        kernel.test_set_current(a);
        kernel.thread_exit();
        // `a` is Dying but not yet reaped (it was the first exit).
        assert_eq!(kernel.test_state().stack_handles.len(), 2);

        let b = kernel.thread_create("b", 31, None).unwrap();
        kernel.test_set_current(b);
        kernel.thread_exit();
        // Exiting `b` reaps `a`'s stack.
        assert!(!kernel.test_state().threads.contains_key(&a));
    }

    #[test]
    fn tick_wakes_sleepers_in_order() {
        let kernel = Kernel::new(KernelConfig::default());
        let a = kernel.thread_create("a", 31, None).unwrap();
        kernel.test_set_current(a);
        kernel.timer_sleep(3);
        // `a` blocked; main is whichever thread was left running before we
        // switched — drive ticks from a fresh vantage thread.
        let driver = kernel.thread_create("driver", 31, None).unwrap();
        kernel.test_set_current(driver);
        for _ in 0..3 {
            kernel.tick();
        }
        assert_eq!(kernel.test_state().thread(a).state, ThreadState::Ready);
    }

    /// Minimal linear-congruential generator, grounded on the teacher's
    /// `tests/property.rs` `SimpleRng` (same constants, same API shape),
    /// used here to churn random priorities through the ready queue and
    /// check the invariant spec §8 states for it: sorted descending by
    /// effective priority, FIFO among equal priorities.
    struct SimpleRng {
        state: u64,
    }

    impl SimpleRng {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn next_u64(&mut self) -> u64 {
            self.state = self
                .state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.state
        }

        fn gen_range(&mut self, min: u64, max: u64) -> u64 {
            min + (self.next_u64() % (max - min))
        }
    }

    #[test]
    fn ready_queue_ordering_holds_under_random_priority_churn() {
        let mut rng = SimpleRng::new(0xC0FFEE);
        let kernel = Kernel::new(KernelConfig::default());

        // A pool of threads at random priorities, none of which ever
        // preempts main (capped below PRI_DEFAULT) so the ready queue
        // accumulates instead of draining one at a time.
        let mut pool = Vec::new();
        for i in 0..40 {
            let priority = rng.gen_range(0, PRI_DEFAULT as u64) as u8;
            let t = kernel
                .thread_create(&alloc::format!("churn-{i}"), priority, None)
                .unwrap();
            pool.push(t);

            // Every few creations, yield the current thread back into the
            // queue and confirm whoever is picked next is a true argmax by
            // (effective priority desc, sequence asc) over everyone ready.
            if i % 3 == 2 {
                kernel.thread_yield();
                let state = kernel.test_state();
                let winner = state.current();
                let winner_key =
                    (state.effective_priority(winner), state.thread(winner).sequence);
                for &candidate in state.threads.keys() {
                    if candidate == winner || state.thread(candidate).state != ThreadState::Ready {
                        continue;
                    }
                    let key = (
                        state.effective_priority(candidate),
                        state.thread(candidate).sequence,
                    );
                    assert!(
                        winner_key.0 > key.0 || (winner_key.0 == key.0 && winner_key.1 < key.1),
                        "ready queue picked {:?} over a higher-ranked {:?}",
                        winner,
                        candidate
                    );
                }
            }
        }
    }
}
