//! Tick counter, sleep queue, and calibration (spec §4.7).
//!
//! Grounded on `original_source/devices/timer.c`: the sleep queue is the
//! same `wake_up`-record-per-sleeper design ordered ascending by wake
//! time, and [`calibrate_loops_per_tick`] is a direct translation of
//! `timer_calibrate`'s binary-bit-refinement search. Unlike the original,
//! sleep records are freed at wake rather than leaked (SPEC_FULL §4,
//! resolving the source's commented-out `free(wu)`), and the real-time
//! busy-wait measurement is parametrized over a caller-supplied
//! `too_many_loops` probe instead of reading hardware directly, so the
//! search itself stays host-testable.

use alloc::vec::Vec;

use crate::thread::ThreadId;

pub type Tick = u64;

/// One sleeping thread's wake record (spec §3: "Sleep Queue").
#[derive(Debug, Clone, Copy)]
pub(crate) struct SleepRecord {
    pub thread: ThreadId,
    pub wake_tick: Tick,
    pub sequence: u64,
}

/// Insert `record` into `queue`, kept ascending by `wake_tick`, ties broken
/// by insertion order.
pub(crate) fn sleep_enqueue(queue: &mut Vec<SleepRecord>, record: SleepRecord) {
    let pos = queue
        .iter()
        .position(|r| r.wake_tick > record.wake_tick)
        .unwrap_or(queue.len());
    queue.insert(pos, record);
}

/// Remove and return every record whose `wake_tick` has arrived, in
/// ascending wake order — the order they must be unblocked in.
pub(crate) fn drain_due(queue: &mut Vec<SleepRecord>, now: Tick) -> Vec<ThreadId> {
    let split = queue.iter().position(|r| r.wake_tick > now).unwrap_or(queue.len());
    queue.drain(..split).map(|r| r.thread).collect()
}

/// Convert a `num/denom` second interval to whole ticks, rounding down
/// (`real_time_sleep`'s `num * TIMER_FREQ / denom`).
pub fn ticks_for(num: i64, denom: i64, timer_freq: u32) -> i64 {
    num * timer_freq as i64 / denom
}

/// A local busy-wait loop for sub-tick delays (`busy_wait` in the
/// original). Not a substitute for `sleep`: it does not yield the CPU.
pub fn busy_wait(loops: u64) {
    for _ in 0..loops {
        core::hint::spin_loop();
    }
}

/// Calibrate `loops_per_tick`, the largest loop count that reliably
/// completes within a single timer tick, via binary-bit refinement.
///
/// `too_many_loops(n)` must report whether running `n` busy-wait
/// iterations took longer than one tick; a real kernel measures this
/// against its timer, a test measures it against a simulated clock.
pub fn calibrate_loops_per_tick(mut too_many_loops: impl FnMut(u64) -> bool) -> u64 {
    let mut loops_per_tick: u64 = 1 << 10;
    while !too_many_loops(loops_per_tick << 1) {
        loops_per_tick <<= 1;
        assert!(loops_per_tick != 0, "loops_per_tick overflowed during calibration");
    }

    let high_bit = loops_per_tick;
    let mut test_bit = high_bit >> 1;
    while test_bit != high_bit >> 10 {
        if !too_many_loops(high_bit | test_bit) {
            loops_per_tick |= test_bit;
        }
        test_bit >>= 1;
    }
    loops_per_tick
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(n: u64) -> ThreadId {
        ThreadId::new(n)
    }

    #[test]
    fn sleep_queue_orders_by_wake_tick() {
        let mut q = Vec::new();
        sleep_enqueue(&mut q, SleepRecord { thread: tid(1), wake_tick: 100, sequence: 0 });
        sleep_enqueue(&mut q, SleepRecord { thread: tid(2), wake_tick: 50, sequence: 1 });
        sleep_enqueue(&mut q, SleepRecord { thread: tid(3), wake_tick: 75, sequence: 2 });
        let order: Vec<u64> = q.iter().map(|r| r.thread.as_u64()).collect();
        assert_eq!(order, alloc::vec![2, 3, 1]);
    }

    #[test]
    fn sleep_queue_ties_preserve_insertion_order() {
        let mut q = Vec::new();
        sleep_enqueue(&mut q, SleepRecord { thread: tid(1), wake_tick: 10, sequence: 0 });
        sleep_enqueue(&mut q, SleepRecord { thread: tid(2), wake_tick: 10, sequence: 1 });
        let order: Vec<u64> = q.iter().map(|r| r.thread.as_u64()).collect();
        assert_eq!(order, alloc::vec![1, 2]);
    }

    #[test]
    fn drain_due_removes_only_elapsed_records() {
        let mut q = Vec::new();
        sleep_enqueue(&mut q, SleepRecord { thread: tid(1), wake_tick: 50, sequence: 0 });
        sleep_enqueue(&mut q, SleepRecord { thread: tid(2), wake_tick: 100, sequence: 1 });
        let woken = drain_due(&mut q, 75);
        assert_eq!(woken, alloc::vec![tid(1)]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn ticks_for_rounds_down() {
        assert_eq!(ticks_for(999, 1000, 100), 99);
        assert_eq!(ticks_for(1000, 1000, 100), 100);
    }

    #[test]
    fn calibration_finds_bit_pattern() {
        // Simulated clock: anything at or above 5000 loops "too many".
        let result = calibrate_loops_per_tick(|loops| loops >= 5000);
        assert!(result < 5000);
        assert!(result >= 2560); // 1<<10 .. stays below the threshold
    }
}
