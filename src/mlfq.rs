//! Multi-level feedback queue recomputation (spec §4.8).
//!
//! Pure functions over [`Fp`] values; [`crate::sched`] calls these from the
//! tick handler and threads it the `load_avg`/`recent_cpu`/`priority`
//! fields to update. Kept free of any `Kernel` state so the formulas are
//! unit-testable in isolation, mirroring how `original_source` keeps the
//! MLFQ math (`thread.c`'s `mlfqs_*` helpers) separate from the scheduler's
//! bookkeeping.

use crate::fixed_point::Fp;
use crate::{PRI_MAX, PRI_MIN};

/// `load_avg = (59/60)*load_avg + (1/60)*ready_count`.
pub fn recompute_load_avg(load_avg: Fp, ready_count: u32) -> Fp {
    let decay = Fp::from_int(59).div_int(60).mul_fp(load_avg);
    let influx = Fp::from_int(1).div_int(60).mul_int(ready_count as i32);
    decay.add(influx)
}

/// `recent_cpu = (2*load_avg)/(2*load_avg + 1) * recent_cpu + nice`.
pub fn recompute_recent_cpu(recent_cpu: Fp, load_avg: Fp, nice: i8) -> Fp {
    let two_load_avg = load_avg.mul_int(2);
    let coefficient = two_load_avg.div_fp(two_load_avg.add_int(1));
    coefficient.mul_fp(recent_cpu).add_int(nice as i32)
}

/// `priority = PRI_MAX - (recent_cpu/4) - (nice*2)`, clamped and truncated
/// toward negative infinity.
pub fn recompute_priority(recent_cpu: Fp, nice: i8) -> u8 {
    let raw = Fp::from_int(PRI_MAX as i32)
        .sub(recent_cpu.div_int(4))
        .sub(Fp::from_int(nice as i32 * 2));
    raw.floor().clamp(PRI_MIN as i32, PRI_MAX as i32) as u8
}

/// `recent_cpu += 1`, charged to the running thread once per tick (never to
/// idle).
pub fn charge_tick(recent_cpu: Fp) -> Fp {
    recent_cpu.add_int(1)
}

/// `get_load_avg()`/`get_recent_cpu()`: report 100x the value, rounded to
/// the nearest integer (spec §4.8).
pub fn scaled_report(value: Fp) -> i32 {
    value.mul_int(100).round()
}
