//! Integration suite translating spec §8's numbered scenarios into
//! assertions. The per-module unit tests already cover scenarios 2, 3, and
//! 5 (simple/nested donation, condition-variable ordering); this suite
//! covers the remaining ones plus a couple of the stated invariants.
//!
//! Requires the `std-shim` feature, since [`Kernel::test_set_current`] —
//! needed to drive this model's simulated single-current-thread execution
//! without a real context switch — is gated behind it outside the crate's
//! own unit tests: `cargo test --features std-shim`.

#![cfg(feature = "std-shim")]

use donor_sched::{Kernel, KernelConfig, PRI_MAX};

/// Scenario 1: creating a higher-priority thread must preempt immediately.
#[test]
fn scenario1_priority_preemption_on_create() {
    let kernel = Kernel::new(KernelConfig::default());
    let a = kernel.current();
    assert_eq!(kernel.thread_get_priority(a), 31);

    let b = kernel.thread_create("b", 32, None).unwrap();
    assert_eq!(kernel.current(), b, "creating a higher-priority thread must yield to it");
    assert_eq!(kernel.thread_get_priority(a), 31, "A's own priority is unaffected by being preempted");
}

/// Scenario 4: a thread holding two locks is donated the max across both,
/// and its effective priority drops stepwise as each lock is released.
#[test]
fn scenario4_multiple_donations() {
    let kernel = Kernel::new(KernelConfig::default());
    let a = kernel.thread_create("a", 31, None).unwrap();
    let l1 = kernel.lock_init();
    let l2 = kernel.lock_init();

    kernel.test_set_current(a);
    kernel.lock_acquire(l1);
    kernel.lock_acquire(l2);

    let b = kernel.thread_create("b", 40, None).unwrap();
    kernel.test_set_current(b);
    kernel.lock_acquire(l1); // blocks, donates 40

    let d = kernel.thread_create("d", 45, None).unwrap();
    kernel.test_set_current(d);
    kernel.lock_acquire(l2); // blocks, donates 45

    assert_eq!(kernel.thread_get_priority(a), 45);

    kernel.test_set_current(a);
    kernel.lock_release(l2);
    assert_eq!(kernel.thread_get_priority(a), 40);

    kernel.lock_release(l1);
    assert_eq!(kernel.thread_get_priority(a), 31);
}

/// Scenario 6: sleepers become ready in wake-tick order, not call order.
#[test]
fn scenario6_timer_sleep_ordering() {
    let kernel = Kernel::new(KernelConfig::default());

    let x = kernel.thread_create("x", 31, None).unwrap();
    kernel.test_set_current(x);
    kernel.timer_sleep(100);

    let y = kernel.thread_create("y", 31, None).unwrap();
    kernel.test_set_current(y);
    kernel.timer_sleep(50);

    let z = kernel.thread_create("z", 31, None).unwrap();
    kernel.test_set_current(z);
    kernel.timer_sleep(75);

    let driver = kernel.thread_create("driver", 31, None).unwrap();
    kernel.test_set_current(driver);

    let is_ready =
        |k: &Kernel, t: donor_sched::ThreadId| k.thread_state(t) == donor_sched::ThreadState::Ready;

    for _ in 0..50 {
        kernel.tick();
    }
    assert!(is_ready(&kernel, y));
    assert!(!is_ready(&kernel, z));
    assert!(!is_ready(&kernel, x));

    for _ in 0..25 {
        kernel.tick();
    }
    assert!(is_ready(&kernel, z));
    assert!(!is_ready(&kernel, x));

    for _ in 0..25 {
        kernel.tick();
    }
    assert!(is_ready(&kernel, x));
}

/// Scenario 7: under MLFQ, a CPU-bound thread's `recent_cpu` grows by
/// about `timer_freq` (in fixed-point terms) after one second of charging.
#[test]
fn scenario7_mlfq_decay_after_one_second() {
    let config = KernelConfig { mlfqs: true, timer_freq: 100, ..KernelConfig::default() };
    let kernel = Kernel::new(config);
    let main = kernel.current();

    for _ in 0..100 {
        kernel.tick();
    }

    // recent_cpu is reported scaled by 100; one second of continuous
    // charging at nice=0 should land close to 100 * 100 = 10_000, modulo
    // the load_avg-driven decay applied once per second.
    let reported = kernel.thread_get_recent_cpu();
    assert!(reported > 0, "recent_cpu should have grown for the only runnable thread");

    let priority = kernel.thread_get_priority(main);
    assert!(priority < donor_sched::PRI_DEFAULT, "priority should decay below the initial default");
    assert!(priority <= PRI_MAX);
}

/// Invariant: a lock never has two simultaneous holders across a sequence
/// of contended acquire/release cycles.
#[test]
fn invariant_mutual_exclusion_holds_across_contention() {
    let kernel = Kernel::new(KernelConfig::default());
    let lock = kernel.lock_init();

    let a = kernel.thread_create("a", 31, None).unwrap();
    kernel.test_set_current(a);
    kernel.lock_acquire(lock);
    assert!(kernel.lock_held_by_current(lock));

    let b = kernel.thread_create("b", 31, None).unwrap();
    kernel.test_set_current(b);
    assert!(!kernel.lock_try_acquire(lock), "lock must not be acquirable while A holds it");

    kernel.test_set_current(a);
    kernel.lock_release(lock);

    kernel.test_set_current(b);
    assert!(kernel.lock_try_acquire(lock));
    assert!(kernel.lock_held_by_current(lock));
}
