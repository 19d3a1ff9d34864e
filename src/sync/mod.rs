//! Synchronization primitives: semaphores, donation-carrying locks, and
//! Mesa-style condition variables (spec §4.4–4.6).
//!
//! Every primitive here is a lightweight `Copy` identifier into tables
//! owned by [`crate::sched::Kernel`] — there is no per-primitive `Mutex`
//! the way `std::sync` or the teacher's own types work, because every
//! operation on them is already serialized by the kernel's single
//! interrupts-disabled critical section (spec §5: "no spinlocks", mutual
//! exclusion is disabling interrupts). A `Semaphore`/`Lock`/`CondVar` value
//! is created once through `Kernel::sema_init`/`lock_init`/`cond_init` and
//! then passed back into the matching `Kernel` method at each use site —
//! the same shape as Pintos' `sema_init(&sema, n)` followed by
//! `sema_down(&sema)`, translated from "pointer to a struct" to "small
//! `Copy` handle into the owning kernel".

pub mod condvar;
pub mod lock;
pub mod semaphore;

pub use condvar::CondVarId;
pub use lock::LockId;
pub use semaphore::SemaphoreId;

macro_rules! handle_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(::core::num::NonZeroU64);

        impl $name {
            pub(crate) fn new(raw: u64) -> Self {
                Self(::core::num::NonZeroU64::new(raw).expect("handle id counter must never yield zero"))
            }
        }
    };
}

pub(crate) use handle_id;
