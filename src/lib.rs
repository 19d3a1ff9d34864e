#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! A preemptive thread scheduler core for small instructional kernels.
//!
//! This crate implements the thread and synchronization core of a
//! uniprocessor, preemptive multitasking kernel: thread lifecycle and the
//! ready-queue discipline, priority donation across locks, Mesa-style
//! condition variables, a tickless sleep queue driven by a periodic timer,
//! and an optional multi-level feedback queue (MLFQ) scheduling policy.
//!
//! # What this crate is not
//!
//! It does not perform a machine-level context switch, load ELF binaries,
//! dispatch syscalls, or drive a PIC/PIT. Those are the job of the
//! embedding kernel; this crate only owns the scheduling *decisions* and
//! the data structures (ready queue, sleep queue, waits-for graph) that
//! back them. The [`arch`] module's [`arch::Arch`] trait is the seam: it
//! supplies nothing but interrupt masking, which is this kernel's sole
//! mutual-exclusion mechanism (uniprocessor, no spinlocks).
//!
//! # Quick start
//!
//! ```
//! use donor_sched::{Kernel, KernelConfig};
//!
//! let kernel = Kernel::new(KernelConfig::default());
//! let a = kernel.thread_create("main-child", 31, None).unwrap();
//! assert_eq!(kernel.thread_get_priority(a), 31);
//! ```
//!
//! # Features
//!
//! - `std-shim`: expose [`Kernel::test_set_current`], the driving primitive
//!   external integration tests need to simulate "who runs next" between
//!   calls (see [`sched`]'s module doc). The crate itself is always
//!   `no_std`; this feature only widens what's reachable from outside the
//!   crate for host-side testing.

extern crate alloc;

#[cfg(any(test, feature = "std-shim"))]
extern crate std;

pub mod arch;
pub mod errors;
pub mod fixed_point;
pub mod mem;
pub mod mlfq;
pub mod sched;
pub mod sync;
pub mod thread;
pub mod time;

pub use errors::{KernelError, SpawnError};
pub use fixed_point::Fp;
pub use sched::{Kernel, KernelConfig};
pub use thread::{ThreadId, ThreadState};

/// Scheduling-relevant priority bounds (spec §6).
pub const PRI_MIN: u8 = 0;
pub const PRI_DEFAULT: u8 = 31;
pub const PRI_MAX: u8 = 63;

/// Ticks given to a thread before a preemption decision is made (spec §4.3).
pub const TIME_SLICE: u32 = 4;

#[cfg(all(not(test), not(feature = "std-shim")))]
use core::panic::PanicInfo;

#[cfg(all(not(test), not(feature = "std-shim")))]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    use crate::arch::Arch as _;
    arch::DefaultArch::disable_interrupts();
    loop {
        arch::DefaultArch::idle_wait();
    }
}
