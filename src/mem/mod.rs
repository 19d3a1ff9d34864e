//! Thread stack accounting.
//!
//! A real kernel backs each thread with a page-aligned stack carved out of
//! physical memory; allocating one can fail once memory is exhausted, and
//! that failure is the one recoverable error [`crate::sched::Kernel::thread_create`]
//! can return (spec §7). The actual page allocator is an external
//! collaborator (spec §1) this crate never touches directly. What it needs
//! from that collaborator is only the boundary: something it can ask for a
//! stack slot and be told yes or no.
//!
//! [`StackAllocator`] is that boundary. [`BoundedStackPool`] is a
//! capacity-limited default good enough to drive `thread_create`'s
//! exhaustion path under test, grounded on the teacher's pool-allocator
//! shape (`stack_pool.rs`) stripped of the real memory mapping it no
//! longer needs now that this crate performs no context switch.

pub mod stack_pool;

pub use stack_pool::{BoundedStackPool, StackAllocator, StackHandle};
