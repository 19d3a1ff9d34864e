//! Interrupt-masking abstraction.
//!
//! This kernel is uniprocessor and preemptive: the only mutual-exclusion
//! primitive available to it is disabling interrupts (spec §5 — "no
//! spinlocks"). Everything else in the crate — the ready queue, the
//! roster, the sleep queue, every lock's donation state — is protected by
//! holding interrupts off across the mutation, mirroring the Pintos
//! original's `intr_disable`/`intr_set_level` pairs.
//!
//! A real embedding kernel drives a PIC/PIT and masks the CPU's interrupt
//! flag directly; that driver is an external collaborator (spec §1) and is
//! not implemented here. What this module provides is the seam: an `Arch`
//! trait an embedding kernel implements once, plus a host-testable default
//! that models the same on/off semantics with a global flag so the rest of
//! the crate can be exercised without real hardware.

use portable_atomic::{AtomicBool, Ordering};

/// Whether interrupts are (conceptually) enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrLevel {
    On,
    Off,
}

/// Architecture abstraction: interrupt masking only.
///
/// Context switching, FPU state, and hardware timer programming are
/// explicitly out of this crate's scope (spec §1); an embedding kernel
/// that wants real preemption supplies its own `Arch` and drives
/// [`crate::sched::Kernel::tick`] from its timer interrupt handler.
pub trait Arch {
    /// Disable interrupts and return the previous level, so the caller can
    /// restore it later (`intr_disable` in the original).
    fn disable_interrupts() -> IntrLevel;

    /// Restore a previously saved interrupt level, returning the level that
    /// was in effect before the call (`intr_set_level`).
    fn set_level(level: IntrLevel) -> IntrLevel;

    /// Enable interrupts unconditionally and return the previous level.
    fn enable_interrupts() -> IntrLevel {
        Self::set_level(IntrLevel::On)
    }

    /// Current interrupt level.
    fn interrupt_level() -> IntrLevel;

    /// `true` if called from within an interrupt handler. Blocking
    /// primitives assert this is `false` (spec §5).
    fn in_interrupt_context() -> bool;

    /// Wait for the next interrupt with interrupts enabled, atomically
    /// with respect to disabling them — the `sti; hlt` pairing the idle
    /// thread depends on (spec §4.3) to avoid losing a wakeup between
    /// re-enabling interrupts and halting.
    fn idle_wait();
}

/// Global interrupt-enabled flag for [`HostArch`]. A single `bool` suffices
/// because the kernel is uniprocessor: there is exactly one "CPU" whose
/// mask state this models.
static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Per-"CPU" interrupt-context flag, set by test harnesses that want to
/// simulate calling a blocking primitive from inside a handler.
static IN_INTERRUPT_CONTEXT: AtomicBool = AtomicBool::new(false);

/// A software model of interrupt masking for host testing and for
/// embedding kernels that haven't wired up real hardware interrupts yet.
pub struct HostArch;

impl Arch for HostArch {
    fn disable_interrupts() -> IntrLevel {
        let was_on = INTERRUPTS_ENABLED.swap(false, Ordering::AcqRel);
        if was_on {
            IntrLevel::On
        } else {
            IntrLevel::Off
        }
    }

    fn set_level(level: IntrLevel) -> IntrLevel {
        let enable = matches!(level, IntrLevel::On);
        let was_on = INTERRUPTS_ENABLED.swap(enable, Ordering::AcqRel);
        if was_on {
            IntrLevel::On
        } else {
            IntrLevel::Off
        }
    }

    fn interrupt_level() -> IntrLevel {
        if INTERRUPTS_ENABLED.load(Ordering::Acquire) {
            IntrLevel::On
        } else {
            IntrLevel::Off
        }
    }

    fn in_interrupt_context() -> bool {
        IN_INTERRUPT_CONTEXT.load(Ordering::Acquire)
    }

    fn idle_wait() {
        // Hosted model: there's no real halt instruction, so this is a
        // no-op spin. A bare-metal `Arch` would execute `sti; hlt` (or the
        // architecture's equivalent) as a single atomic pair here.
        core::hint::spin_loop();
    }
}

/// Test-only helper: run `f` with [`HostArch::in_interrupt_context`]
/// reporting `true`, then restore the previous value.
#[cfg(any(test, feature = "std-shim"))]
pub fn in_simulated_interrupt<R>(f: impl FnOnce() -> R) -> R {
    let prev = IN_INTERRUPT_CONTEXT.swap(true, Ordering::AcqRel);
    let result = f();
    IN_INTERRUPT_CONTEXT.store(prev, Ordering::Release);
    result
}

/// RAII guard that disables interrupts on construction and restores the
/// prior level on drop — the idiomatic Rust shape for the original's
/// `old_level = intr_disable(); ...; intr_set_level(old_level);` pattern.
#[must_use]
pub struct CriticalSection<A: Arch> {
    saved: IntrLevel,
    _arch: core::marker::PhantomData<A>,
}

impl<A: Arch> CriticalSection<A> {
    pub fn enter() -> Self {
        let saved = A::disable_interrupts();
        Self {
            saved,
            _arch: core::marker::PhantomData,
        }
    }
}

impl<A: Arch> Drop for CriticalSection<A> {
    fn drop(&mut self) {
        A::set_level(self.saved);
    }
}

pub type DefaultArch = HostArch;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_section_restores_prior_level() {
        HostArch::enable_interrupts();
        {
            let _g = CriticalSection::<HostArch>::enter();
            assert_eq!(HostArch::interrupt_level(), IntrLevel::Off);
        }
        assert_eq!(HostArch::interrupt_level(), IntrLevel::On);
    }

    #[test]
    fn nested_disable_restores_off() {
        HostArch::disable_interrupts();
        {
            let _g = CriticalSection::<HostArch>::enter();
            assert_eq!(HostArch::interrupt_level(), IntrLevel::Off);
        }
        assert_eq!(HostArch::interrupt_level(), IntrLevel::Off);
        HostArch::enable_interrupts();
    }
}
