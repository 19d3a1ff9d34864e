//! Error types for the scheduler core.
//!
//! Programming errors (reacquiring a held lock, releasing a lock the caller
//! doesn't hold, calling a blocking primitive from interrupt context, an
//! out-of-range priority) are not represented here: per spec they halt the
//! kernel via assertion (`assert!`/`debug_assert!` at the call site), the
//! same way the Pintos original treats them. The only recoverable failure
//! at this layer is resource exhaustion during thread creation.

use core::fmt;

/// Result type for fallible kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors that can occur while spawning a new thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// No stack page was available for the new thread.
    OutOfMemory,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::OutOfMemory => write!(f, "no stack page available for new thread"),
        }
    }
}

/// Top-level error type for operations exposed across the crate boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    Spawn(SpawnError),
    /// The timer frequency given to [`crate::sched::KernelConfig`] is outside
    /// the supported `19..=1000` Hz range.
    InvalidTimerFrequency(u32),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Spawn(e) => write!(f, "{e}"),
            KernelError::InvalidTimerFrequency(hz) => {
                write!(f, "timer frequency {hz} Hz outside supported 19..=1000 Hz range")
            }
        }
    }
}

impl From<SpawnError> for KernelError {
    fn from(e: SpawnError) -> Self {
        KernelError::Spawn(e)
    }
}
