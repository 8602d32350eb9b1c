//! # Synchronization Primitives
//!
//! Critical sections for state shared between thread-mode tasks and the
//! SysTick/PendSV handlers. On the firmware the implementation comes from
//! `cortex-m`'s `critical-section-single-core` feature (interrupts disabled);
//! on the host it comes from the `critical-section` `std` implementation.

pub use ::critical_section::CriticalSection;

/// Execute a closure within a critical section.
///
/// All access to the global scheduler and to shared output lines goes
/// through here. Keep the closure short: interrupts are masked while it runs.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    ::critical_section::with(f)
}
