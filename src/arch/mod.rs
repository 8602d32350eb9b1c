//! # Architecture Abstraction Layer
//!
//! Hardware boundary for the scheduler. The Cortex-M4 port is only built for
//! the bare-metal target; host builds get portable stand-ins so the
//! scheduler logic can be tested off-target.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;

/// Sleep until the next interrupt. Used by the idle task.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::asm::wfi();
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    core::hint::spin_loop();
}
