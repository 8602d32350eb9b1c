//! # GateOS Configuration
//!
//! Compile-time constants governing the scheduler and the task timing. All
//! limits are fixed at compile time. Board wiring is selected through the
//! HAL's typed pins in the firmware entry point.

// ---------------------------------------------------------------------------
// Kernel limits
// ---------------------------------------------------------------------------

/// Maximum number of tasks the system can manage, including the idle task
/// in slot 0. Each slot carries `STACK_SIZE` bytes of RAM.
pub const MAX_TASKS: usize = 4;

/// SysTick frequency in Hz. At 1 kHz one tick is one millisecond.
pub const TICK_HZ: u32 = 1000;

/// Time slice in ticks. A task that neither delays nor is suspended is
/// preempted after this many ticks so equal-priority tasks share the CPU.
pub const DEFAULT_TIME_SLICE: u32 = 10;

/// Per-task stack size in bytes. Upper bound for any task's stack budget.
pub const STACK_SIZE: usize = 1024;

/// Smallest accepted stack budget in 32-bit words: the 16-word initial
/// context frame plus room for a shallow call chain.
pub const MIN_STACK_WORDS: usize = 64;

/// Core clock of the nRF52833 in Hz.
pub const SYSTEM_CLOCK_HZ: u32 = 64_000_000;

/// Priority of the idle task. Application tasks must be above it.
pub const IDLE_PRIORITY: u8 = 0;

// ---------------------------------------------------------------------------
// Application tasks
// ---------------------------------------------------------------------------

/// Priority shared by the LED, buzzer and button tasks.
pub const TASK_PRIORITY: u8 = 1;

/// Stack budget shared by the LED, buzzer and button tasks, in words.
pub const TASK_STACK_WORDS: usize = 256;

/// How long each LED color is held.
pub const LED_HOLD_MS: u32 = 500;

/// Buzzer on-phase length.
pub const BUZZER_ON_MS: u32 = 100;

/// Buzzer off-phase length. On + off is the 1 s beep period.
pub const BUZZER_OFF_MS: u32 = 900;

/// Interval between two polls of the buttons.
pub const BUTTON_POLL_MS: u32 = 100;

/// Convert milliseconds to scheduler ticks, rounding down.
#[inline]
pub const fn ms_to_ticks(ms: u32) -> u32 {
    ((ms as u64 * TICK_HZ as u64) / 1000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_ticks_at_one_khz() {
        assert_eq!(ms_to_ticks(0), 0);
        assert_eq!(ms_to_ticks(1), 1);
        assert_eq!(ms_to_ticks(LED_HOLD_MS), 500);
        assert_eq!(ms_to_ticks(BUZZER_ON_MS + BUZZER_OFF_MS), 1000);
    }

    #[test]
    fn test_task_stack_fits_slot() {
        assert!(TASK_STACK_WORDS * 4 <= STACK_SIZE);
        assert!(TASK_STACK_WORDS >= MIN_STACK_WORDS);
        assert!(TASK_PRIORITY > IDLE_PRIORITY);
    }
}
