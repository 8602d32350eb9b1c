//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor.
//! Implements context switching via PendSV, SysTick timer configuration,
//! and interrupt priority setup.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by `main` before start and by handlers
//! - **PSP** (Process Stack Pointer): used by tasks in Thread mode
//!
//! On exception entry the hardware stacks R0–R3, R12, LR, PC and xPSR onto
//! the process stack. The PendSV handler saves and restores R4–R11, which
//! completes the context.
//!
//! ## Interrupt Priorities
//!
//! SysTick and PendSV both run at the lowest priority (0xFF), so they never
//! preempt each other or any application interrupt.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick to fire at `TICK_HZ` from the core clock. Each tick
/// enters `SysTick`, which calls `Scheduler::tick()`.
pub fn configure_systick(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Pend a context switch. It is taken as soon as no other exception is
/// active and interrupts are enabled.
#[inline]
pub fn trigger_pendsv() {
    SCB::set_pendsv();
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

// ---------------------------------------------------------------------------
// Interrupt priority configuration
// ---------------------------------------------------------------------------

/// Set PendSV and SysTick to the lowest interrupt priority.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // Safety: changing system handler priorities before the scheduler starts
    // cannot break a priority-based critical section.
    unsafe {
        scb.set_priority(SystemHandler::PendSV, 0xFF);
        scb.set_priority(SystemHandler::SysTick, 0xFF);
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Start the first task by switching Thread mode to PSP and branching to
/// the task's entry point with its argument in R0.
///
/// Interrupts must be disabled on entry; they are enabled right before the
/// branch.
///
/// # Safety
/// Must only be called once, with the initial stack pointer of a TCB built
/// by `Scheduler::create_task`.
pub unsafe fn start_first_task(psp: *const u32) -> ! {
    asm!(
        // Skip the software-saved R4-R11 (8 × 4 bytes) and make it the PSP
        "adds r0, #32",
        "msr psp, r0",

        // Thread mode uses PSP from now on (CONTROL.SPSEL = 1)
        "movs r0, #2",
        "msr control, r0",
        "isb",

        // Unwind the hardware frame by hand: there is no exception to return from
        "pop {{r0-r3, r12}}",  // R0 carries the task argument
        "pop {{r4}}",          // LR, discarded: the entry never returns
        "pop {{r5}}",          // PC
        "pop {{r6}}",          // xPSR, discarded
        "orr r5, r5, #1",      // Thumb state for bx

        "cpsie i",
        "bx r5",

        in("r0") psp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler. Performs the context switch.
///
/// ## Sequence
/// 1. Save R4–R11 onto the current task's stack (PSP)
/// 2. Store the updated PSP into the current task's TCB
/// 3. Call the scheduler to select the next task
/// 4. Restore R4–R11 from the new task's stack and load its PSP
/// 5. Return to Thread mode on PSP (EXC_RETURN = 0xFFFFFFFD)
///
/// # Safety
/// Entered only by the NVIC; follows the Cortex-M4 exception convention.
#[unsafe(naked)]
#[no_mangle]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}",

        "bl {do_schedule}",        // new PSP in r0

        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",

        "mvn r0, #2",              // 0xFFFFFFFD
        "bx r0",

        save_context = sym save_current_context,
        do_schedule = sym do_context_switch,
    );
}

/// Save the current task's stack pointer. Called from PendSV.
///
/// # Safety
/// Called from the PendSV handler after `kernel::init()`.
unsafe extern "C" fn save_current_context(psp: *mut u32) {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    let current = scheduler.current_task;
    if current < scheduler.task_count {
        scheduler.tasks[current].stack_pointer = psp;
    }
}

/// Pick the next task and return its saved PSP. Called from PendSV.
///
/// # Safety
/// Called from the PendSV handler after `kernel::init()`.
unsafe extern "C" fn do_context_switch() -> *mut u32 {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    let next = scheduler.schedule();
    scheduler.tasks[next].stack_pointer
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler. Scheduler tick entry point.
///
/// # Safety
/// Entered only by the NVIC, and only after `kernel::start()` enabled SysTick.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    scheduler.tick();

    if scheduler.needs_reschedule {
        trigger_pendsv();
    }
}
