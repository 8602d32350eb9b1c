//! # Kernel
//!
//! Global scheduler instance and the API task code calls on the firmware.
//! Every call enters a critical section around the scheduler and pends a
//! context switch when the scheduler asks for one.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← Reset the task table, register idle
//!         ├─► kernel::spawn()       ← Register tasks (×N), collect handles
//!         └─► kernel::start()       ← Launch scheduler (no return)
//!               ├─► Set exception priorities
//!               ├─► Configure SysTick
//!               └─► Start first task via cortex_m4::start_first_task()
//! ```

use crate::arch::cortex_m4;
use crate::config::ms_to_ticks;
use crate::error::Result;
use crate::log_info;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::{PeriodicTask, TaskConfig, TaskControl, TaskEntry, TaskHandle};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler instance. Only reached through `SCHEDULER_PTR`.
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler, used by the PendSV and SysTick
/// handlers.
///
/// # Safety
/// Set once during `init()`. Thread-mode access happens inside critical
/// sections; handler access is serialized by exception priority.
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// # Safety
/// `init()` must have run, and the caller must hold a critical section or
/// run in the PendSV/SysTick handler.
#[inline]
unsafe fn scheduler() -> &'static mut Scheduler {
    &mut *SCHEDULER_PTR
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel: reset the task table and register the idle task.
///
/// Must be called once, from `main`, before any other kernel function.
pub fn init() {
    sync::critical_section(|_cs| unsafe {
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
        scheduler().init();
    });
}

/// Register a raw task entry point. `arg` is passed to `entry` in R0.
pub fn create_task(entry: TaskEntry, arg: usize, config: TaskConfig) -> Result<TaskHandle> {
    sync::critical_section(|_cs| unsafe { scheduler().create_task(entry, arg, config) })
}

/// Register a periodic task body.
///
/// The task runs `body.activate()` forever, sleeping for the returned number
/// of milliseconds after each activation.
///
/// # Example
/// ```ignore
/// let led = cortex_m::singleton!(: CycleController<'static, OutPin> = CycleController::new(rgb)).unwrap();
/// let handle = kernel::spawn(led, TaskConfig::new("LED_Task", TASK_PRIORITY, TASK_STACK_WORDS))?;
/// ```
pub fn spawn<T>(body: &'static mut T, config: TaskConfig) -> Result<TaskHandle>
where
    T: PeriodicTask + 'static,
{
    create_task(run_periodic::<T>, body as *mut T as usize, config)
}

/// Trampoline shared by all periodic tasks of type `T`.
extern "C" fn run_periodic<T>(arg: usize) -> !
where
    T: PeriodicTask + 'static,
{
    // Safety: `arg` is the `&'static mut T` given to `spawn`; only this task
    // uses it from here on.
    let body = unsafe { &mut *(arg as *mut T) };
    let mut control = KernelControl;
    loop {
        let hold_ms = body.activate(&mut control);
        delay_ms(hold_ms);
    }
}

/// Start the scheduler. **Does not return.**
///
/// Sets exception priorities, starts SysTick and switches to the first
/// task. The `!` return type is the whole "never returns" contract: no code
/// after the call in `main` can be reached.
///
/// # Panics
/// If no application task was created. With `panic-halt` this stops the
/// core, which is the only sensible outcome for an empty system.
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    cortex_m::interrupt::disable();

    let first_sp = sync::critical_section(|_cs| unsafe {
        let scheduler = scheduler();
        if !scheduler.has_application_tasks() {
            return None;
        }
        let first = scheduler.start();
        log_info!(
            "starting scheduler with {} tasks, first {}",
            scheduler.task_count,
            scheduler.tasks[first].config.name
        );
        Some(scheduler.tasks[first].stack_pointer as *const u32)
    });
    let Some(first_sp) = first_sp else {
        panic!("scheduler started without application tasks");
    };

    cortex_m4::set_interrupt_priorities(&mut core_peripherals.SCB);
    cortex_m4::configure_systick(&mut core_peripherals.SYST);

    // Safety: called once, with a stack built by `create_task`, interrupts off.
    unsafe { cortex_m4::start_first_task(first_sp) }
}

/// Block the calling task for `ms` milliseconds. Zero yields the CPU to
/// other ready tasks of equal priority.
pub fn delay_ms(ms: u32) {
    let ticks = ms_to_ticks(ms);
    sync::critical_section(|_cs| unsafe { scheduler().delay_current(ticks) });
    cortex_m4::trigger_pendsv();
}

/// Suspend a task. Takes effect before this call returns.
pub fn suspend(task: TaskHandle) -> Result<()> {
    let reschedule = sync::critical_section(|_cs| unsafe {
        let scheduler = scheduler();
        scheduler.suspend(task).map(|()| scheduler.needs_reschedule)
    })?;
    if reschedule {
        cortex_m4::trigger_pendsv();
    }
    Ok(())
}

/// Resume a suspended task.
pub fn resume(task: TaskHandle) -> Result<()> {
    let reschedule = sync::critical_section(|_cs| unsafe {
        let scheduler = scheduler();
        scheduler.resume(task).map(|()| scheduler.needs_reschedule)
    })?;
    if reschedule {
        cortex_m4::trigger_pendsv();
    }
    Ok(())
}

/// `TaskControl` backed by the global kernel, handed to periodic task bodies.
pub struct KernelControl;

impl TaskControl for KernelControl {
    fn suspend(&mut self, task: TaskHandle) -> Result<()> {
        suspend(task)
    }

    fn resume(&mut self, task: TaskHandle) -> Result<()> {
        resume(task)
    }
}
