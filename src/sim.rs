//! # Host simulation
//!
//! Runs periodic task bodies against the real [`Scheduler`] on the host,
//! one tick per millisecond, without the Cortex-M port. The simulation
//! plays the part of PendSV: after every tick it keeps dispatching ready
//! tasks until only idle is left.
//!
//! A dispatched task runs one `activate()` and then sleeps for the hold it
//! returned, exactly like the firmware trampoline. Task bodies run to
//! completion, so a suspend requested by one task takes effect before any
//! other task is dispatched.

use crate::arch;
use crate::config::{ms_to_ticks, MAX_TASKS, TICK_HZ};
use crate::error::Result;
use crate::log_debug;
use crate::scheduler::{Scheduler, IDLE_TASK};
use crate::task::{PeriodicTask, TaskConfig, TaskHandle, TaskState};

pub struct Simulation<'a> {
    scheduler: Scheduler,
    bodies: [Option<&'a mut (dyn PeriodicTask + 'a)>; MAX_TASKS],
}

impl<'a> Simulation<'a> {
    pub fn new() -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.init();
        Self {
            scheduler,
            bodies: core::array::from_fn(|_| None),
        }
    }

    /// Register a task body. Same contract as `kernel::spawn` on the firmware.
    pub fn spawn(&mut self, body: &'a mut dyn PeriodicTask, config: TaskConfig) -> Result<TaskHandle> {
        let handle = self.scheduler.create_task(simulated_entry, 0, config)?;
        self.bodies[handle.index()] = Some(body);
        Ok(handle)
    }

    /// Dispatch the first task, then every other task ready at time zero.
    pub fn start(&mut self) {
        let first = self.scheduler.start();
        self.dispatch(first);
        self.run_ready();
    }

    /// Advance simulated time by `ms` milliseconds.
    pub fn advance(&mut self, ms: u32) {
        for _ in 0..ms_to_ticks(ms) {
            self.scheduler.tick();
            self.run_ready();
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.tick_count() * 1000 / TICK_HZ as u64
    }

    pub fn state(&self, task: TaskHandle) -> Option<TaskState> {
        self.scheduler.state(task)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn run_ready(&mut self) {
        loop {
            let next = self.scheduler.schedule();
            if next == IDLE_TASK {
                return;
            }
            self.dispatch(next);
        }
    }

    /// Run one activation of the task in `slot`, which must be `Running`.
    fn dispatch(&mut self, slot: usize) {
        if slot == IDLE_TASK {
            return;
        }
        let Some(body) = self.bodies[slot].as_mut() else {
            // Created without a body: nothing to run.
            self.scheduler.park(slot);
            return;
        };

        let hold_ms = body.activate(&mut self.scheduler);
        let task = &self.scheduler.tasks[slot];
        log_debug!(
            "t={} {} holds {} ms",
            self.scheduler.tick_count(),
            task.config.name,
            hold_ms
        );
        if task.state == TaskState::Running {
            // A zero hold would spin forever inside a single tick.
            self.scheduler.delay_current(ms_to_ticks(hold_ms).max(1));
        }
    }
}

impl Default for Simulation<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack-frame entry for simulated tasks. Never executed on the host.
extern "C" fn simulated_entry(_arg: usize) -> ! {
    loop {
        arch::wait_for_interrupt();
    }
}
