//! # GateOS
//!
//! A preemptive three-task controller for ARM Cortex-M4 microcontrollers:
//! an RGB LED cycles red, green and blue, a buzzer beeps once a second, and
//! two buttons suspend and resume those tasks while they are held.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                   │
//! │     led.rs (LED_Task) · buzzer.rs · monitor.rs         │
//! ├────────────────────────────────────────────────────────┤
//! │    Kernel API (kernel.rs)      │  Host sim (sim.rs)    │
//! │  init · spawn · start · delay  │  tick-by-tick replay  │
//! │  suspend · resume              │                       │
//! ├──────────────┬─────────────────┴──┬────────────────────┤
//! │  Scheduler   │  Digital I/O       │  Sync Primitives   │
//! │  scheduler.rs│  io/               │  sync.rs           │
//! │  ─ tick()    │  ─ OutputLine      │  ─ critical_section│
//! │  ─ schedule()│  ─ RgbLed · Button │                    │
//! │  ─ suspend() │                    │                    │
//! ├──────────────┴────────────────────┴────────────────────┤
//! │              Task Model (task.rs)                      │
//! │    TCB · TaskState · TaskControl · PeriodicTask        │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)               │
//! │    PendSV · SysTick · Context Switch · First Task      │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tasks
//!
//! | Task | Body | Period |
//! |------|------|--------|
//! | `LED_Task` | [`led::CycleController`] | 500 ms per color |
//! | `Buzzer_Task` | [`buzzer::PulseController`] | 100 ms on, 900 ms off |
//! | `Button_Task` | [`monitor::InputMonitor`] | polls every 100 ms |
//!
//! All three run at the same priority and sleep between activations, so
//! the CPU is idle almost all the time.
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **Fixed-size TCB array**: `[TaskControlBlock; MAX_TASKS]`
//! - **Per-task stack**: `[u8; STACK_SIZE]` inline in the TCB
//! - **Critical sections**: `critical_section::with()` for shared state
//!
//! ## Host builds
//!
//! Everything except the arch port and the kernel globals builds on the
//! host. [`sim::Simulation`] drives the same scheduler and task bodies
//! against mock pins, which is what the test suite uses.

#![cfg_attr(not(test), no_std)]

pub mod logging;

pub mod arch;
pub mod buzzer;
pub mod config;
pub mod error;
pub mod io;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod kernel;
pub mod led;
pub mod monitor;
pub mod scheduler;
#[cfg(not(target_os = "none"))]
pub mod sim;
pub mod sync;
pub mod task;

pub use error::{KernelError, Result};
