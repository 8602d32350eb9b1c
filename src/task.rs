//! # Task Control Block
//!
//! Defines the task model for GateOS. A task is a body that runs forever,
//! a priority, a stack budget and a run-state owned by the scheduler.
//!
//! Application code never touches a control block directly. It gets a
//! [`TaskHandle`] back from task creation and asks for suspend/resume through
//! the [`TaskControl`] trait.

use crate::config::{DEFAULT_TIME_SLICE, MIN_STACK_WORDS, STACK_SIZE};
use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task in the scheduler's state machine.
///
/// ```text
///               schedule()
///   ┌───────┐ ────────────► ┌─────────┐
///   │ Ready │               │ Running │
///   └───────┘ ◄──────────── └─────────┘
///     ▲   ▲      preempt         │
///     │   │                      │ delay_current()
///     │   │      tick()          ▼
///     │   └──────────────── ┌─────────┐
///     │                     │ Delayed │
///     │ resume()            └─────────┘
///     │
///   ┌───────────┐ ◄── suspend() from Ready, Running or Delayed
///   │ Suspended │
///   └───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Task is ready to run and waiting for the CPU.
    Ready,
    /// Task is currently executing on the CPU.
    Running,
    /// Task is sleeping in `delay_current()` until its wake tick.
    Delayed,
    /// Task is suspended and consumes no scheduling slots until resumed.
    Suspended,
}

impl TaskState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Delayed => "delayed",
            TaskState::Suspended => "suspended",
        }
    }
}

// ---------------------------------------------------------------------------
// Task configuration (immutable after creation)
// ---------------------------------------------------------------------------

/// Static configuration for a task, set at creation time.
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    /// Name used in log output.
    pub name: &'static str,

    /// Priority (higher = more important). The idle task runs at
    /// `IDLE_PRIORITY`; equal priorities are served round-robin.
    pub priority: u8,

    /// Stack budget in 32-bit words. Must lie within
    /// `MIN_STACK_WORDS..=STACK_SIZE / 4`.
    ///
    /// Every task owns a fixed `STACK_SIZE` slot regardless of its budget;
    /// the budget is only checked against that slot at creation, so a task
    /// that would need more than a slot is rejected up front.
    pub stack_words: usize,
}

impl TaskConfig {
    pub const fn new(name: &'static str, priority: u8, stack_words: usize) -> Self {
        Self {
            name,
            priority,
            stack_words,
        }
    }

    /// Check the stack budget against the fixed per-task slot.
    pub fn validate(&self) -> Result<()> {
        if self.stack_words < MIN_STACK_WORDS {
            return Err(KernelError::StackBudgetTooSmall);
        }
        if self.stack_words * 4 > STACK_SIZE {
            return Err(KernelError::StackBudgetTooLarge);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handles and task-facing traits
// ---------------------------------------------------------------------------

/// Opaque reference to a task owned by the scheduler.
///
/// A handle identifies a task and nothing more: it grants no access to the
/// control block and does not keep anything alive. Handles are only minted
/// by task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(u8);

impl TaskHandle {
    pub(crate) const fn new(index: usize) -> Self {
        TaskHandle(index as u8)
    }

    /// Slot of the task in the scheduler's table.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Entry point of a task. The argument is passed in R0 on first dispatch.
pub type TaskEntry = extern "C" fn(usize) -> !;

/// Run-state control of other tasks, as seen from inside a task.
pub trait TaskControl {
    /// Remove `task` from the runnable set until it is resumed.
    fn suspend(&mut self, task: TaskHandle) -> Result<()>;

    /// Return a suspended `task` to the runnable set.
    fn resume(&mut self, task: TaskHandle) -> Result<()>;
}

/// Body of a periodic task.
///
/// The kernel calls `activate` in a loop and sleeps for the returned number
/// of milliseconds between calls. Everything the body keeps in `self`
/// survives suspension unchanged.
pub trait PeriodicTask {
    /// Run one activation and return the hold time before the next one.
    fn activate(&mut self, control: &mut dyn TaskControl) -> u32;
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Per-task stack memory, aligned to 8 bytes as required by ARM AAPCS.
#[repr(C, align(8))]
pub struct Stack(pub [u8; STACK_SIZE]);

/// Task Control Block (TCB): everything the scheduler knows about a task.
///
/// TCBs live in a fixed array inside the scheduler. The `stack_pointer`
/// points into `self.stack` and is updated on every context switch.
pub struct TaskControlBlock {
    /// Slot index in the scheduler's task array.
    pub id: usize,

    /// Current execution state.
    pub state: TaskState,

    /// Static configuration.
    pub config: TaskConfig,

    /// Saved process stack pointer.
    pub stack_pointer: *mut u32,

    pub stack: Stack,

    /// Absolute tick at which a `Delayed` task becomes `Ready`.
    pub wake_at: u64,

    /// Remaining ticks in the current time slice.
    pub ticks_remaining: u32,

    /// Whether this slot is allocated.
    pub active: bool,
}

// Safety: the raw stack pointer always points into the TCB's own stack
// array, and TCBs are only accessed inside critical sections or from the
// PendSV/SysTick handlers.
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// An unallocated slot. Used to initialize the static array.
    pub const EMPTY: Self = Self::empty();

    pub const fn empty() -> Self {
        Self {
            id: 0,
            state: TaskState::Suspended,
            config: TaskConfig::new("", 0, 0),
            stack_pointer: core::ptr::null_mut(),
            stack: Stack([0u8; STACK_SIZE]),
            wake_at: 0,
            ticks_remaining: 0,
            active: false,
        }
    }

    /// Allocate this slot for a new task. The task starts `Ready`.
    ///
    /// The stack frame is initialized separately by the scheduler.
    pub fn init(&mut self, id: usize, config: TaskConfig) {
        self.id = id;
        self.state = TaskState::Ready;
        self.config = config;
        self.wake_at = 0;
        self.ticks_remaining = DEFAULT_TIME_SLICE;
        self.active = true;
    }

    /// Task is allocated and waiting for the CPU.
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.active && self.state == TaskState::Ready
    }

    /// Put the task to sleep until `wake_at`. Zero-length delays only yield.
    pub fn delay_until(&mut self, now: u64, wake_at: u64) {
        self.ticks_remaining = DEFAULT_TIME_SLICE;
        if wake_at <= now {
            self.state = TaskState::Ready;
        } else {
            self.state = TaskState::Delayed;
            self.wake_at = wake_at;
        }
    }

    /// Wake a delayed task whose deadline has been reached.
    /// Returns `true` if the task became ready.
    pub fn wake_if_due(&mut self, now: u64) -> bool {
        if self.active && self.state == TaskState::Delayed && self.wake_at <= now {
            self.state = TaskState::Ready;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
