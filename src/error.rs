//! Kernel error types

use core::fmt;

/// Result type for kernel operations
pub type Result<T> = core::result::Result<T, KernelError>;

/// Errors returned by the task and scheduler API.
///
/// Hardware access never fails in this system; these only cover misuse of
/// the kernel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// All `MAX_TASKS` slots are allocated
    TaskTableFull,
    /// Requested stack budget is below `MIN_STACK_WORDS`
    StackBudgetTooSmall,
    /// Requested stack budget does not fit in a `STACK_SIZE` slot
    StackBudgetTooLarge,
    /// Handle does not name an allocated application task
    InvalidHandle,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl KernelError {
    /// Short static description, usable from `defmt` log calls.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KernelError::TaskTableFull => "task table full",
            KernelError::StackBudgetTooSmall => "stack budget too small",
            KernelError::StackBudgetTooLarge => "stack budget too large",
            KernelError::InvalidHandle => "invalid task handle",
        }
    }
}
