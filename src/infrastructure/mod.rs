// Infrastructure module - Backoff policy and loop timers
pub mod task_manager;
pub mod timer;

pub use task_manager::{TaskManager, TimerKind, TimerToken};
pub use timer::{Backoff, backoff};
