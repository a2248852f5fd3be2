//! Background task tracking for long-running agent invocations launched
//! out-of-band from the turn that started them.
//!
//! A [`manager::BackgroundTaskManager`] owns no opinion about *what* a task
//! does — callers hand it a [`manager::WorkFactory`] closure and the manager
//! handles scheduling, concurrency-key exclusion, cooperative cancellation,
//! timeouts, and result truncation.

pub mod manager;
pub mod model;

pub use manager::{BackgroundTaskManager, CancellationFlag, TaskOutcome, WorkFactory};
pub use model::{truncate, BackgroundTask, LaunchInput, ResumeInput, TaskProgress, TaskStatus, TRUNCATION_LIMIT};
