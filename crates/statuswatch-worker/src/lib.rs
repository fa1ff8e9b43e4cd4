//! Background processing for statuswatch.
//!
//! This crate provides:
//! - A scheduler running periodic tasks on fixed intervals
//! - The periodic tasks: presence poll, provisioning sweep, archival sweep,
//!   and cooldown pruning
//! - The event loop consuming normalized platform events

pub mod event_loop;
pub mod scheduler;
pub mod task;
pub mod tasks;

pub use event_loop::EventLoop;
pub use scheduler::TaskScheduler;
pub use task::{ScheduledTask, TaskError};
