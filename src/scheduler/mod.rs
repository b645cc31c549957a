// src/scheduler/mod.rs

//! Bounded-concurrency scheduling.
//!
//! - [`dispatch`] contains the [`Scheduler`]: it owns the task registry,
//!   applies events, and moves queued work into free slots in FIFO order.
//! - [`step`] defines the [`SchedulerStep`] describing what a step changed.

pub mod dispatch;
pub mod step;

pub use dispatch::Scheduler;
pub use step::SchedulerStep;
