// src/task/mod.rs

//! Task model and in-memory registry.
//!
//! - [`model`] holds the task, its kind/status enums and the persisted record.
//! - [`state`] is the state-machine table.
//! - [`registry`] owns the task map and the pending/running membership lists.

pub mod model;
pub mod registry;
pub mod state;

pub use model::{MAX_RUNNING_PROGRESS, Task, TaskId, TaskKind, TaskRecord, TaskStatus};
pub use registry::{TaskRegistry, TaskSnapshot, TransitionEffect};
pub use state::Transition;
