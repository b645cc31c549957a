// src/exec/mod.rs

//! Execution layer.
//!
//! - [`protocol`] defines the start/cancel messages sent to executors and the
//!   progress/success/failure events they send back.
//! - [`backend`] provides the [`Executor`] capability trait, the
//!   [`ExecutionContext`] channel pair and the kind-keyed [`ExecutorRegistry`].
//! - [`gateway`] starts supervised executions and cancels them.
//! - [`supervisor`] watches a single execution (event forwarding, forced
//!   termination, crash detection).
//! - [`builtin`] holds the executors shipped with the binary.

pub mod backend;
pub mod builtin;
pub mod gateway;
pub mod protocol;
mod supervisor;

pub use backend::{BoxFuture, CANCELLED_MESSAGE, ExecutionContext, Executor, ExecutorRegistry};
pub use builtin::builtin_registry;
pub use gateway::{ExecutionHandle, ExecutorGateway};
pub use protocol::{Command, ControlMessage, ExecutorEvent, ExecutorPayload, StartMessage};
