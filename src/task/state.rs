// src/task/state.rs

//! Task state machine.
//!
//! | From            | Event        | To        |
//! |-----------------|--------------|-----------|
//! | queued          | dispatch     | running   |
//! | queued          | cancel       | cancelled |
//! | running         | progress(p)  | running   |
//! | running         | succeed(r)   | success   |
//! | running         | fail(e)      | failure   |
//! | running         | cancel       | cancelled |
//! | terminal        | cancel       | (no-op)   |
//!
//! Submission and retry are not transitions of an existing task; they create
//! a new one (see [`crate::task::TaskRegistry::submit`]).

use serde_json::Value;

use crate::task::model::{MAX_RUNNING_PROGRESS, TaskStatus};

/// An event applied to an existing task.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Dispatch,
    Progress(f64),
    Succeed(Value),
    Fail(String),
    Cancel,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Dispatch => "dispatch",
            Transition::Progress(_) => "progress",
            Transition::Succeed(_) => "succeed",
            Transition::Fail(_) => "fail",
            Transition::Cancel => "cancel",
        }
    }
}

/// What the state machine says about an event in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Apply the event; the task ends up in this status.
    To(TaskStatus),
    /// Legal but has no effect (cancel of a terminal task).
    Ignore,
    /// Not legal from the current status.
    Reject,
}

pub fn step(from: TaskStatus, event: &Transition) -> Step {
    use TaskStatus::*;

    match (from, event) {
        (Queued, Transition::Dispatch) => Step::To(Running),
        (Queued, Transition::Cancel) => Step::To(Cancelled),
        (Running, Transition::Progress(_)) => Step::To(Running),
        (Running, Transition::Succeed(_)) => Step::To(Success),
        (Running, Transition::Fail(_)) => Step::To(Failure),
        (Running, Transition::Cancel) => Step::To(Cancelled),
        (Success | Failure | Cancelled, Transition::Cancel) => Step::Ignore,
        _ => Step::Reject,
    }
}

/// Fold a reported progress value into the current one.
///
/// Out-of-range and non-finite values are clamped, the result never goes
/// backwards, and it saturates below 100.
pub fn fold_progress(current: u8, reported: f64) -> u8 {
    let reported = if reported.is_finite() { reported } else { 0.0 };
    let clamped = reported.clamp(0.0, 100.0).floor() as u8;
    clamped.min(MAX_RUNNING_PROGRESS).max(current)
}
