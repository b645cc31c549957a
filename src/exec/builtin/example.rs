// src/exec/builtin/example.rs

use std::time::Duration;

use serde_json::{Value, json};

use crate::exec::backend::{BoxFuture, CANCELLED_MESSAGE, ExecutionContext, Executor};
use crate::task::TaskKind;

/// Reports progress in ten steps and echoes its input back.
#[derive(Debug, Clone)]
pub struct ExampleExecutor {
    step_delay: Duration,
}

impl ExampleExecutor {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Executor for ExampleExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::Example
    }

    fn execute(&self, mut ctx: ExecutionContext) -> BoxFuture<()> {
        let delay = self.step_delay;

        Box::pin(async move {
            for pct in (10..=100).step_by(10) {
                ctx.progress(pct as f64).await;
                if ctx.pause(delay).await {
                    ctx.fail(CANCELLED_MESSAGE).await;
                    return;
                }
            }

            let text = match ctx.input() {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            ctx.succeed(json!(format!("Processed: {text}"))).await;
        })
    }
}
