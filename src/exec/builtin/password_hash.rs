// src/exec/builtin/password_hash.rs

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::exec::backend::{BoxFuture, CANCELLED_MESSAGE, ExecutionContext, Executor};
use crate::task::TaskKind;

const STEPS: u32 = 10;
const SALT_LEN: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordHashInput {
    password: String,
    #[serde(default = "default_salt_rounds")]
    salt_rounds: u32,
}

fn default_salt_rounds() -> u32 {
    10
}

/// Salts and hashes a password with BLAKE3, re-hashing `saltRounds` times.
#[derive(Debug, Clone)]
pub struct PasswordHashExecutor {
    step_delay: Duration,
}

impl PasswordHashExecutor {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Executor for PasswordHashExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::PasswordHash
    }

    fn execute(&self, mut ctx: ExecutionContext) -> BoxFuture<()> {
        let delay = self.step_delay;

        Box::pin(async move {
            let input = match parse_input(ctx.input()) {
                Ok(input) => input,
                Err(err) => {
                    ctx.fail(format!("invalid password-hash input: {err}")).await;
                    return;
                }
            };

            for step in 0..STEPS {
                if ctx.pause(delay).await {
                    ctx.fail(CANCELLED_MESSAGE).await;
                    return;
                }
                ctx.progress(f64::from(step + 1) * 100.0 / f64::from(STEPS)).await;
            }

            let salt: [u8; SALT_LEN] = rand::random();
            let hash = hash_password(&input.password, &salt, input.salt_rounds);

            ctx.succeed(json!({
                "hash": hash,
                "salt": to_hex(&salt),
                "saltRounds": input.salt_rounds,
            }))
            .await;
        })
    }
}

fn parse_input(input: &Value) -> Result<PasswordHashInput, serde_json::Error> {
    match input {
        Value::String(password) => Ok(PasswordHashInput {
            password: password.clone(),
            salt_rounds: default_salt_rounds(),
        }),
        other => serde_json::from_value(other.clone()),
    }
}

/// Hex digest of `password ‖ salt`, re-hashed until `rounds` passes are done.
pub fn hash_password(password: &str, salt: &[u8], rounds: u32) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(password.as_bytes());
    hasher.update(salt);
    let mut digest = hasher.finalize();

    for _ in 1..rounds.max(1) {
        digest = blake3::hash(digest.as_bytes());
    }

    digest.to_hex().to_string()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
