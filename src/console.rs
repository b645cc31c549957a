// src/console.rs

//! Line-oriented interactive front end reading commands from stdin.
//!
//! ```text
//! submit <kind> <input>   queue a task (input is JSON or plain text)
//! cancel <id>             cancel a pending or running task
//! retry <id>              re-submit a finished task as a new one
//! list                    print every task
//! clear                   purge the durable history
//! quit                    stop the runtime and exit
//! ```

use std::str::FromStr;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::cli::parse_input;
use crate::engine::TaskClient;
use crate::errors::{Result, TaskRunnerError};
use crate::task::{TaskId, TaskKind, TaskSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Submit { kind: TaskKind, input: Value },
    Cancel(TaskId),
    Retry(TaskId),
    List,
    Clear,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match verb.to_lowercase().as_str() {
            "submit" => {
                let (kind, input) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if kind.is_empty() {
                    return Err("usage: submit <kind> <input>".to_string());
                }
                let kind: TaskKind = kind.parse().map_err(|err| format!("{err}"))?;
                Ok(ConsoleCommand::Submit {
                    kind,
                    input: parse_input(input),
                })
            }
            "cancel" => parse_id(rest).map(ConsoleCommand::Cancel),
            "retry" => parse_id(rest).map(ConsoleCommand::Retry),
            "list" | "ls" => Ok(ConsoleCommand::List),
            "clear" => Ok(ConsoleCommand::Clear),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

fn parse_id(raw: &str) -> std::result::Result<TaskId, String> {
    raw.parse()
        .map_err(|err| format!("invalid task id '{raw}': {err}"))
}

/// Read commands from stdin until `quit`, end of input, or the runtime
/// stopping.
pub async fn run_console(client: TaskClient) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("taskrunner ready, type 'help' for commands");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = client.closed() => {
                debug!("runtime stopped; leaving console");
                return Ok(());
            }
        };

        let Some(line) = line else {
            debug!("stdin closed; leaving console");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            return Ok(());
        }

        match execute(&client, command).await {
            Ok(()) => {}
            Err(TaskRunnerError::RuntimeClosed) => return Ok(()),
            Err(TaskRunnerError::Task(err)) => {
                warn!(error = %err, "console command rejected");
                println!("error: {err}");
            }
            Err(err) => return Err(err),
        }
    }
}

async fn execute(client: &TaskClient, command: ConsoleCommand) -> Result<()> {
    match command {
        ConsoleCommand::Submit { kind, input } => {
            let id = client.submit(kind, input).await?;
            println!("submitted {id}");
        }
        ConsoleCommand::Cancel(id) => {
            client.cancel(id).await?;
            println!("cancel requested for {id}");
        }
        ConsoleCommand::Retry(id) => {
            let new_id = client.retry(id).await?;
            println!("retrying {id} as {new_id}");
        }
        ConsoleCommand::List => print_tasks(&client.snapshot()),
        ConsoleCommand::Clear => {
            client.clear_all().await?;
            client.flush().await?;
            println!("history cleared");
        }
        ConsoleCommand::Help => print_help(),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

/// Print one line per task, oldest first.
pub fn print_tasks(snapshot: &TaskSnapshot) {
    if snapshot.is_empty() {
        println!("no tasks");
        return;
    }
    for task in snapshot.tasks() {
        let detail = match (&task.result, &task.error) {
            (Some(result), _) => result.to_string(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };
        println!(
            "{}  {:<18} {:<9} {:>3}%  {}",
            task.id, task.kind, task.status, task.progress, detail
        );
    }
}

fn print_help() {
    println!("commands:");
    println!("  submit <kind> <input>   kinds: {}", kind_names());
    println!("  cancel <id>");
    println!("  retry <id>");
    println!("  list");
    println!("  clear");
    println!("  quit");
}

fn kind_names() -> String {
    TaskKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_submit_with_json_and_text_input() {
        let cmd: ConsoleCommand = r#"submit password-hash {"password":"pw"}"#.parse().unwrap();
        assert_eq!(
            cmd,
            ConsoleCommand::Submit {
                kind: TaskKind::PasswordHash,
                input: json!({ "password": "pw" }),
            }
        );

        let cmd: ConsoleCommand = "submit example hello world".parse().unwrap();
        assert_eq!(
            cmd,
            ConsoleCommand::Submit {
                kind: TaskKind::Example,
                input: json!("hello world"),
            }
        );
    }

    #[test]
    fn rejects_unknown_kind_and_bad_ids() {
        assert!("submit video-encode x".parse::<ConsoleCommand>().is_err());
        assert!("cancel not-a-uuid".parse::<ConsoleCommand>().is_err());
        assert!("frobnicate".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn parses_simple_verbs() {
        assert_eq!("LIST".parse::<ConsoleCommand>(), Ok(ConsoleCommand::List));
        assert_eq!(" quit ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
        let id = TaskId::new();
        assert_eq!(
            format!("retry {id}").parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Retry(id))
        );
    }
}
