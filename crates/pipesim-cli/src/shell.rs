//! Interactive shell over stdin.
//!
//! Each action runs in its own task so the prompt stays responsive; issuing
//! the same action again while it is running hits the controller's
//! already-running guard instead of queueing.

use std::sync::Arc;

use anyhow::{Context, Result};
use pipesim_core::{Action, Environment, PipelineController};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::debug;

use crate::render::{render_notice, render_sample, render_state};

pub const HELP: &str = "\
Commands:
  build <source text>      build the given source (\"error\" makes it fail)
  deploy <env>             deploy the last good build to staging|production
  test <env>               run integration tests in staging|production
  rollback <env>           roll staging|production back to the previous version
  monitor                  start/stop monitoring
  branch                   create the feature branch
  pr                       open a pull request from the feature branch
  merge                    merge the open pull request
  status                   print the dashboard
  help                     show this message
  quit                     exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Run(Action),
    Status,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> std::result::Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let environment = |rest: &str| -> std::result::Result<Environment, String> {
        if rest.is_empty() {
            return Err(format!("usage: {verb} <staging|production>"));
        }
        rest.parse::<Environment>().map_err(|e| e.to_string())
    };

    let command = match verb {
        "" => ShellCommand::Empty,
        "build" => ShellCommand::Run(Action::Build {
            source: rest.to_string(),
        }),
        "deploy" => ShellCommand::Run(Action::Deploy(environment(rest)?)),
        "test" => ShellCommand::Run(Action::Test(environment(rest)?)),
        "rollback" => ShellCommand::Run(Action::Rollback(environment(rest)?)),
        "monitor" => ShellCommand::Run(Action::ToggleMonitoring),
        "branch" => ShellCommand::Run(Action::CreateBranch),
        "pr" => ShellCommand::Run(Action::OpenPullRequest),
        "merge" => ShellCommand::Run(Action::MergePullRequest),
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(command)
}

/// Run the shell until `quit` or end of input.
pub async fn run(controller: Arc<PipelineController>) -> Result<()> {
    println!("pipesim shell. Type `help` for commands.");

    // Print each committed sample while monitoring is on.
    let sample_printer = {
        let mut samples = controller.poller().subscribe();
        tokio::spawn(async move {
            while samples.changed().await.is_ok() {
                if let Some(sample) = samples.borrow_and_update().clone() {
                    println!("[monitor] {}", render_sample(&sample));
                }
            }
        })
    };

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        // Reap finished actions so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}

        match parse_command(&line) {
            Ok(ShellCommand::Run(action)) => {
                debug!(action = action.name(), "dispatching");
                let controller = Arc::clone(&controller);
                in_flight.spawn(async move {
                    let notice = controller.dispatch(action).await;
                    println!("{}", render_notice(&notice));
                });
            }
            Ok(ShellCommand::Status) => print!("{}", render_state(&controller.snapshot())),
            Ok(ShellCommand::Help) => println!("{HELP}"),
            Ok(ShellCommand::Quit) => break,
            Ok(ShellCommand::Empty) => {}
            Err(message) => println!("{message}"),
        }
    }

    if !in_flight.is_empty() {
        println!("Discarding {} in-flight action(s).", in_flight.len());
    }
    in_flight.shutdown().await;
    controller.stop_monitoring();
    sample_printer.abort();
    Ok(())
}
