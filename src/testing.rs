use std::cell::RefCell;
use std::path::PathBuf;

use crate::runner::{CommandResult, CommandRunner, Invocation};

/// Records invocations instead of spawning them; scripted commands exit non-zero.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<(String, Option<PathBuf>)>>,
    fail_prefixes: Vec<String>,
    fail_exact: Vec<String>,
    output: Option<String>,
}

impl RecordingRunner {
    /// Fails every command starting with one of `prefixes` (program and args, no `$`).
    pub fn failing(prefixes: &[&str]) -> Self {
        Self {
            fail_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_exact(commands: &[&str]) -> Self {
        Self {
            fail_exact: commands.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Output reported by failing invocations that capture it.
    pub fn with_output(mut self, output: &str) -> Self {
        self.output = Some(output.to_string());
        self
    }

    /// Printable lines of every invocation, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(line, _)| line.clone()).collect()
    }

    pub fn dirs(&self) -> Vec<Option<PathBuf>> {
        self.calls.borrow().iter().map(|(_, dir)| dir.clone()).collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|line| command_of(line).starts_with(prefix))
            .count()
    }

    fn should_fail(&self, command: &str) -> bool {
        self.fail_exact.iter().any(|c| c == command)
            || self.fail_prefixes.iter().any(|p| command.starts_with(p.as_str()))
    }
}

fn command_of(line: &str) -> &str {
    line.strip_prefix("$ ").unwrap_or(line)
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<CommandResult> {
        let printable = invocation.printable();
        self.calls
            .borrow_mut()
            .push((printable.clone(), invocation.dir().map(PathBuf::from)));

        let success = !self.should_fail(command_of(&printable));
        let output = if invocation.captures_output() {
            Some(if success {
                String::new()
            } else {
                self.output.clone().unwrap_or_default()
            })
        } else {
            None
        };

        Ok(CommandResult {
            success,
            exit_code: Some(if success { 0 } else { 1 }),
            output,
            printable,
        })
    }
}
