//! External process invocation with secret-aware printable command lines.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};

use crate::config::{REDACTED, Secret};

/// A single external program call, built before it is logged or run.
#[derive(Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    secret: Option<Secret>,
    capture: bool,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            secret: None,
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run in `dir` instead of the current process directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Append a secret argument. It is passed to the child verbatim and masked everywhere else.
    pub fn secret_arg(mut self, secret: &Secret) -> Self {
        self.args.push(secret.expose().to_string());
        self.secret = Some(secret.clone());
        self
    }

    /// Capture combined output instead of streaming it to the parent's stdio.
    pub fn capture_output(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn captures_output(&self) -> bool {
        self.capture
    }

    /// `$ program arg ...` with the designated secret replaced by the placeholder.
    pub fn printable(&self) -> String {
        let mut line = String::from("$ ");
        line.push_str(&quote(&self.mask(&self.program)));
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(&self.mask(arg)));
        }
        // A secret can also span the separators between arguments.
        self.mask(&line)
    }

    fn mask(&self, arg: &str) -> String {
        match &self.secret {
            Some(secret) if !secret.is_empty() => arg.replace(secret.expose(), REDACTED),
            _ => arg.to_string(),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|arg| self.mask(arg)).collect();
        f.debug_struct("Invocation")
            .field("program", &self.mask(&self.program))
            .field("args", &args)
            .field("dir", &self.dir)
            .field("secret", &self.secret)
            .field("capture", &self.capture)
            .finish()
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

/// Outcome of one external invocation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Trimmed stdout followed by stderr, only for capturing invocations.
    pub output: Option<String>,
    /// Redacted command line.
    pub printable: String,
}

impl CommandResult {
    /// Turns a non-zero exit into an error carrying the command line and any captured output.
    pub fn ok(self) -> anyhow::Result<Self> {
        if self.success {
            return Ok(self);
        }

        match (self.output.as_deref(), self.exit_code) {
            (Some(out), _) if !out.is_empty() => {
                Err(anyhow!("{} failed: {}", self.printable, out))
            }
            (_, Some(code)) => Err(anyhow!("{} failed with exit status {code}", self.printable)),
            (_, None) => Err(anyhow!("{} terminated by signal", self.printable)),
        }
    }
}

/// Seam between the workflow and the processes it spawns.
pub trait CommandRunner {
    /// Run to completion. `Err` means the process could not be started at all.
    fn run(&self, invocation: &Invocation) -> anyhow::Result<CommandResult>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<CommandResult> {
        let mut command = Command::new(invocation.program());
        command.args(invocation.args());
        if let Some(dir) = invocation.dir() {
            command.current_dir(dir);
        }

        let printable = invocation.printable();
        if invocation.captures_output() {
            let output = command
                .stdin(Stdio::null())
                .output()
                .with_context(|| format!("running {printable}"))?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = [stdout.trim(), stderr.trim()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            return Ok(CommandResult {
                success: output.status.success(),
                exit_code: output.status.code(),
                output: Some(combined),
                printable,
            });
        }

        let status = command
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("running {printable}"))?;

        Ok(CommandResult {
            success: status.success(),
            exit_code: status.code(),
            output: None,
            printable,
        })
    }
}
