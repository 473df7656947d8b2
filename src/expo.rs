//! Invocations of the Expo CLI and the node package managers around it.

use std::path::PathBuf;

use tracing::info;

use crate::config::{EjectMethod, Secret};
use crate::env_detect::PackageManager;
use crate::runner::{CommandResult, CommandRunner, Invocation};

/// npm package that provides the `expo` binary.
pub const EXPO_CLI_PACKAGE: &str = "expo-cli";
pub const EXPO_BINARY: &str = "expo";
const NPM_BINARY: &str = "npm";

/// Builds and runs Expo CLI commands for one project.
#[derive(Debug, Clone)]
pub struct ExpoCli {
    binary: String,
    workdir: Option<PathBuf>,
}

impl Default for ExpoCli {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ExpoCli {
    /// `workdir` of `None` runs project commands in the current directory.
    pub fn new(workdir: Option<PathBuf>) -> Self {
        Self {
            binary: EXPO_BINARY.to_string(),
            workdir,
        }
    }

    /// `npm install -g expo-cli[@version]`; `latest` installs unpinned.
    pub fn install_cli_invocation(version: &str) -> Invocation {
        let package = if version == "latest" {
            EXPO_CLI_PACKAGE.to_string()
        } else {
            format!("{EXPO_CLI_PACKAGE}@{version}")
        };
        Invocation::new(NPM_BINARY, ["install", "-g"]).arg(package)
    }

    pub fn login_invocation(&self, user_name: &str, password: &Secret) -> Invocation {
        Invocation::new(&self.binary, ["login", "--non-interactive", "-u", user_name, "-p"])
            .secret_arg(password)
    }

    pub fn logout_invocation(&self) -> Invocation {
        Invocation::new(&self.binary, ["logout", "--non-interactive"])
    }

    pub fn eject_invocation(&self, method: EjectMethod) -> Invocation {
        self.in_project(Invocation::new(
            &self.binary,
            ["eject", "--non-interactive", "--eject-method", method.as_str()],
        ))
    }

    pub fn publish_invocation(&self) -> Invocation {
        self.in_project(Invocation::new(&self.binary, ["publish", "--non-interactive"]))
    }

    /// `<manager> install` in the project, with output captured for diagnostics.
    pub fn reinstall_invocation(&self, manager: PackageManager) -> Invocation {
        self.in_project(Invocation::new(manager.program(), ["install"]))
            .capture_output()
    }

    pub fn install_cli(
        &self,
        runner: &dyn CommandRunner,
        version: &str,
    ) -> anyhow::Result<CommandResult> {
        run_logged(runner, &Self::install_cli_invocation(version))
    }

    pub fn eject(
        &self,
        runner: &dyn CommandRunner,
        method: EjectMethod,
    ) -> anyhow::Result<CommandResult> {
        run_logged(runner, &self.eject_invocation(method))
    }

    pub fn publish(&self, runner: &dyn CommandRunner) -> anyhow::Result<CommandResult> {
        run_logged(runner, &self.publish_invocation())
    }

    pub fn reinstall(
        &self,
        runner: &dyn CommandRunner,
        manager: PackageManager,
    ) -> anyhow::Result<CommandResult> {
        run_logged(runner, &self.reinstall_invocation(manager))
    }

    fn in_project(&self, invocation: Invocation) -> Invocation {
        match &self.workdir {
            Some(dir) => invocation.current_dir(dir),
            None => invocation,
        }
    }
}

/// Logs the redacted command line, runs it and fails on a non-zero exit.
pub(crate) fn run_logged(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> anyhow::Result<CommandResult> {
    info!("{}", invocation.printable());
    runner.run(invocation)?.ok()
}
