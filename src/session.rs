use serde::Serialize;

use crate::config::Secret;
use crate::expo::{ExpoCli, run_logged};
use crate::runner::{CommandResult, CommandRunner};

/// Lifecycle of the Expo account session within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    LoggedIn,
    /// A logout was attempted. Whether it succeeded does not matter here.
    LoggedOut,
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn)
    }
}

/// Login and logout against the Expo account service.
///
/// Holds no state of its own; the caller tracks [`SessionState`].
#[derive(Debug, Clone)]
pub struct AccountSession<'a> {
    cli: &'a ExpoCli,
}

impl<'a> AccountSession<'a> {
    pub fn new(cli: &'a ExpoCli) -> Self {
        Self { cli }
    }

    /// Non-interactive login. Only the masked command line is ever logged.
    pub fn login(
        &self,
        runner: &dyn CommandRunner,
        user_name: &str,
        password: &Secret,
    ) -> anyhow::Result<CommandResult> {
        run_logged(runner, &self.cli.login_invocation(user_name, password))
    }

    /// Safe to call without a prior login; the CLI reports that as a failure at worst.
    pub fn logout(&self, runner: &dyn CommandRunner) -> anyhow::Result<CommandResult> {
        run_logged(runner, &self.cli.logout_invocation())
    }
}
