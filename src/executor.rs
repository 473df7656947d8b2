use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{EjectMethod, ValidationError, WorkflowConfig};
use crate::env_detect::detect_package_manager;
use crate::expo::ExpoCli;
use crate::manifest::{ManifestError, load_manifest, save_manifest, set_dependency_version};
use crate::planner::{PlannedStep, Step, WorkflowPlan, plan_workflow};
use crate::runner::CommandRunner;
use crate::session::{AccountSession, SessionState};

#[derive(Debug, Serialize)]
pub struct WorkflowOutcome {
    pub eject_method: EjectMethod,
    pub completed_steps: Vec<Step>,
    pub session: SessionState,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("input validation error: {0}")]
    Validation(#[from] ValidationError),
    /// `number` is 1-based, matching the `==> [i/n]` banner.
    #[error("step {number} ({step}) failed: {message}")]
    StepFailed {
        number: usize,
        step: &'static str,
        message: String,
    },
    #[error("step {number} (override_dependency) failed: {source}")]
    Manifest {
        number: usize,
        #[source]
        source: ManifestError,
    },
}

/// One run of the eject workflow against a project.
pub struct Workflow<'a> {
    config: &'a WorkflowConfig,
    cli: ExpoCli,
    runner: &'a dyn CommandRunner,
}

impl<'a> Workflow<'a> {
    pub fn new(config: &'a WorkflowConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            cli: ExpoCli::new(Some(config.workdir.clone())),
            runner,
        }
    }

    pub fn plan(&self) -> Result<WorkflowPlan, ValidationError> {
        plan_workflow(self.config, &self.cli)
    }

    /// Validates, plans and executes. Nothing is spawned if validation fails.
    pub fn run(&self) -> Result<WorkflowOutcome, WorkflowError> {
        let plan = self.plan()?;
        self.execute_plan(&plan)
    }

    /// Runs every step in order and stops at the first failure.
    ///
    /// A session opened by the login step is logged out afterwards on every path,
    /// unless logout was disabled. Logout failures only warn.
    pub fn execute_plan(&self, plan: &WorkflowPlan) -> Result<WorkflowOutcome, WorkflowError> {
        log_eject_method(self.config, plan.eject_method);

        let total = plan.steps.len();
        let mut session = SessionState::NotStarted;
        let mut completed_steps = Vec::new();
        let mut failure = None;

        for planned in plan.main_steps() {
            info!("==> [{}/{}] {}", planned.index + 1, total, planned.description);
            match self.execute_step(planned, &mut session) {
                Ok(()) => completed_steps.push(planned.step.clone()),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if self.finish_session(&mut session) {
            completed_steps.push(Step::Logout);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(WorkflowOutcome {
                eject_method: plan.eject_method,
                completed_steps,
                session,
            }),
        }
    }

    fn execute_step(
        &self,
        planned: &PlannedStep,
        session: &mut SessionState,
    ) -> Result<(), WorkflowError> {
        let number = planned.index + 1;
        let failed = |err: anyhow::Error| WorkflowError::StepFailed {
            number,
            step: planned.step.name(),
            message: format!("{err:#}"),
        };

        match &planned.step {
            Step::InstallCli { version } => {
                self.cli.install_cli(self.runner, version).map_err(failed)?;
            }
            Step::Login => {
                let (user, password) = self.config.credentials().ok_or_else(|| {
                    failed(anyhow::anyhow!("no Expo account credentials configured"))
                })?;
                AccountSession::new(&self.cli)
                    .login(self.runner, user, password)
                    .map_err(failed)?;
                *session = SessionState::LoggedIn;
            }
            Step::Eject { method } => {
                self.cli.eject(self.runner, *method).map_err(failed)?;
                info!("Successfully ejected your project");
            }
            Step::Publish { own_session } => {
                self.publish(*own_session).map_err(failed)?;
            }
            Step::OverrideDependency { package, version } => {
                let path = self.config.workdir.join("package.json");
                load_manifest(&path)
                    .and_then(|manifest| set_dependency_version(manifest, package, version))
                    .and_then(|manifest| save_manifest(&manifest, &path))
                    .map_err(|source| WorkflowError::Manifest { number, source })?;
            }
            Step::Reinstall => {
                let manager = detect_package_manager(&self.config.workdir);
                info!("Install new node dependencies with {manager}");
                self.cli.reinstall(self.runner, manager).map_err(failed)?;
            }
            Step::Logout => {}
        }

        Ok(())
    }

    /// Publishes, opening and closing a session of its own when asked to.
    fn publish(&self, own_session: bool) -> anyhow::Result<()> {
        let credentials = self.config.credentials().filter(|_| own_session);
        let Some((user, password)) = credentials else {
            self.cli.publish(self.runner)?;
            return Ok(());
        };

        let account = AccountSession::new(&self.cli);
        account.login(self.runner, user, password)?;
        let published = self.cli.publish(self.runner);
        if self.config.logout_enabled() {
            if let Err(err) = account.logout(self.runner) {
                warn!("Failed to log out from your Expo account, error: {err:#}");
            }
        }
        published.map(|_| ())
    }

    /// Cleanup. Returns whether a logout ran and succeeded.
    fn finish_session(&self, session: &mut SessionState) -> bool {
        info!("Logging out from Expo");
        if !session.is_logged_in() {
            info!("You were not logged in => Skip...");
            return false;
        }

        if !self.config.logout_enabled() {
            info!("Logout input was set to false => Skip...");
            return false;
        }

        let result = AccountSession::new(&self.cli).logout(self.runner);
        *session = SessionState::LoggedOut;
        match result {
            Ok(_) => true,
            Err(err) => {
                warn!("Failed to log out from your Expo account, error: {err:#}");
                false
            }
        }
    }
}

fn log_eject_method(config: &WorkflowConfig, method: EjectMethod) {
    info!("Define --eject-method");
    match (config.eject_method, config.credentials().is_some()) {
        (Some(_), _) => info!("--eject-method was set explicitly => {method}"),
        (None, true) => info!(
            "Expo account credentials have been provided => Set the --eject-method to {method}"
        ),
        (None, false) => info!(
            "Expo account credentials have not been provided => Set the --eject-method to {method}"
        ),
    }
}
