use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{EjectMethod, ValidationError, WorkflowConfig};
use crate::env_detect::{PackageManager, Toolchain, detect_package_manager};
use crate::expo::ExpoCli;
use crate::manifest::REACT_NATIVE_PACKAGE;

#[derive(Debug, Serialize)]
pub struct WorkflowPlan {
    pub eject_method: EjectMethod,
    pub workdir: PathBuf,
    pub steps: Vec<PlannedStep>,
    /// Manager a reinstall would use if it ran now; re-detected at execution time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinstall_manager: Option<PackageManager>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<Toolchain>,
}

impl WorkflowPlan {
    /// Steps run in order, before cleanup.
    pub fn main_steps(&self) -> impl Iterator<Item = &PlannedStep> {
        self.steps.iter().filter(|planned| planned.step != Step::Logout)
    }

    pub fn has_logout(&self) -> bool {
        self.steps.iter().any(|planned| planned.step == Step::Logout)
    }
}

#[derive(Debug, Serialize)]
pub struct PlannedStep {
    pub index: usize,
    pub description: String,
    #[serde(flatten)]
    pub step: Step,
    /// Redacted command line, for steps that spawn a process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    InstallCli { version: String },
    Login,
    Eject { method: EjectMethod },
    /// `own_session` brackets the publish with its own login and logout.
    Publish { own_session: bool },
    OverrideDependency { package: String, version: String },
    Reinstall,
    /// Cleanup; executed after every other step whatever their outcome.
    Logout,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::InstallCli { .. } => "install_cli",
            Step::Login => "login",
            Step::Eject { .. } => "eject",
            Step::Publish { .. } => "publish",
            Step::OverrideDependency { .. } => "override_dependency",
            Step::Reinstall => "reinstall",
            Step::Logout => "logout",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Step::InstallCli { version } => format!("Install Expo CLI version: {version}"),
            Step::Login => "Login to Expo".to_string(),
            Step::Eject { method } => format!("Eject project (--eject-method {method})"),
            Step::Publish { own_session: true } => {
                "Run expo publish within its own login session".to_string()
            }
            Step::Publish { own_session: false } => "Run expo publish".to_string(),
            Step::OverrideDependency { package, version } => {
                format!("Set {package} dependency version: {version}")
            }
            Step::Reinstall => "Install new node dependencies".to_string(),
            Step::Logout => "Logging out from Expo".to_string(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validates `config` and lays out the steps a run would take.
pub fn plan_workflow(config: &WorkflowConfig, cli: &ExpoCli) -> Result<WorkflowPlan, ValidationError> {
    config.validate()?;

    let method = config.resolve_eject_method();
    let mut steps = vec![Step::InstallCli {
        version: config.cli_version.clone(),
    }];

    if method.requires_account() {
        steps.push(Step::Login);
    }

    steps.push(Step::Eject { method });

    if config.publish {
        let own_session = !method.requires_account() && config.credentials().is_some();
        steps.push(Step::Publish { own_session });
    }

    let mut reinstall_manager = None;
    if let Some(version) = &config.override_react_native_version {
        steps.push(Step::OverrideDependency {
            package: REACT_NATIVE_PACKAGE.to_string(),
            version: version.clone(),
        });
        steps.push(Step::Reinstall);
        reinstall_manager = Some(detect_package_manager(&config.workdir));
    }

    if method.requires_account() && config.logout_enabled() {
        steps.push(Step::Logout);
    }

    let steps = steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| PlannedStep {
            index,
            description: step.description(),
            command: planned_command(&step, config, cli, reinstall_manager),
            step,
        })
        .collect();

    Ok(WorkflowPlan {
        eject_method: method,
        workdir: config.workdir.clone(),
        steps,
        reinstall_manager,
        toolchain: None,
    })
}

fn planned_command(
    step: &Step,
    config: &WorkflowConfig,
    cli: &ExpoCli,
    reinstall_manager: Option<PackageManager>,
) -> Option<String> {
    let invocation = match step {
        Step::InstallCli { version } => ExpoCli::install_cli_invocation(version),
        Step::Login => {
            let (user, password) = config.credentials()?;
            cli.login_invocation(user, password)
        }
        Step::Eject { method } => cli.eject_invocation(*method),
        Step::Publish { .. } => cli.publish_invocation(),
        Step::OverrideDependency { .. } => return None,
        Step::Reinstall => cli.reinstall_invocation(reinstall_manager?),
        Step::Logout => cli.logout_invocation(),
    };
    Some(invocation.printable())
}
