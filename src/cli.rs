use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use crate::config::{EjectMethod, Secret, WorkflowConfig, non_empty, parse_flag};
use crate::env_detect::detect_toolchain;
use crate::executor::{Workflow, WorkflowError};
use crate::runner::SystemRunner;

#[derive(Debug, Parser)]
#[command(
    name = "expo-detach",
    version,
    about = "Eject an Expo managed project into native iOS and Android projects"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate the inputs and print the steps a run would take, without running them
    Plan {
        #[command(flatten)]
        inputs: WorkflowArgs,
        /// Emit compact JSON instead of pretty output
        #[arg(long)]
        raw: bool,
    },
    /// Install the Expo CLI, eject the project and apply the optional follow-ups
    Run {
        #[command(flatten)]
        inputs: WorkflowArgs,
        /// Emit the plan and the outcome as compact JSON
        #[arg(long)]
        raw: bool,
    },
}

/// Workflow inputs; each can also come from the environment.
///
/// Variable names are the step inputs exported by the build pipeline, including the
/// historical `expo_cli_verson` spelling.
#[derive(Debug, Args)]
struct WorkflowArgs {
    /// Project directory containing package.json
    #[arg(long, env = "project_path", default_value = ".")]
    project_path: PathBuf,
    /// Expo CLI version to install, or `latest`
    #[arg(long, env = "expo_cli_verson")]
    expo_cli_version: String,
    /// Expo account user name
    #[arg(long, env = "user_name")]
    user_name: Option<String>,
    /// Expo account password
    #[arg(long, env = "password", hide_env_values = true)]
    password: Option<String>,
    /// `plain` or `expoKit`; inferred from the credentials when omitted
    #[arg(long, env = "eject_method")]
    eject_method: Option<EjectMethod>,
    /// Run `expo publish` after ejecting (yes/no)
    #[arg(long, env = "run_publish", default_value = "no", value_parser = parse_flag, action = ArgAction::Set)]
    run_publish: bool,
    /// Force this react-native version in package.json and reinstall dependencies
    #[arg(long, env = "override_react_native_version")]
    override_react_native_version: Option<String>,
    /// Log out of the Expo account at the end (true/false)
    #[arg(long, env = "logout", value_parser = parse_flag)]
    logout: Option<bool>,
}

impl WorkflowArgs {
    fn into_config(self) -> WorkflowConfig {
        WorkflowConfig {
            workdir: self.project_path,
            cli_version: self.expo_cli_version.trim().to_string(),
            user_name: non_empty(self.user_name),
            password: self
                .password
                .filter(|password| !password.is_empty())
                .map(Secret::new),
            eject_method: self.eject_method,
            publish: self.run_publish,
            override_react_native_version: non_empty(self.override_react_native_version)
                .map(|version| version.trim().to_string()),
            logout: self.logout,
        }
    }
}

/// Parse the process arguments, run the chosen command and return an exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => 0,
        Err(err) => {
            error!("{err:#}");
            1
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Plan { inputs, raw } => {
            let config = inputs.into_config();
            let workflow = Workflow::new(&config, &SystemRunner);
            let mut plan = workflow.plan().map_err(WorkflowError::from)?;
            plan.toolchain = Some(detect_toolchain());
            print_json(&plan, raw)?;
        }
        Commands::Run { inputs, raw } => {
            let config = inputs.into_config();
            info!("Configuration:\n{}", serde_json::to_string_pretty(&config)?);

            let workflow = Workflow::new(&config, &SystemRunner);
            let plan = workflow.plan().map_err(WorkflowError::from)?;
            if raw {
                println!("{}", serde_json::to_string(&plan)?);
            } else {
                println!(
                    "Preparing to eject using method '{}' ({} steps)",
                    plan.eject_method,
                    plan.steps.len()
                );
            }

            let outcome = workflow.execute_plan(&plan)?;
            if raw {
                println!("{}", serde_json::to_string(&outcome)?);
            }
            info!(
                "Workflow finished: {} steps completed, session {:?}",
                outcome.completed_steps.len(),
                outcome.session
            );
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, raw: bool) -> anyhow::Result<()> {
    if raw {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
