pub mod cli;
pub mod config;
pub mod env_detect;
pub mod executor;
pub mod expo;
pub mod manifest;
pub mod planner;
pub mod runner;
pub mod session;

#[cfg(test)]
mod testing;

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    cli::run()
}
