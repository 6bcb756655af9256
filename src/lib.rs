//! Task timer that logs tracked time as Jira worklogs.
//!
//! The background [`timer::SessionManager`] owns the single timer session and talks to
//! the [`popup::PopupController`] only through the [`bus::MessageBus`].

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

pub mod bus;
pub mod cli;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod issue_store;
pub mod messages;
pub mod popup;
pub mod timer;

pub fn run() -> ExitCode {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .format_timestamp_millis()
    .try_init();

    let cli = cli::Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting jira-timer");
    match runtime.block_on(cli::execute(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
