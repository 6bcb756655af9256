//! Application-level error types.

use std::io;

use jira_api::JiraError;
use thiserror::Error;

use crate::credentials::CredentialError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Could not determine the config directory")]
    ConfigDir,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Credentials(#[from] CredentialError),

    #[error("{0}")]
    Api(#[from] JiraError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
