use std::process::ExitStatus;

use reolink_api::ApiError;
use thiserror::Error;

/// Errors that end a watch session
#[derive(Error, Debug)]
pub enum WatchError {
    /// Authentication failed outright; retrying would not help
    #[error("Watch stopped: {0}")]
    Auth(#[source] ApiError),

    /// Every state query was dropped as unsupported
    #[error("Nothing to watch: this camera supports none of the configured detection queries")]
    NothingToWatch,

    /// The background watch thread panicked
    #[error("Watch thread panicked")]
    WorkerPanicked,
}

impl WatchError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WatchError::Auth(e) => e.exit_code(),
            WatchError::NothingToWatch => reolink_api::error::EXIT_UNSUPPORTED,
            WatchError::WorkerPanicked => reolink_api::error::EXIT_ERROR,
        }
    }
}

/// Failure of the external command run for an event
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to start action '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Action '{command}' exited with {status}")]
    Failed { command: String, status: ExitStatus },
}

/// Type alias for watch results
pub type Result<T> = std::result::Result<T, WatchError>;
