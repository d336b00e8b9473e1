use devops_core::DevOpsError;
use serde_json::{json, Value};
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Exit code for failed pipeline operations.
pub const EXIT_OPERATION_FAILED: i32 = 1;

/// Exit code for unusable configuration or arguments.
pub const EXIT_USAGE: i32 = 2;

/// Errors that can occur in the CLI application.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file is missing, unreadable or incomplete.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Arguments that parse fine but can't be acted on.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A pipeline operation failed.
    #[error(transparent)]
    Operation(#[from] DevOpsError),

    /// A result could not be rendered as JSON.
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::InvalidArguments(_) => EXIT_USAGE,
            Error::Operation(DevOpsError::Argument { .. }) => EXIT_USAGE,
            Error::Operation(_) | Error::Output(_) => EXIT_OPERATION_FAILED,
        }
    }

    /// Machine readable description printed on stderr.
    pub fn report(&self) -> Value {
        match self {
            Error::Operation(DevOpsError::Validation {
                message,
                message_id,
                payload,
            }) => json!({
                "message": message,
                "messageId": message_id,
                "errors": payload,
            }),
            Error::Operation(e) => json!({
                "message": e.to_string(),
                "messageId": e.message_id(),
            }),
            Error::Config(_) | Error::InvalidArguments(_) | Error::Output(_) => json!({
                "message": self.to_string(),
            }),
        }
    }
}
