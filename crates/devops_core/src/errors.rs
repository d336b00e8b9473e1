//! Error types for pipeline and environment operations.
//!
//! Every error carries a stable message id (see [`DevOpsError::message_id`]) so front
//! ends can recognize a failure without parsing its human readable message.

use papi_client::Network;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised by the configuration pipeline.
#[derive(Error, Debug)]
pub enum DevOpsError {
    /// The caller supplied an invalid argument.
    #[error("{message}")]
    Argument {
        message: String,
        message_id: String,
    },

    /// A file, remote resource or piece of recorded state the operation relies on
    /// is missing or inconsistent.
    #[error("{message}")]
    Dependency {
        message: String,
        message_id: String,
    },

    /// The operation is not allowed because of recorded validation results.
    #[error("{message}")]
    Validation {
        message: String,
        message_id: String,
        /// Errors that blocked the operation
        payload: Vec<Value>,
    },

    /// Declared variables have neither a default nor a supplied value.
    #[error("{message}")]
    UnusedVariable { names: Vec<String>, message: String },

    /// Values were supplied for undeclared variables.
    #[error("{message}")]
    UndefinedVariables { names: Vec<String>, message: String },

    /// A template expression referenced an undefined variable.
    #[error("Undefined variable: '{key}'")]
    UndefinedVariable { key: String },

    /// Any other template resolution failure.
    #[error(transparent)]
    Template(template_engine::Error),

    /// An activation is already in progress on the network.
    #[error("Activation for '{network}' network already pending")]
    PendingActivation { network: Network, activation_id: u64 },

    /// The latest version is already live on the network.
    #[error("Latest version already active in '{network}' network")]
    AlreadyActive { network: Network, version: u64 },

    /// A deactivation was requested while nothing is active.
    #[error("No version active in '{network}' network")]
    NotActive { network: Network },

    /// A remote call failed.
    #[error(transparent)]
    RemoteApi(papi_client::Error),

    /// A project file could not be read or written.
    #[error("Failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A project file does not contain valid JSON of the expected shape.
    #[error("Invalid JSON in '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DevOpsError {
    pub fn argument(message: impl Into<String>, message_id: impl Into<String>) -> Self {
        DevOpsError::Argument {
            message: message.into(),
            message_id: message_id.into(),
        }
    }

    pub fn dependency(message: impl Into<String>, message_id: impl Into<String>) -> Self {
        DevOpsError::Dependency {
            message: message.into(),
            message_id: message_id.into(),
        }
    }

    pub fn validation(
        message: impl Into<String>,
        message_id: impl Into<String>,
        payload: Vec<Value>,
    ) -> Self {
        DevOpsError::Validation {
            message: message.into(),
            message_id: message_id.into(),
            payload,
        }
    }

    /// Stable identifier of the failure.
    pub fn message_id(&self) -> &str {
        match self {
            DevOpsError::Argument { message_id, .. }
            | DevOpsError::Dependency { message_id, .. }
            | DevOpsError::Validation { message_id, .. } => message_id,
            DevOpsError::UnusedVariable { .. } => "unused_variable",
            DevOpsError::UndefinedVariables { .. } => "undefined_variables",
            DevOpsError::UndefinedVariable { .. } => "undefined_variable",
            DevOpsError::Template(_) => "template_error",
            DevOpsError::PendingActivation { .. } => "activation_pending_error",
            DevOpsError::AlreadyActive { .. } => "already_active_error",
            DevOpsError::NotActive { .. } => "not_active_error",
            DevOpsError::RemoteApi(_) => "remote_api_error",
            DevOpsError::Io { .. } => "file_access_error",
            DevOpsError::Json { .. } => "invalid_json_file",
        }
    }

    /// Returns `true` for errors caused by caller input rather than project state or
    /// remote failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DevOpsError::Argument { .. }
                | DevOpsError::Validation { .. }
                | DevOpsError::UnusedVariable { .. }
                | DevOpsError::UndefinedVariables { .. }
                | DevOpsError::UndefinedVariable { .. }
        )
    }
}

impl From<template_engine::Error> for DevOpsError {
    fn from(error: template_engine::Error) -> Self {
        match error {
            template_engine::Error::UndefinedVariable { key } => {
                DevOpsError::UndefinedVariable { key }
            }
            template_engine::Error::UnusedVariable { ref names, .. } => {
                DevOpsError::UnusedVariable {
                    names: names.clone(),
                    message: error.to_string(),
                }
            }
            template_engine::Error::UndefinedVariables { ref names, .. } => {
                DevOpsError::UndefinedVariables {
                    names: names.clone(),
                    message: error.to_string(),
                }
            }
            template_engine::Error::IncludeNotFound { ref reason, .. } => DevOpsError::Dependency {
                message: format!("{error}: {reason}"),
                message_id: "cannot_load_template".to_string(),
            },
            template_engine::Error::Source(ref reason) => DevOpsError::Dependency {
                message: reason.clone(),
                message_id: "cannot_load_merge_input".to_string(),
            },
            other => DevOpsError::Template(other),
        }
    }
}

impl From<papi_client::Error> for DevOpsError {
    fn from(error: papi_client::Error) -> Self {
        match error {
            papi_client::Error::InvalidNetwork(_) => DevOpsError::Argument {
                message: error.to_string(),
                message_id: "illegal_network_name".to_string(),
            },
            other => DevOpsError::RemoteApi(other),
        }
    }
}

/// Convenience result alias for pipeline operations.
pub type DevOpsResult<T> = std::result::Result<T, DevOpsError>;
