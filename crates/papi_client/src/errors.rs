//! Error types for property API client operations.
//!
//! Failed HTTP calls keep the response status and the structured response body so
//! callers can distinguish rule validation feedback from genuine failures.

use serde_json::Value;

use crate::models::RulesFeedback;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Marker carried in the `type` field of a rule tree schema validation failure.
const SCHEMA_INVALID_MARKER: &str = "json-schema-invalid";

/// Errors that can occur while talking to the property API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a non-success status code.
    ///
    /// The body is the parsed JSON problem document when the API returned one,
    /// otherwise the raw response text wrapped in a JSON string.
    #[error("Request failed, status code: {status}, response body: '{body}'")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: Value,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Error deserializing the response from the API.
    #[error("Failed to deserialize API response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A resource link returned by the API did not contain the expected id.
    #[error("Can't extract id from link: '{0}'")]
    InvalidLink(String),

    /// The response was well formed but did not contain the expected data.
    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    /// The client could not be constructed from the supplied settings.
    #[error("Invalid client configuration: {0}")]
    InvalidConfiguration(String),

    /// A network name other than `STAGING` or `PRODUCTION` was supplied.
    #[error("network parameter needs to be either 'STAGING' or 'PRODUCTION' but not '{0}'")]
    InvalidNetwork(String),
}

impl Error {
    /// Returns `true` for a 400 response reporting rule tree schema violations.
    ///
    /// Such responses carry validation feedback that should be recorded rather than
    /// treated as a failed call.
    pub fn is_validation_feedback(&self) -> bool {
        match self {
            Error::Api { status: 400, body } => body
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|kind| kind.contains(SCHEMA_INVALID_MARKER)),
            _ => false,
        }
    }

    /// Extracts errors and warnings from a validation feedback response.
    pub fn validation_feedback(&self) -> Option<RulesFeedback> {
        if !self.is_validation_feedback() {
            return None;
        }
        match self {
            Error::Api { body, .. } => serde_json::from_value(body.clone()).ok(),
            _ => None,
        }
    }
}

/// Convenience result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
