// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for catalog operations

use crate::gateway::GatewayError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Field(s) {} missing in {kind}!", fields.join(", "))]
    MissingFields { kind: String, fields: Vec<String> },

    #[error("No data in {kind}!")]
    NoData { kind: String },

    #[error("No {field} field (mandatory) in {kind}!")]
    MissingKey { kind: String, field: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0} is only applicable to requestable datasets!")]
    NotRequestable(String),

    #[error("No existing {kind} to {operation}!")]
    NoExisting { kind: String, operation: String },

    #[error("Action {action} is not supported for {kind}")]
    UnsupportedAction { kind: String, action: String },

    #[error("Inconsistent results: {0}")]
    InconsistentResults(String),

    #[error("Maximum attempts reached for {0}!")]
    MaxAttempts(String),

    #[error("Failed when trying to {action} {key}! (POST)")]
    Action {
        action: String,
        key: String,
        #[source]
        source: GatewayError,
    },

    #[error("Failed when trying to read: {field}={value}! (POST)")]
    Read {
        field: String,
        value: String,
        #[source]
        source: GatewayError,
    },

    #[error("Invalid dataset date: {value}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upload to datastore of {url} failed!")]
    Datastore {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_requestable<S: Into<String>>(operation: S) -> Self {
        Error::NotRequestable(operation.into())
    }

    pub fn no_existing<K: Into<String>, O: Into<String>>(kind: K, operation: O) -> Self {
        Error::NoExisting {
            kind: kind.into(),
            operation: operation.into(),
        }
    }

    /// True for the variant raised by requestable-only operations on a normal dataset
    pub fn is_not_requestable(&self) -> bool {
        matches!(self, Error::NotRequestable(_))
    }

    /// True when a paginated walk should be repeated from scratch
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Error::InconsistentResults(_))
    }
}
