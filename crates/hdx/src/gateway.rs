// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Remote catalog gateway contract
//!
//! Every remote interaction is a blocking "call an action with a JSON payload"
//! round-trip. The entity layer only depends on this trait; the HTTP
//! implementation lives in [`crate::ckan`] and an in-memory one in
//! [`crate::memory_gateway`].

use serde_json::Value;
use std::path::Path;

/// Errors raised by a gateway implementation
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The requested object does not exist. Callers treat this as a signal,
    /// not a failure.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{kind}: {message}")]
    Remote { kind: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn remote<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        GatewayError::Remote {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Executes named actions against the remote catalog
pub trait Gateway {
    /// Call `action` with `payload`, optionally attaching a local file as the
    /// `upload` part. Returns the action's `result` member on success.
    fn call_action(
        &self,
        action: &str,
        payload: &Value,
        upload: Option<&Path>,
    ) -> Result<Value, GatewayError>;
}
