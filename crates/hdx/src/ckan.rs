// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Blocking HTTP gateway for CKAN-style action APIs

use crate::gateway::{Gateway, GatewayError};
use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

const TIMEOUT_SECONDS: u64 = 60;
const USER_AGENT: &str = concat!("hdx-rs/", env!("CARGO_PKG_VERSION"));
const NOT_FOUND_TYPE: &str = "Not Found Error";

pub struct CkanGateway {
    client: reqwest::blocking::Client,
    site_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Map<String, Value>>,
}

impl CkanGateway {
    pub fn new<S: Into<String>>(site_url: S, api_key: Option<String>) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            site_url: site_url.into(),
            api_key,
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{action}", self.site_url.trim_end_matches('/'))
    }
}

impl Gateway for CkanGateway {
    fn call_action(
        &self,
        action: &str,
        payload: &Value,
        upload: Option<&Path>,
    ) -> Result<Value, GatewayError> {
        let url = self.action_url(action);
        let mut request = self.client.post(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key);
        }
        request = match upload {
            Some(path) => request.multipart(multipart_form(payload, path)?),
            None => request.json(payload),
        };
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        parse_response(status, &body)
    }
}

/// Fields travel as text parts next to the file, the way CKAN expects uploads
fn multipart_form(payload: &Value, path: &Path) -> Result<Form, GatewayError> {
    let mut form = Form::new();
    if let Value::Object(fields) = payload {
        for (key, value) in fields {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
    }
    Ok(form.file("upload", path)?)
}

fn parse_response(status: u16, body: &str) -> Result<Value, GatewayError> {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if status == 404 => return Err(GatewayError::NotFound(body.to_string())),
        Err(e) => return Err(GatewayError::Json(e)),
    };
    if envelope.success {
        return Ok(envelope.result.unwrap_or(Value::Null));
    }
    let mut error = envelope.error.unwrap_or_default();
    let kind = match error.remove("__type") {
        Some(Value::String(kind)) => kind,
        _ => "Unknown Error".to_string(),
    };
    let message = match error.remove("message") {
        Some(Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => Value::Object(error).to_string(),
    };
    if kind == NOT_FOUND_TYPE || status == 404 {
        Err(GatewayError::NotFound(message))
    } else {
        Err(GatewayError::remote(kind, message))
    }
}
