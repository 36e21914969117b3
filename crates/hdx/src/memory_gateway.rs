// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory gateway for tests and offline use
//!
//! Responses are scripted per action: queued responses are consumed first,
//! then a sticky default, then a built-in fallback (`*_show` is not found,
//! create/update/patch echo the payload back with ids filled in, anything
//! else returns null). Every call is recorded.

use crate::gateway::{Gateway, GatewayError};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// A scripted reply
#[derive(Debug, Clone)]
pub enum Response {
    Ok(Value),
    NotFound,
    Error(String),
    /// Return the payload, assigning ids the way the catalog would
    Echo,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub action: String,
    pub payload: Value,
    pub upload: Option<PathBuf>,
}

#[derive(Default)]
pub struct MemoryGateway {
    queued: RefCell<HashMap<String, VecDeque<Response>>>,
    defaults: RefCell<HashMap<String, Response>>,
    calls: RefCell<Vec<Call>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful result for the next call of `action`
    pub fn respond(&self, action: &str, result: Value) {
        self.push(action, Response::Ok(result));
    }

    /// Queue a not-found error for the next call of `action`
    pub fn not_found(&self, action: &str) {
        self.push(action, Response::NotFound);
    }

    /// Queue a remote failure for the next call of `action`
    pub fn fail(&self, action: &str, message: &str) {
        self.push(action, Response::Error(message.to_string()));
    }

    pub fn push(&self, action: &str, response: Response) {
        self.queued
            .borrow_mut()
            .entry(action.to_string())
            .or_default()
            .push_back(response);
    }

    /// Reply used whenever nothing is queued for `action`
    pub fn set_default(&self, action: &str, response: Response) {
        let _ = self
            .defaults
            .borrow_mut()
            .insert(action.to_string(), response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.action.clone()).collect()
    }

    pub fn calls_for(&self, action: &str) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.action == action)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn next_response(&self, action: &str) -> Response {
        if let Some(response) = self
            .queued
            .borrow_mut()
            .get_mut(action)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        if let Some(response) = self.defaults.borrow().get(action) {
            return response.clone();
        }
        if action.ends_with("_show") {
            Response::NotFound
        } else if action.ends_with("_create")
            || action.ends_with("_update")
            || action.ends_with("_patch")
        {
            Response::Echo
        } else {
            Response::Ok(Value::Null)
        }
    }
}

impl Gateway for MemoryGateway {
    fn call_action(
        &self,
        action: &str,
        payload: &Value,
        upload: Option<&Path>,
    ) -> Result<Value, GatewayError> {
        self.calls.borrow_mut().push(Call {
            action: action.to_string(),
            payload: payload.clone(),
            upload: upload.map(Path::to_path_buf),
        });
        match self.next_response(action) {
            Response::Ok(value) => Ok(value),
            Response::NotFound => Err(GatewayError::NotFound(format!("{action}: not found"))),
            Response::Error(message) => Err(GatewayError::remote("Validation Error", message)),
            Response::Echo => Ok(echo(action, payload)),
        }
    }
}

fn echo(action: &str, payload: &Value) -> Value {
    let mut object = match payload {
        Value::Object(map) => map.clone(),
        _ => return payload.clone(),
    };
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unnamed")
        .to_string();
    let _ = object
        .entry("id")
        .or_insert_with(|| Value::String(format!("id-{name}")));
    if action.starts_with("package_") {
        let dataset_id = object.get("id").cloned().unwrap_or(Value::Null);
        if let Some(Value::Array(resources)) = object.get_mut("resources") {
            for resource in resources.iter_mut().filter_map(Value::as_object_mut) {
                assign_resource_ids(resource, &dataset_id);
            }
        }
    }
    Value::Object(object)
}

fn assign_resource_ids(resource: &mut Map<String, Value>, dataset_id: &Value) {
    let name = resource
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unnamed")
        .to_string();
    let _ = resource
        .entry("id")
        .or_insert_with(|| Value::String(format!("id-{name}")));
    let _ = resource.insert("package_id".to_string(), dataset_id.clone());
}
