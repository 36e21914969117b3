// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Entity base shared by datasets and resources
//!
//! [`EntityCore`] holds an entity's metadata (`data`), the snapshot taken
//! when it was last loaded (`old_data`), and the configuration used for
//! remote calls. Datasets and resources embed one and layer their own
//! behaviour on top.

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::merge::{Metadata, merge_maps};
use diagnostics::*;
use serde_json::Value;
use std::path::Path;

/// Kinds of remote object the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Dataset,
    Resource,
    User,
    Organization,
    Location,
}

/// Operations an entity kind may support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Show,
    Update,
    Create,
    Delete,
    Search,
    List,
    All,
    Hxl,
    Patch,
    DatastoreDelete,
    DatastoreCreate,
    DatastoreInsert,
    DatastoreUpsert,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Dataset => "dataset",
            Kind::Resource => "resource",
            Kind::User => "user",
            Kind::Organization => "organization",
            Kind::Location => "location",
        }
    }

    /// Remote action name for `action` on this kind
    pub fn action(self, action: Action) -> Result<&'static str> {
        let name = match (self, action) {
            (Kind::Dataset, Action::Show) => "package_show",
            (Kind::Dataset, Action::Update) => "package_update",
            (Kind::Dataset, Action::Create) => "package_create",
            (Kind::Dataset, Action::Delete) => "package_delete",
            (Kind::Dataset, Action::Search) => "package_search",
            (Kind::Dataset, Action::List) => "package_list",
            (Kind::Dataset, Action::All) => "current_package_list_with_resources",
            (Kind::Dataset, Action::Hxl) => "package_hxl_update",
            (Kind::Resource, Action::Show) => "resource_show",
            (Kind::Resource, Action::Update) => "resource_update",
            (Kind::Resource, Action::Create) => "resource_create",
            (Kind::Resource, Action::Delete) => "resource_delete",
            (Kind::Resource, Action::Search) => "resource_search",
            (Kind::Resource, Action::Patch) => "resource_patch",
            (Kind::Resource, Action::DatastoreDelete) => "datastore_delete",
            (Kind::Resource, Action::DatastoreCreate) => "datastore_create",
            (Kind::Resource, Action::DatastoreInsert) => "datastore_insert",
            (Kind::Resource, Action::DatastoreUpsert) => "datastore_upsert",
            (Kind::User, Action::Show) => "user_show",
            (Kind::Organization, Action::Show) => "organization_show",
            (Kind::Location, Action::List) => "group_list",
            _ => {
                return Err(Error::UnsupportedAction {
                    kind: self.name().to_string(),
                    action: format!("{action:?}"),
                });
            }
        };
        Ok(name)
    }
}

#[derive(Debug, Clone)]
pub struct EntityCore {
    kind: Kind,
    configuration: Configuration,
    data: Metadata,
    old_data: Metadata,
}

impl EntityCore {
    pub fn new(kind: Kind, configuration: Configuration, data: Metadata) -> Self {
        Self {
            kind,
            configuration,
            data,
            old_data: Metadata::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn data(&self) -> &Metadata {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Metadata {
        &mut self.data
    }

    /// Metadata as it was before the last load or save
    pub fn old_data(&self) -> &Metadata {
        &self.old_data
    }

    pub(crate) fn old_data_mut(&mut self) -> &mut Metadata {
        &mut self.old_data
    }

    pub(crate) fn replace_data(&mut self, data: Metadata) {
        self.old_data = std::mem::replace(&mut self.data, data);
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Printable form of `data[field]` for messages
    pub fn key_display(&self, field: &str) -> String {
        match self.data.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        }
    }

    /// Call `action` with `{field: value}` plus `extra`. A not-found reply
    /// yields `Ok(None)`; any other failure is an error.
    pub fn read(
        &self,
        value: &str,
        field: &str,
        action: Action,
        extra: Option<&Metadata>,
    ) -> Result<Option<Value>> {
        if field.is_empty() {
            return Err(Error::validation(format!(
                "Empty {} field name!",
                self.kind.name()
            )));
        }
        let name = self.kind.action(action)?;
        let mut payload = Metadata::new();
        let _ = payload.insert(field.to_string(), Value::String(value.to_string()));
        if let Some(extra) = extra {
            payload.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        match self
            .configuration
            .call_remote(name, &Value::Object(payload), None)
        {
            Ok(result) => Ok(Some(result)),
            Err(e) if e.is_not_found() => {
                debug!("{field}={value}: not found");
                Ok(None)
            }
            Err(source) => Err(Error::Read {
                field: field.to_string(),
                value: value.to_string(),
                source,
            }),
        }
    }

    /// Load by id or name. On success the previous `data` moves into
    /// `old_data`; returns false when the remote object does not exist.
    pub fn load(&mut self, identifier: &str) -> Result<bool> {
        match self.read(identifier, "id", Action::Show, None)? {
            Some(Value::Object(result)) => {
                self.replace_data(result);
                Ok(true)
            }
            Some(other) => Err(Error::validation(format!(
                "Unexpected {} returned for {identifier}: {other}",
                self.kind.name()
            ))),
            None => Ok(false),
        }
    }

    /// Fail with every required field of `schema` absent from `data`
    pub fn check_required_fields(&self, schema: &str, ignore_fields: &[&str]) -> Result<()> {
        let missing: Vec<String> = self
            .configuration
            .required_fields(schema)?
            .into_iter()
            .filter(|f| !self.data.contains_key(f) && !ignore_fields.contains(&f.as_str()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingFields {
                kind: schema.to_string(),
                fields: missing,
            })
        }
    }

    /// Guard before updating: `data[field]` must be present and non-empty
    pub fn check_existing_object(&self, field: &str) -> Result<()> {
        if self.data.is_empty() {
            return Err(Error::NoData {
                kind: self.kind.name().to_string(),
            });
        }
        match self.data.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(_) => return Ok(()),
        }
        Err(Error::MissingKey {
            kind: self.kind.name().to_string(),
            field: field.to_string(),
        })
    }

    /// Send `payload` with `action`; errors name the action and `key`
    pub fn write(
        &self,
        action: Action,
        payload: &Value,
        key: &str,
        upload: Option<&Path>,
    ) -> Result<Value> {
        let name = self.kind.action(action)?;
        self.configuration
            .call_remote(name, payload, upload)
            .map_err(|source| Error::Action {
                action: name.to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// Send the current `data` and adopt the returned representation
    pub fn save(&mut self, action: Action, key_field: &str, upload: Option<&Path>) -> Result<()> {
        let key = self.key_display(key_field);
        let payload = Value::Object(self.data.clone());
        if let Value::Object(result) = self.write(action, &payload, &key, upload)? {
            self.replace_data(result);
        }
        Ok(())
    }

    /// Delete remotely; `data[key_field]` must be present
    pub fn delete(&mut self, key_field: &str) -> Result<()> {
        if !self.data.contains_key(key_field) {
            return Err(Error::MissingKey {
                kind: self.kind.name().to_string(),
                field: key_field.to_string(),
            });
        }
        self.save(Action::Delete, key_field, None)
    }

    /// Fold what the caller had before the last load over the loaded state
    pub(crate) fn merge_previous(&mut self) {
        merge_maps(&mut self.data, &self.old_data);
    }

    pub fn update_from_yaml<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_yaml_ng::from_str(&text)?;
        self.update_from_value(value)
    }

    pub fn update_from_json<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        self.update_from_value(value)
    }

    fn update_from_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Object(map) => {
                merge_maps(&mut self.data, &map);
                Ok(())
            }
            _ => Err(Error::validation(format!(
                "Static {} metadata must be a mapping!",
                self.kind.name()
            ))),
        }
    }

    // Comma-separated string lists (field_names, file_types)

    pub fn stringlist_from_commastring(&self, field: &str) -> Vec<String> {
        match self.get_str(field) {
            Some(s) if !s.is_empty() => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn add_string_to_commastring(&mut self, field: &str, value: &str) -> bool {
        let mut values = self.stringlist_from_commastring(field);
        if values.iter().any(|v| v == value) {
            return false;
        }
        values.push(value.to_string());
        let _ = self
            .data
            .insert(field.to_string(), Value::String(values.join(",")));
        true
    }

    pub fn add_strings_to_commastring(&mut self, field: &str, values: &[&str]) -> bool {
        values
            .iter()
            .fold(true, |all, v| self.add_string_to_commastring(field, v) && all)
    }

    pub fn remove_string_from_commastring(&mut self, field: &str, value: &str) -> bool {
        let mut values = self.stringlist_from_commastring(field);
        let before = values.len();
        values.retain(|v| v != value);
        if values.len() == before {
            return false;
        }
        let _ = self
            .data
            .insert(field.to_string(), Value::String(values.join(",")));
        true
    }

    // Lists of `{name: ...}` objects (tags, groups)

    pub fn named_values(&self, field: &str) -> Vec<String> {
        self.data
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn add_named_value(&mut self, field: &str, name: &str) -> bool {
        if self.named_values(field).iter().any(|n| n == name) {
            return false;
        }
        let entry = self
            .data
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            items.push(serde_json::json!({ "name": name }));
        }
        true
    }

    pub fn remove_named_value(&mut self, field: &str, name: &str) -> bool {
        let Some(Value::Array(items)) = self.data.get_mut(field) else {
            return false;
        };
        let position = items
            .iter()
            .position(|item| item.get("name").and_then(Value::as_str) == Some(name));
        match position {
            Some(index) => {
                let _ = items.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_gateway::MemoryGateway;
    use serde_json::json;
    use std::rc::Rc;

    fn core(data: Value) -> (Rc<MemoryGateway>, EntityCore) {
        let gateway = Rc::new(MemoryGateway::new());
        let config = Configuration::builder()
            .hdx_key("key")
            .build_with_gateway(gateway.clone())
            .unwrap();
        let data = data.as_object().cloned().unwrap_or_default();
        (gateway, EntityCore::new(Kind::Dataset, config, data))
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Kind::Dataset.action(Action::All).unwrap(), "current_package_list_with_resources");
        assert_eq!(Kind::Resource.action(Action::Patch).unwrap(), "resource_patch");
        assert!(Kind::User.action(Action::Delete).is_err());
    }

    #[test]
    fn test_load_moves_previous_data() {
        let (gateway, mut core) = core(json!({"name": "local"}));
        gateway.respond("package_show", json!({"name": "remote", "id": "1"}));
        assert!(core.load("local").unwrap());
        assert_eq!(core.get_str("name"), Some("remote"));
        assert_eq!(core.old_data().get("name"), Some(&json!("local")));
    }

    #[test]
    fn test_load_not_found_is_false() {
        let (gateway, mut core) = core(json!({"name": "local"}));
        gateway.not_found("package_show");
        assert!(!core.load("local").unwrap());
        assert_eq!(core.get_str("name"), Some("local"));
        assert!(core.old_data().is_empty());
    }

    #[test]
    fn test_load_transport_error_is_loud() {
        let (gateway, mut core) = core(json!({"name": "local"}));
        gateway.fail("package_show", "boom");
        let err = core.load("local").unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_required_fields_listed() {
        let (_gateway, core) = core(json!({"name": "n", "title": "t"}));
        match core.check_required_fields("dataset", &["private"]) {
            Err(Error::MissingFields { kind, fields }) => {
                assert_eq!(kind, "dataset");
                assert!(fields.contains(&"notes".to_string()));
                assert!(!fields.contains(&"private".to_string()));
                assert!(!fields.contains(&"name".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_check_existing_object() {
        let (_gateway, core) = core(json!({"name": "n", "id": ""}));
        assert!(core.check_existing_object("name").is_ok());
        assert!(matches!(
            core.check_existing_object("id"),
            Err(Error::MissingKey { .. })
        ));
        let (_gateway, empty) = self::core(json!({}));
        assert!(matches!(empty.check_existing_object("id"), Err(Error::NoData { .. })));
    }

    #[test]
    fn test_save_failure_names_action_and_key() {
        let (gateway, mut core) = core(json!({"name": "n", "id": "abc"}));
        gateway.fail("package_update", "nope");
        let err = core.save(Action::Update, "id", None).unwrap_err();
        assert_eq!(err.to_string(), "Failed when trying to package_update abc! (POST)");
    }

    #[test]
    fn test_commastring_helpers() {
        let (_gateway, mut core) = core(json!({}));
        assert!(core.stringlist_from_commastring("field_names").is_empty());
        assert!(core.add_string_to_commastring("field_names", "a"));
        assert!(!core.add_string_to_commastring("field_names", "a"));
        assert!(!core.add_strings_to_commastring("field_names", &["b", "a"]));
        assert_eq!(core.get_str("field_names"), Some("a,b"));
        assert!(core.remove_string_from_commastring("field_names", "a"));
        assert!(!core.remove_string_from_commastring("field_names", "z"));
        assert_eq!(core.get_str("field_names"), Some("b"));
    }

    #[test]
    fn test_named_values() {
        let (_gateway, mut core) = core(json!({}));
        assert!(core.add_named_value("tags", "health"));
        assert!(!core.add_named_value("tags", "health"));
        assert!(core.add_named_value("tags", "food"));
        assert_eq!(core.named_values("tags"), vec!["health", "food"]);
        assert!(core.remove_named_value("tags", "health"));
        assert!(!core.remove_named_value("tags", "health"));
        assert_eq!(core.data()["tags"], json!([{"name": "food"}]));
    }
}
