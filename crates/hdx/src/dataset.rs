// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Datasets and their create/update choreography
//!
//! A [`Dataset`] keeps its resources as a separate keyed list. They are
//! written into `data["resources"]` only for the duration of a save and
//! separated out again from what the catalog returns.
//!
//! Saving follows the same shape for create and update:
//!
//! 1. validate (cascading into resources),
//! 2. probe for a remote copy by `id`, then by `name`,
//! 3. merge local values over the remote copy, or create,
//! 4. save dataset metadata with resources embedded,
//! 5. upload pending resource files one by one, now that ids exist,
//! 6. ask the catalog to refresh HXL metadata.

use crate::configuration::Configuration;
use crate::entity::{Action, EntityCore, Kind};
use crate::error::{Error, Result};
use crate::keyed::{ItemMut, KeyedList};
use crate::merge::{Metadata, merge_maps};
use crate::resource::Resource;
use diagnostics::*;
use serde_json::Value;
use std::path::Path;

const DATASET_SCHEMA: &str = "dataset";
const REQUESTABLE_SCHEMA: &str = "dataset-requestable";
const RESOURCES_FIELD: &str = "resources";
const TAGS_FIELD: &str = "tags";
const RESOURCE_IGNORE_FIELDS: &[&str] = &["package_id"];

/// Ways to name a resource when adding it to a dataset
#[derive(Debug, Clone)]
pub enum ResourceInput {
    /// Read from the catalog by id
    Id(String),
    Data(Metadata),
    Resource(Resource),
}

impl From<Resource> for ResourceInput {
    fn from(resource: Resource) -> Self {
        ResourceInput::Resource(resource)
    }
}

impl From<Metadata> for ResourceInput {
    fn from(data: Metadata) -> Self {
        ResourceInput::Data(data)
    }
}

impl From<&str> for ResourceInput {
    fn from(id: &str) -> Self {
        ResourceInput::Id(id.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    core: EntityCore,
    resources: KeyedList<Resource>,
    /// Local resources set aside by the last load, waiting to be merged
    previous_resources: KeyedList<Resource>,
}

impl Dataset {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            core: EntityCore::new(Kind::Dataset, configuration.clone(), Metadata::new()),
            resources: KeyedList::new(),
            previous_resources: KeyedList::new(),
        }
    }

    /// Build from metadata; a `resources` array becomes the resource list
    pub fn with_data(configuration: &Configuration, data: Metadata) -> Result<Self> {
        let mut dataset = Self::new(configuration);
        *dataset.core.data_mut() = data;
        dataset.separate_resources()?;
        Ok(dataset)
    }

    pub fn from_value(configuration: &Configuration, value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Self::with_data(configuration, data),
            other => Err(Error::validation(format!(
                "Dataset metadata must be an object, got {other}"
            ))),
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn configuration(&self) -> &Configuration {
        self.core.configuration()
    }

    pub fn data(&self) -> &Metadata {
        self.core.data()
    }

    pub fn old_data(&self) -> &Metadata {
        self.core.old_data()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.core.data().get(field)
    }

    pub fn name(&self) -> Option<&str> {
        self.core.get_str("name")
    }

    pub fn id(&self) -> Option<&str> {
        self.core.get_str("id")
    }

    /// Set a metadata field. `resources` is routed into the resource list.
    pub fn set_field<V: Into<Value>>(&mut self, field: &str, value: V) -> Result<()> {
        let value = value.into();
        if field == RESOURCES_FIELD {
            return self.add_update_resources(resource_inputs(value)?, true);
        }
        self.set_field_value(field, value);
        Ok(())
    }

    pub(crate) fn set_field_value(&mut self, field: &str, value: Value) {
        let _ = self.core.data_mut().insert(field.to_string(), value);
    }

    pub fn remove_field(&mut self, field: &str) -> Option<Value> {
        self.core.data_mut().remove(field)
    }

    pub fn update_from_yaml<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.core.update_from_yaml(path)?;
        self.separate_resources()
    }

    pub fn update_from_json<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.core.update_from_json(path)?;
        self.separate_resources()
    }

    pub fn read_from_hdx(configuration: &Configuration, identifier: &str) -> Result<Option<Self>> {
        let mut dataset = Self::new(configuration);
        if dataset.load_from_hdx(identifier)? {
            Ok(Some(dataset))
        } else {
            Ok(None)
        }
    }

    /// Wrap a record returned by search or listing, as if freshly loaded
    pub(crate) fn from_record(configuration: &Configuration, record: Value) -> Result<Self> {
        let mut dataset = Self::from_value(configuration, record)?;
        dataset.core.old_data_mut().clear();
        dataset.previous_resources.clear();
        Ok(dataset)
    }

    pub fn get_resources(&self) -> &KeyedList<Resource> {
        &self.resources
    }

    pub fn get_resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Mutable access to a resource; renaming it keeps lookups by name working
    pub fn get_resource_mut(&mut self, name: &str) -> Option<ItemMut<'_, Resource>> {
        self.resources.get_mut(name)
    }

    /// Add a resource, or merge it onto the one with the same name. A
    /// resource that already belongs to a dataset is refused unless
    /// `ignore_dataset_id` is set.
    pub fn add_update_resource<R: Into<ResourceInput>>(
        &mut self,
        resource: R,
        ignore_dataset_id: bool,
    ) -> Result<()> {
        let resource = match resource.into() {
            ResourceInput::Id(id) => Resource::read_from_hdx(self.configuration(), &id)?
                .ok_or_else(|| Error::validation(format!("Resource {id} cannot be found!")))?,
            ResourceInput::Data(data) => Resource::new(self.configuration(), data),
            ResourceInput::Resource(resource) => resource,
        };
        if resource.data().contains_key("package_id") && !ignore_dataset_id {
            return Err(Error::validation(format!(
                "Resource {} being added already has a dataset id!",
                resource.core().key_display("name")
            )));
        }
        let _ = self.resources.add_or_update(resource)?;
        Ok(())
    }

    pub fn add_update_resources<I, R>(&mut self, resources: I, ignore_dataset_id: bool) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceInput>,
    {
        for resource in resources {
            self.add_update_resource(resource, ignore_dataset_id)?;
        }
        Ok(())
    }

    /// Remove a resource given by name or id and delete it remotely.
    /// Returns false if the dataset has no such resource.
    pub fn delete_resource(&mut self, name_or_id: &str) -> Result<bool> {
        let name = self
            .resources
            .iter()
            .find(|r| r.name() == Some(name_or_id) || r.id() == Some(name_or_id))
            .and_then(Resource::name)
            .map(str::to_string);
        let Some(mut resource) = name.and_then(|name| self.resources.remove(&name)) else {
            return Ok(false);
        };
        if resource.id().is_some() {
            resource.delete_from_hdx()?;
        }
        Ok(true)
    }

    /// Move `data["resources"]` into the resource list
    pub fn separate_resources(&mut self) -> Result<()> {
        match self.core.data_mut().remove(RESOURCES_FIELD) {
            None | Some(Value::Null) => Ok(()),
            Some(value) => self.add_update_resources(resource_inputs(value)?, true),
        }
    }

    /// Load by id or name. Local resources are set aside (and snapshotted
    /// into `old_data`) for the merge; the resource list becomes the remote one.
    fn load_from_hdx(&mut self, id_or_name: &str) -> Result<bool> {
        if !self.core.load(id_or_name)? {
            return Ok(false);
        }
        for resource in self.resources.take() {
            let _ = self.previous_resources.add_or_update(resource)?;
        }
        if !self.previous_resources.is_empty() {
            let snapshot = self.previous_resources.to_json();
            let _ = self
                .core
                .old_data_mut()
                .insert(RESOURCES_FIELD.to_string(), snapshot);
        }
        self.separate_resources()?;
        Ok(true)
    }

    /// Try `id` first; failure there is only a warning since ids go stale
    /// across sites. Then try `name`.
    fn probe_existing(&mut self) -> Result<Option<String>> {
        if let Some(id) = self.id().map(str::to_string) {
            match self.load_from_hdx(&id) {
                Ok(true) => return Ok(Some(id)),
                Ok(false) => warn!("Failed to load dataset with id {id}"),
                Err(e) => {
                    let message = e.to_string();
                    warn!("Failed to load dataset with id {id}: {message}");
                }
            }
        }
        if let Some(name) = self.name().map(str::to_string) {
            if self.load_by_name(&name)? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Load by name. Any local `id` did not resolve, so the remote one wins.
    fn load_by_name(&mut self, name: &str) -> Result<bool> {
        if !self.load_from_hdx(name)? {
            return Ok(false);
        }
        let _ = self.core.old_data_mut().remove("id");
        Ok(true)
    }

    pub fn is_requestable(&self) -> bool {
        self.get("is_requestdata_type")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Validate the dataset and, for normal datasets, every resource
    pub fn check_required_fields(
        &mut self,
        ignore_fields: &[&str],
        allow_no_resources: bool,
    ) -> Result<()> {
        if self.is_requestable() {
            return self
                .core
                .check_required_fields(REQUESTABLE_SCHEMA, ignore_fields);
        }
        self.core.check_required_fields(DATASET_SCHEMA, ignore_fields)?;
        if self.resources.is_empty() && !allow_no_resources {
            return Err(Error::validation(
                "There are no resources! Please add at least one resource!",
            ));
        }
        self.resources
            .try_for_each_mut(|resource| resource.check_required_fields(RESOURCE_IGNORE_FIELDS))
    }

    /// Update the existing remote dataset, found by `id` or else `name`
    pub fn update_in_hdx(&mut self, update_resources: bool) -> Result<()> {
        let mut loaded = false;
        if self.core.data().contains_key("id") {
            self.core.check_existing_object("id")?;
            let id = self.core.key_display("id");
            match self.load_from_hdx(&id) {
                Ok(true) => loaded = true,
                Ok(false) => warn!("Failed to load dataset with id {id}"),
                Err(e) => {
                    let message = e.to_string();
                    warn!("Failed to load dataset with id {id}: {message}");
                }
            }
        }
        if !loaded {
            self.core.check_existing_object("name")?;
            let name = self.core.key_display("name");
            if !self.load_by_name(&name)? {
                return Err(Error::no_existing(Kind::Dataset.name(), "update"));
            }
        }
        self.merge_update(update_resources)?;
        self.hxl_update()
    }

    /// Create the dataset, or update it if it already exists remotely
    pub fn create_in_hdx(&mut self, allow_no_resources: bool) -> Result<()> {
        self.check_required_fields(&[], allow_no_resources)?;
        if let Some(key) = self.probe_existing()? {
            warn!("Dataset exists. Updating {key}");
            self.merge_update(true)?;
            return self.hxl_update();
        }
        self.save_with_resources(Action::Create, "name")?;
        self.hxl_update()
    }

    /// Fold local state (now in `old_data` and `previous_resources`) over
    /// the freshly loaded remote copy and save it.
    fn merge_update(&mut self, update_resources: bool) -> Result<()> {
        self.core.merge_previous();
        let _ = self.core.data_mut().remove(RESOURCES_FIELD);

        let local = self.previous_resources.take();
        if update_resources && !local.is_empty() {
            for resource in local {
                if let Some(name) = resource.name().filter(|n| self.resources.contains(n)) {
                    warn!("Resource exists. Updating {name}");
                }
                let _ = self.resources.add_or_update(resource)?;
            }
            self.resources.try_for_each_mut(|resource| {
                resource.check_required_fields(RESOURCE_IGNORE_FIELDS)
            })?;
        }
        self.save_with_resources(Action::Update, "id")
    }

    /// Save with resources embedded, then upload pending files against the
    /// resource ids the catalog assigned
    fn save_with_resources(&mut self, action: Action, key_field: &str) -> Result<()> {
        let filestore: Vec<String> = self
            .resources
            .iter()
            .filter(|r| r.get_file_to_upload().is_some())
            .filter_map(|r| r.name().map(str::to_string))
            .collect();

        if !self.resources.is_empty() {
            let resources = self.resources.to_json();
            let _ = self
                .core
                .data_mut()
                .insert(RESOURCES_FIELD.to_string(), resources);
        }
        if let Err(e) = self.core.save(action, key_field, None) {
            let _ = self.core.data_mut().remove(RESOURCES_FIELD);
            return Err(e);
        }

        let uploaded = self.upload_pending(&filestore);
        self.resources.clear();
        self.previous_resources.clear();
        self.separate_resources()?;
        uploaded
    }

    /// Deferred file uploads: each resource picks up its saved
    /// representation, uploads through its own update, and the result is
    /// folded back into the dataset's returned resources
    fn upload_pending(&mut self, filestore: &[String]) -> Result<()> {
        for name in filestore {
            let Some(mut resource) = self.resources.get_mut(name) else {
                continue;
            };
            let returned = self
                .core
                .data_mut()
                .get_mut(RESOURCES_FIELD)
                .and_then(Value::as_array_mut)
                .and_then(|items| {
                    items
                        .iter_mut()
                        .find(|item| item.get("name").and_then(Value::as_str) == Some(name.as_str()))
                })
                .and_then(Value::as_object_mut);
            let Some(returned) = returned else {
                warn!("Resource {name} missing from saved dataset; upload skipped");
                continue;
            };
            merge_maps(resource.core_mut().data_mut(), returned);
            resource.update_in_hdx()?;
            merge_maps(returned, resource.data());
        }
        Ok(())
    }

    pub fn delete_from_hdx(&mut self) -> Result<()> {
        self.core.delete("id")
    }

    /// Ask the catalog to re-scan resources for HXL hashtags
    pub fn hxl_update(&self) -> Result<()> {
        self.core.check_existing_object("id")?;
        let id = self.core.key_display("id");
        let _ = self.core.read(&id, "id", Action::Hxl, None)?;
        Ok(())
    }

    pub fn get_tags(&self) -> Vec<String> {
        self.core.named_values(TAGS_FIELD)
    }

    /// Returns false if the tag was already present
    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.core.add_named_value(TAGS_FIELD, tag)
    }

    /// Returns false if any tag was already present
    pub fn add_tags(&mut self, tags: &[&str]) -> bool {
        tags.iter().fold(true, |all, tag| self.add_tag(tag) && all)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.core.remove_named_value(TAGS_FIELD, tag)
    }
}

fn resource_inputs(value: Value) -> Result<Vec<ResourceInput>> {
    let Value::Array(items) = value else {
        return Err(Error::validation("Resources should be a list!"));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(data) => Ok(ResourceInput::Data(data)),
            Value::String(id) => Ok(ResourceInput::Id(id)),
            other => Err(Error::validation(format!(
                "Type {other} cannot be added as a resource!"
            ))),
        })
        .collect()
}
