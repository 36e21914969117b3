// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Resources: single files or API endpoints attached to a dataset

use crate::configuration::Configuration;
use crate::dataset::Dataset;
use crate::entity::{Action, EntityCore, Kind};
use crate::error::{Error, Result};
use crate::keyed::Keyed;
use crate::merge::{Metadata, merge_maps};
use diagnostics::*;
use serde_json::Value;
use std::path::{Path, PathBuf};

const RESOURCE_SCHEMA: &str = "resource";
const UPLOAD_URL_PLACEHOLDER: &str = "ignore";

#[derive(Debug, Clone)]
pub struct Resource {
    core: EntityCore,
    file_to_upload: Option<PathBuf>,
}

/// Optional arguments to [`Resource::search_in_hdx`]
#[derive(Debug, Clone, Default)]
pub struct ResourceSearch {
    pub order_by: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Resource {
    pub fn new(configuration: &Configuration, data: Metadata) -> Self {
        Self {
            core: EntityCore::new(Kind::Resource, configuration.clone(), data),
            file_to_upload: None,
        }
    }

    /// Build from a JSON object, as found in a dataset's `resources` array
    pub fn from_value(configuration: &Configuration, value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self::new(configuration, data)),
            other => Err(Error::validation(format!(
                "Resource metadata must be an object, got {other}"
            ))),
        }
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn data(&self) -> &Metadata {
        self.core.data()
    }

    pub fn data_mut(&mut self) -> &mut Metadata {
        self.core.data_mut()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.core.data().get(field)
    }

    pub fn set<V: Into<Value>>(&mut self, field: &str, value: V) {
        let _ = self.core.data_mut().insert(field.to_string(), value.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.core.get_str("name")
    }

    pub fn id(&self) -> Option<&str> {
        self.core.get_str("id")
    }

    pub fn configuration(&self) -> &Configuration {
        self.core.configuration()
    }

    pub fn update_from_yaml<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.core.update_from_yaml(path)
    }

    pub fn update_from_json<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.core.update_from_json(path)
    }

    pub fn read_from_hdx(configuration: &Configuration, identifier: &str) -> Result<Option<Self>> {
        let mut resource = Self::new(configuration, Metadata::new());
        if resource.core.load(identifier)? {
            Ok(Some(resource))
        } else {
            Ok(None)
        }
    }

    pub fn get_file_type(&self) -> Option<&str> {
        self.core.get_str("format")
    }

    pub fn set_file_type(&mut self, file_type: &str) {
        self.set("format", file_type.to_lowercase());
    }

    pub fn get_file_to_upload(&self) -> Option<&Path> {
        self.file_to_upload.as_deref()
    }

    pub fn set_file_to_upload<P: AsRef<Path>>(&mut self, path: P) {
        self.file_to_upload = Some(path.as_ref().to_path_buf());
    }

    /// Validate, filling in `resource_type`/`url_type` from how the
    /// content is supplied. Running it twice changes nothing further.
    pub fn check_required_fields(&mut self, ignore_fields: &[&str]) -> Result<()> {
        let data = self.core.data_mut();
        if self.file_to_upload.is_some() {
            let _ = data.insert("url".to_string(), UPLOAD_URL_PLACEHOLDER.into());
            let _ = data.insert("resource_type".to_string(), "file.upload".into());
            let _ = data.insert("url_type".to_string(), "upload".into());
            let _ = data.remove("tracking_summary");
        } else if data.contains_key("url") {
            let _ = data
                .entry("resource_type")
                .or_insert_with(|| Value::String("api".to_string()));
            let _ = data
                .entry("url_type")
                .or_insert_with(|| Value::String("api".to_string()));
        } else {
            return Err(Error::validation(
                "Either a url or a file to upload must be supplied!",
            ));
        }
        self.core.check_required_fields(RESOURCE_SCHEMA, ignore_fields)
    }

    /// Update the remote copy found by `id`, uploading any pending file
    pub fn update_in_hdx(&mut self) -> Result<()> {
        self.core.check_existing_object("id")?;
        let id = self.core.key_display("id");
        if !self.core.load(&id)? {
            return Err(Error::no_existing(Kind::Resource.name(), "update"));
        }
        self.merge_update()
    }

    /// Update when `id` resolves remotely, otherwise create
    pub fn create_in_hdx(&mut self) -> Result<()> {
        self.check_required_fields(&[])?;
        if let Some(id) = self.id().map(str::to_string) {
            if self.core.load(&id)? {
                warn!("Resource exists. Updating {id}");
                return self.merge_update();
            }
        }
        let upload = self.file_to_upload.clone();
        self.core.save(Action::Create, "name", upload.as_deref())?;
        self.file_to_upload = None;
        Ok(())
    }

    fn merge_update(&mut self) -> Result<()> {
        self.core.merge_previous();
        self.check_required_fields(&[])?;
        let upload = self.file_to_upload.clone();
        self.core.save(Action::Update, "id", upload.as_deref())?;
        self.file_to_upload = None;
        Ok(())
    }

    pub fn delete_from_hdx(&mut self) -> Result<()> {
        self.core.delete("id")
    }

    /// The dataset this resource belongs to
    pub fn get_dataset(&self) -> Result<Option<Dataset>> {
        let package_id = self
            .core
            .get_str("package_id")
            .ok_or_else(|| Error::validation("Resource has no package id!"))?;
        Dataset::read_from_hdx(self.configuration(), package_id)
    }

    /// Search resources (does not search dataset metadata)
    pub fn search_in_hdx(
        configuration: &Configuration,
        query: &str,
        options: &ResourceSearch,
    ) -> Result<Vec<Self>> {
        let probe = Self::new(configuration, Metadata::new());
        let mut extra = Metadata::new();
        if let Some(order_by) = &options.order_by {
            let _ = extra.insert("order_by".to_string(), order_by.clone().into());
        }
        if let Some(offset) = options.offset {
            let _ = extra.insert("offset".to_string(), offset.into());
        }
        if let Some(limit) = options.limit {
            let _ = extra.insert("limit".to_string(), limit.into());
        }
        let Some(result) = probe
            .core
            .read(query, "query", Action::Search, Some(&extra))?
        else {
            return Ok(Vec::new());
        };
        let count = result.get("count").and_then(Value::as_u64).unwrap_or(0);
        if count == 0 {
            return Ok(Vec::new());
        }
        result
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|record| Self::from_value(configuration, record.clone()))
            .collect()
    }

    /// Ask the catalog to refresh this resource's modification time
    pub fn touch(&self) -> Result<()> {
        self.core.check_existing_object("id")?;
        let id = self.core.key_display("id");
        let _ = self.core.read(&id, "id", Action::Patch, None)?;
        Ok(())
    }

    /// Fetch `url` into `folder` (or the temp dir). Returns the URL and the
    /// path written.
    pub fn download(&self, folder: Option<&Path>) -> Result<(String, PathBuf)> {
        let url = match self.core.get_str("url") {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(Error::validation("No URL to download!")),
        };
        debug!("Downloading {url}");
        let parsed = url::Url::parse(&url)
            .map_err(|e| Error::validation(format!("Invalid resource url {url}: {e}")))?;
        let filename = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("download")
            .to_string();
        let directory = folder.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let path = directory.join(filename);

        let mut response = reqwest::blocking::get(parsed)?.error_for_status()?;
        let mut file = std::fs::File::create(&path)?;
        let _ = response.copy_to(&mut file)?;
        Ok((url, path))
    }

    pub(crate) fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

impl Keyed for Resource {
    fn key(&self) -> Option<&str> {
        self.name()
    }

    fn absorb(&mut self, other: Self) {
        merge_maps(self.core.data_mut(), other.core.data());
        if other.file_to_upload.is_some() {
            self.file_to_upload = other.file_to_upload;
        }
    }

    fn snapshot(&self) -> Metadata {
        self.core.data().clone()
    }
}
