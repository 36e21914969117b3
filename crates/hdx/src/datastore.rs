// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Datastore ingestion for tabular resources
//!
//! Pushes the rows of a CSV file into the catalog's preview datastore. Rows
//! are sent in chunks; a downloaded copy of the file lives in a temporary
//! directory that is removed however the upload ends.

use crate::entity::Action;
use crate::error::{Error, Result};
use crate::merge::Metadata;
use crate::resource::Resource;
use diagnostics::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;

const CHUNK_SIZE: usize = 100;

/// Whether to drop an existing datastore before creating it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteFirst {
    No,
    Yes,
    IfNoPrimaryKey,
}

impl TryFrom<i64> for DeleteFirst {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(DeleteFirst::No),
            1 => Ok(DeleteFirst::Yes),
            2 => Ok(DeleteFirst::IfNoPrimaryKey),
            _ => Err(Error::validation(
                "delete_first must be 0, 1 or 2! (0 = No, 1 = Yes, 2 = Delete if no primary key)",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl DatastoreField {
    pub fn text<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            field_type: "text".to_string(),
        }
    }
}

/// Field list and optional primary key, as kept in schema files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatastoreSchema {
    pub schema: Vec<DatastoreField>,
    #[serde(default)]
    pub primary_key: Option<String>,
}

impl DatastoreSchema {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml_ng::from_str(&text)?)
    }

    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Resource {
    fn datastore_id(&self) -> Result<String> {
        self.core().check_existing_object("id")?;
        Ok(self.core().key_display("id"))
    }

    pub fn delete_datastore(&self) -> Result<()> {
        let id = self.datastore_id()?;
        let mut extra = Metadata::new();
        let _ = extra.insert("force".to_string(), Value::Bool(true));
        if self
            .core()
            .read(&id, "resource_id", Action::DatastoreDelete, Some(&extra))?
            .is_none()
        {
            debug!("No datastore to delete for {id}");
        }
        Ok(())
    }

    /// Load a CSV into the datastore. Without a schema every named column is
    /// text. Without `path` the resource's url is downloaded first.
    pub fn create_datastore(
        &self,
        schema: Option<Vec<DatastoreField>>,
        primary_key: Option<&str>,
        delete_first: DeleteFirst,
        path: Option<&Path>,
    ) -> Result<()> {
        match delete_first {
            DeleteFirst::No => {}
            DeleteFirst::Yes => self.delete_datastore()?,
            DeleteFirst::IfNoPrimaryKey => {
                if primary_key.is_none() {
                    self.delete_datastore()?;
                }
            }
        }

        // Held until the end of this function so the download is removed on every path
        let mut _download_dir = None;
        let (url, path) = match path {
            Some(path) => match self.core().get_str("url") {
                Some(url) if !url.is_empty() => (url.to_string(), path.to_path_buf()),
                _ => return Err(Error::validation("No URL to download!")),
            },
            None => {
                let dir = tempfile::tempdir()?;
                let downloaded = self.download(Some(dir.path()))?;
                _download_dir = Some(dir);
                downloaded
            }
        };

        self.upload_rows(&url, &path, schema, primary_key)
            .map_err(|e| Error::Datastore {
                url,
                source: Box::new(e),
            })
    }

    fn upload_rows(
        &self,
        url: &str,
        path: &Path,
        schema: Option<Vec<DatastoreField>>,
        primary_key: Option<&str>,
    ) -> Result<()> {
        let id = self.datastore_id()?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        // Columns without a header name carry no field and are dropped
        let columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (i, name.to_string()))
            .collect();
        let fields = schema.unwrap_or_else(|| {
            columns
                .iter()
                .map(|(_, name)| DatastoreField::text(name.clone()))
                .collect()
        });

        let create = json!({
            "resource_id": id,
            "force": true,
            "fields": fields,
            "primary_key": primary_key,
        });
        let _ = self
            .core()
            .write(Action::DatastoreCreate, &create, &id, None)?;

        let method = if primary_key.is_some() { "upsert" } else { "insert" };
        debug!("Uploading data from {url} to datastore");
        let mut offset = 0;
        let mut chunk = Vec::with_capacity(CHUNK_SIZE);
        for record in reader.records() {
            let record = record?;
            let row: Metadata = columns
                .iter()
                .map(|(i, name)| {
                    let value = record.get(*i).unwrap_or_default();
                    (name.clone(), Value::String(value.to_string()))
                })
                .collect();
            chunk.push(Value::Object(row));
            if chunk.len() == CHUNK_SIZE {
                self.upsert_chunk(&id, method, std::mem::take(&mut chunk))?;
                debug!("Uploading: {offset}");
                offset += CHUNK_SIZE;
            }
        }
        if !chunk.is_empty() {
            self.upsert_chunk(&id, method, chunk)?;
            debug!("Uploading: {offset}");
        }
        Ok(())
    }

    fn upsert_chunk(&self, id: &str, method: &str, records: Vec<Value>) -> Result<()> {
        let payload = json!({
            "resource_id": id,
            "force": true,
            "method": method,
            "records": records,
        });
        let _ = self
            .core()
            .write(Action::DatastoreUpsert, &payload, id, None)?;
        Ok(())
    }

    pub fn create_datastore_from_schema(
        &self,
        schema: DatastoreSchema,
        delete_first: DeleteFirst,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore(
            Some(schema.schema),
            schema.primary_key.as_deref(),
            delete_first,
            path,
        )
    }

    pub fn create_datastore_from_yaml_schema<P: AsRef<Path>>(
        &self,
        yaml_path: P,
        delete_first: DeleteFirst,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore_from_schema(DatastoreSchema::from_yaml(yaml_path)?, delete_first, path)
    }

    pub fn create_datastore_from_json_schema<P: AsRef<Path>>(
        &self,
        json_path: P,
        delete_first: DeleteFirst,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore_from_schema(DatastoreSchema::from_json(json_path)?, delete_first, path)
    }

    pub fn update_datastore(
        &self,
        schema: Option<Vec<DatastoreField>>,
        primary_key: Option<&str>,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore(schema, primary_key, DeleteFirst::IfNoPrimaryKey, path)
    }

    pub fn update_datastore_from_schema(
        &self,
        schema: DatastoreSchema,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore_from_schema(schema, DeleteFirst::IfNoPrimaryKey, path)
    }

    pub fn update_datastore_from_yaml_schema<P: AsRef<Path>>(
        &self,
        yaml_path: P,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore_from_yaml_schema(yaml_path, DeleteFirst::IfNoPrimaryKey, path)
    }

    pub fn update_datastore_from_json_schema<P: AsRef<Path>>(
        &self,
        json_path: P,
        path: Option<&Path>,
    ) -> Result<()> {
        self.create_datastore_from_json_schema(json_path, DeleteFirst::IfNoPrimaryKey, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::memory_gateway::MemoryGateway;
    use std::fmt::Write as _;
    use std::rc::Rc;

    fn setup() -> (Rc<MemoryGateway>, Resource) {
        let gateway = Rc::new(MemoryGateway::new());
        let config = Configuration::builder()
            .hdx_key("key")
            .build_with_gateway(gateway.clone())
            .unwrap();
        let resource = Resource::from_value(
            &config,
            json!({"id": "r1", "name": "data.csv", "url": "http://x/data.csv"}),
        )
        .unwrap();
        (gateway, resource)
    }

    fn csv_file(dir: &Path, rows: usize) -> std::path::PathBuf {
        let mut text = String::from("code,,value\n");
        for i in 0..rows {
            writeln!(text, "c{i},skip,{i}").unwrap();
        }
        let path = dir.join("data.csv");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_delete_first_values() {
        assert_eq!(DeleteFirst::try_from(2).unwrap(), DeleteFirst::IfNoPrimaryKey);
        assert!(DeleteFirst::try_from(3).unwrap_err().to_string().starts_with("delete_first must be 0, 1 or 2!"));
    }

    #[test]
    fn test_rows_chunked_with_text_schema() {
        let (gateway, resource) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), 250);

        resource
            .create_datastore(None, None, DeleteFirst::No, Some(&path))
            .unwrap();

        assert_eq!(
            gateway.actions(),
            vec!["datastore_create", "datastore_upsert", "datastore_upsert", "datastore_upsert"]
        );
        let create = &gateway.calls_for("datastore_create")[0].payload;
        assert_eq!(
            create["fields"],
            json!([{"id": "code", "type": "text"}, {"id": "value", "type": "text"}])
        );
        assert_eq!(create["primary_key"], Value::Null);

        let chunks = gateway.calls_for("datastore_upsert");
        assert_eq!(chunks[0].payload["method"], "insert");
        assert_eq!(chunks[0].payload["records"].as_array().unwrap().len(), 100);
        assert_eq!(chunks[2].payload["records"].as_array().unwrap().len(), 50);
        assert_eq!(chunks[2].payload["records"][49], json!({"code": "c249", "value": "249"}));
    }

    #[test]
    fn test_delete_first_and_upsert_with_primary_key() {
        let (gateway, resource) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), 3);
        let schema = DatastoreSchema {
            schema: vec![
                DatastoreField::text("code"),
                DatastoreField {
                    id: "value".to_string(),
                    field_type: "int".to_string(),
                },
            ],
            primary_key: Some("code".to_string()),
        };

        resource
            .create_datastore_from_schema(schema, DeleteFirst::Yes, Some(&path))
            .unwrap();
        assert_eq!(
            gateway.actions(),
            vec!["datastore_delete", "datastore_create", "datastore_upsert"]
        );
        assert_eq!(
            gateway.calls_for("datastore_delete")[0].payload,
            json!({"resource_id": "r1", "force": true})
        );
        assert_eq!(gateway.calls_for("datastore_upsert")[0].payload["method"], "upsert");
    }

    #[test]
    fn test_update_skips_delete_with_primary_key() {
        let (gateway, resource) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), 1);
        resource
            .update_datastore(None, Some("code"), Some(&path))
            .unwrap();
        assert!(gateway.calls_for("datastore_delete").is_empty());
    }

    #[test]
    fn test_failure_wrapped_with_url() {
        let (gateway, resource) = setup();
        gateway.fail("datastore_create", "broken");
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), 1);
        let err = resource
            .create_datastore(None, None, DeleteFirst::No, Some(&path))
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload to datastore of http://x/data.csv failed!");
        assert!(matches!(err, Error::Datastore { .. }));
    }

    #[test]
    fn test_schema_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yml");
        std::fs::write(
            &path,
            "schema:\n  - id: code\n    type: text\n  - id: value\n    type: float\nprimary_key: code\n",
        )
        .unwrap();
        let schema = DatastoreSchema::from_yaml(&path).unwrap();
        assert_eq!(schema.schema.len(), 2);
        assert_eq!(schema.schema[1].field_type, "float");
        assert_eq!(schema.primary_key.as_deref(), Some("code"));
    }
}
