// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Catalog configuration
//!
//! A [`Configuration`] is built once by the application and handed to every
//! entity it creates. It carries the merged settings (site URLs, required
//! field lists, project values) and the gateway used for remote calls.

use crate::ckan::CkanGateway;
use crate::error::{Error, Result};
use crate::gateway::{Gateway, GatewayError};
use crate::merge::{Metadata, merge_maps};
use diagnostics::*;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const DEFAULT_CONFIGURATION: &str = include_str!("hdx_configuration.yml");
const DEFAULT_SITE: &str = "test";
const DEFAULT_KEY_FILE: &str = ".hdxkey";

/// Where a block of settings comes from
#[derive(Debug, Clone)]
pub enum Source {
    Dict(Metadata),
    Json(PathBuf),
    Yaml(PathBuf),
}

#[derive(Clone)]
pub struct Configuration {
    inner: Rc<Inner>,
}

struct Inner {
    settings: Metadata,
    hdx_site: String,
    read_only: bool,
    api_key: Option<String>,
    gateway: Rc<dyn Gateway>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("hdx_site", &self.inner.hdx_site)
            .field("read_only", &self.inner.read_only)
            .finish_non_exhaustive()
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Site name, e.g. `prod` or `test`
    pub fn hdx_site(&self) -> &str {
        &self.inner.hdx_site
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// API key, or `None` in read-only mode
    pub fn api_key(&self) -> Option<&str> {
        if self.inner.read_only {
            return None;
        }
        self.inner.api_key.as_deref()
    }

    pub fn site_url(&self) -> Result<&str> {
        site_url(&self.inner.settings, &self.inner.hdx_site)
    }

    /// Raw settings value (HDX and project configuration merged)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.settings.get(key)
    }

    /// Required field names for an entity schema (`dataset`,
    /// `dataset-requestable`, `resource`, ...)
    pub fn required_fields(&self, kind: &str) -> Result<Vec<String>> {
        let fields = self
            .inner
            .settings
            .get(kind)
            .and_then(|v| v.get("required_fields"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::Configuration(format!("No required fields defined for {kind}!"))
            })?;
        Ok(fields
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    pub fn gateway(&self) -> Rc<dyn Gateway> {
        self.inner.gateway.clone()
    }

    pub(crate) fn call_remote(
        &self,
        action: &str,
        payload: &Value,
        upload: Option<&Path>,
    ) -> std::result::Result<Value, GatewayError> {
        debug!("Calling remote action {action}");
        self.inner.gateway.call_action(action, payload, upload)
    }
}

fn site_url<'a>(settings: &'a Metadata, site: &str) -> Result<&'a str> {
    let key = format!("hdx_{site}_site");
    settings
        .get(&key)
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Configuration(format!("{key} not defined in configuration!")))
}

/// Options mirroring the keyword arguments of the configuration loader
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    hdx_site: Option<String>,
    read_only: bool,
    hdx_key: Option<String>,
    hdx_key_file: Option<PathBuf>,
    hdx_sources: Vec<Source>,
    project_sources: Vec<Source>,
}

impl ConfigurationBuilder {
    pub fn hdx_site<S: Into<String>>(mut self, site: S) -> Self {
        self.hdx_site = Some(site.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn hdx_key<S: Into<String>>(mut self, key: S) -> Self {
        self.hdx_key = Some(key.into());
        self
    }

    pub fn hdx_key_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.hdx_key_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn hdx_config(mut self, source: Source) -> Self {
        self.hdx_sources.push(source);
        self
    }

    pub fn hdx_config_dict(self, dict: Metadata) -> Self {
        self.hdx_config(Source::Dict(dict))
    }

    pub fn hdx_config_json<P: AsRef<Path>>(self, path: P) -> Self {
        self.hdx_config(Source::Json(path.as_ref().to_path_buf()))
    }

    pub fn hdx_config_yaml<P: AsRef<Path>>(self, path: P) -> Self {
        self.hdx_config(Source::Yaml(path.as_ref().to_path_buf()))
    }

    pub fn project_config(mut self, source: Source) -> Self {
        self.project_sources.push(source);
        self
    }

    pub fn project_config_dict(self, dict: Metadata) -> Self {
        self.project_config(Source::Dict(dict))
    }

    pub fn project_config_json<P: AsRef<Path>>(self, path: P) -> Self {
        self.project_config(Source::Json(path.as_ref().to_path_buf()))
    }

    pub fn project_config_yaml<P: AsRef<Path>>(self, path: P) -> Self {
        self.project_config(Source::Yaml(path.as_ref().to_path_buf()))
    }

    /// Build with the HTTP gateway for the configured site
    pub fn build(self) -> Result<Configuration> {
        let (settings, hdx_site, api_key) = self.resolve()?;
        let url = site_url(&settings, &hdx_site)?.to_string();
        let key = if self.read_only { None } else { api_key.clone() };
        let gateway = CkanGateway::new(url, key).map_err(|e| {
            Error::Configuration(format!("Failed to create remote gateway: {e}"))
        })?;
        Ok(self.assemble(settings, hdx_site, api_key, Rc::new(gateway)))
    }

    /// Build around an existing gateway
    pub fn build_with_gateway(self, gateway: Rc<dyn Gateway>) -> Result<Configuration> {
        let (settings, hdx_site, api_key) = self.resolve()?;
        Ok(self.assemble(settings, hdx_site, api_key, gateway))
    }

    fn assemble(
        &self,
        settings: Metadata,
        hdx_site: String,
        api_key: Option<String>,
        gateway: Rc<dyn Gateway>,
    ) -> Configuration {
        Configuration {
            inner: Rc::new(Inner {
                settings,
                hdx_site,
                read_only: self.read_only,
                api_key,
                gateway,
            }),
        }
    }

    fn resolve(&self) -> Result<(Metadata, String, Option<String>)> {
        if self.hdx_sources.len() > 1 {
            return Err(Error::Configuration(
                "More than one HDX configuration given!".to_string(),
            ));
        }
        if self.project_sources.len() > 1 {
            return Err(Error::Configuration(
                "More than one project configuration given!".to_string(),
            ));
        }

        let mut settings = match self.hdx_sources.first() {
            Some(source) => load_source(source, "HDX")?,
            None => {
                info!("No HDX configuration parameter. Using default.");
                as_object(serde_yaml_ng::from_str(DEFAULT_CONFIGURATION)?, "default")?
            }
        };
        if let Some(source) = self.project_sources.first() {
            let project = load_source(source, "project")?;
            merge_maps(&mut settings, &project);
        }

        let hdx_site = self
            .hdx_site
            .clone()
            .unwrap_or_else(|| DEFAULT_SITE.to_string());
        let _ = site_url(&settings, &hdx_site)?;

        let api_key = if self.read_only {
            None
        } else if let Some(key) = &self.hdx_key {
            Some(key.clone())
        } else {
            let path = match &self.hdx_key_file {
                Some(path) => path.clone(),
                None => {
                    info!("No HDX key or key file given. Using default key file path.");
                    default_key_file()?
                }
            };
            Some(load_api_key(&path)?)
        };

        Ok((settings, hdx_site, api_key))
    }
}

fn load_source(source: &Source, label: &str) -> Result<Metadata> {
    match source {
        Source::Dict(dict) => {
            info!("Loading {label} configuration from dictionary");
            Ok(dict.clone())
        }
        Source::Json(path) => {
            let shown = path.display().to_string();
            info!("Loading {label} configuration from: {shown}");
            let text = std::fs::read_to_string(path)?;
            as_object(serde_json::from_str(&text)?, &shown)
        }
        Source::Yaml(path) => {
            let shown = path.display().to_string();
            info!("Loading {label} configuration from: {shown}");
            let text = std::fs::read_to_string(path)?;
            as_object(serde_yaml_ng::from_str(&text)?, &shown)
        }
    }
}

fn as_object(value: Value, origin: &str) -> Result<Metadata> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Metadata::new()),
        _ => Err(Error::Configuration(format!(
            "Configuration from {origin} is not a mapping!"
        ))),
    }
}

fn default_key_file() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::Configuration("HOME is not set; cannot locate HDX key file".to_string()))?;
    Ok(PathBuf::from(home).join(DEFAULT_KEY_FILE))
}

/// Read an API key from a file, ignoring surrounding whitespace
pub fn load_api_key(path: &Path) -> Result<String> {
    let shown = path.display().to_string();
    info!("Loading HDX api key from: {shown}");
    let key = std::fs::read_to_string(path)
        .map_err(|e| Error::Configuration(format!("Failed to read HDX key file {shown}: {e}")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::Configuration(format!("HDX key file {shown} is empty!")));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_gateway::MemoryGateway;
    use serde_json::json;
    use std::io::Write;

    fn gateway() -> Rc<dyn Gateway> {
        Rc::new(MemoryGateway::new())
    }

    #[test]
    fn test_default_configuration() {
        let config = Configuration::builder()
            .hdx_key("12345")
            .build_with_gateway(gateway())
            .unwrap();
        assert_eq!(config.hdx_site(), "test");
        assert_eq!(config.site_url().unwrap(), "https://test-data.humdata.org");
        assert_eq!(config.api_key(), Some("12345"));
        let fields = config.required_fields("resource").unwrap();
        assert!(fields.contains(&"url_type".to_string()));
    }

    #[test]
    fn test_read_only_has_no_key() {
        let config = Configuration::builder()
            .read_only(true)
            .hdx_site("prod")
            .build_with_gateway(gateway())
            .unwrap();
        assert_eq!(config.api_key(), None);
        assert_eq!(config.site_url().unwrap(), "https://data.humdata.org");
    }

    #[test]
    fn test_unknown_site() {
        let err = Configuration::builder()
            .read_only(true)
            .hdx_site("nowhere")
            .build_with_gateway(gateway())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: hdx_nowhere_site not defined in configuration!"
        );
    }

    #[test]
    fn test_more_than_one_source() {
        let dict = json!({"hdx_test_site": {"url": "http://x"}});
        let dict = dict.as_object().cloned().unwrap_or_default();
        let err = Configuration::builder()
            .read_only(true)
            .hdx_config_dict(dict)
            .hdx_config_yaml("/nonexistent.yml")
            .build_with_gateway(gateway())
            .unwrap_err();
        assert!(err.to_string().contains("More than one HDX configuration given!"));
    }

    #[test]
    fn test_project_config_merged_over_hdx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "hdx_test_site:\n  url: \"http://local\"\nmy_param: 7").unwrap();

        let config = Configuration::builder()
            .read_only(true)
            .project_config_yaml(&path)
            .build_with_gateway(gateway())
            .unwrap();
        assert_eq!(config.site_url().unwrap(), "http://local");
        assert_eq!(config.get("my_param"), Some(&json!(7)));
        assert!(config.required_fields("dataset").is_ok());
    }

    #[test]
    fn test_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".hdxkey");
        std::fs::write(&path, "  abcdef\n").unwrap();
        let config = Configuration::builder()
            .hdx_key_file(&path)
            .build_with_gateway(gateway())
            .unwrap();
        assert_eq!(config.api_key(), Some("abcdef"));

        let missing = Configuration::builder()
            .hdx_key_file(dir.path().join("missing"))
            .build_with_gateway(gateway());
        assert!(missing.is_err());
    }
}
