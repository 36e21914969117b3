// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use clap::Args;
use hdx::{Configuration, Dataset};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Connection options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct HdxContext {
    /// Site name from the configuration (prod, stage, test, ...)
    #[arg(long, global = true)]
    pub site: Option<String>,

    /// HDX configuration file (YAML or JSON) replacing the built-in one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project configuration file merged over the HDX configuration
    #[arg(long, global = true)]
    pub project_config: Option<PathBuf>,

    /// API key
    #[arg(long, env = "HDX_KEY", global = true, hide_env_values = true)]
    pub key: Option<String>,

    /// File holding the API key
    #[arg(long, global = true)]
    pub key_file: Option<PathBuf>,

    /// Never send the API key
    #[arg(long, global = true)]
    pub read_only: bool,
}

impl HdxContext {
    /// Configuration talking to the selected site over HTTP
    pub fn configuration(&self) -> Result<Configuration> {
        let mut builder = Configuration::builder().read_only(self.read_only);
        if let Some(site) = &self.site {
            builder = builder.hdx_site(site.clone());
        }
        if let Some(key) = &self.key {
            builder = builder.hdx_key(key.clone());
        }
        if let Some(path) = &self.key_file {
            builder = builder.hdx_key_file(path);
        }
        if let Some(path) = &self.config {
            builder = if is_json(path) {
                builder.hdx_config_json(path)
            } else {
                builder.hdx_config_yaml(path)
            };
        }
        if let Some(path) = &self.project_config {
            builder = if is_json(path) {
                builder.project_config_json(path)
            } else {
                builder.project_config_yaml(path)
            };
        }
        Ok(builder.build()?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Dataset metadata with its resources folded back under `resources`
pub fn dataset_json(dataset: &Dataset) -> Value {
    let mut data = dataset.data().clone();
    let _ = data.insert("resources".to_string(), dataset.get_resources().to_json());
    Value::Object(data)
}

/// A local dataset described by a YAML or JSON file
pub fn load_dataset_file(configuration: &Configuration, path: &Path) -> Result<Dataset> {
    let mut dataset = Dataset::new(configuration);
    if is_json(path) {
        dataset.update_from_json(path)?;
    } else {
        dataset.update_from_yaml(path)?;
    }
    if dataset.name().is_none() {
        return Err(anyhow!("{} does not name a dataset", path.display()));
    }
    Ok(dataset)
}

pub fn pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
