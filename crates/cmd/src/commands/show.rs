// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::common::{dataset_json, pretty};
use anyhow::{Result, anyhow};
use diagnostics::*;
use hdx::{Configuration, Dataset};
use serde_json::{Value, json};

fn fetch(configuration: &Configuration, id_or_name: &str) -> Result<Dataset> {
    debug!("Reading dataset {id_or_name}");
    Dataset::read_from_hdx(configuration, id_or_name)?
        .ok_or_else(|| anyhow!("Dataset {id_or_name} not found"))
}

/// Print a dataset with its resources as JSON
pub fn show_command<F>(configuration: &Configuration, id_or_name: &str, mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let dataset = fetch(configuration, id_or_name)?;
    handler(&pretty(&dataset_json(&dataset))?);
    Ok(())
}

/// Print one summary object per resource
pub fn resources_command<F>(
    configuration: &Configuration,
    id_or_name: &str,
    mut handler: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let dataset = fetch(configuration, id_or_name)?;
    let summary: Vec<Value> = dataset
        .get_resources()
        .iter()
        .map(|r| {
            json!({
                "name": r.name(),
                "id": r.id(),
                "format": r.get_file_type(),
                "url": r.get("url"),
            })
        })
        .collect();
    handler(&pretty(&Value::Array(summary))?);
    Ok(())
}
