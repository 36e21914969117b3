// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::common::{dataset_json, pretty};
use anyhow::Result;
use diagnostics::*;
use hdx::{Configuration, Dataset, ListOptions, SearchOptions};
use serde_json::Value;

/// Search datasets. Prints names unless `full` is set.
pub fn search_command<F>(
    configuration: &Configuration,
    query: Option<&str>,
    options: &SearchOptions,
    full: bool,
    mut handler: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let datasets = Dataset::search_in_hdx(configuration, query, options)?;
    let count = datasets.len();
    info!("Search matched {count} datasets");
    let output: Vec<Value> = if full {
        datasets.iter().map(dataset_json).collect()
    } else {
        datasets
            .iter()
            .filter_map(Dataset::name)
            .map(|n| Value::String(n.to_string()))
            .collect()
    };
    handler(&pretty(&Value::Array(output))?);
    Ok(())
}

pub fn names_command<F>(configuration: &Configuration, options: ListOptions, mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let names = Dataset::get_all_dataset_names(configuration, options)?;
    handler(&pretty(&Value::from(names))?);
    Ok(())
}
