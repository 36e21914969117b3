// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::common::{dataset_json, load_dataset_file, pretty};
use anyhow::Result;
use diagnostics::*;
use hdx::Configuration;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Create, or update when the dataset already exists
    Create { allow_no_resources: bool },
    /// Update only; fails when the dataset does not exist
    Update { update_resources: bool },
}

/// Save the dataset described in `path` and print what the catalog returned
pub fn save_command<F>(
    configuration: &Configuration,
    path: &Path,
    mode: SaveMode,
    mut handler: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let mut dataset = load_dataset_file(configuration, path)?;
    let name = dataset.name().unwrap_or_default().to_string();
    match mode {
        SaveMode::Create { allow_no_resources } => {
            info!("Creating dataset {name}");
            dataset.create_in_hdx(allow_no_resources)?;
        }
        SaveMode::Update { update_resources } => {
            info!("Updating dataset {name}");
            dataset.update_in_hdx(update_resources)?;
        }
    }
    handler(&pretty(&dataset_json(&dataset))?);
    Ok(())
}
