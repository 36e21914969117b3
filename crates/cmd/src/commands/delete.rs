// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use diagnostics::*;
use hdx::{Configuration, Dataset};

pub fn delete_command<F>(configuration: &Configuration, id_or_name: &str, mut handler: F) -> Result<()>
where
    F: FnMut(&str),
{
    let mut dataset = Dataset::read_from_hdx(configuration, id_or_name)?
        .ok_or_else(|| anyhow!("Dataset {id_or_name} not found"))?;
    dataset.delete_from_hdx()?;
    info!("Deleted dataset {id_or_name}");
    handler(&format!("Deleted {id_or_name}"));
    Ok(())
}
