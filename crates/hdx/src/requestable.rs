// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Metadata for requestable datasets
//!
//! A requestable dataset has no resources. It describes what could be
//! provided on request through comma separated `field_names` and
//! `file_types`. The list helpers refuse to touch normal datasets.

use crate::dataset::Dataset;
use crate::error::{Error, Result};

const REQUESTABLE_FLAG: &str = "is_requestdata_type";
const FIELD_NAMES: &str = "field_names";
const FILE_TYPES: &str = "file_types";

impl Dataset {
    /// Mark the dataset requestable or not. Requestable datasets are public.
    pub fn set_requestable(&mut self, requestable: bool) {
        self.set_field_value(REQUESTABLE_FLAG, requestable.into());
        if requestable {
            self.set_field_value("private", false.into());
        }
    }

    fn require_requestable(&self, operation: &str) -> Result<()> {
        if self.is_requestable() {
            Ok(())
        } else {
            Err(Error::not_requestable(operation))
        }
    }

    pub fn get_fieldnames(&self) -> Result<Vec<String>> {
        self.require_requestable("get_fieldnames")?;
        Ok(self.core().stringlist_from_commastring(FIELD_NAMES))
    }

    /// Returns false if already present
    pub fn add_fieldname(&mut self, fieldname: &str) -> Result<bool> {
        self.require_requestable("add_fieldname")?;
        Ok(self.core_mut().add_string_to_commastring(FIELD_NAMES, fieldname))
    }

    /// Returns false if any was already present
    pub fn add_fieldnames(&mut self, fieldnames: &[&str]) -> Result<bool> {
        self.require_requestable("add_fieldnames")?;
        Ok(self.core_mut().add_strings_to_commastring(FIELD_NAMES, fieldnames))
    }

    pub fn remove_fieldname(&mut self, fieldname: &str) -> Result<bool> {
        self.require_requestable("remove_fieldname")?;
        Ok(self
            .core_mut()
            .remove_string_from_commastring(FIELD_NAMES, fieldname))
    }

    /// Declared file types, or the formats of the resources of a normal dataset
    pub fn get_filetypes(&self) -> Vec<String> {
        if self.is_requestable() {
            self.core().stringlist_from_commastring(FILE_TYPES)
        } else {
            self.get_resources()
                .iter()
                .filter_map(|r| r.get_file_type())
                .map(str::to_string)
                .collect()
        }
    }

    pub fn add_filetype(&mut self, filetype: &str) -> Result<bool> {
        self.require_requestable("add_filetype")?;
        Ok(self.core_mut().add_string_to_commastring(FILE_TYPES, filetype))
    }

    pub fn add_filetypes(&mut self, filetypes: &[&str]) -> Result<bool> {
        self.require_requestable("add_filetypes")?;
        Ok(self.core_mut().add_strings_to_commastring(FILE_TYPES, filetypes))
    }

    pub fn remove_filetype(&mut self, filetype: &str) -> Result<bool> {
        self.require_requestable("remove_filetype")?;
        Ok(self
            .core_mut()
            .remove_string_from_commastring(FILE_TYPES, filetype))
    }
}
