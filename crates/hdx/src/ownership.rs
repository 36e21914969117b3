// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Dataset maintainer and owning organization

use crate::dataset::Dataset;
use crate::entity::{EntityCore, Kind};
use crate::error::{Error, Result};
use crate::merge::Metadata;
use serde_json::Value;

const MAINTAINER_FIELD: &str = "maintainer";
const ORGANIZATION_FIELD: &str = "owner_org";

/// A user or organization given either by id or by record
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Id(String),
    /// A record; one without an `id` is looked up by its `name`
    Record(Metadata),
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

impl From<String> for Reference {
    fn from(id: String) -> Self {
        Reference::Id(id)
    }
}

impl From<Metadata> for Reference {
    fn from(record: Metadata) -> Self {
        Reference::Record(record)
    }
}

fn looks_like_id(value: &str) -> bool {
    value.parse::<uuid7::Uuid>().is_ok()
}

impl Dataset {
    fn resolve(&self, kind: Kind, reference: Reference) -> Result<String> {
        let record = match reference {
            Reference::Id(id) => return Ok(id),
            Reference::Record(record) => record,
        };
        if let Some(id) = record.get("id").and_then(Value::as_str) {
            return Ok(id.to_string());
        }
        let Some(name) = record.get("name").and_then(Value::as_str) else {
            return Err(Error::MissingKey {
                kind: kind.name().to_string(),
                field: "id".to_string(),
            });
        };
        let mut entity = EntityCore::new(kind, self.configuration().clone(), Metadata::new());
        if !entity.load(name)? {
            return Err(Error::validation(format!(
                "{} {name} does not exist in HDX!",
                kind.name()
            )));
        }
        entity
            .get_str("id")
            .map(str::to_string)
            .ok_or_else(|| Error::MissingKey {
                kind: kind.name().to_string(),
                field: "id".to_string(),
            })
    }

    /// Set the maintainer from a user id, or from a user record looked up by name
    pub fn set_maintainer<R: Into<Reference>>(&mut self, maintainer: R) -> Result<()> {
        let id = self.resolve(Kind::User, maintainer.into())?;
        if !looks_like_id(&id) {
            return Err(Error::validation(format!(
                "Maintainer {id} does not look like a user id!"
            )));
        }
        self.set_field_value(MAINTAINER_FIELD, id.into());
        Ok(())
    }

    /// The maintainer's user record, if one is set
    pub fn get_maintainer(&self) -> Result<Option<Metadata>> {
        self.fetch(Kind::User, MAINTAINER_FIELD)
    }

    /// Set the owning organization; the `hdx` organization is accepted by name
    pub fn set_organization<R: Into<Reference>>(&mut self, organization: R) -> Result<()> {
        let id = self.resolve(Kind::Organization, organization.into())?;
        if id != "hdx" && !looks_like_id(&id) {
            return Err(Error::validation(format!(
                "Organization {id} does not look like an organization id!"
            )));
        }
        self.set_field_value(ORGANIZATION_FIELD, id.into());
        Ok(())
    }

    pub fn get_organization(&self) -> Result<Option<Metadata>> {
        self.fetch(Kind::Organization, ORGANIZATION_FIELD)
    }

    fn fetch(&self, kind: Kind, field: &str) -> Result<Option<Metadata>> {
        let Some(id) = self.core().get_str(field).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let mut entity = EntityCore::new(kind, self.configuration().clone(), Metadata::new());
        if entity.load(id)? {
            Ok(Some(entity.data().clone()))
        } else {
            Ok(None)
        }
    }
}
