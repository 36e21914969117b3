// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Catalog locations (groups) and dataset location helpers

use crate::configuration::Configuration;
use crate::dataset::Dataset;
use crate::entity::{Action, EntityCore, Kind};
use crate::error::{Error, Result};
use crate::merge::Metadata;
use serde_json::{Value, json};

const GROUPS_FIELD: &str = "groups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Lower-case code used as the group name, e.g. `afg`
    pub code: String,
    pub title: String,
}

/// Valid locations, usually fetched once from the catalog
#[derive(Debug, Clone, Default)]
pub struct Locations {
    entries: Vec<Location>,
}

impl Locations {
    pub fn new(entries: Vec<Location>) -> Self {
        Self { entries }
    }

    /// Fetch the group list with titles
    pub fn from_hdx(configuration: &Configuration) -> Result<Self> {
        let core = EntityCore::new(Kind::Location, configuration.clone(), Metadata::new());
        let result = core.write(Action::List, &json!({"all_fields": true}), "all locations", None)?;
        let entries = result
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|group| {
                let code = group.get("name").and_then(Value::as_str)?;
                let title = group
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(code);
                Some(Location {
                    code: code.to_string(),
                    title: title.to_string(),
                })
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Location] {
        &self.entries
    }

    /// Title for a code, ignoring case
    pub fn get_location_from_code(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code))
            .map(|l| l.title.as_str())
    }

    /// Code for an exact code or title, ignoring case
    pub fn get_code_from_location(&self, location: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(location) || l.title.eq_ignore_ascii_case(location))
            .map(|l| l.code.as_str())
    }

    /// Code plus whether the match was exact. Falls back to a title that
    /// contains (or is contained in) `location`.
    pub fn get_code_from_location_partial(&self, location: &str) -> Option<(&str, bool)> {
        if let Some(code) = self.get_code_from_location(location) {
            return Some((code, true));
        }
        let wanted = location.to_lowercase();
        self.entries
            .iter()
            .find(|l| {
                let title = l.title.to_lowercase();
                title.contains(&wanted) || wanted.contains(&title)
            })
            .map(|l| (l.code.as_str(), false))
    }
}

impl Dataset {
    /// Titles of the dataset's locations; unknown codes are returned as is
    pub fn get_location(&self, locations: &Locations) -> Vec<String> {
        self.core()
            .named_values(GROUPS_FIELD)
            .into_iter()
            .map(|code| match locations.get_location_from_code(&code) {
                Some(title) => title.to_string(),
                None => code,
            })
            .collect()
    }

    /// Add a location matched against `locations`. Returns false when it is
    /// already present.
    pub fn add_other_location(
        &mut self,
        location: &str,
        exact: bool,
        alternative_error: Option<&str>,
        locations: &Locations,
    ) -> Result<bool> {
        let code = match locations.get_code_from_location_partial(location) {
            Some((code, matched)) if matched || !exact => code.to_lowercase(),
            _ => {
                return Err(Error::validation(alternative_error.map_or_else(
                    || format!("Location: {location} - cannot find in HDX!"),
                    str::to_string,
                )));
            }
        };
        Ok(self.core_mut().add_named_value(GROUPS_FIELD, &code))
    }

    /// Remove a location by code, trying it as given, upper and lower case
    pub fn remove_location(&mut self, location: &str) -> bool {
        let core = self.core_mut();
        core.remove_named_value(GROUPS_FIELD, location)
            || core.remove_named_value(GROUPS_FIELD, &location.to_uppercase())
            || core.remove_named_value(GROUPS_FIELD, &location.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_gateway::MemoryGateway;
    use std::rc::Rc;

    fn setup() -> (Rc<MemoryGateway>, Configuration) {
        let gateway = Rc::new(MemoryGateway::new());
        let config = Configuration::builder()
            .read_only(true)
            .build_with_gateway(gateway.clone())
            .unwrap();
        (gateway, config)
    }

    fn table() -> Locations {
        Locations::new(vec![
            Location {
                code: "afg".to_string(),
                title: "Afghanistan".to_string(),
            },
            Location {
                code: "cod".to_string(),
                title: "Democratic Republic of the Congo".to_string(),
            },
            Location {
                code: "world".to_string(),
                title: "World".to_string(),
            },
        ])
    }

    #[test]
    fn test_from_hdx() {
        let (gateway, config) = setup();
        gateway.respond(
            "group_list",
            json!([{"name": "afg", "title": "Afghanistan"}, {"name": "world"}]),
        );
        let locations = Locations::from_hdx(&config).unwrap();
        assert_eq!(locations.entries().len(), 2);
        assert_eq!(locations.get_location_from_code("AFG"), Some("Afghanistan"));
        assert_eq!(locations.get_location_from_code("world"), Some("world"));
        assert_eq!(gateway.calls()[0].payload, json!({"all_fields": true}));
    }

    #[test]
    fn test_matching() {
        let locations = table();
        assert_eq!(locations.get_code_from_location("afghanistan"), Some("afg"));
        assert_eq!(
            locations.get_code_from_location_partial("Congo"),
            Some(("cod", false))
        );
        assert_eq!(locations.get_code_from_location_partial("Mars"), None);
    }

    #[test]
    fn test_dataset_locations() {
        let (_gateway, config) = setup();
        let locations = table();
        let mut ds = Dataset::new(&config);
        assert!(ds.add_other_location("World", true, None, &locations).unwrap());
        assert!(!ds.add_other_location("world", true, None, &locations).unwrap());
        assert!(ds.add_other_location("Congo", true, None, &locations).is_err());
        assert!(ds.add_other_location("Congo", false, None, &locations).unwrap());
        let err = ds
            .add_other_location("Mars", true, Some("No such place"), &locations)
            .unwrap_err();
        assert_eq!(err.to_string(), "No such place");

        assert_eq!(
            ds.get_location(&locations),
            vec!["World", "Democratic Republic of the Congo"]
        );
        assert!(ds.remove_location("COD"));
        assert!(!ds.remove_location("cod"));
        assert_eq!(ds.get("groups"), Some(&json!([{"name": "world"}])));
    }
}
