// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Expected update frequency vocabulary
//!
//! The catalog stores a day count as a string (`"30"`); people write labels
//! (`"Every month"`) or aliases (`"monthly"`). Label lookups ignore case.

use crate::dataset::Dataset;
use crate::error::{Error, Result};

const FREQUENCY_FIELD: &str = "data_update_frequency";

/// Code and canonical label
const FREQUENCIES: &[(&str, &str)] = &[
    ("-2", "Adhoc"),
    ("-1", "Never"),
    ("0", "Live"),
    ("1", "Every day"),
    ("7", "Every week"),
    ("14", "Every two weeks"),
    ("30", "Every month"),
    ("90", "Every three months"),
    ("180", "Every six months"),
    ("365", "Every year"),
];

/// Alternative spellings mapping to a code
const ALIASES: &[(&str, &str)] = &[
    ("daily", "1"),
    ("weekly", "7"),
    ("fortnightly", "14"),
    ("every other week", "14"),
    ("monthly", "30"),
    ("quarterly", "90"),
    ("semiannually", "180"),
    ("semiyearly", "180"),
    ("annually", "365"),
    ("yearly", "365"),
];

/// Code for a label or alias, label for a code, `None` if unknown
pub fn transform_update_frequency(frequency: &str) -> Option<&'static str> {
    let wanted = frequency.trim().to_lowercase();
    FREQUENCIES
        .iter()
        .find_map(|(code, label)| {
            if *code == wanted {
                Some(*label)
            } else if label.to_lowercase() == wanted {
                Some(*code)
            } else {
                None
            }
        })
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == wanted)
                .map(|(_, code)| *code)
        })
}

impl Dataset {
    /// Update frequency as a label
    pub fn get_expected_update_frequency(&self) -> Option<&'static str> {
        self.core()
            .get_str(FREQUENCY_FIELD)
            .filter(|days| !days.is_empty())
            .and_then(transform_update_frequency)
    }

    /// Accepts a code, label or alias; stores the code
    pub fn set_expected_update_frequency(&mut self, frequency: &str) -> Result<()> {
        let code = if frequency.trim().parse::<i64>().is_ok() {
            transform_update_frequency(frequency).map(|_| frequency.trim())
        } else {
            transform_update_frequency(frequency)
        };
        let code = code
            .ok_or_else(|| Error::validation("Invalid update frequency supplied!"))?
            .to_string();
        self.set_field_value(FREQUENCY_FIELD, code.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::memory_gateway::MemoryGateway;
    use serde_json::json;
    use std::rc::Rc;

    #[test]
    fn test_transform_both_ways() {
        assert_eq!(transform_update_frequency("Every month"), Some("30"));
        assert_eq!(transform_update_frequency("30"), Some("Every month"));
        assert_eq!(transform_update_frequency("EVERY MONTH"), Some("30"));
        assert_eq!(transform_update_frequency("monthly"), Some("30"));
        assert_eq!(transform_update_frequency("-2"), Some("Adhoc"));
        assert_eq!(transform_update_frequency("sometimes"), None);
    }

    #[test]
    fn test_every_code_round_trips() {
        for (code, label) in FREQUENCIES {
            assert_eq!(transform_update_frequency(label), Some(*code));
            assert_eq!(transform_update_frequency(code), Some(*label));
        }
    }

    #[test]
    fn test_dataset_frequency() {
        let config = Configuration::builder()
            .read_only(true)
            .build_with_gateway(Rc::new(MemoryGateway::new()))
            .unwrap();
        let mut ds = Dataset::new(&config);
        assert_eq!(ds.get_expected_update_frequency(), None);

        ds.set_expected_update_frequency("Every week").unwrap();
        assert_eq!(ds.get("data_update_frequency"), Some(&json!("7")));
        assert_eq!(ds.get_expected_update_frequency(), Some("Every week"));

        ds.set_expected_update_frequency("365").unwrap();
        assert_eq!(ds.get_expected_update_frequency(), Some("Every year"));

        assert!(ds.set_expected_update_frequency("42").is_err());
        assert!(ds.set_expected_update_frequency("whenever").is_err());
        assert_eq!(ds.get("data_update_frequency"), Some(&json!("365")));
    }
}
