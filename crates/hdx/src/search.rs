// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Paginated dataset search and listing
//!
//! The catalog gives no snapshot across pages, so each walk checks itself:
//! the reported total must not change between pages and no record may
//! appear twice. A walk that fails either check is thrown away and repeated,
//! up to [`MAX_ATTEMPTS`] walks in all.

use crate::configuration::Configuration;
use crate::dataset::Dataset;
use crate::entity::{Action, EntityCore, Kind};
use crate::error::{Error, Result};
use crate::merge::Metadata;
use crate::resource::Resource;
use backon::{BlockingRetryable, ConstantBuilder};
use diagnostics::*;
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

pub const PAGE_SIZE: usize = 1000;
pub const MAX_ATTEMPTS: usize = 5;
const RETRY_DELAY: Duration = Duration::from_millis(50);
const DEFAULT_QUERY: &str = "*:*";

/// Arguments to [`Dataset::search_in_hdx`]
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Filter query
    pub fq: Option<String>,
    pub sort: Option<String>,
    /// Total rows wanted; all matches when unset
    pub rows: Option<usize>,
    pub start: Option<usize>,
    /// Passed through to the search action as is
    pub extra: Metadata,
}

/// Arguments to [`Dataset::get_all_datasets`] and [`Dataset::get_all_dataset_names`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Repeat `walk` while it reports inconsistent results
fn with_consistency_retry<T>(what: &str, walk: impl FnMut() -> Result<T>) -> Result<T> {
    walk.retry(
        ConstantBuilder::default()
            .with_delay(RETRY_DELAY)
            .with_max_times(MAX_ATTEMPTS - 1),
    )
    .when(Error::is_inconsistent)
    .notify(|err: &Error, _: Duration| {
        let message = err.to_string();
        warn!("Repeating {what}: {message}");
    })
    .call()
    .map_err(|e| {
        if e.is_inconsistent() {
            Error::MaxAttempts(what.to_string())
        } else {
            e
        }
    })
}

/// Rows to request for `page`, zero once `total` is covered
fn page_rows(total: usize, page: usize) -> usize {
    total.saturating_sub(page * PAGE_SIZE).min(PAGE_SIZE)
}

fn records(result: Option<&Value>) -> &[Value] {
    result.and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

impl Dataset {
    /// Search datasets (Solr query syntax); `None` searches everything
    pub fn search_in_hdx(
        configuration: &Configuration,
        query: Option<&str>,
        options: &SearchOptions,
    ) -> Result<Vec<Dataset>> {
        let query = query.unwrap_or(DEFAULT_QUERY);
        with_consistency_retry("searching for datasets", || {
            search_pass(configuration, query, options)
        })
    }

    /// Every dataset with its resources, via the full-listing action
    pub fn get_all_datasets(
        configuration: &Configuration,
        options: ListOptions,
    ) -> Result<Vec<Dataset>> {
        with_consistency_retry("getting all datasets", || {
            listing_pass(configuration, options)
        })
    }

    pub fn get_all_dataset_names(
        configuration: &Configuration,
        options: ListOptions,
    ) -> Result<Vec<String>> {
        let core = EntityCore::new(Kind::Dataset, configuration.clone(), Metadata::new());
        let mut payload = Metadata::new();
        if let Some(limit) = options.limit {
            let _ = payload.insert("limit".to_string(), limit.into());
        }
        if let Some(offset) = options.offset {
            let _ = payload.insert("offset".to_string(), offset.into());
        }
        let result = core.write(
            Action::List,
            &Value::Object(payload),
            "all dataset names",
            None,
        )?;
        Ok(records(Some(&result))
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    /// Resources of all `datasets`, in order
    pub fn get_all_resources(datasets: &[Dataset]) -> Vec<Resource> {
        datasets
            .iter()
            .flat_map(|dataset| dataset.get_resources().iter().cloned())
            .collect()
    }
}

fn search_pass(
    configuration: &Configuration,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<Dataset>> {
    let core = EntityCore::new(Kind::Dataset, configuration.clone(), Metadata::new());
    let total = options.rows.unwrap_or(usize::MAX);
    let start = options.start.unwrap_or(0);

    let mut datasets = Vec::new();
    let mut counts = BTreeSet::new();
    for page in 0.. {
        let rows = page_rows(total, page);
        if rows == 0 {
            break;
        }
        let mut extra = options.extra.clone();
        if let Some(fq) = &options.fq {
            let _ = extra.insert("fq".to_string(), fq.clone().into());
        }
        if let Some(sort) = &options.sort {
            let _ = extra.insert("sort".to_string(), sort.clone().into());
        }
        let _ = extra.insert("rows".to_string(), rows.into());
        let _ = extra.insert("start".to_string(), (start + page * PAGE_SIZE).into());

        let Some(result) = core.read(query, "q", Action::Search, Some(&extra))? else {
            debug!("No search results for {query}");
            break;
        };
        let count = result.get("count").and_then(Value::as_u64).unwrap_or(0);
        if count == 0 {
            break;
        }
        let _ = counts.insert(count);
        let page_records = records(result.get("results"));
        for record in page_records {
            datasets.push(Dataset::from_record(configuration, record.clone())?);
        }
        if page_records.len() < rows {
            break;
        }
    }

    if counts.len() > 1 {
        let seen = counts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::InconsistentResults(format!(
            "search counts changed between pages ({seen})"
        )));
    }
    check_unique(&datasets, |d| d.id())?;
    Ok(datasets)
}

fn listing_pass(configuration: &Configuration, options: ListOptions) -> Result<Vec<Dataset>> {
    let core = EntityCore::new(Kind::Dataset, configuration.clone(), Metadata::new());
    let total = options.limit.unwrap_or(usize::MAX);
    let start = options.offset.unwrap_or(0);

    let mut datasets = Vec::new();
    for page in 0.. {
        let rows = page_rows(total, page);
        if rows == 0 {
            break;
        }
        let payload = json!({"limit": rows, "offset": start + page * PAGE_SIZE});
        let result = core.write(Action::All, &payload, "all datasets", None)?;
        let page_records = records(Some(&result));
        for record in page_records {
            datasets.push(Dataset::from_record(configuration, record.clone())?);
        }
        if page_records.len() < rows {
            break;
        }
    }
    check_unique(&datasets, |d| d.name())?;
    Ok(datasets)
}

fn check_unique<'a>(
    datasets: &'a [Dataset],
    key: impl Fn(&'a Dataset) -> Option<&'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for dataset in datasets {
        if let Some(key) = key(dataset) {
            if !seen.insert(key) {
                return Err(Error::InconsistentResults(format!(
                    "{key} returned more than once"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_gateway::{MemoryGateway, Response};
    use std::rc::Rc;

    fn setup() -> (Rc<MemoryGateway>, Configuration) {
        let gateway = Rc::new(MemoryGateway::new());
        let config = Configuration::builder()
            .read_only(true)
            .build_with_gateway(gateway.clone())
            .unwrap();
        (gateway, config)
    }

    fn page(count: u64, ids: std::ops::Range<usize>) -> Value {
        let results: Vec<Value> = ids
            .map(|i| json!({"id": format!("d{i}"), "name": format!("ds-{i}"),
                            "resources": [{"name": format!("r{i}")}]}))
            .collect();
        json!({"count": count, "results": results})
    }

    #[test]
    fn test_page_rows() {
        assert_eq!(page_rows(usize::MAX, 0), PAGE_SIZE);
        assert_eq!(page_rows(1500, 1), 500);
        assert_eq!(page_rows(1000, 1), 0);
    }

    #[test]
    fn test_single_page_search() {
        let (gateway, config) = setup();
        gateway.respond("package_search", page(3, 0..3));
        let options = SearchOptions {
            fq: Some("groups:afg".to_string()),
            ..Default::default()
        };
        let found = Dataset::search_in_hdx(&config, Some("health"), &options).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found[0].old_data().is_empty());
        assert!(found[0].get("resources").is_none());
        assert_eq!(found[0].get_resources().len(), 1);

        let call = &gateway.calls()[0].payload;
        assert_eq!(call["q"], "health");
        assert_eq!(call["fq"], "groups:afg");
        assert_eq!(call["rows"], 1000);
        assert_eq!(call["start"], 0);
    }

    #[test]
    fn test_rows_limit_spans_pages() {
        let (gateway, config) = setup();
        gateway.respond("package_search", page(5000, 0..1000));
        gateway.respond("package_search", page(5000, 1000..1200));
        let options = SearchOptions {
            rows: Some(1200),
            start: Some(10),
            ..Default::default()
        };
        let found = Dataset::search_in_hdx(&config, None, &options).unwrap();
        assert_eq!(found.len(), 1200);
        let calls = gateway.calls_for("package_search");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].payload["q"], "*:*");
        assert_eq!(calls[1].payload["rows"], 200);
        assert_eq!(calls[1].payload["start"], 1010);
    }

    #[test]
    fn test_duplicate_ids_retry_then_give_up() {
        let (gateway, config) = setup();
        let duplicated = json!({"count": 2, "results": [{"id": "x", "name": "a"}, {"id": "x", "name": "b"}]});
        gateway.set_default("package_search", Response::Ok(duplicated));
        let err = Dataset::search_in_hdx(&config, None, &SearchOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Maximum attempts reached for searching for datasets!");
        assert_eq!(gateway.calls_for("package_search").len(), MAX_ATTEMPTS);
    }

    #[test]
    fn test_not_found_ends_search() {
        let (gateway, config) = setup();
        gateway.set_default("package_search", Response::NotFound);
        let found = Dataset::search_in_hdx(&config, None, &SearchOptions::default()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_get_all_datasets() {
        let (gateway, config) = setup();
        gateway.respond(
            "current_package_list_with_resources",
            json!([{"id": "1", "name": "a"}, {"id": "2", "name": "b"}]),
        );
        let all = Dataset::get_all_datasets(
            &config,
            ListOptions {
                limit: Some(10),
                offset: None,
            },
        )
        .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(
            gateway.calls()[0].payload,
            json!({"limit": 10, "offset": 0})
        );
    }

    #[test]
    fn test_get_all_datasets_duplicate_names_retried() {
        let (gateway, config) = setup();
        gateway.respond(
            "current_package_list_with_resources",
            json!([{"name": "a"}, {"name": "a"}]),
        );
        gateway.respond(
            "current_package_list_with_resources",
            json!([{"name": "a"}, {"name": "b"}]),
        );
        let all = Dataset::get_all_datasets(&config, ListOptions::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[test]
    fn test_names_and_resources() {
        let (gateway, config) = setup();
        gateway.respond("package_list", json!(["a", "b"]));
        let names = Dataset::get_all_dataset_names(&config, ListOptions::default()).unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(gateway.calls()[0].payload, json!({}));

        gateway.respond("package_search", page(2, 0..2));
        let found = Dataset::search_in_hdx(&config, None, &SearchOptions::default()).unwrap();
        let resources = Dataset::get_all_resources(&found);
        let names: Vec<_> = resources.iter().filter_map(Resource::name).collect();
        assert_eq!(names, vec!["r0", "r1"]);
    }
}
