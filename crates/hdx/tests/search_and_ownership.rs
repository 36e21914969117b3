// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use hdx::{
    Configuration, Dataset, ListOptions, MAX_ATTEMPTS, MemoryGateway, Metadata, PAGE_SIZE,
    Response, SearchOptions,
};
use serde_json::{Value, json};
use std::rc::Rc;

fn setup() -> Result<(Rc<MemoryGateway>, Configuration)> {
    let gateway = Rc::new(MemoryGateway::new());
    let config = Configuration::builder()
        .read_only(true)
        .build_with_gateway(gateway.clone())?;
    Ok((gateway, config))
}

fn search_page(count: usize, first: usize, len: usize) -> Value {
    let results: Vec<Value> = (first..first + len)
        .map(|i| json!({"id": format!("ds-{i}"), "name": format!("dataset-{i}")}))
        .collect();
    json!({"count": count, "results": results})
}

#[test]
fn test_count_change_repeats_the_walk() -> Result<()> {
    let (gateway, config) = setup()?;
    gateway.respond("package_search", search_page(1001, 0, PAGE_SIZE));
    gateway.respond("package_search", search_page(1002, PAGE_SIZE, 2));
    gateway.respond("package_search", search_page(1001, 0, PAGE_SIZE));
    gateway.respond("package_search", search_page(1001, PAGE_SIZE, 1));

    let found = Dataset::search_in_hdx(&config, Some("population"), &SearchOptions::default())?;

    assert_eq!(found.len(), 1001);
    assert_eq!(gateway.calls_for("package_search").len(), 4);
    assert_eq!(found[1000].name(), Some("dataset-1000"));
    Ok(())
}

#[test]
fn test_short_page_ends_the_walk() -> Result<()> {
    let (gateway, config) = setup()?;
    gateway.respond("package_search", search_page(20, 0, 20));
    let found = Dataset::search_in_hdx(&config, None, &SearchOptions::default())?;
    assert_eq!(found.len(), 20);
    assert_eq!(gateway.calls().len(), 1);
    Ok(())
}

#[test]
fn test_listing_gives_up_after_max_attempts() -> Result<()> {
    let (gateway, config) = setup()?;
    gateway.set_default(
        "current_package_list_with_resources",
        Response::Ok(json!([{"name": "same"}, {"name": "same"}])),
    );
    let err = Dataset::get_all_datasets(&config, ListOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Maximum attempts reached for getting all datasets!");
    assert_eq!(gateway.calls().len(), MAX_ATTEMPTS);
    Ok(())
}

#[test]
fn test_maintainer_record_resolved_by_name() -> Result<()> {
    let (gateway, config) = setup()?;
    let user_id = "0b9e4f5a-6c7d-4e8f-9a0b-1c2d3e4f5a6b";
    gateway.respond("user_show", json!({"id": user_id, "name": "jane"}));

    let mut dataset = Dataset::new(&config);
    let mut record = Metadata::new();
    let _ = record.insert("name".to_string(), json!("jane"));
    dataset.set_maintainer(record)?;

    assert_eq!(gateway.actions(), vec!["user_show"]);
    assert_eq!(dataset.get("maintainer"), Some(&json!(user_id)));
    Ok(())
}
