// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Client for the Humanitarian Data Exchange catalog
//!
//! Datasets and resources are kept as loosely typed metadata maps and
//! synchronised with a CKAN-style action API through a [`Gateway`]. The
//! interesting part is the save path in [`Dataset`], which merges local
//! edits over the remote copy and defers file uploads until resource ids
//! are known.

mod ckan;
mod configuration;
mod datastore;
mod dataset;
mod dates;
mod entity;
mod error;
mod frequency;
mod gateway;
mod keyed;
mod locations;
mod memory_gateway;
mod merge;
mod ownership;
mod requestable;
mod resource;
mod search;

pub use ckan::CkanGateway;
pub use configuration::{Configuration, ConfigurationBuilder, Source, load_api_key};
pub use datastore::{DatastoreField, DatastoreSchema, DeleteFirst};
pub use dataset::{Dataset, ResourceInput};
pub use dates::{DateType, parse_date};
pub use entity::{Action, EntityCore, Kind};
pub use error::{Error, Result};
pub use frequency::transform_update_frequency;
pub use gateway::{Gateway, GatewayError};
pub use keyed::{ItemMut, Keyed, KeyedList};
pub use locations::{Location, Locations};
pub use memory_gateway::{Call, MemoryGateway, Response};
pub use merge::{Metadata, merge_maps, merge_values};
pub use ownership::Reference;
pub use resource::{Resource, ResourceSearch};
pub use search::{ListOptions, MAX_ATTEMPTS, PAGE_SIZE, SearchOptions};
