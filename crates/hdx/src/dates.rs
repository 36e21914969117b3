// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Dataset dates
//!
//! The catalog stores a single `dataset_date` string: `MM/DD/YYYY` for one
//! day or `MM/DD/YYYY-MM/DD/YYYY` for a range.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

const DATE_FIELD: &str = "dataset_date";
const WIRE_FORMAT: &str = "%m/%d/%Y";

/// Formats tried in order when no explicit format is given
const GUESS_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y%m%d",
];

const GUESS_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

static YEAR_ONLY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{4})\s*$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateType {
    Date,
    Range,
}

fn parse_wire(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), WIRE_FORMAT).map_err(|source| Error::InvalidDate {
        value: value.to_string(),
        source,
    })
}

fn format_date(date: NaiveDate, format: Option<&str>) -> Result<String> {
    match format {
        None => Ok(date.format("%Y-%m-%d").to_string()),
        Some(format) => {
            let mut out = String::new();
            write!(out, "{}", date.format(format))
                .map_err(|_| Error::validation(format!("Invalid date format: {format}")))?;
            Ok(out)
        }
    }
}

/// Parse with `format`, or guess among common layouts when none is given
pub fn parse_date(value: &str, format: Option<&str>) -> Result<NaiveDate> {
    if let Some(format) = format {
        return NaiveDate::parse_from_str(value, format)
            .or_else(|e| {
                NaiveDateTime::parse_from_str(value, format)
                    .map(|dt| dt.date())
                    .map_err(|_| e)
            })
            .map_err(|source| Error::InvalidDate {
                value: value.to_string(),
                source,
            });
    }

    if let Some(caps) = YEAR_ONLY.as_ref().and_then(|re| re.captures(value)) {
        if let Some(date) = caps[1]
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        {
            return Ok(date);
        }
    }
    let trimmed = value.trim();
    let mut last_error = None;
    for format in GUESS_FORMATS {
        match NaiveDate::parse_from_str(trimmed, format) {
            Ok(date) => return Ok(date),
            Err(e) => last_error = Some(e),
        }
    }
    for format in GUESS_DATETIME_FORMATS {
        match NaiveDateTime::parse_from_str(trimmed, format) {
            Ok(dt) => return Ok(dt.date()),
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(source) => Err(Error::InvalidDate {
            value: value.to_string(),
            source,
        }),
        None => Err(Error::validation(format!("Invalid dataset date: {value}"))),
    }
}

impl Dataset {
    fn raw_dataset_date(&self) -> Option<&str> {
        self.core().get_str(DATE_FIELD).filter(|s| !s.is_empty())
    }

    pub fn get_dataset_date_type(&self) -> Option<DateType> {
        self.raw_dataset_date().map(|date| {
            if date.contains('-') {
                DateType::Range
            } else {
                DateType::Date
            }
        })
    }

    /// Start of the dataset date (the date itself when not a range)
    pub fn get_dataset_date_as_datetime(&self) -> Result<Option<NaiveDate>> {
        match self.raw_dataset_date() {
            Some(date) => {
                let start = date.split('-').next().unwrap_or(date);
                parse_wire(start).map(Some)
            }
            None => Ok(None),
        }
    }

    /// End of the dataset date; `None` unless the date is a range
    pub fn get_dataset_end_date_as_datetime(&self) -> Result<Option<NaiveDate>> {
        match self.raw_dataset_date().and_then(|date| date.split('-').nth(1)) {
            Some(end) => parse_wire(end).map(Some),
            None => Ok(None),
        }
    }

    /// Start date as a string, ISO 8601 unless `format` is given
    pub fn get_dataset_date(&self, format: Option<&str>) -> Result<Option<String>> {
        self.get_dataset_date_as_datetime()?
            .map(|date| format_date(date, format))
            .transpose()
    }

    pub fn get_dataset_end_date(&self, format: Option<&str>) -> Result<Option<String>> {
        self.get_dataset_end_date_as_datetime()?
            .map(|date| format_date(date, format))
            .transpose()
    }

    pub fn set_dataset_date_from_datetime(&mut self, start: NaiveDate, end: Option<NaiveDate>) {
        let mut value = start.format(WIRE_FORMAT).to_string();
        if let Some(end) = end {
            value = format!("{value}-{}", end.format(WIRE_FORMAT));
        }
        self.set_field_value(DATE_FIELD, value.into());
    }

    pub fn set_dataset_date(
        &mut self,
        start: &str,
        end: Option<&str>,
        format: Option<&str>,
    ) -> Result<()> {
        let start = parse_date(start, format)?;
        let end = end.map(|end| parse_date(end, format)).transpose()?;
        self.set_dataset_date_from_datetime(start, end);
        Ok(())
    }

    /// Range from January 1 of `start_year` to December 31 of `end_year`
    /// (or of `start_year` again)
    pub fn set_dataset_year_range(&mut self, start_year: i32, end_year: Option<i32>) -> Result<()> {
        let end_year = end_year.unwrap_or(start_year);
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
            .ok_or_else(|| Error::validation(format!("Invalid dataset year: {start_year}")))?;
        let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
            .ok_or_else(|| Error::validation(format!("Invalid dataset year: {end_year}")))?;
        self.set_dataset_date_from_datetime(start, Some(end));
        Ok(())
    }
}
