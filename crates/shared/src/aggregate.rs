//! Period filtering and grouped counts over a record list.
//!
//! Everything here is a pure function of its inputs. The same time zone is
//! used to bucket records into a period and to render their dates, so a row
//! shown under March always displays a March date.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone};

use crate::domain::{Period, Record, Timestamp, NOT_AVAILABLE};

pub type Counts = BTreeMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    pub filtered: Vec<Record>,
    pub by_status: Counts,
    pub by_sector: Counts,
}

impl Aggregate {
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

pub fn aggregate(records: &[Record], period: Period) -> Aggregate {
    aggregate_in(records, period, &Local)
}

/// Filters `records` to `period` (dates taken in `tz`) and counts the
/// survivors by status and by sector in one pass.
pub fn aggregate_in<Tz: TimeZone>(records: &[Record], period: Period, tz: &Tz) -> Aggregate {
    records
        .iter()
        .filter(|record| in_period(record, period, tz))
        .fold(Aggregate::default(), |mut acc, record| {
            *acc.by_status
                .entry(record.status_key().to_string())
                .or_insert(0) += 1;
            *acc.by_sector
                .entry(record.sector_key().to_string())
                .or_insert(0) += 1;
            acc.filtered.push(record.clone());
            acc
        })
}

fn in_period<Tz: TimeZone>(record: &Record, period: Period, tz: &Tz) -> bool {
    record
        .entry
        .as_ref()
        .and_then(|entry| entry.local_date_in(tz))
        .is_some_and(|date| period.contains(date))
}

/// Counts records by an arbitrary key over the whole list, unfiltered.
pub fn count_by<'a, F>(records: &'a [Record], key: F) -> Counts
where
    F: Fn(&'a Record) -> &'a str,
{
    let mut counts = Counts::new();
    for record in records {
        *counts.entry(key(record).to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn display_date(timestamp: Option<&Timestamp>) -> String {
    display_date_in(timestamp, &Local)
}

/// Renders a timestamp as `dd/mm/yyyy`, or `N/A` when absent or unparseable.
pub fn display_date_in<Tz: TimeZone>(timestamp: Option<&Timestamp>, tz: &Tz) -> String {
    timestamp
        .and_then(|ts| ts.local_date_in(tz))
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
#[path = "tests/aggregate_tests.rs"]
mod tests;
