//! Groups a page of matches by calendar day for the history view.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::types::MatchRecord;
use crate::utils::ordinal_suffix;

/// Matches bucketed by the day they were played. Within a day the input order
/// is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDays<'a> {
    groups: BTreeMap<NaiveDate, Vec<&'a MatchRecord>>,
}

impl<'a> MatchDays<'a> {
    /// Day keys, most recent first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.groups.keys().rev().copied()
    }

    /// (day, matches) pairs, most recent day first.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[&'a MatchRecord])> + '_ {
        self.groups
            .iter()
            .rev()
            .map(|(day, matches)| (*day, matches.as_slice()))
    }

    pub fn get(&self, day: NaiveDate) -> Option<&[&'a MatchRecord]> {
        self.groups.get(&day).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All matches in display order.
    pub fn flatten(&self) -> Vec<&'a MatchRecord> {
        self.iter().flat_map(|(_, matches)| matches.iter().copied()).collect()
    }
}

/// Buckets by the calendar day of each match in `tz`.
pub fn group_by_day_in<'a, Tz: TimeZone>(matches: &'a [MatchRecord], tz: &Tz) -> MatchDays<'a> {
    let mut groups: BTreeMap<NaiveDate, Vec<&'a MatchRecord>> = BTreeMap::new();
    for record in matches {
        let day = record.date.with_timezone(tz).date_naive();
        groups.entry(day).or_default().push(record);
    }
    MatchDays { groups }
}

pub fn group_by_day(matches: &[MatchRecord]) -> MatchDays<'_> {
    group_by_day_in(matches, &Utc)
}

/// Formats a day as "July 18th 2025".
pub fn format_day(day: NaiveDate) -> String {
    format!(
        "{} {}{} {}",
        day.format("%B"),
        day.day(),
        ordinal_suffix(day.day()),
        day.year()
    )
}
