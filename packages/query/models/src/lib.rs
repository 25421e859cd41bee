#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query parameter and result types for the crime-trends views.
//!
//! The query layer is a pure function of `(artifacts, parameters)`;
//! this crate defines both sides of that contract for the UI boundary.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use crime_trends_models::{SamplePointRow, month_bucket};
use serde::{Deserialize, Serialize};

/// Number of categories reported in the top-type ranking.
pub const TOP_TYPES_LIMIT: usize = 10;

/// Errors produced when query parameters are malformed.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The requested date range ends before it starts. Rejected rather
    /// than silently yielding an empty result set.
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange {
        /// Requested start day.
        start: NaiveDate,
        /// Requested end day.
        end: NaiveDate,
    },
}

/// An inclusive day-granularity date range.
///
/// Month-keyed artifacts cannot be split below month granularity, so
/// range bounds are widened to whole months before being applied to
/// them; a partial final month contributes its entire month's
/// aggregate. Point-level data keeps exact day bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range from inclusive day bounds.
    ///
    /// A single-day range (`start == end`) is valid.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidDateRange`] if `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, QueryError> {
        if end < start {
            return Err(QueryError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start day.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Inclusive end day.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// First day of the month containing the start bound.
    #[must_use]
    pub fn month_start(&self) -> NaiveDate {
        month_bucket(self.start)
    }

    /// First day of the month containing the end bound.
    #[must_use]
    pub fn month_end(&self) -> NaiveDate {
        month_bucket(self.end)
    }

    /// Whether a day falls within the exact bounds.
    #[must_use]
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether a month bucket falls within the widened month bounds.
    #[must_use]
    pub fn contains_month(&self, month: NaiveDate) -> bool {
        self.month_start() <= month && month <= self.month_end()
    }
}

/// Category selection applied to map points, the trend series, and the
/// selected-types total.
///
/// A cleared UI multiselect means "no restriction" and maps to
/// [`TypeFilter::All`]; an explicitly empty subset matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "types")]
pub enum TypeFilter {
    /// No category restriction.
    All,
    /// Restrict to the given category labels.
    Subset(BTreeSet<String>),
}

impl TypeFilter {
    /// Builds a filter from a UI selection, mapping an empty selection
    /// to [`TypeFilter::All`].
    #[must_use]
    pub fn from_selection<I>(types: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let set: BTreeSet<String> = types.into_iter().collect();
        if set.is_empty() { Self::All } else { Self::Subset(set) }
    }

    /// Whether a category label passes this filter.
    #[must_use]
    pub fn matches(&self, primary_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::Subset(set) => set.contains(primary_type),
        }
    }

    /// Whether this filter restricts anything.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Parameters for one query: a validated date range plus a category
/// filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    /// Inclusive day-granularity date range.
    pub range: DateRange,
    /// Category selection.
    pub types: TypeFilter,
}

/// One point of the monthly trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// First day of the month.
    pub month: NaiveDate,
    /// Incidents in that month after filtering.
    pub count: u64,
}

/// One entry of the top-type ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    /// Categorical label.
    pub primary_type: String,
    /// Incidents of that type in the widened date range.
    pub count: u64,
}

/// Summary totals for the queried range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// All incidents in the widened month range.
    pub total_in_range: u64,
    /// Incidents in the widened month range matching the type filter.
    /// Equals `total_in_range` when the filter is [`TypeFilter::All`].
    pub total_selected_types: u64,
}

/// The four view-ready tables one query produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    /// Echo of the queried range.
    pub range: DateRange,
    /// Map-ready point subset (day-exact filtering, render-capped).
    pub map_points: Vec<SamplePointRow>,
    /// Monthly trend series over the widened month range.
    pub trend_series: Vec<TrendPoint>,
    /// Top categories in the widened month range, across all types.
    pub top_types: Vec<TypeCount>,
    /// Summary totals.
    pub totals: Totals,
}

impl QueryOutput {
    /// Headline metrics for the dashboard summary row.
    #[must_use]
    pub fn summary(&self) -> QuerySummary {
        QuerySummary {
            start: self.range.start(),
            end: self.range.end(),
            total_in_range: self.totals.total_in_range,
            total_selected_types: self.totals.total_selected_types,
            map_point_count: self.map_points.len() as u64,
        }
    }
}

/// Headline metrics derived from a [`QueryOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    /// Queried start day.
    pub start: NaiveDate,
    /// Queried end day.
    pub end: NaiveDate,
    /// All incidents in the widened month range.
    pub total_in_range: u64,
    /// Incidents matching the type filter.
    pub total_selected_types: u64,
    /// Points returned for the map.
    pub map_point_count: u64,
}
