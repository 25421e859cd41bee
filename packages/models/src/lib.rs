#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident and aggregate artifact row types shared across the
//! crime-trends engine.
//!
//! The aggregator compresses per-incident rows into three fixed-shape
//! artifact tables ([`MonthlyTotalRow`], [`MonthlyTypeRow`],
//! [`SamplePointRow`]); the query layer re-derives filtered views from
//! those tables without touching raw data again. This crate defines the
//! row shapes both sides agree on, plus month-bucket arithmetic.

use chrono::{Datelike as _, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Maximum number of sampled points retained per source year.
pub const SAMPLE_PER_YEAR: usize = 30_000;

/// Maximum number of points handed to the map renderer per query.
pub const MAP_RENDER_CAP: usize = 200_000;

/// Seed for every reproducible sampling call.
pub const SAMPLE_SEED: u64 = 42;

/// One raw crime incident row as read from a yearly partition.
///
/// Every field is optional: source data is messy and rows routinely
/// arrive with missing coordinates or an unparseable timestamp. A row is
/// usable only if all four fields are present — see
/// [`RawIncident::clean`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIncident {
    /// When the incident occurred. `None` if missing or unparseable.
    pub date: Option<NaiveDateTime>,
    /// Categorical label (e.g., "THEFT").
    pub primary_type: Option<String>,
    /// WGS84 latitude.
    pub latitude: Option<f64>,
    /// WGS84 longitude.
    pub longitude: Option<f64>,
}

impl RawIncident {
    /// Validates this row, returning the cleaned form if all four
    /// required fields are present.
    ///
    /// Incomplete rows are expected and are dropped silently by the
    /// aggregator; this is not an error condition.
    #[must_use]
    pub fn clean(self) -> Option<CleanIncident> {
        let date = self.date?;
        let primary_type = self.primary_type?;
        let latitude = self.latitude?;
        let longitude = self.longitude?;

        Some(CleanIncident {
            month: month_bucket(date.date()),
            date,
            primary_type,
            latitude,
            longitude,
        })
    }
}

/// A validated incident row with its derived month bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanIncident {
    /// When the incident occurred.
    pub date: NaiveDateTime,
    /// First day of the calendar month containing `date`.
    pub month: NaiveDate,
    /// Categorical label.
    pub primary_type: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// One row of the `monthly_total` artifact: incident count for a
/// calendar month across all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotalRow {
    /// First day of the month.
    pub month: NaiveDate,
    /// Incidents in that month.
    pub count: u64,
}

/// One row of the `monthly_type` artifact: incident count for a
/// `(month, primary_type)` pair.
///
/// For a fixed month, counts summed across all types equal the
/// [`MonthlyTotalRow`] count for that month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTypeRow {
    /// First day of the month.
    pub month: NaiveDate,
    /// Categorical label.
    pub primary_type: String,
    /// Incidents of that type in that month.
    pub count: u64,
}

/// One row of the `sample_points` artifact: a spatially renderable
/// incident drawn from the bounded per-year sample.
///
/// This table is a representative subset, not an exhaustive one — each
/// year keeps at most [`SAMPLE_PER_YEAR`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePointRow {
    /// When the incident occurred.
    pub date: NaiveDateTime,
    /// Categorical label.
    pub primary_type: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Source partition year the row was sampled from.
    pub year: i32,
}

/// The full artifact set produced by one aggregator run.
///
/// Immutable once loaded; the query layer shares it by reference and a
/// refresh replaces the whole set, never individual tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    /// Per-month totals, sorted by month.
    pub monthly_total: Vec<MonthlyTotalRow>,
    /// Per-(month, type) counts, sorted by `(month, primary_type)`.
    pub monthly_type: Vec<MonthlyTypeRow>,
    /// Bounded per-year spatial sample.
    pub sample_points: Vec<SamplePointRow>,
}

impl Artifacts {
    /// Returns the earliest and latest sample point dates, or `None`
    /// if the sample table is empty.
    ///
    /// Consumers use this to seed a date slider with the covered range.
    #[must_use]
    pub fn date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let min = self.sample_points.iter().map(|p| p.date).min()?;
        let max = self.sample_points.iter().map(|p| p.date).max()?;
        Some((min, max))
    }

    /// Returns the sorted distinct category labels present in the
    /// `monthly_type` artifact.
    #[must_use]
    pub fn primary_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .monthly_type
            .iter()
            .map(|row| row.primary_type.clone())
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

/// Truncates a date to the first day of its calendar month.
///
/// # Panics
///
/// Never panics: day 1 is valid for every month.
#[must_use]
pub fn month_bucket(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .expect("day 1 is valid for every calendar month")
}
