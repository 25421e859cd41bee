#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive query layer over the pre-aggregated artifact set.
//!
//! Every query is a pure function of `(artifacts, parameters)`: filter
//! and re-aggregate the three artifact tables, never the raw data.
//! Month-keyed artifacts are filtered on whole-month bounds; sample
//! points keep exact day bounds. Empty results are ordinary empty
//! tables, not errors.

pub mod handle;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use crime_trends_models::{Artifacts, MAP_RENDER_CAP, SAMPLE_SEED, SamplePointRow};
use crime_trends_query_models::{
    QueryOutput, QueryParams, TOP_TYPES_LIMIT, Totals, TrendPoint, TypeCount, TypeFilter,
};
use rand::SeedableRng as _;
use rand::rngs::StdRng;

/// Derives the four view-ready tables for one filter change.
#[must_use]
pub fn query(artifacts: &Artifacts, params: &QueryParams) -> QueryOutput {
    QueryOutput {
        range: params.range,
        map_points: map_points(artifacts, params),
        trend_series: trend_series(artifacts, params),
        top_types: top_types(artifacts, params),
        totals: totals(artifacts, params),
    }
}

/// Sample points within the exact day bounds and type filter, capped
/// for rendering.
fn map_points(artifacts: &Artifacts, params: &QueryParams) -> Vec<SamplePointRow> {
    let matched: Vec<SamplePointRow> = artifacts
        .sample_points
        .iter()
        .filter(|p| params.range.contains_day(p.date.date()) && params.types.matches(&p.primary_type))
        .cloned()
        .collect();

    apply_render_cap(matched, MAP_RENDER_CAP)
}

/// Replaces an over-cap match set with a seeded uniform sub-sample.
fn apply_render_cap(points: Vec<SamplePointRow>, cap: usize) -> Vec<SamplePointRow> {
    if points.len() <= cap {
        return points;
    }

    log::debug!(
        "Capping {} matched points to {cap} for rendering",
        points.len()
    );

    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let mut indices = rand::seq::index::sample(&mut rng, points.len(), cap).into_vec();
    indices.sort_unstable();

    let mut points = points;
    let mut keep = indices.into_iter().peekable();
    let mut i = 0usize;
    points.retain(|_| {
        let keep_this = keep.peek() == Some(&i);
        if keep_this {
            keep.next();
        }
        i += 1;
        keep_this
    });
    points
}

/// Monthly trend over the widened month range: per-type sums when a
/// subset is selected, the total series otherwise.
///
/// Months absent from the source artifact stay absent — no implicit
/// zero-filling.
fn trend_series(artifacts: &Artifacts, params: &QueryParams) -> Vec<TrendPoint> {
    match &params.types {
        TypeFilter::All => artifacts
            .monthly_total
            .iter()
            .filter(|row| params.range.contains_month(row.month))
            .map(|row| TrendPoint {
                month: row.month,
                count: row.count,
            })
            .collect(),
        TypeFilter::Subset(_) => {
            let mut per_month: BTreeMap<NaiveDate, u64> = BTreeMap::new();
            for row in &artifacts.monthly_type {
                if params.range.contains_month(row.month) && params.types.matches(&row.primary_type)
                {
                    *per_month.entry(row.month).or_insert(0) += row.count;
                }
            }
            per_month
                .into_iter()
                .map(|(month, count)| TrendPoint { month, count })
                .collect()
        }
    }
}

/// Top categories in the widened month range, deliberately ignoring the
/// type selection: the ranking always covers all categories.
fn top_types(artifacts: &Artifacts, params: &QueryParams) -> Vec<TypeCount> {
    let mut per_type: BTreeMap<&str, u64> = BTreeMap::new();
    for row in &artifacts.monthly_type {
        if params.range.contains_month(row.month) {
            *per_type.entry(row.primary_type.as_str()).or_insert(0) += row.count;
        }
    }

    let mut ranked: Vec<TypeCount> = per_type
        .into_iter()
        .map(|(primary_type, count)| TypeCount {
            primary_type: primary_type.to_string(),
            count,
        })
        .collect();

    // Descending count, ties broken by name for deterministic output.
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.primary_type.cmp(&b.primary_type))
    });
    ranked.truncate(TOP_TYPES_LIMIT);
    ranked
}

fn totals(artifacts: &Artifacts, params: &QueryParams) -> Totals {
    let total_in_range = artifacts
        .monthly_total
        .iter()
        .filter(|row| params.range.contains_month(row.month))
        .map(|row| row.count)
        .sum();

    let total_selected_types = if params.types.is_all() {
        total_in_range
    } else {
        artifacts
            .monthly_type
            .iter()
            .filter(|row| {
                params.range.contains_month(row.month) && params.types.matches(&row.primary_type)
            })
            .map(|row| row.count)
            .sum()
    };

    Totals {
        total_in_range,
        total_selected_types,
    }
}
