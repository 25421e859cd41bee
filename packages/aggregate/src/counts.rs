//! Monthly count accumulation.
//!
//! Partitions contribute partial counts that are summed, not
//! concatenated, so absorbing partitions in any order yields the same
//! tables. `BTreeMap` keys keep the output sorted by month and
//! `(month, primary_type)`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use crime_trends_models::{CleanIncident, MonthlyTotalRow, MonthlyTypeRow};

/// Accumulator for per-month and per-(month, type) incident counts.
#[derive(Debug, Default)]
pub struct MonthlyCounts {
    per_month: BTreeMap<NaiveDate, u64>,
    per_month_type: BTreeMap<(NaiveDate, String), u64>,
}

impl MonthlyCounts {
    /// Adds one partition's cleaned incidents to the running counts.
    pub fn absorb(&mut self, incidents: &[CleanIncident]) {
        for incident in incidents {
            *self.per_month.entry(incident.month).or_insert(0) += 1;
            *self
                .per_month_type
                .entry((incident.month, incident.primary_type.clone()))
                .or_insert(0) += 1;
        }
    }

    /// Finalizes the accumulator into the two monthly artifact tables.
    ///
    /// Both tables come out key-sorted. For every month, the per-type
    /// counts sum to the monthly total by construction.
    #[must_use]
    pub fn into_tables(self) -> (Vec<MonthlyTotalRow>, Vec<MonthlyTypeRow>) {
        let monthly_total = self
            .per_month
            .into_iter()
            .map(|(month, count)| MonthlyTotalRow { month, count })
            .collect();

        let monthly_type = self
            .per_month_type
            .into_iter()
            .map(|((month, primary_type), count)| MonthlyTypeRow {
                month,
                primary_type,
                count,
            })
            .collect();

        (monthly_total, monthly_type)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn incident(date: &str, primary_type: &str) -> CleanIncident {
        let date = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S").unwrap();
        CleanIncident {
            date,
            month: crime_trends_models::month_bucket(date.date()),
            primary_type: primary_type.to_string(),
            latitude: 41.88,
            longitude: -87.63,
        }
    }

    fn fixture_partitions() -> Vec<Vec<CleanIncident>> {
        vec![
            vec![
                incident("2020-01-05 10:00:00", "THEFT"),
                incident("2020-01-20 23:30:00", "BATTERY"),
                incident("2020-02-01 00:00:00", "THEFT"),
            ],
            vec![
                incident("2021-01-11 07:45:00", "THEFT"),
                incident("2021-01-12 07:45:00", "ARSON"),
            ],
        ]
    }

    #[test]
    fn type_counts_sum_to_monthly_totals() {
        let mut counts = MonthlyCounts::default();
        for partition in fixture_partitions() {
            counts.absorb(&partition);
        }
        let (totals, by_type) = counts.into_tables();

        let mut per_month: BTreeMap<chrono::NaiveDate, u64> = BTreeMap::new();
        for row in &by_type {
            *per_month.entry(row.month).or_insert(0) += row.count;
        }

        assert_eq!(totals.len(), per_month.len());
        for row in &totals {
            assert_eq!(per_month.get(&row.month), Some(&row.count), "{}", row.month);
        }
    }

    #[test]
    fn absorb_order_does_not_matter() {
        let partitions = fixture_partitions();

        let mut forward = MonthlyCounts::default();
        for partition in &partitions {
            forward.absorb(partition);
        }

        let mut reverse = MonthlyCounts::default();
        for partition in partitions.iter().rev() {
            reverse.absorb(partition);
        }

        assert_eq!(forward.into_tables(), reverse.into_tables());
    }

    #[test]
    fn tables_are_key_sorted() {
        let mut counts = MonthlyCounts::default();
        for partition in fixture_partitions().iter().rev() {
            counts.absorb(partition);
        }
        let (totals, by_type) = counts.into_tables();

        assert!(totals.windows(2).all(|w| w[0].month < w[1].month));
        assert!(by_type.windows(2).all(|w| {
            (&w[0].month, &w[0].primary_type) < (&w[1].month, &w[1].primary_type)
        }));
    }
}
