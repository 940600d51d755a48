//! Date-indexed wide table of positioning metrics.
//!
//! A [`CotTable`] is both the output of the cross-instrument merge and the
//! shape of the persisted store: one row per report date, one nullable cell
//! per metric column. Missing cells are `None`, never zero.

use crate::domain::metric::InstrumentSeries;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};

/// Name of the index column in persisted tables.
pub const INDEX_COLUMN: &str = "datetime";

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CotTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// Summary of one column, ignoring missing cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    pub last_date: NaiveDate,
}

impl CotTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` on every row, in row order.
    pub fn column_values(&self, column: &str) -> Option<Vec<(NaiveDate, Option<f64>)>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| (r.date, r.values[idx])).collect())
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    pub fn is_date_sorted(&self) -> bool {
        self.rows.windows(2).all(|w| w[0].date <= w[1].date)
    }

    /// Outer join of per-instrument series on date.
    ///
    /// Every date present in any series appears in the result. When a series
    /// holds several points for the same date, the joined rows for that date
    /// are the cartesian product of the per-series values.
    pub fn outer_join(series: &[InstrumentSeries]) -> CotTable {
        let columns: Vec<String> = series.iter().map(|s| s.column()).collect();

        let mut by_date: BTreeMap<NaiveDate, Vec<Vec<f64>>> = BTreeMap::new();
        for (col, s) in series.iter().enumerate() {
            for point in &s.points {
                let slots = by_date
                    .entry(point.date)
                    .or_insert_with(|| vec![Vec::new(); series.len()]);
                slots[col].push(point.value);
            }
        }

        let mut rows = Vec::new();
        for (date, slots) in by_date {
            let mut combos: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(columns.len())];
            for values in &slots {
                if values.is_empty() {
                    for combo in &mut combos {
                        combo.push(None);
                    }
                    continue;
                }
                combos = combos
                    .into_iter()
                    .flat_map(|combo| {
                        values.iter().map(move |v| {
                            let mut next = combo.clone();
                            next.push(Some(*v));
                            next
                        })
                    })
                    .collect();
            }
            rows.extend(combos.into_iter().map(|values| TableRow { date, values }));
        }

        CotTable { columns, rows }
    }

    /// Stack `other` under `self`, aligning columns by name.
    ///
    /// The result's columns are `self`'s followed by any new ones from
    /// `other`; cells a side does not have become `None`.
    pub fn concat(&self, other: &CotTable) -> CotTable {
        let mut columns = self.columns.clone();
        for c in &other.columns {
            if !columns.contains(c) {
                columns.push(c.clone());
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());
        for table in [self, other] {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            for row in &table.rows {
                rows.push(TableRow {
                    date: row.date,
                    values: mapping
                        .iter()
                        .map(|m| m.and_then(|i| row.values[i]))
                        .collect(),
                });
            }
        }

        CotTable { columns, rows }
    }

    /// Stable sort by date ascending.
    pub fn sort_by_date(&mut self) {
        self.rows.sort_by_key(|r| r.date);
    }

    /// Remove rows identical to an earlier row in date and every cell.
    /// Two missing cells compare equal. Returns the number removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row_key(row)));
        before - self.rows.len()
    }

    /// Replace every row whose date appears in `fresh` with `fresh`'s rows.
    /// Columns are unioned as in [`CotTable::concat`]. Result is date-sorted.
    pub fn upsert_by_date(&self, fresh: &CotTable) -> CotTable {
        let fresh_dates: HashSet<NaiveDate> = fresh.rows.iter().map(|r| r.date).collect();
        let kept = CotTable {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| !fresh_dates.contains(&r.date))
                .cloned()
                .collect(),
        };
        let mut merged = kept.concat(fresh);
        merged.sort_by_date();
        merged
    }

    /// Rows whose date falls in `start_year..=end_year`.
    pub fn filter_years(&self, start_year: i32, end_year: i32) -> CotTable {
        CotTable {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| (start_year..=end_year).contains(&r.date.year()))
                .cloned()
                .collect(),
        }
    }

    pub fn column_stats(&self) -> Vec<ColumnStats> {
        let mut stats = Vec::new();
        for (idx, column) in self.columns.iter().enumerate() {
            let present: Vec<(NaiveDate, f64)> = self
                .rows
                .iter()
                .filter_map(|r| r.values[idx].filter(|v| !v.is_nan()).map(|v| (r.date, v)))
                .collect();
            let Some(&(last_date, last)) = present.last() else {
                continue;
            };
            stats.push(ColumnStats {
                column: column.clone(),
                count: present.len(),
                min: present.iter().map(|p| p.1).fold(f64::INFINITY, f64::min),
                max: present.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max),
                last,
                last_date,
            });
        }
        stats
    }
}

fn row_key(row: &TableRow) -> (NaiveDate, Vec<Option<u64>>) {
    let cells = row
        .values
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()).map(canonical_bits))
        .collect();
    (row.date, cells)
}

fn canonical_bits(v: f64) -> u64 {
    // -0.0 == 0.0
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}
