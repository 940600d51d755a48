//! Incremental reconciliation of freshly aggregated data with the store.

use crate::domain::aggregate::{extract_cot, AggregateRequest, SkippedSlice};
use crate::domain::error::CotError;
use crate::domain::table::CotTable;
use crate::ports::report_port::ReportSource;
use crate::ports::store_port::TableStore;
use tracing::info;

/// How fresh rows are combined with stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Union, sort, drop rows identical in every column. A restated report
    /// for a stored date is kept next to the old row.
    #[default]
    ExactDuplicates,
    /// Fresh rows replace every stored row with the same date.
    UpsertByDate,
}

impl MergePolicy {
    pub fn parse(value: &str) -> Option<MergePolicy> {
        match value.trim().to_lowercase().as_str() {
            "exact" => Some(MergePolicy::ExactDuplicates),
            "upsert" => Some(MergePolicy::UpsertByDate),
            _ => None,
        }
    }
}

/// State of the store at the start of a reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreState {
    Empty,
    Populated(CotTable),
}

impl StoreState {
    pub fn load(store: &dyn TableStore) -> Result<StoreState, CotError> {
        Ok(match store.load()? {
            Some(table) => StoreState::Populated(table),
            None => StoreState::Empty,
        })
    }

    pub fn into_table(self) -> CotTable {
        match self {
            StoreState::Empty => CotTable::default(),
            StoreState::Populated(table) => table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileSummary {
    pub existing_rows: usize,
    pub fresh_rows: usize,
    pub duplicates_dropped: usize,
    pub total_rows: usize,
}

/// Combine `existing` with `fresh` under `policy`.
///
/// Returns the combined table and the number of rows removed as duplicates
/// (or replaced, for upserts).
pub fn combine(existing: &CotTable, fresh: &CotTable, policy: MergePolicy) -> (CotTable, usize) {
    match policy {
        MergePolicy::ExactDuplicates => {
            let mut combined = existing.concat(fresh);
            combined.sort_by_date();
            let dropped = combined.drop_duplicates();
            (combined, dropped)
        }
        MergePolicy::UpsertByDate => {
            let mut combined = existing.upsert_by_date(fresh);
            combined.drop_duplicates();
            let dropped = existing.len() + fresh.len() - combined.len();
            (combined, dropped)
        }
    }
}

/// Load the store, merge `fresh` into it and save the result, holding the
/// store lock throughout.
pub fn reconcile(
    store: &dyn TableStore,
    fresh: &CotTable,
    policy: MergePolicy,
) -> Result<ReconcileSummary, CotError> {
    let _guard = store.lock()?;

    let state = StoreState::load(store)?;
    if state == StoreState::Empty {
        info!(store = %store.describe(), "no existing store, starting empty");
    }
    let existing = state.into_table();

    let (combined, dropped) = combine(&existing, fresh, policy);
    store.save(&combined)?;

    let summary = ReconcileSummary {
        existing_rows: existing.len(),
        fresh_rows: fresh.len(),
        duplicates_dropped: dropped,
        total_rows: combined.len(),
    };
    info!(
        store = %store.describe(),
        existing = summary.existing_rows,
        fresh = summary.fresh_rows,
        dropped = summary.duplicates_dropped,
        total = summary.total_rows,
        "COT store updated"
    );
    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct CotUpdateReport {
    pub summary: ReconcileSummary,
    pub skipped: Vec<SkippedSlice>,
}

/// Full COT update cycle: aggregate the year range from `source`, then
/// reconcile into `store`. Nothing is written when aggregation finds no data.
pub fn update_cot_reports(
    source: &dyn ReportSource,
    store: &dyn TableStore,
    request: &AggregateRequest<'_>,
    policy: MergePolicy,
) -> Result<CotUpdateReport, CotError> {
    let aggregated = extract_cot(source, request)?;
    let summary = reconcile(store, &aggregated.table, policy)?;
    Ok(CotUpdateReport {
        summary,
        skipped: aggregated.skipped,
    })
}
