// Derived best/average/count columns over a chosen subset of value columns.
//
// Only comparable columns belong in one aggregate: dollar projections and
// 1-150 rank positions must never be averaged together, so the caller names
// the subset and says which direction is better.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::reconcile::ReconcileError;
use crate::table::{Aggregates, MergedRow, MergedTable};

/// Which end of a column is the good end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Better {
    /// Rankings: 1 beats 50.
    Min,
    /// Dollar values: $40 beats $5.
    Max,
}

impl FromStr for Better {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "lower" => Ok(Better::Min),
            "max" | "higher" => Ok(Better::Max),
            other => Err(format!("expected 'min' or 'max', got '{other}'")),
        }
    }
}

impl fmt::Display for Better {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Better::Min => "min",
            Better::Max => "max",
        })
    }
}

/// Compute `best`, `average` and `num_sources_ranked` over `columns` for
/// every row, then drop rows with no value in any of them.
pub fn aggregate(
    mut table: MergedTable,
    columns: &[String],
    better: Better,
) -> Result<MergedTable, ReconcileError> {
    if columns.is_empty() {
        return Err(ReconcileError::EmptyAggregate);
    }
    if let Some(missing) = columns.iter().find(|c| !table.has_column(c)) {
        return Err(ReconcileError::UnknownColumn(missing.clone()));
    }

    for row in &mut table.rows {
        row.aggregates = Some(aggregate_row(row, columns, better));
    }

    let before = table.rows.len();
    table
        .rows
        .retain(|r| r.aggregates.is_some_and(|a| a.num_sources_ranked > 0));
    debug!(
        "aggregated {} columns ({}); dropped {} unranked rows",
        columns.len(),
        better,
        before - table.rows.len()
    );

    Ok(table)
}

/// Aggregates for one row. Missing cells are ignored entirely.
pub fn aggregate_row(row: &MergedRow, columns: &[String], better: Better) -> Aggregates {
    let present: Vec<f64> = columns
        .iter()
        .filter_map(|c| row.value(c).as_f64())
        .collect();

    if present.is_empty() {
        return Aggregates::default();
    }

    let best = match better {
        Better::Min => present.iter().copied().fold(f64::INFINITY, f64::min),
        Better::Max => present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    let average = present.iter().sum::<f64>() / present.len() as f64;

    Aggregates {
        best: Some(best),
        average: Some(average),
        num_sources_ranked: present.len(),
    }
}
