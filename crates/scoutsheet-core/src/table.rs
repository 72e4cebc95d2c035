// Row and table types shared by every source and the reconciler.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::names::normalize_name;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A numeric cell in a merged table.
///
/// `NoData` means "this source has no row for the player". It is distinct
/// from a legitimate zero and is skipped by every aggregate and sort.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum Cell {
    Value(f64),
    #[default]
    NoData,
}

impl Cell {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::NoData => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Cell::NoData)
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => Cell::Value(v),
            _ => Cell::NoData,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(v) => write!(f, "{v}"),
            Cell::NoData => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// One player as reported by one source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerRecord {
    /// Name exactly as the source spells it.
    pub display_name: String,
    /// Join key derived from `display_name`.
    pub normalized_name: String,
    pub team: Option<String>,
    pub position: Option<String>,
    /// Numeric columns contributed by this source.
    pub values: BTreeMap<String, f64>,
    /// Text columns carried through to the report (ETA, tier, status, ...).
    pub extras: BTreeMap<String, String>,
}

impl PlayerRecord {
    /// Build a record, deriving the normalized name. Blank team/position
    /// strings are treated as absent.
    pub fn new(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let normalized_name = normalize_name(&display_name);
        Self {
            display_name,
            normalized_name,
            ..Default::default()
        }
    }

    pub fn with_team(mut self, team: impl AsRef<str>) -> Self {
        self.team = non_blank(team.as_ref());
        self
    }

    pub fn with_position(mut self, position: impl AsRef<str>) -> Self {
        self.position = non_blank(position.as_ref());
        self
    }

    /// Add a numeric value. Non-finite values are dropped, which leaves the
    /// column as no-data after the merge.
    pub fn with_value(mut self, column: impl Into<String>, value: f64) -> Self {
        if value.is_finite() {
            self.values.insert(column.into(), value);
        }
        self
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(column.into(), value.into());
        self
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// How rows from a source are matched against the accumulated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Match on `(name, team)` when both sides carry a team, otherwise on
    /// name alone.
    #[default]
    Auto,
    /// Always match on name alone, ignoring team.
    NameOnly,
}

/// A labelled set of player rows plus the value columns it contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub label: String,
    /// Every value column this source contributes. Rows that lack a column
    /// (or players the source doesn't list) get `Cell::NoData` for it.
    pub value_columns: Vec<String>,
    pub records: Vec<PlayerRecord>,
    /// Overrides the table-wide join policy for this source.
    pub join: Option<JoinPolicy>,
}

impl Source {
    pub fn new(label: impl Into<String>, value_columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            value_columns,
            records: Vec::new(),
            join: None,
        }
    }

    /// A source contributing a single value column named after its label.
    pub fn single(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(label.clone(), vec![label])
    }

    pub fn with_records(mut self, records: Vec<PlayerRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn with_join(mut self, policy: JoinPolicy) -> Self {
        self.join = Some(policy);
        self
    }

    pub fn push(&mut self, record: PlayerRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// The identity of a row in a merged table: normalized name plus the
/// translated team when the base source carries one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JoinKey {
    pub name: String,
    pub team: Option<String>,
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.team {
            Some(team) => write!(f, "{} ({team})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Merged table
// ---------------------------------------------------------------------------

/// Derived columns computed over a subset of value columns.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Aggregates {
    pub best: Option<f64>,
    pub average: Option<f64>,
    pub num_sources_ranked: usize,
}

/// One player in a merged table.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub key: JoinKey,
    pub display_name: String,
    pub team: Option<String>,
    pub position: Option<String>,
    /// A cell for every column of the owning table.
    pub values: BTreeMap<String, Cell>,
    pub extras: BTreeMap<String, String>,
    /// Labels of the sources that matched this player.
    pub sources: BTreeSet<String>,
    pub aggregates: Option<Aggregates>,
}

impl MergedRow {
    pub fn value(&self, column: &str) -> Cell {
        self.values.get(column).copied().unwrap_or_default()
    }

    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extras.get(column).map(String::as_str)
    }
}

/// A key that appeared more than once within a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub source: String,
    pub key: JoinKey,
    pub occurrences: usize,
    pub display_names: Vec<String>,
}

/// A row dropped before merging because it had no usable join key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmergeableRow {
    pub source: String,
    pub display_name: String,
}

/// A right-hand record that matched more than one row, e.g. a teamless
/// ranking entry for a name two base players share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousMatch {
    pub source: String,
    pub key: JoinKey,
    /// Keys of every row the record was applied to, in table order.
    pub matched: Vec<JoinKey>,
}

/// Everything the reconciler noticed but did not treat as fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeDiagnostics {
    pub duplicates: Vec<DuplicateKey>,
    pub ambiguous: Vec<AmbiguousMatch>,
    pub unmergeable: Vec<UnmergeableRow>,
    /// Sources the caller asked for but could not load.
    pub skipped_sources: Vec<String>,
}

impl MergeDiagnostics {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn has_ambiguous(&self) -> bool {
        !self.ambiguous.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty()
            && self.ambiguous.is_empty()
            && self.unmergeable.is_empty()
            && self.skipped_sources.is_empty()
    }
}

/// Result of reconciling N sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    /// Value columns in source order.
    pub columns: Vec<String>,
    /// Extra text columns in first-seen order.
    pub extra_columns: Vec<String>,
    pub rows: Vec<MergedRow>,
    pub diagnostics: MergeDiagnostics,
}

impl MergedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn is_aggregated(&self) -> bool {
        self.rows.iter().any(|r| r.aggregates.is_some())
    }

    pub fn find(&self, normalized_name: &str) -> Option<&MergedRow> {
        self.rows.iter().find(|r| r.key.name == normalized_name)
    }

    /// Record a source the caller could not load.
    pub fn note_skipped(&mut self, label: impl Into<String>) {
        self.diagnostics.skipped_sources.push(label.into());
    }

    /// Add a text column to every row, registering it in `extra_columns`.
    pub fn set_extra<F>(&mut self, column: &str, mut f: F)
    where
        F: FnMut(&MergedRow) -> Option<String>,
    {
        if !self.extra_columns.iter().any(|c| c == column) {
            self.extra_columns.push(column.to_string());
        }
        for row in &mut self.rows {
            match f(row) {
                Some(v) => {
                    row.extras.insert(column.to_string(), v);
                }
                None => {
                    row.extras.remove(column);
                }
            }
        }
    }

    /// Add a numeric column to every row, registering it in `columns`.
    pub fn set_value<F>(&mut self, column: &str, mut f: F)
    where
        F: FnMut(&MergedRow) -> Cell,
    {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        for row in &mut self.rows {
            let cell = f(row);
            row.values.insert(column.to_string(), cell);
        }
    }

    /// Keep only the rows matching `keep`.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&MergedRow) -> bool,
    {
        self.rows.retain(keep);
    }
}
