// Cross-source reconciliation.
//
// Sources are joined in order onto the first one (the base). Each player ends
// up in exactly one row; a source without a row for that player contributes
// `Cell::NoData` for every one of its columns.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::table::{
    AmbiguousMatch, Cell, DuplicateKey, JoinKey, JoinPolicy, MergedRow, MergedTable, PlayerRecord,
    Source, UnmergeableRow,
};
use crate::teams::TeamMap;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("no sources to merge")]
    NoSources,

    #[error("column `{column}` from source `{label}` is already provided by an earlier source")]
    DuplicateColumn { column: String, label: String },

    #[error("unknown value column `{0}`")]
    UnknownColumn(String),

    #[error("no value columns given to aggregate")]
    EmptyAggregate,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What happens to players that only appear in a later source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Dropped: the base source defines the row set.
    #[default]
    Left,
    /// Appended as new rows.
    Outer,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Policy for sources that don't override it.
    pub policy: JoinPolicy,
    pub mode: MergeMode,
    pub teams: TeamMap,
}

impl MergeOptions {
    pub fn outer() -> Self {
        Self {
            mode: MergeMode::Outer,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: JoinPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_teams(mut self, teams: TeamMap) -> Self {
        self.teams = teams;
        self
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Reconcile `sources` into one table. The first source is the base.
pub fn merge(
    sources: Vec<Source>,
    options: &MergeOptions,
) -> Result<MergedTable, ReconcileError> {
    if sources.is_empty() {
        return Err(ReconcileError::NoSources);
    }

    let columns = collect_columns(&sources)?;
    let mut merger = Merger::new(columns, options);

    let mut iter = sources.into_iter();
    if let Some(base) = iter.next() {
        merger.seed(base);
    }
    for source in iter {
        merger.join(source);
    }

    Ok(merger.finish())
}

impl MergedTable {
    /// Re-emit the table's rows as a single source, e.g. to fold an already
    /// reconciled group of sources into a larger merge. No-data cells are
    /// dropped from the records.
    pub fn into_source(self, label: impl Into<String>) -> Source {
        let records = self
            .rows
            .into_iter()
            .map(|row| PlayerRecord {
                display_name: row.display_name,
                normalized_name: row.key.name,
                team: row.team,
                position: row.position,
                values: row
                    .values
                    .into_iter()
                    .filter_map(|(col, cell)| cell.as_f64().map(|v| (col, v)))
                    .collect(),
                extras: row.extras,
            })
            .collect();
        Source::new(label, self.columns).with_records(records)
    }
}

fn collect_columns(sources: &[Source]) -> Result<Vec<String>, ReconcileError> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for source in sources {
        for column in &source.value_columns {
            if !seen.insert(column.clone()) {
                return Err(ReconcileError::DuplicateColumn {
                    column: column.clone(),
                    label: source.label.clone(),
                });
            }
            columns.push(column.clone());
        }
    }
    Ok(columns)
}

// ---------------------------------------------------------------------------
// Merger (private accumulator)
// ---------------------------------------------------------------------------

struct Merger<'a> {
    options: &'a MergeOptions,
    table: MergedTable,
    /// Keys already present, to keep one row per key.
    keys: HashSet<JoinKey>,
}

impl<'a> Merger<'a> {
    fn new(columns: Vec<String>, options: &'a MergeOptions) -> Self {
        Self {
            options,
            table: MergedTable {
                columns,
                ..Default::default()
            },
            keys: HashSet::new(),
        }
    }

    fn policy_for(&self, source: &Source) -> JoinPolicy {
        source.join.unwrap_or(self.options.policy)
    }

    fn key_for(&self, record: &PlayerRecord, policy: JoinPolicy) -> JoinKey {
        let team = match policy {
            JoinPolicy::Auto => record.team.as_deref().map(|t| self.options.teams.translate(t)),
            JoinPolicy::NameOnly => None,
        };
        JoinKey {
            name: record.normalized_name.clone(),
            team,
        }
    }

    /// Drop unmergeable rows and collapse duplicate keys to their first
    /// occurrence, recording both in diagnostics.
    fn dedupe(&mut self, source: Source) -> (String, Vec<(JoinKey, PlayerRecord)>) {
        let policy = self.policy_for(&source);
        let label = source.label;

        let mut order: Vec<JoinKey> = Vec::new();
        let mut groups: HashMap<JoinKey, Vec<PlayerRecord>> = HashMap::new();

        for record in source.records {
            if record.normalized_name.is_empty() {
                warn!(
                    "source '{}': skipping row with no usable player name ({:?})",
                    label, record.display_name
                );
                self.table.diagnostics.unmergeable.push(UnmergeableRow {
                    source: label.clone(),
                    display_name: record.display_name,
                });
                continue;
            }
            let key = self.key_for(&record, policy);
            let group = groups.entry(key.clone()).or_default();
            if group.is_empty() {
                order.push(key);
            }
            group.push(record);
        }

        let mut kept = Vec::with_capacity(order.len());
        for key in order {
            let Some(mut group) = groups.remove(&key) else {
                continue;
            };
            if group.len() > 1 {
                warn!(
                    "source '{}': key '{}' appears {} times, keeping the first",
                    label,
                    key,
                    group.len()
                );
                self.table.diagnostics.duplicates.push(DuplicateKey {
                    source: label.clone(),
                    key: key.clone(),
                    occurrences: group.len(),
                    display_names: group.iter().map(|r| r.display_name.clone()).collect(),
                });
            }
            group.truncate(1);
            if let Some(first) = group.pop() {
                kept.push((key, first));
            }
        }
        (label, kept)
    }

    fn seed(&mut self, base: Source) {
        let value_columns = base.value_columns.clone();
        let (label, records) = self.dedupe(base);
        debug!("base source '{}': {} rows", label, records.len());
        for (key, record) in records {
            self.push_row(key, &label, &value_columns, record);
        }
    }

    fn push_row(
        &mut self,
        key: JoinKey,
        label: &str,
        value_columns: &[String],
        record: PlayerRecord,
    ) {
        let mut values: BTreeMap<String, Cell> = self
            .table
            .columns
            .iter()
            .map(|c| (c.clone(), Cell::NoData))
            .collect();
        fill_values(&mut values, value_columns, &record);
        self.register_extras(&record);

        let team = key
            .team
            .clone()
            .or_else(|| record.team.as_deref().map(|t| self.options.teams.translate(t)));
        self.keys.insert(key.clone());
        self.table.rows.push(MergedRow {
            team,
            key,
            display_name: record.display_name,
            position: record.position,
            values,
            extras: record.extras,
            sources: BTreeSet::from([label.to_string()]),
            aggregates: None,
        });
    }

    fn register_extras(&mut self, record: &PlayerRecord) {
        for column in record.extras.keys() {
            if !self.table.extra_columns.contains(column) {
                self.table.extra_columns.push(column.clone());
            }
        }
    }

    fn join(&mut self, source: Source) {
        let policy = self.policy_for(&source);
        let value_columns = source.value_columns.clone();
        let (label, records) = self.dedupe(source);

        // Candidate right-hand records by normalized name.
        let mut right_by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, (key, _)) in records.iter().enumerate() {
            right_by_name.entry(key.name.as_str()).or_default().push(i);
        }

        // Rows each right-hand record was applied to.
        let mut applied: Vec<Vec<JoinKey>> = vec![Vec::new(); records.len()];
        let mut matched = 0usize;

        for row_idx in 0..self.table.rows.len() {
            let row_key = &self.table.rows[row_idx].key;
            let Some(candidates) = right_by_name.get(row_key.name.as_str()) else {
                continue;
            };
            let Some(pick) = pick_candidate(row_key, candidates, &records, policy) else {
                continue;
            };
            applied[pick].push(row_key.clone());
            matched += 1;

            let record = &records[pick].1;
            for column in record.extras.keys() {
                if !self.table.extra_columns.contains(column) {
                    self.table.extra_columns.push(column.clone());
                }
            }
            let row = &mut self.table.rows[row_idx];
            fill_values(&mut row.values, &value_columns, record);
            for (k, v) in &record.extras {
                row.extras.entry(k.clone()).or_insert_with(|| v.clone());
            }
            if row.team.is_none() {
                row.team = record.team.as_deref().map(|t| self.options.teams.translate(t));
            }
            if row.position.is_none() {
                row.position = record.position.clone();
            }
            row.sources.insert(label.clone());
        }

        drop(right_by_name);

        for ((key, _), rows) in records.iter().zip(&applied) {
            if rows.len() > 1 {
                warn!(
                    "source '{}': '{}' matched {} rows, applied to all of them",
                    label,
                    key,
                    rows.len()
                );
                self.table.diagnostics.ambiguous.push(AmbiguousMatch {
                    source: label.clone(),
                    key: key.clone(),
                    matched: rows.clone(),
                });
            }
        }

        let mut appended = 0usize;
        if self.options.mode == MergeMode::Outer {
            for (i, (key, record)) in records.into_iter().enumerate() {
                if !applied[i].is_empty() || self.keys.contains(&key) {
                    continue;
                }
                self.push_row(key, &label, &value_columns, record);
                appended += 1;
            }
        }

        debug!(
            "source '{}': matched {} rows, appended {}",
            label, matched, appended
        );
    }

    fn finish(self) -> MergedTable {
        self.table
    }
}

/// Pick the right-hand record for a row. An exact team match wins over a
/// name-only match; rows and records without a team match on name alone.
fn pick_candidate(
    row_key: &JoinKey,
    candidates: &[usize],
    records: &[(JoinKey, PlayerRecord)],
    policy: JoinPolicy,
) -> Option<usize> {
    if policy == JoinPolicy::NameOnly {
        return candidates.first().copied();
    }
    let Some(row_team) = row_key.team.as_deref() else {
        return candidates.first().copied();
    };
    let exact = candidates
        .iter()
        .copied()
        .find(|&i| records[i].0.team.as_deref() == Some(row_team));
    exact.or_else(|| candidates.iter().copied().find(|&i| records[i].0.team.is_none()))
}

fn fill_values(values: &mut BTreeMap<String, Cell>, columns: &[String], record: &PlayerRecord) {
    for column in columns {
        let cell = record.values.get(column).copied().into();
        values.insert(column.clone(), cell);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(label: &str, rows: &[(&str, &str, f64)]) -> Source {
        Source::single(label).with_records(
            rows.iter()
                .map(|(name, team, v)| {
                    PlayerRecord::new(*name).with_team(team).with_value(label, *v)
                })
                .collect(),
        )
    }

    fn ranks(label: &str, rows: &[(&str, f64)]) -> Source {
        Source::single(label).with_records(
            rows.iter()
                .map(|(name, v)| PlayerRecord::new(*name).with_value(label, *v))
                .collect(),
        )
    }

    #[test]
    fn empty_source_list_is_an_error() {
        assert_eq!(
            merge(vec![], &MergeOptions::default()).unwrap_err(),
            ReconcileError::NoSources
        );
    }

    #[test]
    fn duplicate_columns_rejected() {
        let err = merge(
            vec![ranks("eno", &[]), ranks("eno", &[])],
            &MergeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateColumn {
                column: "eno".into(),
                label: "eno".into(),
            }
        );
    }

    #[test]
    fn left_join_keeps_base_rows_only() {
        let a = dollars("steamer", &[("Mike Trout", "LAA", 40.0)]);
        let b = dollars("atc", &[("Mike Trout", "LAA", 38.0), ("Aaron Judge", "NYY", 45.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].value("atc"), Cell::Value(38.0));
        assert!(table.find("Aaron Judge").is_none());
    }

    #[test]
    fn outer_join_appends_new_players() {
        let a = dollars("steamer", &[("Mike Trout", "LAA", 40.0)]);
        let b = dollars("atc", &[("Aaron Judge", "NYY", 45.0)]);
        let table = merge(vec![a, b], &MergeOptions::outer()).unwrap();
        assert_eq!(table.len(), 2);
        let judge = table.find("Aaron Judge").unwrap();
        assert_eq!(judge.value("steamer"), Cell::NoData);
        assert_eq!(judge.value("atc"), Cell::Value(45.0));
    }

    #[test]
    fn team_disambiguates_same_named_players() {
        let a = dollars(
            "steamer",
            &[("Luis Ortiz", "PIT", 5.0), ("Luis L. Ortiz", "CLE", 3.0)],
        );
        let b = dollars("atc", &[("Luis Ortiz", "CLE", 4.0), ("Luis Ortiz", "PIT", 6.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.diagnostics.has_duplicates());
        for row in &table.rows {
            match row.key.team.as_deref() {
                Some("PIT") => assert_eq!(row.value("atc"), Cell::Value(6.0)),
                Some("CLE") => assert_eq!(row.value("atc"), Cell::Value(4.0)),
                other => panic!("unexpected team {other:?}"),
            }
        }
    }

    #[test]
    fn team_codes_translated_before_matching() {
        let a = dollars("steamer", &[("Logan Webb", "SFG", 20.0)]);
        let b = dollars("nfbc", &[("Logan Webb", "SF", 35.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].value("nfbc"), Cell::Value(35.0));
    }

    #[test]
    fn mismatched_teams_do_not_match() {
        let a = dollars("steamer", &[("Will Smith", "LAD", 15.0)]);
        let b = dollars("atc", &[("Will Smith", "KC", 1.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].value("atc"), Cell::NoData);
    }

    #[test]
    fn name_only_source_matches_any_team() {
        let a = dollars("steamer", &[("Mike Trout", "LAA", 40.0)]);
        let b = ranks("eno", &[("Mike Trout", 12.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].value("eno"), Cell::Value(12.0));
        assert!(table.rows[0].sources.contains("eno"));
    }

    #[test]
    fn name_only_policy_ignores_team_mismatch() {
        let a = dollars("steamer", &[("Mike Trout", "LAA", 40.0)]);
        let b = dollars("atc", &[("Mike Trout", "ANA", 38.0)]).with_join(JoinPolicy::NameOnly);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].value("atc"), Cell::Value(38.0));
    }

    #[test]
    fn teamless_record_matching_two_rows_is_reported() {
        let a = dollars("steamer", &[("Luis Ortiz", "PIT", 5.0), ("Luis Ortiz", "CLE", 3.0)]);
        let b = ranks("eno", &[("Luis Ortiz", 7.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();

        assert_eq!(table.len(), 2);
        assert!(!table.diagnostics.has_duplicates());
        assert!(table.diagnostics.has_ambiguous());
        assert!(!table.diagnostics.is_clean());

        let ambiguous = &table.diagnostics.ambiguous[0];
        assert_eq!(ambiguous.source, "eno");
        assert_eq!(ambiguous.key.name, "Luis Ortiz");
        let teams: Vec<Option<&str>> = ambiguous
            .matched
            .iter()
            .map(|k| k.team.as_deref())
            .collect();
        assert_eq!(teams, vec![Some("PIT"), Some("CLE")]);
    }

    #[test]
    fn one_to_one_matches_are_not_ambiguous() {
        let a = dollars("steamer", &[("Mike Trout", "LAA", 40.0), ("Luis Ortiz", "PIT", 5.0)]);
        let b = ranks("eno", &[("Mike Trout", 12.0), ("Luis Ortiz", 30.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert!(table.diagnostics.ambiguous.is_empty());
    }

    #[test]
    fn name_only_rows_show_translated_team() {
        let a = dollars("steamer", &[("Logan Webb", "SF", 20.0)]);
        let b = dollars("atc", &[("Blake Snell", "SD", 18.0)]);
        let options = MergeOptions::outer().with_policy(JoinPolicy::NameOnly);
        let table = merge(vec![a, b], &options).unwrap();
        assert_eq!(table.rows[0].key.team, None);
        assert_eq!(table.rows[0].team.as_deref(), Some("SFG"));
        assert_eq!(table.rows[1].team.as_deref(), Some("SDP"));
    }

    #[test]
    fn names_normalized_across_sources() {
        let a = ranks("pipeline", &[("Jesús Made", 1.0)]);
        let b = ranks("fangraphs", &[("Jesus Made", 3.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].value("fangraphs"), Cell::Value(3.0));
        assert_eq!(table.rows[0].display_name, "Jesús Made");
    }

    #[test]
    fn duplicate_base_keys_reported_and_collapsed() {
        let a = ranks("pipeline", &[("Max Clark", 5.0), ("Max Clark", 9.0)]);
        let table = merge(vec![a], &MergeOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].value("pipeline"), Cell::Value(5.0));
        let dup = &table.diagnostics.duplicates[0];
        assert_eq!(dup.source, "pipeline");
        assert_eq!(dup.key.name, "Max Clark");
        assert_eq!(dup.occurrences, 2);
    }

    #[test]
    fn duplicate_keys_in_later_source_reported() {
        let a = ranks("pipeline", &[("Max Clark", 5.0)]);
        let b = ranks("espn", &[("Max Clark", 7.0), ("Max Clark", 8.0)]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].value("espn"), Cell::Value(7.0));
        assert_eq!(table.diagnostics.duplicates.len(), 1);
        assert_eq!(table.diagnostics.duplicates[0].source, "espn");
    }

    #[test]
    fn rows_without_a_name_are_unmergeable() {
        let a = ranks("pipeline", &[("Max Clark", 5.0), ("  ", 9.0)]);
        let table = merge(vec![a], &MergeOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.diagnostics.unmergeable.len(), 1);
    }

    #[test]
    fn extras_carried_from_first_source_that_has_them() {
        let a = Source::single("pipeline").with_records(vec![PlayerRecord::new("Max Clark")
            .with_value("pipeline", 5.0)
            .with_extra("ETA", "2026")]);
        let b = Source::single("espn").with_records(vec![PlayerRecord::new("Max Clark")
            .with_value("espn", 7.0)
            .with_extra("ETA", "2027")
            .with_extra("Tier", "1")]);
        let table = merge(vec![a, b], &MergeOptions::default()).unwrap();
        assert_eq!(table.rows[0].extra("ETA"), Some("2026"));
        assert_eq!(table.rows[0].extra("Tier"), Some("1"));
        assert_eq!(table.extra_columns, vec!["ETA", "Tier"]);
    }

    #[test]
    fn merged_table_folds_back_into_a_source() {
        let b = ranks("b", &[("X Player", 1.0)]);
        let c = ranks("c", &[("X Player", 2.0)]);
        let bc = merge(vec![b, c], &MergeOptions::default()).unwrap();
        let source = bc.into_source("bc");
        assert_eq!(source.value_columns, vec!["b", "c"]);
        assert_eq!(source.records[0].values.len(), 2);
    }
}
