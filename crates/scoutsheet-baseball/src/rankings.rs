// Locally maintained ranking CSVs (ADP, expert rankings, reliever tiers, ...).
//
// Every file has a header row but column names differ per publisher, so each
// file is described by a `RankingSource` that says which column holds the
// name, the value and (optionally) the team.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use scoutsheet_core::{normalize_name, swap_last_first, PlayerRecord, Source};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no `{column}` column")]
    MissingColumn { path: String, column: String },
}

impl LoadError {
    /// The file simply isn't there (as opposed to being unreadable or
    /// malformed).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoadError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

pub(crate) fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub(crate) fn csv_error(path: &Path) -> impl Fn(csv::Error) -> LoadError + '_ {
    move |e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

// ---------------------------------------------------------------------------
// Source description
// ---------------------------------------------------------------------------

/// How player names are written in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFormat {
    /// "Francisco Lindor"
    #[default]
    FirstLast,
    /// "Lindor, Francisco"
    LastFirst,
}

/// What the value column of a ranking source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    /// A numeric column read as-is.
    #[default]
    Column,
    /// The number of rows naming the player (e.g. how many experts rostered
    /// him in a model portfolio).
    Count,
}

/// Which evaluation tables a ranking applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliesTo {
    #[default]
    All,
    Hitters,
    Pitchers,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankingSource {
    /// Column name in the report; must be unique.
    pub label: String,
    /// File name relative to the input directory.
    pub file: String,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
    #[serde(default)]
    pub team_column: Option<String>,
    #[serde(default)]
    pub name_format: NameFormat,
    #[serde(default)]
    pub mode: ValueMode,
    #[serde(default)]
    pub players: AppliesTo,
    /// Text columns carried through to the report.
    #[serde(default)]
    pub extra_columns: Vec<String>,
    /// Field delimiter; defaults to tab for `.tsv` files and comma otherwise.
    #[serde(default)]
    pub delimiter: Option<char>,
}

fn default_name_column() -> String {
    "Player".into()
}

fn default_value_column() -> String {
    "Rank".into()
}

impl RankingSource {
    /// A `Name,Rank` file labelled `label`, the layout prospect lists use.
    pub fn name_rank(label: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            file: file.into(),
            name_column: "Name".into(),
            value_column: "Rank".into(),
            team_column: None,
            name_format: NameFormat::FirstLast,
            mode: ValueMode::Column,
            players: AppliesTo::All,
            extra_columns: Vec::new(),
            delimiter: None,
        }
    }

    fn delimiter_byte(&self) -> u8 {
        match self.delimiter {
            Some(c) if c.is_ascii() => c as u8,
            Some(c) => {
                warn!("ranking '{}': non-ASCII delimiter {:?}, using ','", self.label, c);
                b','
            }
            None if self.file.to_ascii_lowercase().ends_with(".tsv") => b'\t',
            None => b',',
        }
    }

    fn display_name(&self, raw: &str) -> String {
        match self.name_format {
            NameFormat::FirstLast => raw.trim().to_string(),
            NameFormat::LastFirst => swap_last_first(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn load_ranking_from_reader<R: Read>(rdr: R, ranking: &RankingSource) -> Result<Source, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(ranking.delimiter_byte())
        .flexible(true)
        .from_reader(rdr);
    let headers = reader.headers().map_err(csv_error(Path::new(&ranking.file)))?.clone();

    let missing = |column: &str| LoadError::MissingColumn {
        path: ranking.file.clone(),
        column: column.to_string(),
    };
    let name_idx = column_index(&headers, &ranking.name_column)
        .ok_or_else(|| missing(&ranking.name_column))?;
    let value_idx = match ranking.mode {
        ValueMode::Column => {
            let idx = column_index(&headers, &ranking.value_column)
                .ok_or_else(|| missing(&ranking.value_column))?;
            Some(idx)
        }
        ValueMode::Count => None,
    };
    let team_idx = match &ranking.team_column {
        Some(col) => Some(column_index(&headers, col).ok_or_else(|| missing(col))?),
        None => None,
    };
    let extras: Vec<(String, usize)> = ranking
        .extra_columns
        .iter()
        .filter_map(|col| match column_index(&headers, col) {
            Some(i) => Some((col.clone(), i)),
            None => {
                warn!("ranking '{}': no `{}` column, skipping it", ranking.label, col);
                None
            }
        })
        .collect();

    let mut source = Source::single(ranking.label.clone());
    let mut counts: HashMap<String, usize> = HashMap::new();

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("ranking '{}': skipping malformed row {}: {}", ranking.label, line + 2, e);
                continue;
            }
        };
        let Some(raw_name) = record.get(name_idx) else {
            warn!("ranking '{}': row {} has no name field", ranking.label, line + 2);
            continue;
        };
        let name = ranking.display_name(raw_name);

        if ranking.mode == ValueMode::Count {
            let key = normalize_name(&name);
            let seen = counts.entry(key).or_insert(0);
            *seen += 1;
            if *seen > 1 {
                continue;
            }
        }

        let mut r = PlayerRecord::new(name);
        if let Some(team) = team_idx.and_then(|i| record.get(i)) {
            r = r.with_team(team);
        }
        if let Some(v) = value_idx
            .and_then(|i| record.get(i))
            .and_then(|s| s.trim().parse::<f64>().ok())
        {
            r = r.with_value(ranking.label.clone(), v);
        }
        for (col, i) in &extras {
            if let Some(v) = record.get(*i).map(str::trim).filter(|v| !v.is_empty()) {
                r = r.with_extra(col.clone(), v);
            }
        }
        source.push(r);
    }

    if ranking.mode == ValueMode::Count {
        for r in &mut source.records {
            let n = counts.get(&r.normalized_name).copied().unwrap_or(0);
            r.values.insert(ranking.label.clone(), n as f64);
        }
    }

    debug!("ranking '{}': {} players", ranking.label, source.len());
    Ok(source)
}

/// Load the ranking file described by `ranking` from `dir`.
pub fn load_ranking(dir: &Path, ranking: &RankingSource) -> Result<Source, LoadError> {
    let path = dir.join(&ranking.file);
    let file = open(&path)?;
    load_ranking_from_reader(file, ranking).map_err(|e| match e {
        LoadError::Csv { source, .. } => LoadError::Csv {
            path: path.display().to_string(),
            source,
        },
        LoadError::MissingColumn { column, .. } => LoadError::MissingColumn {
            path: path.display().to_string(),
            column,
        },
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(label: &str) -> RankingSource {
        RankingSource {
            label: label.into(),
            file: format!("{label}.csv"),
            name_column: "Player".into(),
            value_column: "Rank".into(),
            team_column: None,
            name_format: NameFormat::FirstLast,
            mode: ValueMode::Column,
            players: AppliesTo::All,
            extra_columns: vec![],
            delimiter: None,
        }
    }

    fn value(source: &Source, idx: usize) -> Option<f64> {
        source.records[idx].values.get(&source.label).copied()
    }

    #[test]
    fn plain_rank_file() {
        let csv_data = "\
Player,Rank,Notes
Tarik Skubal,1,ace
Paul Skenes,2,";
        let source = load_ranking_from_reader(csv_data.as_bytes(), &ranking("eno")).unwrap();
        assert_eq!(source.value_columns, vec!["eno"]);
        assert_eq!(source.len(), 2);
        assert_eq!(source.records[1].display_name, "Paul Skenes");
        assert_eq!(value(&source, 1), Some(2.0));
    }

    #[test]
    fn last_first_names_with_team_from_tsv() {
        let tsv = "Rank\tPlayer\tTeam\n1\tJudge, Aaron\tNYY\n2\tGuerrero Jr., Vladimir\tTOR\n";
        let mut s = ranking("NFBC_ADP");
        s.file = "nfbc_adp.tsv".into();
        s.team_column = Some("Team".into());
        s.name_format = NameFormat::LastFirst;
        let source = load_ranking_from_reader(tsv.as_bytes(), &s).unwrap();
        assert_eq!(source.records[0].display_name, "Aaron Judge");
        assert_eq!(source.records[0].team.as_deref(), Some("NYY"));
        assert_eq!(source.records[1].normalized_name, "Vladimir Guerrero");
    }

    #[test]
    fn count_mode_counts_rows_per_player() {
        let csv_data = "\
Player,Expert
Bobby Witt Jr.,A
Gunnar Henderson,A
Bobby Witt Jr.,B
Bobby Witt,C";
        let mut s = ranking("bp_expert_count");
        s.mode = ValueMode::Count;
        let source = load_ranking_from_reader(csv_data.as_bytes(), &s).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.records[0].display_name, "Bobby Witt Jr.");
        assert_eq!(value(&source, 0), Some(3.0));
        assert_eq!(value(&source, 1), Some(1.0));
    }

    #[test]
    fn extra_columns_carried() {
        let csv_data = "\
Player,Rank,Tier
Edwin Diaz,1,1
Mason Miller,2,";
        let mut s = ranking("closermonkey rank");
        s.extra_columns = vec!["Tier".into(), "Nope".into()];
        let source = load_ranking_from_reader(csv_data.as_bytes(), &s).unwrap();
        assert_eq!(source.records[0].extras.get("Tier").map(String::as_str), Some("1"));
        assert!(source.records[1].extras.is_empty());
    }

    #[test]
    fn unparsable_value_leaves_no_data() {
        let csv_data = "\
Player,Rank
Tarik Skubal,NR";
        let source = load_ranking_from_reader(csv_data.as_bytes(), &ranking("eno")).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(value(&source, 0), None);
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let csv_data = "\
Name,Rank
Tarik Skubal,1";
        let err = load_ranking_from_reader(csv_data.as_bytes(), &ranking("eno")).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column, .. } if column == "Player"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ranking(dir.path(), &ranking("eno")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn file_loads_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("espn.csv"), "Name,Rank\nMax Clark,4\n").unwrap();
        let espn = RankingSource::name_rank("espn", "espn.csv");
        let source = load_ranking(dir.path(), &espn).unwrap();
        assert_eq!(value(&source, 0), Some(4.0));
    }
}
