// Prospect rankings: one base list joined by name with every ranking list,
// aggregated as ranks (lower is better), with taken players flagged.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use scoutsheet_core::{
    aggregate, sort_table, write_csv_file, Better, JoinPolicy, MergeOptions, MergedTable,
    PlayerRecord, SortKey, SortOrder, Source,
};

use crate::config::Config;
use crate::pipeline::{report_path, SourceSet};
use crate::rankings::{csv_error, load_ranking, open, LoadError, RankingSource};
use crate::roster::load_taken;

pub const BASE_LABEL: &str = "prospects";
pub const TAKEN_COLUMN: &str = "taken";
pub const ETA_COLUMN: &str = "ETA";

#[derive(Debug, Clone)]
pub struct ProspectOptions {
    pub date: NaiveDate,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ProspectOptions {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            sort: SortKey::Average,
            order: SortOrder::Ascending,
        }
    }
}

#[derive(Debug)]
pub struct ProspectReport {
    /// Rank columns the aggregates were computed over.
    pub ranked_by: Vec<String>,
    pub table: MergedTable,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Base list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawProspect {
    Name: String,
    #[serde(default)]
    Pos: String,
    #[serde(default)]
    ETA: String,
    #[serde(default)]
    Team: String,
}

fn load_base_from_reader<R: Read>(rdr: R) -> Result<Source, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut source = Source::new(BASE_LABEL, Vec::new());
    for result in reader.deserialize::<RawProspect>() {
        match result {
            Ok(raw) => {
                let mut r = PlayerRecord::new(raw.Name.trim())
                    .with_team(&raw.Team)
                    .with_position(&raw.Pos);
                if !raw.ETA.trim().is_empty() {
                    r = r.with_extra(ETA_COLUMN, raw.ETA.trim());
                }
                source.push(r);
            }
            Err(e) => warn!("skipping malformed prospect row: {}", e),
        }
    }
    Ok(source)
}

/// Base prospect list (`Name,Pos,ETA,Team`).
pub fn load_base(path: &Path) -> Result<Source, LoadError> {
    load_base_from_reader(open(path)?).map_err(csv_error(path))
}

/// ETA as a whole year; missing or unreadable values become `0`.
fn eta_year(raw: Option<&str>) -> String {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| (v.trunc() as i64).to_string())
        .unwrap_or_else(|| "0".to_string())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub fn prospects(config: &Config, options: &ProspectOptions) -> Result<ProspectReport> {
    let dir = config.season_input_dir();
    let prospects = &config.prospects;

    let base_path = dir.join(&prospects.base);
    let base = load_base(&base_path)
        .with_context(|| format!("failed to load prospect list {}", base_path.display()))?;
    info!("{} prospects in {}", base.len(), base_path.display());

    let mut set = SourceSet::default();
    set.push(base);
    for name in &prospects.sources {
        let ranking = RankingSource::name_rank(name.clone(), format!("{name}.csv"));
        match load_ranking(&dir, &ranking) {
            Ok(source) => set.push(source),
            Err(e) if e.is_not_found() => set.skip(name.clone(), "file not found"),
            Err(e) => set.skip(name.clone(), e),
        }
    }

    let options_merge = MergeOptions::default().with_policy(JoinPolicy::NameOnly);
    let mut table = set.merge(&options_merge)?;

    let ranked_by: Vec<String> = prospects
        .average_over
        .iter()
        .filter(|c| table.has_column(c))
        .cloned()
        .collect();
    if ranked_by.is_empty() {
        bail!(
            "none of the ranking lists {:?} could be loaded from {}",
            prospects.average_over,
            dir.display()
        );
    }

    if let Some(file) = &prospects.taken_players {
        match load_taken(&dir.join(file)) {
            Ok(taken) => {
                table.set_extra(TAKEN_COLUMN, |r| {
                    taken.contains(&r.key.name).then(|| "X".to_string())
                });
            }
            Err(e) => {
                warn!("not marking taken prospects: {}", e);
                table.note_skipped(TAKEN_COLUMN);
            }
        }
    }

    let mut table = aggregate(table, &ranked_by, Better::Min)?;
    table.set_extra(ETA_COLUMN, |r| Some(eta_year(r.extra(ETA_COLUMN))));

    sort_table(&mut table, &options.sort, options.order)?;

    let path = report_path(&config.output_dir(), options.date, "prospects");
    write_csv_file(&table, &path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} ranked prospects to {}", table.len(), path.display());

    Ok(ProspectReport {
        ranked_by,
        table,
        path,
    })
}
