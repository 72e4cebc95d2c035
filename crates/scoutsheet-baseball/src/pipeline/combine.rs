// All projection systems' dollar values side by side, hitters and pitchers
// together, joined by name so nobody valued by any system is dropped.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use scoutsheet_core::{
    sort_table, write_csv_file, JoinPolicy, MergeOptions, MergedTable, SortKey, SortOrder,
};
use scoutsheet_fangraphs::Fetcher;

use crate::config::Config;
use crate::pipeline::{combined_values, report_path, sort_key_for, SourceSet};

#[derive(Debug)]
pub struct CombinedValues {
    pub systems: Vec<String>,
    pub table: MergedTable,
    pub path: PathBuf,
}

impl CombinedValues {
    /// One line per duplicated name: source, key and the colliding display
    /// names.
    pub fn duplicate_lines(&self) -> Vec<String> {
        self.table
            .diagnostics
            .duplicates
            .iter()
            .map(|d| {
                format!(
                    "{}: {} x{} ({})",
                    d.source,
                    d.key,
                    d.occurrences,
                    d.display_names.join(", ")
                )
            })
            .collect()
    }
}

/// Outer-merge every configured system for `league`. Sorted by `sort`, or by
/// the first system's value when `sort` is `None`.
pub async fn combine(
    config: &Config,
    fetcher: &Fetcher,
    league_name: &str,
    date: NaiveDate,
    sort: Option<&SortKey>,
) -> Result<CombinedValues> {
    let league = config.league(league_name)?;

    let mut set = SourceSet::default();
    for system in &config.projections.systems {
        match combined_values(fetcher, league_name, league, config.season, system).await {
            Ok(source) => set.push(source),
            Err(e) => set.skip(system.clone(), e),
        }
    }
    let systems = set.labels();
    let Some(first) = systems.first().cloned() else {
        bail!("no projection system values could be fetched");
    };

    let options = MergeOptions::outer().with_policy(JoinPolicy::NameOnly);
    let mut table = set.merge(&options)?;

    if table.diagnostics.has_duplicates() {
        warn!(
            "{} duplicated player names across systems",
            table.diagnostics.duplicates.len()
        );
    } else {
        info!("no duplicated player names found");
    }

    let default_key = SortKey::Column(first);
    let key = match sort {
        Some(requested) => sort_key_for(&table, requested, default_key),
        None => default_key,
    };
    sort_table(&mut table, &key, SortOrder::Descending)?;

    let path = report_path(&config.output_dir(), date, "all_values");
    write_csv_file(&table, &path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} players to {}", table.len(), path.display());

    Ok(CombinedValues {
        systems,
        table,
        path,
    })
}
