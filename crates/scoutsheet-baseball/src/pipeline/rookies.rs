// Rookie-draft comparison: every configured ranking list unioned by name,
// narrowed to the league's available players and sorted by one list with
// unranked players last.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::info;

use scoutsheet_core::{
    sort_table, write_csv_file, JoinPolicy, MergeOptions, MergedTable, SortKey, SortOrder,
};

use crate::config::{Config, RookiesConfig};
use crate::pipeline::{report_path, sort_key_for, SourceSet};
use crate::rankings::load_ranking;
use crate::roster::load_available;

#[derive(Debug)]
pub struct RookieReport {
    pub league: String,
    /// Lists that loaded, in configured order.
    pub lists: Vec<String>,
    pub table: MergedTable,
    pub path: PathBuf,
}

fn rookies_config(config: &Config) -> Result<&RookiesConfig> {
    match &config.rookies {
        Some(rookies) => Ok(rookies),
        None => bail!("no [rookies] section in the config"),
    }
}

pub fn rookies(
    config: &Config,
    league: Option<&str>,
    sort: Option<&SortKey>,
    date: NaiveDate,
) -> Result<RookieReport> {
    let rookies = rookies_config(config)?;
    let league_name = league.unwrap_or(rookies.league.as_str());
    let league = config.league(league_name)?;
    let Some(available_file) = &league.available_players else {
        bail!("league `{league_name}` has no available_players list");
    };

    let dir = config.season_input_dir();
    let mut set = SourceSet::default();
    for list in &rookies.lists {
        match load_ranking(&dir, list) {
            Ok(source) => set.push(source),
            Err(e) if e.is_not_found() => set.skip(list.label.clone(), "file not found"),
            Err(e) => set.skip(list.label.clone(), e),
        }
    }
    if set.is_empty() {
        bail!("none of the rookie lists could be loaded from {}", dir.display());
    }
    let lists = set.labels();

    let options = MergeOptions::outer()
        .with_policy(JoinPolicy::NameOnly)
        .with_teams(config.team_map()?);
    let mut table = set.merge(&options)?;

    let available_path = config.input_dir().join(available_file);
    let available = load_available(&available_path)
        .with_context(|| format!("failed to load {}", available_path.display()))?;
    let names: HashSet<String> = available
        .records
        .into_iter()
        .map(|r| r.normalized_name)
        .collect();
    let ranked = table.len();
    table.retain(|row| names.contains(&row.key.name));
    info!(
        "{} of {} ranked rookies are available in {}",
        table.len(),
        ranked,
        league_name
    );

    let requested = match (sort, &rookies.sort) {
        (Some(key), _) => key.clone(),
        (None, Some(column)) => SortKey::Column(column.clone()),
        (None, None) => SortKey::Column(lists[0].clone()),
    };
    let key = sort_key_for(&table, &requested, SortKey::Column(lists[0].clone()));
    sort_table(&mut table, &key, SortOrder::Ascending)?;

    let path = report_path(
        &config.output_dir(),
        date,
        &format!("{league_name}_rookies"),
    );
    write_csv_file(&table, &path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} rookies to {}", table.len(), path.display());

    Ok(RookieReport {
        league: league_name.to_string(),
        lists,
        table,
        path,
    })
}
