// Keeper recommendations: the keeper roster joined by name with every
// system's dollar values, priced against each player's keeper cost.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::info;

use scoutsheet_core::{
    write_csv_file, Cell, JoinPolicy, MergeOptions, MergedRow, MergedTable, PlayerRecord, Source,
};
use scoutsheet_fangraphs::Fetcher;

use crate::config::Config;
use crate::pipeline::{combined_values, report_path, SourceSet};
use crate::roster::{load_keepers, KeeperEntry};

pub const ROSTER_LABEL: &str = "roster";
pub const COST_COLUMN: &str = "keeper_cost";
pub const KEEPING_COLUMN: &str = "keeping";
pub const MAX_PROFIT_COLUMN: &str = "max_profit";
pub const RECOMMENDATION_COLUMN: &str = "recommendation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Keep,
    Drop,
    /// No system values the player.
    NoData,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::Keep => "KEEP",
            Recommendation::Drop => "DROP",
            Recommendation::NoData => "No data",
        })
    }
}

/// Roster-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeeperSummary {
    pub threshold: f64,
    pub recommended: usize,
    /// Cost of the players currently designated as keepers.
    pub current_cost: f64,
    pub recommended_cost: f64,
}

impl KeeperSummary {
    pub fn difference(&self) -> f64 {
        self.recommended_cost - self.current_cost
    }
}

impl fmt::Display for KeeperSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Keeper threshold: ${:.1}", self.threshold)?;
        writeln!(f, "Recommended keepers: {}", self.recommended)?;
        writeln!(f, "Current keeper cost: ${:.0}", self.current_cost)?;
        writeln!(f, "Recommended keeper cost: ${:.0}", self.recommended_cost)?;
        write!(f, "Difference: ${:+.0}", self.difference())
    }
}

#[derive(Debug)]
pub struct KeeperReport {
    pub systems: Vec<String>,
    pub table: MergedTable,
    pub summary: KeeperSummary,
    pub path: PathBuf,
}

pub fn profit_column(system: &str) -> String {
    format!("profit_{system}")
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

fn roster_source(entries: &[KeeperEntry]) -> Source {
    let mut source = Source::new(ROSTER_LABEL, vec![COST_COLUMN.to_string()]);
    for entry in entries {
        let mut r = PlayerRecord::new(entry.name.as_str()).with_value(COST_COLUMN, entry.cost);
        if entry.keeping {
            r = r.with_extra(KEEPING_COLUMN, "yes");
        }
        source.push(r);
    }
    source
}

fn recommendation_of(row: &MergedRow) -> Option<Recommendation> {
    match row.extra(RECOMMENDATION_COLUMN)? {
        "KEEP" => Some(Recommendation::Keep),
        "DROP" => Some(Recommendation::Drop),
        _ => Some(Recommendation::NoData),
    }
}

/// Add per-system profit, `max_profit` and a recommendation to every row,
/// then order the table keepers first. Rows keep their roster order within
/// each group.
pub fn price_keepers(table: &mut MergedTable, systems: &[String], threshold: f64) -> KeeperSummary {
    for system in systems {
        table.set_value(&profit_column(system), |row| {
            match (row.value(system), row.value(COST_COLUMN)) {
                (Cell::Value(v), Cell::Value(cost)) => Cell::Value(v - cost),
                _ => Cell::NoData,
            }
        });
    }

    table.set_value(MAX_PROFIT_COLUMN, |row| {
        systems
            .iter()
            .filter_map(|s| row.value(&profit_column(s)).as_f64())
            .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |b| b.max(p))))
            .map(Cell::Value)
            .unwrap_or(Cell::NoData)
    });

    table.set_extra(RECOMMENDATION_COLUMN, |row| {
        let rec = match row.value(MAX_PROFIT_COLUMN).as_f64() {
            Some(p) if p >= threshold => Recommendation::Keep,
            Some(_) => Recommendation::Drop,
            None => Recommendation::NoData,
        };
        Some(rec.to_string())
    });

    table
        .rows
        .sort_by_key(|r| recommendation_of(r) != Some(Recommendation::Keep));

    let mut summary = KeeperSummary {
        threshold,
        ..Default::default()
    };
    for row in &table.rows {
        let cost = row.value(COST_COLUMN).as_f64().unwrap_or(0.0);
        if row.extra(KEEPING_COLUMN).is_some() {
            summary.current_cost += cost;
        }
        if recommendation_of(row) == Some(Recommendation::Keep) {
            summary.recommended += 1;
            summary.recommended_cost += cost;
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Join every system's hitter and pitcher values onto the keeper roster and
/// price it. `threshold` overrides the configured one.
pub async fn keepers(
    config: &Config,
    fetcher: &Fetcher,
    date: NaiveDate,
    threshold: Option<f64>,
) -> Result<KeeperReport> {
    let threshold = threshold.unwrap_or(config.keepers.threshold);
    let league_name = &config.keepers.league;
    let league = config.league(league_name)?;

    let roster_path = config.input_dir().join(&config.keepers.roster);
    let entries = load_keepers(&roster_path)
        .with_context(|| format!("failed to load keeper roster {}", roster_path.display()))?;
    if entries.is_empty() {
        bail!("keeper roster {} is empty", roster_path.display());
    }
    info!("pricing {} rostered players", entries.len());

    let mut set = SourceSet::default();
    set.push(roster_source(&entries));

    let mut systems = Vec::new();
    for system in &config.projections.systems {
        match combined_values(fetcher, league_name, league, config.season, system).await {
            Ok(source) => {
                systems.push(system.clone());
                set.push(source);
            }
            Err(e) => set.skip(system.clone(), e),
        }
    }
    if systems.is_empty() {
        bail!("no projection system values could be fetched");
    }

    let mut table = set.merge(&MergeOptions::default().with_policy(JoinPolicy::NameOnly))?;
    let summary = price_keepers(&mut table, &systems, threshold);

    let path = report_path(&config.output_dir(), date, "keepers");
    write_csv_file(&table, &path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote keeper report to {}", path.display());

    Ok(KeeperReport {
        systems,
        table,
        summary,
        path,
    })
}
