// Report pipelines. Each one is a particular choice of sources, join policy
// and aggregate semantics over the shared reconciler.

pub mod budget;
pub mod combine;
pub mod evaluate;
pub mod keepers;
pub mod prospects;
pub mod rookies;

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use scoutsheet_core::{merge, MergeOptions, MergedTable, ReconcileError, SortKey, Source};
use scoutsheet_fangraphs::payload::{auction_source, rater_source};
use scoutsheet_fangraphs::{FetchError, Fetcher, Request};

use crate::config::LeagueConfig;
use crate::roster::Side;

/// `{dir}/{date}_{stem}.csv`
pub fn report_path(dir: &Path, date: NaiveDate, stem: &str) -> PathBuf {
    dir.join(format!("{}_{stem}.csv", date.format("%Y-%m-%d")))
}

// ---------------------------------------------------------------------------
// Source collection
// ---------------------------------------------------------------------------

/// Sources gathered for one merge, plus the ones that could not be loaded.
#[derive(Debug, Default)]
pub(crate) struct SourceSet {
    sources: Vec<Source>,
    skipped: Vec<String>,
}

impl SourceSet {
    pub fn push(&mut self, source: Source) {
        self.sources.push(source);
    }

    pub fn skip(&mut self, label: impl Into<String>, reason: impl Display) {
        let label = label.into();
        warn!("skipping source '{}': {}", label, reason);
        self.skipped.push(label);
    }

    pub fn labels(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.label.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Merge the gathered sources, recording the skipped ones on the table.
    pub fn merge(self, options: &MergeOptions) -> Result<MergedTable, ReconcileError> {
        let mut table = merge(self.sources, options)?;
        for label in self.skipped {
            table.note_skipped(label);
        }
        info!(
            "merged {} rows x {} columns ({} duplicate keys, {} ambiguous, {} unmergeable rows)",
            table.len(),
            table.columns.len(),
            table.diagnostics.duplicates.len(),
            table.diagnostics.ambiguous.len(),
            table.diagnostics.unmergeable.len()
        );
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Dollar values
// ---------------------------------------------------------------------------

/// Dollar values for one system and side.
///
/// Preseason systems come from the auction calculator priced for the league.
/// Rest-of-season systems come from the player rater, which mixes hitters
/// and pitchers, so its rows are filtered by position.
pub(crate) async fn value_source(
    fetcher: &Fetcher,
    league_name: &str,
    league: &LeagueConfig,
    season: i32,
    system: &str,
    side: Side,
    ros: bool,
) -> Result<Source, FetchError> {
    if ros {
        return rater_for_side(fetcher, system, season, side).await;
    }
    let payload = fetcher
        .get(&Request::Auction {
            league: league_name.to_string(),
            settings: league.auction.clone(),
            system: system.to_string(),
            player_type: side.player_type(),
        })
        .await?;
    auction_source(&payload, system)
}

/// Hitter and pitcher auction values for `system` stacked into one source.
pub(crate) async fn combined_values(
    fetcher: &Fetcher,
    league_name: &str,
    league: &LeagueConfig,
    season: i32,
    system: &str,
) -> Result<Source, FetchError> {
    let mut combined = Source::single(system);
    for side in Side::BOTH {
        let source = value_source(fetcher, league_name, league, season, system, side, false).await?;
        combined.records.extend(source.records);
    }
    Ok(combined)
}

/// Player-rater dollars for `timeframe`, restricted to `side`.
pub(crate) async fn rater_for_side(
    fetcher: &Fetcher,
    timeframe: &str,
    season: i32,
    side: Side,
) -> Result<Source, FetchError> {
    let payload = fetcher
        .get(&Request::PlayerRater {
            timeframe: timeframe.to_string(),
            season,
        })
        .await?;
    let mut source = rater_source(&payload, timeframe)?;
    source
        .records
        .retain(|r| side.matches_position(r.position.as_deref()));
    Ok(source)
}

/// Fall back to `fallback` when sorting by a column this table doesn't have
/// (e.g. a pitcher-only ranking on the hitters table).
pub(crate) fn sort_key_for(table: &MergedTable, requested: &SortKey, fallback: SortKey) -> SortKey {
    match requested {
        SortKey::Column(c) if !table.has_column(c) => {
            warn!("no `{}` column to sort by, using {:?}", c, fallback);
            fallback
        }
        other => other.clone(),
    }
}
