// Player evaluation: dollar values from every projection system for one
// league, enriched with recent form, projected stats, leaderboards and local
// rankings, optionally narrowed to the league's available players.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

use scoutsheet_core::{
    aggregate, sort_table, write_csv_file, Better, MergeOptions, MergedTable, SortKey, SortOrder,
    AVERAGE_COLUMN, BEST_COLUMN,
};
use scoutsheet_fangraphs::payload::{leaderboard_source, projection_source};
use scoutsheet_fangraphs::{Fetcher, LeaderboardKind, Request};

use crate::config::{Config, LeagueConfig};
use crate::pipeline::{rater_for_side, report_path, sort_key_for, value_source, SourceSet};
use crate::rankings::{load_ranking, AppliesTo, RankingSource};
use crate::roster::{load_available, Side, AVAILABLE_LABEL};

/// Blank column for ticking players off by hand during a draft.
pub const DRAFTED_COLUMN: &str = "is_drafted";

#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub league: String,
    /// Add the league's draft rankings and the `is_drafted` column.
    pub draft: bool,
    /// Use rest-of-season systems instead of preseason ones.
    pub ros: bool,
    /// Report date; also the end of the "last month" leaderboard window.
    pub date: NaiveDate,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl EvaluateOptions {
    pub fn new(league: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            league: league.into(),
            draft: false,
            ros: false,
            date,
            sort: SortKey::Best,
            order: SortOrder::Descending,
        }
    }
}

/// One evaluated table and where it was written.
#[derive(Debug)]
pub struct Evaluation {
    pub side: Side,
    pub systems: Vec<String>,
    pub table: MergedTable,
    pub path: PathBuf,
}

/// Evaluate hitters then pitchers for `options.league`, writing one report
/// per side.
pub async fn evaluate(
    config: &Config,
    fetcher: &Fetcher,
    options: &EvaluateOptions,
) -> Result<Vec<Evaluation>> {
    let league = config.league(&options.league)?;
    let systems = if options.ros {
        &config.projections.ros_systems
    } else {
        &config.projections.systems
    };
    if systems.is_empty() {
        bail!(
            "no {} projection systems configured",
            if options.ros { "rest-of-season" } else { "preseason" }
        );
    }

    let mut out = Vec::with_capacity(Side::BOTH.len());
    for side in Side::BOTH {
        let evaluation = evaluate_side(config, fetcher, options, league, systems, side)
            .await
            .with_context(|| format!("failed to evaluate {side} for league {}", options.league))?;
        out.push(evaluation);
    }
    Ok(out)
}

async fn evaluate_side(
    config: &Config,
    fetcher: &Fetcher,
    options: &EvaluateOptions,
    league: &LeagueConfig,
    systems: &[String],
    side: Side,
) -> Result<Evaluation> {
    info!("evaluating {} for league {}", side, options.league);
    let mut set = SourceSet::default();

    // Dollar values, one column per system. The first system that loads is
    // the base, so every reported player has at least one value.
    for system in systems {
        match value_source(
            fetcher,
            &options.league,
            league,
            config.season,
            system,
            side,
            options.ros,
        )
        .await
        {
            Ok(source) => set.push(source),
            Err(e) => set.skip(system.clone(), e),
        }
    }
    let loaded_systems = set.labels();
    if loaded_systems.is_empty() {
        bail!("no {side} dollar values could be fetched");
    }

    // Recent form. Empty or failing outside the season.
    let timeframe = &config.projections.rater_timeframe;
    if !options.ros && !systems.contains(timeframe) {
        match rater_for_side(fetcher, timeframe, config.season, side).await {
            Ok(source) if !source.is_empty() => set.push(source),
            Ok(_) => set.skip(timeframe.clone(), "no player-rater data"),
            Err(e) => set.skip(timeframe.clone(), e),
        }
    }

    add_projected_stats(config, fetcher, side, &mut set).await;
    add_leaderboards(config, fetcher, options.date, side, &mut set).await;
    add_rankings(config, league, options.draft, side, &mut set);

    let filter_available = match &league.available_players {
        Some(file) => match load_available(&config.input_dir().join(file)) {
            Ok(source) => {
                set.push(source);
                true
            }
            Err(e) => {
                set.skip(AVAILABLE_LABEL, e);
                false
            }
        },
        None => false,
    };

    let options_merge = MergeOptions::default().with_teams(config.team_map()?);
    let mut table = set.merge(&options_merge)?;

    if filter_available {
        let before = table.len();
        table.retain(|r| r.sources.contains(AVAILABLE_LABEL));
        info!(
            "availability filter kept {} of {} {}",
            table.len(),
            before,
            side
        );
    }

    let mut table = aggregate(table, &loaded_systems, Better::Max)?;

    if options.draft {
        table.set_extra(DRAFTED_COLUMN, |_| Some(String::new()));
    }

    let key = sort_key_for(&table, &options.sort, SortKey::Best);
    sort_table(&mut table, &key, options.order)?;

    let stem = format!("{}_{}", options.league, side);
    let path = report_path(&config.output_dir(), options.date, &stem);
    write_csv_file(&table, &path).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} {} to {}", table.len(), side, path.display());

    Ok(Evaluation {
        side,
        systems: loaded_systems,
        table,
        path,
    })
}

async fn add_projected_stats(config: &Config, fetcher: &Fetcher, side: Side, set: &mut SourceSet) {
    let stats = match side {
        Side::Hitters => &config.projections.hitter_stats,
        Side::Pitchers => &config.projections.pitcher_stats,
    };
    if stats.is_empty() {
        return;
    }
    let system = &config.projections.stats_system;
    let label = format!("{system}_stats");
    let request = Request::Projections {
        system: system.clone(),
        player_type: side.player_type(),
    };
    match fetcher.get(&request).await {
        Ok(payload) => match projection_source(&payload, &label, stats) {
            Ok(source) => set.push(source),
            Err(e) => set.skip(label, e),
        },
        Err(e) => set.skip(label, e),
    }
}

/// Hitters get batted-ball quality; pitchers get pitch quality for the season
/// and for the 30 days ending `date`.
async fn add_leaderboards(
    config: &Config,
    fetcher: &Fetcher,
    date: NaiveDate,
    side: Side,
    set: &mut SourceSet,
) {
    let boards: &[(LeaderboardKind, bool)] = match side {
        Side::Hitters => &[(LeaderboardKind::StatcastBatters, false)],
        Side::Pitchers => &[
            (LeaderboardKind::StuffPlus, false),
            (LeaderboardKind::StuffPlus, true),
        ],
    };
    for &(kind, last_month) in boards {
        let request = Request::Leaderboard {
            kind,
            season: config.season,
            window_end: last_month.then_some(date),
        };
        let label = request.cache_key();
        match fetcher.get(&request).await {
            Ok(payload) => match leaderboard_source(&payload, kind, last_month) {
                Ok(Some(source)) => set.push(source),
                Ok(None) => set.skip(label, "leaderboard unavailable"),
                Err(e) => set.skip(label, e),
            },
            Err(e) => set.skip(label, e),
        }
    }
}

fn applies(ranking: &RankingSource, side: Side) -> bool {
    matches!(
        (ranking.players, side),
        (AppliesTo::All, _)
            | (AppliesTo::Hitters, Side::Hitters)
            | (AppliesTo::Pitchers, Side::Pitchers)
    )
}

/// Local rankings for `side`. Rankings that some league lists under
/// `draft_rankings` join only that league's sheets, and only with `draft`.
fn add_rankings(
    config: &Config,
    league: &LeagueConfig,
    draft: bool,
    side: Side,
    set: &mut SourceSet,
) {
    let dir = config.input_dir();
    for ranking in config.rankings.iter().filter(|r| applies(r, side)) {
        let is_draft_ranking = league.draft_rankings.contains(&ranking.label);
        let other_leagues_draft = config
            .leagues
            .values()
            .any(|l| l.draft_rankings.contains(&ranking.label));
        if is_draft_ranking && !draft {
            debug!("ranking '{}' only joins draft sheets", ranking.label);
            continue;
        }
        if !is_draft_ranking && other_leagues_draft {
            continue;
        }
        match load_ranking(&dir, ranking) {
            Ok(source) => set.push(source),
            Err(e) if e.is_not_found() => set.skip(ranking.label.clone(), "file not found"),
            Err(e) => set.skip(ranking.label.clone(), e),
        }
    }
}

/// Columns a hitters or pitchers evaluation shows on the console.
pub fn summary_columns(evaluation: &Evaluation) -> Vec<String> {
    let mut cols: Vec<String> = evaluation.systems.clone();
    cols.extend([BEST_COLUMN, AVERAGE_COLUMN].map(String::from));
    cols
}
