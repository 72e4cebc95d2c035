// scoutsheet entry point.
//
// 1. Initialize tracing (stderr; stdout carries the reports)
// 2. Resolve the project directory and load config
// 3. Build the fetcher (HTTP client + on-disk payload cache)
// 4. Run the requested pipeline and print its summary

mod cli;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use scoutsheet_baseball::pipeline::budget::budget;
use scoutsheet_baseball::pipeline::combine::combine;
use scoutsheet_baseball::pipeline::evaluate::{evaluate, summary_columns, EvaluateOptions};
use scoutsheet_baseball::pipeline::keepers::{
    keepers, profit_column, MAX_PROFIT_COLUMN, RECOMMENDATION_COLUMN,
};
use scoutsheet_baseball::pipeline::prospects::{prospects, ProspectOptions, TAKEN_COLUMN};
use scoutsheet_baseball::pipeline::rookies::rookies;
use scoutsheet_baseball::{load_config, Config};
use scoutsheet_core::{render_top, SortOrder, AVERAGE_COLUMN};
use scoutsheet_fangraphs::{FangraphsClient, FetchCache, Fetcher};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve working directory")?,
    };
    let config = load_config(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: season {}, {} leagues, systems {:?}",
        config.season,
        config.leagues.len(),
        config.projections.systems
    );

    let today = Local::now().date_naive();

    match cli.command {
        Command::Evaluate {
            league,
            draft,
            ros,
            use_cache,
            sort,
            ascending,
            top,
            strict,
        } => {
            let fetcher = build_fetcher(&config, use_cache)?;
            let options = EvaluateOptions {
                league,
                draft,
                ros,
                date: today,
                sort,
                order: if ascending {
                    SortOrder::Ascending
                } else {
                    SortOrder::Descending
                },
            };
            let evaluations = evaluate(&config, &fetcher, &options).await?;

            let mut flagged = 0;
            for evaluation in &evaluations {
                println!(
                    "== {} {} ({} players) -> {}",
                    options.league,
                    evaluation.side,
                    evaluation.table.len(),
                    evaluation.path.display()
                );
                println!(
                    "{}",
                    render_top(&evaluation.table, top, &summary_columns(evaluation))
                );
                for dup in &evaluation.table.diagnostics.duplicates {
                    warn!(
                        "{} lists {} {} times",
                        dup.source, dup.key, dup.occurrences
                    );
                }
                for amb in &evaluation.table.diagnostics.ambiguous {
                    warn!(
                        "{} row {} matched {} players",
                        amb.source,
                        amb.key,
                        amb.matched.len()
                    );
                }
                let diagnostics = &evaluation.table.diagnostics;
                flagged += diagnostics.duplicates.len() + diagnostics.ambiguous.len();
            }
            if strict && flagged > 0 {
                bail!("{flagged} duplicated or ambiguous player keys (--strict)");
            }
        }

        Command::Prospects { sort, top } => {
            let mut options = ProspectOptions::new(today);
            options.sort = sort;
            let report = prospects(&config, &options)?;
            let mut columns = report.ranked_by.clone();
            columns.extend([AVERAGE_COLUMN.to_string(), TAKEN_COLUMN.to_string()]);
            println!(
                "== prospects ({} players) -> {}",
                report.table.len(),
                report.path.display()
            );
            println!("{}", render_top(&report.table, top, &columns));
        }

        Command::Rookies { league, sort, top } => {
            let report = rookies(&config, league.as_deref(), sort.as_ref(), today)?;
            println!(
                "== {} rookies ({} available) -> {}",
                report.league,
                report.table.len(),
                report.path.display()
            );
            println!("{}", render_top(&report.table, top, &report.lists));
        }

        Command::Keepers {
            threshold,
            use_cache,
        } => {
            let fetcher = build_fetcher(&config, use_cache)?;
            let report = keepers(&config, &fetcher, today, threshold).await?;
            let mut columns: Vec<String> =
                report.systems.iter().map(|s| profit_column(s)).collect();
            columns.extend([MAX_PROFIT_COLUMN, RECOMMENDATION_COLUMN].map(String::from));
            println!("== keepers -> {}", report.path.display());
            println!("{}", render_top(&report.table, report.table.len(), &columns));
            println!("{}", report.summary);
        }

        Command::Combine {
            league,
            sort,
            use_cache,
        } => {
            let fetcher = build_fetcher(&config, use_cache)?;
            let league = league.unwrap_or_else(|| config.keepers.league.clone());
            let combined = combine(&config, &fetcher, &league, today, sort.as_ref()).await?;
            println!(
                "== all values ({} players) -> {}",
                combined.table.len(),
                combined.path.display()
            );
            println!("{}", render_top(&combined.table, 25, &combined.systems));
            let dupes = combined.duplicate_lines();
            if dupes.is_empty() {
                println!("No duplicated player names.");
            } else {
                println!("Duplicated player names:");
                for line in dupes {
                    println!("  {line}");
                }
            }
        }

        Command::Budget { draft } => {
            let summary = budget(&config, draft.as_deref())?;
            println!("{summary}");
        }
    }

    Ok(())
}

/// Payloads are reused when asked to, or when the last network fetch is
/// newer than `refresh_days`.
fn build_fetcher(config: &Config, use_cache: bool) -> anyhow::Result<Fetcher> {
    let client = FangraphsClient::new().context("failed to build HTTP client")?;
    let cache = FetchCache::new(config.cache_dir(), config.refresh_days);
    let stale = cache.needs_refresh(Local::now().naive_local());
    let prefer_cache = use_cache || !stale;
    match (use_cache, stale) {
        (true, _) => info!("using cached payloads from {}", cache.dir().display()),
        (false, false) => info!("cache is fresh, reusing payloads"),
        (false, true) => info!("cache is stale, fetching"),
    }
    Ok(Fetcher::new(Box::new(client)).with_cache(cache, prefer_cache))
}

/// Initialize tracing to stderr so reports on stdout stay clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scoutsheet=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
