// End-to-end pipeline tests: a temp project directory seeded from
// tests/fixtures, with remote payloads served from tests/fixtures/payloads
// by an in-memory provider. Payloads without a fixture answer 404, which the
// pipelines treat as an unavailable source.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use scoutsheet_baseball::config::load_config_from;
use scoutsheet_baseball::pipeline::budget::budget;
use scoutsheet_baseball::pipeline::combine::combine;
use scoutsheet_baseball::pipeline::evaluate::{evaluate, EvaluateOptions, DRAFTED_COLUMN};
use scoutsheet_baseball::pipeline::keepers::{keepers, MAX_PROFIT_COLUMN, RECOMMENDATION_COLUMN};
use scoutsheet_baseball::pipeline::prospects::{prospects, ProspectOptions, TAKEN_COLUMN};
use scoutsheet_baseball::pipeline::rookies::rookies;
use scoutsheet_baseball::{Config, Side};
use scoutsheet_core::{Cell, SortKey};
use scoutsheet_fangraphs::{FetchCache, FetchError, Fetcher, ProjectionProvider, Request};

const FIXTURES: &str = "tests/fixtures";

// ===========================================================================
// Helpers
// ===========================================================================

struct FixtureProvider {
    payloads: HashMap<String, Value>,
    calls: Arc<AtomicUsize>,
}

impl FixtureProvider {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        let mut payloads = HashMap::new();
        for entry in std::fs::read_dir(format!("{FIXTURES}/payloads")).unwrap() {
            let path = entry.unwrap().path();
            let key = path.file_stem().unwrap().to_str().unwrap().to_string();
            let text = std::fs::read_to_string(&path).unwrap();
            payloads.insert(key, serde_json::from_str(&text).unwrap());
        }
        Self { payloads, calls }
    }
}

#[async_trait]
impl ProjectionProvider for FixtureProvider {
    async fn fetch(&self, request: &Request) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = request.cache_key();
        self.payloads.get(&key).cloned().ok_or(FetchError::Status {
            url: key,
            status: 404,
        })
    }
}

fn fetcher() -> Fetcher {
    Fetcher::new(Box::new(FixtureProvider::new(Arc::new(AtomicUsize::new(0)))))
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let path = entry.unwrap().path();
        let target = to.join(path.file_name().unwrap());
        if path.is_dir() {
            copy_dir(&path, &target);
        } else {
            std::fs::copy(&path, &target).unwrap();
        }
    }
}

/// A project directory with the fixture config and input files.
fn project() -> (tempfile::TempDir, Config) {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("config")).unwrap();
    std::fs::copy(
        format!("{FIXTURES}/scoutsheet.toml"),
        tmp.path().join("config/scoutsheet.toml"),
    )
    .unwrap();
    copy_dir(
        Path::new(&format!("{FIXTURES}/input")),
        &tmp.path().join("data/input"),
    );
    let config = load_config_from(tmp.path()).unwrap();
    (tmp, config)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
}

fn names(table: &scoutsheet_core::MergedTable) -> Vec<&str> {
    table.rows.iter().map(|r| r.display_name.as_str()).collect()
}

// ===========================================================================
// evaluate
// ===========================================================================

#[tokio::test]
async fn evaluate_filters_to_available_players() {
    let (tmp, config) = project();
    let options = EvaluateOptions::new("test", date());
    let out = evaluate(&config, &fetcher(), &options).await.unwrap();
    assert_eq!(out.len(), 2);

    let hitters = &out[0];
    assert_eq!(hitters.side, Side::Hitters);
    assert_eq!(hitters.systems, vec!["steamer", "atc"]);
    // Judge isn't available; the LAD catcher isn't the KC reliever on the list.
    assert_eq!(names(&hitters.table), vec!["Ronald Acuña Jr.", "Heliot Ramos"]);

    let acuna = hitters.table.find("Ronald Acuna").unwrap();
    assert_eq!(acuna.value("atc"), Cell::Value(40.0));
    assert_eq!(acuna.value("SB"), Cell::Value(40.0));
    assert_eq!(acuna.extra("Status"), Some("FA"));
    let agg = acuna.aggregates.unwrap();
    assert_eq!(agg.best, Some(40.0));
    assert_eq!(agg.average, Some(39.25));
    assert_eq!(agg.num_sources_ranked, 2);

    // SF on the availability list is SFG in the projections.
    let ramos = hitters.table.find("Heliot Ramos").unwrap();
    assert_eq!(ramos.team.as_deref(), Some("SFG"));

    // Draft rankings stay out without --draft.
    assert!(!hitters.table.has_column("ADP"));
    assert!(hitters
        .table
        .diagnostics
        .skipped_sources
        .contains(&"last30".to_string()));

    let pitchers = &out[1];
    assert_eq!(names(&pitchers.table), vec!["Logan Webb", "Will Smith"]);
    assert_eq!(
        pitchers.table.find("Logan Webb").unwrap().value("eno"),
        Cell::Value(12.0)
    );
    assert_eq!(
        pitchers.table.find("Will Smith").unwrap().team.as_deref(),
        Some("KCR")
    );

    let written = tmp.path().join("data/output/2026-03-20_test_hitters.csv");
    assert_eq!(hitters.path, written);
    let text = std::fs::read_to_string(written).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("name,team,position,Status,steamer,atc,PA,HR,SB,best,average,num_sources_ranked")
    );
    assert_eq!(
        lines.next(),
        Some("Ronald Acuña Jr.,ATL,OF,FA,38.5,40,650,30,40,40,39.25,2")
    );
}

#[tokio::test]
async fn evaluate_draft_adds_draft_rankings() {
    let (_tmp, config) = project();
    let mut options = EvaluateOptions::new("test", date());
    options.draft = true;
    options.sort = SortKey::Column("ADP".into());
    options.order = scoutsheet_core::SortOrder::Ascending;

    let out = evaluate(&config, &fetcher(), &options).await.unwrap();
    let hitters = &out[0].table;
    assert!(hitters.extra_columns.contains(&DRAFTED_COLUMN.to_string()));
    assert_eq!(hitters.find("Ronald Acuna").unwrap().value("ADP"), Cell::Value(3.0));
    assert_eq!(hitters.find("Heliot Ramos").unwrap().value("ADP"), Cell::Value(40.0));
    assert_eq!(names(hitters), vec!["Ronald Acuña Jr.", "Heliot Ramos"]);

    // Pitchers have no ADP rows in the fixture; the ADP sort still succeeds.
    assert_eq!(out[1].table.len(), 2);
}

#[tokio::test]
async fn evaluate_unknown_league_is_an_error() {
    let (_tmp, config) = project();
    let options = EvaluateOptions::new("nope", date());
    assert!(evaluate(&config, &fetcher(), &options).await.is_err());
}

#[tokio::test]
async fn evaluate_fails_when_no_values_load() {
    let (_tmp, config) = project();
    let mut options = EvaluateOptions::new("test", date());
    options.ros = true;
    let err = evaluate(&config, &fetcher(), &options).await.unwrap_err();
    assert!(format!("{err:#}").contains("dollar values"));
}

#[tokio::test]
async fn cached_payloads_are_reused() {
    let (tmp, config) = project();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = FetchCache::new(config.cache_dir(), config.refresh_days);

    let first = Fetcher::new(Box::new(FixtureProvider::new(calls.clone())))
        .with_cache(cache.clone(), true);
    evaluate(&config, &first, &EvaluateOptions::new("test", date()))
        .await
        .unwrap();
    let fetched = calls.load(Ordering::SeqCst);
    assert!(fetched > 0);
    assert!(tmp.path().join("data/cache/auction_test_steamer_bat.json").exists());

    let second =
        Fetcher::new(Box::new(FixtureProvider::new(calls.clone()))).with_cache(cache, true);
    evaluate(&config, &second, &EvaluateOptions::new("test", date()))
        .await
        .unwrap();
    // Only the payloads that were never cached (404s) go back to the network.
    let refetched = calls.load(Ordering::SeqCst) - fetched;
    assert!(refetched < fetched);
}

// ===========================================================================
// keepers / combine
// ===========================================================================

#[tokio::test]
async fn keepers_priced_against_all_systems() {
    let (tmp, config) = project();
    let report = keepers(&config, &fetcher(), date(), None).await.unwrap();

    assert_eq!(
        names(&report.table),
        vec!["Logan Webb", "Heliot Ramos", "Aaron Judge", "Nobody Special"]
    );
    let webb = report.table.find("Logan Webb").unwrap();
    assert_eq!(webb.value(MAX_PROFIT_COLUMN), Cell::Value(4.5));
    assert_eq!(webb.extra(RECOMMENDATION_COLUMN), Some("KEEP"));
    assert_eq!(
        report.table.find("Nobody Special").unwrap().extra(RECOMMENDATION_COLUMN),
        Some("No data")
    );

    assert_eq!(report.summary.recommended, 1);
    assert_eq!(report.summary.current_cost, 78.0);
    assert_eq!(report.summary.recommended_cost, 18.0);
    assert_eq!(report.summary.difference(), -60.0);
    assert!(tmp.path().join("data/output/2026-03-20_keepers.csv").exists());
}

#[tokio::test]
async fn keepers_threshold_override() {
    let (_tmp, config) = project();
    let report = keepers(&config, &fetcher(), date(), Some(-10.0)).await.unwrap();
    assert_eq!(report.summary.recommended, 2);
    assert_eq!(
        report.table.find("Heliot Ramos").unwrap().extra(RECOMMENDATION_COLUMN),
        Some("KEEP")
    );
}

#[tokio::test]
async fn combine_keeps_everyone_and_lists_duplicates() {
    let (_tmp, config) = project();
    let combined = combine(&config, &fetcher(), "test", date(), None)
        .await
        .unwrap();

    assert_eq!(combined.systems, vec!["steamer", "atc"]);
    assert_eq!(
        names(&combined.table),
        vec![
            "Aaron Judge",
            "Tarik Skubal",
            "Ronald Acuña Jr.",
            "Logan Webb",
            "Will Smith",
            "Heliot Ramos"
        ]
    );
    // Two different Will Smiths in steamer collapse under a name-only join.
    let dupes = combined.duplicate_lines();
    assert_eq!(dupes.len(), 1);
    assert!(dupes[0].starts_with("steamer: Will Smith x2"));
}

// ===========================================================================
// prospects / budget
// ===========================================================================

#[test]
fn prospects_ranked_and_taken_flagged() {
    let (tmp, config) = project();
    let report = prospects(&config, &ProspectOptions::new(date())).unwrap();

    assert_eq!(report.ranked_by, vec!["mlb_pipeline", "espn"]);
    assert_eq!(
        names(&report.table),
        vec!["Jesús Made", "Kevin McGonigle", "Konnor Griffin"]
    );
    assert!(report
        .table
        .diagnostics
        .skipped_sources
        .contains(&"fangraphs".to_string()));

    let griffin = report.table.find("Konnor Griffin").unwrap();
    assert_eq!(griffin.extra(TAKEN_COLUMN), Some("X"));
    assert_eq!(griffin.aggregates.unwrap().average, Some(2.5));
    let mcgonigle = report.table.find("Kevin McGonigle").unwrap();
    assert_eq!(mcgonigle.extra("ETA"), Some("0"));
    assert_eq!(mcgonigle.extra(TAKEN_COLUMN), None);

    assert!(tmp.path().join("data/output/2026-03-20_prospects.csv").exists());
}

#[test]
fn rookies_union_filtered_to_available_and_unranked_last() {
    let (tmp, config) = project();
    let report = rookies(&config, None, None, date()).unwrap();

    assert_eq!(report.league, "dynasty");
    assert_eq!(report.lists, vec!["fangraphs", "composite"]);
    assert!(report
        .table
        .diagnostics
        .skipped_sources
        .contains(&"baseball_prospectus".to_string()));

    // Griffin is ranked everywhere but already rostered; Eldridge is only on
    // the composite list. Sorted by composite AVG, unranked last.
    assert_eq!(
        names(&report.table),
        vec!["Jesús Made", "Bryce Eldridge", "Kevin McGonigle", "Sebastian Walcott"]
    );
    let made = report.table.find("Jesus Made").unwrap();
    assert_eq!(made.value("fangraphs"), Cell::Value(5.0));
    assert_eq!(made.value("composite"), Cell::Value(3.3));
    let eldridge = report.table.find("Bryce Eldridge").unwrap();
    assert_eq!(eldridge.value("fangraphs"), Cell::NoData);

    assert!(tmp
        .path()
        .join("data/output/2026-03-20_dynasty_rookies.csv")
        .exists());
}

#[test]
fn rookies_sorted_by_another_list() {
    let (_tmp, config) = project();
    let sort = SortKey::Column("fangraphs".into());
    let report = rookies(&config, Some("dynasty"), Some(&sort), date()).unwrap();
    assert_eq!(
        names(&report.table),
        vec!["Kevin McGonigle", "Sebastian Walcott", "Jesús Made", "Bryce Eldridge"]
    );
}

#[test]
fn rookies_for_unknown_league_is_an_error() {
    let (_tmp, config) = project();
    let err = rookies(&config, Some("nowhere"), None, date()).unwrap_err();
    assert!(err.to_string().contains("nowhere"), "{err}");
}

#[test]
fn budget_from_configured_draft_file() {
    let (_tmp, config) = project();
    let summary = budget(&config, None).unwrap();
    assert_eq!(summary.hitters.cost, 157.0);
    assert_eq!(summary.hitters.rostered(), 10);
    assert_eq!(summary.pitchers.cost, 72.0);
    assert!(!summary.pitchers.within_target());
    assert_eq!(summary.total_cost(), 229.0);
}
