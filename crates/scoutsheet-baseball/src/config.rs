// Configuration loading and parsing (config/scoutsheet.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use scoutsheet_core::TeamMap;
use scoutsheet_fangraphs::AuctionSettings;

use crate::rankings::RankingSource;

pub const CONFIG_FILE: &str = "scoutsheet.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// scoutsheet.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub season: i32,
    /// Cached payloads older than this many days are refetched.
    #[serde(default = "default_refresh_days")]
    pub refresh_days: u32,
    pub paths: PathsConfig,
    pub projections: ProjectionsConfig,
    #[serde(default)]
    pub leagues: BTreeMap<String, LeagueConfig>,
    #[serde(default)]
    pub teams: TeamsConfig,
    pub keepers: KeepersConfig,
    pub prospects: ProspectsConfig,
    pub budget: BudgetConfig,
    #[serde(default)]
    pub rookies: Option<RookiesConfig>,
    #[serde(default)]
    pub rankings: Vec<RankingSource>,
    /// Directory the relative paths above are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_refresh_days() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub cache_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionsConfig {
    /// Preseason projection systems, in report column order. The first is
    /// the merge base.
    pub systems: Vec<String>,
    /// Rest-of-season systems used with `--ros`.
    #[serde(default)]
    pub ros_systems: Vec<String>,
    /// System whose raw stat lines are pulled into the evaluation.
    pub stats_system: String,
    #[serde(default)]
    pub hitter_stats: Vec<String>,
    #[serde(default)]
    pub pitcher_stats: Vec<String>,
    /// Player-rater timeframe merged as recent form.
    #[serde(default = "default_rater_timeframe")]
    pub rater_timeframe: String,
}

fn default_rater_timeframe() -> String {
    "last30".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    #[serde(flatten)]
    pub auction: AuctionSettings,
    /// Available-player list (relative to `input_dir`); enables the
    /// availability filter.
    #[serde(default)]
    pub available_players: Option<String>,
    /// Ranking labels added to the evaluation with `--draft`.
    #[serde(default)]
    pub draft_rankings: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamsConfig {
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeepersConfig {
    /// Minimum profit (value minus cost) worth keeping.
    pub threshold: f64,
    pub roster: String,
    /// League whose auction settings value the roster.
    pub league: String,
}

/// Prospect files, all read from `{input_dir}/{season}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProspectsConfig {
    /// Base list with Name, Pos, ETA and Team columns.
    pub base: String,
    /// Ranking lists, each read from `{name}.csv` with Name and Rank columns.
    pub sources: Vec<String>,
    /// Sources the aggregate ranks are computed over.
    pub average_over: Vec<String>,
    /// Players already rostered in the league, flagged `taken`.
    #[serde(default)]
    pub taken_players: Option<String>,
}

/// Rookie-draft comparison: ranking lists read from `{input_dir}/{season}/`,
/// unioned and narrowed to one league's available players.
#[derive(Debug, Clone, Deserialize)]
pub struct RookiesConfig {
    pub league: String,
    /// Column sorted on when none is given; defaults to the first list.
    #[serde(default)]
    pub sort: Option<String>,
    pub lists: Vec<RankingSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    pub keepers_hitters: u32,
    pub keepers_pitchers: u32,
    pub hitters: BudgetTarget,
    pub pitchers: BudgetTarget,
    pub draft_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BudgetTarget {
    pub min: f64,
    pub max: f64,
    pub roster: u32,
}

impl Config {
    pub fn input_dir(&self) -> PathBuf {
        self.base_dir.join(&self.paths.input_dir)
    }

    /// Per-season input files (prospect lists).
    pub fn season_input_dir(&self) -> PathBuf {
        self.input_dir().join(self.season.to_string())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.paths.output_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join(&self.paths.cache_dir)
    }

    pub fn league(&self, name: &str) -> Result<&LeagueConfig, ConfigError> {
        self.leagues
            .get(name)
            .ok_or_else(|| ConfigError::ValidationError {
                field: "leagues".into(),
                message: format!(
                    "unknown league `{name}` (configured: {})",
                    self.leagues.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            })
    }

    pub fn ranking(&self, label: &str) -> Option<&RankingSource> {
        self.rankings.iter().find(|r| r.label == label)
    }

    /// Default team table extended with the configured aliases.
    pub fn team_map(&self) -> Result<TeamMap, ConfigError> {
        TeamMap::with_aliases(self.teams.aliases.clone()).map_err(|e| {
            ConfigError::ValidationError {
                field: "teams.aliases".into(),
                message: e.to_string(),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/scoutsheet.toml` relative to `base_dir`.
///
/// This does not copy defaults; prefer `load_config()` or call
/// `ensure_config_files()` first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let mut config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    config.base_dir = base_dir.to_path_buf();

    validate(&config)?;

    Ok(config)
}

/// Copy every `defaults/` file that has no counterpart in `config/` yet and
/// return the copies made. `.example` files stay behind as templates.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (false, false) => {
            return Err(copy_error(format!(
                "no defaults/ or config/ under {}; pass --base-dir to point at the project",
                base_dir.display()
            )));
        }
        (false, true) => return Ok(Vec::new()),
        _ => {}
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut copied = Vec::new();
    for template in default_templates(&defaults_dir)? {
        let Some(name) = template.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if install(&template, &target)? {
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Regular files in `dir` other than `.example` templates, by name.
fn default_templates(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let list_error = |e: std::io::Error| copy_error(format!("cannot list {}: {e}", dir.display()));
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_error)? {
        let path = entry.map_err(list_error)?.path();
        let is_example = path.extension().is_some_and(|ext| ext == "example");
        if path.is_file() && !is_example {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy `from` to `to` unless `to` exists; an existing file is never touched.
fn install(from: &Path, to: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new().write(true).create_new(true).open(to) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("cannot create {}: {e}", to.display()))),
    };
    let mut src = std::fs::File::open(from)
        .map_err(|e| copy_error(format!("cannot read {}: {e}", from.display())))?;
    std::io::copy(&mut src, &mut dest)
        .map_err(|e| copy_error(format!("cannot write {}: {e}", to.display())))?;
    Ok(true)
}

/// Loads config relative to `base_dir`, copying defaults first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.refresh_days == 0 {
        return Err(invalid("refresh_days", "must be greater than 0"));
    }

    if config.projections.systems.is_empty() {
        return Err(invalid("projections.systems", "at least one system is required"));
    }
    let mut seen = HashSet::new();
    for system in &config.projections.systems {
        if !seen.insert(system.as_str()) {
            return Err(invalid(
                "projections.systems",
                format!("`{system}` is listed twice"),
            ));
        }
    }

    for (name, league) in &config.leagues {
        if league.auction.teams == 0 {
            return Err(invalid(
                format!("leagues.{name}.teams"),
                "must be greater than 0",
            ));
        }
        if league.auction.dollars == 0 {
            return Err(invalid(
                format!("leagues.{name}.dollars"),
                "must be greater than 0",
            ));
        }
        for label in &league.draft_rankings {
            if config.ranking(label).is_none() {
                return Err(invalid(
                    format!("leagues.{name}.draft_rankings"),
                    format!("no [[rankings]] entry labelled `{label}`"),
                ));
            }
        }
    }

    if !config.leagues.contains_key(&config.keepers.league) {
        return Err(invalid(
            "keepers.league",
            format!("unknown league `{}`", config.keepers.league),
        ));
    }

    let mut labels = HashSet::new();
    for ranking in &config.rankings {
        if !labels.insert(ranking.label.as_str()) {
            return Err(invalid(
                "rankings",
                format!("duplicate ranking label `{}`", ranking.label),
            ));
        }
    }

    for source in &config.prospects.average_over {
        if !config.prospects.sources.contains(source) {
            return Err(invalid(
                "prospects.average_over",
                format!("`{source}` is not one of prospects.sources"),
            ));
        }
    }

    if let Some(rookies) = &config.rookies {
        validate_rookies(config, rookies)?;
    }

    for (side, target) in [
        ("budget.hitters", config.budget.hitters),
        ("budget.pitchers", config.budget.pitchers),
    ] {
        if target.min > target.max {
            return Err(invalid(
                side,
                format!("min {} exceeds max {}", target.min, target.max),
            ));
        }
    }

    config.team_map()?;

    Ok(())
}

fn validate_rookies(config: &Config, rookies: &RookiesConfig) -> Result<(), ConfigError> {
    let league = config
        .leagues
        .get(&rookies.league)
        .ok_or_else(|| invalid("rookies.league", format!("unknown league `{}`", rookies.league)))?;
    if league.available_players.is_none() {
        return Err(invalid(
            "rookies.league",
            format!("league `{}` has no available_players list", rookies.league),
        ));
    }
    if rookies.lists.is_empty() {
        return Err(invalid("rookies.lists", "at least one list is required"));
    }
    let mut labels = HashSet::new();
    for list in &rookies.lists {
        if !labels.insert(list.label.as_str()) {
            return Err(invalid(
                "rookies.lists",
                format!("duplicate list label `{}`", list.label),
            ));
        }
    }
    if let Some(sort) = &rookies.sort {
        if !labels.contains(sort.as_str()) {
            return Err(invalid(
                "rookies.sort",
                format!("`{sort}` is not one of the rookie lists"),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
