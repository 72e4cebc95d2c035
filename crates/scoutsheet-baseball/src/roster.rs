// League roster lists: who is still available, who is already taken, the
// keeper roster with its costs, and auction draft results.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use scoutsheet_core::{normalize_name, PlayerRecord, Source};
use scoutsheet_fangraphs::PlayerType;

use crate::rankings::{csv_error, open, LoadError};

/// Label of the availability source inside a merge.
pub const AVAILABLE_LABEL: &str = "available";

// ---------------------------------------------------------------------------
// Raw CSV rows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawAvailable {
    Player: String,
    #[serde(default)]
    Team: String,
    #[serde(default)]
    Status: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawTaken {
    Player: String,
}

#[derive(Debug, Deserialize)]
struct RawKeeper {
    player_name: String,
    keeper_cost: f64,
    #[serde(default)]
    keeping: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawDraftPick {
    #[serde(default)]
    Player: String,
    Type: String,
    Cost: f64,
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player on the keeper roster.
#[derive(Debug, Clone, PartialEq)]
pub struct KeeperEntry {
    pub name: String,
    pub cost: f64,
    /// Currently designated as a keeper.
    pub keeping: bool,
}

/// Hitters or pitchers: every report is split along this line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Hitters,
    Pitchers,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Hitters, Side::Pitchers];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Hitters => "hitters",
            Side::Pitchers => "pitchers",
        }
    }

    pub fn player_type(self) -> PlayerType {
        match self {
            Side::Hitters => PlayerType::Bat,
            Side::Pitchers => PlayerType::Pit,
        }
    }

    /// Which side(s) a position string such as `SP`, `2B/OF` or `DH,SP`
    /// belongs to. Two-way players belong to both; a blank position matches
    /// either side.
    pub fn matches_position(self, position: Option<&str>) -> bool {
        let Some(position) = position.map(str::trim).filter(|p| !p.is_empty()) else {
            return true;
        };
        let is_pitcher = |t: &str| matches!(t, "SP" | "RP" | "P");
        let mut tokens = position
            .split(['/', ','])
            .map(str::trim)
            .filter(|t| !t.is_empty());
        match self {
            Side::Pitchers => tokens.any(is_pitcher),
            Side::Hitters => tokens.any(|t| !is_pitcher(t)),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftPick {
    pub player: String,
    pub side: Side,
    pub cost: f64,
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

fn load_available_from_reader<R: Read>(rdr: R) -> Result<Source, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut source = Source::new(AVAILABLE_LABEL, Vec::new());
    for result in reader.deserialize::<RawAvailable>() {
        match result {
            Ok(raw) => {
                let mut r = PlayerRecord::new(raw.Player.trim()).with_team(&raw.Team);
                if !raw.Status.trim().is_empty() {
                    r = r.with_extra("Status", raw.Status.trim());
                }
                source.push(r);
            }
            Err(e) => warn!("skipping malformed availability row: {}", e),
        }
    }
    Ok(source)
}

fn load_taken_from_reader<R: Read>(rdr: R) -> Result<HashSet<String>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut taken = HashSet::new();
    for result in reader.deserialize::<RawTaken>() {
        match result {
            Ok(raw) => {
                let key = normalize_name(&raw.Player);
                if !key.is_empty() {
                    taken.insert(key);
                }
            }
            Err(e) => warn!("skipping malformed taken-player row: {}", e),
        }
    }
    Ok(taken)
}

fn load_keepers_from_reader<R: Read>(rdr: R) -> Result<Vec<KeeperEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut keepers = Vec::new();
    for result in reader.deserialize::<RawKeeper>() {
        match result {
            Ok(raw) => {
                if !raw.keeper_cost.is_finite() {
                    warn!("skipping keeper '{}': non-finite cost", raw.player_name.trim());
                    continue;
                }
                keepers.push(KeeperEntry {
                    name: raw.player_name.trim().to_string(),
                    cost: raw.keeper_cost,
                    keeping: raw.keeping.unwrap_or(false),
                });
            }
            Err(e) => warn!("skipping malformed keeper row: {}", e),
        }
    }
    Ok(keepers)
}

fn load_draft_from_reader<R: Read>(rdr: R) -> Result<Vec<DraftPick>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut picks = Vec::new();
    for result in reader.deserialize::<RawDraftPick>() {
        match result {
            Ok(raw) => {
                let side = match raw.Type.trim().to_ascii_lowercase().as_str() {
                    "hitters" | "hitter" => Side::Hitters,
                    "pitchers" | "pitcher" => Side::Pitchers,
                    other => {
                        warn!(
                            "skipping draft pick '{}': unknown type '{}'",
                            raw.Player.trim(),
                            other
                        );
                        continue;
                    }
                };
                picks.push(DraftPick {
                    player: raw.Player.trim().to_string(),
                    side,
                    cost: raw.Cost,
                });
            }
            Err(e) => warn!("skipping malformed draft row: {}", e),
        }
    }
    Ok(picks)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Available-player list (`Player,Team,Status`) as a merge source with no
/// value columns.
pub fn load_available(path: &Path) -> Result<Source, LoadError> {
    load_available_from_reader(open(path)?).map_err(csv_error(path))
}

/// Normalized names of players already on a roster (`Player` column).
pub fn load_taken(path: &Path) -> Result<HashSet<String>, LoadError> {
    load_taken_from_reader(open(path)?).map_err(csv_error(path))
}

/// Keeper roster (`player_name,keeper_cost,keeping`).
pub fn load_keepers(path: &Path) -> Result<Vec<KeeperEntry>, LoadError> {
    load_keepers_from_reader(open(path)?).map_err(csv_error(path))
}

/// Auction draft results (`Player,Type,Cost`, `Type` is Hitters/Pitchers).
pub fn load_draft(path: &Path) -> Result<Vec<DraftPick>, LoadError> {
    load_draft_from_reader(open(path)?).map_err(csv_error(path))
}
