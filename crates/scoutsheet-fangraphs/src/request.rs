// Request model for the remote projection endpoints.
//
// Each `Request` knows its endpoint path, its query string and the key its
// raw payload is cached under.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const AUCTION_PATH: &str = "/api/fantasy/auction-calculator/data";
pub const PLAYER_RATER_PATH: &str = "/api/fantasy/player-rater/data";
pub const LEADERS_PATH: &str = "/api/leaders/major-league/data";
pub const PROJECTIONS_PATH: &str = "/api/projections";

/// Days covered by the "last month" leaderboard window.
const LAST_MONTH_DAYS: i64 = 30;

/// Hitters or pitchers. The wire format spells these `bat` and `pit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    Bat,
    Pit,
}

impl PlayerType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerType::Bat => "bat",
            PlayerType::Pit => "pit",
        }
    }
}

/// League settings understood by the auction calculator. Field names match
/// the calculator's query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSettings {
    pub teams: u32,
    pub dollars: u32,
    pub mb: u32,
    pub mp: u32,
    pub msp: u32,
    pub mrp: u32,
    /// Scoring categories, e.g. `c|0,1,2,3,4|0,1,2,3,4`.
    pub points: String,
    pub rep: u32,
    pub drp: u32,
    /// Position priority, e.g. `C,SS,2B,3B,OF,1B`.
    pub pp: String,
    /// Roster slot counts in calculator order.
    pub pos: String,
}

/// Leaderboards the evaluation pulls supplemental stats from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardKind {
    /// Pitch-quality model (Stuff+, Location+, Pitching+).
    StuffPlus,
    /// Batted-ball quality for hitters.
    StatcastBatters,
}

impl LeaderboardKind {
    pub fn type_id(self) -> u32 {
        match self {
            LeaderboardKind::StuffPlus => 36,
            LeaderboardKind::StatcastBatters => 24,
        }
    }

    pub fn player_type(self) -> PlayerType {
        match self {
            LeaderboardKind::StuffPlus => PlayerType::Pit,
            LeaderboardKind::StatcastBatters => PlayerType::Bat,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            LeaderboardKind::StuffPlus => "stuff_plus",
            LeaderboardKind::StatcastBatters => "statcast_batters",
        }
    }

    /// Payload field -> report column.
    pub fn columns(self) -> &'static [(&'static str, &'static str)] {
        match self {
            LeaderboardKind::StuffPlus => &[
                ("sp_stuff", "Stuff+"),
                ("sp_location", "Location+"),
                ("sp_pitching", "Pitching+"),
            ],
            LeaderboardKind::StatcastBatters => &[
                ("Events", "Events"),
                ("EV", "EV"),
                ("maxEV", "maxEV"),
                ("Barrel%", "Barrel%"),
                ("HardHit%", "HardHit%"),
                ("wOBA", "wOBA"),
                ("xwOBA", "xwOBA"),
            ],
        }
    }
}

/// One fetch against the remote provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Auction-calculator dollar values for one projection system.
    Auction {
        league: String,
        settings: AuctionSettings,
        system: String,
        player_type: PlayerType,
    },
    /// Player-rater dollar values for a timeframe (`last30`, a ROS system, ...).
    PlayerRater { timeframe: String, season: i32 },
    /// A leaderboard for the full season, or the 30 days ending `window_end`.
    Leaderboard {
        kind: LeaderboardKind,
        season: i32,
        window_end: Option<NaiveDate>,
    },
    /// Raw projected stat lines for one system.
    Projections {
        system: String,
        player_type: PlayerType,
    },
}

impl Request {
    pub fn path(&self) -> &'static str {
        match self {
            Request::Auction { .. } => AUCTION_PATH,
            Request::PlayerRater { .. } => PLAYER_RATER_PATH,
            Request::Leaderboard { .. } => LEADERS_PATH,
            Request::Projections { .. } => PROJECTIONS_PATH,
        }
    }

    /// File stem the raw payload is cached under.
    pub fn cache_key(&self) -> String {
        match self {
            Request::Auction {
                league,
                system,
                player_type,
                ..
            } => format!("auction_{league}_{system}_{}", player_type.as_str()),
            Request::PlayerRater { timeframe, .. } => format!("rater_{timeframe}"),
            Request::Leaderboard {
                kind, window_end, ..
            } => match window_end {
                Some(_) => format!("leaders_{}_lastmonth", kind.slug()),
                None => format!("leaders_{}", kind.slug()),
            },
            Request::Projections {
                system,
                player_type,
            } => format!("projections_{system}_{}", player_type.as_str()),
        }
    }

    /// Query parameters in the order the site's own front end sends them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Request::Auction {
                settings: s,
                system,
                player_type,
                ..
            } => vec![
                ("teams", s.teams.to_string()),
                ("lg", "MLB".into()),
                ("dollars", s.dollars.to_string()),
                ("mb", s.mb.to_string()),
                ("mp", s.mp.to_string()),
                ("msp", s.msp.to_string()),
                ("mrp", s.mrp.to_string()),
                ("type", player_type.as_str().into()),
                ("players", String::new()),
                ("proj", system.clone()),
                ("split", String::new()),
                ("points", s.points.clone()),
                ("rep", s.rep.to_string()),
                ("drp", s.drp.to_string()),
                ("pp", s.pp.clone()),
                ("pos", s.pos.clone()),
                ("sort", String::new()),
                ("view", "0".into()),
            ],
            Request::PlayerRater { timeframe, season } => vec![
                ("timeframetype", timeframe.clone()),
                ("leaguetype", "3".into()),
                ("season", season.to_string()),
            ],
            Request::Leaderboard {
                kind,
                season,
                window_end,
            } => {
                let mut q = vec![
                    ("pos", "all".into()),
                    ("stats", kind.player_type().as_str().into()),
                    ("lg", "all".into()),
                    ("season", season.to_string()),
                    ("season1", season.to_string()),
                    ("ind", "0".into()),
                    ("qual", "0".into()),
                    ("month", (if window_end.is_some() { "1000" } else { "0" }).into()),
                    ("team", "0".into()),
                    ("type", kind.type_id().to_string()),
                    ("pageitems", "2000000000".into()),
                ];
                if let Some(end) = window_end {
                    let start = *end - Duration::days(LAST_MONTH_DAYS);
                    q.push(("startdate", start.format("%Y-%m-%d").to_string()));
                    q.push(("enddate", end.format("%Y-%m-%d").to_string()));
                }
                q
            }
            Request::Projections {
                system,
                player_type,
            } => vec![
                ("type", system.clone()),
                ("stats", player_type.as_str().into()),
                ("pos", "all".into()),
                ("team", "0".into()),
                ("players", "0".into()),
                ("lg", "all".into()),
            ],
        }
    }
}
