// Adapters from raw JSON payloads to `Source`s.
//
// Payload rows are loosely typed: names can be null, numbers sometimes arrive
// as strings, and the leaderboard API occasionally omits whole columns. Rows
// are read field by field rather than through a fixed struct so one odd row
// never sinks the whole payload.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use scoutsheet_core::{PlayerRecord, Source};

use crate::client::FetchError;
use crate::request::LeaderboardKind;

type Row = Map<String, Value>;

/// `{"data": [...]}` wrapper used by every endpoint except projections.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<Value>,
}

fn enveloped_rows(payload: &Value, what: &str) -> Result<Vec<Row>, FetchError> {
    let envelope = Envelope::deserialize(payload).map_err(|e| FetchError::decode(what, e))?;
    Ok(object_rows(envelope.data, what))
}

fn bare_rows(payload: &Value, what: &str) -> Result<Vec<Row>, FetchError> {
    match payload {
        Value::Array(items) => Ok(object_rows(items.clone(), what)),
        _ => Err(FetchError::decode(what, "expected a JSON array")),
    }
}

fn object_rows(items: Vec<Value>, what: &str) -> Vec<Row> {
    let total = items.len();
    let rows: Vec<Row> = items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(m) => Some(m),
            _ => None,
        })
        .collect();
    if rows.len() < total {
        warn!("{what}: skipped {} non-object rows", total - rows.len());
    }
    rows
}

/// Player name from a row. Non-string names yield an empty display name,
/// which the reconciler reports as unmergeable.
fn name_of(row: &Row, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn text_of(row: &Row, field: &str) -> Option<String> {
    match row.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Numeric field; numeric strings (including percentages like "12.5 %") are
/// accepted.
fn number_of(row: &Row, field: &str) -> Option<f64> {
    match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

fn record(name: String, team: Option<String>, position: Option<String>) -> PlayerRecord {
    let mut r = PlayerRecord::new(name);
    if let Some(team) = team {
        r = r.with_team(team);
    }
    if let Some(position) = position {
        r = r.with_position(position);
    }
    r
}

// ---------------------------------------------------------------------------
// Auction calculator
// ---------------------------------------------------------------------------

/// Auction-calculator dollars as a single-column source named `label`.
pub fn auction_source(payload: &Value, label: &str) -> Result<Source, FetchError> {
    let rows = enveloped_rows(payload, label)?;
    let mut source = Source::single(label);
    for row in &rows {
        let mut r = record(
            name_of(row, "PlayerName"),
            text_of(row, "Team"),
            text_of(row, "POS"),
        );
        if let Some(dollars) = number_of(row, "Dollars") {
            r = r.with_value(label, dollars);
        }
        source.push(r);
    }
    debug!("auction values '{}': {} players", label, source.len());
    Ok(source)
}

// ---------------------------------------------------------------------------
// Player rater
// ---------------------------------------------------------------------------

/// Player-rater dollars. Team, position and dollars live under `auction`.
pub fn rater_source(payload: &Value, label: &str) -> Result<Source, FetchError> {
    let rows = enveloped_rows(payload, label)?;
    let mut source = Source::single(label);
    for row in &rows {
        let empty = Row::new();
        let auction = match row.get("auction") {
            Some(Value::Object(m)) => m,
            _ => &empty,
        };
        let mut r = record(
            name_of(row, "playerName"),
            text_of(auction, "AbbName"),
            text_of(auction, "Position"),
        );
        if let Some(dollars) = number_of(auction, "Dollars") {
            r = r.with_value(label, dollars);
        }
        source.push(r);
    }
    debug!("player rater '{}': {} players", label, source.len());
    Ok(source)
}

// ---------------------------------------------------------------------------
// Leaderboards
// ---------------------------------------------------------------------------

/// Leaderboard stats, with columns renamed per `kind` and prefixed with
/// `lastmonth_` for the 30-day window.
///
/// Returns `Ok(None)` when the payload has no rows or lacks one of the
/// expected columns; the leaderboard API is unstable and the evaluation
/// proceeds without it.
pub fn leaderboard_source(
    payload: &Value,
    kind: LeaderboardKind,
    last_month: bool,
) -> Result<Option<Source>, FetchError> {
    let label = if last_month {
        format!("{}_lastmonth", kind.slug())
    } else {
        kind.slug().to_string()
    };
    let rows = enveloped_rows(payload, &label)?;
    if rows.is_empty() {
        warn!("no {} data available", label);
        return Ok(None);
    }

    let missing: Vec<&str> = kind
        .columns()
        .iter()
        .map(|(field, _)| *field)
        .filter(|field| !rows.iter().any(|r| r.contains_key(*field)))
        .collect();
    if !missing.is_empty() {
        warn!("{} data is missing columns {:?}", label, missing);
        return Ok(None);
    }

    let renamed: Vec<(&str, String)> = kind
        .columns()
        .iter()
        .map(|(field, column)| {
            let column = if last_month {
                format!("lastmonth_{}", column.to_lowercase())
            } else {
                column.to_string()
            };
            (*field, column)
        })
        .collect();

    let mut source = Source::new(
        label.clone(),
        renamed.iter().map(|(_, c)| c.clone()).collect(),
    );
    for row in &rows {
        let mut r = record(name_of(row, "PlayerName"), text_of(row, "TeamName"), None);
        for (field, column) in &renamed {
            if let Some(v) = number_of(row, field) {
                r = r.with_value(column.clone(), v);
            }
        }
        source.push(r);
    }
    debug!("leaderboard '{}': {} players", label, source.len());
    Ok(Some(source))
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Projected stat lines, keeping only `stats`. Each stat becomes a value
/// column of its own name.
pub fn projection_source(
    payload: &Value,
    label: &str,
    stats: &[String],
) -> Result<Source, FetchError> {
    let rows = bare_rows(payload, label)?;
    let mut source = Source::new(label, stats.to_vec());
    for row in &rows {
        let mut r = record(name_of(row, "PlayerName"), text_of(row, "Team"), None);
        for stat in stats {
            if let Some(v) = number_of(row, stat) {
                r = r.with_value(stat.clone(), v);
            }
        }
        source.push(r);
    }
    debug!("projections '{}': {} players", label, source.len());
    Ok(source)
}
