// Sorting and CSV output for merged tables.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::table::{MergedRow, MergedTable};

pub const BEST_COLUMN: &str = "best";
pub const AVERAGE_COLUMN: &str = "average";
pub const COUNT_COLUMN: &str = "num_sources_ranked";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot sort by unknown column `{0}`")]
    UnknownSortColumn(String),
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// What to sort a table by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Column(String),
    Best,
    Average,
    SourcesRanked,
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => SortKey::Name,
            BEST_COLUMN | "best_projection" | "top_projection" => SortKey::Best,
            AVERAGE_COLUMN | "avg" | "avg_projection" => SortKey::Average,
            COUNT_COLUMN | "num_places_ranked" => SortKey::SourcesRanked,
            other => SortKey::Column(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortKey {
    fn numeric(&self, row: &MergedRow) -> Option<f64> {
        match self {
            SortKey::Name => None,
            SortKey::Column(c) => row.value(c).as_f64(),
            SortKey::Best => row.aggregates.and_then(|a| a.best),
            SortKey::Average => row.aggregates.and_then(|a| a.average),
            SortKey::SourcesRanked => row.aggregates.map(|a| a.num_sources_ranked as f64),
        }
    }
}

/// Stable sort of `table` by `key`. Rows without a value for the key always
/// sort last, whichever direction is requested.
pub fn sort_table(
    table: &mut MergedTable,
    key: &SortKey,
    order: SortOrder,
) -> Result<(), ReportError> {
    if let SortKey::Column(c) = key {
        if !table.has_column(c) {
            return Err(ReportError::UnknownSortColumn(c.clone()));
        }
    }

    if *key == SortKey::Name {
        table.rows.sort_by(|a, b| {
            let ord = a.key.name.cmp(&b.key.name);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        return Ok(());
    }

    table.rows.sort_by(|a, b| {
        match (key.numeric(a), key.numeric(b)) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV output
// ---------------------------------------------------------------------------

fn header(table: &MergedTable, aggregated: bool) -> Vec<String> {
    let mut cols = vec!["name".to_string(), "team".to_string(), "position".to_string()];
    cols.extend(table.extra_columns.iter().cloned());
    cols.extend(table.columns.iter().cloned());
    if aggregated {
        cols.extend([BEST_COLUMN, AVERAGE_COLUMN, COUNT_COLUMN].map(String::from));
    }
    cols
}

fn format_opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Write `table` as CSV. No-data cells are written as empty fields.
pub fn write_csv<W: Write>(table: &MergedTable, writer: W) -> Result<(), ReportError> {
    let aggregated = table.is_aggregated();
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(table, aggregated))?;

    for row in &table.rows {
        let mut record = vec![
            row.display_name.clone(),
            row.team.clone().unwrap_or_default(),
            row.position.clone().unwrap_or_default(),
        ];
        for col in &table.extra_columns {
            record.push(row.extra(col).unwrap_or_default().to_string());
        }
        for col in &table.columns {
            record.push(row.value(col).to_string());
        }
        if aggregated {
            let agg = row.aggregates.unwrap_or_default();
            record.push(format_opt(agg.best));
            record.push(format_opt(agg.average));
            record.push(agg.num_sources_ranked.to_string());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| ReportError::Io {
        path: "<writer>".into(),
        source: e,
    })?;
    Ok(())
}

/// Write `table` to `path`, creating parent directories as needed.
pub fn write_csv_file(table: &MergedTable, path: &Path) -> Result<(), ReportError> {
    let io_err = |e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    write_csv(table, file)
}

// ---------------------------------------------------------------------------
// Console summary
// ---------------------------------------------------------------------------

/// Render the first `n` rows as a fixed-width text table showing name, team
/// and the given columns. Unknown columns are skipped.
pub fn render_top(table: &MergedTable, n: usize, columns: &[String]) -> String {
    let shown: Vec<&String> = columns
        .iter()
        .filter(|c| {
            table.has_column(c)
                || table.extra_columns.contains(*c)
                || matches!(c.as_str(), BEST_COLUMN | AVERAGE_COLUMN | COUNT_COLUMN)
        })
        .collect();

    let name_width = table
        .rows
        .iter()
        .take(n)
        .map(|r| r.display_name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = String::new();
    let _ = write!(out, "{:<name_width$}  {:<4}", "name", "team");
    for c in &shown {
        let _ = write!(out, "  {:>10}", truncate(c, 10));
    }
    out.push('\n');

    for row in table.rows.iter().take(n) {
        let _ = write!(
            out,
            "{:<name_width$}  {:<4}",
            row.display_name,
            row.team.as_deref().unwrap_or("")
        );
        for c in &shown {
            let cell = match c.as_str() {
                BEST_COLUMN => format_fixed(row.aggregates.and_then(|a| a.best)),
                AVERAGE_COLUMN => format_fixed(row.aggregates.and_then(|a| a.average)),
                COUNT_COLUMN => row
                    .aggregates
                    .map(|a| a.num_sources_ranked.to_string())
                    .unwrap_or_default(),
                col if table.has_column(col) => format_fixed(row.value(col).as_f64()),
                col => row.extra(col).unwrap_or_default().to_string(),
            };
            let _ = write!(out, "  {:>10}", truncate(&cell, 10));
        }
        out.push('\n');
    }
    out
}

fn format_fixed(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, Better};
    use crate::reconcile::{merge, MergeOptions};
    use crate::table::{PlayerRecord, Source};

    fn table() -> MergedTable {
        let steamer = Source::single("steamer").with_records(vec![
            PlayerRecord::new("Mike Trout").with_team("LAA").with_value("steamer", 30.0),
            PlayerRecord::new("Aaron Judge").with_team("NYY").with_value("steamer", 45.0),
            PlayerRecord::new("Bench Guy").with_team("KCR"),
        ]);
        let atc = Source::single("atc").with_records(vec![
            PlayerRecord::new("Mike Trout").with_team("LAA").with_value("atc", 32.0),
            PlayerRecord::new("Bench Guy").with_team("KCR").with_value("atc", 1.0),
        ]);
        merge(vec![steamer, atc], &MergeOptions::default()).unwrap()
    }

    fn names(t: &MergedTable) -> Vec<&str> {
        t.rows.iter().map(|r| r.display_name.as_str()).collect()
    }

    #[test]
    fn descending_sort_puts_missing_last() {
        let mut t = table();
        sort_table(&mut t, &SortKey::Column("steamer".into()), SortOrder::Descending).unwrap();
        assert_eq!(names(&t), vec!["Aaron Judge", "Mike Trout", "Bench Guy"]);
    }

    #[test]
    fn ascending_sort_puts_missing_last() {
        let mut t = table();
        sort_table(&mut t, &SortKey::Column("atc".into()), SortOrder::Ascending).unwrap();
        assert_eq!(names(&t), vec!["Bench Guy", "Mike Trout", "Aaron Judge"]);
    }

    #[test]
    fn sort_by_unknown_column_fails() {
        let mut t = table();
        let err = sort_table(&mut t, &SortKey::Column("zips".into()), SortOrder::Ascending);
        assert!(matches!(err, Err(ReportError::UnknownSortColumn(c)) if c == "zips"));
    }

    #[test]
    fn sort_by_aggregate() {
        let cols = vec!["steamer".to_string(), "atc".to_string()];
        let mut t = aggregate(table(), &cols, Better::Max).unwrap();
        sort_table(&mut t, &SortKey::Average, SortOrder::Descending).unwrap();
        assert_eq!(names(&t), vec!["Aaron Judge", "Mike Trout", "Bench Guy"]);
    }

    #[test]
    fn sort_key_parses_legacy_names() {
        assert_eq!("avg".parse::<SortKey>().unwrap(), SortKey::Average);
        assert_eq!("best_projection".parse::<SortKey>().unwrap(), SortKey::Best);
        assert_eq!(
            "atc".parse::<SortKey>().unwrap(),
            SortKey::Column("atc".into())
        );
    }

    #[test]
    fn csv_writes_empty_field_for_no_data() {
        let t = table();
        let mut buf = Vec::new();
        write_csv(&t, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,team,position,steamer,atc");
        assert_eq!(lines[1], "Mike Trout,LAA,,30,32");
        assert_eq!(lines[2], "Aaron Judge,NYY,,45,");
        assert_eq!(lines[3], "Bench Guy,KCR,,,1");
    }

    #[test]
    fn csv_includes_aggregate_columns() {
        let cols = vec!["steamer".to_string(), "atc".to_string()];
        let t = aggregate(table(), &cols, Better::Max).unwrap();
        let mut buf = Vec::new();
        write_csv(&t, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "name,team,position,steamer,atc,best,average,num_sources_ranked"
        );
        assert_eq!(lines[1], "Mike Trout,LAA,,30,32,32,31,2");
    }

    #[test]
    fn csv_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/report.csv");
        write_csv_file(&table(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("name,team,position"));
    }

    #[test]
    fn render_top_limits_rows() {
        let t = table();
        let text = render_top(&t, 2, &["steamer".to_string(), "zips".to_string()]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("steamer"));
        assert!(!lines[0].contains("zips"));
        assert!(lines[1].contains("Mike Trout"));
        assert!(lines[1].contains("30.0"));
    }
}
