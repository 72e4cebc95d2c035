// Player identity and cross-source reconciliation: name normalization, team
// code translation, merging, aggregation and report output.

pub mod aggregate;
pub mod names;
pub mod reconcile;
pub mod report;
pub mod table;
pub mod teams;

pub use aggregate::{aggregate, Better};
pub use names::{normalize_name, normalize_opt, normalize_value, swap_last_first};
pub use reconcile::{merge, MergeMode, MergeOptions, ReconcileError};
pub use report::{
    render_top, sort_table, write_csv, write_csv_file, ReportError, SortKey, SortOrder,
    AVERAGE_COLUMN, BEST_COLUMN, COUNT_COLUMN,
};
pub use table::{
    AmbiguousMatch, Cell, JoinPolicy, MergedRow, MergedTable, PlayerRecord, Source,
};
pub use teams::{translate_team, TeamMap, TeamMapError};
