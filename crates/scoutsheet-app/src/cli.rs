use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scoutsheet_core::SortKey;

#[derive(Parser, Debug)]
#[command(name = "scoutsheet")]
#[command(version)]
#[command(
    about = "Fantasy baseball draft and keeper sheets from projections and rankings",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Project directory holding config/, defaults/ and the data paths
    #[arg(long, global = true, env = "SCOUTSHEET_BASE_DIR")]
    pub base_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dollar values and rankings for a league's hitters and pitchers
    Evaluate {
        /// League name from [leagues] in the config
        #[arg(short, long)]
        league: String,
        /// Add the league's draft rankings and an is_drafted column
        #[arg(long)]
        draft: bool,
        /// Use rest-of-season systems
        #[arg(long)]
        ros: bool,
        /// Reuse cached payloads instead of fetching
        #[arg(long)]
        use_cache: bool,
        /// Column to sort by (best, average, or any value column)
        #[arg(short, long, default_value = "best")]
        sort: SortKey,
        /// Sort smallest first
        #[arg(long)]
        ascending: bool,
        /// Rows printed per side
        #[arg(short = 'n', long, default_value = "25")]
        top: usize,
        /// Fail when a source lists a player twice or matches several players
        #[arg(long)]
        strict: bool,
    },
    /// Prospect lists averaged into one ranking
    Prospects {
        /// Column to sort by
        #[arg(short, long, default_value = "average")]
        sort: SortKey,
        /// Rows printed
        #[arg(short = 'n', long, default_value = "25")]
        top: usize,
    },
    /// Rookie lists side by side, narrowed to a league's available players
    Rookies {
        /// League whose available players are kept (defaults to [rookies] league)
        #[arg(short, long)]
        league: Option<String>,
        /// List to sort by, unranked players last (defaults to [rookies] sort)
        #[arg(short, long)]
        sort: Option<SortKey>,
        /// Rows printed
        #[arg(short = 'n', long, default_value = "50")]
        top: usize,
    },
    /// Keep-or-drop recommendations for the keeper roster
    Keepers {
        /// Minimum profit to keep a player (overrides the config)
        #[arg(short, long, allow_hyphen_values = true)]
        threshold: Option<f64>,
        /// Reuse cached payloads instead of fetching
        #[arg(long)]
        use_cache: bool,
    },
    /// Every system's dollar values side by side, with duplicate names listed
    Combine {
        /// League whose auction settings price the values
        #[arg(short, long)]
        league: Option<String>,
        /// Column to sort by (defaults to the first system)
        #[arg(short, long)]
        sort: Option<SortKey>,
        /// Reuse cached payloads instead of fetching
        #[arg(long)]
        use_cache: bool,
    },
    /// Money spent in an auction draft against the budget targets
    Budget {
        /// Draft results CSV (defaults to the configured file)
        #[arg(short, long)]
        draft: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_flags() {
        let cli = Cli::parse_from([
            "scoutsheet", "evaluate", "--league", "bush", "--draft", "--sort", "ADP", "--ascending",
        ]);
        match cli.command {
            Command::Evaluate {
                league,
                draft,
                ros,
                sort,
                ascending,
                top,
                ..
            } => {
                assert_eq!(league, "bush");
                assert!(draft);
                assert!(!ros);
                assert_eq!(sort, SortKey::Column("ADP".into()));
                assert!(ascending);
                assert_eq!(top, 25);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn negative_threshold() {
        let cli = Cli::parse_from(["scoutsheet", "keepers", "--threshold", "-7.5"]);
        match cli.command {
            Command::Keepers { threshold, .. } => assert_eq!(threshold, Some(-7.5)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rookies_defaults_come_from_config() {
        let cli = Cli::parse_from(["scoutsheet", "rookies", "-s", "fangraphs"]);
        match cli.command {
            Command::Rookies { league, sort, top } => {
                assert_eq!(league, None);
                assert_eq!(sort, Some(SortKey::Column("fangraphs".into())));
                assert_eq!(top, 50);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn base_dir_is_global() {
        let cli = Cli::parse_from(["scoutsheet", "budget", "--base-dir", "/tmp/league"]);
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/league")));
        assert!(matches!(cli.command, Command::Budget { draft: None }));
    }
}
