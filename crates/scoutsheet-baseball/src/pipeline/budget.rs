// Auction draft money: what was spent on hitters and pitchers, against the
// configured spending targets and roster sizes.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{BudgetConfig, BudgetTarget, Config};
use crate::roster::{load_draft, DraftPick, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideSpend {
    pub side: Side,
    pub cost: f64,
    pub drafted: usize,
    pub keepers: u32,
    pub target: BudgetTarget,
}

impl SideSpend {
    pub fn rostered(&self) -> usize {
        self.drafted + self.keepers as usize
    }

    pub fn within_target(&self) -> bool {
        (self.target.min..=self.target.max).contains(&self.cost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetSummary {
    pub hitters: SideSpend,
    pub pitchers: SideSpend,
}

impl BudgetSummary {
    pub fn total_cost(&self) -> f64 {
        self.hitters.cost + self.pitchers.cost
    }
}

impl fmt::Display for BudgetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cost for all players: {}", self.total_cost())?;
        for spend in [&self.hitters, &self.pitchers] {
            let name = match spend.side {
                Side::Hitters => "Hitters",
                Side::Pitchers => "Pitchers",
            };
            writeln!(f)?;
            writeln!(
                f,
                "Total cost for {name}: {} (goal: between {} and {}){}",
                spend.cost,
                spend.target.min,
                spend.target.max,
                if spend.within_target() { "" } else { " !" }
            )?;
            write!(
                f,
                "Total number of {name}: {} / {}",
                spend.rostered(),
                spend.target.roster
            )?;
        }
        Ok(())
    }
}

/// Tally `picks` against `budget`. Every pick counts toward its side's
/// roster; keepers are added on top.
pub fn summarize(picks: &[DraftPick], budget: &BudgetConfig) -> BudgetSummary {
    let tally = |side: Side, keepers: u32, target: BudgetTarget| {
        let mine = picks.iter().filter(|p| p.side == side);
        SideSpend {
            side,
            cost: mine.clone().map(|p| p.cost).sum(),
            drafted: mine.count(),
            keepers,
            target,
        }
    };
    BudgetSummary {
        hitters: tally(Side::Hitters, budget.keepers_hitters, budget.hitters),
        pitchers: tally(Side::Pitchers, budget.keepers_pitchers, budget.pitchers),
    }
}

/// Summarize the draft file at `path`, or the configured one.
pub fn budget(config: &Config, path: Option<&Path>) -> Result<BudgetSummary> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config.input_dir().join(&config.budget.draft_file),
    };
    let picks = load_draft(&path)
        .with_context(|| format!("failed to load draft results {}", path.display()))?;
    Ok(summarize(&picks, &config.budget))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget_config() -> BudgetConfig {
        BudgetConfig {
            keepers_hitters: 8,
            keepers_pitchers: 3,
            hitters: BudgetTarget {
                min: 150.0,
                max: 180.0,
                roster: 14,
            },
            pitchers: BudgetTarget {
                min: 120.0,
                max: 150.0,
                roster: 11,
            },
            draft_file: "draft.csv".into(),
        }
    }

    fn pick(player: &str, side: Side, cost: f64) -> DraftPick {
        DraftPick {
            player: player.into(),
            side,
            cost,
        }
    }

    #[test]
    fn totals_per_side() {
        let picks = vec![
            pick("Aaron Judge", Side::Hitters, 60.0),
            pick("Bobby Witt Jr.", Side::Hitters, 95.0),
            pick("Tarik Skubal", Side::Pitchers, 45.0),
        ];
        let summary = summarize(&picks, &budget_config());
        assert_eq!(summary.hitters.cost, 155.0);
        assert_eq!(summary.hitters.drafted, 2);
        assert_eq!(summary.hitters.rostered(), 10);
        assert!(summary.hitters.within_target());
        assert_eq!(summary.pitchers.rostered(), 4);
        assert!(!summary.pitchers.within_target());
        assert_eq!(summary.total_cost(), 200.0);
    }

    #[test]
    fn display_reads_like_a_report() {
        let picks = vec![pick("Aaron Judge", Side::Hitters, 60.0)];
        let text = summarize(&picks, &budget_config()).to_string();
        assert!(text.starts_with("Total cost for all players: 60"));
        assert!(text.contains("Total cost for Hitters: 60 (goal: between 150 and 180) !"));
        assert!(text.contains("Total number of Hitters: 9 / 14"));
        assert!(text.contains("Total number of Pitchers: 3 / 11"));
    }

    #[test]
    fn empty_draft() {
        let summary = summarize(&[], &budget_config());
        assert_eq!(summary.total_cost(), 0.0);
        assert_eq!(summary.hitters.rostered(), 8);
    }
}
