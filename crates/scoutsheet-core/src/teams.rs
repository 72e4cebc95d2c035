// Team abbreviation translation.
//
// Sources disagree on team codes (Fantrax says "SF", Fangraphs says "SFG").
// The canonical alphabet is the one the auction calculator uses, since its
// rows are the base of most merges.

use std::collections::BTreeMap;

use thiserror::Error;

/// Alternate code -> canonical code.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("SF", "SFG"),
    ("TB", "TBR"),
    ("WSH", "WSN"),
    ("WAS", "WSN"),
    ("SD", "SDP"),
    ("KC", "KCR"),
    ("CHW", "CWS"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeamMapError {
    #[error("team alias `{alias}` maps to `{target}`, which is itself an alias of `{next}`")]
    Chained {
        alias: String,
        target: String,
        next: String,
    },

    #[error("team alias `{alias}` must map to a 3-letter code, got `{target}`")]
    InvalidTarget { alias: String, target: String },
}

/// Translation table from alternate team codes to canonical ones.
///
/// Translation is idempotent: no canonical code is also an alias key, so
/// `translate(translate(x)) == translate(x)` for every `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMap {
    aliases: BTreeMap<String, String>,
}

impl Default for TeamMap {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl TeamMap {
    /// The default table extended (or overridden) with user aliases.
    pub fn with_aliases<I, K, V>(extra: I) -> Result<Self, TeamMapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::default();
        for (from, to) in extra {
            map.aliases.insert(from.into(), to.into());
        }
        map.validate()?;
        Ok(map)
    }

    fn validate(&self) -> Result<(), TeamMapError> {
        for (alias, target) in &self.aliases {
            if target.len() != 3 || !target.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(TeamMapError::InvalidTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
            if let Some(next) = self.aliases.get(target) {
                if next != target {
                    return Err(TeamMapError::Chained {
                        alias: alias.clone(),
                        target: target.clone(),
                        next: next.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Translate `code` to the canonical alphabet. Unknown and already
    /// canonical codes pass through unchanged.
    pub fn translate(&self, code: &str) -> String {
        self.aliases
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Translate using the default table.
pub fn translate_team(code: &str) -> String {
    TeamMap::default().translate(code)
}
