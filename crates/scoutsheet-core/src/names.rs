// Player name normalization.
//
// Every source spells players a little differently ("Ronald Acuña Jr.",
// "Acuna, Ronald", "Ronald Acuna"). The normalized form produced here is the
// join key used by the reconciler, so it must be deterministic and total.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Trailing generational suffix, optionally followed by a period. Matching is
/// case-sensitive and requires whitespace before the token, so "V" or "II"
/// inside a name never qualifies.
static SUFFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:Jr|Sr|II|III|IV|V)\.?\s*$").expect("suffix pattern is valid")
});

/// Characters removed anywhere in the name.
const STRIPPED_PUNCTUATION: [char; 3] = ['.', '\'', '\u{2019}'];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Map a raw display name to the canonical key used to match players across
/// sources.
///
/// Steps, in order:
/// 1. compatibility-decompose and drop combining marks ("Jesús" -> "Jesus")
/// 2. strip a trailing `Jr`/`Sr`/`II`/`III`/`IV`/`V` suffix
/// 3. remove periods and apostrophes ("J.D." -> "JD", "O'Hearn" -> "OHearn")
/// 4. drop initials ("Luis L Ortiz" -> "Luis Ortiz", "J Martinez" -> "Martinez")
/// 5. collapse whitespace and trim
///
/// Case is preserved; callers that need case-insensitive comparison must
/// lower-case the result themselves.
pub fn normalize_name(raw: &str) -> String {
    let folded = strip_diacritics(raw);
    let unsuffixed = strip_suffixes(&folded);
    let unpunctuated: String = unsuffixed
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    drop_middle_initials(&unpunctuated)
}

/// Normalize an optional name. `None` passes through unchanged.
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_name)
}

/// Normalize a loosely-typed JSON cell. Strings are normalized; every other
/// value (null, numbers, booleans, arrays, objects) is returned unchanged.
pub fn normalize_value(raw: &Value) -> Value {
    match raw {
        Value::String(s) => Value::String(normalize_name(s)),
        other => other.clone(),
    }
}

/// Turn a "Last, First" listing into "First Last". Names without a comma are
/// returned unchanged (trimmed).
///
/// Multi-comma names are reversed segment by segment, so
/// "Guerrero Jr., Vladimir" becomes "Vladimir Guerrero Jr.".
pub fn swap_last_first(raw: &str) -> String {
    if !raw.contains(',') {
        return raw.trim().to_string();
    }
    let mut parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    parts.reverse();
    parts.join(" ")
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn strip_diacritics(raw: &str) -> String {
    raw.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Strip trailing suffixes until none remain, so "Smith III Jr." and
/// "Smith" normalize to the same key.
fn strip_suffixes(name: &str) -> String {
    let mut out = name.to_string();
    while let Some(m) = SUFFIX_PATTERN.find(&out) {
        out.truncate(m.start());
    }
    out
}

/// Drop single uppercase-letter tokens that are followed by another
/// uppercase-starting token, wherever they sit ("J P Crawford" ->
/// "Crawford"). Re-joining on single spaces also collapses whitespace.
fn drop_middle_initials(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let mut kept = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let next_is_capitalized = tokens
            .get(i + 1)
            .and_then(|t| t.chars().next())
            .is_some_and(char::is_uppercase);
        if is_initial(token) && next_is_capitalized {
            continue;
        }
        kept.push(*token);
    }
    kept.join(" ")
}

fn is_initial(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
