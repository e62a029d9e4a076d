//! Symbol roster: the universe of symbols a scan or similarity run walks.
//!
//! Rosters arrive as loosely-shaped JSON rows (different sources disagree on
//! key casing and language), get normalized into [`RosterEntry`] values, and
//! are held in-memory as a [`Roster`] that preserves source order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One raw roster row as it appears in a listing file or listing endpoint.
///
/// Sources disagree on field names, so both fields accept the spellings seen
/// in the wild (English and Korean listing dumps).
#[derive(Debug, Clone, Deserialize)]
pub struct RosterRecord {
    /// Ticker symbol, possibly unpadded (e.g. "5930" for a KRX code).
    #[serde(
        default,
        alias = "Symbol",
        alias = "code",
        alias = "Code",
        alias = "종목코드"
    )]
    pub symbol: Option<String>,
    /// Display name for the company.
    #[serde(default, alias = "Name", alias = "회사명")]
    pub name: Option<String>,
}

/// A normalized roster row: non-empty symbol plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Normalized ticker symbol (digit-only codes are zero-padded to 6).
    pub symbol: String,
    /// Display name; falls back to the symbol when the source omits one.
    pub name: String,
}

/// Summary of changes performed while normalizing raw roster records.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RosterNormalizationReport {
    /// Records dropped because no symbol survived trimming.
    pub dropped_missing_symbol: usize,
    /// Symbols that were zero-padded up to 6 characters.
    pub zero_padded: usize,
    /// Records dropped as duplicates of an earlier symbol.
    pub deduped: usize,
}

/// Symbol universe keyed by symbol, preserving source order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: IndexMap<String, String>,
}

impl Roster {
    /// Build a roster from normalized entries, keeping the first occurrence
    /// of each symbol.
    pub fn from_entries(entries: Vec<RosterEntry>) -> Self {
        let mut map = IndexMap::with_capacity(entries.len());
        for entry in entries {
            map.entry(entry.symbol).or_insert(entry.name);
        }
        Self { entries: map }
    }

    /// Number of symbols in the roster.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display name for `symbol`, if the roster knows it.
    pub fn name_of(&self, symbol: &str) -> Option<&str> {
        self.entries.get(symbol).map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    /// `(symbol, name)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, n)| (s.as_str(), n.as_str()))
    }

    /// Symbols in source order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Clone the roster back out as a flat entry list (the cached file shape).
    pub fn to_entries(&self) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .map(|(symbol, name)| RosterEntry {
                symbol: symbol.clone(),
                name: name.clone(),
            })
            .collect()
    }
}

/// Normalize raw roster records into entries.
///
/// What normalization does:
/// - Trim the symbol; drop the record (with a warning) when nothing is left
/// - Zero-pad digit-only symbols to 6 characters ("5930" -> "005930")
/// - Trim the name; fall back to the symbol when the source omits one
/// - Deduplicate by symbol, keeping the first occurrence order
///
/// Returns the surviving entries plus a [`RosterNormalizationReport`]
/// detailing the changes made.
pub fn normalize_records(
    records: Vec<RosterRecord>,
) -> (Vec<RosterEntry>, RosterNormalizationReport) {
    let mut report = RosterNormalizationReport::default();
    let mut seen: IndexMap<String, ()> = IndexMap::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());

    for (idx, record) in records.into_iter().enumerate() {
        let raw = record.symbol.as_deref().unwrap_or("").trim().to_string();
        if raw.is_empty() {
            tracing::warn!(record = idx, "roster record has no symbol, dropping");
            report.dropped_missing_symbol += 1;
            continue;
        }

        let symbol = pad_numeric_code(&raw);
        if symbol.len() != raw.len() {
            report.zero_padded += 1;
        }

        if seen.insert(symbol.clone(), ()).is_some() {
            report.deduped += 1;
            continue;
        }

        let name = match record.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => symbol.clone(),
        };

        out.push(RosterEntry { symbol, name });
    }

    (out, report)
}

/// Zero-pad digit-only codes to 6 characters; leave everything else alone.
fn pad_numeric_code(raw: &str) -> String {
    if !raw.is_empty() && raw.len() < 6 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{raw:0>6}")
    } else {
        raw.to_string()
    }
}
