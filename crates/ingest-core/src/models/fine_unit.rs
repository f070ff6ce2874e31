//! FineUnit entity (§3, §4.6).
//!
//! The external catalog. Core never mutates `active` rows; it may insert
//! `pending` rows via CatalogTool.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FineUnitKind {
    WordSense,
    PhraseSense,
    GrammarRule,
}

impl fmt::Display for FineUnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FineUnitKind::WordSense => "word_sense",
            FineUnitKind::PhraseSense => "phrase_sense",
            FineUnitKind::GrammarRule => "grammar_rule",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FineUnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "word_sense" => Ok(FineUnitKind::WordSense),
            "phrase_sense" => Ok(FineUnitKind::PhraseSense),
            "grammar_rule" => Ok(FineUnitKind::GrammarRule),
            other => Err(format!("unknown fine unit kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FineUnitStatus {
    Active,
    Pending,
}

impl fmt::Display for FineUnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FineUnitStatus::Active => "active",
            FineUnitStatus::Pending => "pending",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FineUnitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FineUnitStatus::Active),
            "pending" => Ok(FineUnitStatus::Pending),
            other => Err(format!("unknown fine unit status: {other}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FineUnit {
    pub id: i64,
    pub kind: String,
    pub label: String,
    pub lang: String,
    pub pos: Option<String>,
    pub def: String,
    pub status: String,
    pub external_key: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Map a long-form POS name (as the LM emits it) to the single-letter
/// storage code used by `semantic.fine_unit.pos` (§4.6).
///
/// Anything not in the table, including the phrase annotator's `"N/A"`,
/// maps to `None` and is stored as `NULL` — it is never round-tripped back
/// as a query filter.
pub fn pos_to_db_code(pos: &str) -> Option<char> {
    match pos.to_ascii_lowercase().as_str() {
        "noun" => Some('n'),
        "verb" => Some('v'),
        "adjective" => Some('a'),
        "adverb" => Some('r'),
        "preposition" => Some('p'),
        "conjunction" => Some('c'),
        "pronoun" => Some('m'),
        "determiner" => Some('d'),
        "interjection" => Some('i'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_pos_names() {
        assert_eq!(pos_to_db_code("noun"), Some('n'));
        assert_eq!(pos_to_db_code("Verb"), Some('v'));
        assert_eq!(pos_to_db_code("ADJECTIVE"), Some('a'));
        assert_eq!(pos_to_db_code("interjection"), Some('i'));
    }

    #[test]
    fn maps_na_and_unknown_to_none() {
        assert_eq!(pos_to_db_code("N/A"), None);
        assert_eq!(pos_to_db_code("gibberish"), None);
    }

    #[test]
    fn kind_round_trips() {
        for k in [
            FineUnitKind::WordSense,
            FineUnitKind::PhraseSense,
            FineUnitKind::GrammarRule,
        ] {
            assert_eq!(FineUnitKind::from_str(&k.to_string()).unwrap(), k);
        }
    }
}
