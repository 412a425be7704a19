//! Static dietary rules per constitution type
//!
//! The rule file maps a constitution type (dosha) to food categories, each
//! with foods to avoid and foods to favor:
//!
//! ```json
//! {
//!   "Vata": {
//!     "Fruits": { "avoid": ["Dried fruits"], "favor": ["Bananas", "Mangoes"] }
//!   }
//! }
//! ```
//!
//! The table is loaded once at startup and never changes afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Foods to avoid and to favor within one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRules {
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub favor: Vec<String>,
}

/// Category name to its rules, for a single constitution type
pub type RuleSet = BTreeMap<String, FoodRules>;

static EMPTY_RULES: RuleSet = BTreeMap::new();

/// Immutable lookup from constitution type to its rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    constitutions: HashMap<String, RuleSet>,
}

impl RuleTable {
    /// Load the table from a JSON rule file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::RuleLoad(format!("cannot read {}: {e}", path.display())))?;
        let table = Self::from_json(&text)
            .map_err(|e| Error::RuleLoad(format!("{}: {e}", path.display())))?;

        info!(
            path = %path.display(),
            constitutions = table.constitutions.len(),
            "loaded rule table"
        );
        Ok(table)
    }

    /// Parse a table from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::RuleLoad(e.to_string()))
    }

    /// Serialize the table as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        // sort constitutions so the output is stable
        let sorted: BTreeMap<_, _> = self.constitutions.iter().collect();
        serde_json::to_string_pretty(&sorted).map_err(|e| Error::RuleLoad(e.to_string()))
    }

    /// Rules for a constitution type; an unknown type yields an empty set.
    pub fn lookup(&self, constitution: &str) -> &RuleSet {
        self.constitutions.get(constitution).unwrap_or(&EMPTY_RULES)
    }

    /// Returns `true` if the table has an entry for the constitution type.
    pub fn contains(&self, constitution: &str) -> bool {
        self.constitutions.contains_key(constitution)
    }

    /// Known constitution types, sorted.
    pub fn constitutions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constitutions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn from_map(constitutions: HashMap<String, RuleSet>) -> Self {
        Self { constitutions }
    }
}

mod chart;

pub use chart::*;

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"{
        "Vata": {
            "Fruits": { "avoid": ["Cranberries"], "favor": ["Bananas", "Mangoes"] },
            "Grains": { "avoid": ["Millet"], "favor": ["Oats", "Rice"] }
        },
        "Pitta": {
            "Spices": { "avoid": ["Chili pepper"], "favor": ["Coriander"] }
        }
    }"#;

    #[test]
    fn test_lookup_known_constitution() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        let vata = table.lookup("Vata");

        assert_eq!(vata.len(), 2);
        assert_eq!(vata["Fruits"].favor, vec!["Bananas", "Mangoes"]);
        assert_eq!(vata["Grains"].avoid, vec!["Millet"]);
    }

    #[test]
    fn test_lookup_unknown_is_empty() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        assert!(table.lookup("Unknown").is_empty());
        assert!(!table.contains("Unknown"));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let table = RuleTable::from_json(r#"{"Kapha": {"Dairy": {"favor": ["Goat milk"]}}}"#).unwrap();
        let dairy = &table.lookup("Kapha")["Dairy"];
        assert!(dairy.avoid.is_empty());
        assert_eq!(dairy.favor, vec!["Goat milk"]);
    }

    #[test]
    fn test_constitutions_sorted() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.constitutions(), vec!["Pitta", "Vata"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let table = RuleTable::load(file.path()).unwrap();
        assert!(table.contains("Pitta"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = RuleTable::load("/definitely/not/here/rules.json").unwrap_err();
        assert!(matches!(err, Error::RuleLoad(_)));
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"Vata\": [1, 2, 3]}").unwrap();

        assert!(matches!(RuleTable::load(file.path()), Err(Error::RuleLoad(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let table = RuleTable::from_json(SAMPLE).unwrap();
        let again = RuleTable::from_json(&table.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again, table);
    }
}
