//! Funding lookup table: canonical entity name -> raw amount string.
//!
//! The table is supplied whole at startup and never mutated by the engine.
//! Entry order is significant: when two entities would claim the same alias,
//! the one declared first wins.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::ser::SerializeMap;
use std::collections::HashMap;
use std::fmt;

use crate::error::{EngineError, Result};

// =============================================================================
// Types
// =============================================================================

/// A named organization with its public-funding figure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    /// Raw amount in the `<number>(,<decimal>)?(€|M€|Md€)` grammar
    pub amount: String,
}

/// Ordered funding table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundingTable {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

/// Reference figures, Ministry of Culture 2023/2024 (approximate).
/// Group-level amounts are repeated for each channel of the group.
const BUILTIN_TABLE: &[(&str, &str)] = &[
    // National dailies
    ("Le Monde", "8,3M€"),
    ("Le Figaro", "10,6M€"),
    ("Libération", "6,3M€"),
    ("Aujourd'hui en France", "12,2M€"),
    ("Le Parisien", "12,2M€"),
    ("La Croix", "9,2M€"),
    ("L'Humanité", "6,5M€"),
    ("L'Opinion", "0,8M€"),
    ("Les Echos", "0,9M€"),
    ("Ouest-France", "6,8M€"),
    // Magazines
    ("L'Obs", "0,2M€"),
    ("Le Point", "1,1M€"),
    ("L'Express", "0,1M€"),
    ("Marianne", "0,9M€"),
    ("Valeurs Actuelles", "0,4M€"),
    ("Télérama", "5,5M€"),
    ("Médiapart", "0€"),
    ("Politis", "0,3M€"),
    ("Charlie Hebdo", "0€"),
    // Public service TV & radio
    ("France Télévisions", "2,5Md€"),
    ("France 2", "2,5Md€"),
    ("France 3", "2,5Md€"),
    ("Arte", "300M€"),
    ("Radio France", "630M€"),
    ("France Inter", "630M€"),
    ("France Info", "630M€"),
    ("TF1", "0€"),
    ("M6", "0€"),
    ("BFMTV", "0€"),
    ("CNews", "0€"),
];

// =============================================================================
// FundingTable
// =============================================================================

impl FundingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference table shipped with the extension
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_TABLE.iter().copied())
    }

    pub fn from_pairs<I, N, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        let mut table = Self::new();
        for (name, amount) in pairs {
            table.insert(name, amount);
        }
        table
    }

    /// Parse a JSON object `{ "Le Monde": "8,3M€", ... }`, keeping entry order
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::FundingTable(e.to_string()))
    }

    /// Insert an entity. A repeated name keeps its original position and takes
    /// the new amount. Returns true if the name was new.
    pub fn insert(&mut self, name: impl Into<String>, amount: impl Into<String>) -> bool {
        let name = name.into();
        let amount = amount.into();
        if let Some(&idx) = self.index.get(&name) {
            self.entities[idx].amount = amount;
            return false;
        }
        self.index.insert(name.clone(), self.entities.len());
        self.entities.push(Entity { name, amount });
        true
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&idx| &self.entities[idx])
    }

    pub fn entity(&self, idx: usize) -> Option<&Entity> {
        self.entities.get(idx)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// =============================================================================
// Serde (map form, order-preserving)
// =============================================================================

impl Serialize for FundingTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entities.len()))?;
        for entity in &self.entities {
            map.serialize_entry(&entity.name, &entity.amount)?;
        }
        map.end()
    }
}

struct FundingTableVisitor;

impl<'de> Visitor<'de> for FundingTableVisitor {
    type Value = FundingTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of entity name to amount string")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<FundingTable, M::Error> {
        let mut table = FundingTable::new();
        while let Some((name, amount)) = access.next_entry::<String, serde_json::Value>()? {
            match amount {
                serde_json::Value::String(amount) => {
                    table.insert(name, amount);
                }
                _ => {
                    return Err(de::Error::custom(format!(
                        "amount for \"{}\" is not a string",
                        name
                    )));
                }
            }
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for FundingTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FundingTableVisitor)
    }
}

// =============================================================================
// Tests
// =============================================================================
