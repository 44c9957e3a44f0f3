//! Alias expansion: every string recognized as a mention of an entity.
//!
//! Each canonical name always yields itself. Preference flags add the
//! upper-cased form and, for names opening with the definite article "Le",
//! the "du"/"au" forms. Every alias points back to exactly one entity; when
//! two entities produce the same string, the entity declared first keeps it.

use std::collections::HashMap;
use tracing::warn;

use crate::funding::{Entity, FundingTable};
use crate::preferences::Preferences;

/// Leading token eligible for article substitution
pub const DEFINITE_ARTICLE: &str = "Le ";

/// Replacements for [`DEFINITE_ARTICLE`]
pub const ARTICLE_VARIANTS: [&str; 4] = ["du ", "Du ", "au ", "Au "];

/// Which transform produced an alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Canonical,
    UpperCase,
    Article,
    ArticleUpperCase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub text: String,
    /// Position of the entity in the funding table
    pub entity: usize,
    pub kind: AliasKind,
}

/// Expanded aliases with exact lookup
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: Vec<Alias>,
    by_text: HashMap<String, usize>,
}

impl AliasTable {
    pub fn expand(table: &FundingTable, prefs: &Preferences) -> Self {
        let mut out = Self::default();

        for (idx, entity) in table.iter().enumerate() {
            out.push(&entity.name, idx, AliasKind::Canonical);

            if prefs.match_accent_insensitive {
                let upper = entity.name.to_uppercase();
                if upper != entity.name {
                    out.push(&upper, idx, AliasKind::UpperCase);
                }
            }

            if prefs.match_article_variant {
                if let Some(rest) = entity.name.strip_prefix(DEFINITE_ARTICLE) {
                    for article in ARTICLE_VARIANTS {
                        let variant = format!("{}{}", article, rest);
                        if prefs.match_accent_insensitive {
                            out.push(&variant.to_uppercase(), idx, AliasKind::ArticleUpperCase);
                        }
                        out.push(&variant, idx, AliasKind::Article);
                    }
                }
            }
        }

        out
    }

    fn push(&mut self, text: &str, entity: usize, kind: AliasKind) {
        if let Some(&existing) = self.by_text.get(text) {
            let owner = self.aliases[existing].entity;
            if owner != entity {
                warn!(alias = text, owner, ignored = entity, "alias claimed by two entities");
            }
            return;
        }
        self.by_text.insert(text.to_string(), self.aliases.len());
        self.aliases.push(Alias {
            text: text.to_string(),
            entity,
            kind,
        });
    }

    pub fn get(&self, text: &str) -> Option<&Alias> {
        self.by_text.get(text).map(|&idx| &self.aliases[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.iter()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Resolve matched text to its entity.
    ///
    /// Exact alias lookup first, then the case/article transforms are
    /// reversed and compared against canonical names. `None` leaves the match
    /// unannotated.
    pub fn resolve<'a>(&self, matched: &str, table: &'a FundingTable) -> Option<&'a Entity> {
        if let Some(alias) = self.get(matched) {
            return table.entity(alias.entity);
        }

        let upper = matched.to_uppercase();
        let article_upper = DEFINITE_ARTICLE.to_uppercase();
        let canonical_upper = ARTICLE_VARIANTS
            .iter()
            .find_map(|article| upper.strip_prefix(article.to_uppercase().as_str()))
            .map(|rest| format!("{}{}", article_upper, rest));

        table.iter().find(|entity| {
            let name = entity.name.to_uppercase();
            name == upper || canonical_upper.as_deref() == Some(name.as_str())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(upper: bool, article: bool) -> Preferences {
        Preferences {
            match_accent_insensitive: upper,
            match_article_variant: article,
            ..Preferences::default()
        }
    }

    fn texts(aliases: &AliasTable) -> Vec<&str> {
        aliases.iter().map(|a| a.text.as_str()).collect()
    }

    #[test]
    fn test_canonical_only_by_default() {
        let table = FundingTable::from_pairs([("Le Monde", "8,3M€"), ("TF1", "0€")]);
        let aliases = AliasTable::expand(&table, &prefs(false, false));
        assert_eq!(texts(&aliases), vec!["Le Monde", "TF1"]);
    }

    #[test]
    fn test_uppercase_skips_identical() {
        let table = FundingTable::from_pairs([("Libération", "6,3M€"), ("BFMTV", "0€")]);
        let aliases = AliasTable::expand(&table, &prefs(true, false));
        assert_eq!(texts(&aliases), vec!["Libération", "LIBÉRATION", "BFMTV"]);
        assert_eq!(aliases.get("LIBÉRATION").unwrap().kind, AliasKind::UpperCase);
    }

    #[test]
    fn test_article_variants() {
        let table = FundingTable::from_pairs([("Le Monde", "8,3M€")]);
        let aliases = AliasTable::expand(&table, &prefs(false, true));
        assert_eq!(
            texts(&aliases),
            vec!["Le Monde", "du Monde", "Du Monde", "au Monde", "Au Monde"]
        );
    }

    #[test]
    fn test_full_expansion() {
        let table = FundingTable::from_pairs([("Le Monde", "8,3M€")]);
        let aliases = AliasTable::expand(&table, &prefs(true, true));
        for expected in [
            "Le Monde", "LE MONDE", "du Monde", "Du Monde", "au Monde", "Au Monde", "DU MONDE",
            "AU MONDE",
        ] {
            let alias = aliases.get(expected);
            assert!(alias.is_some(), "missing alias {}", expected);
            assert_eq!(alias.unwrap().entity, 0);
        }
        // "DU MONDE" is produced twice (du/Du) but stored once
        assert_eq!(aliases.len(), 8);
    }

    #[test]
    fn test_article_requires_leading_le() {
        let table = FundingTable::from_pairs([("La Croix", "9,2M€"), ("Ouest-France", "6,8M€")]);
        let aliases = AliasTable::expand(&table, &prefs(false, true));
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn test_collision_first_entity_wins() {
        let table = FundingTable::from_pairs([("ARTE", "1M€"), ("Arte", "300M€")]);
        let aliases = AliasTable::expand(&table, &prefs(true, false));
        // "Arte" upper-cases to "ARTE", already owned by entity 0
        assert_eq!(aliases.get("ARTE").unwrap().entity, 0);
        assert_eq!(aliases.get("Arte").unwrap().entity, 1);
    }

    #[test]
    fn test_resolve_exact() {
        let table = FundingTable::builtin();
        let aliases = AliasTable::expand(&table, &prefs(true, true));
        assert_eq!(aliases.resolve("LE FIGARO", &table).unwrap().amount, "10,6M€");
        assert_eq!(aliases.resolve("du Monde", &table).unwrap().name, "Le Monde");
    }

    #[test]
    fn test_resolve_reverses_transforms() {
        // Aliases built without flags, lookup of a transformed form still resolves
        let table = FundingTable::builtin();
        let aliases = AliasTable::expand(&table, &prefs(false, false));
        assert_eq!(aliases.resolve("LE POINT", &table).unwrap().name, "Le Point");
        assert_eq!(aliases.resolve("AU PARISIEN", &table).unwrap().name, "Le Parisien");
        assert!(aliases.resolve("Le Inconnu", &table).is_none());
    }
}
