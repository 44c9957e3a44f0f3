//! Pattern compiler: one whole-word alternation over every alias.
//!
//! Aliases are escaped and sorted by descending length so that, with the
//! regex crate's leftmost-first alternation, the longest alias wins wherever
//! two aliases overlap at the same position. Word boundaries wrap the whole
//! group, not each arm, and follow Unicode word rules so accented names
//! ("Libération") behave like plain ASCII ones.

use regex::{Match, Regex, RegexBuilder};

use crate::config::DEFAULT_PATTERN_SIZE_LIMIT;
use crate::error::Result;
use crate::scanner::alias::AliasTable;

/// Compiled matcher for one preference snapshot. Never mutated after build.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// `None` when there are no aliases: nothing ever matches
    regex: Option<Regex>,
    alias_count: usize,
}

impl CompiledPattern {
    pub fn compile(aliases: &AliasTable) -> Result<Self> {
        Self::compile_with_limit(aliases, DEFAULT_PATTERN_SIZE_LIMIT)
    }

    /// Compile under an explicit compiled-size limit (bytes)
    pub fn compile_with_limit(aliases: &AliasTable, size_limit: usize) -> Result<Self> {
        if aliases.is_empty() {
            return Ok(Self {
                regex: None,
                alias_count: 0,
            });
        }

        let mut arms: Vec<&str> = aliases.iter().map(|a| a.text.as_str()).collect();
        // Stable: equal lengths keep table order
        arms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        let alternation = arms
            .iter()
            .map(|arm| regex::escape(arm))
            .collect::<Vec<_>>()
            .join("|");
        let source = format!(r"\b(?:{})\b", alternation);

        let regex = RegexBuilder::new(&source).size_limit(size_limit).build()?;

        Ok(Self {
            regex: Some(regex),
            alias_count: arms.len(),
        })
    }

    /// Non-overlapping matches, left to right
    pub fn find_iter<'p, 't: 'p>(&'p self, text: &'t str) -> impl Iterator<Item = Match<'t>> + 'p {
        self.regex.iter().flat_map(move |re| re.find_iter(text))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    pub fn alias_count(&self) -> usize {
        self.alias_count
    }

    /// Source of the compiled expression, if any
    pub fn as_str(&self) -> Option<&str> {
        self.regex.as_ref().map(|re| re.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funding::FundingTable;
    use crate::preferences::Preferences;

    fn compile(pairs: &[(&str, &str)]) -> CompiledPattern {
        let table = FundingTable::from_pairs(pairs.iter().copied());
        let aliases = AliasTable::expand(&table, &Preferences::default());
        CompiledPattern::compile(&aliases).unwrap()
    }

    fn matches<'t>(pattern: &CompiledPattern, text: &'t str) -> Vec<&'t str> {
        pattern.find_iter(text).map(|m| m.as_str()).collect()
    }

    #[test]
    fn test_whole_word_only() {
        let pattern = compile(&[("Le Monde", "8,3M€")]);
        assert!(matches(&pattern, "Le Mondealist").is_empty());
        assert!(matches(&pattern, "xLe Monde").is_empty());
        assert_eq!(matches(&pattern, "Lu dans Le Monde."), vec!["Le Monde"]);
    }

    #[test]
    fn test_match_range_confined_to_alias() {
        let pattern = compile(&[("Le Monde", "8,3M€")]);
        let m = pattern.find_iter("Le Monde.").next().unwrap();
        assert_eq!((m.start(), m.end()), (0, 8));
    }

    #[test]
    fn test_longest_alias_wins() {
        let pattern = compile(&[("Le Monde", "8,3M€"), ("Le Monde Diplomatique", "0€")]);
        assert_eq!(
            matches(&pattern, "Un article du Le Monde Diplomatique"),
            vec!["Le Monde Diplomatique"]
        );
        // Falls back to the shorter alias when the longer one is absent
        assert_eq!(matches(&pattern, "Le Monde Diplo"), vec!["Le Monde"]);
    }

    #[test]
    fn test_special_characters_are_literal() {
        let pattern = compile(&[("A.B", "1M€"), ("C+", "1M€")]);
        assert!(matches(&pattern, "AxB").is_empty());
        assert_eq!(matches(&pattern, "see A.B now"), vec!["A.B"]);
        assert!(pattern.as_str().unwrap().contains(r"A\.B"));
    }

    #[test]
    fn test_accented_names_keep_boundaries() {
        let pattern = compile(&[("Libération", "6,3M€"), ("Télérama", "5,5M€")]);
        assert_eq!(matches(&pattern, "Libération et Télérama"), vec!["Libération", "Télérama"]);
        assert!(matches(&pattern, "Libérationnistes").is_empty());
    }

    #[test]
    fn test_apostrophe_and_digit_names() {
        let pattern = compile(&[("L'Obs", "0,2M€"), ("France 2", "2,5Md€"), ("France 3", "2,5Md€")]);
        assert_eq!(matches(&pattern, "L'Obs, France 2 et France 3"), vec!["L'Obs", "France 2", "France 3"]);
        assert!(matches(&pattern, "France 22").is_empty());
    }

    #[test]
    fn test_empty_alias_set_never_matches() {
        let pattern = compile(&[]);
        assert_eq!(pattern.alias_count(), 0);
        assert!(pattern.as_str().is_none());
        assert!(!pattern.is_match("anything"));
        assert_eq!(pattern.find_iter("anything").count(), 0);
    }

    #[test]
    fn test_builtin_table_compiles() {
        let table = FundingTable::builtin();
        let prefs = Preferences {
            match_accent_insensitive: true,
            match_article_variant: true,
            ..Preferences::default()
        };
        let aliases = AliasTable::expand(&table, &prefs);
        let pattern = CompiledPattern::compile(&aliases).unwrap();
        assert_eq!(pattern.alias_count(), aliases.len());
        assert!(pattern.is_match("selon AU PARISIEN"));
    }

    #[test]
    fn test_size_limit_is_an_error() {
        let aliases = AliasTable::expand(&FundingTable::builtin(), &Preferences::default());
        let err = CompiledPattern::compile_with_limit(&aliases, 16).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Pattern(_)));
    }
}
