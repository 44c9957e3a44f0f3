//! Text heuristic for spans that already carry a funding suffix.
//!
//! Generated markup is recognized structurally by the annotator; this guard
//! covers the cases structure cannot see, such as a page that copied an
//! annotated string into plain text. The signature is a currency-bearing
//! numeral followed by more content, e.g. `8,3M€ public '23)`.
//! It can miss unusual renderings and can flag unrelated prices.

use regex::Regex;

use crate::error::Result;

/// Numeral with optional grouping and decimal comma, an optional scale, the
/// euro sign, then at least one more character
const SIGNATURE: &str = r"\d(?:[\d\x{202F}\x{A0}]*\d)?(?:,\d+)?[\s\x{202F}\x{A0}]?(?:Md|M)?€.+";

#[derive(Debug, Clone)]
pub struct AnnotationGuard {
    signature: Regex,
    whole_node: bool,
    lookahead_chars: usize,
}

impl AnnotationGuard {
    pub fn new(whole_node: bool, lookahead_chars: usize) -> Result<Self> {
        Ok(Self {
            signature: Regex::new(SIGNATURE)?,
            whole_node,
            lookahead_chars,
        })
    }

    pub fn has_signature(&self, text: &str) -> bool {
        self.signature.is_match(text)
    }

    /// Coarse guard: skip the whole text node
    pub fn skips_node(&self, text: &str) -> bool {
        self.whole_node && self.has_signature(text)
    }

    /// Fine guard: the few characters after a match already hold a suffix
    pub fn follows_annotation(&self, text: &str, match_end: usize) -> bool {
        if self.lookahead_chars == 0 || match_end >= text.len() {
            return false;
        }
        let rest = &text[match_end..];
        let window_end = rest
            .char_indices()
            .nth(self.lookahead_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.has_signature(&rest[..window_end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> AnnotationGuard {
        AnnotationGuard::new(true, 24).unwrap()
    }

    #[test]
    fn test_detects_generated_suffixes() {
        let g = guard();
        assert!(g.has_signature("Le Monde (8,3M€ public '23)"));
        assert!(g.has_signature("France 2 [2,5Md€ public]"));
        assert!(g.has_signature("TF1 (💰 0€)"));
        assert!(g.has_signature("Arte (0,09€/hab.)"));
        assert!(g.has_signature("Le Monde (691\u{202F}667€/mois)"));
    }

    #[test]
    fn test_requires_trailing_content() {
        let g = guard();
        assert!(!g.has_signature("Budget: 8,3M€"));
        assert!(!g.has_signature("Le Monde"));
        assert!(!g.has_signature("8,3 millions"));
    }

    #[test]
    fn test_whole_node_switch() {
        let text = "Le Monde (8,3M€ public '23)";
        assert!(guard().skips_node(text));
        assert!(!AnnotationGuard::new(false, 24).unwrap().skips_node(text));
    }

    #[test]
    fn test_lookahead_window() {
        let g = guard();
        let text = "Le Monde (8,3M€ public '23) et Le Figaro";
        assert!(g.follows_annotation(text, 8));
        // Figaro is at the end: nothing follows it
        assert!(!g.follows_annotation(text, text.len()));
    }

    #[test]
    fn test_lookahead_limited_to_window() {
        let g = AnnotationGuard::new(true, 10).unwrap();
        let text = "Le Monde, puis beaucoup plus loin 8,3M€ public";
        assert!(!g.follows_annotation(text, 8));
        assert!(g.has_signature(text));
    }

    #[test]
    fn test_lookahead_respects_char_boundaries() {
        let g = AnnotationGuard::new(true, 3).unwrap();
        let text = "Télérama éé 5€ x";
        // Window ends inside multi-byte characters without panicking
        assert!(!g.follows_annotation(text, "Télérama".len()));
    }

    #[test]
    fn test_lookahead_disabled() {
        let g = AnnotationGuard::new(true, 0).unwrap();
        assert!(!g.follows_annotation("Le Monde (8,3M€ public '23)", 8));
    }
}
