//! Annotator: walks a document subtree and appends funding suffixes after
//! entity mentions.
//!
//! Text nodes are matched against the compiled alias pattern. Each resolved,
//! unguarded match becomes a wrapper element holding the original text and a
//! separate suffix element, so later passes recognize the output by structure
//! and never scan it again. A text node without annotations is never written.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::dom::{DocumentTree, Markup, NodeClass, Segment};
use crate::error::Result;
use crate::format::SuffixFormatter;
use crate::funding::{Entity, FundingTable};
use crate::preferences::Preferences;
use crate::scanner::alias::AliasTable;
use crate::scanner::guard::AnnotationGuard;
use crate::scanner::pattern::CompiledPattern;

// =============================================================================
// Types
// =============================================================================

/// One annotation planned for a piece of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSpan {
    /// Byte offsets of the matched alias
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
    pub entity: String,
    pub amount: String,
    pub suffix: String,
}

/// Counters for one or more passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationStats {
    pub text_nodes_scanned: usize,
    pub nodes_rewritten: usize,
    pub annotations: usize,
    /// Text nodes skipped because they already looked annotated
    pub guarded_nodes: usize,
    /// Matches skipped because a suffix already followed them
    pub guarded_matches: usize,
    pub unresolved_matches: usize,
    /// Excluded or generated elements not descended into
    pub skipped_elements: usize,
    pub failed_rewrites: usize,
}

impl AnnotationStats {
    pub fn merge(&mut self, other: &AnnotationStats) {
        self.text_nodes_scanned += other.text_nodes_scanned;
        self.nodes_rewritten += other.nodes_rewritten;
        self.annotations += other.annotations;
        self.guarded_nodes += other.guarded_nodes;
        self.guarded_matches += other.guarded_matches;
        self.unresolved_matches += other.unresolved_matches;
        self.skipped_elements += other.skipped_elements;
        self.failed_rewrites += other.failed_rewrites;
    }
}

struct PlannedMatch<'a> {
    range: Range<usize>,
    entity: &'a Entity,
    suffix: String,
}

// =============================================================================
// Annotator
// =============================================================================

/// Everything derived from one preference snapshot
#[derive(Debug, Clone)]
pub struct Annotator {
    table: FundingTable,
    aliases: AliasTable,
    pattern: CompiledPattern,
    formatter: SuffixFormatter,
    guard: AnnotationGuard,
    config: EngineConfig,
}

impl Annotator {
    pub fn new(table: FundingTable, prefs: &Preferences, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let aliases = AliasTable::expand(&table, prefs);
        let pattern = CompiledPattern::compile_with_limit(&aliases, config.pattern_size_limit)?;
        let formatter = SuffixFormatter::new(prefs, config.population);
        let guard = AnnotationGuard::new(config.guard_whole_node, config.lookahead_chars)?;

        debug!(
            entities = table.len(),
            aliases = aliases.len(),
            style = prefs.display_style.as_str(),
            "annotator built"
        );

        Ok(Self {
            table,
            aliases,
            pattern,
            formatter,
            guard,
            config,
        })
    }

    pub fn table(&self) -> &FundingTable {
        &self.table
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn formatter(&self) -> &SuffixFormatter {
        &self.formatter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn markup(&self) -> Markup<'_> {
        Markup {
            wrapper_class: &self.config.wrapper_class,
            suffix_class: &self.config.suffix_class,
        }
    }

    /// Annotations a text node with this content would receive
    pub fn scan_text(&self, text: &str) -> Vec<AnnotationSpan> {
        let mut stats = AnnotationStats::default();
        self.plan(text, &mut stats)
            .into_iter()
            .map(|m| AnnotationSpan {
                start: m.range.start,
                end: m.range.end,
                matched_text: text[m.range.clone()].to_string(),
                entity: m.entity.name.clone(),
                amount: m.entity.amount.clone(),
                suffix: m.suffix,
            })
            .collect()
    }

    fn plan<'a>(&'a self, text: &str, stats: &mut AnnotationStats) -> Vec<PlannedMatch<'a>> {
        let mut matches = self.pattern.find_iter(text).peekable();
        if matches.peek().is_none() {
            return Vec::new();
        }
        if self.guard.skips_node(text) {
            trace!(text, "text node already annotated");
            stats.guarded_nodes += 1;
            return Vec::new();
        }

        let mut planned = Vec::new();
        for m in matches {
            let Some(entity) = self.aliases.resolve(m.as_str(), &self.table) else {
                trace!(matched = m.as_str(), "no entity for match");
                stats.unresolved_matches += 1;
                continue;
            };
            if self.guard.follows_annotation(text, m.end()) {
                trace!(matched = m.as_str(), "suffix already follows match");
                stats.guarded_matches += 1;
                continue;
            }
            planned.push(PlannedMatch {
                range: m.range(),
                entity,
                suffix: self.formatter.suffix(&entity.amount),
            });
        }
        planned
    }

    /// Excluded tag, or markup this annotator generated
    fn is_protected<T: DocumentTree>(&self, tree: &T, node: &T::Node) -> bool {
        let excluded = match tree.classify(node) {
            NodeClass::Element(tag) => self.config.is_excluded_tag(&tag),
            _ => return false,
        };
        excluded
            || tree.has_class(node, &self.config.wrapper_class)
            || tree.has_class(node, &self.config.suffix_class)
    }

    /// True if some ancestor of `node` is protected
    pub fn inside_protected<T: DocumentTree>(&self, tree: &T, node: &T::Node) -> bool {
        let mut current = tree.parent_of(node);
        while let Some(ancestor) = current {
            if self.is_protected(tree, &ancestor) {
                return true;
            }
            current = tree.parent_of(&ancestor);
        }
        false
    }

    /// Annotate `root` and all of its descendants.
    ///
    /// A root living under an excluded or generated element is left alone,
    /// which matters for nodes inserted into an existing `<style>` or wrapper.
    pub fn annotate<T: DocumentTree>(&self, tree: &mut T, root: &T::Node) -> AnnotationStats {
        let mut stats = AnnotationStats::default();
        if self.inside_protected(tree, root) {
            trace!("root inside excluded or generated element");
            stats.skipped_elements += 1;
            return stats;
        }
        let mut stack = vec![root.clone()];

        while let Some(node) = stack.pop() {
            let rewrite = match tree.classify(&node) {
                NodeClass::Text(text) => {
                    stats.text_nodes_scanned += 1;
                    let planned = self.plan(&text, &mut stats);
                    if planned.is_empty() {
                        None
                    } else {
                        Some((text.into_owned(), planned))
                    }
                }
                NodeClass::Element(_) => {
                    if self.is_protected(tree, &node) {
                        stats.skipped_elements += 1;
                    } else {
                        // Snapshot: rewrites below must not disturb sibling order
                        let children = tree.children(&node);
                        stack.extend(children.into_iter().rev());
                    }
                    None
                }
                NodeClass::Other => None,
            };

            let Some((text, planned)) = rewrite else {
                continue;
            };
            let count = planned.len();
            let segments = build_segments(&text, planned);
            if tree.replace_text(&node, &segments, self.markup()) {
                stats.nodes_rewritten += 1;
                stats.annotations += count;
            } else {
                stats.failed_rewrites += 1;
            }
        }

        debug!(
            scanned = stats.text_nodes_scanned,
            rewritten = stats.nodes_rewritten,
            annotations = stats.annotations,
            guarded = stats.guarded_nodes + stats.guarded_matches,
            "annotation pass complete"
        );
        stats
    }
}

/// Interleave plain text and annotated matches in original order
fn build_segments<'t>(text: &'t str, planned: Vec<PlannedMatch<'_>>) -> Vec<Segment<'t>> {
    let mut segments = Vec::with_capacity(planned.len() * 2 + 1);
    let mut cursor = 0;
    for m in planned {
        if m.range.start > cursor {
            segments.push(Segment::Plain(&text[cursor..m.range.start]));
        }
        segments.push(Segment::Annotated {
            matched: &text[m.range.clone()],
            suffix: m.suffix,
        });
        cursor = m.range.end;
    }
    if cursor < text.len() {
        segments.push(Segment::Plain(&text[cursor..]));
    }
    segments
}

// =============================================================================
// Tests
// =============================================================================
