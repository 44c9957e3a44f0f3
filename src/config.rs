//! Engine configuration
//!
//! Host-facing tuning, as opposed to [`Preferences`](crate::Preferences)
//! which the user controls. Every field has a default so hosts can pass a
//! partial JSON object (or nothing at all).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Approximate population used for per-person amounts
pub const DEFAULT_POPULATION: f64 = 68_000_000.0;

/// Compiled-size ceiling for the alias alternation
pub const DEFAULT_PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Class carried by every generated wrapper element
pub const DEFAULT_WRAPPER_CLASS: &str = "fundcore-annotated";

/// Class carried by the suffix element nested in a wrapper
pub const DEFAULT_SUFFIX_CLASS: &str = "fundcore-suffix";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Divisor applied when per-person amounts are requested
    pub population: f64,
    /// Characters after a match inspected for an existing suffix (0 = off)
    pub lookahead_chars: usize,
    /// Skip a whole text node when it already looks annotated
    pub guard_whole_node: bool,
    /// Elements whose subtrees are never scanned
    pub excluded_tags: Vec<String>,
    pub wrapper_class: String,
    pub suffix_class: String,
    /// Inserted nodes the watcher annotates per chunk
    pub batch_size: usize,
    /// Bytes the compiled alias pattern may use
    pub pattern_size_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            lookahead_chars: 24,
            guard_whole_node: true,
            excluded_tags: ["SCRIPT", "STYLE", "TEXTAREA", "INPUT", "NOSCRIPT"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            wrapper_class: DEFAULT_WRAPPER_CLASS.to_string(),
            suffix_class: DEFAULT_SUFFIX_CLASS.to_string(),
            batch_size: 256,
            pattern_size_limit: DEFAULT_PATTERN_SIZE_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.population.is_finite() && self.population > 0.0) {
            return Err(EngineError::Config(format!(
                "population must be positive, got {}",
                self.population
            )));
        }
        if self.wrapper_class.is_empty() || self.suffix_class.is_empty() {
            return Err(EngineError::Config("marker classes must not be empty".to_string()));
        }
        if self.wrapper_class == self.suffix_class {
            return Err(EngineError::Config(
                "wrapper and suffix classes must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Case-insensitive membership in the exclusion set
    pub fn is_excluded_tag(&self, tag: &str) -> bool {
        self.excluded_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
