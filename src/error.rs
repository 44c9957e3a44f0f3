//! Error types for engine construction.
//!
//! Annotation itself never fails: a node that cannot be rewritten is simply
//! left as it was. Errors only surface while turning host input (funding
//! tables, preferences, configuration) into a running engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The alias alternation or the annotation signature failed to compile
    #[error("failed to compile pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid preferences: {0}")]
    Preferences(String),

    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("invalid funding table: {0}")]
    FundingTable(String),

    #[error("preference store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
